//! Shader 编译工具
//!
//! 将 `shader/src` 下的所有 GLSL 文件编译为 SPIR-V，输出到 `shader/.build`

mod task;

use prism_crate_tools::init_log::init_log;
use prism_crate_tools::resource::PrismPath;
use rayon::prelude::*;
use task::ShaderCompileTask;

fn main() -> anyhow::Result<()> {
    init_log();

    let src_dir = PrismPath::shader_root_path().join("src");
    let build_dir = PrismPath::shader_build_dir();
    log::info!("shader source path: {:?}", src_dir);
    log::info!("shader output path: {:?}", build_dir);

    let tasks = walkdir::WalkDir::new(&src_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| ShaderCompileTask::new(entry.path(), &src_dir, &build_dir))
        .collect::<Vec<_>>();

    // 并行编译，收集全部失败之后再报告
    let failures = tasks
        .par_iter()
        .filter_map(|task| {
            log::info!("compiling shader: {:?}", task.shader_path);
            task.compile().err()
        })
        .collect::<Vec<_>>();

    for e in &failures {
        log::error!("{:#}", e);
    }
    if !failures.is_empty() {
        anyhow::bail!("{} of {} shaders failed to compile", failures.len(), tasks.len());
    }

    log::info!("shader compilation completed: {} shaders", tasks.len());
    Ok(())
}
