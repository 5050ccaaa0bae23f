//! 编译任务与 glslc 调用

use std::path::{Path, PathBuf};

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// 根据文件扩展名解析，不支持的文件返回 None
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "vert" => Some(Self::Vertex),
            "frag" => Some(Self::Fragment),
            _ => None,
        }
    }
}

/// 一个具体的编译任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderCompileTask {
    pub shader_path: PathBuf,
    pub output_path: PathBuf,
    pub stage: ShaderStage,
}

impl ShaderCompileTask {
    /// `<src_dir>/a/b.vert` 编译到 `<build_dir>/a/b.vert.spv`
    pub fn new(shader_path: &Path, src_dir: &Path, build_dir: &Path) -> Option<Self> {
        let stage = ShaderStage::from_path(shader_path)?;
        let relative_path = shader_path.strip_prefix(src_dir).ok()?;

        let mut output_path = build_dir.join(relative_path);
        let mut new_ext = output_path.extension()?.to_os_string();
        new_ext.push(".spv");
        output_path.set_extension(new_ext);

        Some(Self {
            shader_path: shader_path.to_path_buf(),
            output_path,
            stage,
        })
    }

    /// 使用 glslc (来自 Vulkan SDK) 编译
    pub fn compile(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.output_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let output = std::process::Command::new("glslc")
            .arg("-g")
            .arg("--target-env=vulkan1.3")
            .arg("-o")
            .arg(&self.output_path)
            .arg(&self.shader_path)
            .output()
            .context("failed to execute glslc, is the Vulkan SDK installed?")?;

        if !output.stdout.is_empty() {
            log::info!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        }
        if !output.status.success() {
            anyhow::bail!("{}: {}", self.shader_path.display(), String::from_utf8_lossy(&output.stderr));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_keeps_stage_extension() {
        let task = ShaderCompileTask::new(
            Path::new("/ws/shader/src/shapes/circle.frag"),
            Path::new("/ws/shader/src"),
            Path::new("/ws/shader/.build"),
        )
        .unwrap();
        assert_eq!(task.stage, ShaderStage::Fragment);
        assert_eq!(task.output_path, PathBuf::from("/ws/shader/.build/shapes/circle.frag.spv"));
    }

    #[test]
    fn test_unsupported_files_are_skipped() {
        let src = Path::new("/ws/shader/src");
        let build = Path::new("/ws/shader/.build");
        assert!(ShaderCompileTask::new(Path::new("/ws/shader/src/common.glsl"), src, build).is_none());
        assert!(ShaderCompileTask::new(Path::new("/elsewhere/a.vert"), src, build).is_none());
    }
}
