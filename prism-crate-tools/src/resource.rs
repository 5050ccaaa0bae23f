use std::path::{Path, PathBuf};

/// 统一资源路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导）。
///
/// # 使用示例
/// ```ignore
/// let font = PrismPath::assets_path("fonts/Roboto-Regular.ttf"); // assets/fonts/Roboto-Regular.ttf
/// let shader_dir = PrismPath::shader_build_dir();                  // shader/.build
/// ```
pub struct PrismPath {}
// 核心路径
impl PrismPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        manifest_dir.parent().map(Path::to_path_buf).unwrap_or_else(|| manifest_dir.to_path_buf())
    }
}
// 根目录下
impl PrismPath {
    /// 获取 `assets/` 目录下的文件路径
    pub fn assets_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("assets").join(filename)
    }

    pub fn shader_root_path() -> PathBuf {
        Self::workspace_path().join("shader")
    }

    /// `shader/.build/`，存放离线编译好的 SPIR-V
    pub fn shader_build_dir() -> PathBuf {
        Self::shader_root_path().join(".build")
    }

    /// 默认配置文件 `prism.toml`
    pub fn config_path() -> PathBuf {
        Self::workspace_path().join("prism.toml")
    }
}
