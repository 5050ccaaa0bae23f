use std::path::{Path, PathBuf};

use ash::vk;
use prism_crate_tools::resource::PrismPath;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// 渲染器默认配置
pub struct DefaultRendererSettings;
impl DefaultRendererSettings {
    pub const DEFAULT_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        // shader 输出会被自动改变： liner -> sRGB
        format: vk::Format::B8G8R8A8_SRGB,
        // 通知 OS，将数值按照 sRGB 空间进行处理和显示
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    pub const DEPTH_FORMAT_CANDIDATES: &'static [vk::Format] = &[
        vk::Format::D32_SFLOAT,
        vk::Format::D32_SFLOAT_S8_UINT,
        vk::Format::D24_UNORM_S8_UINT,
        vk::Format::D16_UNORM,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModePref {
    Fifo,
    Mailbox,
    Immediate,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormatPref {
    /// shader 输出线性颜色，由硬件转换为 sRGB
    Srgb,
    Unorm,
}

/// 各类 shape renderer 的定长容量，运行时不可扩容
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeCapacity {
    pub triangle_vertices: usize,
    pub rect_vertices: usize,
    pub circle_vertices: usize,
    pub sprite_vertices: usize,
    pub text_vertices: usize,
    pub mesh_vertices: usize,
    pub mesh_indices: usize,
}

impl Default for ShapeCapacity {
    fn default() -> Self {
        Self {
            triangle_vertices: 3 * 1024,
            rect_vertices: 6 * 1024,
            circle_vertices: 6 * 1024,
            sprite_vertices: 6 * 4096,
            text_vertices: 6 * 8192,
            mesh_vertices: 256 * 1024,
            mesh_indices: 768 * 1024,
        }
    }
}

/// 从 `prism.toml` 读取的渲染配置，缺失的字段使用默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// 线性空间的 RGBA
    pub clear_color: [f32; 4],
    /// 为 true 时忽略 `present_mode`，始终使用 FIFO
    pub vsync: bool,
    pub present_mode: PresentModePref,
    pub color_format: ColorFormatPref,
    /// 为空时使用 `shader/.build`
    pub shader_dir: Option<PathBuf>,
    pub font_px_size: f32,
    /// 每帧每个 slot 最多分配的纹理 descriptor set 数量，所有带纹理的 renderer 共享
    pub max_texture_binds: u32,
    pub capacity: ShapeCapacity,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.02, 0.02, 0.04, 1.0],
            vsync: true,
            present_mode: PresentModePref::Mailbox,
            color_format: ColorFormatPref::Srgb,
            shader_dir: None,
            font_px_size: 32.0,
            max_texture_binds: 1024,
            capacity: ShapeCapacity::default(),
        }
    }
}

// new & init
impl RendererSettings {
    /// 文件不存在时使用默认配置，格式错误时返回错误
    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("config '{}' not found, using default renderer settings", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(RenderError::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&text, path)
    }

    /// 读取工作区根目录下的 `prism.toml`
    #[inline]
    pub fn load_default_path() -> Result<Self, RenderError> {
        Self::load(&PrismPath::config_path())
    }

    pub fn parse(text: &str, path: &Path) -> Result<Self, RenderError> {
        toml::from_str(text).map_err(|source| RenderError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

// getters
impl RendererSettings {
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        if self.vsync {
            return vk::PresentModeKHR::FIFO;
        }
        match self.present_mode {
            PresentModePref::Fifo => vk::PresentModeKHR::FIFO,
            PresentModePref::Mailbox => vk::PresentModeKHR::MAILBOX,
            PresentModePref::Immediate => vk::PresentModeKHR::IMMEDIATE,
        }
    }

    pub fn surface_format(&self) -> vk::SurfaceFormatKHR {
        match self.color_format {
            ColorFormatPref::Srgb => DefaultRendererSettings::DEFAULT_SURFACE_FORMAT,
            ColorFormatPref::Unorm => vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        }
    }

    pub fn shader_dir(&self) -> PathBuf {
        self.shader_dir.clone().unwrap_or_else(PrismPath::shader_build_dir)
    }

    #[inline]
    pub fn clear_color(&self) -> glam::Vec4 {
        glam::Vec4::from(self.clear_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let settings = RendererSettings::parse(
            r#"
            clear_color = [1.0, 0.0, 0.0, 1.0]
            vsync = false
            present_mode = "immediate"

            [capacity]
            sprite_vertices = 60
            "#,
            Path::new("prism.toml"),
        )
        .unwrap();

        assert_eq!(settings.clear_color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(settings.present_mode(), vk::PresentModeKHR::IMMEDIATE);
        assert_eq!(settings.capacity.sprite_vertices, 60);
        assert_eq!(settings.capacity.rect_vertices, ShapeCapacity::default().rect_vertices);
        assert_eq!(settings.font_px_size, RendererSettings::default().font_px_size);
    }

    #[test]
    fn test_vsync_forces_fifo() {
        let settings = RendererSettings {
            vsync: true,
            present_mode: PresentModePref::Mailbox,
            ..Default::default()
        };
        assert_eq!(settings.present_mode(), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let err = RendererSettings::parse("clear_color = 3", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, RenderError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let settings = RendererSettings::load(Path::new("/definitely/not/here/prism.toml")).unwrap();
        assert_eq!(settings, RendererSettings::default());
    }
}
