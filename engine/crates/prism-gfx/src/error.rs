use std::path::PathBuf;

use ash::vk;

#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    #[error("failed to load the vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("{call} failed: {result}")]
    Vulkan { call: &'static str, result: vk::Result },

    #[error("missing window handle: {0}")]
    MissingWindowHandle(String),

    #[error("required instance extension {0} is not supported")]
    MissingInstanceExtension(String),

    #[error("no suitable gpu found (requires vulkan 1.3, swapchain support and a graphics queue)")]
    NoSuitableGpu,

    #[error("no queue family can present to the surface")]
    NoPresentQueue,

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("none of the depth formats {0:?} can be used as depth attachment")]
    NoDepthFormat(Vec<vk::Format>),

    #[error("no suitable memory type (type bits {type_bits:#034b}, properties {properties:?})")]
    NoSuitableMemoryType {
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    },

    #[error("unsupported layout transition {old:?} -> {new:?}")]
    UnsupportedLayoutTransition { old: vk::ImageLayout, new: vk::ImageLayout },

    #[error("failed to read shader '{path}': {source}")]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("buffer '{name}' is not host visible")]
    NotHostVisible { name: String },

    #[error("write of {len} bytes at offset {offset} overflows buffer '{name}' ({size} bytes)")]
    BufferOverflow {
        name: String,
        offset: u64,
        len: u64,
        size: u64,
    },
}

pub type GfxResult<T> = Result<T, GfxError>;

/// 为 `VkResult` 附加调用名称
pub trait VkResultExt<T> {
    fn vk_err(self, call: &'static str) -> GfxResult<T>;
}

impl<T> VkResultExt<T> for Result<T, vk::Result> {
    #[inline]
    fn vk_err(self, call: &'static str) -> GfxResult<T> {
        self.map_err(|result| GfxError::Vulkan { call, result })
    }
}
