use std::path::PathBuf;

use prism_gfx::GfxError;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Gfx(#[from] GfxError),

    #[error("failed to read config '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// renderer 的顶点区域按 slot 划分，swapchain 重建之后 slot 数量不能变多
    #[error("swapchain has {images} images, but renderers were created for {slots} frame slots")]
    SlotCountMismatch { images: usize, slots: usize },

    #[error("frame slot {index} does not exist, {slots} slots are created")]
    MissingFrameSlot { index: usize, slots: usize },
}

/// `collect` 阶段的错误，只影响当前 renderer 的当前帧
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectError {
    #[error("{what} overflow: {requested} requested, capacity is {capacity}")]
    Overflow {
        what: &'static str,
        requested: usize,
        capacity: usize,
    },
}
