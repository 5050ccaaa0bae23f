use std::path::PathBuf;

use prism_gfx::GfxError;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// 包括 layout 转换不受支持、显存分配失败等
    #[error(transparent)]
    Gfx(#[from] GfxError),

    #[error("font '{name}': {message}")]
    Font { name: String, message: String },

    #[error("failed to import model '{path}': {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("model '{path}': {message}")]
    ModelContent { path: PathBuf, message: String },

    #[error("unsupported pixel data for '{name}': {message}")]
    UnsupportedFormat { name: String, message: String },

    #[error("missing resource: {0}")]
    Missing(String),

    #[error("asset '{asset}' failed to {action}: {source}")]
    Named {
        asset: String,
        action: &'static str,
        #[source]
        source: Box<AssetError>,
    },
}

impl AssetError {
    #[inline]
    pub fn named(asset: impl Into<String>, action: &'static str, source: AssetError) -> Self {
        Self::Named {
            asset: asset.into(),
            action,
            source: Box::new(source),
        }
    }
}
