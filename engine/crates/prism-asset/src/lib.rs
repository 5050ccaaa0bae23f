//! 资源上传管线
//!
//! 资源以显式的有序列表注册到 [`AssetBundle`]，按注册顺序 load、逆序 unload；
//! 整个 bundle 加载成功之后，资源的 GPU 绑定信息才会发布到 [`AssetCatalog`] 中供 renderer 使用。

pub mod asset;
pub mod bundle;
pub mod catalog;
pub mod context;
pub mod error;
pub mod font;
pub mod model;
pub mod shader;
pub mod texture;
pub mod upload;

pub use asset::Asset;
pub use bundle::AssetBundle;
pub use catalog::{AssetCatalog, CatalogEntry, FontId, ModelId, ShaderId, TextureId};
pub use context::{GpuUploadContext, RenderCaps};
pub use error::AssetError;

/// 真实 GPU 环境下使用的 bundle
pub type GpuAssetBundle = AssetBundle<GpuUploadContext>;
