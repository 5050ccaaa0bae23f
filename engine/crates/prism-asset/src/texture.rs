use std::path::{Path, PathBuf};

use ash::vk;
use prism_gfx::resources::sampler::GfxSamplerDesc;

use crate::asset::Asset;
use crate::catalog::{CatalogEntry, TextureId};
use crate::context::GpuUploadContext;
use crate::error::AssetError;
use crate::upload::GpuTexture;

/// 解码之后的 RGBA8 像素
pub struct Rgba8Image {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Rgba8Image {
    /// png / jpg 等常见格式，统一转换为 RGBA8
    pub fn decode_file(path: &Path) -> Result<Self, AssetError> {
        let img = image::open(path)
            .map_err(|source| AssetError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            pixels: img.into_raw(),
        })
    }

    pub fn decode_memory(bytes: &[u8], name: &Path) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|source| AssetError::Decode {
                path: name.to_path_buf(),
                source,
            })?
            .to_rgba8();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            pixels: img.into_raw(),
        })
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

enum TextureSource {
    File(PathBuf),
    Pixels(Rgba8Image),
}

/// 2D 纹理资源，sprite 通过 [`TextureId`] 引用
pub struct Texture {
    id: TextureId,
    name: String,
    source: TextureSource,

    gpu: Option<GpuTexture>,
}

// new & init
impl Texture {
    pub fn from_file(id: TextureId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id,
            name: path.to_string_lossy().into_owned(),
            source: TextureSource::File(path),
            gpu: None,
        }
    }

    pub fn from_rgba8(id: TextureId, name: impl Into<String>, image: Rgba8Image) -> Self {
        Self {
            id,
            name: name.into(),
            source: TextureSource::Pixels(image),
            gpu: None,
        }
    }

    /// 1x1 白色纹理，注册为 [`TextureId::WHITE`]
    pub fn white() -> Self {
        Self::from_rgba8(
            TextureId::WHITE,
            "builtin-white",
            Rgba8Image {
                width: 1,
                height: 1,
                pixels: vec![255; 4],
            },
        )
    }
}

// getters
impl Texture {
    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }
}

impl Asset<GpuUploadContext> for Texture {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, ctx: &GpuUploadContext) -> Result<(), AssetError> {
        let decoded;
        let image = match &self.source {
            TextureSource::File(path) => {
                decoded = Rgba8Image::decode_file(path)?;
                &decoded
            }
            TextureSource::Pixels(image) => image,
        };

        self.gpu = Some(GpuTexture::upload(
            ctx,
            image.extent(),
            vk::Format::R8G8B8A8_SRGB,
            &image.pixels,
            &GfxSamplerDesc::default(),
            &self.name,
        )?);
        Ok(())
    }

    fn unload(&mut self, _ctx: &GpuUploadContext) -> Result<(), AssetError> {
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.gpu.is_some()
    }

    fn catalog_entry(&self) -> Option<CatalogEntry> {
        self.gpu.as_ref().map(|gpu| CatalogEntry::Texture(self.id, gpu.binding()))
    }
}
