use std::path::PathBuf;

use prism_gfx::pipelines::shader::GfxShaderModule;

use crate::asset::Asset;
use crate::catalog::{CatalogEntry, ShaderId};
use crate::context::GpuUploadContext;
use crate::error::AssetError;

enum ShaderSource {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// 预编译的 SPIR-V，入口函数固定为 `main`
pub struct Shader {
    id: ShaderId,
    name: String,
    source: ShaderSource,

    module: Option<GfxShaderModule>,
}

// new & init
impl Shader {
    pub fn from_file(id: ShaderId, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id,
            name: path.to_string_lossy().into_owned(),
            source: ShaderSource::File(path),
            module: None,
        }
    }

    pub fn from_bytes(id: ShaderId, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id,
            name: name.into(),
            source: ShaderSource::Bytes(bytes),
            module: None,
        }
    }
}

impl Asset<GpuUploadContext> for Shader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, ctx: &GpuUploadContext) -> Result<(), AssetError> {
        let module = match &self.source {
            ShaderSource::File(path) => GfxShaderModule::from_path(ctx.device().clone(), path)?,
            ShaderSource::Bytes(bytes) => GfxShaderModule::from_bytes(ctx.device().clone(), bytes, &self.name)?,
        };
        self.module = Some(module);
        Ok(())
    }

    fn unload(&mut self, _ctx: &GpuUploadContext) -> Result<(), AssetError> {
        if let Some(module) = self.module.take() {
            module.destroy();
        }
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    fn catalog_entry(&self) -> Option<CatalogEntry> {
        self.module.as_ref().map(|m| CatalogEntry::Shader(self.id, m.handle()))
    }
}
