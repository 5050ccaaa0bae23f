use std::path::{Path, PathBuf};
use std::rc::Rc;

use prism_gfx::GfxResult;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::pipelines::shader::GfxShaderModule;

/// 一对编译好的 vertex / fragment shader，创建 pipeline 之后即可销毁
pub struct ShaderPair {
    pub vertex: GfxShaderModule,
    pub fragment: GfxShaderModule,
}

impl ShaderPair {
    pub fn destroy(self) {
        self.vertex.destroy();
        self.fragment.destroy();
    }
}

/// 按名称查找 `<dir>/<name>.vert.spv` 与 `<dir>/<name>.frag.spv`
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    dir: PathBuf,
}

// new & init
impl ShaderLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

// getters
impl ShaderLibrary {
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

// tools
impl ShaderLibrary {
    #[inline]
    pub fn vertex_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.vert.spv"))
    }

    #[inline]
    pub fn fragment_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.frag.spv"))
    }

    pub fn load(&self, device: &Rc<GfxDevice>, name: &str) -> GfxResult<ShaderPair> {
        let vertex = GfxShaderModule::from_path(device.clone(), &self.vertex_path(name))?;
        let fragment = match GfxShaderModule::from_path(device.clone(), &self.fragment_path(name)) {
            Ok(fragment) => fragment,
            Err(e) => {
                vertex.destroy();
                return Err(e);
            }
        };
        Ok(ShaderPair { vertex, fragment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_paths() {
        let library = ShaderLibrary::new("/tmp/shaders");
        assert_eq!(library.vertex_path("sprite"), PathBuf::from("/tmp/shaders/sprite.vert.spv"));
        assert_eq!(library.fragment_path("sprite"), PathBuf::from("/tmp/shaders/sprite.frag.spv"));
    }
}
