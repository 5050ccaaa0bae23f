use std::ffi::CStr;
use std::path::Path;
use std::rc::Rc;

use ash::vk;

use crate::error::{GfxError, GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

/// 所有 shader 的入口函数名称
pub const SHADER_ENTRY_POINT: &CStr = c"main";

pub struct GfxShaderModule {
    handle: vk::ShaderModule,
    device: Rc<GfxDevice>,
}

// new & init
impl GfxShaderModule {
    /// # param
    /// * path - spv shader 文件路径
    pub fn from_path(device: Rc<GfxDevice>, path: &Path) -> GfxResult<Self> {
        let to_read_err = |source| GfxError::ShaderRead {
            path: path.to_path_buf(),
            source,
        };
        let mut file = std::fs::File::open(path).map_err(to_read_err)?;
        let shader_code = ash::util::read_spv(&mut file).map_err(to_read_err)?;

        Self::from_words(device, &shader_code, &path.to_string_lossy())
    }

    /// 字节码的长度必须是 4 的倍数
    pub fn from_bytes(device: Rc<GfxDevice>, bytes: &[u8], name: &str) -> GfxResult<Self> {
        let shader_code = ash::util::read_spv(&mut std::io::Cursor::new(bytes)).map_err(|source| {
            GfxError::ShaderRead {
                path: name.into(),
                source,
            }
        })?;
        Self::from_words(device, &shader_code, name)
    }

    fn from_words(device: Rc<GfxDevice>, code: &[u32], name: &str) -> GfxResult<Self> {
        let shader_module_info = vk::ShaderModuleCreateInfo::default().code(code);
        let handle =
            unsafe { device.create_shader_module(&shader_module_info, None) }.vk_err("vkCreateShaderModule")?;
        let module = Self { handle, device };
        module.device.set_debug_name(&module, name);
        Ok(module)
    }
}

// getters
impl GfxShaderModule {
    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }
}

// destroy
impl GfxShaderModule {
    pub fn destroy(mut self) {
        unsafe {
            self.device.destroy_shader_module(self.handle, None);
        }
        self.handle = vk::ShaderModule::null();
    }
}
impl Drop for GfxShaderModule {
    fn drop(&mut self) {
        debug_assert!(self.handle == vk::ShaderModule::null(), "GfxShaderModule is not destroyed");
    }
}

impl DebugType for GfxShaderModule {
    fn debug_type_name() -> &'static str {
        "GfxShaderModule"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
