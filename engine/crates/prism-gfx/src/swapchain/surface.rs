use ash::vk;

use crate::error::{GfxError, GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::instance::GfxInstance;
use crate::foundation::physical_device::GfxPhysicalDevice;

/// 窗口对应的 vk surface
///
/// 在 Instance 阶段创建（选择显卡时需要判断 present 支持），并在 Instance 销毁之前销毁
pub struct GfxSurface {
    pub(crate) handle: vk::SurfaceKHR,
    pub(crate) pf: ash::khr::surface::Instance,
}

// new & init
impl GfxSurface {
    pub fn new(
        instance: &GfxInstance,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
        raw_window_handle: raw_window_handle::RawWindowHandle,
    ) -> GfxResult<Self> {
        let surface_pf = ash::khr::surface::Instance::new(instance.vk_entry(), instance.ash_instance());

        let surface = unsafe {
            ash_window::create_surface(
                instance.vk_entry(),
                instance.ash_instance(),
                raw_display_handle,
                raw_window_handle,
                None,
            )
        }
        .vk_err("vkCreateSurfaceKHR")?;

        Ok(GfxSurface {
            handle: surface,
            pf: surface_pf,
        })
    }
}

// getters
impl GfxSurface {
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// 实时查询，窗口尺寸变化之后 current_extent 会随之变化
    pub fn capabilities(&self, pdevice: &GfxPhysicalDevice) -> GfxResult<vk::SurfaceCapabilitiesKHR> {
        unsafe { self.pf.get_physical_device_surface_capabilities(pdevice.handle(), self.handle) }
            .vk_err("vkGetPhysicalDeviceSurfaceCapabilitiesKHR")
    }

    pub fn formats(&self, pdevice: &GfxPhysicalDevice) -> GfxResult<Vec<vk::SurfaceFormatKHR>> {
        let formats = unsafe { self.pf.get_physical_device_surface_formats(pdevice.handle(), self.handle) }
            .vk_err("vkGetPhysicalDeviceSurfaceFormatsKHR")?;
        if formats.is_empty() {
            return Err(GfxError::NoSurfaceFormat);
        }
        Ok(formats)
    }

    pub fn present_modes(&self, pdevice: &GfxPhysicalDevice) -> GfxResult<Vec<vk::PresentModeKHR>> {
        unsafe { self.pf.get_physical_device_surface_present_modes(pdevice.handle(), self.handle) }
            .vk_err("vkGetPhysicalDeviceSurfacePresentModesKHR")
    }
}

// destroy
impl GfxSurface {
    pub fn destroy(mut self) {
        log::info!("Destroying GfxSurface");
        unsafe { self.pf.destroy_surface(self.handle, None) }
        self.handle = vk::SurfaceKHR::null();
    }
}

impl Drop for GfxSurface {
    fn drop(&mut self) {
        debug_assert!(self.handle == vk::SurfaceKHR::null(), "GfxSurface must be destroyed explicitly");
    }
}

impl DebugType for GfxSurface {
    fn debug_type_name() -> &'static str {
        "GfxSurface"
    }
    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
