use std::rc::Rc;

use ash::vk;

use crate::error::{GfxResult, VkResultExt};
use crate::foundation::device::GfxDevice;
use crate::pipelines::render_pass::GfxRenderPass;

/// swapchain 的每个 image 对应一个 framebuffer，共用同一个 depth image
pub struct GfxFramebuffer {
    handle: vk::Framebuffer,
    extent: vk::Extent2D,

    device: Rc<GfxDevice>,
}

// new & init
impl GfxFramebuffer {
    pub fn new(
        device: Rc<GfxDevice>,
        render_pass: &GfxRenderPass,
        color_view: vk::ImageView,
        depth_view: vk::ImageView,
        extent: vk::Extent2D,
        name: &str,
    ) -> GfxResult<Self> {
        let attachments = [color_view, depth_view];
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass.handle())
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let handle = unsafe { device.create_framebuffer(&create_info, None) }.vk_err("vkCreateFramebuffer")?;
        device.set_object_debug_name(handle, name);

        Ok(Self { handle, extent, device })
    }
}

// getters
impl GfxFramebuffer {
    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.handle
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

// destroy
impl GfxFramebuffer {
    pub fn destroy(mut self) {
        unsafe {
            self.device.destroy_framebuffer(self.handle, None);
        }
        self.handle = vk::Framebuffer::null();
    }
}
impl Drop for GfxFramebuffer {
    fn drop(&mut self) {
        debug_assert!(self.handle == vk::Framebuffer::null(), "GfxFramebuffer is not destroyed");
    }
}
