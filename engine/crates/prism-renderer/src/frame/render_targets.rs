use std::rc::Rc;

use ash::vk;
use prism_gfx::GfxResult;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::foundation::mem_allocator::GfxAllocator;
use prism_gfx::pipelines::framebuffer::GfxFramebuffer;
use prism_gfx::pipelines::render_pass::GfxRenderPass;
use prism_gfx::resources::image::GfxImage;
use prism_gfx::resources::image_view::GfxImageView;
use prism_gfx::swapchain::render_swapchain::GfxRenderSwapchain;

/// 与 swapchain 尺寸相关的对象：共享的 depth image，以及每个 swapchain image 的 framebuffer
///
/// swapchain 重建之后需要整体销毁再创建
pub struct RenderTargets {
    depth_image: Option<GfxImage>,
    depth_view: Option<GfxImageView>,
    framebuffers: Vec<GfxFramebuffer>,
    extent: vk::Extent2D,
}

// new & init
impl RenderTargets {
    pub fn new(
        device: &Rc<GfxDevice>,
        allocator: &Rc<GfxAllocator>,
        render_pass: &GfxRenderPass,
        swapchain: &GfxRenderSwapchain,
    ) -> GfxResult<Self> {
        let extent = swapchain.extent();
        let mut targets = Self {
            depth_image: None,
            depth_view: None,
            framebuffers: Vec::with_capacity(swapchain.image_count()),
            extent,
        };
        if let Err(e) = targets.create_objects(device, allocator, render_pass, swapchain) {
            targets.destroy();
            return Err(e);
        }
        Ok(targets)
    }

    fn create_objects(
        &mut self,
        device: &Rc<GfxDevice>,
        allocator: &Rc<GfxAllocator>,
        render_pass: &GfxRenderPass,
        swapchain: &GfxRenderSwapchain,
    ) -> GfxResult<()> {
        let depth_format = render_pass.depth_format();
        let depth_image = GfxImage::new_depth(allocator.clone(), self.extent, depth_format, "depth")?;
        let depth_view = GfxImageView::for_image(device.clone(), &depth_image, "depth");
        self.depth_image = Some(depth_image);
        let depth_view = self.depth_view.insert(depth_view?).handle();

        for (i, color_view) in swapchain.image_views().iter().enumerate() {
            let framebuffer = GfxFramebuffer::new(
                device.clone(),
                render_pass,
                color_view.handle(),
                depth_view,
                self.extent,
                &format!("framebuffer-{i}"),
            )?;
            self.framebuffers.push(framebuffer);
        }
        Ok(())
    }
}

// getters
impl RenderTargets {
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn framebuffer(&self, image_index: usize) -> Option<&GfxFramebuffer> {
        self.framebuffers.get(image_index)
    }

    #[inline]
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }
}

// destroy
impl RenderTargets {
    /// 调用前需要确保 GPU 不再使用这些对象
    pub fn destroy(&mut self) {
        for framebuffer in self.framebuffers.drain(..).rev() {
            framebuffer.destroy();
        }
        if let Some(view) = self.depth_view.take() {
            view.destroy();
        }
        if let Some(image) = self.depth_image.take() {
            image.destroy();
        }
    }
}

impl Drop for RenderTargets {
    fn drop(&mut self) {
        debug_assert!(self.framebuffers.is_empty() && self.depth_image.is_none(), "RenderTargets is not destroyed");
    }
}
