use std::rc::Rc;

use ash::vk;

use crate::error::{GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;
use crate::resources::image::GfxImage;

/// 2D、单 mip、单 layer 的 view：纹理、depth image 以及 swapchain image 都只需要这一种
pub struct GfxImageView {
    handle: vk::ImageView,
    format: vk::Format,

    name: String,
    device: Rc<GfxDevice>,
}
impl DebugType for GfxImageView {
    fn debug_type_name() -> &'static str {
        "GfxImageView"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
// new & init
impl GfxImageView {
    /// format 与 aspect 跟随 image
    #[inline]
    pub fn for_image(device: Rc<GfxDevice>, image: &GfxImage, name: impl AsRef<str>) -> GfxResult<Self> {
        Self::new_2d(device, image.handle(), image.format(), image.aspect(), name)
    }

    /// swapchain image 不由 [`GfxImage`] 管理，只有裸句柄
    #[inline]
    pub fn for_swapchain_image(
        device: Rc<GfxDevice>,
        image: vk::Image,
        format: vk::Format,
        name: impl AsRef<str>,
    ) -> GfxResult<Self> {
        Self::new_2d(device, image, format, vk::ImageAspectFlags::COLOR, name)
    }

    fn new_2d(
        device: Rc<GfxDevice>,
        image: vk::Image,
        format: vk::Format,
        aspect_mask: vk::ImageAspectFlags,
        name: impl AsRef<str>,
    ) -> GfxResult<Self> {
        let info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let handle = unsafe { device.create_image_view(&info, None) }.vk_err("vkCreateImageView")?;
        let view = Self {
            handle,
            format,
            name: name.as_ref().to_string(),
            device,
        };
        view.device.set_debug_name(&view, &view.name);
        Ok(view)
    }
}
// getters
impl GfxImageView {
    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }
}
// destroy
impl GfxImageView {
    pub fn destroy(mut self) {
        log::debug!("Destroying GfxImageView: {}", self.name);
        unsafe {
            self.device.destroy_image_view(self.handle, None);
        }
        self.handle = vk::ImageView::null();
    }
}
impl Drop for GfxImageView {
    fn drop(&mut self) {
        debug_assert!(self.handle == vk::ImageView::null(), "GfxImageView {} is not destroyed", self.name);
    }
}
