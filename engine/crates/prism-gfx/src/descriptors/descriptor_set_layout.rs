use std::rc::Rc;

use ash::vk;

use crate::error::{GfxResult, VkResultExt};
use crate::foundation::device::GfxDevice;

/// 描述符集布局
///
/// 纹理类的 shape 只需要一个 binding：fragment shader 中的 combined image sampler
pub struct GfxDescriptorSetLayout {
    /// Vulkan 描述符集布局句柄
    layout: vk::DescriptorSetLayout,

    device: Rc<GfxDevice>,
}
impl Drop for GfxDescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            log::debug!("Destroying GfxDescriptorSetLayout");
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

impl GfxDescriptorSetLayout {
    pub fn new(
        device: Rc<GfxDevice>,
        bindings: &[vk::DescriptorSetLayoutBinding],
        debug_name: &str,
    ) -> GfxResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);
        let layout = unsafe { device.create_descriptor_set_layout(&create_info, None) }
            .vk_err("vkCreateDescriptorSetLayout")?;
        device.set_object_debug_name(layout, debug_name);
        Ok(Self { layout, device })
    }

    /// binding 0：fragment shader 采样的纹理
    pub fn new_single_texture(device: Rc<GfxDevice>, debug_name: &str) -> GfxResult<Self> {
        let binding = vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT);
        Self::new(device, std::slice::from_ref(&binding), debug_name)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}
