use std::rc::Rc;

use ash::vk;

use crate::error::{GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

/// 描述符池
///
/// 每帧分配、每帧整体 reset，不单独释放 descriptor set
pub struct GfxDescriptorPool {
    handle: vk::DescriptorPool,
    max_sets: u32,

    device: Rc<GfxDevice>,
}
impl Drop for GfxDescriptorPool {
    fn drop(&mut self) {
        unsafe {
            log::debug!("Destroying GfxDescriptorPool");
            self.device.destroy_descriptor_pool(self.handle, None);
        }
    }
}

// new & init
impl GfxDescriptorPool {
    pub fn new(
        device: Rc<GfxDevice>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
        debug_name: &str,
    ) -> GfxResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default().max_sets(max_sets).pool_sizes(pool_sizes);
        let handle = unsafe { device.create_descriptor_pool(&create_info, None) }.vk_err("vkCreateDescriptorPool")?;
        let pool = Self {
            handle,
            max_sets,
            device,
        };
        pool.device.set_debug_name(&pool, debug_name);
        Ok(pool)
    }

    /// 只包含 combined image sampler 的池，每个 set 一个
    #[inline]
    pub fn new_texture_pool(device: Rc<GfxDevice>, max_sets: u32, debug_name: &str) -> GfxResult<Self> {
        let pool_size = vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: max_sets,
        };
        Self::new(device, max_sets, std::slice::from_ref(&pool_size), debug_name)
    }
}

// getters
impl GfxDescriptorPool {
    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.handle
    }

    #[inline]
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}

// tools
impl GfxDescriptorPool {
    /// 所有从该池分配的 set 都会失效，调用前必须确保 GPU 不再使用它们
    pub fn reset(&self) -> GfxResult<()> {
        unsafe { self.device.reset_descriptor_pool(self.handle, vk::DescriptorPoolResetFlags::empty()) }
            .vk_err("vkResetDescriptorPool")
    }

    pub fn allocate(&self, layout: vk::DescriptorSetLayout) -> GfxResult<vk::DescriptorSet> {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.handle)
            .set_layouts(std::slice::from_ref(&layout));
        let sets = unsafe { self.device.allocate_descriptor_sets(&alloc_info) }.vk_err("vkAllocateDescriptorSets")?;
        Ok(sets[0])
    }
}

impl DebugType for GfxDescriptorPool {
    fn debug_type_name() -> &'static str {
        "GfxDescriptorPool"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
