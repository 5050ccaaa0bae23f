use std::ops::Deref;
use std::rc::Rc;

use ash::vk;
use vk_mem::Alloc;

use crate::error::{GfxResult, VkResultExt};
use crate::foundation::device::GfxDevice;
use crate::foundation::instance::GfxInstance;

/// 基于 vma 的显存分配器
///
/// memory type 先通过 [`GfxDevice::find_memory_type`] 线性查找确定，再通过 `memory_type_bits` 固定给 vma，
/// 因此每次分配落在哪个 memory type 上是确定的，找不到时返回 `NoSuitableMemoryType`。
pub struct GfxAllocator {
    inner: vk_mem::Allocator,
    device: Rc<GfxDevice>,
}

impl Deref for GfxAllocator {
    type Target = vk_mem::Allocator;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Drop for GfxAllocator {
    fn drop(&mut self) {
        log::info!("Destroying GfxAllocator");
        // vk_mem 是 RAII 的
    }
}

// new & init
impl GfxAllocator {
    /// 需要在 Instance 和 Device 都初始化完成之后创建，并且先于两者销毁
    pub fn new(instance: &GfxInstance, device: Rc<GfxDevice>) -> GfxResult<Self> {
        let mut vma_ci =
            vk_mem::AllocatorCreateInfo::new(instance.ash_instance(), device.handle(), device.pdevice().handle());
        vma_ci.vulkan_api_version = vk::API_VERSION_1_3;

        let vma = unsafe { vk_mem::Allocator::new(vma_ci) }.vk_err("vmaCreateAllocator")?;

        Ok(Self { inner: vma, device })
    }
}

// getters
impl GfxAllocator {
    #[inline]
    pub fn device(&self) -> &Rc<GfxDevice> {
        &self.device
    }
}

// tools
impl GfxAllocator {
    pub fn create_buffer(
        &self,
        buffer_ci: &vk::BufferCreateInfo,
        properties: vk::MemoryPropertyFlags,
    ) -> GfxResult<(vk::Buffer, vk_mem::Allocation)> {
        let mut requirements = vk::MemoryRequirements2::default();
        unsafe {
            self.device.get_device_buffer_memory_requirements(
                &vk::DeviceBufferMemoryRequirements::default().create_info(buffer_ci),
                &mut requirements,
            );
        }
        let alloc_ci = self.alloc_create_info(requirements.memory_requirements.memory_type_bits, properties)?;
        unsafe { self.inner.create_buffer(buffer_ci, &alloc_ci) }.vk_err("vmaCreateBuffer")
    }

    pub fn create_image(
        &self,
        image_ci: &vk::ImageCreateInfo,
        properties: vk::MemoryPropertyFlags,
    ) -> GfxResult<(vk::Image, vk_mem::Allocation)> {
        let mut requirements = vk::MemoryRequirements2::default();
        unsafe {
            self.device.get_device_image_memory_requirements(
                &vk::DeviceImageMemoryRequirements::default().create_info(image_ci),
                &mut requirements,
            );
        }
        let alloc_ci = self.alloc_create_info(requirements.memory_requirements.memory_type_bits, properties)?;
        unsafe { self.inner.create_image(image_ci, &alloc_ci) }.vk_err("vmaCreateImage")
    }

    fn alloc_create_info(
        &self,
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> GfxResult<vk_mem::AllocationCreateInfo> {
        let memory_type_index = self.device.find_memory_type(type_bits, properties)?;
        Ok(vk_mem::AllocationCreateInfo {
            usage: vk_mem::MemoryUsage::Unknown,
            required_flags: properties,
            memory_type_bits: 1 << memory_type_index,
            ..Default::default()
        })
    }
}
