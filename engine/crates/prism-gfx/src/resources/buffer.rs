use std::ptr;
use std::rc::Rc;

use ash::vk;

use crate::error::{GfxError, GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::mem_allocator::GfxAllocator;

pub struct GfxBuffer {
    handle: vk::Buffer,
    allocation: vk_mem::Allocation,

    size: vk::DeviceSize,

    /// 在初始化阶段写死，只有 HOST_VISIBLE 的 buffer 才会被 map
    map_ptr: Option<*mut u8>,

    debug_name: String,

    allocator: Rc<GfxAllocator>,
}
impl DebugType for GfxBuffer {
    fn debug_type_name() -> &'static str {
        "GfxBuffer"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
impl Drop for GfxBuffer {
    fn drop(&mut self) {
        log::debug!("Destroying GfxBuffer: {}", self.debug_name);
        unsafe {
            if self.map_ptr.is_some() {
                self.allocator.unmap_memory(&mut self.allocation);
            }

            self.allocator.destroy_buffer(self.handle, &mut self.allocation);
        }
    }
}
// init & destroy
impl GfxBuffer {
    /// - properties 包含 HOST_VISIBLE 时，buffer 会被持久 map
    pub fn new(
        allocator: Rc<GfxAllocator>,
        buffer_size: vk::DeviceSize,
        buffer_usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
        name: impl AsRef<str>,
    ) -> GfxResult<Self> {
        let buffer_ci = vk::BufferCreateInfo::default()
            .size(buffer_size)
            .usage(buffer_usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);
        let (buffer, mut alloc) = allocator.create_buffer(&buffer_ci, properties)?;

        let mut map_ptr = None;
        if properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE) {
            match unsafe { allocator.map_memory(&mut alloc) } {
                Ok(ptr) => map_ptr = Some(ptr),
                Err(e) => {
                    unsafe { allocator.destroy_buffer(buffer, &mut alloc) };
                    return Err(GfxError::Vulkan {
                        call: "vmaMapMemory",
                        result: e,
                    });
                }
            }
        }

        allocator.device().set_object_debug_name(buffer, format!("Buffer::{}", name.as_ref()));
        Ok(Self {
            handle: buffer,
            allocation: alloc,
            size: buffer_size,
            map_ptr,
            debug_name: name.as_ref().to_string(),
            allocator,
        })
    }

    /// 用于上传的临时 buffer
    #[inline]
    pub fn new_stage_buffer(
        allocator: Rc<GfxAllocator>,
        size: vk::DeviceSize,
        debug_name: impl AsRef<str>,
    ) -> GfxResult<Self> {
        Self::new(
            allocator,
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            debug_name,
        )
    }

    /// CPU 每帧写入的 buffer，例如 shape 的 vertex buffer
    #[inline]
    pub fn new_host_visible(
        allocator: Rc<GfxAllocator>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        debug_name: impl AsRef<str>,
    ) -> GfxResult<Self> {
        Self::new(
            allocator,
            size,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            debug_name,
        )
    }

    #[inline]
    pub fn destroy(self) {
        drop(self)
    }
}
// getter
impl GfxBuffer {
    #[inline]
    pub fn vk_buffer(&self) -> vk::Buffer {
        self.handle
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.debug_name
    }
}
// tools
impl GfxBuffer {
    /// 通过 mem map 的方式将 data 写入 buffer 的 `offset` 处
    ///
    /// 越界时返回错误，不会写入任何数据
    pub fn write_bytes(&self, offset: vk::DeviceSize, data: &[u8]) -> GfxResult<()> {
        let map_ptr = self.map_ptr.ok_or_else(|| GfxError::NotHostVisible {
            name: self.debug_name.clone(),
        })?;
        let end = offset + data.len() as vk::DeviceSize;
        if end > self.size {
            return Err(GfxError::BufferOverflow {
                name: self.debug_name.clone(),
                offset,
                len: data.len() as u64,
                size: self.size,
            });
        }

        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), map_ptr.add(offset as usize), data.len());
        }
        self.allocator
            .flush_allocation(&self.allocation, offset, data.len() as vk::DeviceSize)
            .vk_err("vmaFlushAllocation")
    }

    #[inline]
    pub fn write_slice<T: bytemuck::Pod>(&self, offset: vk::DeviceSize, data: &[T]) -> GfxResult<()> {
        self.write_bytes(offset, bytemuck::cast_slice(data))
    }
}
