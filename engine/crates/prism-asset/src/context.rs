use std::rc::Rc;

use ash::vk;
use prism_gfx::GfxResult;
use prism_gfx::commands::command_buffer::GfxCommandBuffer;
use prism_gfx::commands::command_pool::GfxCommandPool;
use prism_gfx::commands::command_queue::GfxQueue;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::foundation::mem_allocator::GfxAllocator;

/// render 阶段确定下来的 attachment 信息
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderCaps {
    pub color_format: vk::Format,
    pub depth_format: vk::Format,
}

/// 资源 load / unload 所需的全部 GPU 对象
///
/// 拥有一个专门用于上传的 transient command pool，所有上传都是阻塞的 one-time submit
pub struct GpuUploadContext {
    device: Rc<GfxDevice>,
    allocator: Rc<GfxAllocator>,
    queue: GfxQueue,
    command_pool: GfxCommandPool,
    render_caps: RenderCaps,
}

// new & init
impl GpuUploadContext {
    pub fn new(
        device: Rc<GfxDevice>,
        allocator: Rc<GfxAllocator>,
        queue: GfxQueue,
        render_caps: RenderCaps,
    ) -> GfxResult<Self> {
        let command_pool = GfxCommandPool::new(
            device.clone(),
            queue.queue_family(),
            vk::CommandPoolCreateFlags::TRANSIENT,
            "asset-upload",
        )?;
        Ok(Self {
            device,
            allocator,
            queue,
            command_pool,
            render_caps,
        })
    }
}

// getters
impl GpuUploadContext {
    #[inline]
    pub fn device(&self) -> &Rc<GfxDevice> {
        &self.device
    }

    #[inline]
    pub fn allocator(&self) -> &Rc<GfxAllocator> {
        &self.allocator
    }

    #[inline]
    pub fn device_limits(&self) -> &vk::PhysicalDeviceLimits {
        self.device.limits()
    }

    #[inline]
    pub fn render_caps(&self) -> &RenderCaps {
        &self.render_caps
    }
}

// tools
impl GpuUploadContext {
    /// 录制并提交一个 command buffer，阻塞直到 GPU 执行完成
    pub fn one_time_exec<R>(&self, name: &str, func: impl FnOnce(&GfxCommandBuffer) -> R) -> GfxResult<R> {
        GfxCommandBuffer::one_time_exec(self.device.clone(), &self.command_pool, &self.queue, func, name)
    }
}
