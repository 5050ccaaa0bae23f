use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::commands::fence::GfxFence;
use crate::commands::submit_info::GfxSubmitInfo;
use crate::error::{GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

#[derive(Debug, Clone)]
pub struct GfxQueueFamily {
    pub name: String,
    pub queue_family_index: u32,
    pub queue_flags: vk::QueueFlags,
    pub queue_count: u32,
}

/// graphics queue，同时用于 present 和资源上传
#[derive(Clone)]
pub struct GfxQueue {
    vk_queue: vk::Queue,
    queue_family: GfxQueueFamily,

    device: Rc<GfxDevice>,
}

// new & init
impl GfxQueue {
    pub fn new_gfx(device: Rc<GfxDevice>) -> Self {
        Self {
            vk_queue: device.gfx_queue_handle(),
            queue_family: device.gfx_queue_family().clone(),
            device,
        }
    }
}

// getters
impl GfxQueue {
    #[inline]
    pub fn handle(&self) -> vk::Queue {
        self.vk_queue
    }

    #[inline]
    pub fn queue_family(&self) -> &GfxQueueFamily {
        &self.queue_family
    }
}

// tools
impl GfxQueue {
    pub fn submit(&self, batches: &[GfxSubmitInfo], fence: Option<&GfxFence>) -> GfxResult<()> {
        let batches = batches.iter().map(|b| b.submit_info()).collect_vec();
        unsafe {
            self.device.queue_submit2(self.vk_queue, &batches, fence.map_or(vk::Fence::null(), |f| f.handle()))
        }
        .vk_err("vkQueueSubmit2")
    }

    /// 根据 specification，vkQueueWaitIdle 应该和 Fence 效率相同
    #[inline]
    pub fn wait_idle(&self) -> GfxResult<()> {
        unsafe { self.device.queue_wait_idle(self.vk_queue) }.vk_err("vkQueueWaitIdle")
    }
}

impl DebugType for GfxQueue {
    fn debug_type_name() -> &'static str {
        "GfxQueue"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.vk_queue
    }
}
