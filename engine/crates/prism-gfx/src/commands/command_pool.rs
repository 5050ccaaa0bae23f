use std::rc::Rc;

use ash::vk;

use crate::commands::command_queue::GfxQueueFamily;
use crate::error::{GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;

/// command pool 是和 queue family 绑定的，而不是和 queue 绑定的
pub struct GfxCommandPool {
    handle: vk::CommandPool,
    device: Rc<GfxDevice>,

    debug_name: String,
}

// new & init
impl GfxCommandPool {
    pub fn new(
        device: Rc<GfxDevice>,
        queue_family: &GfxQueueFamily,
        flags: vk::CommandPoolCreateFlags,
        debug_name: &str,
    ) -> GfxResult<Self> {
        let pool = unsafe {
            device.create_command_pool(
                &vk::CommandPoolCreateInfo::default().queue_family_index(queue_family.queue_family_index).flags(flags),
                None,
            )
        }
        .vk_err("vkCreateCommandPool")?;

        let command_pool = Self {
            handle: pool,
            device,
            debug_name: debug_name.to_string(),
        };
        command_pool.device.set_debug_name(&command_pool, debug_name);
        Ok(command_pool)
    }
}

// getters
impl GfxCommandPool {
    #[inline]
    pub fn handle(&self) -> vk::CommandPool {
        self.handle
    }

    #[inline]
    pub fn device(&self) -> &Rc<GfxDevice> {
        &self.device
    }
}

impl DebugType for GfxCommandPool {
    fn debug_type_name() -> &'static str {
        "GfxCommandPool"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

impl Drop for GfxCommandPool {
    fn drop(&mut self) {
        log::info!("Destroying GfxCommandPool: {}", self.debug_name);
        // pool 内的 command buffer 会一起释放
        unsafe {
            self.device.destroy_command_pool(self.handle, None);
        }
    }
}
