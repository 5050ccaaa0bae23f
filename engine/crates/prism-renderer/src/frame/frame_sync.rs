use std::rc::Rc;

use ash::vk;
use prism_gfx::GfxResult;
use prism_gfx::commands::command_buffer::GfxCommandBuffer;
use prism_gfx::commands::command_pool::GfxCommandPool;
use prism_gfx::commands::fence::GfxFence;
use prism_gfx::commands::semaphore::GfxSemaphore;
use prism_gfx::descriptors::descriptor_pool::GfxDescriptorPool;
use prism_gfx::foundation::device::GfxDevice;

/// 一个 frame slot 的同步对象与录制资源，slot 与 swapchain image 一一对应
pub struct FrameSlot {
    pub cmd: GfxCommandBuffer,
    /// 创建时即为 signaled，第一次等待不会阻塞
    pub in_flight: GfxFence,
    /// acquire 时由 swapchain signal，submit 时等待
    pub image_available: GfxSemaphore,
    /// submit 时 signal，present 时等待
    pub render_finished: GfxSemaphore,
    /// 该 slot 所有纹理 descriptor set 的来源，fence 等待完成之后整体 reset
    pub descriptor_pool: GfxDescriptorPool,
}

/// 所有 frame slot，以及一个用于下一次 acquire 的备用 semaphore
///
/// acquire 之前并不知道会拿到哪个 image，因此总是用备用的 semaphore 去 acquire，
/// 拿到 image index 之后再与对应 slot 的 `image_available` 交换。
pub struct FrameSync {
    command_pool: GfxCommandPool,
    slots: Vec<FrameSlot>,
    spare_acquire_semaphore: Option<GfxSemaphore>,
}

// new & init
impl FrameSync {
    pub fn new(device: &Rc<GfxDevice>, slot_count: usize, max_texture_binds: u32) -> GfxResult<Self> {
        let command_pool = GfxCommandPool::new(
            device.clone(),
            device.gfx_queue_family(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            "frame",
        )?;

        let mut sync = Self {
            command_pool,
            slots: Vec::with_capacity(slot_count),
            spare_acquire_semaphore: None,
        };
        if let Err(e) = sync.create_objects(device, slot_count, max_texture_binds) {
            sync.destroy();
            return Err(e);
        }
        Ok(sync)
    }

    fn create_objects(&mut self, device: &Rc<GfxDevice>, slot_count: usize, max_texture_binds: u32) -> GfxResult<()> {
        self.spare_acquire_semaphore = Some(GfxSemaphore::new(device.clone(), "image-available-spare")?);
        for i in 0..slot_count {
            let cmd = GfxCommandBuffer::new(device.clone(), &self.command_pool, &format!("frame-{i}"))?;
            let in_flight = GfxFence::new(device.clone(), true, &format!("in-flight-{i}"))?;
            let image_available = match GfxSemaphore::new(device.clone(), &format!("image-available-{i}")) {
                Ok(s) => s,
                Err(e) => {
                    in_flight.destroy();
                    return Err(e);
                }
            };
            let render_finished = match GfxSemaphore::new(device.clone(), &format!("render-finished-{i}")) {
                Ok(s) => s,
                Err(e) => {
                    in_flight.destroy();
                    image_available.destroy();
                    return Err(e);
                }
            };
            let descriptor_pool =
                match GfxDescriptorPool::new_texture_pool(device.clone(), max_texture_binds.max(1), &format!("frame-{i}")) {
                    Ok(pool) => pool,
                    Err(e) => {
                        in_flight.destroy();
                        image_available.destroy();
                        render_finished.destroy();
                        return Err(e);
                    }
                };
            self.slots.push(FrameSlot {
                cmd,
                in_flight,
                image_available,
                render_finished,
                descriptor_pool,
            });
        }
        Ok(())
    }
}

// getters
impl FrameSync {
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    #[inline]
    pub fn spare_acquire_semaphore(&self) -> Option<&GfxSemaphore> {
        self.spare_acquire_semaphore.as_ref()
    }
}

// update
impl FrameSync {
    /// acquire 成功之后调用：刚被 signal 的备用 semaphore 成为该 slot 的 `image_available`
    pub fn swap_acquire_semaphore(&mut self, index: usize) {
        if let (Some(slot), Some(spare)) = (self.slots.get_mut(index), self.spare_acquire_semaphore.as_mut()) {
            std::mem::swap(&mut slot.image_available, spare);
        }
    }
}

// destroy
impl FrameSync {
    /// 调用前需要确保 device 已经 idle
    pub fn destroy(&mut self) {
        for slot in self.slots.drain(..).rev() {
            slot.in_flight.destroy();
            slot.image_available.destroy();
            slot.render_finished.destroy();
        }
        if let Some(spare) = self.spare_acquire_semaphore.take() {
            spare.destroy();
        }
    }
}
