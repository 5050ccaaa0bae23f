use ash::vk;
use glam::Vec4;
use prism_gfx::commands::command_queue::GfxQueue;
use prism_gfx::commands::submit_info::GfxSubmitInfo;
use prism_gfx::pipelines::render_pass::GfxRenderPass;
use prism_gfx::swapchain::render_swapchain::{GfxAcquire, GfxRenderSwapchain};

use crate::error::RenderError;
use crate::frame::frame_driver::FrameBackend;
use crate::frame::frame_sync::{FrameSlot, FrameSync};
use crate::frame::render_targets::RenderTargets;
use crate::recorder::{DrawRecorder, VulkanRecorder};

/// 基于 swapchain 的 [`FrameBackend`]，只在一帧之内借用各个对象
pub struct VulkanFrameBackend<'a> {
    pub swapchain: &'a GfxRenderSwapchain,
    pub sync: &'a mut FrameSync,
    pub targets: &'a RenderTargets,
    pub render_pass: &'a GfxRenderPass,
    pub queue: &'a GfxQueue,
}

impl VulkanFrameBackend<'_> {
    fn slot(&self, image_index: u32) -> Result<&FrameSlot, RenderError> {
        self.sync.slot(image_index as usize).ok_or(RenderError::MissingFrameSlot {
            index: image_index as usize,
            slots: self.sync.slot_count(),
        })
    }
}

impl FrameBackend for VulkanFrameBackend<'_> {
    fn acquire(&mut self) -> Result<GfxAcquire, RenderError> {
        let spare = self.sync.spare_acquire_semaphore().ok_or(RenderError::MissingFrameSlot {
            index: 0,
            slots: self.sync.slot_count(),
        })?;
        let acquire = self.swapchain.acquire_next_image(spare)?;

        if let GfxAcquire::Image { image_index, .. } = acquire {
            if image_index as usize >= self.sync.slot_count() {
                return Err(RenderError::SlotCountMismatch {
                    images: self.swapchain.image_count(),
                    slots: self.sync.slot_count(),
                });
            }
            self.sync.swap_acquire_semaphore(image_index as usize);
        }
        Ok(acquire)
    }

    fn wait_previous(&mut self, image_index: u32) -> Result<(), RenderError> {
        let slot = self.slot(image_index)?;
        slot.in_flight.wait()?;
        // 该 slot 上一次分配的 descriptor set 已经不再被 GPU 使用
        slot.descriptor_pool.reset()?;
        Ok(())
    }

    fn record(
        &mut self,
        image_index: u32,
        clear_color: Vec4,
        draw: &mut dyn FnMut(&mut dyn DrawRecorder) -> Result<(), RenderError>,
    ) -> Result<(), RenderError> {
        let slot = self.slot(image_index)?;
        let framebuffer = self.targets.framebuffer(image_index as usize).ok_or(RenderError::MissingFrameSlot {
            index: image_index as usize,
            slots: self.targets.framebuffer_count(),
        })?;
        let extent = self.targets.extent();
        let cmd = &slot.cmd;

        cmd.begin(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT, &format!("frame-{image_index}"))?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: clear_color.to_array(),
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent,
        };
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass.handle())
            .framebuffer(framebuffer.handle())
            .render_area(render_area)
            .clear_values(&clear_values);
        cmd.cmd_begin_render_pass(&begin_info);
        cmd.cmd_set_viewport(
            0,
            &[vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            }],
        );
        cmd.cmd_set_scissor(0, &[render_area]);

        let mut recorder = VulkanRecorder::new(cmd, &slot.descriptor_pool);
        let draw_result = draw(&mut recorder);

        cmd.cmd_end_render_pass();
        cmd.end()?;
        draw_result
    }

    fn submit(&mut self, image_index: u32) -> Result<(), RenderError> {
        let slot = self.slot(image_index)?;
        // 只有确定会提交时才 reset，否则下一次等待会永远阻塞
        slot.in_flight.reset()?;

        let submit_info = GfxSubmitInfo::new(std::slice::from_ref(&slot.cmd))
            .wait(&slot.image_available, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
            .signal(&slot.render_finished, vk::PipelineStageFlags2::ALL_COMMANDS);
        self.queue.submit(std::slice::from_ref(&submit_info), Some(&slot.in_flight))?;
        Ok(())
    }

    fn present(&mut self, image_index: u32) -> Result<bool, RenderError> {
        let slot = self.slot(image_index)?;
        Ok(self.swapchain.present_image(self.queue, image_index, &[&slot.render_finished])?)
    }
}
