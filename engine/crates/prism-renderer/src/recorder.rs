use ash::vk;
use prism_asset::catalog::TextureBinding;
use prism_gfx::basic::color::LabelColor;
use prism_gfx::commands::command_buffer::GfxCommandBuffer;
use prism_gfx::descriptors::descriptor_pool::GfxDescriptorPool;

use crate::error::RenderError;

/// shape renderer 在 `record` 时能够使用的全部命令
///
/// 真实环境下由 [`VulkanRecorder`] 写入 command buffer；
/// 这一层抽象让 shape renderer 的绘制逻辑可以脱离 GPU 进行测试。
pub trait DrawRecorder {
    fn begin_label(&mut self, name: &str);

    fn end_label(&mut self);

    fn bind_pipeline(&mut self, pipeline: vk::Pipeline);

    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize);

    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType);

    fn push_constants(&mut self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, data: &[u8]);

    /// 从当前帧的 descriptor pool 中分配一个 set，写入纹理之后绑定到 set 0
    fn bind_texture(
        &mut self,
        layout: vk::PipelineLayout,
        set_layout: vk::DescriptorSetLayout,
        texture: &TextureBinding,
    ) -> Result<(), RenderError>;

    fn draw(&mut self, vertex_count: u32, first_vertex: u32);

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32);
}

/// 写入真实 command buffer 的 recorder
///
/// descriptor pool 属于当前 frame slot，在该 slot 的 fence 等待完成之后整体 reset
pub struct VulkanRecorder<'a> {
    cmd: &'a GfxCommandBuffer,
    descriptor_pool: &'a GfxDescriptorPool,
}

// new & init
impl<'a> VulkanRecorder<'a> {
    pub fn new(cmd: &'a GfxCommandBuffer, descriptor_pool: &'a GfxDescriptorPool) -> Self {
        Self { cmd, descriptor_pool }
    }
}

impl DrawRecorder for VulkanRecorder<'_> {
    #[inline]
    fn begin_label(&mut self, name: &str) {
        self.cmd.begin_label(name, LabelColor::COLOR_PASS);
    }

    #[inline]
    fn end_label(&mut self) {
        self.cmd.end_label();
    }

    #[inline]
    fn bind_pipeline(&mut self, pipeline: vk::Pipeline) {
        self.cmd.cmd_bind_pipeline(vk::PipelineBindPoint::GRAPHICS, pipeline);
    }

    #[inline]
    fn bind_vertex_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize) {
        self.cmd.cmd_bind_vertex_buffers(0, &[buffer], &[offset]);
    }

    #[inline]
    fn bind_index_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) {
        self.cmd.cmd_bind_index_buffer(buffer, offset, index_type);
    }

    #[inline]
    fn push_constants(&mut self, layout: vk::PipelineLayout, stages: vk::ShaderStageFlags, data: &[u8]) {
        self.cmd.cmd_push_constants(layout, stages, 0, data);
    }

    fn bind_texture(
        &mut self,
        layout: vk::PipelineLayout,
        set_layout: vk::DescriptorSetLayout,
        texture: &TextureBinding,
    ) -> Result<(), RenderError> {
        let set = self.descriptor_pool.allocate(set_layout)?;
        self.cmd.device().write_combined_image_sampler(set, 0, texture.view, texture.sampler);
        self.cmd.bind_descriptor_sets(vk::PipelineBindPoint::GRAPHICS, layout, 0, &[set]);
        Ok(())
    }

    #[inline]
    fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        self.cmd.cmd_draw(vertex_count, 1, first_vertex, 0);
    }

    #[inline]
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) {
        self.cmd.draw_indexed(index_count, first_index, 1, 0, vertex_offset);
    }
}
