use std::rc::Rc;

use ash::vk;
use prism_gfx::descriptors::descriptor_set_layout::GfxDescriptorSetLayout;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::foundation::mem_allocator::GfxAllocator;
use prism_gfx::pipelines::graphics_pipeline::{GfxGraphicsPipeline, GfxGraphicsPipelineCreateInfo};
use prism_gfx::pipelines::render_pass::GfxRenderPass;
use prism_gfx::resources::buffer::GfxBuffer;
use prism_gfx::resources::vertex_layout::GfxVertexLayout;

use crate::error::RenderError;
use crate::recorder::DrawRecorder;
use crate::shader_library::ShaderLibrary;
use crate::shape::{CollectContext, ShapeHandles, ShapeKind, ShapePipelineDesc, ShapeRenderer, ShapeState};

/// 创建 shape renderer 所需的 GPU 对象
pub struct ShapeInitContext<'a> {
    pub device: &'a Rc<GfxDevice>,
    pub allocator: &'a Rc<GfxAllocator>,
    pub render_pass: &'a GfxRenderPass,
    pub shaders: &'a ShaderLibrary,
    /// 所有带纹理的 renderer 共享的 set 0 布局
    pub texture_set_layout: &'a GfxDescriptorSetLayout,
    /// 顶点 buffer 按 slot 划分为互不重叠的区域，与 swapchain image 数量相同
    pub slot_count: usize,
}

/// 一类图形的 GPU 部分：pipeline 与按 slot 划分的 host visible buffer
///
/// slot `i` 的顶点写入 `[i * vertex_region, (i + 1) * vertex_region)`，
/// 因此 CPU 写入当前 slot 时不会覆盖仍在被 GPU 读取的其他 slot。
pub struct ShapePass<K: ShapeKind> {
    state: ShapeState<K>,

    pipeline: GfxGraphicsPipeline,
    texture_set_layout: vk::DescriptorSetLayout,

    vertex_buffer: GfxBuffer,
    vertex_region: vk::DeviceSize,
    index_buffer: Option<GfxBuffer>,
    index_region: vk::DeviceSize,

    slot_count: usize,
}

// new & init
impl<K: ShapeKind> ShapePass<K> {
    pub fn init(
        ctx: &ShapeInitContext,
        kind: K,
        max_vertices: usize,
        max_indices: usize,
    ) -> Result<Self, RenderError> {
        let desc = kind.pipeline_desc();
        let max_indices = if desc.indexed { max_indices } else { 0 };
        let slot_count = ctx.slot_count.max(1) as vk::DeviceSize;

        let pipeline = Self::create_pipeline(ctx, &desc)?;

        let vertex_region = K::Vertex::buffer_size(max_vertices);
        let vertex_buffer = match GfxBuffer::new_host_visible(
            ctx.allocator.clone(),
            (vertex_region * slot_count).max(1),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            format!("{}-vertex", K::NAME),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                pipeline.destroy();
                return Err(e.into());
            }
        };

        let index_region = (max_indices * size_of::<u32>()) as vk::DeviceSize;
        let index_buffer = if desc.indexed {
            match GfxBuffer::new_host_visible(
                ctx.allocator.clone(),
                (index_region * slot_count).max(1),
                vk::BufferUsageFlags::INDEX_BUFFER,
                format!("{}-index", K::NAME),
            ) {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    pipeline.destroy();
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        log::info!(
            "{} renderer: {} vertices, {} indices per slot, {} slots",
            K::NAME,
            max_vertices,
            max_indices,
            slot_count
        );

        Ok(Self {
            state: ShapeState::new(kind, max_vertices, max_indices),
            pipeline,
            texture_set_layout: if desc.textured {
                ctx.texture_set_layout.handle()
            } else {
                vk::DescriptorSetLayout::null()
            },
            vertex_buffer,
            vertex_region,
            index_buffer,
            index_region,
            slot_count: slot_count as usize,
        })
    }

    /// shader module 只在创建 pipeline 期间存在
    fn create_pipeline(ctx: &ShapeInitContext, desc: &ShapePipelineDesc) -> Result<GfxGraphicsPipeline, RenderError> {
        let shaders = ctx.shaders.load(ctx.device, desc.shader)?;

        let mut ci = GfxGraphicsPipelineCreateInfo::default();
        ci.vertex_shader_stage(&shaders.vertex)
            .fragment_shader_stage(&shaders.fragment)
            .vertex_layout::<K::Vertex>()
            .depth_state(desc.depth_test, desc.depth_write);
        if desc.alpha_blend {
            ci.alpha_blend();
        }
        if desc.textured {
            ci.descriptor_set_layouts(vec![ctx.texture_set_layout.handle()]);
        }
        if desc.push_constant_size > 0 {
            ci.push_constant_ranges(vec![vk::PushConstantRange {
                stage_flags: desc.push_constant_stages,
                offset: 0,
                size: desc.push_constant_size,
            }]);
        }

        let pipeline = GfxGraphicsPipeline::new(ctx.device.clone(), &ci, ctx.render_pass, K::NAME);
        shaders.destroy();
        Ok(pipeline?)
    }
}

// getters
impl<K: ShapeKind> ShapePass<K> {
    #[inline]
    pub fn state(&self) -> &ShapeState<K> {
        &self.state
    }

    fn handles(&self, slot: usize) -> ShapeHandles {
        let slot = slot as vk::DeviceSize;
        ShapeHandles {
            pipeline: self.pipeline.pipeline(),
            pipeline_layout: self.pipeline.layout(),
            texture_set_layout: self.texture_set_layout,
            vertex_buffer: self.vertex_buffer.vk_buffer(),
            vertex_offset: slot * self.vertex_region,
            index_buffer: self.index_buffer.as_ref().map(|b| (b.vk_buffer(), slot * self.index_region)),
        }
    }
}

impl<K: ShapeKind> ShapeRenderer for ShapePass<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn collect(&mut self, ctx: &CollectContext, world: &hecs::World, slot: usize) -> Result<u32, RenderError> {
        if slot >= self.slot_count {
            return Err(RenderError::SlotCountMismatch {
                images: slot + 1,
                slots: self.slot_count,
            });
        }

        let count = self.state.collect(ctx, world);
        if count == 0 {
            return Ok(0);
        }

        let output = self.state.output();
        self.vertex_buffer.write_slice(slot as vk::DeviceSize * self.vertex_region, output.vertices())?;
        if let Some(index_buffer) = &self.index_buffer {
            index_buffer.write_slice(slot as vk::DeviceSize * self.index_region, output.indices())?;
        }
        Ok(count)
    }

    fn record(&self, recorder: &mut dyn DrawRecorder, slot: usize, vertex_count: u32) {
        if slot >= self.slot_count {
            log::error!("{} renderer: slot {} is out of range", K::NAME, slot);
            return;
        }
        self.state.record(&self.handles(slot), vertex_count, recorder);
    }

    fn deinit(self: Box<Self>) {
        log::debug!("Destroying {} renderer", K::NAME);
        let this = *self;
        this.pipeline.destroy();
        this.vertex_buffer.destroy();
        if let Some(index_buffer) = this.index_buffer {
            index_buffer.destroy();
        }
    }
}
