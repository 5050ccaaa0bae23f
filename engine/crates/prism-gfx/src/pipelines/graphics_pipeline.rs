use std::ffi::CStr;
use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::error::{GfxError, GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::device::GfxDevice;
use crate::pipelines::render_pass::GfxRenderPass;
use crate::pipelines::shader::{GfxShaderModule, SHADER_ENTRY_POINT};
use crate::resources::vertex_layout::GfxVertexLayout;

pub struct GfxShaderStageInfo {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry_point: &'static CStr,
}

pub struct GfxGraphicsPipelineCreateInfo {
    descriptor_set_layouts: Vec<vk::DescriptorSetLayout>,

    push_constant_ranges: Vec<vk::PushConstantRange>,

    shader_stages: Vec<GfxShaderStageInfo>,

    vertex_binding_desc: Vec<vk::VertexInputBindingDescription>,
    vertex_attribute_desec: Vec<vk::VertexInputAttributeDescription>,

    primitive_topology: vk::PrimitiveTopology,

    cull_mode: vk::CullModeFlags,

    color_attach_blend_state: vk::PipelineColorBlendAttachmentState,

    depth_test: bool,
    depth_write: bool,

    dynamic_states: Vec<vk::DynamicState>,
}

impl Default for GfxGraphicsPipelineCreateInfo {
    fn default() -> Self {
        Self {
            descriptor_set_layouts: vec![],
            push_constant_ranges: vec![],
            shader_stages: vec![],

            vertex_binding_desc: vec![],
            vertex_attribute_desec: vec![],

            primitive_topology: vk::PrimitiveTopology::TRIANGLE_LIST,

            // 2D 图元的绕序由用户决定，默认不剔除
            cull_mode: vk::CullModeFlags::NONE,

            color_attach_blend_state: Self::opaque_blend_state(),

            depth_test: true,
            depth_write: true,

            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
        }
    }
}

impl GfxGraphicsPipelineCreateInfo {
    /// builder
    #[inline]
    pub fn vertex_shader_stage(&mut self, module: &GfxShaderModule) -> &mut Self {
        self.shader_stages.push(GfxShaderStageInfo {
            stage: vk::ShaderStageFlags::VERTEX,
            module: module.handle(),
            entry_point: SHADER_ENTRY_POINT,
        });
        self
    }

    /// builder
    #[inline]
    pub fn fragment_shader_stage(&mut self, module: &GfxShaderModule) -> &mut Self {
        self.shader_stages.push(GfxShaderStageInfo {
            stage: vk::ShaderStageFlags::FRAGMENT,
            module: module.handle(),
            entry_point: SHADER_ENTRY_POINT,
        });
        self
    }

    /// builder
    #[inline]
    pub fn vertex_layout<V: GfxVertexLayout>(&mut self) -> &mut Self {
        self.vertex_binding_desc = V::vertex_input_bindings();
        self.vertex_attribute_desec = V::vertex_input_attributes();
        self
    }

    /// builder
    ///
    /// 开启 alpha blend：src_alpha, one_minus_src_alpha
    #[inline]
    pub fn alpha_blend(&mut self) -> &mut Self {
        self.color_attach_blend_state = vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .alpha_blend_op(vk::BlendOp::ADD)
            .color_write_mask(vk::ColorComponentFlags::RGBA);
        self
    }

    /// builder
    #[inline]
    pub fn depth_state(&mut self, depth_test: bool, depth_write: bool) -> &mut Self {
        self.depth_test = depth_test;
        self.depth_write = depth_write;
        self
    }

    /// builder
    #[inline]
    pub fn cull_mode(&mut self, cull_mode: vk::CullModeFlags) -> &mut Self {
        self.cull_mode = cull_mode;
        self
    }

    /// builder
    #[inline]
    pub fn push_constant_ranges(&mut self, ranges: Vec<vk::PushConstantRange>) -> &mut Self {
        self.push_constant_ranges = ranges;
        self
    }

    /// builder
    #[inline]
    pub fn descriptor_set_layouts(&mut self, layouts: Vec<vk::DescriptorSetLayout>) -> &mut Self {
        self.descriptor_set_layouts = layouts;
        self
    }

    fn opaque_blend_state() -> vk::PipelineColorBlendAttachmentState {
        vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)
    }
}

pub struct GfxGraphicsPipeline {
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,

    device: Rc<GfxDevice>,
}

impl GfxGraphicsPipeline {
    pub fn new(
        device: Rc<GfxDevice>,
        create_info: &GfxGraphicsPipelineCreateInfo,
        render_pass: &GfxRenderPass,
        debug_name: &str,
    ) -> GfxResult<Self> {
        let pipeline_layout = {
            let pipeline_layout_create_info = vk::PipelineLayoutCreateInfo::default()
                .set_layouts(&create_info.descriptor_set_layouts)
                .push_constant_ranges(&create_info.push_constant_ranges);
            unsafe { device.create_pipeline_layout(&pipeline_layout_create_info, None) }
                .vk_err("vkCreatePipelineLayout")?
        };
        device.set_object_debug_name(pipeline_layout, debug_name);

        let shader_stages_info = create_info
            .shader_stages
            .iter()
            .map(|stage| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage.stage)
                    .module(stage.module)
                    .name(stage.entry_point)
            })
            .collect_vec();

        // 顶点和 index
        let vertex_input_state_info = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&create_info.vertex_binding_desc)
            .vertex_attribute_descriptions(&create_info.vertex_attribute_desec);

        let input_assembly_info = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(create_info.primitive_topology)
            .primitive_restart_enable(false);

        // viewport 和 scissor 具体值由 dynamic 决定，但是数量由该 create info 决定
        let viewport_info = vk::PipelineViewportStateCreateInfo {
            viewport_count: 1,
            scissor_count: 1,
            ..Default::default()
        };

        let rasterize_state_info = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(create_info.cull_mode)
            // 按照 OpenGL 的传统，将 CCW 视为 front face
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let msaa_info = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let color_blend_info = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(std::slice::from_ref(&create_info.color_attach_blend_state));

        // z 越大越靠近相机，映射之后 depth 越小
        let depth_stencil_info = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(create_info.depth_test)
            .depth_write_enable(create_info.depth_write)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(false);

        let dynamic_state_info =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&create_info.dynamic_states);

        // =======================================
        // === 创建 pipeline

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages_info)
            .vertex_input_state(&vertex_input_state_info)
            .input_assembly_state(&input_assembly_info)
            .viewport_state(&viewport_info)
            .rasterization_state(&rasterize_state_info)
            .multisample_state(&msaa_info)
            .color_blend_state(&color_blend_info)
            .depth_stencil_state(&depth_stencil_info)
            .layout(pipeline_layout)
            .dynamic_state(&dynamic_state_info)
            .render_pass(render_pass.handle())
            .subpass(0);

        let pipeline = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
        };
        let pipeline = match pipeline {
            Ok(pipelines) => pipelines[0],
            Err((_, result)) => {
                unsafe { device.destroy_pipeline_layout(pipeline_layout, None) };
                return Err(GfxError::Vulkan {
                    call: "vkCreateGraphicsPipelines",
                    result,
                });
            }
        };

        let pipeline = GfxGraphicsPipeline {
            pipeline,
            pipeline_layout,
            device,
        };
        pipeline.device.set_debug_name(&pipeline, debug_name);
        Ok(pipeline)
    }

    #[inline]
    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }
}

// destroy
impl GfxGraphicsPipeline {
    pub fn destroy(mut self) {
        log::debug!("Destroying GfxGraphicsPipeline");
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
        self.pipeline = vk::Pipeline::null();
    }
}
impl Drop for GfxGraphicsPipeline {
    fn drop(&mut self) {
        debug_assert!(self.pipeline == vk::Pipeline::null(), "GfxGraphicsPipeline is not destroyed");
    }
}

impl DebugType for GfxGraphicsPipeline {
    fn debug_type_name() -> &'static str {
        "GfxGraphicsPipeline"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.pipeline
    }
}
