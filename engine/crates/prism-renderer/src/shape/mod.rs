//! shape renderer 框架
//!
//! 每一类图形实现 [`ShapeKind`]，只关心如何从 ECS 中收集顶点；
//! [`ShapeState`] 负责定长输出与溢出策略，[`pass::ShapePass`] 负责 pipeline 与 GPU buffer。
//! 帧驱动只通过对象安全的 [`ShapeRenderer`] 与它们交互，按注册顺序依次调用 `collect` 与 `record`。

pub mod batch;
pub mod circle;
pub mod mesh;
pub mod pass;
pub mod rect;
pub mod registry;
pub mod sprite;
pub mod text;
pub mod triangle;
pub mod vertex;

use ash::vk;
use glam::Mat4;
use prism_asset::AssetCatalog;
use prism_gfx::resources::vertex_layout::GfxVertexLayout;

use crate::components::{Camera2d, Camera3d, DirectionalLight};
use crate::error::{CollectError, RenderError};
use crate::projection::ScreenProjection;
use crate::recorder::DrawRecorder;
use batch::{ShapeDraw, ShapeOutput, record_batches};

/// `collect` 时可以读取的每帧数据
pub struct CollectContext<'a> {
    pub catalog: &'a AssetCatalog,
    pub projection: ScreenProjection,
    /// 3D 相机的 view * projection
    pub view_proj: Mat4,
    pub light: DirectionalLight,
}

// new & init
impl<'a> CollectContext<'a> {
    /// 相机与光源取 world 中的第一个，不存在时使用默认值
    pub fn from_world(
        world: &hecs::World,
        catalog: &'a AssetCatalog,
        physical_extent: vk::Extent2D,
        scale_factor: f64,
    ) -> Self {
        let camera2d = world.query::<&Camera2d>().iter().next().map(|(_, c)| *c).unwrap_or_default();
        let camera3d = world.query::<&Camera3d>().iter().next().map(|(_, c)| *c).unwrap_or_default();
        let light = world.query::<&DirectionalLight>().iter().next().map(|(_, l)| *l).unwrap_or_default();

        let aspect = physical_extent.width.max(1) as f32 / physical_extent.height.max(1) as f32;
        Self {
            catalog,
            projection: ScreenProjection::new(physical_extent, scale_factor, &camera2d),
            view_proj: camera3d.view_proj(aspect),
            light,
        }
    }
}

/// 每一类图形的固定管线状态
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShapePipelineDesc {
    /// shader 文件名前缀：`<shader>.vert.spv` 与 `<shader>.frag.spv`
    pub shader: &'static str,
    pub alpha_blend: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    /// 是否在 set 0 binding 0 使用一张纹理
    pub textured: bool,
    pub indexed: bool,
    pub push_constant_size: u32,
    pub push_constant_stages: vk::ShaderStageFlags,
}

impl ShapePipelineDesc {
    /// 不透明、开启深度测试与写入的纯色图形
    pub const fn opaque(shader: &'static str) -> Self {
        Self {
            shader,
            alpha_blend: false,
            depth_test: true,
            depth_write: true,
            textured: false,
            indexed: false,
            push_constant_size: 0,
            push_constant_stages: vk::ShaderStageFlags::empty(),
        }
    }

    /// 半透明的贴图图形：不参与深度测试与写入，总是叠加在已经绘制的内容之上
    pub const fn overlay(shader: &'static str) -> Self {
        Self {
            shader,
            alpha_blend: true,
            depth_test: false,
            depth_write: false,
            textured: true,
            indexed: false,
            push_constant_size: 0,
            push_constant_stages: vk::ShaderStageFlags::empty(),
        }
    }
}

/// 一类图形
pub trait ShapeKind: 'static {
    type Vertex: GfxVertexLayout;

    const NAME: &'static str;

    fn pipeline_desc(&self) -> ShapePipelineDesc;

    /// 读取 world 中匹配的实体，把顶点写入 `out`
    ///
    /// 超出容量时返回 [`CollectError::Overflow`]，此时 `out` 中的内容会被整体丢弃
    fn collect(
        &mut self,
        ctx: &CollectContext,
        world: &hecs::World,
        out: &mut ShapeOutput<Self::Vertex>,
    ) -> Result<(), CollectError>;

    fn record(&self, draw: &ShapeDraw, recorder: &mut dyn DrawRecorder) -> Result<(), RenderError> {
        record_batches(draw, recorder)
    }
}

/// 录制时使用的 GPU 句柄，顶点区域已经按 frame slot 偏移
#[derive(Debug, Copy, Clone)]
pub struct ShapeHandles {
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub texture_set_layout: vk::DescriptorSetLayout,
    pub vertex_buffer: vk::Buffer,
    pub vertex_offset: vk::DeviceSize,
    pub index_buffer: Option<(vk::Buffer, vk::DeviceSize)>,
}

/// 与 GPU 无关的部分：图形类型、本帧输出与溢出策略
pub struct ShapeState<K: ShapeKind> {
    kind: K,
    output: ShapeOutput<K::Vertex>,
}

// new & init
impl<K: ShapeKind> ShapeState<K> {
    pub fn new(kind: K, max_vertices: usize, max_indices: usize) -> Self {
        Self {
            kind,
            output: ShapeOutput::new(max_vertices, max_indices),
        }
    }
}

// getters
impl<K: ShapeKind> ShapeState<K> {
    #[inline]
    pub fn kind(&self) -> &K {
        &self.kind
    }

    #[inline]
    pub fn output(&self) -> &ShapeOutput<K::Vertex> {
        &self.output
    }
}

// update
impl<K: ShapeKind> ShapeState<K> {
    /// 返回本帧需要绘制的顶点数量
    ///
    /// 溢出时记录错误并返回 0，只放弃当前 renderer 的当前帧
    pub fn collect(&mut self, ctx: &CollectContext, world: &hecs::World) -> u32 {
        self.output.clear();
        match self.kind.collect(ctx, world, &mut self.output) {
            Ok(()) => self.output.vertex_count(),
            Err(e) => {
                log::error!("{} renderer: {}; nothing is drawn this frame", K::NAME, e);
                self.output.clear();
                0
            }
        }
    }

    /// 录制失败只影响当前 renderer，错误被记录之后返回
    pub fn record(&self, handles: &ShapeHandles, vertex_count: u32, recorder: &mut dyn DrawRecorder) {
        let desc = self.kind.pipeline_desc();
        let draw = ShapeDraw {
            name: K::NAME,
            pipeline: handles.pipeline,
            pipeline_layout: handles.pipeline_layout,
            texture_set_layout: handles.texture_set_layout,
            vertex_buffer: handles.vertex_buffer,
            vertex_offset: handles.vertex_offset,
            index_buffer: handles.index_buffer,
            push_constant_stages: desc.push_constant_stages,
            push_constants: self.output.push_constant_data(),
            batches: self.output.batches(),
            vertex_count: vertex_count.min(self.output.vertex_count()),
        };
        if let Err(e) = self.kind.record(&draw, recorder) {
            log::error!("{} renderer failed to record: {}", K::NAME, e);
        }
    }
}

/// 帧驱动看到的 shape renderer
pub trait ShapeRenderer {
    fn name(&self) -> &'static str;

    /// 收集本帧的几何，写入 `slot` 对应的顶点区域，返回顶点数量
    fn collect(&mut self, ctx: &CollectContext, world: &hecs::World, slot: usize) -> Result<u32, RenderError>;

    /// `vertex_count` 为 0 时不录制任何命令
    fn record(&self, recorder: &mut dyn DrawRecorder, slot: usize, vertex_count: u32);

    /// 必须在 device 销毁之前调用
    fn deinit(self: Box<Self>);
}

#[cfg(test)]
pub(crate) mod test_utils {
    use ash::vk;
    use ash::vk::Handle;
    use prism_asset::catalog::TextureBinding;
    use prism_asset::{AssetCatalog, CatalogEntry, TextureId};

    use super::*;

    pub fn handles() -> ShapeHandles {
        ShapeHandles {
            pipeline: vk::Pipeline::from_raw(1),
            pipeline_layout: vk::PipelineLayout::from_raw(2),
            texture_set_layout: vk::DescriptorSetLayout::from_raw(3),
            vertex_buffer: vk::Buffer::from_raw(4),
            vertex_offset: 0,
            index_buffer: Some((vk::Buffer::from_raw(5), 0)),
        }
    }

    pub fn texture_binding(raw: u64) -> TextureBinding {
        TextureBinding {
            view: vk::ImageView::from_raw(raw),
            sampler: vk::Sampler::from_raw(raw),
            extent: vk::Extent2D { width: 64, height: 64 },
        }
    }

    /// 包含白色纹理与 `ids` 中每个纹理的 catalog，纹理 view 的句柄值为 `id + 100`
    pub fn catalog_with_textures(ids: &[u32]) -> AssetCatalog {
        let mut catalog = AssetCatalog::default();
        catalog.publish(CatalogEntry::Texture(TextureId::WHITE, texture_binding(99)));
        for &id in ids {
            catalog.publish(CatalogEntry::Texture(TextureId(id), texture_binding(id as u64 + 100)));
        }
        catalog
    }

    pub fn context(catalog: &AssetCatalog) -> CollectContext<'_> {
        CollectContext::from_world(&hecs::World::new(), catalog, vk::Extent2D { width: 800, height: 600 }, 1.0)
    }
}
