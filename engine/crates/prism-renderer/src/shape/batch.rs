use ash::vk;
use prism_asset::catalog::TextureBinding;

use crate::error::{CollectError, RenderError};
use crate::recorder::DrawRecorder;

/// 共享同一个纹理（或没有纹理）的一段连续顶点，对应一次 descriptor 绑定和一次 draw
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawBatch {
    pub texture: Option<TextureBinding>,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub first_index: u32,
    /// 为 0 表示非 indexed 绘制
    pub index_count: u32,
}

/// 一帧内 `collect` 产生的数据，容量固定，超出时返回 [`CollectError::Overflow`] 而不是截断
pub struct ShapeOutput<V> {
    vertices: Vec<V>,
    indices: Vec<u32>,
    batches: Vec<DrawBatch>,
    push_constants: Vec<u8>,

    max_vertices: usize,
    max_indices: usize,
}

// new & init
impl<V: Copy> ShapeOutput<V> {
    pub fn new(max_vertices: usize, max_indices: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(max_vertices),
            indices: Vec::with_capacity(max_indices),
            batches: Vec::new(),
            push_constants: Vec::new(),
            max_vertices,
            max_indices,
        }
    }
}

// getters
impl<V: Copy> ShapeOutput<V> {
    #[inline]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn batches(&self) -> &[DrawBatch] {
        &self.batches
    }

    #[inline]
    pub fn push_constant_data(&self) -> &[u8] {
        &self.push_constants
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    #[inline]
    pub fn max_vertices(&self) -> usize {
        self.max_vertices
    }

    #[inline]
    pub fn max_indices(&self) -> usize {
        self.max_indices
    }
}

// update
impl<V: Copy> ShapeOutput<V> {
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.batches.clear();
        self.push_constants.clear();
    }

    /// 预先检查还能否容纳 `vertex_cnt` 个顶点，用于在写入之前就发现溢出
    pub fn ensure_vertex_room(&self, vertex_cnt: usize) -> Result<(), CollectError> {
        let requested = self.vertices.len() + vertex_cnt;
        if requested > self.max_vertices {
            return Err(CollectError::Overflow {
                what: "vertices",
                requested,
                capacity: self.max_vertices,
            });
        }
        Ok(())
    }

    fn ensure_index_room(&self, index_cnt: usize) -> Result<(), CollectError> {
        let requested = self.indices.len() + index_cnt;
        if requested > self.max_indices {
            return Err(CollectError::Overflow {
                what: "indices",
                requested,
                capacity: self.max_indices,
            });
        }
        Ok(())
    }

    /// 追加非 indexed 的顶点
    ///
    /// 与上一个 batch 使用同一个纹理时合并到该 batch 中
    pub fn push_vertices(&mut self, texture: Option<TextureBinding>, vertices: &[V]) -> Result<(), CollectError> {
        self.ensure_vertex_room(vertices.len())?;

        let first_vertex = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);

        match self.batches.last_mut() {
            Some(last) if last.index_count == 0 && last.texture == texture => {
                last.vertex_count += vertices.len() as u32;
            }
            _ => self.batches.push(DrawBatch {
                texture,
                first_vertex,
                vertex_count: vertices.len() as u32,
                first_index: 0,
                index_count: 0,
            }),
        }
        Ok(())
    }

    /// 追加一段 indexed 几何，`indices` 相对于本段的第一个顶点，总是形成单独的 batch
    pub fn push_indexed(
        &mut self,
        texture: Option<TextureBinding>,
        vertices: &[V],
        indices: &[u32],
    ) -> Result<(), CollectError> {
        self.ensure_vertex_room(vertices.len())?;
        self.ensure_index_room(indices.len())?;

        self.batches.push(DrawBatch {
            texture,
            first_vertex: self.vertices.len() as u32,
            vertex_count: vertices.len() as u32,
            first_index: self.indices.len() as u32,
            index_count: indices.len() as u32,
        });
        self.vertices.extend_from_slice(vertices);
        self.indices.extend_from_slice(indices);
        Ok(())
    }

    pub fn set_push_constants(&mut self, data: &[u8]) {
        self.push_constants.clear();
        self.push_constants.extend_from_slice(data);
    }
}

/// `record` 所需的全部句柄与本帧数据
pub struct ShapeDraw<'a> {
    pub name: &'static str,
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    /// 不需要纹理的 renderer 为 null
    pub texture_set_layout: vk::DescriptorSetLayout,

    pub vertex_buffer: vk::Buffer,
    /// 当前 frame slot 的顶点区域起点（字节）
    pub vertex_offset: vk::DeviceSize,
    pub index_buffer: Option<(vk::Buffer, vk::DeviceSize)>,

    pub push_constant_stages: vk::ShaderStageFlags,
    pub push_constants: &'a [u8],
    pub batches: &'a [DrawBatch],
    pub vertex_count: u32,
}

/// 通用的录制流程：绑定 pipeline 与 buffer，每个 batch 绑定一次纹理并绘制一次
///
/// `vertex_count` 为 0 时不录制任何命令
pub fn record_batches(draw: &ShapeDraw, recorder: &mut dyn DrawRecorder) -> Result<(), RenderError> {
    if draw.vertex_count == 0 {
        return Ok(());
    }

    recorder.begin_label(draw.name);
    let result = record_batches_inner(draw, recorder);
    recorder.end_label();
    result
}

fn record_batches_inner(draw: &ShapeDraw, recorder: &mut dyn DrawRecorder) -> Result<(), RenderError> {
    recorder.bind_pipeline(draw.pipeline);
    recorder.bind_vertex_buffer(draw.vertex_buffer, draw.vertex_offset);
    if let Some((index_buffer, index_offset)) = draw.index_buffer {
        recorder.bind_index_buffer(index_buffer, index_offset, vk::IndexType::UINT32);
    }
    if !draw.push_constants.is_empty() {
        recorder.push_constants(draw.pipeline_layout, draw.push_constant_stages, draw.push_constants);
    }

    for batch in draw.batches {
        // 只绘制 vertex_count 以内的部分
        if batch.first_vertex >= draw.vertex_count {
            break;
        }
        if let Some(texture) = &batch.texture {
            recorder.bind_texture(draw.pipeline_layout, draw.texture_set_layout, texture)?;
        }
        if batch.index_count > 0 {
            recorder.draw_indexed(batch.index_count, batch.first_index, batch.first_vertex as i32);
        } else {
            let vertex_count = batch.vertex_count.min(draw.vertex_count - batch.first_vertex);
            recorder.draw(vertex_count, batch.first_vertex);
        }
    }
    Ok(())
}
