use ash::vk;

/// 索引类型 Trait (u16 或 u32)
pub trait GfxIndexType: bytemuck::Pod {
    const VK_INDEX_TYPE: vk::IndexType;
}

impl GfxIndexType for u16 {
    const VK_INDEX_TYPE: vk::IndexType = vk::IndexType::UINT16;
}

impl GfxIndexType for u32 {
    const VK_INDEX_TYPE: vk::IndexType = vk::IndexType::UINT32;
}

/// Vertex Buffer 中顶点布局的 trait 定义
///
/// 所有 shape 都使用单个 binding 的 AoS 布局
pub trait GfxVertexLayout: bytemuck::Pod {
    fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription>;

    fn vertex_input_bindings() -> Vec<vk::VertexInputBindingDescription> {
        vec![vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }]
    }

    /// 整个 Buffer 的大小
    #[inline]
    fn buffer_size(vertex_cnt: usize) -> vk::DeviceSize {
        (vertex_cnt * size_of::<Self>()) as vk::DeviceSize
    }
}
