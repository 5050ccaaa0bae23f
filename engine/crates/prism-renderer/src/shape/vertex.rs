use std::mem::offset_of;

use ash::vk;
use prism_gfx::resources::vertex_layout::GfxVertexLayout;

#[inline]
fn attribute(location: u32, format: vk::Format, offset: usize) -> vk::VertexInputAttributeDescription {
    vk::VertexInputAttributeDescription {
        binding: 0,
        location,
        format,
        offset: offset as u32,
    }
}

/// 纯色图形：triangle、rect
#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColorVertex {
    /// clip space 的 xy，以及 depth
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl GfxVertexLayout for ColorVertex {
    fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(ColorVertex, position)),
            attribute(1, vk::Format::R32G32B32A32_SFLOAT, offset_of!(ColorVertex, color)),
        ]
    }
}

/// SDF 圆：`local` 是顶点在外接正方形中的坐标，范围 [-1, 1]
#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CircleVertex {
    pub position: [f32; 3],
    pub local: [f32; 2],
    pub color: [f32; 4],
}

impl GfxVertexLayout for CircleVertex {
    fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(CircleVertex, position)),
            attribute(1, vk::Format::R32G32_SFLOAT, offset_of!(CircleVertex, local)),
            attribute(2, vk::Format::R32G32B32A32_SFLOAT, offset_of!(CircleVertex, color)),
        ]
    }
}

/// 贴图图形：sprite、text
#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl GfxVertexLayout for TexturedVertex {
    fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(TexturedVertex, position)),
            attribute(1, vk::Format::R32G32_SFLOAT, offset_of!(TexturedVertex, uv)),
            attribute(2, vk::Format::R32G32B32A32_SFLOAT, offset_of!(TexturedVertex, color)),
        ]
    }
}

/// 3D mesh：位置已经在 CPU 端变换到 clip space，法线在世界空间
#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub clip_position: [f32; 4],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl GfxVertexLayout for MeshVertex {
    fn vertex_input_attributes() -> Vec<vk::VertexInputAttributeDescription> {
        vec![
            attribute(0, vk::Format::R32G32B32A32_SFLOAT, offset_of!(MeshVertex, clip_position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(MeshVertex, normal)),
            attribute(2, vk::Format::R32G32_SFLOAT, offset_of!(MeshVertex, uv)),
            attribute(3, vk::Format::R32G32B32A32_SFLOAT, offset_of!(MeshVertex, color)),
        ]
    }
}

/// 以原点为中心、半尺寸为 `half` 的矩形拆成两个三角形之后的 6 个角点，逆时针
pub(crate) fn quad_corners(half: glam::Vec2) -> [glam::Vec2; 6] {
    let (l, r, b, t) = (-half.x, half.x, -half.y, half.y);
    [
        glam::Vec2::new(l, b),
        glam::Vec2::new(r, b),
        glam::Vec2::new(r, t),
        glam::Vec2::new(l, b),
        glam::Vec2::new(r, t),
        glam::Vec2::new(l, t),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_offsets_fit_in_stride() {
        fn check<V: GfxVertexLayout>() {
            let stride = V::vertex_input_bindings()[0].stride;
            let attrs = V::vertex_input_attributes();
            assert!(attrs.iter().all(|a| a.offset < stride));
            // location 连续
            assert!(attrs.iter().enumerate().all(|(i, a)| a.location == i as u32));
        }
        check::<ColorVertex>();
        check::<CircleVertex>();
        check::<TexturedVertex>();
        check::<MeshVertex>();

        assert_eq!(size_of::<MeshVertex>(), 52);
        assert_eq!(MeshVertex::buffer_size(2), 104);
    }
}
