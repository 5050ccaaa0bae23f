use ash::vk;
use glam::{Vec2, Vec3};

use crate::components::Camera2d;

/// 2D 图形可用的 z 范围，z 越大越靠前
pub const Z_NEAREST: f32 = 1000.0;
pub const Z_FARTHEST: f32 = -1000.0;

/// z → depth，固定的线性映射，配合 `CompareOp::LESS` 使 z 大的图形遮挡 z 小的图形
#[inline]
pub fn depth_from_z(z: f32) -> f32 {
    ((Z_NEAREST - z) / (Z_NEAREST - Z_FARTHEST)).clamp(0.0, 1.0)
}

/// 逻辑像素 → clip space
///
/// 逻辑尺寸 = 物理尺寸 / scale factor，因此同一个图形在不同 DPI 下的视觉大小一致。
/// 屏幕中心对应相机的 `offset`，世界坐标 y 向上，vulkan clip space 的 y 向下。
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenProjection {
    half_logical: Vec2,
    offset: Vec2,
    zoom: f32,
}

// new & init
impl ScreenProjection {
    pub fn new(physical_extent: vk::Extent2D, scale_factor: f64, camera: &Camera2d) -> Self {
        let scale_factor = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        let logical = Vec2::new(physical_extent.width as f32, physical_extent.height as f32) / scale_factor as f32;
        Self {
            half_logical: (logical * 0.5).max(Vec2::ONE),
            offset: camera.offset,
            zoom: camera.zoom,
        }
    }
}

// getters
impl ScreenProjection {
    #[inline]
    pub fn logical_size(&self) -> Vec2 {
        self.half_logical * 2.0
    }
}

// tools
impl ScreenProjection {
    #[inline]
    pub fn to_clip(&self, world: Vec3) -> Vec3 {
        let p = (world.truncate() - self.offset) * self.zoom / self.half_logical;
        Vec3::new(p.x, -p.y, depth_from_z(world.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    #[test]
    fn test_camera_offset_is_screen_center() {
        let camera = Camera2d {
            offset: Vec2::new(50.0, -20.0),
            zoom: 1.0,
        };
        let proj = ScreenProjection::new(extent(800, 600), 1.0, &camera);
        let clip = proj.to_clip(Vec3::new(50.0, -20.0, 0.0));
        assert_eq!(clip.truncate(), Vec2::ZERO);
    }

    #[test]
    fn test_logical_pixels_ignore_scale_factor() {
        // 800x600 的物理尺寸，scale factor 为 2 时逻辑尺寸为 400x300
        let proj = ScreenProjection::new(extent(800, 600), 2.0, &Camera2d::default());
        assert_eq!(proj.logical_size(), Vec2::new(400.0, 300.0));

        let right_top = proj.to_clip(Vec3::new(200.0, 150.0, 0.0));
        assert_eq!(right_top.truncate(), Vec2::new(1.0, -1.0));
    }

    #[test]
    fn test_zoom_scales_around_offset() {
        let camera = Camera2d {
            offset: Vec2::ZERO,
            zoom: 2.0,
        };
        let proj = ScreenProjection::new(extent(400, 400), 1.0, &camera);
        assert_eq!(proj.to_clip(Vec3::new(100.0, 0.0, 0.0)).x, 1.0);
    }

    #[test]
    fn test_larger_z_is_closer() {
        assert!(depth_from_z(10.0) < depth_from_z(0.0));
        assert_eq!(depth_from_z(Z_NEAREST), 0.0);
        assert_eq!(depth_from_z(Z_FARTHEST), 1.0);
        // 超出范围的 z 被截断
        assert_eq!(depth_from_z(5000.0), 0.0);
    }

    #[test]
    fn test_zero_extent_does_not_divide_by_zero() {
        let proj = ScreenProjection::new(extent(0, 0), 1.0, &Camera2d::default());
        assert!(proj.to_clip(Vec3::new(1.0, 1.0, 0.0)).is_finite());
    }
}
