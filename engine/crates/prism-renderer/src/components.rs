//! renderer 能够识别的 ECS 组件
//!
//! 2D 图形的坐标单位是逻辑像素（与 DPI 无关），y 轴向上；`translation.z` 决定深度，越大越靠前。

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use prism_asset::{FontId, ModelId, TextureId};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

// new & init
impl Transform {
    #[inline]
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Default::default()
        }
    }

    /// builder
    #[inline]
    pub fn with_rotation_z(mut self, radians: f32) -> Self {
        self.rotation = Quat::from_rotation_z(radians);
        self
    }

    /// builder
    #[inline]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }
}

// tools
impl Transform {
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// 将 2D 局部坐标（逻辑像素）变换到世界坐标，保留 z
    #[inline]
    pub fn apply_2d(&self, local: Vec2) -> Vec3 {
        let rotated = self.rotation * (local.extend(0.0) * self.scale);
        Vec3::new(rotated.x + self.translation.x, rotated.y + self.translation.y, self.translation.z)
    }
}

/// 2D 相机，`offset` 是屏幕中心对应的世界坐标
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera2d {
    pub offset: Vec2,
    pub zoom: f32,
}

impl Default for Camera2d {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

/// 3D 透视相机，只有 mesh renderer 使用
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3d {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// 垂直方向的视角，弧度
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera3d {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera3d {
    /// vulkan 的 clip space：y 向下，depth 范围 [0, 1]
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let mut proj = Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far);
        proj.y_axis.y *= -1.0;
        proj * view
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    /// 光线传播的方向
    pub direction: Vec3,
    pub color: Vec3,
    pub ambient: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.3, -1.0, -0.5),
            color: Vec3::ONE,
            ambient: 0.15,
        }
    }
}

/// 三个顶点都是相对于 [`Transform`] 的局部坐标
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vec2; 3],
    pub color: Vec4,
}

/// 以 [`Transform`] 为中心的填充矩形
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rect {
    pub size: Vec2,
    pub color: Vec4,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Circle {
    pub radius: f32,
    pub color: Vec4,
}

/// 以 [`Transform`] 为中心的贴图矩形
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sprite {
    pub texture: TextureId,
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    /// 与纹理颜色相乘
    pub color: Vec4,
}

impl Sprite {
    pub fn new(texture: TextureId, size: Vec2) -> Self {
        Self {
            texture,
            size,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            color: Vec4::ONE,
        }
    }
}

/// 文本，[`Transform`] 是文本块的左上角
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub font: FontId,
    pub text: String,
    /// 字号，逻辑像素
    pub size: f32,
    pub color: Vec4,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshInstance {
    pub model: ModelId,
    /// 与材质颜色相乘
    pub tint: Vec4,
}

impl MeshInstance {
    pub fn new(model: ModelId) -> Self {
        Self { model, tint: Vec4::ONE }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_2d_rotates_before_translating() {
        let transform = Transform::from_xyz(10.0, 20.0, 3.0).with_rotation_z(std::f32::consts::FRAC_PI_2);
        let p = transform.apply_2d(Vec2::new(1.0, 0.0));
        assert!((p - Vec3::new(10.0, 21.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_view_proj_maps_target_to_center() {
        let camera = Camera3d::default();
        let clip = camera.view_proj(16.0 / 9.0) * camera.target.extend(1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!((0.0..=1.0).contains(&ndc.z));
    }
}
