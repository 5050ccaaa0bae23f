//! 每一类图形各生成几个实体，并让其中一部分持续旋转

use glam::{Quat, Vec2, Vec3, Vec4};
use prism_app::{Engine, WindowConfig};
use prism_asset::font::Font;
use prism_asset::model::Model;
use prism_asset::texture::Texture;
use prism_asset::{FontId, ModelId, TextureId};
use prism_crate_tools::resource::PrismPath;
use prism_renderer::components::{
    Camera2d, Camera3d, Circle, DirectionalLight, MeshInstance, Rect, Sprite, Text, Transform, Triangle,
};

use crate::outer_app::OuterApp;

const CHECKER: TextureId = TextureId(1);
const CUBE: ModelId = ModelId(1);
const UI_FONT: FontId = FontId(1);

/// 绕固定轴匀速旋转，弧度每秒
#[derive(Debug, Copy, Clone)]
pub struct Spin {
    pub axis: Vec3,
    pub speed: f32,
}

#[derive(Default)]
pub struct ShapesDemo;

impl ShapesDemo {
    fn spawn_2d(world: &mut hecs::World, with_text: bool) {
        world.spawn((Camera2d::default(),));

        world.spawn((
            Transform::from_xyz(-320.0, 160.0, 0.1),
            Triangle {
                vertices: [Vec2::new(-60.0, -50.0), Vec2::new(60.0, -50.0), Vec2::new(0.0, 60.0)],
                color: Vec4::new(0.95, 0.35, 0.3, 1.0),
            },
            Spin {
                axis: Vec3::Z,
                speed: 1.0,
            },
        ));
        world.spawn((
            Transform::from_xyz(0.0, 160.0, 0.2),
            Rect {
                size: Vec2::new(140.0, 90.0),
                color: Vec4::new(0.3, 0.85, 0.45, 1.0),
            },
            Spin {
                axis: Vec3::Z,
                speed: -0.6,
            },
        ));
        world.spawn((
            Transform::from_xyz(320.0, 160.0, 0.3),
            Circle {
                radius: 64.0,
                color: Vec4::new(0.95, 0.8, 0.25, 1.0),
            },
        ));

        // 同一张纹理的 sprite 合并为一个 batch
        for (i, x) in [-200.0, 0.0, 200.0].into_iter().enumerate() {
            let mut sprite = Sprite::new(CHECKER, Vec2::splat(96.0));
            sprite.color = Vec4::new(1.0, 1.0, 1.0, 0.6 + 0.2 * i as f32);
            world.spawn((Transform::from_xyz(x, -200.0, 0.5), sprite));
        }

        if with_text {
            world.spawn((
                Transform::from_xyz(-420.0, 320.0, 0.9),
                Text {
                    font: UI_FONT,
                    text: "prism: triangle / rect / circle / sprite / mesh".to_string(),
                    size: 24.0,
                    color: Vec4::ONE,
                },
            ));
        }
    }

    fn spawn_3d(world: &mut hecs::World) {
        world.spawn((Camera3d {
            eye: Vec3::new(0.0, 1.5, 4.0),
            ..Default::default()
        },));
        world.spawn((DirectionalLight::default(),));
        world.spawn((
            Transform::default().with_scale(Vec3::splat(1.2)),
            MeshInstance::new(CUBE),
            Spin {
                axis: Vec3::new(0.3, 1.0, 0.0).normalize(),
                speed: 0.8,
            },
        ));
    }
}

impl OuterApp for ShapesDemo {
    fn window_config(&self) -> WindowConfig {
        WindowConfig {
            title: "Prism Shapes".to_string(),
            logical_size: [1280.0, 800.0],
        }
    }

    fn init(&mut self, engine: &mut Engine) -> anyhow::Result<()> {
        engine
            .add_asset(Texture::from_file(CHECKER, PrismPath::assets_path("textures/checker.png")))
            .add_asset(Model::from_file(CUBE, PrismPath::assets_path("models/cube.gltf")));

        // 仓库中不附带字体文件，存在时才显示文本
        let font_path = PrismPath::assets_path("fonts/demo.ttf");
        let with_text = font_path.exists();
        if with_text {
            engine.add_asset(Font::from_file(UI_FONT, font_path, 32.0));
        } else {
            log::warn!("font '{}' not found, text is disabled", font_path.display());
        }

        let world = engine.world_mut();
        Self::spawn_2d(world, with_text);
        Self::spawn_3d(world);
        Ok(())
    }

    fn update(&mut self, world: &mut hecs::World, delta_seconds: f32) {
        for (_, (transform, spin)) in world.query_mut::<(&mut Transform, &Spin)>() {
            transform.rotation = (Quat::from_axis_angle(spin.axis, spin.speed * delta_seconds) * transform.rotation).normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rotates_spinning_entities() {
        let mut world = hecs::World::new();
        let spinning = world.spawn((
            Transform::default(),
            Spin {
                axis: Vec3::Z,
                speed: std::f32::consts::FRAC_PI_2,
            },
        ));
        let still = world.spawn((Transform::default(),));

        let mut demo = ShapesDemo;
        demo.update(&mut world, 1.0);

        let rotated = world.get::<&Transform>(spinning).unwrap().apply_2d(Vec2::X);
        assert!((rotated - Vec3::Y).length() < 1e-5);
        assert_eq!(world.get::<&Transform>(still).unwrap().rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_spawned_scene_has_every_kind() {
        let mut world = hecs::World::new();
        ShapesDemo::spawn_2d(&mut world, true);
        ShapesDemo::spawn_3d(&mut world);

        assert_eq!(world.query::<&Triangle>().iter().count(), 1);
        assert_eq!(world.query::<&Rect>().iter().count(), 1);
        assert_eq!(world.query::<&Circle>().iter().count(), 1);
        assert_eq!(world.query::<&Sprite>().iter().count(), 3);
        assert_eq!(world.query::<&Text>().iter().count(), 1);
        assert_eq!(world.query::<&MeshInstance>().iter().count(), 1);
    }
}
