use glam::Vec2;
use itertools::Itertools;
use prism_asset::TextureId;
use prism_asset::catalog::TextureBinding;

use crate::components::{Sprite, Transform};
use crate::error::CollectError;
use crate::shape::batch::ShapeOutput;
use crate::shape::vertex::{TexturedVertex, quad_corners};
use crate::shape::{CollectContext, ShapeKind, ShapePipelineDesc};

/// 贴图矩形，按纹理分组：使用同一个纹理的所有实体共享一段顶点和一次 descriptor 绑定
#[derive(Default)]
pub struct SpriteShape;

/// 矩形局部坐标 → 纹理坐标，纹理的 v 轴向下
#[inline]
pub(crate) fn quad_uv(local: Vec2, size: Vec2, uv_min: Vec2, uv_max: Vec2) -> Vec2 {
    let t = Vec2::new(local.x / size.x + 0.5, 0.5 - local.y / size.y);
    uv_min + t * (uv_max - uv_min)
}

impl ShapeKind for SpriteShape {
    type Vertex = TexturedVertex;

    const NAME: &'static str = "sprite";

    fn pipeline_desc(&self) -> ShapePipelineDesc {
        ShapePipelineDesc::overlay("sprite")
    }

    fn collect(
        &mut self,
        ctx: &CollectContext,
        world: &hecs::World,
        out: &mut ShapeOutput<TexturedVertex>,
    ) -> Result<(), CollectError> {
        let mut query = world.query::<(&Transform, &Sprite)>();
        let sprites = query.iter().map(|(_, item)| item).sorted_by_key(|(_, sprite)| sprite.texture.0).collect_vec();
        out.ensure_vertex_room(sprites.len() * 6)?;

        for (texture_id, group) in &sprites.into_iter().group_by(|(_, sprite)| sprite.texture) {
            let Some(texture) = resolve_texture(ctx, texture_id) else {
                continue;
            };
            for (transform, sprite) in group {
                let size = sprite.size.max(Vec2::splat(f32::EPSILON));
                let vertices = quad_corners(sprite.size * 0.5).map(|local| TexturedVertex {
                    position: ctx.projection.to_clip(transform.apply_2d(local)).to_array(),
                    uv: quad_uv(local, size, sprite.uv_min, sprite.uv_max).to_array(),
                    color: sprite.color.to_array(),
                });
                out.push_vertices(Some(texture), &vertices)?;
            }
        }
        Ok(())
    }
}

/// 找不到纹理时退回白色纹理，两者都不存在时跳过这一组
fn resolve_texture(ctx: &CollectContext, id: TextureId) -> Option<TextureBinding> {
    let texture = ctx.catalog.texture_or_white(id).copied();
    if texture.is_none() {
        log::warn!("sprite texture {:?} is not loaded and no white texture is available", id);
    }
    texture
}

#[cfg(test)]
mod tests {
    use ash::vk;
    use ash::vk::Handle;

    use super::*;
    use crate::recorder::mock::{DrawCall, MockRecorder};
    use crate::shape::ShapeState;
    use crate::shape::test_utils::{catalog_with_textures, context, handles};

    fn spawn_sprite(world: &mut hecs::World, texture: u32, x: f32) {
        world.spawn((Transform::from_xyz(x, 0.0, 0.0), Sprite::new(TextureId(texture), Vec2::splat(32.0))));
    }

    #[test]
    fn test_three_sprites_sharing_a_texture_batch_into_one_draw() {
        let catalog = catalog_with_textures(&[7]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        for i in 0..3 {
            spawn_sprite(&mut world, 7, i as f32 * 40.0);
        }

        let mut state = ShapeState::new(SpriteShape, 64, 0);
        let count = state.collect(&ctx, &world);
        assert_eq!(count, 18);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.texture_binds(), 1);
        assert_eq!(recorder.draw_calls(), 1);
        assert!(recorder.calls.contains(&DrawCall::Draw {
            vertex_count: 18,
            first_vertex: 0
        }));
    }

    #[test]
    fn test_binds_equal_distinct_textures() {
        let catalog = catalog_with_textures(&[1, 2]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        // 交错生成，分组之后仍然只有两次绑定
        for i in 0..6 {
            spawn_sprite(&mut world, 1 + i % 2, i as f32);
        }

        let mut state = ShapeState::new(SpriteShape, 64, 0);
        let count = state.collect(&ctx, &world);
        assert_eq!(count, 36);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.texture_binds(), 2);
        assert_eq!(recorder.draw_calls(), 2);
        assert_eq!(recorder.drawn_vertices(), 36);
    }

    #[test]
    fn test_missing_texture_falls_back_to_white() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        spawn_sprite(&mut world, 42, 0.0);

        let mut state = ShapeState::new(SpriteShape, 6, 0);
        assert_eq!(state.collect(&ctx, &world), 6);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), 6, &mut recorder);
        assert!(recorder.calls.contains(&DrawCall::BindTexture(vk::ImageView::from_raw(99))));
    }

    #[test]
    fn test_overflow_checked_before_writing() {
        let catalog = catalog_with_textures(&[1]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        for i in 0..3 {
            spawn_sprite(&mut world, 1, i as f32);
        }

        let mut state = ShapeState::new(SpriteShape, 12, 0);
        assert_eq!(state.collect(&ctx, &world), 0);
    }

    #[test]
    fn test_quad_uv_flips_v() {
        let size = Vec2::splat(2.0);
        assert_eq!(quad_uv(Vec2::new(-1.0, 1.0), size, Vec2::ZERO, Vec2::ONE), Vec2::new(0.0, 0.0));
        assert_eq!(quad_uv(Vec2::new(1.0, -1.0), size, Vec2::ZERO, Vec2::ONE), Vec2::new(1.0, 1.0));
    }
}
