use crate::components::{Transform, Triangle};
use crate::error::CollectError;
use crate::shape::batch::ShapeOutput;
use crate::shape::vertex::ColorVertex;
use crate::shape::{CollectContext, ShapeKind, ShapePipelineDesc};

/// 纯色三角形，每个实体 3 个顶点
#[derive(Default)]
pub struct TriangleShape;

impl ShapeKind for TriangleShape {
    type Vertex = ColorVertex;

    const NAME: &'static str = "triangle";

    fn pipeline_desc(&self) -> ShapePipelineDesc {
        ShapePipelineDesc::opaque("color")
    }

    fn collect(
        &mut self,
        ctx: &CollectContext,
        world: &hecs::World,
        out: &mut ShapeOutput<ColorVertex>,
    ) -> Result<(), CollectError> {
        for (_, (transform, triangle)) in world.query::<(&Transform, &Triangle)>().iter() {
            let vertices = triangle.vertices.map(|local| ColorVertex {
                position: ctx.projection.to_clip(transform.apply_2d(local)).to_array(),
                color: triangle.color.to_array(),
            });
            out.push_vertices(None, &vertices)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec4};

    use super::*;
    use crate::recorder::mock::MockRecorder;
    use crate::shape::ShapeState;
    use crate::shape::test_utils::{catalog_with_textures, context, handles};

    fn spawn_triangles(world: &mut hecs::World, count: usize) {
        for i in 0..count {
            world.spawn((
                Transform::from_xyz(i as f32 * 10.0, 0.0, 0.0),
                Triangle {
                    vertices: [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)],
                    color: Vec4::ONE,
                },
            ));
        }
    }

    #[test]
    fn test_collect_then_record_draws_collected_count() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        spawn_triangles(&mut world, 2);

        let mut state = ShapeState::new(TriangleShape, 12, 0);
        let count = state.collect(&ctx, &world);
        assert_eq!(count, 6);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.draw_calls(), 1);
        assert_eq!(recorder.drawn_vertices(), 6);
        assert_eq!(recorder.texture_binds(), 0);
    }

    #[test]
    fn test_record_zero_issues_nothing() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        spawn_triangles(&mut world, 1);

        let mut state = ShapeState::new(TriangleShape, 12, 0);
        state.collect(&ctx, &world);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), 0, &mut recorder);
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_overflow_draws_nothing() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        // 容量只够一个三角形
        spawn_triangles(&mut world, 2);

        let mut state = ShapeState::new(TriangleShape, 3, 0);
        let count = state.collect(&ctx, &world);
        assert_eq!(count, 0);
        assert!(state.output().vertices().is_empty());

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.drawn_vertices(), 0);
        assert_eq!(recorder.draw_calls(), 0);
    }

    #[test]
    fn test_vertices_are_in_clip_space() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        // 800x600 的窗口，x = 400 是右边缘
        world.spawn((
            Transform::from_xyz(0.0, 0.0, 0.0),
            Triangle {
                vertices: [Vec2::ZERO, Vec2::new(400.0, 0.0), Vec2::new(0.0, 300.0)],
                color: Vec4::ONE,
            },
        ));

        let mut state = ShapeState::new(TriangleShape, 3, 0);
        state.collect(&ctx, &world);
        let vertices = state.output().vertices();
        assert_eq!(vertices[1].position[0], 1.0);
        assert_eq!(vertices[2].position[1], -1.0);
    }
}
