use glam::Vec2;

use crate::components::{Circle, Transform};
use crate::error::CollectError;
use crate::shape::batch::ShapeOutput;
use crate::shape::vertex::{CircleVertex, quad_corners};
use crate::shape::{CollectContext, ShapeKind, ShapePipelineDesc};

/// SDF 圆：外接正方形的 6 个顶点，fragment shader 根据 `local` 到原点的距离计算覆盖率
#[derive(Default)]
pub struct CircleShape;

impl ShapeKind for CircleShape {
    type Vertex = CircleVertex;

    const NAME: &'static str = "circle";

    fn pipeline_desc(&self) -> ShapePipelineDesc {
        // 边缘的抗锯齿需要 alpha blend，圆外的片元被 discard，深度仍然写入
        ShapePipelineDesc {
            alpha_blend: true,
            ..ShapePipelineDesc::opaque("circle")
        }
    }

    fn collect(
        &mut self,
        ctx: &CollectContext,
        world: &hecs::World,
        out: &mut ShapeOutput<CircleVertex>,
    ) -> Result<(), CollectError> {
        for (_, (transform, circle)) in world.query::<(&Transform, &Circle)>().iter() {
            let vertices = quad_corners(Vec2::splat(circle.radius)).map(|corner| CircleVertex {
                position: ctx.projection.to_clip(transform.apply_2d(corner)).to_array(),
                local: (corner / circle.radius.max(f32::EPSILON)).to_array(),
                color: circle.color.to_array(),
            });
            out.push_vertices(None, &vertices)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::shape::ShapeState;
    use crate::shape::test_utils::{catalog_with_textures, context};

    #[test]
    fn test_local_coordinates_span_unit_square() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((
            Transform::from_xyz(100.0, 50.0, 1.0),
            Circle {
                radius: 25.0,
                color: Vec4::ONE,
            },
        ));

        let mut state = ShapeState::new(CircleShape, 6, 0);
        assert_eq!(state.collect(&ctx, &world), 6);
        for v in state.output().vertices() {
            assert_eq!(v.local[0].abs(), 1.0);
            assert_eq!(v.local[1].abs(), 1.0);
        }
    }
}
