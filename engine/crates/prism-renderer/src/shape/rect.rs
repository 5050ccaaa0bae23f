use crate::components::{Rect, Transform};
use crate::error::CollectError;
use crate::shape::batch::ShapeOutput;
use crate::shape::vertex::{ColorVertex, quad_corners};
use crate::shape::{CollectContext, ShapeKind, ShapePipelineDesc};

/// 填充矩形，每个实体 6 个顶点；旋转在逻辑像素空间中完成
#[derive(Default)]
pub struct RectShape;

impl ShapeKind for RectShape {
    type Vertex = ColorVertex;

    const NAME: &'static str = "rect";

    fn pipeline_desc(&self) -> ShapePipelineDesc {
        ShapePipelineDesc::opaque("color")
    }

    fn collect(
        &mut self,
        ctx: &CollectContext,
        world: &hecs::World,
        out: &mut ShapeOutput<ColorVertex>,
    ) -> Result<(), CollectError> {
        for (_, (transform, rect)) in world.query::<(&Transform, &Rect)>().iter() {
            let vertices = quad_corners(rect.size * 0.5).map(|local| ColorVertex {
                position: ctx.projection.to_clip(transform.apply_2d(local)).to_array(),
                color: rect.color.to_array(),
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
    use crate::shape::ShapeState;
    use crate::shape::test_utils::{catalog_with_textures, context};

    #[test]
    fn test_rotation_is_independent_of_aspect() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        // 800x600 的窗口中旋转 90 度的 100x20 矩形，在逻辑像素中变成 20x100
        world.spawn((
            Transform::from_xyz(0.0, 0.0, 0.0).with_rotation_z(std::f32::consts::FRAC_PI_2),
            Rect {
                size: Vec2::new(100.0, 20.0),
                color: Vec4::ONE,
            },
        ));

        let mut state = ShapeState::new(RectShape, 6, 0);
        assert_eq!(state.collect(&ctx, &world), 6);

        let xs = state.output().vertices().iter().map(|v| v.position[0] * 400.0);
        let max_x = xs.fold(f32::MIN, f32::max);
        let ys = state.output().vertices().iter().map(|v| v.position[1] * 300.0);
        let max_y = ys.fold(f32::MIN, f32::max);
        assert!((max_x - 10.0).abs() < 1e-3);
        assert!((max_y - 50.0).abs() < 1e-3);
    }
}
