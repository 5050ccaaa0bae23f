use ash::vk;
use glam::{Mat3, Vec3};
use prism_asset::TextureId;

use crate::components::{DirectionalLight, MeshInstance, Transform};
use crate::error::CollectError;
use crate::shape::batch::ShapeOutput;
use crate::shape::vertex::MeshVertex;
use crate::shape::{CollectContext, ShapeKind, ShapePipelineDesc};

/// fragment shader 中的光照参数
#[repr(C)]
#[derive(Clone, Debug, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshLightPushConstants {
    /// xyz: 指向光源的单位向量，w: 环境光强度
    pub to_light: [f32; 4],
    pub color: [f32; 4],
}

impl From<&DirectionalLight> for MeshLightPushConstants {
    fn from(light: &DirectionalLight) -> Self {
        let to_light = (-light.direction).try_normalize().unwrap_or(Vec3::Y);
        Self {
            to_light: to_light.extend(light.ambient).to_array(),
            color: light.color.extend(1.0).to_array(),
        }
    }
}

/// 带方向光的 3D 模型
///
/// 顶点在 CPU 端变换到 clip space，每个 primitive 一次 indexed draw
#[derive(Default)]
pub struct MeshShape;

impl ShapeKind for MeshShape {
    type Vertex = MeshVertex;

    const NAME: &'static str = "mesh";

    fn pipeline_desc(&self) -> ShapePipelineDesc {
        ShapePipelineDesc {
            textured: true,
            indexed: true,
            push_constant_size: size_of::<MeshLightPushConstants>() as u32,
            push_constant_stages: vk::ShaderStageFlags::FRAGMENT,
            ..ShapePipelineDesc::opaque("mesh")
        }
    }

    fn collect(
        &mut self,
        ctx: &CollectContext,
        world: &hecs::World,
        out: &mut ShapeOutput<MeshVertex>,
    ) -> Result<(), CollectError> {
        out.set_push_constants(bytemuck::bytes_of(&MeshLightPushConstants::from(&ctx.light)));
        let white = ctx.catalog.texture(TextureId::WHITE).copied();

        for (_, (transform, instance)) in world.query::<(&Transform, &MeshInstance)>().iter() {
            let Some(model) = ctx.catalog.model(instance.model) else {
                log::warn!("model {:?} is not loaded, the instance is skipped", instance.model);
                continue;
            };

            let model_matrix = transform.matrix();
            let mvp = ctx.view_proj * model_matrix;
            let normal_matrix = Mat3::from_mat4(model_matrix).inverse().transpose();

            for primitive in &model.data.primitives {
                let texture = primitive.texture.and_then(|i| model.textures.get(i).copied()).or(white);
                let Some(texture) = texture else {
                    log::warn!("no texture is available for a primitive of model {:?}", instance.model);
                    continue;
                };

                let color = (primitive.base_color * instance.tint).to_array();
                let vertices = primitive
                    .vertices
                    .iter()
                    .map(|v| MeshVertex {
                        clip_position: (mvp * v.position.extend(1.0)).to_array(),
                        normal: (normal_matrix * v.normal).normalize_or_zero().to_array(),
                        uv: v.uv.to_array(),
                        color,
                    })
                    .collect::<Vec<_>>();
                out.push_indexed(Some(texture), &vertices, &primitive.indices)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use ash::vk::Handle;
    use glam::{Vec2, Vec4};
    use prism_asset::catalog::ModelBinding;
    use prism_asset::model::{ModelData, ModelPrimitive, ModelVertex};
    use prism_asset::{AssetCatalog, CatalogEntry, ModelId};

    use super::*;
    use crate::recorder::mock::{DrawCall, MockRecorder};
    use crate::shape::ShapeState;
    use crate::shape::test_utils::{catalog_with_textures, context, handles, texture_binding};

    fn primitive(texture: Option<usize>) -> ModelPrimitive {
        let vertex = |x: f32, y: f32| ModelVertex {
            position: Vec3::new(x, y, 0.0),
            normal: Vec3::Z,
            uv: Vec2::ZERO,
        };
        ModelPrimitive {
            vertices: vec![vertex(0.0, 0.0), vertex(1.0, 0.0), vertex(0.0, 1.0)],
            indices: vec![0, 1, 2],
            base_color: Vec4::new(1.0, 0.5, 0.5, 1.0),
            texture,
        }
    }

    fn publish_model(catalog: &mut AssetCatalog, primitives: Vec<ModelPrimitive>) {
        catalog.publish(CatalogEntry::Model(
            ModelId(1),
            ModelBinding {
                data: Rc::new(ModelData {
                    primitives,
                    texture_count: 1,
                }),
                textures: Rc::from(vec![texture_binding(300)]),
            },
        ));
    }

    #[test]
    fn test_each_primitive_is_an_indexed_draw() {
        let mut catalog = catalog_with_textures(&[]);
        publish_model(&mut catalog, vec![primitive(Some(0)), primitive(None)]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((Transform::default(), MeshInstance::new(ModelId(1))));

        let mut state = ShapeState::new(MeshShape, 64, 64);
        let count = state.collect(&ctx, &world);
        assert_eq!(count, 6);
        assert_eq!(state.output().indices().len(), 6);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.draw_calls(), 2);
        assert!(recorder.calls.contains(&DrawCall::PushConstants { size: 32 }));
        // 第二个 primitive 没有纹理，使用白色纹理
        assert!(recorder.calls.contains(&DrawCall::BindTexture(vk::ImageView::from_raw(300))));
        assert!(recorder.calls.contains(&DrawCall::BindTexture(vk::ImageView::from_raw(99))));
        assert!(recorder.calls.contains(&DrawCall::DrawIndexed {
            index_count: 3,
            first_index: 3,
            vertex_offset: 3
        }));
    }

    #[test]
    fn test_index_overflow_draws_nothing() {
        let mut catalog = catalog_with_textures(&[]);
        publish_model(&mut catalog, vec![primitive(Some(0))]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((Transform::default(), MeshInstance::new(ModelId(1))));
        world.spawn((Transform::from_xyz(2.0, 0.0, 0.0), MeshInstance::new(ModelId(1))));

        let mut state = ShapeState::new(MeshShape, 64, 3);
        let count = state.collect(&ctx, &world);
        assert_eq!(count, 0);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.drawn_vertices(), 0);
    }

    #[test]
    fn test_tint_and_normal_transform() {
        let mut catalog = catalog_with_textures(&[]);
        publish_model(&mut catalog, vec![primitive(Some(0))]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((
            Transform::default().with_scale(Vec3::new(2.0, 1.0, 1.0)),
            MeshInstance {
                model: ModelId(1),
                tint: Vec4::new(0.5, 1.0, 1.0, 1.0),
            },
        ));

        let mut state = ShapeState::new(MeshShape, 64, 64);
        state.collect(&ctx, &world);
        let vertex = state.output().vertices()[0];
        assert_eq!(vertex.color, [0.5, 0.5, 0.5, 1.0]);
        assert!((Vec3::from(vertex.normal) - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_light_points_toward_source() {
        let light = DirectionalLight {
            direction: Vec3::new(0.0, -2.0, 0.0),
            color: Vec3::ONE,
            ambient: 0.2,
        };
        let pc = MeshLightPushConstants::from(&light);
        assert_eq!(pc.to_light, [0.0, 1.0, 0.0, 0.2]);
    }
}
