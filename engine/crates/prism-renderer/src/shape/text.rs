use glam::Vec2;
use itertools::Itertools;
use prism_asset::font::GlyphQuad;

use crate::components::{Text, Transform};
use crate::error::CollectError;
use crate::shape::batch::ShapeOutput;
use crate::shape::vertex::TexturedVertex;
use crate::shape::{CollectContext, ShapeKind, ShapePipelineDesc};

/// 文本：每个 glyph 一个贴图矩形，同一个字体的所有文本共享一次 atlas 绑定
#[derive(Default)]
pub struct TextShape;

/// glyph quad（y 向下，相对于文本块左上角）→ y 向上的 6 个局部角点与对应的 uv
fn glyph_corners(quad: &GlyphQuad) -> [(Vec2, Vec2); 6] {
    let (l, r) = (quad.min.x, quad.max.x);
    let (t, b) = (-quad.min.y, -quad.max.y);
    let lb = (Vec2::new(l, b), Vec2::new(quad.uv_min.x, quad.uv_max.y));
    let rb = (Vec2::new(r, b), quad.uv_max);
    let rt = (Vec2::new(r, t), Vec2::new(quad.uv_max.x, quad.uv_min.y));
    let lt = (Vec2::new(l, t), quad.uv_min);
    [lb, rb, rt, lb, rt, lt]
}

impl ShapeKind for TextShape {
    type Vertex = TexturedVertex;

    const NAME: &'static str = "text";

    fn pipeline_desc(&self) -> ShapePipelineDesc {
        ShapePipelineDesc::overlay("text")
    }

    fn collect(
        &mut self,
        ctx: &CollectContext,
        world: &hecs::World,
        out: &mut ShapeOutput<TexturedVertex>,
    ) -> Result<(), CollectError> {
        let mut query = world.query::<(&Transform, &Text)>();
        let texts = query.iter().map(|(_, item)| item).sorted_by_key(|(_, text)| text.font.0).collect_vec();

        for (font_id, group) in &texts.into_iter().group_by(|(_, text)| text.font) {
            let Some(font) = ctx.catalog.font(font_id) else {
                log::warn!("font {:?} is not loaded, its text is skipped", font_id);
                continue;
            };
            for (transform, text) in group {
                for quad in font.atlas.layout(&text.text, Vec2::ZERO, text.size) {
                    let vertices = glyph_corners(&quad).map(|(local, uv)| TexturedVertex {
                        position: ctx.projection.to_clip(transform.apply_2d(local)).to_array(),
                        uv: uv.to_array(),
                        color: text.color.to_array(),
                    });
                    out.push_vertices(Some(font.texture), &vertices)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::rc::Rc;

    use ash::vk;
    use glam::{Vec4, vec2};
    use prism_asset::catalog::FontBinding;
    use prism_asset::font::{GlyphAtlas, GlyphInfo};
    use prism_asset::{CatalogEntry, FontId};

    use super::*;
    use crate::recorder::mock::MockRecorder;
    use crate::shape::ShapeState;
    use crate::shape::test_utils::{catalog_with_textures, context, handles, texture_binding};

    /// 只包含 'A' 的 atlas：5x8 的 bitmap，字号 10，ascent 8
    fn atlas() -> GlyphAtlas {
        let mut glyphs = HashMap::new();
        glyphs.insert(
            'A',
            GlyphInfo {
                uv_min: vec2(0.0, 0.0),
                uv_max: vec2(0.5, 1.0),
                size: vec2(5.0, 8.0),
                bearing: Vec2::ZERO,
                advance: 6.0,
            },
        );
        GlyphAtlas::new(glyphs, 10.0, 8.0, 12.0, vk::Extent2D { width: 10, height: 8 })
    }

    fn publish_font(catalog: &mut prism_asset::AssetCatalog, id: u32) {
        catalog.publish(CatalogEntry::Font(
            FontId(id),
            FontBinding {
                texture: texture_binding(200 + id as u64),
                atlas: Rc::new(atlas()),
            },
        ));
    }

    fn text(font: u32, s: &str) -> Text {
        Text {
            font: FontId(font),
            text: s.to_string(),
            size: 10.0,
            color: Vec4::ONE,
        }
    }

    #[test]
    fn test_glyphs_of_one_font_share_a_bind() {
        let mut catalog = catalog_with_textures(&[]);
        publish_font(&mut catalog, 1);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((Transform::default(), text(1, "AA")));
        world.spawn((Transform::from_xyz(0.0, -50.0, 0.0), text(1, "A")));

        let mut state = ShapeState::new(TextShape, 64, 0);
        let count = state.collect(&ctx, &world);
        assert_eq!(count, 18);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.texture_binds(), 1);
        assert_eq!(recorder.draw_calls(), 1);
    }

    #[test]
    fn test_each_font_binds_its_atlas() {
        let mut catalog = catalog_with_textures(&[]);
        publish_font(&mut catalog, 1);
        publish_font(&mut catalog, 2);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((Transform::default(), text(2, "A")));
        world.spawn((Transform::default(), text(1, "A")));
        world.spawn((Transform::default(), text(2, "A")));

        let mut state = ShapeState::new(TextShape, 64, 0);
        let count = state.collect(&ctx, &world);

        let mut recorder = MockRecorder::default();
        state.record(&handles(), count, &mut recorder);
        assert_eq!(recorder.texture_binds(), 2);
        assert_eq!(recorder.drawn_vertices(), 18);
    }

    #[test]
    fn test_missing_font_is_skipped() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((Transform::default(), text(9, "AAA")));

        let mut state = ShapeState::new(TextShape, 64, 0);
        assert_eq!(state.collect(&ctx, &world), 0);
    }

    #[test]
    fn test_glyph_hangs_below_transform() {
        let mut catalog = catalog_with_textures(&[]);
        publish_font(&mut catalog, 1);
        let ctx = context(&catalog);
        let mut world = hecs::World::new();
        world.spawn((Transform::default(), text(1, "A")));

        let mut state = ShapeState::new(TextShape, 6, 0);
        state.collect(&ctx, &world);
        let vertices = state.output().vertices();

        // 左下角在 y = -8 的逻辑像素处，clip space 中 y 向下
        assert!((vertices[0].position[1] - 8.0 / 300.0).abs() < 1e-6);
        assert_eq!(vertices[0].uv, [0.0, 1.0]);
        // 左上角正好在 transform 处
        assert_eq!(vertices[5].position[1], 0.0);
        assert_eq!(vertices[5].uv, [0.0, 0.0]);
    }
}
