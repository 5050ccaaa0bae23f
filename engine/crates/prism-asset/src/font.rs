use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use ash::vk;
use glam::{Vec2, vec2};
use prism_gfx::resources::sampler::GfxSamplerDesc;

use crate::asset::Asset;
use crate::catalog::{CatalogEntry, FontBinding, FontId};
use crate::context::GpuUploadContext;
use crate::error::AssetError;
use crate::upload::GpuTexture;

const ATLAS_WIDTH: u32 = 512;
/// atlas 中 glyph 之间的间隔像素
const GLYPH_PADDING: u32 = 1;
/// 找不到字符时使用的替代字符
const REPLACEMENT_CHAR: char = '?';

/// atlas 中的一个 glyph，尺寸均以 atlas 光栅化时的像素为单位
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphInfo {
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    /// bitmap 的宽高
    pub size: Vec2,
    /// bitmap 左下角相对于 pen 位置（baseline 上）的偏移，y 向上
    pub bearing: Vec2,
    pub advance: f32,
}

/// 一个 glyph 在逻辑像素空间中的矩形，y 向下
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphQuad {
    pub min: Vec2,
    pub max: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
}

/// 以固定像素尺寸光栅化的 glyph atlas（R8）
pub struct GlyphAtlas {
    glyphs: HashMap<char, GlyphInfo>,
    px_size: f32,
    ascent: f32,
    line_height: f32,
    extent: vk::Extent2D,
}

// new & init
impl GlyphAtlas {
    pub fn new(glyphs: HashMap<char, GlyphInfo>, px_size: f32, ascent: f32, line_height: f32, extent: vk::Extent2D) -> Self {
        Self {
            glyphs,
            px_size,
            ascent,
            line_height,
            extent,
        }
    }

    /// 光栅化 `chars` 中的所有字符并打包，返回 atlas 以及它的 R8 像素
    pub fn rasterize(
        font: &fontdue::Font,
        px_size: f32,
        chars: impl Iterator<Item = char>,
    ) -> Result<(Self, Vec<u8>), String> {
        let rasterized = chars.map(|ch| (ch, font.rasterize(ch, px_size))).collect::<Vec<_>>();
        let sizes = rasterized.iter().map(|(_, (m, _))| (m.width as u32, m.height as u32)).collect::<Vec<_>>();
        let (positions, height) = pack_rows(&sizes, ATLAS_WIDTH, GLYPH_PADDING)?;
        let extent = vk::Extent2D {
            width: ATLAS_WIDTH,
            height: height.max(1),
        };

        let mut pixels = vec![0_u8; (extent.width * extent.height) as usize];
        let atlas_size = vec2(extent.width as f32, extent.height as f32);
        let mut glyphs = HashMap::with_capacity(rasterized.len());
        for ((ch, (metrics, bitmap)), (x, y)) in rasterized.iter().zip(positions) {
            for row in 0..metrics.height {
                let dst = (y as usize + row) * extent.width as usize + x as usize;
                let src = row * metrics.width;
                pixels[dst..dst + metrics.width].copy_from_slice(&bitmap[src..src + metrics.width]);
            }

            let size = vec2(metrics.width as f32, metrics.height as f32);
            let origin = vec2(x as f32, y as f32);
            glyphs.insert(
                *ch,
                GlyphInfo {
                    uv_min: origin / atlas_size,
                    uv_max: (origin + size) / atlas_size,
                    size,
                    bearing: vec2(metrics.xmin as f32, metrics.ymin as f32),
                    advance: metrics.advance_width,
                },
            );
        }

        let (ascent, line_height) = font
            .horizontal_line_metrics(px_size)
            .map_or((px_size, px_size * 1.2), |m| (m.ascent, m.new_line_size));

        Ok((Self::new(glyphs, px_size, ascent, line_height, extent), pixels))
    }
}

// getters
impl GlyphAtlas {
    #[inline]
    pub fn glyph(&self, ch: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&REPLACEMENT_CHAR))
    }

    #[inline]
    pub fn px_size(&self) -> f32 {
        self.px_size
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

// tools
impl GlyphAtlas {
    /// 从 `origin`（第一行的左上角）开始排版，`size` 是目标字号（逻辑像素）
    ///
    /// 只处理 `\n` 换行，不做自动折行；空白字符只推进 pen，不产生 quad
    pub fn layout(&self, text: &str, origin: Vec2, size: f32) -> Vec<GlyphQuad> {
        let scale = size / self.px_size;
        let mut pen_x = origin.x;
        let mut baseline = origin.y + self.ascent * scale;

        let mut quads = Vec::with_capacity(text.len());
        for ch in text.chars() {
            if ch == '\n' {
                pen_x = origin.x;
                baseline += self.line_height * scale;
                continue;
            }
            let Some(glyph) = self.glyph(ch) else {
                continue;
            };

            if glyph.size.x > 0.0 && glyph.size.y > 0.0 {
                let min_x = pen_x + glyph.bearing.x * scale;
                let max_y = baseline - glyph.bearing.y * scale;
                quads.push(GlyphQuad {
                    min: vec2(min_x, max_y - glyph.size.y * scale),
                    max: vec2(min_x + glyph.size.x * scale, max_y),
                    uv_min: glyph.uv_min,
                    uv_max: glyph.uv_max,
                });
            }
            pen_x += glyph.advance * scale;
        }
        quads
    }
}

/// 按行从左到右打包矩形，返回每个矩形的左上角以及用到的总高度
pub fn pack_rows(sizes: &[(u32, u32)], atlas_width: u32, padding: u32) -> Result<(Vec<(u32, u32)>, u32), String> {
    let mut positions = Vec::with_capacity(sizes.len());
    let mut cursor_x = padding;
    let mut cursor_y = padding;
    let mut row_height = 0;

    for &(w, h) in sizes {
        if w + 2 * padding > atlas_width {
            return Err(format!("glyph of width {} does not fit into an atlas of width {}", w, atlas_width));
        }
        if cursor_x + w + padding > atlas_width {
            cursor_y += row_height + padding;
            cursor_x = padding;
            row_height = 0;
        }
        positions.push((cursor_x, cursor_y));
        cursor_x += w + padding;
        row_height = row_height.max(h);
    }

    Ok((positions, cursor_y + row_height + padding))
}

/// TrueType 字体，加载时光栅化可打印 ASCII 字符
pub struct Font {
    id: FontId,
    name: String,
    path: PathBuf,
    px_size: f32,

    atlas: Option<Rc<GlyphAtlas>>,
    gpu: Option<GpuTexture>,
}

// new & init
impl Font {
    pub fn from_file(id: FontId, path: impl Into<PathBuf>, px_size: f32) -> Self {
        let path = path.into();
        Self {
            id,
            name: path.to_string_lossy().into_owned(),
            path,
            px_size,
            atlas: None,
            gpu: None,
        }
    }
}

impl Asset<GpuUploadContext> for Font {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self, ctx: &GpuUploadContext) -> Result<(), AssetError> {
        let bytes = std::fs::read(&self.path).map_err(|source| AssetError::Io {
            path: self.path.clone(),
            source,
        })?;
        let to_font_err = |message: String| AssetError::Font {
            name: self.name.clone(),
            message,
        };
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| to_font_err(e.to_string()))?;
        let (atlas, pixels) = GlyphAtlas::rasterize(&font, self.px_size, ' '..='~').map_err(to_font_err)?;

        let gpu = GpuTexture::upload(
            ctx,
            atlas.extent(),
            vk::Format::R8_UNORM,
            &pixels,
            &GfxSamplerDesc::clamp_linear(),
            &self.name,
        )?;
        self.gpu = Some(gpu);
        self.atlas = Some(Rc::new(atlas));
        Ok(())
    }

    fn unload(&mut self, _ctx: &GpuUploadContext) -> Result<(), AssetError> {
        self.atlas = None;
        if let Some(gpu) = self.gpu.take() {
            gpu.destroy();
        }
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.gpu.is_some()
    }

    fn catalog_entry(&self) -> Option<CatalogEntry> {
        let (gpu, atlas) = (self.gpu.as_ref()?, self.atlas.as_ref()?);
        Some(CatalogEntry::Font(
            self.id,
            FontBinding {
                texture: gpu.binding(),
                atlas: atlas.clone(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_rows_wraps() {
        let (positions, height) = pack_rows(&[(4, 4), (4, 6), (4, 2)], 12, 1).unwrap();
        // 第三个放不下，换到下一行
        assert_eq!(positions, vec![(1, 1), (6, 1), (1, 8)]);
        assert_eq!(height, 11);
    }

    #[test]
    fn test_pack_rows_rejects_wide_glyph() {
        assert!(pack_rows(&[(20, 4)], 16, 1).is_err());
    }

    fn atlas() -> GlyphAtlas {
        let glyph = GlyphInfo {
            uv_min: vec2(0.0, 0.0),
            uv_max: vec2(0.5, 0.5),
            size: vec2(8.0, 10.0),
            bearing: vec2(1.0, 0.0),
            advance: 10.0,
        };
        let space = GlyphInfo {
            size: Vec2::ZERO,
            ..glyph
        };
        let glyphs = HashMap::from([('a', glyph), (' ', space)]);
        GlyphAtlas::new(glyphs, 16.0, 12.0, 20.0, vk::Extent2D { width: 16, height: 16 })
    }

    #[test]
    fn test_layout_advances_and_skips_space() {
        let quads = atlas().layout("a a", vec2(100.0, 50.0), 16.0);
        assert_eq!(quads.len(), 2);
        // baseline = 50 + 12
        assert_eq!(quads[0].min, vec2(101.0, 52.0));
        assert_eq!(quads[0].max, vec2(109.0, 62.0));
        assert_eq!(quads[1].min.x, 121.0);
    }

    #[test]
    fn test_layout_scales_and_breaks_lines() {
        let quads = atlas().layout("a\na", Vec2::ZERO, 32.0);
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].max - quads[0].min, vec2(16.0, 20.0));
        assert_eq!(quads[1].min.x, quads[0].min.x);
        assert_eq!(quads[1].min.y - quads[0].min.y, 40.0);
    }

    #[test]
    fn test_unknown_char_without_replacement_is_skipped() {
        assert!(atlas().layout("ZZ", Vec2::ZERO, 16.0).is_empty());
    }
}
