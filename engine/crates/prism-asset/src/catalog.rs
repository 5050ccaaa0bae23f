use std::collections::HashMap;
use std::rc::Rc;

use ash::vk;

use crate::font::GlyphAtlas;
use crate::model::ModelData;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);
impl TextureId {
    /// 1x1 白色纹理，没有纹理的 mesh primitive 以及找不到纹理的 sprite 使用它
    pub const WHITE: TextureId = TextureId(u32::MAX);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FontId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// shader 采样一张纹理所需的全部信息
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub view: vk::ImageView,
    pub sampler: vk::Sampler,
    pub extent: vk::Extent2D,
}

#[derive(Clone)]
pub struct FontBinding {
    pub texture: TextureBinding,
    pub atlas: Rc<GlyphAtlas>,
}

#[derive(Clone)]
pub struct ModelBinding {
    pub data: Rc<ModelData>,
    /// 与 [`ModelData::texture_count`] 一一对应
    pub textures: Rc<[TextureBinding]>,
}

#[derive(Clone)]
pub enum CatalogEntry {
    Texture(TextureId, TextureBinding),
    Font(FontId, FontBinding),
    Model(ModelId, ModelBinding),
    Shader(ShaderId, vk::ShaderModule),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CatalogKey {
    Texture(TextureId),
    Font(FontId),
    Model(ModelId),
    Shader(ShaderId),
}

impl CatalogEntry {
    pub fn key(&self) -> CatalogKey {
        match self {
            CatalogEntry::Texture(id, _) => CatalogKey::Texture(*id),
            CatalogEntry::Font(id, _) => CatalogKey::Font(*id),
            CatalogEntry::Model(id, _) => CatalogKey::Model(*id),
            CatalogEntry::Shader(id, _) => CatalogKey::Shader(*id),
        }
    }
}

/// 已经就绪的资源，renderer 每帧从这里查询绑定信息
///
/// 只有整个 bundle 加载成功之后才会被填充
#[derive(Default)]
pub struct AssetCatalog {
    textures: HashMap<TextureId, TextureBinding>,
    fonts: HashMap<FontId, FontBinding>,
    models: HashMap<ModelId, ModelBinding>,
    shaders: HashMap<ShaderId, vk::ShaderModule>,
}

// tools
impl AssetCatalog {
    pub fn publish(&mut self, entry: CatalogEntry) {
        let key = entry.key();
        let replaced = match entry {
            CatalogEntry::Texture(id, binding) => self.textures.insert(id, binding).is_some(),
            CatalogEntry::Font(id, binding) => self.fonts.insert(id, binding).is_some(),
            CatalogEntry::Model(id, binding) => self.models.insert(id, binding).is_some(),
            CatalogEntry::Shader(id, module) => self.shaders.insert(id, module).is_some(),
        };
        if replaced {
            log::warn!("catalog entry {:?} is published twice, the old one is replaced", key);
        }
    }

    pub fn remove(&mut self, key: CatalogKey) {
        let removed = match key {
            CatalogKey::Texture(id) => self.textures.remove(&id).is_some(),
            CatalogKey::Font(id) => self.fonts.remove(&id).is_some(),
            CatalogKey::Model(id) => self.models.remove(&id).is_some(),
            CatalogKey::Shader(id) => self.shaders.remove(&id).is_some(),
        };
        if !removed {
            log::debug!("catalog entry {:?} is not published", key);
        }
    }

    #[inline]
    pub fn contains(&self, key: CatalogKey) -> bool {
        match key {
            CatalogKey::Texture(id) => self.textures.contains_key(&id),
            CatalogKey::Font(id) => self.fonts.contains_key(&id),
            CatalogKey::Model(id) => self.models.contains_key(&id),
            CatalogKey::Shader(id) => self.shaders.contains_key(&id),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty() && self.fonts.is_empty() && self.models.is_empty() && self.shaders.is_empty()
    }
}

// getters
impl AssetCatalog {
    #[inline]
    pub fn texture(&self, id: TextureId) -> Option<&TextureBinding> {
        self.textures.get(&id)
    }

    /// 找不到时回退到白色纹理
    #[inline]
    pub fn texture_or_white(&self, id: TextureId) -> Option<&TextureBinding> {
        self.textures.get(&id).or_else(|| self.textures.get(&TextureId::WHITE))
    }

    #[inline]
    pub fn font(&self, id: FontId) -> Option<&FontBinding> {
        self.fonts.get(&id)
    }

    #[inline]
    pub fn model(&self, id: ModelId) -> Option<&ModelBinding> {
        self.models.get(&id)
    }

    #[inline]
    pub fn shader(&self, id: ShaderId) -> Option<vk::ShaderModule> {
        self.shaders.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(width: u32) -> TextureBinding {
        TextureBinding {
            view: vk::ImageView::null(),
            sampler: vk::Sampler::null(),
            extent: vk::Extent2D { width, height: 1 },
        }
    }

    #[test]
    fn test_publish_and_remove() {
        let mut catalog = AssetCatalog::default();
        catalog.publish(CatalogEntry::Texture(TextureId(3), binding(16)));
        assert!(catalog.contains(CatalogKey::Texture(TextureId(3))));
        assert_eq!(catalog.texture(TextureId(3)).map(|b| b.extent.width), Some(16));

        catalog.remove(CatalogKey::Texture(TextureId(3)));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_texture_falls_back_to_white() {
        let mut catalog = AssetCatalog::default();
        assert!(catalog.texture_or_white(TextureId(1)).is_none());

        catalog.publish(CatalogEntry::Texture(TextureId::WHITE, binding(1)));
        catalog.publish(CatalogEntry::Texture(TextureId(1), binding(64)));
        assert_eq!(catalog.texture_or_white(TextureId(1)).map(|b| b.extent.width), Some(64));
        assert_eq!(catalog.texture_or_white(TextureId(2)).map(|b| b.extent.width), Some(1));
    }
}
