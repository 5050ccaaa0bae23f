use crate::asset::Asset;
use crate::catalog::AssetCatalog;
use crate::error::AssetError;

/// 一组按注册顺序加载的资源
///
/// - `load_all`：按注册顺序加载；任何一个失败都会回滚已经加载的资源，并且不会向 catalog 发布任何内容
/// - `unload_all`：先从 catalog 撤下，再按注册的逆序卸载
pub struct AssetBundle<Ctx> {
    assets: Vec<Box<dyn Asset<Ctx>>>,
    ready: bool,
}

impl<Ctx> Default for AssetBundle<Ctx> {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            ready: false,
        }
    }
}

// new & init
impl<Ctx> AssetBundle<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    /// builder
    pub fn with(mut self, asset: impl Asset<Ctx> + 'static) -> Self {
        self.push(asset);
        self
    }

    pub fn push(&mut self, asset: impl Asset<Ctx> + 'static) -> &mut Self {
        debug_assert!(!self.ready, "assets can not be registered after the bundle is loaded");
        self.assets.push(Box::new(asset));
        self
    }
}

// getters
impl<Ctx> AssetBundle<Ctx> {
    #[inline]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// 整个 bundle 是否已经加载完成
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(|a| a.name())
    }
}

// tools
impl<Ctx> AssetBundle<Ctx> {
    pub fn load_all(&mut self, ctx: &Ctx, catalog: &mut AssetCatalog) -> Result<(), AssetError> {
        if self.ready {
            log::warn!("asset bundle is already loaded");
            return Ok(());
        }

        for idx in 0..self.assets.len() {
            let asset = &mut self.assets[idx];
            log::info!("loading asset '{}'", asset.name());
            if let Err(e) = asset.load(ctx) {
                let err = AssetError::named(asset.name(), "load", e);
                log::error!("{}", err);
                self.rollback(ctx, idx);
                return Err(err);
            }
        }

        for entry in self.assets.iter().filter_map(|a| a.catalog_entry()) {
            catalog.publish(entry);
        }
        self.ready = true;
        log::info!("asset bundle loaded: {} assets", self.assets.len());
        Ok(())
    }

    pub fn unload_all(&mut self, ctx: &Ctx, catalog: &mut AssetCatalog) -> Result<(), AssetError> {
        if !self.ready {
            log::debug!("asset bundle is not loaded, nothing to unload");
            return Ok(());
        }

        for entry in self.assets.iter().filter_map(|a| a.catalog_entry()) {
            catalog.remove(entry.key());
        }
        self.ready = false;

        for asset in self.assets.iter_mut().rev() {
            log::info!("unloading asset '{}'", asset.name());
            asset.unload(ctx).map_err(|e| AssetError::named(asset.name(), "unload", e))?;
        }
        Ok(())
    }

    /// 按逆序卸载 `failed_idx` 之前已经加载的资源，失败只记录日志
    fn rollback(&mut self, ctx: &Ctx, failed_idx: usize) {
        for asset in self.assets[..failed_idx].iter_mut().rev() {
            if let Err(e) = asset.unload(ctx) {
                log::error!("failed to roll back asset '{}': {}", asset.name(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use ash::vk;

    use super::*;
    use crate::catalog::{CatalogEntry, CatalogKey, TextureBinding, TextureId};

    type Journal = Rc<RefCell<Vec<String>>>;

    /// 每次 load 按顺序分配两个 handle，unload 时倒序释放
    struct MockAsset {
        name: String,
        journal: Journal,
        fail_load: bool,
        handles: Vec<&'static str>,
        texture: Option<TextureId>,
    }

    impl MockAsset {
        fn new(name: &str, journal: &Journal) -> Self {
            Self {
                name: name.to_string(),
                journal: journal.clone(),
                fail_load: false,
                handles: vec![],
                texture: None,
            }
        }

        fn failing(mut self) -> Self {
            self.fail_load = true;
            self
        }

        fn publishing(mut self, id: TextureId) -> Self {
            self.texture = Some(id);
            self
        }
    }

    impl Asset<()> for MockAsset {
        fn name(&self) -> &str {
            &self.name
        }

        fn load(&mut self, _ctx: &()) -> Result<(), AssetError> {
            if self.fail_load {
                return Err(AssetError::Missing(format!("{}.png", self.name)));
            }
            for handle in ["image", "sampler"] {
                self.journal.borrow_mut().push(format!("alloc {}.{}", self.name, handle));
                self.handles.push(handle);
            }
            Ok(())
        }

        fn unload(&mut self, _ctx: &()) -> Result<(), AssetError> {
            while let Some(handle) = self.handles.pop() {
                self.journal.borrow_mut().push(format!("free {}.{}", self.name, handle));
            }
            Ok(())
        }

        fn is_loaded(&self) -> bool {
            !self.handles.is_empty()
        }

        fn catalog_entry(&self) -> Option<CatalogEntry> {
            self.texture.map(|id| {
                CatalogEntry::Texture(
                    id,
                    TextureBinding {
                        view: vk::ImageView::null(),
                        sampler: vk::Sampler::null(),
                        extent: vk::Extent2D { width: 1, height: 1 },
                    },
                )
            })
        }
    }

    #[test]
    fn test_load_in_registration_order() {
        let journal = Journal::default();
        let mut bundle = AssetBundle::new()
            .with(MockAsset::new("a", &journal))
            .with(MockAsset::new("b", &journal));
        let mut catalog = AssetCatalog::default();

        bundle.load_all(&(), &mut catalog).unwrap();
        assert!(bundle.is_ready());
        assert_eq!(*journal.borrow(), vec!["alloc a.image", "alloc a.sampler", "alloc b.image", "alloc b.sampler"]);
    }

    #[test]
    fn test_unload_releases_in_reverse_allocation_order() {
        let journal = Journal::default();
        let mut bundle = AssetBundle::new().with(MockAsset::new("a", &journal));
        let mut catalog = AssetCatalog::default();

        bundle.load_all(&(), &mut catalog).unwrap();
        bundle.unload_all(&(), &mut catalog).unwrap();

        let journal = journal.borrow();
        let allocs = journal.iter().filter_map(|e| e.strip_prefix("alloc ")).collect::<Vec<_>>();
        let frees = journal.iter().filter_map(|e| e.strip_prefix("free ")).collect::<Vec<_>>();
        assert_eq!(allocs.iter().rev().collect::<Vec<_>>(), frees.iter().collect::<Vec<_>>());
        assert!(!bundle.is_ready());
    }

    #[test]
    fn test_bundle_unloads_in_reverse_registration_order() {
        let journal = Journal::default();
        let mut bundle = AssetBundle::new()
            .with(MockAsset::new("a", &journal))
            .with(MockAsset::new("b", &journal));
        let mut catalog = AssetCatalog::default();

        bundle.load_all(&(), &mut catalog).unwrap();
        bundle.unload_all(&(), &mut catalog).unwrap();
        assert_eq!(
            *journal.borrow(),
            vec![
                "alloc a.image",
                "alloc a.sampler",
                "alloc b.image",
                "alloc b.sampler",
                "free b.sampler",
                "free b.image",
                "free a.sampler",
                "free a.image",
            ]
        );
    }

    #[test]
    fn test_rollback_unloads_loaded_prefix_in_reverse() {
        let journal = Journal::default();
        let mut bundle = AssetBundle::new()
            .with(MockAsset::new("a", &journal))
            .with(MockAsset::new("b", &journal))
            .with(MockAsset::new("broken", &journal).failing());

        assert!(bundle.load_all(&(), &mut AssetCatalog::default()).is_err());
        let frees = journal.borrow().iter().filter(|e| e.starts_with("free ")).cloned().collect::<Vec<_>>();
        assert_eq!(frees, vec!["free b.sampler", "free b.image", "free a.sampler", "free a.image"]);
    }

    #[test]
    fn test_failed_load_aborts_bundle() {
        let journal = Journal::default();
        let mut bundle = AssetBundle::new()
            .with(MockAsset::new("a", &journal).publishing(TextureId(1)))
            .with(MockAsset::new("broken", &journal).failing())
            .with(MockAsset::new("c", &journal));
        let mut catalog = AssetCatalog::default();

        let err = bundle.load_all(&(), &mut catalog).unwrap_err();
        assert!(matches!(&err, AssetError::Named { asset, action: "load", .. } if asset == "broken"));

        // a 被回滚，c 从未加载，catalog 中没有任何内容
        assert_eq!(*journal.borrow(), vec!["alloc a.image", "alloc a.sampler", "free a.sampler", "free a.image"]);
        assert!(catalog.is_empty());
        assert!(!bundle.is_ready());
    }

    #[test]
    fn test_catalog_published_after_load_and_cleared_on_unload() {
        let journal = Journal::default();
        let mut bundle = AssetBundle::new()
            .with(MockAsset::new("a", &journal).publishing(TextureId(1)))
            .with(MockAsset::new("b", &journal).publishing(TextureId(2)));
        let mut catalog = AssetCatalog::default();

        bundle.load_all(&(), &mut catalog).unwrap();
        assert!(catalog.contains(CatalogKey::Texture(TextureId(1))));
        assert!(catalog.contains(CatalogKey::Texture(TextureId(2))));

        bundle.unload_all(&(), &mut catalog).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_unload_without_load_is_noop() {
        let journal = Journal::default();
        let mut bundle = AssetBundle::new().with(MockAsset::new("a", &journal));
        bundle.unload_all(&(), &mut AssetCatalog::default()).unwrap();
        assert!(journal.borrow().is_empty());
    }
}
