use crate::error::RenderError;
use crate::recorder::DrawRecorder;
use crate::settings::ShapeCapacity;
use crate::shape::circle::CircleShape;
use crate::shape::mesh::MeshShape;
use crate::shape::pass::{ShapeInitContext, ShapePass};
use crate::shape::rect::RectShape;
use crate::shape::sprite::SpriteShape;
use crate::shape::text::TextShape;
use crate::shape::triangle::TriangleShape;
use crate::shape::{CollectContext, ShapeRenderer};

/// 按注册顺序执行的 shape renderer 列表
///
/// 不透明图形先于半透明图形注册，sprite 与 text 总是最后绘制
#[derive(Default)]
pub struct ShapeRenderers {
    renderers: Vec<Box<dyn ShapeRenderer>>,
    /// 本帧每个 renderer 的顶点数量，与 `renderers` 一一对应
    counts: Vec<u32>,
}

// new & init
impl ShapeRenderers {
    /// 创建内置的全部 renderer；任意一个失败时，已经创建的 renderer 会被销毁
    pub fn new_builtin(ctx: &ShapeInitContext, capacity: &ShapeCapacity) -> Result<Self, RenderError> {
        let mut renderers = Self::default();
        if let Err(e) = renderers.register_builtin(ctx, capacity) {
            renderers.destroy();
            return Err(e);
        }
        Ok(renderers)
    }

    fn register_builtin(&mut self, ctx: &ShapeInitContext, capacity: &ShapeCapacity) -> Result<(), RenderError> {
        self.register(Box::new(ShapePass::init(ctx, TriangleShape, capacity.triangle_vertices, 0)?));
        self.register(Box::new(ShapePass::init(ctx, RectShape, capacity.rect_vertices, 0)?));
        self.register(Box::new(ShapePass::init(ctx, MeshShape, capacity.mesh_vertices, capacity.mesh_indices)?));
        self.register(Box::new(ShapePass::init(ctx, CircleShape, capacity.circle_vertices, 0)?));
        self.register(Box::new(ShapePass::init(ctx, SpriteShape, capacity.sprite_vertices, 0)?));
        self.register(Box::new(ShapePass::init(ctx, TextShape, capacity.text_vertices, 0)?));
        Ok(())
    }

    pub fn register(&mut self, renderer: Box<dyn ShapeRenderer>) {
        log::info!("register shape renderer: {}", renderer.name());
        self.renderers.push(renderer);
        self.counts.push(0);
    }
}

// getters
impl ShapeRenderers {
    pub fn names(&self) -> Vec<&'static str> {
        self.renderers.iter().map(|r| r.name()).collect()
    }

    #[inline]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

// update
impl ShapeRenderers {
    /// 依次调用每个 renderer 的 `collect`，失败的 renderer 本帧不绘制
    pub fn collect(&mut self, ctx: &CollectContext, world: &hecs::World, slot: usize) -> Result<(), RenderError> {
        self.counts.fill(0);
        for (renderer, count) in self.renderers.iter_mut().zip(self.counts.iter_mut()) {
            *count = renderer.collect(ctx, world, slot)?;
        }
        Ok(())
    }

    /// 使用上一次 `collect` 得到的数量录制
    pub fn record(&self, recorder: &mut dyn DrawRecorder, slot: usize) {
        for (renderer, &count) in self.renderers.iter().zip(&self.counts) {
            renderer.record(recorder, slot, count);
        }
    }
}

// destroy
impl ShapeRenderers {
    /// 按注册的逆序销毁
    pub fn destroy(&mut self) {
        while let Some(renderer) = self.renderers.pop() {
            renderer.deinit();
        }
        self.counts.clear();
    }
}

impl Drop for ShapeRenderers {
    fn drop(&mut self) {
        debug_assert!(self.renderers.is_empty(), "ShapeRenderers is not destroyed");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::recorder::mock::MockRecorder;
    use crate::shape::test_utils::{catalog_with_textures, context};

    /// 记录调用顺序的 renderer
    struct Probe {
        name: &'static str,
        count: u32,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl ShapeRenderer for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn collect(&mut self, _ctx: &CollectContext, _world: &hecs::World, slot: usize) -> Result<u32, RenderError> {
            self.log.borrow_mut().push(format!("collect {} {}", self.name, slot));
            Ok(self.count)
        }

        fn record(&self, recorder: &mut dyn DrawRecorder, _slot: usize, vertex_count: u32) {
            self.log.borrow_mut().push(format!("record {} {}", self.name, vertex_count));
            if vertex_count > 0 {
                recorder.draw(vertex_count, 0);
            }
        }

        fn deinit(self: Box<Self>) {
            self.log.borrow_mut().push(format!("deinit {}", self.name));
        }
    }

    #[test]
    fn test_collect_record_and_destroy_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut renderers = ShapeRenderers::default();
        for (name, count) in [("a", 3), ("b", 0)] {
            renderers.register(Box::new(Probe {
                name,
                count,
                log: log.clone(),
            }));
        }
        assert_eq!(renderers.names(), vec!["a", "b"]);

        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        renderers.collect(&ctx, &hecs::World::new(), 1).unwrap();
        assert_eq!(renderers.counts(), &[3, 0]);

        let mut recorder = MockRecorder::default();
        renderers.record(&mut recorder, 1);
        assert_eq!(recorder.draw_calls(), 1);

        renderers.destroy();
        assert_eq!(
            *log.borrow(),
            vec!["collect a 1", "collect b 1", "record a 3", "record b 0", "deinit b", "deinit a"]
        );
    }
}
