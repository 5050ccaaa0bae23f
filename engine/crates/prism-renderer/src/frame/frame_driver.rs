use glam::Vec4;
use prism_gfx::swapchain::render_swapchain::GfxAcquire;

use crate::error::RenderError;
use crate::frame::frame_counter::FrameCounter;
use crate::recorder::DrawRecorder;
use crate::shape::CollectContext;
use crate::shape::registry::ShapeRenderers;

/// 绘制一帧需要的 GPU 操作
pub trait FrameBackend {
    fn acquire(&mut self) -> Result<GfxAcquire, RenderError>;

    /// 等待上一次使用 `image_index` 这个 slot 的提交完成，之后该 slot 的资源可以被 CPU 改写
    fn wait_previous(&mut self, image_index: u32) -> Result<(), RenderError>;

    /// 开始 command buffer 与 render pass（清屏），调用 `draw`，再结束两者
    fn record(
        &mut self,
        image_index: u32,
        clear_color: Vec4,
        draw: &mut dyn FnMut(&mut dyn DrawRecorder) -> Result<(), RenderError>,
    ) -> Result<(), RenderError>;

    fn submit(&mut self, image_index: u32) -> Result<(), RenderError>;

    /// 返回 swapchain 是否需要重建
    fn present(&mut self, image_index: u32) -> Result<bool, RenderError>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented { image_index: u32, needs_resize: bool },
    /// swapchain 已经失效，本帧没有 submit 与 present，需要先重建 swapchain
    Skipped,
}

impl FrameOutcome {
    #[inline]
    pub fn needs_resize(&self) -> bool {
        match self {
            FrameOutcome::Presented { needs_resize, .. } => *needs_resize,
            FrameOutcome::Skipped => true,
        }
    }
}

/// 每帧：acquire → 等待 fence → collect → record → submit → present
///
/// 不论这一帧是否被跳过或者失败，帧序号都会推进
pub struct FrameDriver {
    counter: FrameCounter,
    clear_color: Vec4,
}

// new & init
impl FrameDriver {
    pub fn new(clear_color: Vec4) -> Self {
        Self {
            counter: FrameCounter::default(),
            clear_color,
        }
    }
}

// getters
impl FrameDriver {
    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        &self.counter
    }

    #[inline]
    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }
}

// update
impl FrameDriver {
    pub fn draw_frame(
        &mut self,
        backend: &mut dyn FrameBackend,
        renderers: &mut ShapeRenderers,
        ctx: &CollectContext,
        world: &hecs::World,
    ) -> Result<FrameOutcome, RenderError> {
        let outcome = self.draw_frame_inner(backend, renderers, ctx, world);
        if let Err(e) = &outcome {
            log::error!("{} failed: {}", self.counter.frame_name(), e);
        }
        self.counter.next_frame();
        outcome
    }

    fn draw_frame_inner(
        &mut self,
        backend: &mut dyn FrameBackend,
        renderers: &mut ShapeRenderers,
        ctx: &CollectContext,
        world: &hecs::World,
    ) -> Result<FrameOutcome, RenderError> {
        let (image_index, suboptimal) = match backend.acquire()? {
            GfxAcquire::Image { image_index, suboptimal } => (image_index, suboptimal),
            GfxAcquire::OutOfDate => {
                log::trace!("{} skipped: swapchain is out of date", self.counter.frame_name());
                return Ok(FrameOutcome::Skipped);
            }
        };

        backend.wait_previous(image_index)?;

        let slot = image_index as usize;
        renderers.collect(ctx, world, slot)?;
        backend.record(image_index, self.clear_color, &mut |recorder: &mut dyn DrawRecorder| {
            renderers.record(recorder, slot);
            Ok(())
        })?;

        backend.submit(image_index)?;
        let present_needs_resize = backend.present(image_index)?;

        Ok(FrameOutcome::Presented {
            image_index,
            needs_resize: suboptimal || present_needs_resize,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::recorder::mock::MockRecorder;
    use crate::shape::test_utils::{catalog_with_textures, context};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        Acquire,
        Wait(u32),
        Record(u32),
        Submit(u32),
        Present(u32),
    }

    /// 按脚本返回 acquire 结果的 backend
    pub struct MockBackend {
        pub acquire_results: Vec<GfxAcquire>,
        pub present_needs_resize: bool,
        pub events: Vec<Event>,
        pub recorder: MockRecorder,
    }

    impl MockBackend {
        pub fn new(acquire_results: Vec<GfxAcquire>) -> Self {
            Self {
                acquire_results,
                present_needs_resize: false,
                events: Vec::new(),
                recorder: MockRecorder::default(),
            }
        }
    }

    impl FrameBackend for MockBackend {
        fn acquire(&mut self) -> Result<GfxAcquire, RenderError> {
            self.events.push(Event::Acquire);
            Ok(self.acquire_results.remove(0))
        }

        fn wait_previous(&mut self, image_index: u32) -> Result<(), RenderError> {
            self.events.push(Event::Wait(image_index));
            Ok(())
        }

        fn record(
            &mut self,
            image_index: u32,
            _clear_color: Vec4,
            draw: &mut dyn FnMut(&mut dyn DrawRecorder) -> Result<(), RenderError>,
        ) -> Result<(), RenderError> {
            self.events.push(Event::Record(image_index));
            draw(&mut self.recorder)
        }

        fn submit(&mut self, image_index: u32) -> Result<(), RenderError> {
            self.events.push(Event::Submit(image_index));
            Ok(())
        }

        fn present(&mut self, image_index: u32) -> Result<bool, RenderError> {
            self.events.push(Event::Present(image_index));
            Ok(self.present_needs_resize)
        }
    }

    fn image(image_index: u32) -> GfxAcquire {
        GfxAcquire::Image {
            image_index,
            suboptimal: false,
        }
    }

    #[test]
    fn test_frame_steps_in_order() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut renderers = ShapeRenderers::default();
        let mut backend = MockBackend::new(vec![image(2)]);
        let mut driver = FrameDriver::new(Vec4::ZERO);

        let outcome = driver.draw_frame(&mut backend, &mut renderers, &ctx, &hecs::World::new()).unwrap();
        assert_eq!(
            outcome,
            FrameOutcome::Presented {
                image_index: 2,
                needs_resize: false
            }
        );
        assert_eq!(
            backend.events,
            vec![Event::Acquire, Event::Wait(2), Event::Record(2), Event::Submit(2), Event::Present(2)]
        );
        assert_eq!(driver.frame_counter().frame_id(), 1);
    }

    #[test]
    fn test_out_of_date_skips_but_advances_counter() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut renderers = ShapeRenderers::default();
        let mut backend = MockBackend::new(vec![GfxAcquire::OutOfDate, image(0)]);
        let mut driver = FrameDriver::new(Vec4::ZERO);
        let world = hecs::World::new();

        let outcome = driver.draw_frame(&mut backend, &mut renderers, &ctx, &world).unwrap();
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert!(outcome.needs_resize());
        assert_eq!(backend.events, vec![Event::Acquire]);
        assert_eq!(driver.frame_counter().frame_id(), 1);

        driver.draw_frame(&mut backend, &mut renderers, &ctx, &world).unwrap();
        assert!(backend.events.contains(&Event::Present(0)));
        assert_eq!(driver.frame_counter().frame_id(), 2);
    }

    #[test]
    fn test_suboptimal_acquire_or_present_requests_resize() {
        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut renderers = ShapeRenderers::default();
        let world = hecs::World::new();
        let mut driver = FrameDriver::new(Vec4::ZERO);

        let mut backend = MockBackend::new(vec![GfxAcquire::Image {
            image_index: 1,
            suboptimal: true,
        }]);
        let outcome = driver.draw_frame(&mut backend, &mut renderers, &ctx, &world).unwrap();
        assert!(outcome.needs_resize());
        // suboptimal 的 image 仍然会被绘制与 present
        assert!(backend.events.contains(&Event::Present(1)));

        let mut backend = MockBackend::new(vec![image(0)]);
        backend.present_needs_resize = true;
        let outcome = driver.draw_frame(&mut backend, &mut renderers, &ctx, &world).unwrap();
        assert!(outcome.needs_resize());
    }

    #[test]
    fn test_failed_frame_still_advances_counter() {
        struct FailingBackend;
        impl FrameBackend for FailingBackend {
            fn acquire(&mut self) -> Result<GfxAcquire, RenderError> {
                Err(RenderError::SlotCountMismatch { images: 4, slots: 3 })
            }
            fn wait_previous(&mut self, _: u32) -> Result<(), RenderError> {
                unreachable!()
            }
            fn record(
                &mut self,
                _: u32,
                _: Vec4,
                _: &mut dyn FnMut(&mut dyn DrawRecorder) -> Result<(), RenderError>,
            ) -> Result<(), RenderError> {
                unreachable!()
            }
            fn submit(&mut self, _: u32) -> Result<(), RenderError> {
                unreachable!()
            }
            fn present(&mut self, _: u32) -> Result<bool, RenderError> {
                unreachable!()
            }
        }

        let catalog = catalog_with_textures(&[]);
        let ctx = context(&catalog);
        let mut renderers = ShapeRenderers::default();
        let mut driver = FrameDriver::new(Vec4::ZERO);
        assert!(driver.draw_frame(&mut FailingBackend, &mut renderers, &ctx, &hecs::World::new()).is_err());
        assert_eq!(driver.frame_counter().frame_id(), 1);
    }
}
