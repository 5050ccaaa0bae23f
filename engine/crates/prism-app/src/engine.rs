use ash::vk;
use prism_asset::{Asset, GpuUploadContext};
use prism_crate_tools::init_log::init_log;
use prism_phase::{PhaseError, PhaseGraph};
use prism_renderer::RendererSettings;

use crate::context::EngineContext;
use crate::frame_systems::frame_graph;
use crate::lifecycle::lifecycle_graph;
use crate::window::WindowState;

pub fn panic_handler(info: &std::panic::PanicHookInfo) {
    log::error!("{}", info);
}

/// 引擎的门面：持有上下文、生命周期阶段图与每帧阶段图
///
/// 使用顺序：`new` → 注册资源与 system → `init` → 循环 `tick` → `shutdown`
pub struct Engine {
    ctx: EngineContext,
    lifecycle: PhaseGraph<EngineContext>,
    frame: PhaseGraph<EngineContext>,
}

// new & init
impl Engine {
    /// 设置 panic hook 并初始化日志，在程序入口调用一次
    pub fn init_env() {
        std::panic::set_hook(Box::new(panic_handler));
        init_log();
    }

    pub fn new(app_name: impl Into<String>, settings: RendererSettings) -> Result<Self, PhaseError> {
        Ok(Self {
            ctx: EngineContext::new(app_name, settings),
            lifecycle: lifecycle_graph()?,
            frame: frame_graph()?,
        })
    }

    /// 需要在 `init` 之前注册，Assets 阶段按注册顺序加载
    pub fn add_asset(&mut self, asset: impl Asset<GpuUploadContext> + 'static) -> &mut Self {
        self.ctx.bundle.push(asset);
        self
    }

    /// 注册每帧执行的 system，同一阶段内排在内置 system 之后
    pub fn add_frame_system(
        &mut self,
        phase: &str,
        system: impl FnMut(&mut EngineContext) -> anyhow::Result<()> + 'static,
    ) -> Result<&mut Self, PhaseError> {
        self.frame.add_system(phase, system)?;
        Ok(self)
    }

    /// 按顺序执行所有生命周期阶段；任意阶段失败时，已完成的阶段会被镜像销毁
    pub fn init(&mut self, window: WindowState) -> Result<(), PhaseError> {
        self.ctx.window = window;
        self.lifecycle.run_all(&mut self.ctx)
    }
}

// getters
impl Engine {
    #[inline]
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    #[inline]
    pub fn world(&self) -> &hecs::World {
        &self.ctx.world
    }

    #[inline]
    pub fn world_mut(&mut self) -> &mut hecs::World {
        &mut self.ctx.world
    }

    /// 用于插入自定义的生命周期阶段
    #[inline]
    pub fn lifecycle_mut(&mut self) -> &mut PhaseGraph<EngineContext> {
        &mut self.lifecycle
    }

    pub fn frame_id(&self) -> Option<u64> {
        self.ctx.render.as_ref().map(|r| r.driver.frame_counter().frame_id())
    }
}

// update
impl Engine {
    /// 执行一次每帧阶段图；GPU 对象尚未就绪时什么都不做
    pub fn tick(&mut self) -> Result<(), PhaseError> {
        if !self.ctx.is_ready() {
            return Ok(());
        }
        let order = self.frame.init_order().to_vec();
        for phase in &order {
            self.frame.run(phase, &mut self.ctx)?;
        }
        Ok(())
    }

    /// 窗口尺寸变化，swapchain 在下一次 `tick` 时重建
    pub fn resize(&mut self, physical_extent: vk::Extent2D, scale_factor: f64) {
        log::info!("window resized: {}x{}, scale {}", physical_extent.width, physical_extent.height, scale_factor);
        self.ctx.window.physical_extent = physical_extent;
        self.ctx.window.scale_factor = scale_factor;
        if let Some(swapchain) = &mut self.ctx.swapchain {
            swapchain.dirty = true;
        }
    }
}

// destroy
impl Engine {
    /// 按镜像顺序销毁所有已初始化的阶段，可以重复调用
    pub fn shutdown(&mut self) {
        self.ctx.wait_idle();
        self.lifecycle.run_teardown_all(&mut self.ctx);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        debug_assert!(self.ctx.instance.is_none(), "Engine is not shut down");
    }
}

#[cfg(test)]
mod tests {
    use prism_phase::phases;

    use super::*;

    #[test]
    fn test_init_failure_names_the_phase() {
        let mut engine = Engine::new("test", RendererSettings::default()).unwrap();
        let err = engine.init(WindowState::default()).unwrap_err();
        assert_eq!(err.phase(), phases::INSTANCE);
        assert!(engine.frame_id().is_none());
        engine.shutdown();
    }

    #[test]
    fn test_tick_before_init_is_noop() {
        let mut engine = Engine::new("test", RendererSettings::default()).unwrap();
        let ticks = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = ticks.clone();
        engine
            .add_frame_system(phases::POST_DRAW, move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            })
            .unwrap();

        engine.tick().unwrap();
        assert_eq!(ticks.get(), 0);
    }

    #[test]
    fn test_resize_without_swapchain_updates_window() {
        let mut engine = Engine::new("test", RendererSettings::default()).unwrap();
        engine.resize(vk::Extent2D { width: 0, height: 0 }, 2.0);
        assert!(engine.context().window.is_minimized());
        assert_eq!(engine.context().window.scale_factor, 2.0);
    }

    #[test]
    fn test_unknown_frame_phase_is_rejected() {
        let mut engine = Engine::new("test", RendererSettings::default()).unwrap();
        assert!(matches!(
            engine.add_frame_system("Nope", |_| Ok(())),
            Err(PhaseError::UnknownPhase(_))
        ));
    }

    #[test]
    fn test_custom_phase_inserted_before_assets() {
        let mut engine = Engine::new("test", RendererSettings::default()).unwrap();
        engine.lifecycle_mut().add_phase_between("Audio", phases::RENDER, phases::ASSETS).unwrap();

        let order = engine.lifecycle_mut().init_order().to_vec();
        let audio = order.iter().position(|p| p == "Audio").unwrap();
        assert_eq!(order[audio - 1], phases::RENDER);
        assert_eq!(order[audio + 1], phases::ASSETS);
        assert!(engine.lifecycle_mut().is_mirrored());
    }
}
