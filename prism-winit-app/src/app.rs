use std::time::Instant;

use ash::vk;
use prism_app::{Engine, WindowConfig, WindowHandles, WindowState};
use prism_renderer::RendererSettings;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

use crate::outer_app::OuterApp;

pub struct WinitApp {
    engine: Engine,
    outer_app: Box<dyn OuterApp>,
    config: WindowConfig,

    /// 必须在引擎 shutdown 之后才能释放，surface 依赖它
    window: Option<Window>,
    last_update: Instant,

    /// 导致事件循环退出的错误
    fatal: Option<anyhow::Error>,
}

// 总的 main 函数
impl WinitApp {
    /// 整个程序的入口，出错时返回导致退出的错误
    pub fn run(mut outer_app: Box<dyn OuterApp>) -> anyhow::Result<()> {
        Engine::init_env();

        let settings = RendererSettings::load_default_path()?;
        let config = outer_app.window_config();
        let mut engine = Engine::new(config.title.clone(), settings)?;
        outer_app.init(&mut engine)?;

        let event_loop = EventLoop::new()?;
        let mut app = Self {
            engine,
            outer_app,
            config,
            window: None,
            last_update: Instant::now(),
            fatal: None,
        };
        event_loop.run_app(&mut app)?;

        app.engine.shutdown();
        log::info!("end run.");

        match app.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// new & init
impl WinitApp {
    /// 在 window 创建之后调用，按阶段初始化引擎
    fn init_after_window(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attr = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(self.config.logical_size[0], self.config.logical_size[1]));
        let window = event_loop.create_window(window_attr)?;

        let handles = WindowHandles {
            display: window.display_handle()?.as_raw(),
            window: window.window_handle()?.as_raw(),
        };
        let size = window.inner_size();
        let state = WindowState::new(
            handles,
            vk::Extent2D {
                width: size.width,
                height: size.height,
            },
            window.scale_factor(),
        );

        self.window = Some(window);
        self.engine.init(state)?;
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        log::error!("{:#}", e);
        self.fatal = Some(e);
        event_loop.exit();
    }
}

// update
impl WinitApp {
    fn redraw(&mut self) -> anyhow::Result<()> {
        let now = Instant::now();
        let delta_seconds = (now - self.last_update).as_secs_f32();
        self.last_update = now;

        self.outer_app.update(self.engine.world_mut(), delta_seconds);
        self.engine.tick()?;
        Ok(())
    }
}

// 各种 winit 的事件处理
impl ApplicationHandler for WinitApp {
    // 建议在这里创建 window 和 Renderer
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        log::info!("winit event: resumed");

        if let Err(e) = self.init_after_window(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let scale_factor = self.window.as_ref().map_or(1.0, Window::scale_factor);
                self.engine.resize(
                    vk::Extent2D {
                        width: size.width,
                        height: size.height,
                    },
                    scale_factor,
                );
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let extent = self.engine.context().window.physical_extent;
                self.engine.resize(extent, scale_factor);
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::warn!("winit event: suspended");
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("loop exiting");
        // window 仍然存活，先销毁依赖它的 surface
        self.engine.shutdown();
    }
}
