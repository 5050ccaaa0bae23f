//! Prism 引擎的组装层
//!
//! - [`lifecycle`]：Instance → Device → Swapchain → Render → Assets 的初始化与镜像销毁
//! - [`frame_systems`]：每帧的 resize 与绘制
//! - [`engine::Engine`]：窗口宿主使用的门面

pub mod context;
pub mod engine;
pub mod frame_systems;
pub mod lifecycle;
pub mod window;

pub use context::EngineContext;
pub use engine::Engine;
pub use window::{WindowConfig, WindowHandles, WindowState};
