//! 每帧的绘制流程
//!
//! [`frame_driver::FrameDriver`] 只依赖 [`frame_driver::FrameBackend`]，
//! 真实环境下由 [`vulkan_backend::VulkanFrameBackend`] 提供 swapchain、同步对象与 command buffer。

pub mod frame_counter;
pub mod frame_driver;
pub mod frame_sync;
pub mod render_targets;
pub mod vulkan_backend;
