//! Prism 的 Vulkan 封装层
//!
//! 所有对象都通过显式传入的 `Rc<GfxDevice>` / `Rc<GfxAllocator>` 创建，不存在全局单例。
//! 销毁顺序由上层的阶段图保证：持有 device 的对象必须先于 device 销毁。

pub mod basic;
pub mod commands;
pub mod descriptors;
pub mod error;
pub mod foundation;
pub mod pipelines;
pub mod resources;
pub mod swapchain;

pub use error::{GfxError, GfxResult, VkResultExt};
