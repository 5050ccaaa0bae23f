use ash::vk;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// 由窗口宿主提供的窗口参数
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    /// 逻辑像素
    pub logical_size: [f64; 2],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Prism".to_string(),
            logical_size: [1280.0, 720.0],
        }
    }
}

/// 创建 surface 所需的原生句柄
#[derive(Debug, Copy, Clone)]
pub struct WindowHandles {
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

/// 引擎看到的窗口状态
#[derive(Debug, Copy, Clone, Default)]
pub struct WindowState {
    /// Instance 阶段之前必须设置
    pub handles: Option<WindowHandles>,
    /// framebuffer 的物理像素尺寸
    pub physical_extent: vk::Extent2D,
    pub scale_factor: f64,
}

impl WindowState {
    pub fn new(handles: WindowHandles, physical_extent: vk::Extent2D, scale_factor: f64) -> Self {
        Self {
            handles: Some(handles),
            physical_extent,
            scale_factor,
        }
    }

    /// 最小化时窗口尺寸为 0，此时不能创建 swapchain
    #[inline]
    pub fn is_minimized(&self) -> bool {
        self.physical_extent.width == 0 || self.physical_extent.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_extent_is_minimized() {
        let mut state = WindowState {
            scale_factor: 1.0,
            ..Default::default()
        };
        assert!(state.is_minimized());

        state.physical_extent = vk::Extent2D { width: 800, height: 0 };
        assert!(state.is_minimized());

        state.physical_extent = vk::Extent2D { width: 800, height: 600 };
        assert!(!state.is_minimized());
    }
}
