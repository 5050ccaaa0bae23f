use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::commands::command_queue::GfxQueue;
use crate::commands::semaphore::GfxSemaphore;
use crate::error::{GfxResult, VkResultExt};
use crate::foundation::device::GfxDevice;
use crate::resources::image_view::GfxImageView;
use crate::swapchain::surface::GfxSurface;

/// 创建 swapchain 时期望的参数，不受支持时会回退
#[derive(Debug, Clone, Copy)]
pub struct GfxSwapchainDesc {
    pub preferred_format: vk::SurfaceFormatKHR,
    pub preferred_present_mode: vk::PresentModeKHR,
    /// 窗口的物理像素尺寸
    pub window_extent: vk::Extent2D,
}

/// acquire 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfxAcquire {
    Image { image_index: u32, suboptimal: bool },
    /// swapchain 已经失效，需要重建之后才能继续绘制
    OutOfDate,
}

pub struct GfxRenderSwapchain {
    swapchain_handle: vk::SwapchainKHR,

    swapchain_images: Vec<vk::Image>,
    image_views: Vec<GfxImageView>,

    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    swapchain_extent: vk::Extent2D,

    device: Rc<GfxDevice>,
}

// new & init
impl GfxRenderSwapchain {
    /// `old_swapchain` 用于 resize 时的重建，由调用者在新 swapchain 创建之后销毁
    pub fn new(
        device: Rc<GfxDevice>,
        surface: &GfxSurface,
        desc: &GfxSwapchainDesc,
        old_swapchain: Option<&GfxRenderSwapchain>,
    ) -> GfxResult<Self> {
        let pdevice = device.pdevice();
        let surface_capabilities = surface.capabilities(pdevice)?;
        let surface_format = Self::choose_surface_format(&surface.formats(pdevice)?, desc.preferred_format);
        let present_mode = Self::choose_present_mode(&surface.present_modes(pdevice)?, desc.preferred_present_mode);

        let extent = Self::calculate_swapchain_extent(&surface_capabilities, desc.window_extent);
        log::info!(
            "create swapchain:
            surface current extent: {}x{}, min extent: {}x{}, max extent: {}x{}
            window physical extent: {}x{}
            final swapchain extent: {}x{}, format: {:?}, present mode: {:?}",
            surface_capabilities.current_extent.width,
            surface_capabilities.current_extent.height,
            surface_capabilities.min_image_extent.width,
            surface_capabilities.min_image_extent.height,
            surface_capabilities.max_image_extent.width,
            surface_capabilities.max_image_extent.height,
            desc.window_extent.width,
            desc.window_extent.height,
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
        );

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle)
            .min_image_count(Self::desired_image_count(&surface_capabilities))
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .clipped(true)
            .old_swapchain(old_swapchain.map_or(vk::SwapchainKHR::null(), |s| s.swapchain_handle));

        let swapchain_handle =
            unsafe { device.swapchain.create_swapchain(&create_info, None) }.vk_err("vkCreateSwapchainKHR")?;
        device.set_object_debug_name(swapchain_handle, "main");

        let swapchain_images = match unsafe { device.swapchain.get_swapchain_images(swapchain_handle) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { device.swapchain.destroy_swapchain(swapchain_handle, None) };
                return Err(crate::GfxError::Vulkan {
                    call: "vkGetSwapchainImagesKHR",
                    result: e,
                });
            }
        };

        let mut image_views = Vec::with_capacity(swapchain_images.len());
        for (idx, image) in swapchain_images.iter().enumerate() {
            device.set_object_debug_name(*image, format!("swapchain-image-{idx}"));
            match GfxImageView::for_swapchain_image(device.clone(), *image, surface_format.format, format!("swapchain-{idx}")) {
                Ok(view) => image_views.push(view),
                Err(e) => {
                    image_views.into_iter().rev().for_each(GfxImageView::destroy);
                    unsafe { device.swapchain.destroy_swapchain(swapchain_handle, None) };
                    return Err(e);
                }
            }
        }

        Ok(Self {
            swapchain_handle,
            swapchain_images,
            image_views,
            surface_format,
            present_mode,
            swapchain_extent: extent,
            device,
        })
    }
}

// getters
impl GfxRenderSwapchain {
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain_handle
    }

    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.swapchain_images
    }

    #[inline]
    pub fn image_views(&self) -> &[GfxImageView] {
        &self.image_views
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.surface_format.format
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }
}

// tools
impl GfxRenderSwapchain {
    /// 确定 window 的 extent 尺寸
    ///
    /// 如果 surface_capabilities.current_extent 包含特殊值 0xFFFFFFFF，则表示可以自己设置交换链的 extent
    pub fn calculate_swapchain_extent(
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        window_physical_extent: vk::Extent2D,
    ) -> vk::Extent2D {
        let surface_extent = surface_capabilities.current_extent;
        if surface_extent.width == u32::MAX || surface_extent.height == u32::MAX {
            let width = window_physical_extent
                .width
                .clamp(surface_capabilities.min_image_extent.width, surface_capabilities.max_image_extent.width);
            let height = window_physical_extent
                .height
                .clamp(surface_capabilities.min_image_extent.height, surface_capabilities.max_image_extent.height);
            vk::Extent2D { width, height }
        } else {
            surface_extent
        }
    }

    /// min + 1，max_image_count == 0 表示不限制 image 数量
    pub fn desired_image_count(surface_capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
        if surface_capabilities.max_image_count == 0 {
            surface_capabilities.min_image_count + 1
        } else {
            u32::min(surface_capabilities.max_image_count, surface_capabilities.min_image_count + 1)
        }
    }

    /// 优先使用期望的 format，否则使用 surface 报告的第一个 format
    pub fn choose_surface_format(
        available: &[vk::SurfaceFormatKHR],
        preferred: vk::SurfaceFormatKHR,
    ) -> vk::SurfaceFormatKHR {
        available
            .iter()
            .copied()
            .find(|f| f.format == preferred.format && f.color_space == preferred.color_space)
            .or_else(|| available.first().copied())
            .unwrap_or(preferred)
    }

    /// FIFO 一定被支持
    pub fn choose_present_mode(available: &[vk::PresentModeKHR], preferred: vk::PresentModeKHR) -> vk::PresentModeKHR {
        if available.contains(&preferred) { preferred } else { vk::PresentModeKHR::FIFO }
    }
}

// update
impl GfxRenderSwapchain {
    /// 不设置超时
    pub fn acquire_next_image(&self, semaphore: &GfxSemaphore) -> GfxResult<GfxAcquire> {
        let result = unsafe {
            self.device.swapchain.acquire_next_image(
                self.swapchain_handle,
                u64::MAX,
                semaphore.handle(),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => {
                if suboptimal {
                    log::warn!("swapchain acquire image index {} is not optimal", image_index);
                }
                Ok(GfxAcquire::Image { image_index, suboptimal })
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when acquire next image");
                Ok(GfxAcquire::OutOfDate)
            }
            Err(e) => Err(crate::GfxError::Vulkan {
                call: "vkAcquireNextImageKHR",
                result: e,
            }),
        }
    }

    /// return: need recreate
    pub fn present_image(&self, queue: &GfxQueue, image_index: u32, wait_semaphores: &[&GfxSemaphore]) -> GfxResult<bool> {
        let wait_semaphores = wait_semaphores.iter().map(|s| s.handle()).collect_vec();
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .image_indices(&image_indices)
            .swapchains(std::slice::from_ref(&self.swapchain_handle));

        let result = unsafe { self.device.swapchain.queue_present(queue.handle(), &present_info) };
        match result {
            Ok(suboptimal) => {
                if suboptimal {
                    log::warn!("swapchain present image index {} is not optimal", image_index);
                }
                Ok(suboptimal)
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when present image");
                Ok(true)
            }
            Err(e) => Err(crate::GfxError::Vulkan {
                call: "vkQueuePresentKHR",
                result: e,
            }),
        }
    }
}

// destroy
impl GfxRenderSwapchain {
    pub fn destroy(mut self) {
        log::info!("Destroying GfxRenderSwapchain");
        std::mem::take(&mut self.image_views).into_iter().rev().for_each(GfxImageView::destroy);
        unsafe {
            self.device.swapchain.destroy_swapchain(self.swapchain_handle, None);
        }
        self.swapchain_handle = vk::SwapchainKHR::null();
    }
}
impl Drop for GfxRenderSwapchain {
    fn drop(&mut self) {
        debug_assert!(self.swapchain_handle == vk::SwapchainKHR::null(), "GfxRenderSwapchain must be destroyed explicitly");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(current: vk::Extent2D, min_count: u32, max_count: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D {
                width: 4096,
                height: 4096,
            },
            min_image_count: min_count,
            max_image_count: max_count,
            ..Default::default()
        }
    }

    #[test]
    fn test_extent_uses_surface_current_extent() {
        let c = caps(vk::Extent2D { width: 800, height: 600 }, 2, 0);
        let extent = GfxRenderSwapchain::calculate_swapchain_extent(&c, vk::Extent2D { width: 1, height: 1 });
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn test_extent_clamps_window_extent_when_undefined() {
        let c = caps(
            vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            2,
            0,
        );
        let extent = GfxRenderSwapchain::calculate_swapchain_extent(
            &c,
            vk::Extent2D {
                width: 10000,
                height: 300,
            },
        );
        assert_eq!((extent.width, extent.height), (4096, 300));
    }

    #[test]
    fn test_image_count() {
        let zero = vk::Extent2D::default();
        assert_eq!(GfxRenderSwapchain::desired_image_count(&caps(zero, 2, 0)), 3);
        assert_eq!(GfxRenderSwapchain::desired_image_count(&caps(zero, 2, 2)), 2);
        assert_eq!(GfxRenderSwapchain::desired_image_count(&caps(zero, 2, 8)), 3);
    }

    #[test]
    fn test_choose_surface_format_fallback() {
        let preferred = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let other = vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        assert_eq!(GfxRenderSwapchain::choose_surface_format(&[other, preferred], preferred), preferred);
        assert_eq!(GfxRenderSwapchain::choose_surface_format(&[other], preferred), other);
    }

    #[test]
    fn test_choose_present_mode_falls_back_to_fifo() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(
            GfxRenderSwapchain::choose_present_mode(&modes, vk::PresentModeKHR::IMMEDIATE),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(GfxRenderSwapchain::choose_present_mode(&modes, vk::PresentModeKHR::MAILBOX), vk::PresentModeKHR::FIFO);
    }
}
