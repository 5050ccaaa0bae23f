use std::ffi::CStr;

use ash::vk;
use itertools::Itertools;

use crate::commands::command_queue::GfxQueueFamily;
use crate::error::{GfxError, GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::instance::GfxInstance;
use crate::foundation::memory_type::find_memory_type_index;
use crate::swapchain::surface::GfxSurface;

/// 表示一张物理显卡
pub struct GfxPhysicalDevice {
    pub(crate) vk_handle: vk::PhysicalDevice,

    /// 当前 gpu 的基础属性
    pub(crate) basic_props: vk::PhysicalDeviceProperties,

    /// memory type 表，所有 allocator 都依赖它来确定 memory type
    pub(crate) mem_props: vk::PhysicalDeviceMemoryProperties,

    /// 同时支持 graphics 和 present 的 queue family
    pub(crate) gfx_queue_family: GfxQueueFamily,
}

// new & init
impl GfxPhysicalDevice {
    /// 选择一张可以向 `surface` 呈现的显卡
    ///
    /// 要求：vulkan 1.3，支持 swapchain extension，存在同时支持 graphics 和 present 的 queue family。
    /// 优先选择独立显卡，如果没有则选择第一个可用的显卡
    pub fn select(instance: &GfxInstance, surface: &GfxSurface) -> GfxResult<Self> {
        let pdevices =
            unsafe { instance.ash_instance.enumerate_physical_devices() }.vk_err("vkEnumeratePhysicalDevices")?;

        let mut saw_graphics_only = false;
        let mut candidates = Vec::new();
        for pdevice in pdevices {
            match Self::inspect(instance, surface, pdevice)? {
                Candidate::Suitable(candidate) => candidates.push(candidate),
                Candidate::NoPresent => saw_graphics_only = true,
                Candidate::Unsuitable => {}
            }
        }

        if candidates.is_empty() {
            return Err(if saw_graphics_only { GfxError::NoPresentQueue } else { GfxError::NoSuitableGpu });
        }

        // 优先使用独立显卡
        let chosen = candidates.into_iter().find_or_first(GfxPhysicalDevice::is_descrete_gpu).ok_or(GfxError::NoSuitableGpu)?;
        log::info!(
            "selected gpu: {:?}, queue family: {}",
            unsafe { CStr::from_ptr(chosen.basic_props.device_name.as_ptr()) },
            chosen.gfx_queue_family.queue_family_index
        );
        Ok(chosen)
    }

    fn inspect(instance: &GfxInstance, surface: &GfxSurface, pdevice: vk::PhysicalDevice) -> GfxResult<Candidate> {
        let ash_instance = &instance.ash_instance;
        let basic_props = unsafe { ash_instance.get_physical_device_properties(pdevice) };
        let device_name = unsafe { CStr::from_ptr(basic_props.device_name.as_ptr()) };
        log::info!("found gpu: {:?}", device_name);

        if basic_props.api_version < vk::API_VERSION_1_3 {
            log::info!("skip gpu {:?}: vulkan 1.3 is not supported", device_name);
            return Ok(Candidate::Unsuitable);
        }

        let device_exts = unsafe { ash_instance.enumerate_device_extension_properties(pdevice) }
            .vk_err("vkEnumerateDeviceExtensionProperties")?;
        let swapchain_supported = device_exts
            .iter()
            .any(|ext| ash::khr::swapchain::NAME == unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) });
        if !swapchain_supported {
            log::info!("skip gpu {:?}: swapchain is not supported", device_name);
            return Ok(Candidate::Unsuitable);
        }

        let queue_family_props = unsafe { ash_instance.get_physical_device_queue_family_properties(pdevice) };
        log::debug!("physical device: queue family props:\n{:#?}", queue_family_props);

        let mut has_graphics = false;
        for (family_idx, props) in queue_family_props.iter().enumerate() {
            if !props.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                continue;
            }
            has_graphics = true;

            let present_supported = unsafe {
                surface.pf.get_physical_device_surface_support(pdevice, family_idx as u32, surface.handle)
            }
            .vk_err("vkGetPhysicalDeviceSurfaceSupportKHR")?;
            if present_supported {
                return Ok(Candidate::Suitable(Self {
                    vk_handle: pdevice,
                    basic_props,
                    mem_props: unsafe { ash_instance.get_physical_device_memory_properties(pdevice) },
                    gfx_queue_family: GfxQueueFamily {
                        name: "gfx".to_string(),
                        queue_family_index: family_idx as u32,
                        queue_flags: props.queue_flags,
                        queue_count: props.queue_count,
                    },
                }));
            }
        }

        Ok(if has_graphics { Candidate::NoPresent } else { Candidate::Unsuitable })
    }
}

enum Candidate {
    Suitable(GfxPhysicalDevice),
    NoPresent,
    Unsuitable,
}

// getters
impl GfxPhysicalDevice {
    #[inline]
    pub fn handle(&self) -> vk::PhysicalDevice {
        self.vk_handle
    }

    #[inline]
    pub fn basic_props(&self) -> &vk::PhysicalDeviceProperties {
        &self.basic_props
    }

    #[inline]
    pub fn mem_props(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.mem_props
    }

    #[inline]
    pub fn gfx_queue_family(&self) -> &GfxQueueFamily {
        &self.gfx_queue_family
    }

    /// 当前 gpu 是否是独立显卡
    #[inline]
    pub fn is_descrete_gpu(&self) -> bool {
        self.basic_props.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
    }
}

// tools
impl GfxPhysicalDevice {
    #[inline]
    pub fn find_memory_type(&self, type_bits: u32, properties: vk::MemoryPropertyFlags) -> GfxResult<u32> {
        find_memory_type_index(&self.mem_props, type_bits, properties)
    }

    /// 按顺序选出第一个可以用作 depth attachment 的格式
    pub fn find_depth_format(&self, instance: &GfxInstance, candidates: &[vk::Format]) -> GfxResult<vk::Format> {
        candidates
            .iter()
            .copied()
            .find(|&format| {
                let props =
                    unsafe { instance.ash_instance.get_physical_device_format_properties(self.vk_handle, format) };
                props.optimal_tiling_features.contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .ok_or_else(|| GfxError::NoDepthFormat(candidates.to_vec()))
    }
}

impl DebugType for GfxPhysicalDevice {
    fn debug_type_name() -> &'static str {
        "GfxPhysicalDevice"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.vk_handle
    }
}
