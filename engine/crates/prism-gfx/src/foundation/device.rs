use std::cell::Cell;
use std::ffi::{CStr, CString};
use std::ops::Deref;

use ash::vk;
use itertools::Itertools;

use crate::commands::command_queue::GfxQueueFamily;
use crate::error::{GfxResult, VkResultExt};
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::instance::GfxInstance;
use crate::foundation::physical_device::GfxPhysicalDevice;

/// Vulkan 逻辑设备封装
///
/// 包含核心设备 API、swapchain 扩展以及可选的 debug utils。
/// 以 `Rc<GfxDevice>` 的形式被其他对象持有，但销毁时机由 Device 阶段显式控制。
pub struct GfxDevice {
    /// 核心 Vulkan 设备 API
    pub(crate) device: ash::Device,
    /// 交换链扩展 API
    pub(crate) swapchain: ash::khr::swapchain::Device,
    /// 调试工具扩展 API，instance 不支持时为 None
    pub(crate) debug_utils: Option<ash::ext::debug_utils::Device>,

    pdevice: GfxPhysicalDevice,
    gfx_queue: vk::Queue,

    destroyed: Cell<bool>,
}

impl Deref for GfxDevice {
    type Target = ash::Device;

    fn deref(&self) -> &Self::Target {
        debug_assert!(!self.destroyed.get(), "GfxDevice is used after destroy");
        &self.device
    }
}

// new & init
impl GfxDevice {
    pub fn new(instance: &GfxInstance, pdevice: GfxPhysicalDevice) -> GfxResult<Self> {
        // device 所需的所有 extension
        let device_exts = Self::basic_device_exts().iter().map(|e| e.as_ptr()).collect_vec();
        let exts_str = Self::basic_device_exts().iter().map(|e| format!("\n\t{:?}", e)).join("");
        log::info!("device exts: {}", exts_str);

        // synchronization2 用于 barrier2 与 submit2
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default().synchronization2(true);
        let mut all_features = vk::PhysicalDeviceFeatures2::default().push_next(&mut features13);

        let queue_priorities = [1.0_f32];
        let queue_create_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(pdevice.gfx_queue_family.queue_family_index)
            .queue_priorities(&queue_priorities);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_create_info))
            .enabled_extension_names(&device_exts)
            .push_next(&mut all_features);

        let device = unsafe { instance.ash_instance.create_device(pdevice.vk_handle, &device_create_info, None) }
            .vk_err("vkCreateDevice")?;

        let swapchain = ash::khr::swapchain::Device::new(&instance.ash_instance, &device);
        let debug_utils = instance
            .debug_utils_enabled()
            .then(|| ash::ext::debug_utils::Device::new(&instance.ash_instance, &device));
        let gfx_queue = unsafe { device.get_device_queue(pdevice.gfx_queue_family.queue_family_index, 0) };

        let gfx_device = Self {
            device,
            swapchain,
            debug_utils,
            pdevice,
            gfx_queue,
            destroyed: Cell::new(false),
        };
        gfx_device.set_object_debug_name(gfx_queue, "gfx-queue");
        Ok(gfx_device)
    }

    /// 必要的 device extensions
    fn basic_device_exts() -> Vec<&'static CStr> {
        vec![ash::khr::swapchain::NAME]
    }
}

// getters
impl GfxDevice {
    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn pdevice(&self) -> &GfxPhysicalDevice {
        &self.pdevice
    }

    #[inline]
    pub fn gfx_queue_family(&self) -> &GfxQueueFamily {
        &self.pdevice.gfx_queue_family
    }

    #[inline]
    pub(crate) fn gfx_queue_handle(&self) -> vk::Queue {
        self.gfx_queue
    }

    #[inline]
    pub fn limits(&self) -> &vk::PhysicalDeviceLimits {
        &self.pdevice.basic_props.limits
    }
}

// tools
impl GfxDevice {
    /// 见 [`crate::foundation::memory_type::find_memory_type_index`]
    #[inline]
    pub fn find_memory_type(&self, type_bits: u32, properties: vk::MemoryPropertyFlags) -> GfxResult<u32> {
        self.pdevice.find_memory_type(type_bits, properties)
    }

    #[inline]
    pub fn set_debug_name(&self, handle: &impl DebugType, name: impl AsRef<str>) {
        self.set_object_debug_name(handle.vk_handle(), name);
    }

    pub fn set_object_debug_name(&self, handle: impl vk::Handle, name: impl AsRef<str>) {
        let Some(debug_utils) = &self.debug_utils else {
            return;
        };
        let Ok(name) = CString::new(name.as_ref()) else {
            return;
        };
        let result = unsafe {
            debug_utils.set_debug_utils_object_name(
                &vk::DebugUtilsObjectNameInfoEXT::default().object_name(name.as_c_str()).object_handle(handle),
            )
        };
        if let Err(e) = result {
            log::debug!("failed to set debug name {:?}: {}", name, e);
        }
    }

    /// 阻塞等待 device 上所有的任务完成
    pub fn wait_idle(&self) -> GfxResult<()> {
        unsafe { self.device.device_wait_idle() }.vk_err("vkDeviceWaitIdle")
    }

    /// 更新一个 combined image sampler descriptor
    pub fn write_combined_image_sampler(
        &self,
        set: vk::DescriptorSet,
        binding: u32,
        image_view: vk::ImageView,
        sampler: vk::Sampler,
    ) {
        let image_info = vk::DescriptorImageInfo::default()
            .image_view(image_view)
            .sampler(sampler)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        let write = vk::WriteDescriptorSet::default()
            .dst_set(set)
            .dst_binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(std::slice::from_ref(&image_info));
        unsafe {
            self.device.update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }
    }
}

// destroy
impl GfxDevice {
    /// 所有持有 device 的对象都必须在此之前销毁
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        log::info!("Destroying GfxDevice");
        unsafe {
            self.device.destroy_device(None);
        }
    }
}

impl DebugType for GfxDevice {
    fn debug_type_name() -> &'static str {
        "GfxDevice"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.device.handle()
    }
}
