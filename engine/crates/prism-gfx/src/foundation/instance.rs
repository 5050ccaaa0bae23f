use std::ffi::{CStr, CString, c_char};

use ash::vk;
use itertools::Itertools;

use crate::error::{GfxError, GfxResult, VkResultExt};
use crate::foundation::debug_messenger::GfxDebugMsger;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

pub struct GfxInstance {
    /// 仅仅是函数指针，需要比 instance 活得更久
    pub(crate) vk_entry: ash::Entry,
    pub(crate) ash_instance: ash::Instance,

    debug_msger: Option<GfxDebugMsger>,
    debug_utils_enabled: bool,
}

// new & init
impl GfxInstance {
    /// 设置所需的 layers 和 extensions，创建 vk instance
    ///
    /// `display_handle` 用于确定 surface 相关的 instance extension
    pub fn new(
        app_name: &str,
        display_handle: raw_window_handle::RawDisplayHandle,
        enable_validation: bool,
    ) -> GfxResult<Self> {
        let vk_entry = unsafe { ash::Entry::load()? };

        let app_name = CString::new(app_name).unwrap_or_default();
        let app_info = vk::ApplicationInfo::default()
            .api_version(vk::API_VERSION_1_3) // 版本过低时，有些函数无法正确加载
            .application_name(app_name.as_c_str())
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"prism")
            .engine_version(vk::make_api_version(0, 1, 0, 0));

        let all_ext_props =
            unsafe { vk_entry.enumerate_instance_extension_properties(None) }.vk_err("enumerate instance extensions")?;
        let is_ext_supported = |ext: &CStr| {
            all_ext_props.iter().any(|props| ext == unsafe { CStr::from_ptr(props.extension_name.as_ptr()) })
        };

        // surface 相关的 extension 必须支持
        let mut enabled_extensions: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(display_handle).vk_err("enumerate surface extensions")?.to_vec();
        for ext in &enabled_extensions {
            let ext = unsafe { CStr::from_ptr(*ext) };
            if !is_ext_supported(ext) {
                return Err(GfxError::MissingInstanceExtension(ext.to_string_lossy().into_owned()));
            }
        }

        // debug utils 可选：用于 debug messenger、object name 和 command label
        let debug_utils_enabled = is_ext_supported(vk::EXT_DEBUG_UTILS_NAME);
        if debug_utils_enabled {
            enabled_extensions.push(vk::EXT_DEBUG_UTILS_NAME.as_ptr());
        } else {
            log::warn!("{:?} is not supported, debug names are disabled", vk::EXT_DEBUG_UTILS_NAME);
        }

        let enabled_extensions_str =
            enabled_extensions.iter().map(|ext| format!("\n\t{:?}", unsafe { CStr::from_ptr(*ext) })).join("");
        log::info!("instance extensions: {}", enabled_extensions_str);

        let enabled_layers = Self::get_layers(&vk_entry, enable_validation)?;

        let mut debug_utils_messenger_ci = GfxDebugMsger::debug_utils_messenger_ci();
        let mut instance_ci = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extensions)
            .enabled_layer_names(&enabled_layers);
        if debug_utils_enabled {
            instance_ci = instance_ci.push_next(&mut debug_utils_messenger_ci);
        }

        let ash_instance = unsafe { vk_entry.create_instance(&instance_ci, None) }.vk_err("vkCreateInstance")?;

        let debug_msger = if debug_utils_enabled {
            match GfxDebugMsger::new(&vk_entry, &ash_instance) {
                Ok(msger) => Some(msger),
                Err(e) => {
                    log::warn!("failed to create debug messenger: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            vk_entry,
            ash_instance,
            debug_msger,
            debug_utils_enabled,
        })
    }

    /// instance 所需的所有 layers
    ///
    /// validation layer 不可用时仅给出警告
    fn get_layers(vk_entry: &ash::Entry, enable_validation: bool) -> GfxResult<Vec<*const c_char>> {
        if !enable_validation {
            return Ok(Vec::new());
        }

        let all_layer_props =
            unsafe { vk_entry.enumerate_instance_layer_properties() }.vk_err("enumerate instance layers")?;
        let supported = all_layer_props
            .iter()
            .any(|layer| VALIDATION_LAYER == unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) });
        if supported {
            log::info!("instance layers: \n\t{:?}", VALIDATION_LAYER);
            Ok(vec![VALIDATION_LAYER.as_ptr()])
        } else {
            log::warn!("{:?} is not available", VALIDATION_LAYER);
            Ok(Vec::new())
        }
    }
}

// getters
impl GfxInstance {
    #[inline]
    pub fn ash_instance(&self) -> &ash::Instance {
        &self.ash_instance
    }

    #[inline]
    pub fn vk_entry(&self) -> &ash::Entry {
        &self.vk_entry
    }

    #[inline]
    pub fn debug_utils_enabled(&self) -> bool {
        self.debug_utils_enabled
    }
}

// destroy
impl GfxInstance {
    pub fn destroy(mut self) {
        if let Some(msger) = self.debug_msger.take() {
            msger.destroy();
        }
        log::info!("Destroying GfxInstance");
        unsafe {
            self.ash_instance.destroy_instance(None);
        }
    }
}
