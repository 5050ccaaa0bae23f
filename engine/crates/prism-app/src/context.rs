use std::rc::Rc;

use prism_asset::texture::Texture;
use prism_asset::{AssetCatalog, GpuAssetBundle, GpuUploadContext};
use prism_gfx::commands::command_queue::GfxQueue;
use prism_gfx::descriptors::descriptor_set_layout::GfxDescriptorSetLayout;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::foundation::instance::GfxInstance;
use prism_gfx::foundation::mem_allocator::GfxAllocator;
use prism_gfx::pipelines::render_pass::GfxRenderPass;
use prism_gfx::swapchain::render_swapchain::GfxRenderSwapchain;
use prism_gfx::swapchain::surface::GfxSurface;
use prism_phase::phases;
use prism_renderer::RendererSettings;
use prism_renderer::frame::frame_driver::FrameDriver;
use prism_renderer::frame::frame_sync::FrameSync;
use prism_renderer::frame::render_targets::RenderTargets;
use prism_renderer::shape::registry::ShapeRenderers;

use crate::window::WindowState;

/// Instance 阶段的产物，surface 在选择显卡时就需要，因此一起创建
pub struct InstanceRecord {
    pub instance: GfxInstance,
    pub surface: GfxSurface,
}

pub struct DeviceRecord {
    pub device: Rc<GfxDevice>,
    pub allocator: Rc<GfxAllocator>,
    pub queue: GfxQueue,
}

pub struct SwapchainRecord {
    pub swapchain: GfxRenderSwapchain,
    /// 窗口尺寸变化或者 swapchain 失效之后置为 true，下一次 tick 重建
    pub dirty: bool,
}

/// Render 阶段的产物，render pass 与 pipeline 在 resize 时保持不变
pub struct RenderRecord {
    pub render_pass: GfxRenderPass,
    pub texture_set_layout: GfxDescriptorSetLayout,
    pub targets: RenderTargets,
    pub sync: FrameSync,
    pub renderers: ShapeRenderers,
    pub driver: FrameDriver,
}

pub struct AssetRecord {
    pub upload: GpuUploadContext,
    pub catalog: AssetCatalog,
}

/// 所有阶段 system 共享的上下文
///
/// 每个 GPU 阶段对应一个 `Option` 记录，由该阶段的初始化 system 填充，销毁 system 取走。
pub struct EngineContext {
    pub app_name: String,
    pub settings: RendererSettings,
    pub window: WindowState,
    pub world: hecs::World,
    /// 在 Assets 阶段加载，注册顺序即加载顺序
    pub bundle: GpuAssetBundle,

    pub instance: Option<InstanceRecord>,
    pub device: Option<DeviceRecord>,
    pub swapchain: Option<SwapchainRecord>,
    pub render: Option<RenderRecord>,
    pub assets: Option<AssetRecord>,
}

// new & init
impl EngineContext {
    /// bundle 中预先放入白色纹理，作为 sprite 与无纹理 mesh 的回退
    pub fn new(app_name: impl Into<String>, settings: RendererSettings) -> Self {
        Self {
            app_name: app_name.into(),
            settings,
            window: WindowState::default(),
            world: hecs::World::new(),
            bundle: GpuAssetBundle::new().with(Texture::white()),
            instance: None,
            device: None,
            swapchain: None,
            render: None,
            assets: None,
        }
    }
}

// getters
impl EngineContext {
    pub fn instance_record(&self) -> anyhow::Result<&InstanceRecord> {
        self.instance.as_ref().ok_or_else(|| not_initialized(phases::INSTANCE))
    }

    pub fn device_record(&self) -> anyhow::Result<&DeviceRecord> {
        self.device.as_ref().ok_or_else(|| not_initialized(phases::DEVICE))
    }

    pub fn swapchain_record(&self) -> anyhow::Result<&SwapchainRecord> {
        self.swapchain.as_ref().ok_or_else(|| not_initialized(phases::SWAPCHAIN))
    }

    /// GPU 对象是否都已经就绪，可以开始绘制
    pub fn is_ready(&self) -> bool {
        self.swapchain.is_some() && self.render.is_some() && self.assets.is_some()
    }

    /// 等待 GPU 空闲，在销毁或重建任何 GPU 对象之前调用
    pub fn wait_idle(&self) {
        if let Some(device) = &self.device {
            if let Err(e) = device.device.wait_idle() {
                log::error!("failed to wait device idle: {}", e);
            }
        }
    }
}

fn not_initialized(phase: &str) -> anyhow::Error {
    anyhow::anyhow!("phase '{}' has not been initialized", phase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_has_white_texture_and_no_gpu_state() {
        let ctx = EngineContext::new("test", RendererSettings::default());
        assert_eq!(ctx.bundle.names().collect::<Vec<_>>(), vec!["builtin-white"]);
        assert!(!ctx.is_ready());
        assert!(ctx.device_record().is_err());
    }
}
