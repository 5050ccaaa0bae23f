//! 引擎的生命周期阶段
//!
//! Start → Instance → Device → Swapchain → Render → Assets → End，
//! 每个阶段的销毁 system 只释放本阶段创建的对象，销毁顺序由 [`PhaseGraph`] 镜像保证。

use std::rc::Rc;

use prism_asset::{AssetCatalog, GpuUploadContext, RenderCaps};
use prism_gfx::GfxError;
use prism_gfx::commands::command_queue::GfxQueue;
use prism_gfx::descriptors::descriptor_set_layout::GfxDescriptorSetLayout;
use prism_gfx::foundation::device::GfxDevice;
use prism_gfx::foundation::instance::GfxInstance;
use prism_gfx::foundation::mem_allocator::GfxAllocator;
use prism_gfx::foundation::physical_device::GfxPhysicalDevice;
use prism_gfx::pipelines::render_pass::GfxRenderPass;
use prism_gfx::swapchain::render_swapchain::{GfxRenderSwapchain, GfxSwapchainDesc};
use prism_gfx::swapchain::surface::GfxSurface;
use prism_phase::{PhaseError, PhaseGraph, phases};
use prism_renderer::RendererSettings;
use prism_renderer::frame::frame_driver::FrameDriver;
use prism_renderer::frame::frame_sync::FrameSync;
use prism_renderer::frame::render_targets::RenderTargets;
use prism_renderer::settings::DefaultRendererSettings;
use prism_renderer::shader_library::ShaderLibrary;
use prism_renderer::shape::pass::ShapeInitContext;
use prism_renderer::shape::registry::ShapeRenderers;

use crate::context::{AssetRecord, DeviceRecord, EngineContext, InstanceRecord, RenderRecord, SwapchainRecord};
use crate::window::WindowState;

/// 构建引擎的生命周期阶段图，并注册每个阶段的初始化与销毁 system
pub fn lifecycle_graph() -> Result<PhaseGraph<EngineContext>, PhaseError> {
    let mut graph = PhaseGraph::with_phases([phases::START, phases::END])?;
    for (phase, predecessor) in [
        (phases::INSTANCE, phases::START),
        (phases::DEVICE, phases::INSTANCE),
        (phases::SWAPCHAIN, phases::DEVICE),
        (phases::RENDER, phases::SWAPCHAIN),
        (phases::ASSETS, phases::RENDER),
    ] {
        graph.add_phase_between(phase, predecessor, phases::END)?;
    }

    graph.add_system(phases::INSTANCE, init_instance)?.add_teardown_system(phases::INSTANCE, teardown_instance)?;
    graph.add_system(phases::DEVICE, init_device)?.add_teardown_system(phases::DEVICE, teardown_device)?;
    graph.add_system(phases::SWAPCHAIN, init_swapchain)?.add_teardown_system(phases::SWAPCHAIN, teardown_swapchain)?;
    graph.add_system(phases::RENDER, init_render)?.add_teardown_system(phases::RENDER, teardown_render)?;
    graph.add_system(phases::ASSETS, init_assets)?.add_teardown_system(phases::ASSETS, teardown_assets)?;
    Ok(graph)
}

/// swapchain 的期望参数，创建与重建共用
pub fn swapchain_desc(settings: &RendererSettings, window: &WindowState) -> GfxSwapchainDesc {
    GfxSwapchainDesc {
        preferred_format: settings.surface_format(),
        preferred_present_mode: settings.present_mode(),
        window_extent: window.physical_extent,
    }
}

// Instance
fn init_instance(ctx: &mut EngineContext) -> anyhow::Result<()> {
    let handles = ctx
        .window
        .handles
        .ok_or_else(|| GfxError::MissingWindowHandle("window handles must be set before the Instance phase".to_string()))?;

    let instance = GfxInstance::new(&ctx.app_name, handles.display, cfg!(debug_assertions))?;
    let surface = match GfxSurface::new(&instance, handles.display, handles.window) {
        Ok(surface) => surface,
        Err(e) => {
            instance.destroy();
            return Err(e.into());
        }
    };

    ctx.instance = Some(InstanceRecord { instance, surface });
    Ok(())
}

fn teardown_instance(ctx: &mut EngineContext) {
    if let Some(InstanceRecord { instance, surface }) = ctx.instance.take() {
        surface.destroy();
        instance.destroy();
    }
}

// Device
fn init_device(ctx: &mut EngineContext) -> anyhow::Result<()> {
    let record = {
        let InstanceRecord { instance, surface } = ctx.instance_record()?;
        let pdevice = GfxPhysicalDevice::select(instance, surface)?;
        let device = Rc::new(GfxDevice::new(instance, pdevice)?);
        let allocator = match GfxAllocator::new(instance, device.clone()) {
            Ok(allocator) => Rc::new(allocator),
            Err(e) => {
                device.destroy();
                return Err(e.into());
            }
        };
        let queue = GfxQueue::new_gfx(device.clone());
        DeviceRecord {
            device,
            allocator,
            queue,
        }
    };

    ctx.device = Some(record);
    Ok(())
}

fn teardown_device(ctx: &mut EngineContext) {
    if let Some(DeviceRecord {
        device,
        allocator,
        queue,
    }) = ctx.device.take()
    {
        if let Err(e) = device.wait_idle() {
            log::error!("failed to wait device idle: {}", e);
        }
        drop(queue);
        if Rc::strong_count(&allocator) > 1 {
            log::warn!("GfxAllocator is still referenced by {} objects", Rc::strong_count(&allocator) - 1);
        }
        drop(allocator);
        device.destroy();
    }
}

// Swapchain
fn init_swapchain(ctx: &mut EngineContext) -> anyhow::Result<()> {
    let swapchain = {
        let InstanceRecord { surface, .. } = ctx.instance_record()?;
        let DeviceRecord { device, .. } = ctx.device_record()?;
        GfxRenderSwapchain::new(device.clone(), surface, &swapchain_desc(&ctx.settings, &ctx.window), None)?
    };

    ctx.swapchain = Some(SwapchainRecord { swapchain, dirty: false });
    Ok(())
}

fn teardown_swapchain(ctx: &mut EngineContext) {
    if let Some(record) = ctx.swapchain.take() {
        record.swapchain.destroy();
    }
}

// Render
fn init_render(ctx: &mut EngineContext) -> anyhow::Result<()> {
    let record = create_render_record(ctx)?;
    log::info!("shape renderers: {:?}", record.renderers.names());
    ctx.render = Some(record);
    Ok(())
}

/// 失败时销毁已经创建的对象
fn create_render_record(ctx: &EngineContext) -> anyhow::Result<RenderRecord> {
    let InstanceRecord { instance, .. } = ctx.instance_record()?;
    let DeviceRecord { device, allocator, .. } = ctx.device_record()?;
    let swapchain = &ctx.swapchain_record()?.swapchain;
    let settings = &ctx.settings;

    let depth_format = device.pdevice().find_depth_format(instance, DefaultRendererSettings::DEPTH_FORMAT_CANDIDATES)?;
    let render_pass = GfxRenderPass::new_present(device.clone(), swapchain.format(), depth_format)?;

    let texture_set_layout = match GfxDescriptorSetLayout::new_single_texture(device.clone(), "shape-texture") {
        Ok(layout) => layout,
        Err(e) => {
            render_pass.destroy();
            return Err(e.into());
        }
    };

    let mut targets = match RenderTargets::new(device, allocator, &render_pass, swapchain) {
        Ok(targets) => targets,
        Err(e) => {
            render_pass.destroy();
            return Err(e.into());
        }
    };

    let slot_count = swapchain.image_count();
    let mut sync = match FrameSync::new(device, slot_count, settings.max_texture_binds) {
        Ok(sync) => sync,
        Err(e) => {
            targets.destroy();
            render_pass.destroy();
            return Err(e.into());
        }
    };

    let shaders = ShaderLibrary::new(settings.shader_dir());
    let init_ctx = ShapeInitContext {
        device,
        allocator,
        render_pass: &render_pass,
        shaders: &shaders,
        texture_set_layout: &texture_set_layout,
        slot_count,
    };
    let renderers = match ShapeRenderers::new_builtin(&init_ctx, &settings.capacity) {
        Ok(renderers) => renderers,
        Err(e) => {
            sync.destroy();
            targets.destroy();
            render_pass.destroy();
            return Err(e.into());
        }
    };

    Ok(RenderRecord {
        render_pass,
        texture_set_layout,
        targets,
        sync,
        renderers,
        driver: FrameDriver::new(settings.clear_color()),
    })
}

fn teardown_render(ctx: &mut EngineContext) {
    ctx.wait_idle();
    if let Some(RenderRecord {
        render_pass,
        texture_set_layout,
        mut targets,
        mut sync,
        mut renderers,
        driver,
    }) = ctx.render.take()
    {
        log::info!("render teardown after {} frames", driver.frame_counter().frame_id());
        renderers.destroy();
        sync.destroy();
        targets.destroy();
        render_pass.destroy();
        drop(texture_set_layout);
    }
}

// Assets
fn init_assets(ctx: &mut EngineContext) -> anyhow::Result<()> {
    let mut record = {
        let DeviceRecord {
            device,
            allocator,
            queue,
        } = ctx.device_record()?;
        let render = ctx
            .render
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("phase '{}' has not been initialized", phases::RENDER))?;
        let caps = RenderCaps {
            color_format: render.render_pass.color_format(),
            depth_format: render.render_pass.depth_format(),
        };
        AssetRecord {
            upload: GpuUploadContext::new(device.clone(), allocator.clone(), queue.clone(), caps)?,
            catalog: AssetCatalog::default(),
        }
    };

    ctx.bundle.load_all(&record.upload, &mut record.catalog)?;
    ctx.assets = Some(record);
    Ok(())
}

fn teardown_assets(ctx: &mut EngineContext) {
    ctx.wait_idle();
    if let Some(mut record) = ctx.assets.take() {
        if let Err(e) = ctx.bundle.unload_all(&record.upload, &mut record.catalog) {
            log::error!("{}", e);
        }
    }
}
