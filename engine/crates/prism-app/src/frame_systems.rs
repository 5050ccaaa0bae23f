//! 每帧执行的阶段：PreDraw（resize）→ Draw（帧驱动）→ PostDraw

use prism_gfx::swapchain::render_swapchain::GfxRenderSwapchain;
use prism_phase::{PhaseError, PhaseGraph, phases};
use prism_renderer::RenderError;
use prism_renderer::frame::render_targets::RenderTargets;
use prism_renderer::frame::vulkan_backend::VulkanFrameBackend;
use prism_renderer::shape::CollectContext;

use crate::context::{EngineContext, RenderRecord};
use crate::lifecycle::swapchain_desc;

/// 每帧阶段图，用户 system 可以注册到任意阶段
pub fn frame_graph() -> Result<PhaseGraph<EngineContext>, PhaseError> {
    let mut graph = PhaseGraph::with_phases([phases::PRE_DRAW, phases::DRAW, phases::POST_DRAW])?;
    graph.add_system(phases::PRE_DRAW, resize_system)?;
    graph.add_system(phases::DRAW, draw_system)?;
    Ok(graph)
}

/// swapchain 被标记为 dirty 时重建 swapchain、depth image 与 framebuffer
///
/// render pass 与 pipeline 不受影响；窗口最小化时保持 dirty，直到尺寸不为 0
pub fn resize_system(ctx: &mut EngineContext) -> anyhow::Result<()> {
    let dirty = ctx.swapchain.as_ref().is_some_and(|s| s.dirty);
    if !dirty || ctx.window.is_minimized() {
        return Ok(());
    }

    ctx.wait_idle();

    let EngineContext {
        settings,
        window,
        instance,
        device,
        swapchain,
        render,
        ..
    } = ctx;
    let (Some(instance), Some(device), Some(swapchain), Some(render)) =
        (instance.as_ref(), device.as_ref(), swapchain.as_mut(), render.as_mut())
    else {
        return Ok(());
    };

    let new_swapchain = GfxRenderSwapchain::new(
        device.device.clone(),
        &instance.surface,
        &swapchain_desc(settings, window),
        Some(&swapchain.swapchain),
    )?;

    // 新 swapchain 不可用时丢弃它，旧的 swapchain 与 render targets 保持原样
    let images = new_swapchain.image_count();
    if let Err(e) = ensure_slot_capacity(images, render.sync.slot_count()) {
        new_swapchain.destroy();
        return Err(e.into());
    }
    std::mem::replace(&mut swapchain.swapchain, new_swapchain).destroy();

    render.targets.destroy();
    render.targets = RenderTargets::new(&device.device, &device.allocator, &render.render_pass, &swapchain.swapchain)?;
    swapchain.dirty = false;

    let extent = render.targets.extent();
    log::info!("swapchain recreated: {}x{}, {} images", extent.width, extent.height, images);
    Ok(())
}

/// 顶点 buffer 按 slot 划分，slot 数量在 Render 阶段就已经固定，重建后的 image 数量不能超过它
fn ensure_slot_capacity(images: usize, slots: usize) -> Result<(), RenderError> {
    if images > slots {
        return Err(RenderError::SlotCountMismatch { images, slots });
    }
    Ok(())
}

/// 绘制一帧；swapchain 失效或者 suboptimal 时标记 dirty，由下一帧的 resize system 处理
pub fn draw_system(ctx: &mut EngineContext) -> anyhow::Result<()> {
    if ctx.window.is_minimized() {
        return Ok(());
    }

    let EngineContext {
        window,
        world,
        device,
        swapchain,
        render,
        assets,
        ..
    } = ctx;
    let (Some(device), Some(swapchain), Some(render), Some(assets)) =
        (device.as_ref(), swapchain.as_mut(), render.as_mut(), assets.as_ref())
    else {
        return Ok(());
    };
    if swapchain.dirty {
        return Ok(());
    }

    let RenderRecord {
        render_pass,
        targets,
        sync,
        renderers,
        driver,
        ..
    } = render;
    let collect_ctx = CollectContext::from_world(world, &assets.catalog, targets.extent(), window.scale_factor);
    let mut backend = VulkanFrameBackend {
        swapchain: &swapchain.swapchain,
        sync,
        targets: &*targets,
        render_pass: &*render_pass,
        queue: &device.queue,
    };

    let outcome = driver.draw_frame(&mut backend, renderers, &collect_ctx, &*world)?;
    if outcome.needs_resize() {
        swapchain.dirty = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use prism_renderer::RendererSettings;

    use super::*;

    #[test]
    fn test_frame_phases_in_order() {
        let graph = frame_graph().unwrap();
        assert_eq!(graph.init_order(), &[phases::PRE_DRAW, phases::DRAW, phases::POST_DRAW]);
    }

    #[test]
    fn test_frame_systems_do_nothing_before_gpu_is_ready() {
        let mut graph = frame_graph().unwrap();
        let mut ctx = EngineContext::new("test", RendererSettings::default());
        ctx.window.physical_extent = ash::vk::Extent2D { width: 640, height: 480 };

        for phase in [phases::PRE_DRAW, phases::DRAW, phases::POST_DRAW] {
            graph.run(phase, &mut ctx).unwrap();
        }
        assert!(ctx.swapchain.is_none());
    }

    #[test]
    fn test_recreated_swapchain_must_fit_frame_slots() {
        assert!(ensure_slot_capacity(2, 3).is_ok());
        assert!(ensure_slot_capacity(3, 3).is_ok());
        assert!(matches!(
            ensure_slot_capacity(4, 3),
            Err(RenderError::SlotCountMismatch { images: 4, slots: 3 })
        ));
    }
}
