use ash::vk;

use crate::error::GfxResult;
use crate::resources::layout_transition::layout_transition_mask;

/// 一次 layout 转换两侧的 stage 与 access
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GfxBarrierMask {
    pub src_stage: vk::PipelineStageFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_access: vk::AccessFlags2,
}

/// 整个 image（mip 0、layer 0）的 layout 转换
///
/// 引擎只在上传纹理与创建 depth image 时使用，不涉及 queue family 转移
#[derive(Clone, Copy)]
pub struct GfxImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

// new & init
impl GfxImageBarrier {
    /// stage 与 access 由 [`layout_transition_mask`] 决定，不支持的转换直接返回错误
    pub fn layout_transition(
        image: vk::Image,
        aspect: vk::ImageAspectFlags,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> GfxResult<Self> {
        let mask = layout_transition_mask(old_layout, new_layout)?;
        let inner = vk::ImageMemoryBarrier2::default()
            .image(image)
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_stage_mask(mask.src_stage)
            .dst_stage_mask(mask.dst_stage)
            .src_access_mask(mask.src_access)
            .dst_access_mask(mask.dst_access)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });
        Ok(Self { inner })
    }
}

// getters
impl GfxImageBarrier {
    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'_> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    #[test]
    fn test_upload_barrier_fields() {
        let barrier = GfxImageBarrier::layout_transition(
            vk::Image::from_raw(42),
            vk::ImageAspectFlags::COLOR,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        )
        .unwrap();
        let inner = barrier.inner();
        assert_eq!(inner.image, vk::Image::from_raw(42));
        assert_eq!(inner.new_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(inner.dst_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(inner.subresource_range.aspect_mask, vk::ImageAspectFlags::COLOR);
    }

    #[test]
    fn test_unsupported_layout_is_rejected() {
        assert!(
            GfxImageBarrier::layout_transition(
                vk::Image::null(),
                vk::ImageAspectFlags::COLOR,
                vk::ImageLayout::PRESENT_SRC_KHR,
                vk::ImageLayout::GENERAL,
            )
            .is_err()
        );
    }
}
