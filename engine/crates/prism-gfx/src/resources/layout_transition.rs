use ash::vk;

use crate::commands::barrier::GfxBarrierMask;
use crate::error::{GfxError, GfxResult};

/// 根据 image layout 的转换类型，确定 barrier 的 stage 和 access
///
/// 只支持引擎实际使用的几种转换，其余组合返回 [`GfxError::UnsupportedLayoutTransition`]
pub fn layout_transition_mask(old: vk::ImageLayout, new: vk::ImageLayout) -> GfxResult<GfxBarrierMask> {
    match (old, new) {
        // 上传之前：丢弃原有内容，等待 transfer 写入
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok(GfxBarrierMask {
            src_stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags2::TRANSFER,
            src_access: vk::AccessFlags2::empty(),
            dst_access: vk::AccessFlags2::TRANSFER_WRITE,
        }),
        // 上传完成：fragment shader 可读
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => Ok(GfxBarrierMask {
            src_stage: vk::PipelineStageFlags2::TRANSFER,
            dst_stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
            src_access: vk::AccessFlags2::TRANSFER_WRITE,
            dst_access: vk::AccessFlags2::SHADER_READ,
        }),
        // depth image 创建之后
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL) => Ok(GfxBarrierMask {
            src_stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
            dst_stage: vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS,
            src_access: vk::AccessFlags2::empty(),
            dst_access: vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        }),
        _ => Err(GfxError::UnsupportedLayoutTransition { old, new }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_transitions() {
        let to_dst = layout_transition_mask(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL).unwrap();
        assert_eq!(to_dst.src_access, vk::AccessFlags2::empty());
        assert_eq!(to_dst.dst_stage, vk::PipelineStageFlags2::TRANSFER);

        let to_read =
            layout_transition_mask(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .unwrap();
        // 上一个 barrier 的 dst 正好是这一个的 src
        assert_eq!(to_read.src_stage, to_dst.dst_stage);
        assert_eq!(to_read.src_access, to_dst.dst_access);
        assert_eq!(to_read.dst_access, vk::AccessFlags2::SHADER_READ);
    }

    #[test]
    fn test_depth_transition() {
        let mask =
            layout_transition_mask(vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL).unwrap();
        assert!(mask.dst_access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE));
    }

    #[test]
    fn test_unsupported_transition() {
        let err = layout_transition_mask(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL, vk::ImageLayout::GENERAL)
            .unwrap_err();
        assert!(matches!(
            err,
            GfxError::UnsupportedLayoutTransition {
                old: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                new: vk::ImageLayout::GENERAL
            }
        ));
    }
}
