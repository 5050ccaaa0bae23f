use ash::vk;
use prism_gfx::resources::buffer::GfxBuffer;
use prism_gfx::resources::image::{GfxImage, VulkanFormatUtils};
use prism_gfx::resources::image_view::GfxImageView;
use prism_gfx::resources::layout_transition::layout_transition_mask;
use prism_gfx::resources::sampler::{GfxSampler, GfxSamplerDesc};

use crate::catalog::TextureBinding;
use crate::context::GpuUploadContext;
use crate::error::AssetError;

/// 上传完成、可以被 shader 采样的纹理
///
/// 创建顺序：image -> view -> sampler，销毁时倒序
pub struct GpuTexture {
    image: GfxImage,
    view: GfxImageView,
    sampler: GfxSampler,
}

// new & init
impl GpuTexture {
    /// # 实现步骤
    /// 1. 创建 host visible 的 staging buffer，写入像素数据
    /// 2. 创建 device local 的 image
    /// 3. undefined -> transfer dst，拷贝，transfer dst -> shader read only（阻塞等待完成）
    /// 4. 创建 view 和 sampler
    pub fn upload(
        ctx: &GpuUploadContext,
        extent: vk::Extent2D,
        format: vk::Format,
        pixels: &[u8],
        sampler_desc: &GfxSamplerDesc,
        name: &str,
    ) -> Result<Self, AssetError> {
        validate_pixels(extent, format, pixels, name)?;
        validate_extent(extent, ctx.device_limits().max_image_dimension2_d, name)?;

        // 所有 layout 转换都需要在录制之前确认可用
        layout_transition_mask(vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL)?;
        layout_transition_mask(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?;

        let stage_buffer =
            GfxBuffer::new_stage_buffer(ctx.allocator().clone(), pixels.len() as vk::DeviceSize, format!("{name}-stage"))?;
        stage_buffer.write_bytes(0, pixels)?;

        let image = GfxImage::new_texture(ctx.allocator().clone(), extent, format, name)?;

        let recorded = ctx.one_time_exec(&format!("upload-{name}"), |cmd| {
            image.cmd_transition_layout(
                cmd,
                vk::ImageLayout::UNDEFINED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )?;
            image.cmd_copy_from_buffer(cmd, &stage_buffer);
            image.cmd_transition_layout(
                cmd,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        });
        // GPU 已经执行完成，staging buffer 可以直接释放
        stage_buffer.destroy();
        if let Err(e) = recorded.and_then(|r| r) {
            image.destroy();
            return Err(e.into());
        }

        let view = match GfxImageView::for_image(ctx.device().clone(), &image, name) {
            Ok(view) => view,
            Err(e) => {
                image.destroy();
                return Err(e.into());
            }
        };
        let sampler = match GfxSampler::new(ctx.device().clone(), sampler_desc, name) {
            Ok(sampler) => sampler,
            Err(e) => {
                view.destroy();
                image.destroy();
                return Err(e.into());
            }
        };

        log::info!("uploaded texture '{}' ({}x{}, {:?})", name, extent.width, extent.height, format);
        Ok(Self { image, view, sampler })
    }
}

// getters
impl GpuTexture {
    #[inline]
    pub fn binding(&self) -> TextureBinding {
        TextureBinding {
            view: self.view.handle(),
            sampler: self.sampler.handle(),
            extent: self.image.extent(),
        }
    }
}

// destroy
impl GpuTexture {
    pub fn destroy(self) {
        let Self { image, view, sampler } = self;
        drop(sampler);
        view.destroy();
        image.destroy();
    }
}

/// 像素数据的长度必须与 extent 和 format 完全匹配
pub fn validate_pixels(extent: vk::Extent2D, format: vk::Format, pixels: &[u8], name: &str) -> Result<(), AssetError> {
    let pixel_size = VulkanFormatUtils::pixel_size_in_bytes(format).ok_or_else(|| AssetError::UnsupportedFormat {
        name: name.to_string(),
        message: format!("format {:?} can not be uploaded", format),
    })?;
    if extent.width == 0 || extent.height == 0 {
        return Err(AssetError::UnsupportedFormat {
            name: name.to_string(),
            message: "image extent is zero".to_string(),
        });
    }
    let expected = extent.width as usize * extent.height as usize * pixel_size;
    if pixels.len() != expected {
        return Err(AssetError::UnsupportedFormat {
            name: name.to_string(),
            message: format!("expected {} bytes of pixel data, got {}", expected, pixels.len()),
        });
    }
    Ok(())
}

/// 纹理的宽高都不能超过设备支持的 2D image 最大尺寸
pub fn validate_extent(extent: vk::Extent2D, max_dimension: u32, name: &str) -> Result<(), AssetError> {
    if extent.width > max_dimension || extent.height > max_dimension {
        return Err(AssetError::UnsupportedFormat {
            name: name.to_string(),
            message: format!(
                "image extent {}x{} exceeds device limit {}",
                extent.width, extent.height, max_dimension
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pixels() {
        let extent = vk::Extent2D { width: 2, height: 2 };
        assert!(validate_pixels(extent, vk::Format::R8G8B8A8_SRGB, &[0; 16], "ok").is_ok());
        assert!(validate_pixels(extent, vk::Format::R8_UNORM, &[0; 4], "atlas").is_ok());
        assert!(matches!(
            validate_pixels(extent, vk::Format::R8G8B8A8_SRGB, &[0; 15], "short"),
            Err(AssetError::UnsupportedFormat { .. })
        ));
        assert!(validate_pixels(vk::Extent2D::default(), vk::Format::R8_UNORM, &[], "empty").is_err());
    }

    #[test]
    fn test_texture_larger_than_device_limit_is_rejected() {
        assert!(validate_extent(vk::Extent2D { width: 4096, height: 4096 }, 4096, "atlas").is_ok());
        let err = validate_extent(vk::Extent2D { width: 4097, height: 16 }, 4096, "banner").unwrap_err();
        assert!(err.to_string().contains("exceeds device limit 4096"));
    }
}
