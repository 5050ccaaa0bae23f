use std::rc::Rc;

use ash::vk;

use crate::commands::barrier::GfxImageBarrier;
use crate::commands::command_buffer::GfxCommandBuffer;
use crate::error::GfxResult;
use crate::foundation::debug_messenger::DebugType;
use crate::foundation::mem_allocator::GfxAllocator;
use crate::resources::buffer::GfxBuffer;

/// Vulkan 格式相关的工具类
pub struct VulkanFormatUtils;
impl VulkanFormatUtils {
    /// 计算指定 Vulkan 格式下每个像素需要的字节数，不支持的格式返回 None
    pub fn pixel_size_in_bytes(format: vk::Format) -> Option<usize> {
        match format {
            vk::Format::R8_UNORM | vk::Format::R8_SRGB => Some(1),
            vk::Format::R8G8B8A8_UNORM
            | vk::Format::R8G8B8A8_SRGB
            | vk::Format::B8G8R8A8_UNORM
            | vk::Format::B8G8R8A8_SRGB => Some(4),
            vk::Format::R16G16B16A16_SFLOAT => Some(8),
            _ => None,
        }
    }

    #[inline]
    pub fn is_depth_format(format: vk::Format) -> bool {
        matches!(
            format,
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT
        )
    }
}

/// device local 的 2D image，内存由 vma 分配
pub struct GfxImage {
    handle: vk::Image,
    allocation: Option<vk_mem::Allocation>,

    extent: vk::Extent2D,
    format: vk::Format,

    name: String,
    allocator: Rc<GfxAllocator>,
}
// getter
impl GfxImage {
    #[inline]
    pub fn width(&self) -> u32 {
        self.extent.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.extent.height
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.handle
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        if VulkanFormatUtils::is_depth_format(self.format) {
            vk::ImageAspectFlags::DEPTH
        } else {
            vk::ImageAspectFlags::COLOR
        }
    }
}
// new & init
impl GfxImage {
    pub fn new_2d(
        allocator: Rc<GfxAllocator>,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        debug_name: &str,
    ) -> GfxResult<Self> {
        let image_ci = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(extent.into())
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);
        let (image, alloc) = allocator.create_image(&image_ci, vk::MemoryPropertyFlags::DEVICE_LOCAL)?;

        let image = Self {
            handle: image,
            allocation: Some(alloc),
            extent,
            format,
            name: debug_name.to_string(),
            allocator,
        };
        image.allocator.device().set_debug_name(&image, debug_name);
        Ok(image)
    }

    /// 采样用的纹理，数据通过 transfer 写入
    #[inline]
    pub fn new_texture(
        allocator: Rc<GfxAllocator>,
        extent: vk::Extent2D,
        format: vk::Format,
        debug_name: &str,
    ) -> GfxResult<Self> {
        Self::new_2d(
            allocator,
            extent,
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
            debug_name,
        )
    }

    #[inline]
    pub fn new_depth(
        allocator: Rc<GfxAllocator>,
        extent: vk::Extent2D,
        format: vk::Format,
        debug_name: &str,
    ) -> GfxResult<Self> {
        Self::new_2d(allocator, extent, format, vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT, debug_name)
    }
}
impl DebugType for GfxImage {
    fn debug_type_name() -> &'static str {
        "GfxImage2D"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}
// destroy
impl GfxImage {
    pub fn destroy(mut self) {
        log::debug!("Destroying GfxImage: {}", self.name);
        if let Some(mut allocation) = self.allocation.take() {
            unsafe { self.allocator.destroy_image(self.handle, &mut allocation) }
        }
        self.handle = vk::Image::null();
    }
}
impl Drop for GfxImage {
    fn drop(&mut self) {
        debug_assert!(self.handle == vk::Image::null(), "GfxImage {} is not destroyed", self.name);
    }
}
// tools
impl GfxImage {
    /// 录制一个 layout 转换 barrier，转换类型必须在 [`crate::resources::layout_transition::layout_transition_mask`] 的支持范围内
    pub fn cmd_transition_layout(
        &self,
        cmd: &GfxCommandBuffer,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) -> GfxResult<()> {
        let barrier = GfxImageBarrier::layout_transition(self.handle, self.aspect(), old_layout, new_layout)?;
        cmd.image_memory_barrier(vk::DependencyFlags::empty(), std::slice::from_ref(&barrier));
        Ok(())
    }

    /// 将整个 buffer 拷贝到 image 的 mip 0，image 需要处于 TRANSFER_DST_OPTIMAL
    pub fn cmd_copy_from_buffer(&self, cmd: &GfxCommandBuffer, buffer: &GfxBuffer) {
        let region = vk::BufferImageCopy2::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(self.extent.into())
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            });
        let copy_info = vk::CopyBufferToImageInfo2::default()
            .src_buffer(buffer.vk_buffer())
            .dst_image(self.handle)
            .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .regions(std::slice::from_ref(&region));
        cmd.cmd_copy_buffer_to_image(&copy_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_size() {
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::R8G8B8A8_SRGB), Some(4));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::R8_UNORM), Some(1));
        assert_eq!(VulkanFormatUtils::pixel_size_in_bytes(vk::Format::BC7_SRGB_BLOCK), None);
    }

    #[test]
    fn test_depth_format() {
        assert!(VulkanFormatUtils::is_depth_format(vk::Format::D32_SFLOAT));
        assert!(!VulkanFormatUtils::is_depth_format(vk::Format::B8G8R8A8_SRGB));
    }
}
