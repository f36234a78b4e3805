//! Depth buffer creation.

use crate::error::{GpuError, Result};
use crate::select::select_memory_type;
use ash::vk;

/// Fixed depth attachment format. Not negotiated.
pub const DEPTH_FORMAT: vk::Format = vk::Format::D16_UNORM;

/// Depth image, its backing memory, and its view.
///
/// The view's lifetime is subordinate to the image; teardown destroys the
/// view first.
#[derive(Clone, Copy)]
pub struct DepthBuffer {
    pub image: vk::Image,
    pub memory: vk::DeviceMemory,
    pub view: vk::ImageView,
    pub format: vk::Format,
}

impl DepthBuffer {
    /// Create the depth image, back it with the first compatible memory
    /// type, and create its view.
    ///
    /// # Safety
    /// The device must be valid and `memory_properties` must describe the
    /// physical device it was created from.
    pub unsafe fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = device.create_image(&image_info, None)?;

        let requirements = device.get_image_memory_requirements(image);
        let Some(memory_type_index) =
            select_memory_type(requirements.memory_type_bits, memory_properties)
        else {
            device.destroy_image(image, None);
            return Err(GpuError::NoCompatibleMemoryType);
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = match device.allocate_memory(&alloc_info, None) {
            Ok(memory) => memory,
            Err(e) => {
                device.destroy_image(image, None);
                return Err(GpuError::from(e));
            }
        };

        if let Err(e) = device.bind_image_memory(image, memory, 0) {
            device.free_memory(memory, None);
            device.destroy_image(image, None);
            return Err(GpuError::from(e));
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(DEPTH_FORMAT)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::DEPTH)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = match device.create_image_view(&view_info, None) {
            Ok(view) => view,
            Err(e) => {
                device.free_memory(memory, None);
                device.destroy_image(image, None);
                return Err(GpuError::from(e));
            }
        };

        Ok(Self {
            image,
            memory,
            view,
            format: DEPTH_FORMAT,
        })
    }

    /// Destroy the view, image, and memory, in that order.
    ///
    /// # Safety
    /// The device must be valid and no submitted work may still reference
    /// the image.
    pub unsafe fn destroy(&mut self, device: &ash::Device) {
        device.destroy_image_view(self.view, None);
        device.destroy_image(self.image, None);
        device.free_memory(self.memory, None);
    }
}
