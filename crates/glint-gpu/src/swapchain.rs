//! Swapchain creation.

use crate::error::{GpuError, Result};
use ash::vk;

/// Swapchain image count, fixed at build time. Double buffering.
///
/// Not negotiated against the surface's min/max counts; the actual count
/// the driver hands back is checked against this constant and a mismatch
/// fails the build.
pub const SWAPCHAIN_IMAGE_COUNT: u32 = 2;

/// Check the image count the driver actually returned.
pub fn validate_image_count(requested: u32, actual: u32) -> Result<()> {
    if requested == actual {
        Ok(())
    } else {
        Err(GpuError::ImageCountMismatch { requested, actual })
    }
}

/// Resolve the swapchain extent from the surface capabilities.
///
/// Drivers that pin the extent report it in `current_extent`; the special
/// value `u32::MAX` means the extent follows the window, clamped to the
/// reported bounds.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Create the swapchain.
///
/// # Safety
/// All handles must be valid and the present mode and format must come
/// from the surface's own listings.
#[allow(clippy::too_many_arguments)]
pub unsafe fn create_swapchain(
    swapchain_loader: &ash::khr::swapchain::Device,
    surface: vk::SurfaceKHR,
    surface_capabilities: &vk::SurfaceCapabilitiesKHR,
    surface_format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    queue_family_index: u32,
) -> Result<vk::SwapchainKHR> {
    let queue_families = [queue_family_index];
    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface)
        .min_image_count(SWAPCHAIN_IMAGE_COUNT)
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .queue_family_indices(&queue_families)
        .pre_transform(surface_capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(vk::SwapchainKHR::null());

    swapchain_loader
        .create_swapchain(&create_info, None)
        .map_err(|e| GpuError::SwapchainCreation(e.to_string()))
}

/// Create one view per swapchain image.
///
/// Already-created views are destroyed again if a later one fails, so the
/// caller never receives a partial set.
///
/// # Safety
/// The device and images must be valid.
pub unsafe fn create_image_views(
    device: &ash::Device,
    images: &[vk::Image],
    format: vk::Format,
) -> Result<Vec<vk::ImageView>> {
    let mut views = Vec::with_capacity(images.len());
    for &image in images {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        match device.create_image_view(&view_info, None) {
            Ok(view) => views.push(view),
            Err(e) => {
                for view in views.into_iter().rev() {
                    device.destroy_image_view(view, None);
                }
                return Err(GpuError::from(e));
            }
        }
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_image_count_passes() {
        assert!(validate_image_count(SWAPCHAIN_IMAGE_COUNT, SWAPCHAIN_IMAGE_COUNT).is_ok());
    }

    #[test]
    fn image_count_mismatch_is_fatal() {
        let err = validate_image_count(2, 3).unwrap_err();
        assert!(matches!(
            err,
            GpuError::ImageCountMismatch {
                requested: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn pinned_extent_wins_over_the_window_size() {
        let mut capabilities = vk::SurfaceCapabilitiesKHR::default();
        capabilities.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let extent = calculate_extent(&capabilities, 1920, 1080);
        assert_eq!((extent.width, extent.height), (800, 600));
    }

    #[test]
    fn unpinned_extent_clamps_the_window_size() {
        let mut capabilities = vk::SurfaceCapabilitiesKHR::default();
        capabilities.current_extent = vk::Extent2D {
            width: u32::MAX,
            height: u32::MAX,
        };
        capabilities.min_image_extent = vk::Extent2D {
            width: 64,
            height: 64,
        };
        capabilities.max_image_extent = vk::Extent2D {
            width: 1280,
            height: 720,
        };
        let extent = calculate_extent(&capabilities, 1920, 1080);
        assert_eq!((extent.width, extent.height), (1280, 720));
    }
}
