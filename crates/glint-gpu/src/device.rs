//! Logical device and queue creation.

use crate::error::Result;
use ash::vk;
use std::ffi::{c_char, CStr};

/// Device extensions to enable.
///
/// Swapchain support is always required. The platform-specific entries are
/// compile-time conditional, not detected at runtime.
pub fn required_device_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::swapchain::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::maintenance1::NAME,
        #[cfg(target_os = "macos")]
        c"VK_AMD_negative_viewport_height",
    ]
}

/// Create the logical device and retrieve its single graphics queue.
///
/// # Safety
/// The instance and physical device must be valid, and the queue family
/// index must come from the device's own family list.
pub unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
) -> Result<(ash::Device, vk::Queue)> {
    let queue_priority = 1.0_f32;
    let queue_info = vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family_index)
        .queue_priorities(std::slice::from_ref(&queue_priority));

    let extensions = required_device_extensions();
    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default().shader_clip_distance(true);

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(std::slice::from_ref(&queue_info))
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = instance.create_device(physical_device, &create_info, None)?;
    let queue = device.get_device_queue(queue_family_index, 0);

    Ok((device, queue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapchain_extension_is_always_required() {
        assert!(required_device_extensions().contains(&ash::khr::swapchain::NAME));
    }
}
