//! Selection policy.
//!
//! Every policy decision the context builder makes is a pure function over
//! snapshot data, so an alternate ranking (e.g. prefer discrete GPUs) can be
//! substituted without touching construction sequencing.

use crate::capabilities::{AdapterInfo, QueueFamilyInfo};
use crate::error::{GpuError, Result};
use ash::vk;

/// Intersect the wanted layer list with what the loader reports.
///
/// Returns the layers to enable and the wanted layers that were not found.
/// A missing layer is never an error; the caller logs a warning and moves
/// on with a reduced set.
pub fn filter_layers(wanted: &[&str], available: &[String]) -> (Vec<String>, Vec<String>) {
    let mut enabled = Vec::new();
    let mut missing = Vec::new();
    for &layer in wanted {
        if available.iter().any(|name| name == layer) {
            enabled.push(layer.to_string());
        } else {
            missing.push(layer.to_string());
        }
    }
    (enabled, missing)
}

/// Verify that every windowing-mandatory instance extension is available.
///
/// The first absent extension fails the build, before any instance exists.
pub fn check_instance_extensions(required: &[String], available: &[String]) -> Result<()> {
    for extension in required {
        if !available.iter().any(|name| name == extension) {
            return Err(GpuError::MissingInstanceExtension(extension.clone()));
        }
    }
    Ok(())
}

/// Select a physical device: the first enumerated one.
///
/// No scoring of discrete vs integrated GPUs; the enumeration order is the
/// policy.
pub fn select_adapter(adapters: &[AdapterInfo]) -> Option<usize> {
    if adapters.is_empty() {
        None
    } else {
        Some(0)
    }
}

/// Select the first queue family advertising graphics capability.
///
/// Additional capability bits (compute, transfer) carry no weight; the
/// first match wins.
pub fn select_graphics_queue_family(families: &[QueueFamilyInfo]) -> Option<u32> {
    families
        .iter()
        .position(|family| family.flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|index| index as u32)
}

/// Select a surface format.
///
/// Prefers BGRA8 with the sRGB-nonlinear color space (UNORM first, then
/// SRGB), falling back to the first reported format. An empty listing is
/// fatal.
pub fn select_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    for wanted in [vk::Format::B8G8R8A8_UNORM, vk::Format::B8G8R8A8_SRGB] {
        if let Some(format) = formats.iter().find(|candidate| {
            candidate.format == wanted
                && candidate.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        }) {
            return Ok(*format);
        }
    }
    formats.first().copied().ok_or(GpuError::NoSurfaceFormats)
}

/// Select the present mode: FIFO or nothing.
///
/// MAILBOX drop-oldest semantics are deliberately rejected; a driver that
/// does not report FIFO fails the build with no fallback.
pub fn select_present_mode(modes: &[vk::PresentModeKHR]) -> Result<vk::PresentModeKHR> {
    if modes.contains(&vk::PresentModeKHR::FIFO) {
        Ok(vk::PresentModeKHR::FIFO)
    } else {
        Err(GpuError::PresentModeUnsupported)
    }
}

/// Select the first memory type whose bit is set in the requirement mask.
///
/// No preference for device-local over host-visible beyond this first-match
/// rule.
pub fn select_memory_type(
    type_bits: u32,
    memory: &vk::PhysicalDeviceMemoryProperties,
) -> Option<u32> {
    (0..memory.memory_type_count).find(|&index| type_bits & (1 << index) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> QueueFamilyInfo {
        QueueFamilyInfo { flags, count: 1 }
    }

    #[test]
    fn missing_wanted_layers_are_skipped_not_fatal() {
        let available = vec!["VK_LAYER_KHRONOS_validation".to_string()];
        let (enabled, missing) = filter_layers(
            &["VK_LAYER_KHRONOS_validation", "VK_LAYER_LUNARG_monitor"],
            &available,
        );
        assert_eq!(enabled, vec!["VK_LAYER_KHRONOS_validation"]);
        assert_eq!(missing, vec!["VK_LAYER_LUNARG_monitor"]);
    }

    #[test]
    fn absent_required_instance_extension_is_fatal() {
        let required = vec!["VK_KHR_surface".to_string(), "VK_KHR_xlib_surface".to_string()];
        let available = vec!["VK_KHR_surface".to_string()];
        let err = check_instance_extensions(&required, &available).unwrap_err();
        assert!(matches!(
            err,
            GpuError::MissingInstanceExtension(name) if name == "VK_KHR_xlib_surface"
        ));
    }

    #[test]
    fn adapter_selection_takes_the_first_device() {
        let adapters = vec![AdapterInfo::default(), AdapterInfo::default()];
        assert_eq!(select_adapter(&adapters), Some(0));
        assert_eq!(select_adapter(&[]), None);
    }

    #[test]
    fn queue_family_selection_takes_the_first_graphics_family() {
        let families = vec![
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
        ];
        assert_eq!(select_graphics_queue_family(&families), Some(1));
    }

    #[test]
    fn no_graphics_family_yields_none() {
        let families = vec![family(vk::QueueFlags::COMPUTE), family(vk::QueueFlags::TRANSFER)];
        assert_eq!(select_graphics_queue_family(&families), None);
    }

    #[test]
    fn surface_format_prefers_bgra8_unorm_srgb_nonlinear() {
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let selected = select_surface_format(&formats).unwrap();
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
    }

    #[test]
    fn surface_format_falls_back_to_first_entry() {
        let formats = vec![vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }];
        let selected = select_surface_format(&formats).unwrap();
        assert_eq!(selected.format, vk::Format::R8G8B8A8_SRGB);
    }

    #[test]
    fn empty_surface_format_listing_is_fatal() {
        assert!(matches!(
            select_surface_format(&[]),
            Err(GpuError::NoSurfaceFormats)
        ));
    }

    #[test]
    fn fifo_present_mode_is_required() {
        let modes = vec![vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::FIFO];
        assert_eq!(
            select_present_mode(&modes).unwrap(),
            vk::PresentModeKHR::FIFO
        );
    }

    #[test]
    fn mailbox_alone_is_rejected() {
        let modes = vec![vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE];
        assert!(matches!(
            select_present_mode(&modes),
            Err(GpuError::PresentModeUnsupported)
        ));
    }

    #[test]
    fn memory_type_selection_takes_the_first_set_bit() {
        let mut memory = vk::PhysicalDeviceMemoryProperties::default();
        memory.memory_type_count = 4;
        // Bits 1 and 3 set; the first match must win.
        assert_eq!(select_memory_type(0b1010, &memory), Some(1));
    }

    #[test]
    fn memory_type_outside_reported_count_is_ignored() {
        let mut memory = vk::PhysicalDeviceMemoryProperties::default();
        memory.memory_type_count = 2;
        assert_eq!(select_memory_type(0b100, &memory), None);
        assert_eq!(select_memory_type(0, &memory), None);
    }
}
