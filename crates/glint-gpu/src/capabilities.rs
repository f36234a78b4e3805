//! Capability detection.
//!
//! Read-only queries against the driver, collected into an immutable
//! [`CapabilitySnapshot`]. The snapshot is populated strictly during context
//! construction and retained read-only for diagnostics afterwards.

use crate::error::{GpuError, Result};
use crate::report::StageReport;
use ash::vk;
use std::ffi::CStr;

/// Everything queried from the driver during one context build.
///
/// Fields are filled in construction order; none is mutated after the
/// context is built.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySnapshot {
    /// Instance layers the loader reports.
    pub available_layers: Vec<String>,
    /// Wanted layers that were actually found and enabled.
    pub enabled_layers: Vec<String>,
    /// Instance extensions the loader reports.
    pub available_instance_extensions: Vec<String>,
    /// Instance extensions the windowing layer declares mandatory.
    pub required_instance_extensions: Vec<String>,
    /// One descriptor per enumerated physical device.
    pub adapters: Vec<AdapterInfo>,
    /// Queue families of the selected physical device.
    pub queue_families: Vec<QueueFamilyInfo>,
    /// Whether the selected queue family can present to the surface.
    pub present_support: bool,
    /// Surface capabilities of the selected device.
    pub surface_capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Descriptor for one physical device.
#[derive(Debug, Clone, Default)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor_id: u32,
    pub device_type: vk::PhysicalDeviceType,
    pub api_version: u32,
    pub driver_version: u32,
    pub features: vk::PhysicalDeviceFeatures,
    pub memory: vk::PhysicalDeviceMemoryProperties,
    /// Device extensions, sorted case-insensitively by name.
    pub extensions: Vec<String>,
}

impl AdapterInfo {
    /// One-line summary for the log.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}) - Vulkan {}.{}.{}",
            self.name,
            self.device_type,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
        )
    }

    /// Detailed report in the listing format.
    pub fn report(&self) -> StageReport {
        let mut report = StageReport::new(format!("{} Info", self.name));
        report.push_with("Driver Version", self.driver_version.to_string());
        report.push_with("Device Type", format!("{:?}", self.device_type));
        report.push_with(
            "API Version",
            format!(
                "{}.{}.{}",
                vk::api_version_major(self.api_version),
                vk::api_version_minor(self.api_version),
                vk::api_version_patch(self.api_version)
            ),
        );
        report
    }
}

/// Flags and size of one queue family.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueFamilyInfo {
    pub flags: vk::QueueFlags,
    pub count: u32,
}

impl QueueFamilyInfo {
    /// Report listing the advertised flag bits, one per line.
    pub fn report(&self, index: u32) -> StageReport {
        let mut report = StageReport::new(format!(
            "Queue Family #{index} (count={})",
            self.count
        ));
        for (bit, name) in [
            (vk::QueueFlags::GRAPHICS, "VK_QUEUE_GRAPHICS_BIT"),
            (vk::QueueFlags::COMPUTE, "VK_QUEUE_COMPUTE_BIT"),
            (vk::QueueFlags::TRANSFER, "VK_QUEUE_TRANSFER_BIT"),
            (vk::QueueFlags::SPARSE_BINDING, "VK_QUEUE_SPARSE_BINDING_BIT"),
        ] {
            if self.flags.contains(bit) {
                report.push(name);
            }
        }
        report
    }
}

/// Sort extension names case-insensitively, for deterministic diagnostics.
pub fn sort_extensions(extensions: &mut [String]) {
    extensions.sort_by(|lhs, rhs| {
        lhs.to_ascii_lowercase().cmp(&rhs.to_ascii_lowercase())
    });
}

/// Query the instance layers the loader reports.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn query_instance_layers(entry: &ash::Entry) -> Result<Vec<String>> {
    let properties = entry.enumerate_instance_layer_properties()?;
    Ok(properties
        .iter()
        .map(|props| {
            CStr::from_ptr(props.layer_name.as_ptr())
                .to_string_lossy()
                .into_owned()
        })
        .collect())
}

/// Query the instance extensions the loader reports.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn query_instance_extensions(entry: &ash::Entry) -> Result<Vec<String>> {
    let properties = entry.enumerate_instance_extension_properties(None)?;
    Ok(properties
        .iter()
        .map(|props| {
            CStr::from_ptr(props.extension_name.as_ptr())
                .to_string_lossy()
                .into_owned()
        })
        .collect())
}

/// Enumerate physical devices and build a descriptor for each.
///
/// An empty device list, or an empty device extension listing for any
/// device, is a fatal error: the driver is contractually required to fill
/// both.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn query_adapters(
    instance: &ash::Instance,
) -> Result<(Vec<vk::PhysicalDevice>, Vec<AdapterInfo>)> {
    let devices = instance.enumerate_physical_devices()?;
    if devices.is_empty() {
        return Err(GpuError::NoAdapters);
    }

    let mut infos = Vec::with_capacity(devices.len());
    for &device in &devices {
        let properties = instance.get_physical_device_properties(device);
        let features = instance.get_physical_device_features(device);
        let memory = instance.get_physical_device_memory_properties(device);

        let extension_properties = instance.enumerate_device_extension_properties(device)?;
        if extension_properties.is_empty() {
            return Err(GpuError::EmptyCapabilityList("device extension"));
        }
        let mut extensions: Vec<String> = extension_properties
            .iter()
            .map(|props| {
                CStr::from_ptr(props.extension_name.as_ptr())
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        sort_extensions(&mut extensions);

        infos.push(AdapterInfo {
            name: CStr::from_ptr(properties.device_name.as_ptr())
                .to_string_lossy()
                .into_owned(),
            vendor_id: properties.vendor_id,
            device_type: properties.device_type,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            features,
            memory,
            extensions,
        });
    }

    Ok((devices, infos))
}

/// Query the queue families of a physical device.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn query_queue_families(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Vec<QueueFamilyInfo> {
    instance
        .get_physical_device_queue_family_properties(physical_device)
        .iter()
        .map(|family| QueueFamilyInfo {
            flags: family.queue_flags,
            count: family.queue_count,
        })
        .collect()
}

/// Surface-related queries for a selected device and queue family.
#[derive(Debug, Clone)]
pub struct SurfaceSupport {
    pub present_support: bool,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// Query surface support, capabilities, formats, and present modes.
///
/// # Safety
/// All handles must be valid.
pub unsafe fn query_surface_support(
    surface_loader: &ash::khr::surface::Instance,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    queue_family_index: u32,
) -> Result<SurfaceSupport> {
    let present_support = surface_loader.get_physical_device_surface_support(
        physical_device,
        queue_family_index,
        surface,
    )?;

    let capabilities =
        surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?;
    let formats = surface_loader.get_physical_device_surface_formats(physical_device, surface)?;
    let present_modes =
        surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?;

    Ok(SurfaceSupport {
        present_support,
        capabilities,
        formats,
        present_modes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_sort_is_case_insensitive() {
        let mut extensions = vec![
            "VK_KHR_swapchain".to_string(),
            "VK_AMD_negative_viewport_height".to_string(),
            "VK_EXT_debug_utils".to_string(),
            "vk_khr_maintenance1".to_string(),
        ];
        sort_extensions(&mut extensions);
        assert_eq!(
            extensions,
            vec![
                "VK_AMD_negative_viewport_height",
                "VK_EXT_debug_utils",
                "vk_khr_maintenance1",
                "VK_KHR_swapchain",
            ]
        );
    }

    #[test]
    fn queue_family_report_lists_flag_names() {
        let family = QueueFamilyInfo {
            flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
            count: 4,
        };
        let rendered = family.report(0).render();
        assert!(rendered.contains("VK_QUEUE_GRAPHICS_BIT"));
        assert!(rendered.contains("VK_QUEUE_COMPUTE_BIT"));
        assert!(!rendered.contains("VK_QUEUE_TRANSFER_BIT"));
    }
}
