//! Vulkan instance creation.

use crate::error::Result;
use ash::vk;
use std::ffi::{c_char, CString};

/// Layers worth enabling when present. Missing entries are skipped with a
/// warning, never an error.
pub fn wanted_layers(validation: bool) -> Vec<&'static str> {
    let mut layers = Vec::new();
    if validation {
        layers.push("VK_LAYER_KHRONOS_validation");
    }
    #[cfg(not(target_os = "macos"))]
    layers.push("VK_LAYER_LUNARG_monitor");
    layers
}

/// Create a Vulkan instance with the given layers and extensions.
///
/// The extension list must already have been validated against what the
/// loader reports; this function does not re-check it.
///
/// # Safety
/// The entry must be a valid Vulkan entry point, and `extensions` must
/// point at NUL-terminated extension names that outlive the call.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    layers: &[String],
    extensions: &[*const c_char],
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name).unwrap_or_default();
    let engine_name = CString::new("Glint").unwrap_or_default();

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(&engine_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    let layer_names: Vec<CString> = layers
        .iter()
        .map(|layer| CString::new(layer.as_str()).unwrap_or_default())
        .collect();
    let layer_pointers: Vec<*const c_char> = layer_names.iter().map(|name| name.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_layer_names(&layer_pointers)
        .enabled_extension_names(extensions);

    let instance = entry.create_instance(&create_info, None)?;

    Ok(instance)
}
