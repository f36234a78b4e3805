//! Presentation surface creation.
//!
//! Hides the raw-window-handle plumbing from the rest of the crate. The
//! window itself is owned by the caller; the core never creates or polls
//! it.

use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::c_char;

/// The instance extensions the windowing layer declares mandatory for the
/// given display.
///
/// Any of these missing from the available set is a fatal construction
/// error, detected before the instance is created.
pub fn required_surface_extensions<W>(window: &W) -> Result<Vec<*const c_char>>
where
    W: HasDisplayHandle,
{
    let display = window
        .display_handle()
        .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;

    let extensions = ash_window::enumerate_required_extensions(display.as_raw())?;
    Ok(extensions.to_vec())
}

/// Create a surface bound to the platform window handle.
///
/// # Safety
/// The instance must be valid and the window must outlive the surface.
pub unsafe fn create_surface<W>(
    entry: &ash::Entry,
    instance: &ash::Instance,
    window: &W,
) -> Result<vk::SurfaceKHR>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    let display = window
        .display_handle()
        .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
    let window_handle = window
        .window_handle()
        .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

    ash_window::create_surface(
        entry,
        instance,
        display.as_raw(),
        window_handle.as_raw(),
        None,
    )
    .map_err(|e| GpuError::SurfaceCreation(e.to_string()))
}
