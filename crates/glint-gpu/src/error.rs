//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
///
/// Every variant except [`GpuError::Vulkan`] maps to a missing mandatory
/// capability; both classes are fatal to context construction at the stage
/// where they are detected.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found or initialized.
    #[error("Failed to load Vulkan: {0}")]
    EntryLoad(String),

    /// No physical devices were enumerated.
    #[error("No physical devices found")]
    NoAdapters,

    /// A listing the driver is contractually required to fill came back empty.
    #[error("Driver returned an empty {0} listing")]
    EmptyCapabilityList(&'static str),

    /// A mandatory instance extension is not available.
    #[error("Required instance extension not available: {0}")]
    MissingInstanceExtension(String),

    /// No queue family advertises graphics capability.
    #[error("No graphics-capable queue family found")]
    NoGraphicsQueueFamily,

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// The selected queue family cannot present to the surface.
    #[error("Surface presentation not supported by the selected queue family")]
    SurfaceNotSupported,

    /// The surface reports no formats.
    #[error("Driver returned no surface formats")]
    NoSurfaceFormats,

    /// FIFO presentation is not available. There is no fallback.
    #[error("FIFO present mode not supported by the surface")]
    PresentModeUnsupported,

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// The swapchain returned a different image count than requested.
    #[error("Swapchain image count mismatch: requested {requested}, got {actual}")]
    ImageCountMismatch { requested: u32, actual: u32 },

    /// No memory type satisfies the depth image's requirement mask.
    #[error("No compatible memory type for depth buffer")]
    NoCompatibleMemoryType,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
