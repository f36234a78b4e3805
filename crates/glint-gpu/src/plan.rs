//! Construction planning.
//!
//! [`ContextPlan::resolve`] runs every selection decision against a
//! [`CapabilitySnapshot`] in construction order and either produces the full
//! configuration or stops at the first unmet requirement, reporting the
//! stage it stopped at. The live builder makes the same decisions with the
//! same functions as the queries complete; resolving against a hand-built
//! snapshot exercises the policy without a driver.

use crate::capabilities::CapabilitySnapshot;
use crate::error::GpuError;
use crate::select;
use crate::swapchain::SWAPCHAIN_IMAGE_COUNT;
use ash::vk;
use std::fmt;
use thiserror::Error;

/// Stages of context construction, in dependency order.
///
/// Each stage strictly depends on the previous one; a fatal error at any
/// stage skips everything after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Layers,
    Instance,
    PhysicalDevice,
    Device,
    Sync,
    Surface,
    SurfaceFormat,
    PresentMode,
    Swapchain,
    ImageViews,
    CommandPool,
    DepthBuffer,
    RenderPass,
    Framebuffers,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Layers => "layer selection",
            Self::Instance => "instance creation",
            Self::PhysicalDevice => "physical device selection",
            Self::Device => "logical device creation",
            Self::Sync => "synchronization primitive creation",
            Self::Surface => "surface creation",
            Self::SurfaceFormat => "surface format selection",
            Self::PresentMode => "present mode selection",
            Self::Swapchain => "swapchain creation",
            Self::ImageViews => "swapchain image view creation",
            Self::CommandPool => "command pool creation",
            Self::DepthBuffer => "depth buffer creation",
            Self::RenderPass => "render pass creation",
            Self::Framebuffers => "framebuffer creation",
        };
        f.write_str(name)
    }
}

/// A fatal construction error, tagged with the stage that detected it.
#[derive(Error, Debug)]
#[error("context construction failed during {stage}: {source}")]
pub struct StageError {
    pub stage: BuildStage,
    #[source]
    pub source: GpuError,
}

impl StageError {
    pub fn new(stage: BuildStage, source: GpuError) -> Self {
        Self { stage, source }
    }
}

/// The configuration selected from a capability snapshot.
#[derive(Debug, Clone)]
pub struct ContextPlan {
    /// Layers to enable (wanted ∩ available).
    pub enabled_layers: Vec<String>,
    /// Wanted layers that were not available; warned about, never fatal.
    pub missing_layers: Vec<String>,
    /// Index into the snapshot's adapter list.
    pub adapter_index: usize,
    /// Queue family used for graphics and presentation.
    pub queue_family_index: u32,
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    /// Swapchain image count, fixed at build time.
    pub image_count: u32,
}

impl ContextPlan {
    /// Resolve every selection decision from the snapshot, in stage order.
    ///
    /// Fails with the stage at which the first unmet requirement was
    /// detected; nothing after that stage is resolved.
    pub fn resolve(
        snapshot: &CapabilitySnapshot,
        wanted_layers: &[&str],
    ) -> Result<Self, StageError> {
        let (enabled_layers, missing_layers) =
            select::filter_layers(wanted_layers, &snapshot.available_layers);

        select::check_instance_extensions(
            &snapshot.required_instance_extensions,
            &snapshot.available_instance_extensions,
        )
        .map_err(|e| StageError::new(BuildStage::Instance, e))?;

        let adapter_index = select::select_adapter(&snapshot.adapters)
            .ok_or_else(|| StageError::new(BuildStage::PhysicalDevice, GpuError::NoAdapters))?;

        let queue_family_index = select::select_graphics_queue_family(&snapshot.queue_families)
            .ok_or_else(|| {
                StageError::new(BuildStage::Device, GpuError::NoGraphicsQueueFamily)
            })?;

        if !snapshot.present_support {
            return Err(StageError::new(
                BuildStage::Surface,
                GpuError::SurfaceNotSupported,
            ));
        }

        let surface_format = select::select_surface_format(&snapshot.surface_formats)
            .map_err(|e| StageError::new(BuildStage::SurfaceFormat, e))?;

        let present_mode = select::select_present_mode(&snapshot.present_modes)
            .map_err(|e| StageError::new(BuildStage::PresentMode, e))?;

        Ok(Self {
            enabled_layers,
            missing_layers,
            adapter_index,
            queue_family_index,
            surface_format,
            present_mode,
            image_count: SWAPCHAIN_IMAGE_COUNT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{AdapterInfo, QueueFamilyInfo};

    /// Snapshot for a driver with one device, one graphics+compute queue
    /// family at index 0, FIFO presentation, and a single BGRA8
    /// sRGB-nonlinear surface format.
    fn fake_driver_snapshot() -> CapabilitySnapshot {
        CapabilitySnapshot {
            available_layers: vec!["VK_LAYER_KHRONOS_validation".to_string()],
            available_instance_extensions: vec![
                "VK_KHR_surface".to_string(),
                "VK_KHR_xlib_surface".to_string(),
            ],
            required_instance_extensions: vec![
                "VK_KHR_surface".to_string(),
                "VK_KHR_xlib_surface".to_string(),
            ],
            adapters: vec![AdapterInfo {
                name: "Fake GPU".to_string(),
                extensions: vec!["VK_KHR_swapchain".to_string()],
                ..AdapterInfo::default()
            }],
            queue_families: vec![QueueFamilyInfo {
                flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE,
                count: 1,
            }],
            present_support: true,
            surface_formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO],
            ..CapabilitySnapshot::default()
        }
    }

    #[test]
    fn valid_snapshot_resolves_every_stage() {
        let plan = ContextPlan::resolve(&fake_driver_snapshot(), &[]).unwrap();
        assert_eq!(plan.adapter_index, 0);
        assert_eq!(plan.queue_family_index, 0);
        assert_eq!(plan.surface_format.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(plan.present_mode, vk::PresentModeKHR::FIFO);
        assert_eq!(plan.image_count, SWAPCHAIN_IMAGE_COUNT);
    }

    #[test]
    fn missing_fifo_fails_at_present_mode_before_swapchain() {
        let mut snapshot = fake_driver_snapshot();
        snapshot.present_modes = vec![vk::PresentModeKHR::MAILBOX];
        let err = ContextPlan::resolve(&snapshot, &[]).unwrap_err();
        assert_eq!(err.stage, BuildStage::PresentMode);
        assert!(err.stage < BuildStage::Swapchain);
    }

    #[test]
    fn empty_present_mode_listing_fails_at_present_mode() {
        let mut snapshot = fake_driver_snapshot();
        snapshot.present_modes.clear();
        let err = ContextPlan::resolve(&snapshot, &[]).unwrap_err();
        assert_eq!(err.stage, BuildStage::PresentMode);
    }

    #[test]
    fn missing_mandatory_extension_fails_before_instance_creation() {
        let mut snapshot = fake_driver_snapshot();
        snapshot.available_instance_extensions = vec!["VK_KHR_surface".to_string()];
        let err = ContextPlan::resolve(&snapshot, &[]).unwrap_err();
        assert_eq!(err.stage, BuildStage::Instance);
        assert!(matches!(
            err.source,
            GpuError::MissingInstanceExtension(name) if name == "VK_KHR_xlib_surface"
        ));
    }

    #[test]
    fn no_graphics_queue_fails_at_device_stage() {
        let mut snapshot = fake_driver_snapshot();
        snapshot.queue_families = vec![QueueFamilyInfo {
            flags: vk::QueueFlags::COMPUTE,
            count: 1,
        }];
        let err = ContextPlan::resolve(&snapshot, &[]).unwrap_err();
        assert_eq!(err.stage, BuildStage::Device);
    }

    #[test]
    fn unavailable_wanted_layer_is_a_warning_not_an_error() {
        let plan = ContextPlan::resolve(
            &fake_driver_snapshot(),
            &["VK_LAYER_KHRONOS_validation", "VK_LAYER_LUNARG_monitor"],
        )
        .unwrap();
        assert_eq!(plan.enabled_layers, vec!["VK_LAYER_KHRONOS_validation"]);
        assert_eq!(plan.missing_layers, vec!["VK_LAYER_LUNARG_monitor"]);
    }

    #[test]
    fn stage_order_matches_construction_order() {
        assert!(BuildStage::Layers < BuildStage::Instance);
        assert!(BuildStage::Instance < BuildStage::PhysicalDevice);
        assert!(BuildStage::Device < BuildStage::Surface);
        assert!(BuildStage::PresentMode < BuildStage::Swapchain);
        assert!(BuildStage::Swapchain < BuildStage::Framebuffers);
    }
}
