//! Vulkan context acquisition layer for the Glint renderer.
//!
//! This crate provides:
//! - Driver capability queries and structured diagnostics
//! - Deterministic selection policy over the queried capabilities
//! - Ordered GPU context construction with guaranteed reverse teardown
//! - The synchronous per-frame submission cycle

pub mod capabilities;
pub mod command;
pub mod context;
pub mod depth;
pub mod device;
pub mod error;
pub mod instance;
pub mod ledger;
pub mod plan;
pub mod renderpass;
pub mod report;
pub mod select;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use capabilities::{AdapterInfo, CapabilitySnapshot, QueueFamilyInfo};
pub use context::{RenderContext, RenderContextBuilder};
pub use error::{GpuError, Result};
pub use ledger::{LedgerEvent, Resource, ResourceLedger, Violation};
pub use plan::{BuildStage, ContextPlan, StageError};
pub use report::{Finding, StageReport};
pub use swapchain::SWAPCHAIN_IMAGE_COUNT;
