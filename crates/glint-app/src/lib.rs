//! Application framework for the Glint renderer.
//!
//! This crate provides the windowing glue around the GPU context:
//! - Window creation and the winit event loop
//! - Logging initialization
//! - One frame submission per redraw
//!
//! # Example
//!
//! ```no_run
//! use glint_app::{run, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run(AppConfig::new("My App"))
//! }
//! ```

mod config;
mod runner;

pub use config::{fullscreen_from_env, AppConfig};
pub use runner::run;

// Re-export commonly used types for convenience
pub use glint_gpu::{RenderContext, RenderContextBuilder};
pub use winit::event::WindowEvent;
