//! Glint demo viewer.
//!
//! Opens a window, acquires a Vulkan render context against it, and drives
//! the empty frame submission cycle until the window closes.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p glint-viewer
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g. info, debug, trace)
//! - `FULLSCREEN`: Set to `1` to start in borderless fullscreen

use glint_app::{fullscreen_from_env, run, AppConfig};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() == 1 {
        println!("{} arg:", args.len());
    } else {
        println!("{} args:", args.len());
    }
    for arg in &args {
        println!("  \"{arg}\"");
    }

    // Resources are loaded with relative paths, and different platforms
    // start in slightly different directories.
    if let Ok(dir) = std::env::current_dir() {
        println!("Working directory: {}", dir.display());
    }

    let config = AppConfig::new("Glint Viewer").with_fullscreen(fullscreen_from_env());
    run(config)
}
