//! Application runner and event loop.

use std::sync::Arc;

use glint_gpu::RenderContextBuilder;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowId};

use crate::config::AppConfig;

/// Run the application with the given configuration.
///
/// Initializes logging, creates the window and render context, then drives
/// one frame submission per redraw until the window closes. Any fatal
/// initialization error exits the event loop; there is no degraded mode.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("{} starting...", config.title);
    if config.fullscreen {
        info!("Starting in fullscreen");
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        state: None,
    };

    if let Err(e) = event_loop.run_app(&mut runner) {
        error!("Event loop error: {e}");
    }

    Ok(())
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    state: Option<AppState>,
}

/// Window plus the live GPU context.
struct AppState {
    window: Arc<Window>,
    ctx: glint_gpu::RenderContext,
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => {
                error!("Failed to initialize application: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                // Dropping the state tears the context down behind a
                // device-idle wait.
                self.state = None;
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    match event.logical_key.as_ref() {
                        Key::Named(NamedKey::Escape) | Key::Character("q") => {
                            info!("Close requested");
                            self.state = None;
                            event_loop.exit();
                        }
                        Key::Character("f") => {
                            debug!("Fullscreen toggle not implemented");
                        }
                        _ => {}
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let failed = if let Some(state) = &mut self.state {
                    match state.ctx.submit_frame() {
                        Ok(()) => {
                            state.window.request_redraw();
                            false
                        }
                        Err(e) => {
                            error!("Frame submission failed: {e}");
                            true
                        }
                    }
                } else {
                    false
                };
                if failed {
                    self.state = None;
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(size) => {
                // Swapchain rebuild is anticipated but not implemented.
                info!("Framebuffer resized -> ({}, {})", size.width, size.height);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

impl AppRunner {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        // Resolution pick: fullscreen takes the monitor's video mode,
        // windowed derives from the monitor height. Config sizes are the
        // fallback when no monitor can be queried.
        let mut width = self.config.width;
        let mut height = self.config.height;
        let mut fullscreen = None;

        if let Some(monitor) = event_loop.primary_monitor() {
            let mode = monitor.size();
            if self.config.fullscreen {
                width = mode.width;
                height = mode.height;
                fullscreen = Some(Fullscreen::Borderless(Some(monitor)));
            } else {
                height = mode.height / 2;
                width = ((f64::from(mode.height) / 1.6) as u32).min(mode.width);
            }
        }
        info!("Window resolution: {width} x {height}");

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
            .with_resizable(false)
            .with_fullscreen(fullscreen);

        let window = Arc::new(event_loop.create_window(window_attrs)?);

        // The framebuffer might be larger than the requested window size,
        // especially on high DPI displays.
        let size = window.inner_size();
        info!("Framebuffer resolution: {} x {}", size.width, size.height);

        let ctx = RenderContextBuilder::new()
            .app_name(&self.config.title)
            .validation(self.config.validation)
            .build(window.as_ref(), size.width.max(1), size.height.max(1))?;

        info!(
            "GPU: {}",
            ctx.snapshot().adapters[ctx.plan().adapter_index].summary()
        );

        Ok(AppState { window, ctx })
    }
}
