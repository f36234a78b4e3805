//! GPU context construction and the per-frame submission cycle.
//!
//! Construction runs in strict dependency order; every stage is skipped
//! once a prior stage fails, and whatever was already built is torn down
//! in reverse order before the error is returned. Teardown at the end of
//! life follows the same reverse order, always draining the device first.

use crate::capabilities::{
    query_adapters, query_instance_extensions, query_instance_layers, query_queue_families,
    query_surface_support, CapabilitySnapshot,
};
use crate::command;
use crate::depth::DepthBuffer;
use crate::device;
use crate::error::{GpuError, Result};
use crate::instance;
use crate::ledger::{Resource, ResourceLedger};
use crate::plan::{BuildStage, ContextPlan, StageError};
use crate::renderpass;
use crate::report::StageReport;
use crate::select;
use crate::surface;
use crate::swapchain::{self, SWAPCHAIN_IMAGE_COUNT};
use crate::sync;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::CStr;

/// The live GPU handle set.
///
/// Built once at startup, immutable afterwards, torn down exactly once in
/// reverse-of-construction order. The swapchain is the only member ever
/// expected to be rebuilt; that rebuild is anticipated structurally but not
/// implemented here.
pub struct RenderContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    device: ash::Device,
    queue_family_index: u32,
    graphics_queue: vk::Queue,
    frame_fence: vk::Fence,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    command_pool: vk::CommandPool,
    depth: DepthBuffer,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    snapshot: CapabilitySnapshot,
    plan: ContextPlan,
    ledger: ResourceLedger,
    frame_count: u64,
}

impl RenderContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get the graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Get the graphics queue family index.
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// Get the swapchain surface format.
    pub fn surface_format(&self) -> vk::SurfaceFormatKHR {
        self.surface_format
    }

    /// Get the swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Get the render pass.
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Get the framebuffers, one per swapchain image.
    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }

    /// Number of swapchain images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Everything that was queried while building this context.
    pub fn snapshot(&self) -> &CapabilitySnapshot {
        &self.snapshot
    }

    /// The configuration selected from the snapshot.
    pub fn plan(&self) -> &ContextPlan {
        &self.plan
    }

    /// The lifecycle event record for this context.
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Frames submitted so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Block until all submitted GPU work has drained.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }

    /// Submit one frame work unit and retire it.
    ///
    /// Allocates a transient command buffer, records nothing (the cycle is
    /// the point), submits it to the graphics queue, blocks until the GPU
    /// finishes, and frees the buffer. Any failure is fatal to the caller;
    /// there is no retry path for driver-level exhaustion.
    pub fn submit_frame(&mut self) -> Result<()> {
        unsafe {
            command::submit_and_wait(
                &self.device,
                self.graphics_queue,
                self.command_pool,
                self.frame_fence,
                |_command_buffer| {
                    // No draw commands yet.
                },
            )?;
        }
        self.frame_count += 1;
        Ok(())
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        unsafe {
            // Outstanding GPU work referencing destroyed objects is
            // undefined behavior at the driver level; drain first.
            let _ = self.device.device_wait_idle();
            self.ledger.record_wait_idle();

            for framebuffer in self.framebuffers.drain(..).rev() {
                self.device.destroy_framebuffer(framebuffer, None);
            }
            self.ledger.record_destroyed(Resource::Framebuffers);

            self.device.destroy_render_pass(self.render_pass, None);
            self.ledger.record_destroyed(Resource::RenderPass);

            let mut depth = self.depth;
            depth.destroy(&self.device);
            self.ledger.record_destroyed(Resource::DepthBuffer);

            self.device.destroy_command_pool(self.command_pool, None);
            self.ledger.record_destroyed(Resource::CommandPool);

            for view in self.image_views.drain(..).rev() {
                self.device.destroy_image_view(view, None);
            }
            self.ledger.record_destroyed(Resource::SwapchainImageViews);

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.ledger.record_destroyed(Resource::Swapchain);

            self.surface_loader.destroy_surface(self.surface, None);
            self.ledger.record_destroyed(Resource::Surface);

            self.device.destroy_fence(self.frame_fence, None);
            self.ledger.record_destroyed(Resource::FrameFence);

            self.device.destroy_device(None);
            self.ledger.record_destroyed(Resource::Device);

            self.instance.destroy_instance(None);
            self.ledger.record_destroyed(Resource::Instance);
        }
    }
}

/// Builder for creating a render context.
pub struct RenderContextBuilder {
    app_name: String,
    validation: bool,
}

impl Default for RenderContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Glint".to_string(),
            validation: cfg!(debug_assertions),
        }
    }
}

impl RenderContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.validation = enable;
        self
    }

    /// Build the render context against the given window.
    ///
    /// `width` and `height` are the current framebuffer size in pixels
    /// (which may exceed the window size on high-DPI displays). On failure
    /// every already-constructed resource is destroyed, in reverse order
    /// and behind a device-idle wait, before the error is returned.
    pub fn build<W>(
        self,
        window: &W,
        width: u32,
        height: u32,
    ) -> std::result::Result<RenderContext, StageError>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let mut parts = PartialContext::default();
        let mut ledger = ResourceLedger::new();

        match self.build_stages(window, width, height, &mut parts, &mut ledger) {
            Ok(mut context) => {
                context.ledger = std::mem::take(&mut ledger);
                Ok(context)
            }
            Err(err) => {
                tracing::error!("{err}");
                unsafe {
                    parts.teardown(&mut ledger);
                }
                Err(err)
            }
        }
    }

    fn build_stages<W>(
        &self,
        window: &W,
        width: u32,
        height: u32,
        parts: &mut PartialContext,
        ledger: &mut ResourceLedger,
    ) -> std::result::Result<RenderContext, StageError>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let mut snapshot = CapabilitySnapshot::default();

        let header = vk::HEADER_VERSION_COMPLETE;
        tracing::info!(
            "Built with Vulkan headers {}.{}.{}",
            vk::api_version_major(header),
            vk::api_version_minor(header),
            vk::api_version_patch(header)
        );

        // A missing loader fails the instance stage.
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            StageError::new(BuildStage::Instance, GpuError::EntryLoad(e.to_string()))
        })?;

        // Layers: wanted ∩ available; missing ones are only warned about.
        snapshot.available_layers = unsafe { query_instance_layers(&entry) }
            .map_err(|e| StageError::new(BuildStage::Layers, e))?;
        tracing::info!(
            "{}",
            StageReport::from_list(
                format!("Found {} layers", snapshot.available_layers.len()),
                snapshot.available_layers.iter().map(String::as_str),
            )
            .render()
        );

        let wanted = instance::wanted_layers(self.validation);
        let (enabled_layers, missing_layers) =
            select::filter_layers(&wanted, &snapshot.available_layers);
        for layer in &missing_layers {
            tracing::warn!("Unable to find Vulkan layer \"{layer}\"");
        }
        tracing::info!(
            "{}",
            StageReport::from_list(
                format!("Using {} layers", enabled_layers.len()),
                enabled_layers.iter().map(String::as_str),
            )
            .render()
        );
        snapshot.enabled_layers = enabled_layers;

        // Instance: the windowing layer's extensions are mandatory and are
        // verified against the available set before anything is created.
        snapshot.available_instance_extensions = unsafe { query_instance_extensions(&entry) }
            .map_err(|e| StageError::new(BuildStage::Instance, e))?;
        tracing::info!(
            "Found {} instance extensions",
            snapshot.available_instance_extensions.len()
        );
        tracing::debug!(
            "{}",
            StageReport::from_list(
                "Instance extensions found",
                snapshot.available_instance_extensions.iter().map(String::as_str),
            )
            .render()
        );

        let required_extension_pointers = surface::required_surface_extensions(window)
            .map_err(|e| StageError::new(BuildStage::Instance, e))?;
        snapshot.required_instance_extensions = required_extension_pointers
            .iter()
            .map(|&pointer| {
                unsafe { CStr::from_ptr(pointer) }
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();

        select::check_instance_extensions(
            &snapshot.required_instance_extensions,
            &snapshot.available_instance_extensions,
        )
        .map_err(|e| StageError::new(BuildStage::Instance, e))?;
        tracing::info!(
            "{}",
            StageReport::from_list(
                format!(
                    "Using {} instance extensions",
                    snapshot.required_instance_extensions.len()
                ),
                snapshot.required_instance_extensions.iter().map(String::as_str),
            )
            .render()
        );

        let vk_instance = unsafe {
            instance::create_instance(
                &entry,
                &self.app_name,
                &snapshot.enabled_layers,
                &required_extension_pointers,
            )
        }
        .map_err(|e| StageError::new(BuildStage::Instance, e))?;
        parts.instance = Some(vk_instance.clone());
        ledger.record_created(Resource::Instance);

        // Physical device: first enumerated one wins.
        let (devices, adapters) = unsafe { query_adapters(&vk_instance) }
            .map_err(|e| StageError::new(BuildStage::PhysicalDevice, e))?;
        tracing::info!("Found {} physical device(s)", devices.len());
        for adapter in &adapters {
            tracing::debug!("{}", adapter.report().render());
            tracing::info!(
                "({}) Found {} available extensions",
                adapter.name,
                adapter.extensions.len()
            );
            tracing::debug!(
                "{}",
                StageReport::from_list(
                    format!("({}) Available extensions", adapter.name),
                    adapter.extensions.iter().map(String::as_str),
                )
                .render()
            );
        }
        snapshot.adapters = adapters;

        let adapter_index = select::select_adapter(&snapshot.adapters).ok_or_else(|| {
            StageError::new(BuildStage::PhysicalDevice, GpuError::NoAdapters)
        })?;
        let physical_device = devices[adapter_index];
        tracing::info!("Using {}", snapshot.adapters[adapter_index].summary());

        // Logical device and its single graphics queue.
        snapshot.queue_families =
            unsafe { query_queue_families(&vk_instance, physical_device) };
        for (index, family) in snapshot.queue_families.iter().enumerate() {
            tracing::debug!("{}", family.report(index as u32).render());
        }

        let queue_family_index = select::select_graphics_queue_family(&snapshot.queue_families)
            .ok_or_else(|| {
                StageError::new(BuildStage::Device, GpuError::NoGraphicsQueueFamily)
            })?;

        let device_extensions = device::required_device_extensions();
        tracing::info!(
            "{}",
            StageReport::from_list(
                format!("Using {} device extensions", device_extensions.len()),
                device_extensions
                    .iter()
                    .map(|ext| ext.to_string_lossy().into_owned()),
            )
            .render()
        );

        let (vk_device, graphics_queue) =
            unsafe { device::create_device(&vk_instance, physical_device, queue_family_index) }
                .map_err(|e| StageError::new(BuildStage::Device, e))?;
        parts.device = Some(vk_device.clone());
        ledger.record_created(Resource::Device);

        // Frame fence, unsignaled; the submission cycle reuses it.
        let frame_fence = unsafe { sync::create_fence(&vk_device, false) }
            .map_err(|e| StageError::new(BuildStage::Sync, e))?;
        parts.frame_fence = frame_fence;
        ledger.record_created(Resource::FrameFence);

        // Presentation surface, bound to the caller's window handle.
        let surface_loader = ash::khr::surface::Instance::new(&entry, &vk_instance);
        let vk_surface = unsafe { surface::create_surface(&entry, &vk_instance, window) }
            .map_err(|e| StageError::new(BuildStage::Surface, e))?;
        parts.surface_loader = Some(surface_loader.clone());
        parts.surface = vk_surface;
        ledger.record_created(Resource::Surface);

        let support = unsafe {
            query_surface_support(
                &surface_loader,
                physical_device,
                vk_surface,
                queue_family_index,
            )
        }
        .map_err(|e| StageError::new(BuildStage::Surface, e))?;
        snapshot.present_support = support.present_support;
        snapshot.surface_capabilities = support.capabilities;
        snapshot.surface_formats = support.formats;
        snapshot.present_modes = support.present_modes;

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

        // Swapchain with the fixed image count.
        let swapchain_loader = ash::khr::swapchain::Device::new(&vk_instance, &vk_device);
        let extent = swapchain::calculate_extent(&snapshot.surface_capabilities, width, height);
        let vk_swapchain = unsafe {
            swapchain::create_swapchain(
                &swapchain_loader,
                vk_surface,
                &snapshot.surface_capabilities,
                surface_format,
                present_mode,
                extent,
                queue_family_index,
            )
        }
        .map_err(|e| StageError::new(BuildStage::Swapchain, e))?;
        parts.swapchain_loader = Some(swapchain_loader.clone());
        parts.swapchain = vk_swapchain;
        ledger.record_created(Resource::Swapchain);

        let images = unsafe { swapchain_loader.get_swapchain_images(vk_swapchain) }
            .map_err(|e| StageError::new(BuildStage::Swapchain, GpuError::from(e)))?;
        swapchain::validate_image_count(SWAPCHAIN_IMAGE_COUNT, images.len() as u32)
            .map_err(|e| StageError::new(BuildStage::Swapchain, e))?;
        tracing::info!(
            "Swapchain created: {}x{} ({} images)",
            extent.width,
            extent.height,
            images.len()
        );

        let image_views =
            unsafe { swapchain::create_image_views(&vk_device, &images, surface_format.format) }
                .map_err(|e| StageError::new(BuildStage::ImageViews, e))?;
        parts.image_views = image_views.clone();
        ledger.record_created(Resource::SwapchainImageViews);

        let command_pool = unsafe { command::create_command_pool(&vk_device, queue_family_index) }
            .map_err(|e| StageError::new(BuildStage::CommandPool, e))?;
        parts.command_pool = command_pool;
        ledger.record_created(Resource::CommandPool);

        let depth = unsafe {
            DepthBuffer::new(
                &vk_device,
                &snapshot.adapters[adapter_index].memory,
                extent,
            )
        }
        .map_err(|e| StageError::new(BuildStage::DepthBuffer, e))?;
        parts.depth = Some(depth);
        ledger.record_created(Resource::DepthBuffer);

        let render_pass = unsafe {
            renderpass::create_render_pass(&vk_device, surface_format.format, depth.format)
        }
        .map_err(|e| StageError::new(BuildStage::RenderPass, e))?;
        parts.render_pass = render_pass;
        ledger.record_created(Resource::RenderPass);

        let framebuffers = unsafe {
            renderpass::create_framebuffers(&vk_device, render_pass, &image_views, depth.view, extent)
        }
        .map_err(|e| StageError::new(BuildStage::Framebuffers, e))?;
        renderpass::validate_framebuffer_count(framebuffers.len(), images.len())
            .map_err(|e| StageError::new(BuildStage::Framebuffers, e))?;
        parts.framebuffers = framebuffers.clone();
        ledger.record_created(Resource::Framebuffers);

        tracing::info!("Render context ready ({} framebuffers)", framebuffers.len());

        let plan = ContextPlan {
            enabled_layers: snapshot.enabled_layers.clone(),
            missing_layers,
            adapter_index,
            queue_family_index,
            surface_format,
            present_mode,
            image_count: SWAPCHAIN_IMAGE_COUNT,
        };

        Ok(RenderContext {
            entry,
            instance: vk_instance,
            physical_device,
            device: vk_device,
            queue_family_index,
            graphics_queue,
            frame_fence,
            surface_loader,
            surface: vk_surface,
            swapchain_loader,
            swapchain: vk_swapchain,
            surface_format,
            extent,
            images,
            image_views,
            command_pool,
            depth,
            render_pass,
            framebuffers,
            snapshot,
            plan,
            ledger: ResourceLedger::new(),
            frame_count: 0,
        })
    }
}

/// Resources gathered while a build is in flight, so a failure at any
/// stage can drop exactly what exists, in reverse order.
#[derive(Default)]
struct PartialContext {
    instance: Option<ash::Instance>,
    device: Option<ash::Device>,
    frame_fence: vk::Fence,
    surface_loader: Option<ash::khr::surface::Instance>,
    surface: vk::SurfaceKHR,
    swapchain_loader: Option<ash::khr::swapchain::Device>,
    swapchain: vk::SwapchainKHR,
    image_views: Vec<vk::ImageView>,
    command_pool: vk::CommandPool,
    depth: Option<DepthBuffer>,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
}

impl PartialContext {
    /// Destroy whatever was constructed, in reverse construction order.
    ///
    /// # Safety
    /// Must be called at most once, and none of the recorded handles may
    /// still be referenced by submitted GPU work afterwards.
    unsafe fn teardown(&mut self, ledger: &mut ResourceLedger) {
        if let Some(device) = &self.device {
            let _ = device.device_wait_idle();
            ledger.record_wait_idle();

            if !self.framebuffers.is_empty() {
                for framebuffer in self.framebuffers.drain(..).rev() {
                    device.destroy_framebuffer(framebuffer, None);
                }
                ledger.record_destroyed(Resource::Framebuffers);
            }
            if self.render_pass != vk::RenderPass::null() {
                device.destroy_render_pass(self.render_pass, None);
                self.render_pass = vk::RenderPass::null();
                ledger.record_destroyed(Resource::RenderPass);
            }
            if let Some(mut depth) = self.depth.take() {
                depth.destroy(device);
                ledger.record_destroyed(Resource::DepthBuffer);
            }
            if self.command_pool != vk::CommandPool::null() {
                device.destroy_command_pool(self.command_pool, None);
                self.command_pool = vk::CommandPool::null();
                ledger.record_destroyed(Resource::CommandPool);
            }
            if !self.image_views.is_empty() {
                for view in self.image_views.drain(..).rev() {
                    device.destroy_image_view(view, None);
                }
                ledger.record_destroyed(Resource::SwapchainImageViews);
            }
            if let (Some(loader), true) = (
                &self.swapchain_loader,
                self.swapchain != vk::SwapchainKHR::null(),
            ) {
                loader.destroy_swapchain(self.swapchain, None);
                self.swapchain = vk::SwapchainKHR::null();
                ledger.record_destroyed(Resource::Swapchain);
            }
        }

        if let (Some(loader), true) = (
            &self.surface_loader,
            self.surface != vk::SurfaceKHR::null(),
        ) {
            loader.destroy_surface(self.surface, None);
            self.surface = vk::SurfaceKHR::null();
            ledger.record_destroyed(Resource::Surface);
        }

        if let Some(device) = &self.device {
            if self.frame_fence != vk::Fence::null() {
                device.destroy_fence(self.frame_fence, None);
                self.frame_fence = vk::Fence::null();
                ledger.record_destroyed(Resource::FrameFence);
            }
        }

        if let Some(device) = self.device.take() {
            device.destroy_device(None);
            ledger.record_destroyed(Resource::Device);
        }

        if let Some(instance) = self.instance.take() {
            instance.destroy_instance(None);
            ledger.record_destroyed(Resource::Instance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_methods_override_defaults() {
        let builder = RenderContextBuilder::new()
            .app_name("Test")
            .validation(false);
        assert_eq!(builder.app_name, "Test");
        assert!(!builder.validation);
    }

    #[test]
    fn teardown_of_an_empty_partial_context_records_nothing() {
        let mut parts = PartialContext::default();
        let mut ledger = ResourceLedger::new();
        unsafe { parts.teardown(&mut ledger) };
        assert!(ledger.events().is_empty());
    }
}
