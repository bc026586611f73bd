pub mod device;
pub mod instance;
pub mod queue;
pub mod swapchain;
pub mod target;

use std::sync::Arc;
use color_eyre::Result;
use crate::renderer::contexts::device_ctx::device::RenderDevice;
use crate::renderer::contexts::device_ctx::instance::RenderInstance;
use crate::renderer::contexts::device_ctx::target::{RenderTarget, Surface};

/// Responsibilities:
/// - Manage the Vulkan instance, device, and queues
/// - Own the presentation target (surface, swapchain, render pass)
pub struct RenderDeviceContext {
    // Fields drop in declaration order: target, then device, then instance.
    pub target: RenderTarget,
    pub device: RenderDevice,
    pub instance: RenderInstance,
}

impl RenderDeviceContext {
    pub fn new(window: Arc<winit::window::Window>) -> Result<Self> {
        let instance = RenderInstance::new(&window)?;
        log::info!("vulkan instance created");

        let (surface_handle, surface_loader) = instance.create_surface(&window)?;
        let surface = Surface {
            handle: surface_handle,
            loader: surface_loader,
        };
        log::info!("surface created");

        let device = RenderDevice::new(&instance.instance, &surface.handle, &surface.loader)?;
        let target = RenderTarget::new(window, surface, &instance.instance, &device)?;

        Ok(Self {
            target,
            device,
            instance,
        })
    }
}
