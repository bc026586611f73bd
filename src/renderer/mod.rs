pub mod backend;
pub mod commands;
pub mod submit;

mod config;
mod contexts;
mod resources;
mod shader_data;
mod vulkan;

use std::sync::Arc;
use ash::vk;
use color_eyre::Result;
use gpu_allocator::MemoryLocation;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::{CmdBuf, QueueKind};
use crate::renderer::config::RenderConfig;
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::contexts::pipeline_ctx::RenderPipelineContext;
use crate::renderer::resources::buffer::Buffer;
use crate::renderer::resources::mesh::Mesh;
use crate::renderer::resources::texture::Texture;
use crate::renderer::submit::{ComputePass, FramePlan, StartupPlan, TextureUpload};
use crate::renderer::vulkan::VkBackend;

pub struct Renderer {
    frame_cmds: Vec<CmdBuf>,

    // Dropped before the backend so their device references stay valid.
    pipelines: RenderPipelineContext,
    texture: Texture,
    quad_buffer: Buffer,
    result_buffer: Buffer,

    backend: VkBackend,
}

impl Renderer {
    /// One-shot initialization: factory work first (device, pipelines,
    /// buffers, texture), then the startup submission sequence that
    /// computes the image, hands it to the graphics queue, uploads the
    /// texture, and records the static frame command buffers.
    pub fn new(window: Arc<winit::window::Window>) -> Result<Self> {
        let config = RenderConfig::default();

        let ctx = RenderDeviceContext::new(window)?;
        log::info!("vulkan initialized");

        let device = ctx.device.logical.clone();
        let allocator = ctx.device.allocator();
        let compute_family = ctx.device.compute_queue.family.index;
        let graphics_family = ctx.device.graphics_queue.family.index;

        let mut result_buffer = Buffer::new(
            config.compute_byte_len(),
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::GpuOnly,
            "compute result",
            compute_family,
            allocator.clone(),
            device.clone(),
        )?;

        let mesh = Mesh::fullscreen_quad();
        let mut quad_buffer = Buffer::new(
            mesh.byte_len(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
            MemoryLocation::CpuToGpu,
            "fullscreen quad",
            graphics_family,
            allocator.clone(),
            device.clone(),
        )?;
        quad_buffer.write(mesh.vertices(), 0)?;

        let texture = Texture::new(
            config.texture_width,
            config.texture_height,
            allocator,
            device,
        )?;

        let pipelines = RenderPipelineContext::new(&ctx, &result_buffer, &texture)?;
        log::info!("pipelines created");

        let mut backend = VkBackend::new(ctx)?;
        let result = backend.register_buffer(&result_buffer);
        let quad = backend.register_buffer(&quad_buffer);
        let image = backend.register_image(&texture.image);
        let compute_pipeline = backend.register_pipeline(&pipelines.compute);
        let graphics_pipeline = backend.register_pipeline(&pipelines.graphics);

        let plan = StartupPlan {
            compute: ComputePass {
                pipeline: compute_pipeline,
                target: result,
                width: config.compute_width,
                height: config.compute_height,
                bytes_per_pixel: config.bytes_per_pixel,
            },
            upload: TextureUpload {
                src: result,
                dst: image,
                width: config.texture_width,
                height: config.texture_height,
                bytes_per_pixel: config.bytes_per_pixel,
            },
            frame: FramePlan {
                pipeline: graphics_pipeline,
                vertex_buffer: quad,
                vertex_count: mesh.vertex_count(),
                clear_color: config.clear_color,
            },
        };
        let frame_cmds = submit::run_startup(&mut backend, &plan)?;
        result_buffer.transfer_owner(backend.queue_family(QueueKind::Graphics));
        log::info!(
            "compute result now owned by queue family {}",
            result_buffer.owner_family(),
        );

        Ok(Self {
            frame_cmds,

            pipelines,
            texture,
            quad_buffer,
            result_buffer,

            backend,
        })
    }

    /// Steady state: resubmit the pre-recorded command buffer for the
    /// next swapchain image and present it.
    pub fn draw(&mut self) -> Result<()> {
        self.backend.present_frame(&self.frame_cmds)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Everything below is destroyed field by field; the device just
        // has to be idle first.
        let _ = self.backend.wait_device_idle();
    }
}
