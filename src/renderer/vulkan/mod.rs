//! Translation of the recorded command stream onto ash, plus the
//! steady-state present path. Owns the device context, the per-queue
//! command pools, and non-owning tables mapping handles back to the raw
//! Vulkan objects the factory created.

use ash::vk;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::{
    BufferHandle, CmdBuf, Command, ImageHandle, PipelineHandle, QueueKind,
};
use crate::renderer::contexts::device_ctx::RenderDeviceContext;
use crate::renderer::contexts::pipeline_ctx::Pipeline;
use crate::renderer::resources::buffer::Buffer;
use crate::renderer::resources::image::Image;

struct BufferEntry {
    handle: vk::Buffer,
    len: u64,
}

struct ImageEntry {
    handle: vk::Image,
    aspect: vk::ImageAspectFlags,
}

struct PipelineEntry {
    bind_point: vk::PipelineBindPoint,
    handle: vk::Pipeline,
    layout: vk::PipelineLayout,
    descriptor_set: vk::DescriptorSet,
}

pub struct VkBackend {
    buffers: Vec<BufferEntry>,
    images: Vec<ImageEntry>,
    pipelines: Vec<PipelineEntry>,
    cmd_bufs: Vec<vk::CommandBuffer>,

    compute_pool: vk::CommandPool,
    graphics_transient_pool: vk::CommandPool,
    graphics_static_pool: vk::CommandPool,

    // Exactly one frame in flight.
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,

    pub ctx: RenderDeviceContext,
}

impl VkBackend {
    pub fn new(ctx: RenderDeviceContext) -> Result<Self> {
        let device = &ctx.device.logical;
        let compute_pool = create_command_pool(
            device,
            ctx.device.compute_queue.family.index,
            vk::CommandPoolCreateFlags::TRANSIENT,
        )?;
        let graphics_transient_pool = create_command_pool(
            device,
            ctx.device.graphics_queue.family.index,
            vk::CommandPoolCreateFlags::TRANSIENT,
        )?;
        // Static frame buffers are recorded once and never reset.
        let graphics_static_pool = create_command_pool(
            device,
            ctx.device.graphics_queue.family.index,
            vk::CommandPoolCreateFlags::empty(),
        )?;

        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let image_available = unsafe { device.create_semaphore(&semaphore_info, None)? };
        let render_finished = unsafe { device.create_semaphore(&semaphore_info, None)? };
        // Signaled so the first frame does not wait on work that never ran.
        let fence_info = vk::FenceCreateInfo::default()
            .flags(vk::FenceCreateFlags::SIGNALED);
        let in_flight = unsafe { device.create_fence(&fence_info, None)? };

        Ok(Self {
            buffers: Vec::new(),
            images: Vec::new(),
            pipelines: Vec::new(),
            cmd_bufs: Vec::new(),

            compute_pool,
            graphics_transient_pool,
            graphics_static_pool,

            image_available,
            render_finished,
            in_flight,

            ctx,
        })
    }

    pub fn register_buffer(&mut self, buffer: &Buffer) -> BufferHandle {
        self.buffers.push(BufferEntry {
            handle: buffer.handle,
            len: buffer.len,
        });
        BufferHandle(self.buffers.len() as u32 - 1)
    }

    pub fn register_image(&mut self, image: &Image) -> ImageHandle {
        self.images.push(ImageEntry {
            handle: image.image,
            aspect: image.aspect,
        });
        ImageHandle(self.images.len() as u32 - 1)
    }

    pub fn register_pipeline(&mut self, pipeline: &Pipeline) -> PipelineHandle {
        self.pipelines.push(PipelineEntry {
            bind_point: pipeline.bind_point,
            handle: pipeline.handle,
            layout: pipeline.layout,
            descriptor_set: pipeline.descriptor_set,
        });
        PipelineHandle(self.pipelines.len() as u32 - 1)
    }

    pub fn wait_device_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device.logical.device_wait_idle()?;
        }
        Ok(())
    }

    /// Steady state: acquire the next swapchain image, resubmit the
    /// pre-recorded command buffer for it, and present. Any backend
    /// failure, including a stale swapchain, propagates as fatal.
    pub fn present_frame(&mut self, frame_cmds: &[CmdBuf]) -> Result<()> {
        let device = &self.ctx.device.logical;
        let swapchain = &self.ctx.target.swapchain;
        let graphics_queue = self.ctx.device.graphics_queue.handle;

        unsafe {
            device.wait_for_fences(&[self.in_flight], true, u64::MAX)?;
            device.reset_fences(&[self.in_flight])?;
        }

        let (image_index, suboptimal) = unsafe {
            swapchain.loader.acquire_next_image(
                swapchain.handle,
                u64::MAX,
                self.image_available,
                vk::Fence::null(),
            )?
        };
        if suboptimal {
            return Err(eyre!("Swapchain went stale during image acquisition"));
        }

        let cmd_buf = frame_cmds
            .get(image_index as usize)
            .ok_or_else(|| eyre!("No recorded commands for swapchain image {image_index}"))?;
        let commands = [self.cmd_bufs[cmd_buf.0 as usize]];
        let wait_semaphores = [self.image_available];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.render_finished];
        let submit = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&commands)
            .signal_semaphores(&signal_semaphores);
        unsafe {
            device.queue_submit(graphics_queue, &[submit], self.in_flight)?;
        }

        let swapchains = [swapchain.handle];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        let suboptimal = unsafe {
            swapchain.loader.queue_present(graphics_queue, &present_info)?
        };
        if suboptimal {
            return Err(eyre!("Swapchain went stale during present"));
        }

        Ok(())
    }

    fn queue_handle(&self, queue: QueueKind) -> vk::Queue {
        match queue {
            QueueKind::Compute => self.ctx.device.compute_queue.handle,
            QueueKind::Graphics => self.ctx.device.graphics_queue.handle,
        }
    }

    fn record(
        &mut self,
        frame_index: Option<usize>,
        commands: &[Command],
        pool: vk::CommandPool,
        one_time: bool,
    ) -> Result<CmdBuf> {
        let device = self.ctx.device.logical.clone();

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let cmd = unsafe { device.allocate_command_buffers(&alloc_info)?[0] };

        let flags = if one_time {
            vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT
        } else {
            vk::CommandBufferUsageFlags::empty()
        };
        let begin_info = vk::CommandBufferBeginInfo::default().flags(flags);
        unsafe {
            device.begin_command_buffer(cmd, &begin_info)?;
        }
        for command in commands {
            self.translate(&device, cmd, frame_index, command)?;
        }
        unsafe {
            device.end_command_buffer(cmd)?;
        }

        self.cmd_bufs.push(cmd);
        Ok(CmdBuf(self.cmd_bufs.len() as u32 - 1))
    }

    fn translate(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        frame_index: Option<usize>,
        command: &Command,
    ) -> Result<()> {
        match *command {
            Command::BindComputePipeline { pipeline }
            | Command::BindGraphicsPipeline { pipeline } => {
                let entry = &self.pipelines[pipeline.0 as usize];
                let descriptor_sets = [entry.descriptor_set];
                unsafe {
                    device.cmd_bind_pipeline(cmd, entry.bind_point, entry.handle);
                    device.cmd_bind_descriptor_sets(
                        cmd,
                        entry.bind_point,
                        entry.layout,
                        0,
                        &descriptor_sets,
                        &[],
                    );
                }
            }
            Command::Dispatch { group_count } => unsafe {
                device.cmd_dispatch(cmd, group_count[0], group_count[1], group_count[2]);
            },
            Command::BufferBarrier(barrier) => {
                let entry = &self.buffers[barrier.buffer.0 as usize];
                let buffer_barriers = [vk::BufferMemoryBarrier::default()
                    .buffer(entry.handle)
                    .offset(0)
                    .size(vk::WHOLE_SIZE)
                    .src_access_mask(barrier.src_access)
                    .dst_access_mask(barrier.dst_access)
                    .src_queue_family_index(barrier.src_queue_family)
                    .dst_queue_family_index(barrier.dst_queue_family)];
                unsafe {
                    device.cmd_pipeline_barrier(
                        cmd,
                        barrier.src_stage,
                        barrier.dst_stage,
                        vk::DependencyFlags::empty(),
                        &[],
                        &buffer_barriers,
                        &[],
                    );
                }
            }
            Command::TransitionImage { image, old_layout, new_layout } => {
                let entry = &self.images[image.0 as usize];
                let (src_access, dst_access, src_stage, dst_stage) =
                    transition_masks(old_layout, new_layout)?;
                let image_barriers = [vk::ImageMemoryBarrier::default()
                    .old_layout(old_layout)
                    .new_layout(new_layout)
                    .src_access_mask(src_access)
                    .dst_access_mask(dst_access)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(entry.handle)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: entry.aspect,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    })];
                unsafe {
                    device.cmd_pipeline_barrier(
                        cmd,
                        src_stage,
                        dst_stage,
                        vk::DependencyFlags::empty(),
                        &[],
                        &[],
                        &image_barriers,
                    );
                }
            }
            Command::CopyBufferToImage { src, dst, width, height } => {
                let src_entry = &self.buffers[src.0 as usize];
                let dst_entry = &self.images[dst.0 as usize];
                let regions = [vk::BufferImageCopy::default()
                    .buffer_offset(0)
                    .buffer_row_length(0)
                    .buffer_image_height(0)
                    .image_subresource(vk::ImageSubresourceLayers {
                        aspect_mask: dst_entry.aspect,
                        mip_level: 0,
                        base_array_layer: 0,
                        layer_count: 1,
                    })
                    .image_extent(vk::Extent3D { width, height, depth: 1 })];
                unsafe {
                    device.cmd_copy_buffer_to_image(
                        cmd,
                        src_entry.handle,
                        dst_entry.handle,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &regions,
                    );
                }
            }
            Command::BeginRenderPass { clear_color, clear_depth, clear_stencil } => {
                let frame_index = frame_index.ok_or_else(|| {
                    eyre!("Render pass recorded outside a frame command buffer")
                })?;
                // Clear value order matches the attachment order: color,
                // then depth/stencil.
                let clear_values = [
                    vk::ClearValue {
                        color: vk::ClearColorValue { float32: clear_color },
                    },
                    vk::ClearValue {
                        depth_stencil: vk::ClearDepthStencilValue {
                            depth: clear_depth,
                            stencil: clear_stencil,
                        },
                    },
                ];
                let begin_info = vk::RenderPassBeginInfo::default()
                    .render_pass(self.ctx.target.render_pass)
                    .framebuffer(self.ctx.target.framebuffers[frame_index])
                    .render_area(vk::Rect2D {
                        offset: vk::Offset2D { x: 0, y: 0 },
                        extent: self.ctx.target.swapchain.extent,
                    })
                    .clear_values(&clear_values);
                unsafe {
                    device.cmd_begin_render_pass(
                        cmd,
                        &begin_info,
                        vk::SubpassContents::INLINE,
                    );
                }
            }
            Command::BindVertexBuffer { buffer } => {
                let entry = &self.buffers[buffer.0 as usize];
                let buffers = [entry.handle];
                let offsets = [0];
                unsafe {
                    device.cmd_bind_vertex_buffers(cmd, 0, &buffers, &offsets);
                }
            }
            Command::Draw { vertex_count, instance_count } => unsafe {
                device.cmd_draw(cmd, vertex_count, instance_count, 0, 0);
            },
            Command::EndRenderPass => unsafe {
                device.cmd_end_render_pass(cmd);
            },
        }

        Ok(())
    }
}

impl GpuBackend for VkBackend {
    fn queue_family(&self, queue: QueueKind) -> u32 {
        match queue {
            QueueKind::Compute => self.ctx.device.compute_queue.family.index,
            QueueKind::Graphics => self.ctx.device.graphics_queue.family.index,
        }
    }

    fn buffer_len(&self, buffer: BufferHandle) -> u64 {
        self.buffers[buffer.0 as usize].len
    }

    fn frame_count(&self) -> usize {
        self.ctx.target.frame_count()
    }

    fn record_transient(
        &mut self,
        queue: QueueKind,
        commands: &[Command],
    ) -> Result<CmdBuf> {
        let pool = match queue {
            QueueKind::Compute => self.compute_pool,
            QueueKind::Graphics => self.graphics_transient_pool,
        };
        self.record(None, commands, pool, true)
    }

    fn record_static(
        &mut self,
        queue: QueueKind,
        frame_index: usize,
        commands: &[Command],
    ) -> Result<CmdBuf> {
        if queue != QueueKind::Graphics {
            return Err(eyre!("Static frame commands belong on the graphics queue"));
        }
        if frame_index >= self.frame_count() {
            return Err(eyre!("Frame index {frame_index} out of range"));
        }
        self.record(Some(frame_index), commands, self.graphics_static_pool, false)
    }

    fn submit(&mut self, queue: QueueKind, commands: CmdBuf) -> Result<()> {
        let cmd_bufs = [self.cmd_bufs[commands.0 as usize]];
        let submit = vk::SubmitInfo::default().command_buffers(&cmd_bufs);
        unsafe {
            self.ctx.device.logical.queue_submit(
                self.queue_handle(queue),
                &[submit],
                vk::Fence::null(),
            )?;
        }
        Ok(())
    }

    fn wait_idle(&mut self, queue: QueueKind) -> Result<()> {
        unsafe {
            self.ctx.device.logical.queue_wait_idle(self.queue_handle(queue))?;
        }
        Ok(())
    }
}

impl Drop for VkBackend {
    fn drop(&mut self) {
        let device = &self.ctx.device.logical;
        unsafe {
            let _ = device.device_wait_idle();
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight, None);
            // Destroying the pools frees every command buffer with them.
            device.destroy_command_pool(self.compute_pool, None);
            device.destroy_command_pool(self.graphics_transient_pool, None);
            device.destroy_command_pool(self.graphics_static_pool, None);
        }
    }
}

fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
    flags: vk::CommandPoolCreateFlags,
) -> Result<vk::CommandPool> {
    let info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(flags);
    Ok(unsafe { device.create_command_pool(&info, None)? })
}

/// Access and stage masks for the two layout transitions the upload path
/// performs.
fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Result<(
    vk::AccessFlags,
    vk::AccessFlags,
    vk::PipelineStageFlags,
    vk::PipelineStageFlags,
)> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => Ok((
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        )),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Ok((
                vk::AccessFlags::TRANSFER_WRITE,
                vk::AccessFlags::SHADER_READ,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
            ))
        }
        _ => Err(eyre!(
            "Unsupported image layout transition {old_layout:?} -> {new_layout:?}"
        )),
    }
}
