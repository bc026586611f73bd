use color_eyre::Result;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::{BufferHandle, CmdBuf, Command, PipelineHandle, QueueKind};

/// Static draw work recorded once per swapchain image and resubmitted
/// unmodified every frame. The scene never changes, so nothing records
/// again after startup.
pub struct FramePlan {
    pub pipeline: PipelineHandle,
    pub vertex_buffer: BufferHandle,
    pub vertex_count: u32,
    pub clear_color: [f32; 4],
}

/// Records one command buffer per swapchain image, all identical except
/// for the framebuffer they target. Returned in swapchain-image order.
pub fn record_all<B: GpuBackend>(backend: &mut B, plan: &FramePlan) -> Result<Vec<CmdBuf>> {
    (0..backend.frame_count())
        .map(|frame_index| record_one(backend, plan, frame_index))
        .collect()
}

fn record_one<B: GpuBackend>(
    backend: &mut B,
    plan: &FramePlan,
    frame_index: usize,
) -> Result<CmdBuf> {
    backend.record_static(
        QueueKind::Graphics,
        frame_index,
        &[
            // Two clear values: color first, then depth/stencil {1.0, 0};
            // the render pass attachment order fixes this.
            Command::BeginRenderPass {
                clear_color: plan.clear_color,
                clear_depth: 1.0,
                clear_stencil: 0,
            },
            Command::BindGraphicsPipeline { pipeline: plan.pipeline },
            Command::BindVertexBuffer { buffer: plan.vertex_buffer },
            Command::Draw { vertex_count: plan.vertex_count, instance_count: 1 },
            Command::EndRenderPass,
        ],
    )
}
