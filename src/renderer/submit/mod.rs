//! One-shot startup submission sequence: compute dispatch, ownership
//! handoff of the result buffer to the graphics queue, texture upload,
//! and recording of the static per-frame draw work. Everything here runs
//! against the backend interface so the whole sequence can be replayed
//! on a scripted backend.

mod dispatch;
mod frames;
mod handoff;
#[cfg(test)]
mod mock;
mod upload;

pub use dispatch::ComputePass;
pub use frames::FramePlan;
pub use upload::TextureUpload;

use color_eyre::Result;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::CmdBuf;

/// Everything the startup sequence needs, gathered once the factory has
/// created the pipelines and resources.
pub struct StartupPlan {
    pub compute: ComputePass,
    pub upload: TextureUpload,
    pub frame: FramePlan,
}

/// Runs the full startup sequence in order. Returns the recorded frame
/// command buffers in swapchain-image order; these are what the steady
/// state resubmits every tick.
pub fn run_startup<B: GpuBackend>(
    backend: &mut B,
    plan: &StartupPlan,
) -> Result<Vec<CmdBuf>> {
    dispatch::run(backend, &plan.compute)?;
    log::info!(
        "compute result ready ({}x{})",
        plan.compute.width,
        plan.compute.height,
    );

    handoff::transfer_to_graphics(backend, plan.compute.target)?;

    upload::run(backend, &plan.upload)?;
    log::info!(
        "uploaded {}x{} texture region",
        plan.upload.width,
        plan.upload.height,
    );

    let frame_cmds = frames::record_all(backend, &plan.frame)?;
    log::info!("recorded {} static frame command buffers", frame_cmds.len());
    Ok(frame_cmds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::commands::{ImageHandle, PipelineHandle, QueueKind};
    use crate::renderer::submit::mock::ScriptedGpu;

    fn startup_plan(gpu: &mut ScriptedGpu) -> StartupPlan {
        let result = gpu.add_buffer(8_294_400);
        let quad = gpu.add_buffer(120);
        gpu.watch(result);
        StartupPlan {
            compute: ComputePass {
                pipeline: PipelineHandle(0),
                target: result,
                width: 1920,
                height: 1080,
                bytes_per_pixel: 4,
            },
            upload: TextureUpload {
                src: result,
                dst: ImageHandle(0),
                width: 32,
                height: 32,
                bytes_per_pixel: 4,
            },
            frame: FramePlan {
                pipeline: PipelineHandle(1),
                vertex_buffer: quad,
                vertex_count: 6,
                clear_color: [0.0; 4],
            },
        }
    }

    #[test]
    fn the_whole_startup_sequence_is_clean() {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let plan = startup_plan(&mut gpu);

        let frame_cmds = run_startup(&mut gpu, &plan).unwrap();

        assert_eq!(frame_cmds.len(), 3);
        assert!(gpu.violations.is_empty(), "{:?}", gpu.violations);
        gpu.check_barrier_pairing().unwrap();
    }

    #[test]
    fn startup_stages_submit_in_protocol_order() {
        let mut gpu = ScriptedGpu::new(2, 0, 2);
        let plan = startup_plan(&mut gpu);
        run_startup(&mut gpu, &plan).unwrap();

        // Transient work: dispatch and release on compute, then acquire
        // and upload on graphics, then the static frame recordings.
        let queues: Vec<_> = gpu.recordings.iter().map(|r| r.queue).collect();
        assert_eq!(
            queues,
            vec![
                QueueKind::Compute,
                QueueKind::Compute,
                QueueKind::Graphics,
                QueueKind::Graphics,
                QueueKind::Graphics,
                QueueKind::Graphics,
            ],
        );
        // Dispatch drained, release drained, upload drained.
        assert_eq!(
            gpu.waits,
            vec![QueueKind::Compute, QueueKind::Compute, QueueKind::Graphics],
        );
    }
}
