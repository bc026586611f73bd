use color_eyre::Result;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::{BufferBarrier, BufferHandle, Command, QueueKind};

/// Moves ownership of `buffer` from the compute family to the graphics
/// family: a release barrier submitted on the compute queue, the compute
/// queue drained to idle, then the matching acquire submitted on the
/// graphics queue. An acquire with no drained release leaves visibility
/// undefined, so the order here is load-bearing.
pub fn transfer_to_graphics<B: GpuBackend>(
    backend: &mut B,
    buffer: BufferHandle,
) -> Result<()> {
    let src_family = backend.queue_family(QueueKind::Compute);
    let dst_family = backend.queue_family(QueueKind::Graphics);

    let release = BufferBarrier::release(buffer, src_family, dst_family);
    let cmd = backend
        .record_transient(QueueKind::Compute, &[Command::BufferBarrier(release)])?;
    backend.submit(QueueKind::Compute, cmd)?;
    // The acquire may only be submitted once the release has fully drained.
    backend.wait_idle(QueueKind::Compute)?;

    let acquire = BufferBarrier::acquire(buffer, src_family, dst_family);
    let cmd = backend
        .record_transient(QueueKind::Graphics, &[Command::BufferBarrier(acquire)])?;
    backend.submit(QueueKind::Graphics, cmd)
    // No host wait after the acquire: later graphics submissions queue up
    // behind it in submission order.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::commands::{ImageHandle, PipelineHandle};
    use crate::renderer::submit::dispatch::{self, ComputePass};
    use crate::renderer::submit::mock::ScriptedGpu;

    fn dispatched_gpu() -> (ScriptedGpu, BufferHandle) {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let target = gpu.add_buffer(8_294_400);
        gpu.watch(target);
        dispatch::run(
            &mut gpu,
            &ComputePass {
                pipeline: PipelineHandle(0),
                target,
                width: 1920,
                height: 1080,
                bytes_per_pixel: 4,
            },
        )
        .unwrap();
        (gpu, target)
    }

    #[test]
    fn release_then_acquire_passes_the_scripted_backend() {
        let (mut gpu, target) = dispatched_gpu();
        transfer_to_graphics(&mut gpu, target).unwrap();

        assert!(gpu.violations.is_empty(), "{:?}", gpu.violations);
        gpu.check_barrier_pairing().unwrap();

        // Release on compute, drained, then acquire on graphics.
        assert_eq!(gpu.releases.len(), 1);
        assert_eq!(gpu.acquires.len(), 1);
        assert_eq!(gpu.releases[0].src_queue_family, 2);
        assert_eq!(gpu.releases[0].dst_queue_family, 0);
        assert_eq!(gpu.waits, vec![QueueKind::Compute, QueueKind::Compute]);
    }

    #[test]
    fn acquire_without_release_is_rejected() {
        let (mut gpu, target) = dispatched_gpu();
        let acquire = BufferBarrier::acquire(target, 2, 0);
        let cmd = gpu
            .record_transient(QueueKind::Graphics, &[Command::BufferBarrier(acquire)])
            .unwrap();
        gpu.submit(QueueKind::Graphics, cmd).unwrap();

        assert!(!gpu.violations.is_empty());
        assert!(gpu.check_barrier_pairing().is_err());
    }

    #[test]
    fn release_without_acquire_is_rejected() {
        let (mut gpu, target) = dispatched_gpu();
        let release = BufferBarrier::release(target, 2, 0);
        let cmd = gpu
            .record_transient(QueueKind::Compute, &[Command::BufferBarrier(release)])
            .unwrap();
        gpu.submit(QueueKind::Compute, cmd).unwrap();
        gpu.wait_idle(QueueKind::Compute).unwrap();

        assert!(gpu.check_barrier_pairing().is_err());
    }

    #[test]
    fn graphics_read_before_the_transfer_is_flagged() {
        let (mut gpu, target) = dispatched_gpu();
        let cmd = gpu
            .record_transient(
                QueueKind::Graphics,
                &[Command::CopyBufferToImage {
                    src: target,
                    dst: ImageHandle(0),
                    width: 32,
                    height: 32,
                }],
            )
            .unwrap();
        gpu.submit(QueueKind::Graphics, cmd).unwrap();

        assert!(
            gpu.violations
                .iter()
                .any(|v| v.contains("before the release/acquire pair")),
            "{:?}",
            gpu.violations,
        );
    }

    #[test]
    fn graphics_read_after_the_transfer_is_clean() {
        let (mut gpu, target) = dispatched_gpu();
        transfer_to_graphics(&mut gpu, target).unwrap();
        let cmd = gpu
            .record_transient(
                QueueKind::Graphics,
                &[Command::CopyBufferToImage {
                    src: target,
                    dst: ImageHandle(0),
                    width: 32,
                    height: 32,
                }],
            )
            .unwrap();
        gpu.submit(QueueKind::Graphics, cmd).unwrap();

        assert!(gpu.violations.is_empty(), "{:?}", gpu.violations);
    }

    #[test]
    fn release_before_the_dispatch_completed_is_flagged() {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let target = gpu.add_buffer(8_294_400);
        gpu.watch(target);

        // Skip the dispatch entirely; the release shows up unannounced.
        transfer_to_graphics(&mut gpu, target).unwrap();
        assert!(
            gpu.violations
                .iter()
                .any(|v| v.contains("before the dispatch completed")),
            "{:?}",
            gpu.violations,
        );
    }
}
