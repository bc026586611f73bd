use color_eyre::Result;
use color_eyre::eyre::eyre;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::{BufferHandle, Command, PipelineHandle, QueueKind};

/// One-shot compute pass writing the image into a storage buffer.
pub struct ComputePass {
    pub pipeline: PipelineHandle,
    /// Storage buffer the shader writes, sized exactly
    /// `width * height * bytes_per_pixel`.
    pub target: BufferHandle,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl ComputePass {
    pub fn required_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.bytes_per_pixel as u64
    }
}

/// Records and submits the dispatch on the compute queue, then blocks
/// until it completes. There is nothing to display until the result
/// exists, so the host wait costs nothing. The size consistency check
/// runs before anything is recorded.
pub fn run<B: GpuBackend>(backend: &mut B, pass: &ComputePass) -> Result<()> {
    let required = pass.required_len();
    let declared = backend.buffer_len(pass.target);
    if required != declared {
        return Err(eyre!(
            "compute target is {declared} bytes but a {}x{} dispatch at \
             {} bytes/pixel needs {required}",
            pass.width,
            pass.height,
            pass.bytes_per_pixel,
        ));
    }

    let cmd = backend.record_transient(
        QueueKind::Compute,
        &[
            Command::BindComputePipeline { pipeline: pass.pipeline },
            Command::Dispatch { group_count: [pass.width, pass.height, 1] },
        ],
    )?;
    backend.submit(QueueKind::Compute, cmd)?;
    backend.wait_idle(QueueKind::Compute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::submit::mock::ScriptedGpu;

    fn full_hd_pass(target: BufferHandle) -> ComputePass {
        ComputePass {
            pipeline: PipelineHandle(0),
            target,
            width: 1920,
            height: 1080,
            bytes_per_pixel: 4,
        }
    }

    #[test]
    fn full_hd_domain_matches_its_buffer() {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let target = gpu.add_buffer(8_294_400);
        gpu.watch(target);

        run(&mut gpu, &full_hd_pass(target)).unwrap();

        assert!(gpu.violations.is_empty(), "{:?}", gpu.violations);
        assert_eq!(gpu.recordings.len(), 1);
        let recording = &gpu.recordings[0];
        assert_eq!(recording.queue, QueueKind::Compute);
        assert!(recording.submitted);
        assert_eq!(
            recording.commands,
            vec![
                Command::BindComputePipeline { pipeline: PipelineHandle(0) },
                Command::Dispatch { group_count: [1920, 1080, 1] },
            ],
        );
        assert_eq!(gpu.waits, vec![QueueKind::Compute]);
    }

    #[test]
    fn size_mismatch_fails_before_anything_records() {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let target = gpu.add_buffer(8_294_400 - 4);
        gpu.watch(target);

        let err = run(&mut gpu, &full_hd_pass(target)).unwrap_err();
        assert!(err.to_string().contains("8294400"));
        assert!(gpu.recordings.is_empty());
        assert!(gpu.waits.is_empty());
    }

    #[test]
    fn required_len_multiplies_out_without_overflow() {
        let pass = ComputePass {
            pipeline: PipelineHandle(0),
            target: BufferHandle(0),
            width: 1920,
            height: 1080,
            bytes_per_pixel: 4,
        };
        assert_eq!(pass.required_len(), 8_294_400);
    }
}
