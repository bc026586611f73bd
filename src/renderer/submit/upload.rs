use ash::vk;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::{BufferHandle, Command, ImageHandle, QueueKind};

/// Copies a region of the compute result into a sampled 2D image. The
/// region may cover less of the source buffer than the compute pass
/// produced.
pub struct TextureUpload {
    pub src: BufferHandle,
    pub dst: ImageHandle,
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl TextureUpload {
    pub fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.bytes_per_pixel as u64
    }
}

/// One transient graphics-queue submission: transition the image for
/// transfer, copy the region, transition to shader-readable. Waited to
/// completion; nothing else may touch the texture until it is.
pub fn run<B: GpuBackend>(backend: &mut B, upload: &TextureUpload) -> Result<()> {
    let available = backend.buffer_len(upload.src);
    let needed = upload.byte_len();
    if needed > available {
        return Err(eyre!(
            "upload region of {needed} bytes exceeds the {available}-byte \
             source buffer"
        ));
    }

    let cmd = backend.record_transient(
        QueueKind::Graphics,
        &[
            Command::TransitionImage {
                image: upload.dst,
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            },
            Command::CopyBufferToImage {
                src: upload.src,
                dst: upload.dst,
                width: upload.width,
                height: upload.height,
            },
            Command::TransitionImage {
                image: upload.dst,
                old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
        ],
    )?;
    backend.submit(QueueKind::Graphics, cmd)?;
    backend.wait_idle(QueueKind::Graphics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::submit::mock::ScriptedGpu;

    #[test]
    fn sub_region_of_the_compute_output_is_accepted() {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let src = gpu.add_buffer(8_294_400);

        let upload = TextureUpload {
            src,
            dst: ImageHandle(0),
            width: 32,
            height: 32,
            bytes_per_pixel: 4,
        };
        assert_eq!(upload.byte_len(), 4_096);
        run(&mut gpu, &upload).unwrap();

        assert_eq!(gpu.recordings.len(), 1);
        let recording = &gpu.recordings[0];
        assert_eq!(recording.queue, QueueKind::Graphics);
        assert!(recording.submitted);
        assert_eq!(
            recording.commands,
            vec![
                Command::TransitionImage {
                    image: ImageHandle(0),
                    old_layout: vk::ImageLayout::UNDEFINED,
                    new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                },
                Command::CopyBufferToImage {
                    src,
                    dst: ImageHandle(0),
                    width: 32,
                    height: 32,
                },
                Command::TransitionImage {
                    image: ImageHandle(0),
                    old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                },
            ],
        );
        assert_eq!(gpu.waits, vec![QueueKind::Graphics]);
    }

    #[test]
    fn oversized_region_is_rejected_before_recording() {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let src = gpu.add_buffer(4_096);

        let upload = TextureUpload {
            src,
            dst: ImageHandle(0),
            width: 64,
            height: 64,
            bytes_per_pixel: 4,
        };
        assert!(run(&mut gpu, &upload).is_err());
        assert!(gpu.recordings.is_empty());
    }

    #[test]
    fn full_buffer_region_is_accepted() {
        let mut gpu = ScriptedGpu::new(2, 0, 3);
        let src = gpu.add_buffer(4_096);

        let upload = TextureUpload {
            src,
            dst: ImageHandle(0),
            width: 32,
            height: 32,
            bytes_per_pixel: 4,
        };
        run(&mut gpu, &upload).unwrap();
        assert_eq!(gpu.recordings.len(), 1);
    }
}
