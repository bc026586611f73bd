use ash::vk;

/// The two execution contexts work is submitted to. Each maps to one
/// hardware queue with its own family index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Compute,
    Graphics,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u32);

/// A recorded command buffer, referenced by handle once recording ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CmdBuf(pub u32);

/// A memory barrier over a whole buffer, carrying the queue-family
/// ownership-transfer fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferBarrier {
    pub buffer: BufferHandle,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

impl BufferBarrier {
    /// Release half of an ownership transfer, recorded on the releasing
    /// (compute) queue. Hands off the shader write just performed; the
    /// destination access mask stays empty on the release side.
    pub fn release(
        buffer: BufferHandle,
        src_queue_family: u32,
        dst_queue_family: u32,
    ) -> Self {
        Self {
            buffer,
            src_access: vk::AccessFlags::SHADER_WRITE,
            dst_access: vk::AccessFlags::empty(),
            src_queue_family,
            dst_queue_family,
            src_stage: vk::PipelineStageFlags::COMPUTE_SHADER,
            dst_stage: vk::PipelineStageFlags::ALL_GRAPHICS,
        }
    }

    /// Acquire half, recorded on the receiving (graphics) queue. Mirrors
    /// the release: empty source access, the shader read about to happen
    /// on the destination side, same family pair and stage range.
    pub fn acquire(
        buffer: BufferHandle,
        src_queue_family: u32,
        dst_queue_family: u32,
    ) -> Self {
        Self {
            buffer,
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::SHADER_READ,
            src_queue_family,
            dst_queue_family,
            src_stage: vk::PipelineStageFlags::COMPUTE_SHADER,
            dst_stage: vk::PipelineStageFlags::ALL_GRAPHICS,
        }
    }

    pub fn transfers_ownership(&self) -> bool {
        self.src_queue_family != self.dst_queue_family
    }

    pub fn is_release(&self) -> bool {
        self.transfers_ownership()
            && !self.src_access.is_empty()
            && self.dst_access.is_empty()
    }

    pub fn is_acquire(&self) -> bool {
        self.transfers_ownership()
            && self.src_access.is_empty()
            && !self.dst_access.is_empty()
    }

    /// Whether `acquire` is the matching second half of this release:
    /// same buffer, same family pair, same stage range.
    pub fn pairs_with(&self, acquire: &BufferBarrier) -> bool {
        self.is_release()
            && acquire.is_acquire()
            && self.buffer == acquire.buffer
            && self.src_queue_family == acquire.src_queue_family
            && self.dst_queue_family == acquire.dst_queue_family
            && self.src_stage == acquire.src_stage
            && self.dst_stage == acquire.dst_stage
    }
}

/// One recorded GPU operation. A command buffer is a linear, replayable
/// sequence of these; the backend decides how each one lands on the
/// device.
///
/// Descriptor binding is folded into the pipeline bind: every pipeline
/// owns exactly one descriptor set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    BindComputePipeline {
        pipeline: PipelineHandle,
    },
    Dispatch {
        group_count: [u32; 3],
    },
    BufferBarrier(BufferBarrier),
    TransitionImage {
        image: ImageHandle,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    },
    CopyBufferToImage {
        src: BufferHandle,
        dst: ImageHandle,
        width: u32,
        height: u32,
    },
    BeginRenderPass {
        clear_color: [f32; 4],
        clear_depth: f32,
        clear_stencil: u32,
    },
    BindGraphicsPipeline {
        pipeline: PipelineHandle,
    },
    BindVertexBuffer {
        buffer: BufferHandle,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    EndRenderPass,
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT: BufferHandle = BufferHandle(0);

    #[test]
    fn release_hands_off_the_shader_write() {
        let release = BufferBarrier::release(RESULT, 2, 0);
        assert_eq!(release.src_access, vk::AccessFlags::SHADER_WRITE);
        assert_eq!(release.dst_access, vk::AccessFlags::empty());
        assert_eq!(release.src_queue_family, 2);
        assert_eq!(release.dst_queue_family, 0);
        assert_eq!(release.src_stage, vk::PipelineStageFlags::COMPUTE_SHADER);
        assert_eq!(release.dst_stage, vk::PipelineStageFlags::ALL_GRAPHICS);
        assert!(release.is_release());
        assert!(!release.is_acquire());
    }

    #[test]
    fn acquire_mirrors_the_release() {
        let acquire = BufferBarrier::acquire(RESULT, 2, 0);
        assert_eq!(acquire.src_access, vk::AccessFlags::empty());
        assert_eq!(acquire.dst_access, vk::AccessFlags::SHADER_READ);
        assert_eq!(acquire.src_queue_family, 2);
        assert_eq!(acquire.dst_queue_family, 0);
        assert_eq!(acquire.src_stage, vk::PipelineStageFlags::COMPUTE_SHADER);
        assert_eq!(acquire.dst_stage, vk::PipelineStageFlags::ALL_GRAPHICS);
        assert!(acquire.is_acquire());
        assert!(!acquire.is_release());
    }

    #[test]
    fn matching_halves_pair_up() {
        let release = BufferBarrier::release(RESULT, 2, 0);
        let acquire = BufferBarrier::acquire(RESULT, 2, 0);
        assert!(release.pairs_with(&acquire));
    }

    #[test]
    fn different_buffers_do_not_pair() {
        let release = BufferBarrier::release(RESULT, 2, 0);
        let acquire = BufferBarrier::acquire(BufferHandle(1), 2, 0);
        assert!(!release.pairs_with(&acquire));
    }

    #[test]
    fn swapped_families_do_not_pair() {
        let release = BufferBarrier::release(RESULT, 2, 0);
        let acquire = BufferBarrier::acquire(RESULT, 0, 2);
        assert!(!release.pairs_with(&acquire));
    }

    #[test]
    fn two_releases_do_not_pair() {
        let release = BufferBarrier::release(RESULT, 2, 0);
        let duplicate = release;
        assert!(!release.pairs_with(&duplicate));
    }

    #[test]
    fn same_family_barrier_is_neither_half() {
        let mut barrier = BufferBarrier::release(RESULT, 1, 1);
        assert!(!barrier.is_release());
        barrier.dst_access = vk::AccessFlags::SHADER_READ;
        barrier.src_access = vk::AccessFlags::empty();
        assert!(!barrier.is_acquire());
    }
}
