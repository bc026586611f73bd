use color_eyre::Result;
use crate::renderer::commands::{BufferHandle, CmdBuf, Command, QueueKind};

/// Recording and submission surface the startup stages drive. The
/// production implementation translates the command stream onto Vulkan;
/// tests substitute a scripted implementation that checks the stream
/// instead of executing it.
pub trait GpuBackend {
    /// Family index of the hardware queue behind `queue`. The two kinds
    /// map to distinct families.
    fn queue_family(&self, queue: QueueKind) -> u32;

    /// Declared byte size of a factory-created buffer.
    fn buffer_len(&self, buffer: BufferHandle) -> u64;

    /// Number of swapchain images, and therefore of static frame command
    /// buffers to record.
    fn frame_count(&self) -> usize;

    /// Record a one-shot command buffer for `queue`; it is retired after
    /// its single submission.
    fn record_transient(
        &mut self,
        queue: QueueKind,
        commands: &[Command],
    ) -> Result<CmdBuf>;

    /// Record the long-lived command buffer replayed every frame for
    /// swapchain image `frame_index`.
    fn record_static(
        &mut self,
        queue: QueueKind,
        frame_index: usize,
        commands: &[Command],
    ) -> Result<CmdBuf>;

    fn submit(&mut self, queue: QueueKind, commands: CmdBuf) -> Result<()>;

    /// Block until `queue` has drained every command buffer submitted to
    /// it. The wait is unbounded.
    fn wait_idle(&mut self, queue: QueueKind) -> Result<()>;
}
