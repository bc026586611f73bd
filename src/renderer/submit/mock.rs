//! Scripted stand-in for the Vulkan translation. Records every command
//! stream instead of executing it and validates the ownership-transfer
//! discipline as it goes; violations accumulate for the test to assert
//! on rather than panicking mid-run.

use color_eyre::Result;
use color_eyre::eyre::eyre;
use crate::renderer::backend::GpuBackend;
use crate::renderer::commands::{
    BufferBarrier, BufferHandle, CmdBuf, Command, QueueKind,
};

/// One recorded command stream, transient or static.
pub struct Recording {
    pub queue: QueueKind,
    pub frame_index: Option<usize>,
    pub commands: Vec<Command>,
    pub submitted: bool,
}

/// Progress of the watched buffer through dispatch and handoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum TransferPhase {
    Untouched,
    DispatchRecorded,
    DispatchSubmitted,
    DispatchComplete,
    ReleaseRecorded,
    ReleaseSubmitted,
    ReleaseComplete,
    AcquireRecorded,
    AcquireSubmitted,
}

pub struct ScriptedGpu {
    compute_family: u32,
    graphics_family: u32,
    frame_count: usize,
    buffers: Vec<u64>,
    watched: Option<BufferHandle>,
    phase: TransferPhase,
    release: Option<BufferBarrier>,
    pub releases: Vec<BufferBarrier>,
    pub acquires: Vec<BufferBarrier>,
    pub recordings: Vec<Recording>,
    pub waits: Vec<QueueKind>,
    pub violations: Vec<String>,
}

impl ScriptedGpu {
    pub fn new(compute_family: u32, graphics_family: u32, frame_count: usize) -> Self {
        Self {
            compute_family,
            graphics_family,
            frame_count,
            buffers: Vec::new(),
            watched: None,
            phase: TransferPhase::Untouched,
            release: None,
            releases: Vec::new(),
            acquires: Vec::new(),
            recordings: Vec::new(),
            waits: Vec::new(),
            violations: Vec::new(),
        }
    }

    pub fn add_buffer(&mut self, len: u64) -> BufferHandle {
        self.buffers.push(len);
        BufferHandle(self.buffers.len() as u32 - 1)
    }

    /// Watch `buffer` as the compute-written resource whose ownership
    /// transfer is being checked.
    pub fn watch(&mut self, buffer: BufferHandle) {
        self.watched = Some(buffer);
    }

    /// Pairing check over the whole run: every release must have exactly
    /// one matching acquire and vice versa.
    pub fn check_barrier_pairing(&self) -> Result<()> {
        for release in &self.releases {
            let matches = self
                .acquires
                .iter()
                .filter(|acquire| release.pairs_with(acquire))
                .count();
            if matches != 1 {
                return Err(eyre!(
                    "release on {:?} has {matches} matching acquires",
                    release.buffer
                ));
            }
        }
        for acquire in &self.acquires {
            let matches = self
                .releases
                .iter()
                .filter(|release| release.pairs_with(acquire))
                .count();
            if matches != 1 {
                return Err(eyre!(
                    "acquire on {:?} has {matches} matching releases",
                    acquire.buffer
                ));
            }
        }
        Ok(())
    }

    fn flag(&mut self, message: impl Into<String>) {
        self.violations.push(message.into());
    }

    fn is_watched(&self, buffer: BufferHandle) -> bool {
        self.watched == Some(buffer)
    }

    /// A graphics-queue command is about to read `buffer`; only legal once
    /// both halves of the transfer have been recorded.
    fn check_graphics_read(&mut self, buffer: BufferHandle) {
        if self.is_watched(buffer) && self.phase < TransferPhase::AcquireRecorded {
            self.flag(
                "graphics-queue read of the shared buffer recorded before \
                 the release/acquire pair",
            );
        }
    }

    fn observe(&mut self, queue: QueueKind, command: &Command) {
        match command {
            Command::Dispatch { .. } => {
                if queue != QueueKind::Compute {
                    self.flag("dispatch recorded off the compute queue");
                }
                if self.phase == TransferPhase::Untouched {
                    self.phase = TransferPhase::DispatchRecorded;
                }
            }
            Command::BufferBarrier(barrier) if barrier.transfers_ownership() => {
                self.observe_transfer_barrier(queue, *barrier);
            }
            Command::CopyBufferToImage { src, .. } => {
                if queue == QueueKind::Graphics {
                    self.check_graphics_read(*src);
                }
            }
            Command::BindVertexBuffer { buffer } => {
                if queue == QueueKind::Graphics {
                    self.check_graphics_read(*buffer);
                }
            }
            _ => {}
        }
    }

    fn observe_transfer_barrier(&mut self, queue: QueueKind, barrier: BufferBarrier) {
        if barrier.is_release() {
            self.releases.push(barrier);
            if queue != QueueKind::Compute {
                self.flag("release barrier recorded off the compute queue");
            }
            if barrier.src_queue_family != self.compute_family
                || barrier.dst_queue_family != self.graphics_family
            {
                self.flag("release barrier carries the wrong family pair");
            }
            if self.is_watched(barrier.buffer) {
                if self.phase != TransferPhase::DispatchComplete {
                    self.flag("release recorded before the dispatch completed");
                }
                self.phase = TransferPhase::ReleaseRecorded;
                self.release = Some(barrier);
            }
        } else if barrier.is_acquire() {
            self.acquires.push(barrier);
            if queue != QueueKind::Graphics {
                self.flag("acquire barrier recorded off the graphics queue");
            }
            if self.is_watched(barrier.buffer) {
                match self.release {
                    Some(release) if release.pairs_with(&barrier) => {}
                    _ => self.flag("acquire does not match any recorded release"),
                }
                if self.phase != TransferPhase::ReleaseComplete {
                    self.flag("acquire recorded before the release drained");
                }
                self.phase = TransferPhase::AcquireRecorded;
            }
        } else {
            self.flag("ownership barrier with both access masks populated");
        }
    }

    fn phase_after_submit(&mut self, index: usize) {
        let watched = match self.watched {
            Some(watched) => watched,
            None => return,
        };
        let commands = &self.recordings[index].commands;
        let touches_watched_barrier = |want_release: bool| {
            commands.iter().any(|command| match command {
                Command::BufferBarrier(b) if b.buffer == watched => {
                    if want_release { b.is_release() } else { b.is_acquire() }
                }
                _ => false,
            })
        };

        if commands.iter().any(|c| matches!(c, Command::Dispatch { .. }))
            && self.phase == TransferPhase::DispatchRecorded
        {
            self.phase = TransferPhase::DispatchSubmitted;
        }
        if touches_watched_barrier(true) && self.phase == TransferPhase::ReleaseRecorded {
            self.phase = TransferPhase::ReleaseSubmitted;
        }
        if touches_watched_barrier(false) && self.phase == TransferPhase::AcquireRecorded {
            self.phase = TransferPhase::AcquireSubmitted;
        }
    }
}

impl GpuBackend for ScriptedGpu {
    fn queue_family(&self, queue: QueueKind) -> u32 {
        match queue {
            QueueKind::Compute => self.compute_family,
            QueueKind::Graphics => self.graphics_family,
        }
    }

    fn buffer_len(&self, buffer: BufferHandle) -> u64 {
        self.buffers[buffer.0 as usize]
    }

    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn record_transient(
        &mut self,
        queue: QueueKind,
        commands: &[Command],
    ) -> Result<CmdBuf> {
        for command in commands {
            self.observe(queue, command);
        }
        self.recordings.push(Recording {
            queue,
            frame_index: None,
            commands: commands.to_vec(),
            submitted: false,
        });
        Ok(CmdBuf(self.recordings.len() as u32 - 1))
    }

    fn record_static(
        &mut self,
        queue: QueueKind,
        frame_index: usize,
        commands: &[Command],
    ) -> Result<CmdBuf> {
        if frame_index >= self.frame_count {
            return Err(eyre!("frame index {frame_index} out of range"));
        }
        for command in commands {
            self.observe(queue, command);
        }
        self.recordings.push(Recording {
            queue,
            frame_index: Some(frame_index),
            commands: commands.to_vec(),
            submitted: false,
        });
        Ok(CmdBuf(self.recordings.len() as u32 - 1))
    }

    fn submit(&mut self, queue: QueueKind, commands: CmdBuf) -> Result<()> {
        let index = commands.0 as usize;
        if self.recordings[index].queue != queue {
            self.flag("command buffer submitted to a queue it was not recorded for");
        }
        self.recordings[index].submitted = true;
        self.phase_after_submit(index);
        Ok(())
    }

    fn wait_idle(&mut self, queue: QueueKind) -> Result<()> {
        self.waits.push(queue);
        match queue {
            QueueKind::Compute => {
                if self.phase == TransferPhase::DispatchSubmitted {
                    self.phase = TransferPhase::DispatchComplete;
                }
                if self.phase == TransferPhase::ReleaseSubmitted {
                    self.phase = TransferPhase::ReleaseComplete;
                }
            }
            QueueKind::Graphics => {}
        }
        Ok(())
    }
}
