use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::adaptive::DEFAULT_OP_THRESHOLD;
use crate::buffer::{Buffer, BufferFence, EncodedOp};
use crate::device::DeviceQueue;
use crate::error::StreamError;
use crate::events::SubmitEvent;
use crate::policy::{self, Action, SubmissionPolicy, SubmitReason};
use crate::pressure::PressureMonitor;

/// Construction-time knobs for a stream.
pub struct StreamOptions {
    /// Op-count bound for the adaptive trigger. Must be positive; 1
    /// degenerates to submitting after every op.
    pub op_threshold: u32,
    /// Keep submitted buffer identities stable for external capture
    /// tooling: pipelined submissions turn into flushes.
    pub capture_mode: bool,
    /// Receives one event per actual device submission.
    pub submit_events: Option<Sender<SubmitEvent>>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            op_threshold: DEFAULT_OP_THRESHOLD,
            capture_mode: false,
            submit_events: None,
        }
    }
}

/// A single-producer command stream over one device queue.
///
/// Callers encode one op at a time and follow each with
/// [`synchronize`](Self::synchronize); the stream decides when the open
/// buffer is handed to the device so CPU encoding overlaps device
/// execution. Calls take `&mut self`: encode order is submission order,
/// and serializing concurrent producers is the caller's job.
pub struct CommandStream {
    queue: Box<dyn DeviceQueue>,
    pressure: Arc<dyn PressureMonitor>,
    options: StreamOptions,
    current: Option<Buffer>,
    pending_ops: u32,
    next_buffer_id: u64,
    last_submitted: Option<Arc<BufferFence>>,
}

impl CommandStream {
    /// Panics if `options.op_threshold` is zero.
    pub fn new(
        queue: Box<dyn DeviceQueue>,
        pressure: Arc<dyn PressureMonitor>,
        options: StreamOptions,
    ) -> Self {
        assert!(options.op_threshold > 0, "op threshold must be positive");
        Self {
            queue,
            pressure,
            options,
            current: Some(Buffer::open(0)),
            pending_ops: 0,
            next_buffer_id: 1,
            last_submitted: None,
        }
    }

    /// Ops counted since the last submission.
    pub fn pending_ops(&self) -> u32 {
        self.pending_ops
    }

    /// Sequence number of the buffer currently open for encoding. `None`
    /// right after a flush or a failed submission.
    pub fn current_buffer_id(&self) -> Option<u64> {
        self.current.as_ref().map(Buffer::id)
    }

    /// Appends an op to the current buffer. If the previous buffer left
    /// with a flush or was lost to a submission failure, a fresh one is
    /// opened first and the pending count restarts with it.
    pub fn encode(&mut self, op: EncodedOp) {
        if self.current.is_none() {
            // Fresh epoch; stale counts from a lost buffer must not leak
            // into it.
            self.pending_ops = 0;
            self.current = Some(self.open_buffer());
        }
        if let Some(buffer) = self.current.as_mut() {
            buffer.append(op);
        }
    }

    /// The per-op decision point. Counts the op (unless `NoAction`),
    /// resolves the policy against a fresh pressure reading, and applies
    /// the resulting action.
    pub fn synchronize(&mut self, policy: SubmissionPolicy) -> Result<(), StreamError> {
        if policy != SubmissionPolicy::NoAction {
            // Counted before the policy is evaluated, so the op that
            // reaches the threshold rides in the buffer it triggers.
            self.pending_ops += 1;
        }

        #[cfg(feature = "tracing")]
        tracy_client::plot!("pending ops", f64::from(self.pending_ops));

        let action = policy::resolve(
            policy,
            self.pending_ops,
            self.pressure.pressure_level(),
            self.options.op_threshold,
            self.options.capture_mode,
        );
        self.apply(action)
    }

    /// Unconditional pipelined submission.
    pub fn commit(&mut self) -> Result<(), StreamError> {
        self.apply(policy::continue_or_flush(
            SubmitReason::Explicit,
            self.options.capture_mode,
        ))
    }

    /// Submits and blocks until the submitted buffer completes. With
    /// nothing left to submit this still waits out the most recently
    /// submitted buffer, which by queue FIFO covers everything before it.
    pub fn commit_and_wait(&mut self) -> Result<(), StreamError> {
        self.apply(Action::SubmitAndWait)
    }

    /// Submits the current buffer without opening a replacement, so its
    /// identity survives for a following explicit wait or capture.
    pub fn flush(&mut self) -> Result<(), StreamError> {
        self.apply(Action::Flush(SubmitReason::Explicit))
    }

    fn apply(&mut self, action: Action) -> Result<(), StreamError> {
        match action {
            Action::Defer => Ok(()),
            Action::SubmitAndContinue(reason) => self.submit_current(reason, true).map(|_| ()),
            Action::Flush(reason) => self.submit_current(reason, false).map(|_| ()),
            Action::SubmitAndWait => {
                let fence = self
                    .submit_current(SubmitReason::Explicit, true)?
                    .or_else(|| self.last_submitted.clone());
                match fence {
                    Some(fence) => {
                        #[cfg(feature = "tracing")]
                        let _span = tracy_client::span!("wait_until_completed");
                        fence.wait()
                    }
                    // Nothing was ever submitted.
                    None => Ok(()),
                }
            }
        }
    }

    /// Seals and hands the current buffer to the device. Returns the
    /// fence of the submitted buffer, or `None` when there was nothing to
    /// submit (an empty buffer never reaches the device, and no event
    /// fires for it). The pending count resets either way.
    fn submit_current(
        &mut self,
        reason: SubmitReason,
        open_replacement: bool,
    ) -> Result<Option<Arc<BufferFence>>, StreamError> {
        let buffer = match self.current.take() {
            Some(buffer) if !buffer.is_empty() => buffer,
            keep => {
                // Nothing to hand over; an empty buffer stays current.
                self.current = keep;
                self.pending_ops = 0;
                return Ok(None);
            }
        };

        let id = buffer.id();
        let ops = buffer.op_count();
        let fence = buffer.fence().clone();

        #[cfg(feature = "tracing")]
        let _span = tracy_client::span!("submit_buffer");

        if let Err(source) = self.queue.submit(buffer.seal()) {
            // The buffer and its ops are lost with the failed submission.
            // No replacement is opened and the counter stays put; the next
            // encode establishes a fresh epoch.
            fence.fail(source.to_string());
            return Err(StreamError::Submission { buffer: id, source });
        }

        if open_replacement {
            self.current = Some(self.open_buffer());
        }
        self.pending_ops = 0;
        self.last_submitted = Some(fence.clone());

        log::trace!("Stream: submitted buffer {} ({} ops, {:?})", id, ops, reason);
        if let Some(events) = &self.options.submit_events {
            let _ = events.send(SubmitEvent {
                buffer: id,
                reason,
                ops,
            });
        }

        Ok(Some(fence))
    }

    fn open_buffer(&mut self) -> Buffer {
        let id = self.next_buffer_id;
        self.next_buffer_id += 1;
        Buffer::open(id)
    }
}
