use std::sync::{Arc, Condvar, Mutex};

use smallvec::SmallVec;

use crate::device::SubmittedBuffer;
use crate::error::StreamError;

/// An encoded operation, opaque to the scheduler. The debug name only
/// shows up in logs and capture tooling.
#[derive(Debug, Clone, Default)]
pub struct EncodedOp {
    debug_name: Option<String>,
}

impl EncodedOp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            debug_name: Some(name.into()),
        }
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }
}

/// Lifecycle of one buffer. Open and Submitted are driven from the CPU
/// side; the device executor resolves Submitted into Completed or Failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferState {
    Open,
    Submitted,
    Completed,
    Failed(String),
}

/// An ordered batch of encoded operations handed to the device as one
/// unit. Ops are appended while the buffer is open; sealing consumes the
/// buffer, which is what makes appending after submission unrepresentable.
pub struct Buffer {
    id: u64,
    ops: SmallVec<[EncodedOp; 8]>,
    fence: Arc<BufferFence>,
}

impl Buffer {
    pub(crate) fn open(id: u64) -> Self {
        Self {
            id,
            ops: SmallVec::new(),
            fence: Arc::new(BufferFence::new(id)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn state(&self) -> BufferState {
        self.fence.state()
    }

    pub fn fence(&self) -> &Arc<BufferFence> {
        &self.fence
    }

    pub(crate) fn append(&mut self, op: EncodedOp) {
        assert_eq!(
            self.fence.state(),
            BufferState::Open,
            "encode against a non-open buffer"
        );
        self.ops.push(op);
    }

    pub(crate) fn seal(self) -> SubmittedBuffer {
        self.fence.transition(BufferState::Submitted);
        SubmittedBuffer {
            id: self.id,
            ops: self.ops.into_vec(),
            fence: self.fence,
        }
    }
}

/// Completion fence shared between the stream and the device executor,
/// playing the role a hardware fence does in a real backend.
pub struct BufferFence {
    buffer_id: u64,
    state: Mutex<BufferState>,
    cond: Condvar,
}

impl BufferFence {
    fn new(buffer_id: u64) -> Self {
        Self {
            buffer_id,
            state: Mutex::new(BufferState::Open),
            cond: Condvar::new(),
        }
    }

    pub fn buffer_id(&self) -> u64 {
        self.buffer_id
    }

    pub fn state(&self) -> BufferState {
        self.state.lock().expect("fence mutex poisoned").clone()
    }

    /// True once the buffer resolved, successfully or not.
    pub fn is_complete(&self) -> bool {
        matches!(
            self.state(),
            BufferState::Completed | BufferState::Failed(_)
        )
    }

    /// Device side: the buffer finished executing.
    pub fn complete(&self) {
        self.transition(BufferState::Completed);
    }

    /// Device side: the buffer was lost or rejected.
    pub fn fail(&self, fault: impl Into<String>) {
        self.transition(BufferState::Failed(fault.into()));
    }

    // A resolved fence never un-resolves.
    pub(crate) fn transition(&self, next: BufferState) {
        let mut state = self.state.lock().expect("fence mutex poisoned");
        if matches!(*state, BufferState::Completed | BufferState::Failed(_)) {
            return;
        }
        *state = next;
        self.cond.notify_all();
    }

    /// Blocks until this specific buffer resolves. Completion of other
    /// buffers never satisfies the wait.
    pub fn wait(&self) -> Result<(), StreamError> {
        let mut state = self.state.lock().expect("fence mutex poisoned");
        loop {
            match &*state {
                BufferState::Completed => return Ok(()),
                BufferState::Failed(fault) => {
                    return Err(StreamError::Wait {
                        buffer: self.buffer_id,
                        fault: fault.clone(),
                    });
                }
                _ => state = self.cond.wait(state).expect("fence mutex poisoned"),
            }
        }
    }
}
