use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::buffer::{BufferFence, EncodedOp};

mod thread;

pub use thread::{DeviceWorker, WorkerQueue, device_thread};

/// A sealed buffer on its way to the device.
pub struct SubmittedBuffer {
    pub id: u64,
    pub ops: Vec<EncodedOp>,
    pub fence: Arc<BufferFence>,
}

/// The stream's submission channel. Implementations must execute buffers
/// strictly in submission order and resolve each buffer's fence exactly
/// once.
pub trait DeviceQueue: Send {
    fn submit(&self, work: SubmittedBuffer) -> Result<(), SubmitError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("device queue is closed")]
    Closed,
    #[error("device rejected the buffer: {0}")]
    Rejected(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DevicePhase {
    Running,
    Lost,
}

/// Shared device health switch, read by the executor on every buffer.
pub struct DeviceControl {
    phase: AtomicU8,
}

impl DeviceControl {
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(DevicePhase::Running as u8),
        }
    }

    pub fn set_phase(&self, phase: DevicePhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    pub fn phase(&self) -> DevicePhase {
        match self.phase.load(Ordering::Acquire) {
            0 => DevicePhase::Running,
            _ => DevicePhase::Lost,
        }
    }
}

impl Default for DeviceControl {
    fn default() -> Self {
        Self::new()
    }
}
