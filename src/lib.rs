//! Submission scheduling for a single CPU-side command stream.
//!
//! One producer encodes device-bound ops; the stream decides when the
//! accumulated buffer is handed to the device queue so CPU encoding
//! overlaps device execution:
//!
//! ```text
//! CPU: [encode 1..32][encode 33..64][encode 65..96]
//! GPU:               [execute 1..32][execute 33..64]
//! ```
//!
//! Each op ends with a [`SubmissionPolicy`]; the adaptive policy submits
//! when allocator pressure signals scarce headroom or when the pending-op
//! count reaches a threshold, whichever fires first.

pub mod adaptive;
pub mod buffer;
pub mod device;
pub mod error;
pub mod events;
pub mod policy;
pub mod pressure;
pub mod stream;

pub use adaptive::{DEFAULT_OP_THRESHOLD, should_submit};
pub use buffer::{Buffer, BufferFence, BufferState, EncodedOp};
pub use device::{
    DeviceControl, DevicePhase, DeviceQueue, DeviceWorker, SubmitError, SubmittedBuffer,
    WorkerQueue,
};
pub use error::StreamError;
pub use events::SubmitEvent;
pub use policy::{SubmissionPolicy, SubmitReason};
pub use pressure::{PressureGauge, PressureLevel, PressureMonitor};
pub use stream::{CommandStream, StreamOptions};
