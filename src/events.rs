use crate::policy::SubmitReason;

/// Fired exactly once per actual device submission. Makes the stream's
/// cadence observable without poking at its internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitEvent {
    /// Sequence number of the submitted buffer.
    pub buffer: u64,
    pub reason: SubmitReason,
    /// Ops carried by the submitted buffer.
    pub ops: usize,
}
