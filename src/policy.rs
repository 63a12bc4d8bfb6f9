use crate::adaptive::should_submit;
use crate::pressure::PressureLevel;

/// Submission request a caller passes at the end of each encoded op.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubmissionPolicy {
    /// Leave the stream untouched. The pending count does not move.
    NoAction,
    /// Submit now and keep encoding into a fresh buffer.
    Commit,
    /// Submit now and block until the submitted buffer completes.
    CommitAndWait,
    /// Caller-forced pipelined submission.
    CommitAndContinue,
    /// Let the pressure/op-count trigger decide.
    Adaptive,
}

/// Why a buffer was handed to the device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubmitReason {
    Explicit,
    Pressure,
    Threshold,
}

/// Device-facing action a policy resolves to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Action {
    Defer,
    SubmitAndContinue(SubmitReason),
    /// Submit without opening a replacement buffer, keeping the submitted
    /// identity stable for an explicit wait or capture.
    Flush(SubmitReason),
    SubmitAndWait,
}

/// Resolves a policy against the current counter and a fresh pressure
/// reading. Pure; the stream applies the returned action.
pub(crate) fn resolve(
    policy: SubmissionPolicy,
    pending_ops: u32,
    pressure: PressureLevel,
    threshold: u32,
    capture: bool,
) -> Action {
    match policy {
        SubmissionPolicy::NoAction => Action::Defer,
        SubmissionPolicy::Commit | SubmissionPolicy::CommitAndContinue => {
            continue_or_flush(SubmitReason::Explicit, capture)
        }
        SubmissionPolicy::CommitAndWait => Action::SubmitAndWait,
        SubmissionPolicy::Adaptive => {
            if !should_submit(pending_ops, pressure, threshold) {
                Action::Defer
            } else if pressure.low_headroom() {
                // Pressure is the safety trigger; it owns the reason when
                // both conditions hold.
                continue_or_flush(SubmitReason::Pressure, capture)
            } else {
                continue_or_flush(SubmitReason::Threshold, capture)
            }
        }
    }
}

/// Capture mode disables the continue fast path: the buffer is flushed
/// instead, so its identity survives for external tooling.
pub(crate) fn continue_or_flush(reason: SubmitReason, capture: bool) -> Action {
    if capture {
        Action::Flush(reason)
    } else {
        Action::SubmitAndContinue(reason)
    }
}
