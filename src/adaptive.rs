use crate::pressure::PressureLevel;

/// Default op-count bound between automatic submissions.
pub const DEFAULT_OP_THRESHOLD: u32 = 32;

/// Decides whether an adaptive synchronize hands the open buffer to the
/// device now or keeps accumulating.
///
/// Two independent triggers, OR'd together. Scarce memory headroom fires
/// at any op count; the op-count bound fires even when memory stays
/// abundant, so a later wait never finds more than `threshold - 1`
/// unsubmitted trailing ops.
pub fn should_submit(pending_ops: u32, pressure: PressureLevel, threshold: u32) -> bool {
    pressure.low_headroom() || pending_ops >= threshold
}
