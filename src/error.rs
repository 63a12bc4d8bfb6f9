use crate::device::SubmitError;

/// Failures the stream reports to its caller. Contract violations
/// (encoding against a non-open buffer, a zero threshold) are programming
/// errors and panic instead of showing up here.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The device rejected or lost a buffer at submission. The buffer and
    /// every op in it are abandoned; nothing is resubmitted.
    #[error("submission of buffer {buffer} failed: {source}")]
    Submission {
        buffer: u64,
        #[source]
        source: SubmitError,
    },
    /// The awaited buffer resolved to a failure state instead of
    /// completing.
    #[error("wait on buffer {buffer} failed: {fault}")]
    Wait { buffer: u64, fault: String },
}
