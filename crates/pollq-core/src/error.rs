use thiserror::Error;

/// Errors raised inside an enqueue call or a worker iteration.
///
/// Worker loops never propagate these past a single iteration: they are
/// logged and the loop moves on to its next pop.
#[derive(Debug, Error)]
pub enum PollqError {
    /// Backing store unreachable or a command failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Queue entry could not be decoded into a task.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("failed to encode task: {0}")]
    Encode(#[source] serde_json::Error),

    /// Audit insert failed. Queue state is not rolled back.
    #[error("audit write failed: {0}")]
    AuditWriteFailed(String),

    /// Retry counter holds something other than a decimal integer.
    #[error("invalid retry counter at key={key}: {value:?}")]
    InvalidCounter { key: String, value: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PollqError {
    /// Errors the enqueue caller caused (as opposed to infrastructure faults).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PollqError::InvalidRequest(_))
    }
}
