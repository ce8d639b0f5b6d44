use std::time::Duration;

/// Shared error taxonomy for the checkout core.
///
/// `NotFound`, `InvalidState` and `InvalidArgument` are recoverable and
/// surfaced to the caller. `Verification` is fatal for the offending
/// callback. `GatewayTimeout`, `Gateway` and `Conflict` are retryable by the
/// caller with backoff. `Configuration` is fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("never saved: {0}")]
    NotSaved(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("callback verification failed: {0}")]
    Verification(String),

    #[error("gateway call timed out after {0:?}")]
    GatewayTimeout(Duration),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("concurrent modification of {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
