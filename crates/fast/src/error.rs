use thiserror::Error;

/// Error taxonomy for the fast lookup store. Redis itself rarely
/// distinguishes "not found" from "empty" — callers that need that
/// distinction check the returned `Option`/empty collection rather than
/// an error variant; this enum covers connection and protocol failures.
#[derive(Debug, Error)]
pub enum FastStoreError {
    #[error("redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("payload was not valid json: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type FastResult<T> = Result<T, FastStoreError>;
