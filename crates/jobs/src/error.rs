use thiserror::Error;

/// Error taxonomy for the job pipeline, matching the core error design:
/// `Validation` payload mismatches go straight to the dead-letter queue
/// without consuming a retry; `Transient` failures get the backoff
/// treatment; `Fatal` is collapsed into the same DLQ path as exhausted
/// retries.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job payload failed validation: {0}")]
    Validation(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal failure: {0}")]
    Fatal(String),

    #[error("fast store error: {0}")]
    FastStore(#[from] autoguard_fast::FastStoreError),

    #[error("store error: {0}")]
    Store(#[from] autoguard_store::StoreError),

    #[error("materializer error: {0}")]
    Materialize(#[from] autoguard_blacklist::error::MaterializeError),

    #[error("payload was not valid json: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("job exceeded its per-job timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type JobResult<T> = Result<T, JobError>;

impl JobError {
    /// Whether this error should consume a retry (`Transient`-shaped I/O
    /// failures) or go straight to the dead-letter queue (`Validation`,
    /// `Fatal`, and corrupt payloads), per the error handling design's
    /// job-worker propagation policy: "Transient -> delayed retry with
    /// backoff; Fatal or attempt >= maxAttempts -> DLQ".
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            JobError::Validation(_) | JobError::Fatal(_) | JobError::Serialization(_)
        )
    }
}
