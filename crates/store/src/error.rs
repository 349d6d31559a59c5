use thiserror::Error;

/// Error taxonomy for the authoritative store, per the core error design:
/// `NotFound`, `Conflict`, `Validation`, `PreconditionFailed` map onto
/// business-rule failures; `Transient`/`Fatal` map onto infrastructure faults.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("transient database error: {0}")]
    Transient(#[from] sqlx::Error),

    #[error("fatal database error: {0}")]
    Fatal(String),
}

impl StoreError {
    /// Postgres unique-violation (`23505`) surfaces as `Conflict`; everything
    /// else from sqlx is treated as transient and left to the caller's retry
    /// policy (job handlers retry, request handlers do not).
    pub fn from_sqlx(err: sqlx::Error, conflict_msg: impl Into<String>) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Conflict(conflict_msg.into());
            }
        }
        StoreError::Transient(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
