use thiserror::Error;

/// Internal error taxonomy for the pieces `decide` composes. None of
/// these ever escape `decide` itself — per the error handling design,
/// the decision engine never throws; every variant here collapses to
/// `{decision: safe, blocked_at_layer: Timeout}` with the category
/// recorded in `details` for forensics.
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("fast store error: {0}")]
    FastStore(#[from] autoguard_fast::FastStoreError),

    #[error("ip intelligence lookup failed: {0}")]
    IpIntel(String),

    #[error("deadline exceeded in layer {0}")]
    DeadlineExceeded(&'static str),
}
