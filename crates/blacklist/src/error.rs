use thiserror::Error;

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Store(#[from] autoguard_store::StoreError),

    #[error(transparent)]
    FastStore(#[from] autoguard_fast::FastStoreError),
}

pub type MaterializeResult<T> = Result<T, MaterializeError>;
