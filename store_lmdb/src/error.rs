use kyc_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("lmdb: {0}")]
    Heed(#[from] heed::Error),

    #[error("cannot prepare data directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("record encoding failed: {0}")]
    Serialization(String),

    #[error("unreadable workflow record: {0}")]
    Corruption(String),
}

impl From<LmdbError> for StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Serialization(msg) => StoreError::Serialization(msg),
            LmdbError::Corruption(msg) => StoreError::Corruption(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}
