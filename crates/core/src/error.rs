use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryvaultError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cache encoding error: {0}")]
    CacheEncode(#[from] rmp_serde::encode::Error),
    #[error("Cache decoding error: {0}")]
    CacheDecode(#[from] rmp_serde::decode::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoryvaultError> for storyvault_api::ResolveError {
    fn from(err: StoryvaultError) -> Self {
        storyvault_api::ResolveError::Cache(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoryvaultError>;
