/// Failures reported by an object store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Network error: {0}")]
    Network(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Failures reported by a URL fetcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Blocked by cross-origin policy: {0}")]
    CorsBlocked(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Could not decode response: {0}")]
    Decode(String),
}

/// Error taxonomy surfaced by the resolution pipeline.
///
/// Only `MalformedReference` is raised before any retrieval runs; every other
/// variant is produced by a strategy and normally absorbed by the chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Malformed asset reference: {0:?}")]
    MalformedReference(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Blocked by cross-origin policy: {0}")]
    CorsBlocked(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Could not decode content: {0}")]
    Decode(String),
    #[error("Object too large to inline ({size} bytes, limit {limit})")]
    TooLarge { size: u64, limit: u64 },
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("All strategies failed for {key}: {last}")]
    Exhausted {
        key: String,
        last: Box<ResolveError>,
    },
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

impl From<StorageError> for ResolveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => ResolveError::NotFound(key),
            StorageError::PermissionDenied(key) => ResolveError::PermissionDenied(key),
            StorageError::Network(msg) => ResolveError::Network(msg),
        }
    }
}

impl From<FetchError> for ResolveError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::CorsBlocked(url) => ResolveError::CorsBlocked(url),
            FetchError::Network(msg) => ResolveError::Network(msg),
            FetchError::Status { status: 404, url } => ResolveError::NotFound(url),
            FetchError::Status {
                status: 401 | 403,
                url,
            } => ResolveError::PermissionDenied(url),
            err @ FetchError::Status { .. } => ResolveError::Network(err.to_string()),
            FetchError::Decode(msg) => ResolveError::Decode(msg),
        }
    }
}

impl ResolveError {
    /// The innermost cause, unwrapping `Exhausted`.
    pub fn root_cause(&self) -> &ResolveError {
        match self {
            ResolveError::Exhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}
