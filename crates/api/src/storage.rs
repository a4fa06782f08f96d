use crate::error::StorageResult;
use crate::models::{CanonicalKey, ObjectMetadata};
use async_trait::async_trait;
use url::Url;

/// Retrieval surface of the external object store.
///
/// Implementations make exactly one attempt per call; retries and fallbacks
/// belong to the resolution pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download the raw object bytes.
    async fn get_bytes(&self, key: &CanonicalKey) -> StorageResult<Vec<u8>>;

    /// Issue a URL that can be fetched without further authentication.
    /// It may carry a media token in its query string.
    async fn issue_download_url(&self, key: &CanonicalKey) -> StorageResult<Url>;

    async fn get_metadata(&self, key: &CanonicalKey) -> StorageResult<ObjectMetadata>;
}
