//! In-process object store
//!
//! Serves objects from memory and issues download URLs in the same shape as
//! the REST client, so keys survive a normalize round trip. Failures can be
//! injected per key and operation.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use storyvault_api::{CanonicalKey, ObjectMetadata, ObjectStore, StorageError, StorageResult};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    GetBytes,
    IssueUrl,
    GetMetadata,
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

#[derive(Debug)]
pub struct MemoryObjectStore {
    base_url: String,
    bucket: String,
    objects: DashMap<String, StoredObject>,
    failures: DashMap<(String, StorageOp), StorageError>,
    calls: [AtomicUsize; 3],
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("https://firebasestorage.googleapis.com", "memory")
    }
}

impl MemoryObjectStore {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            objects: DashMap::new(),
            failures: DashMap::new(),
            calls: Default::default(),
        }
    }

    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>, content_type: Option<&str>) {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                bytes: bytes.into(),
                content_type: content_type.map(str::to_string),
            },
        );
    }

    pub fn insert_text(&self, key: &str, text: &str) {
        self.insert(key, text.as_bytes(), Some("text/plain; charset=utf-8"));
    }

    /// Make `op` on `key` fail with `error` until cleared.
    pub fn fail(&self, key: &str, op: StorageOp, error: StorageError) {
        self.failures.insert((key.to_string(), op), error);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    pub fn calls(&self, op: StorageOp) -> usize {
        self.calls[op as usize].load(Ordering::SeqCst)
    }

    /// Download URL for `key`, whether or not the object exists.
    pub fn download_url(&self, key: &str) -> String {
        format!(
            "{}/v0/b/{}/o/{}?alt=media&token=memory-token",
            self.base_url,
            self.bucket,
            urlencoding::encode(key)
        )
    }

    fn begin(&self, key: &CanonicalKey, op: StorageOp) -> StorageResult<StoredObject> {
        self.calls[op as usize].fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.get(&(key.as_str().to_string(), op)) {
            return Err(err.clone());
        }
        self.objects
            .get(key.as_str())
            .map(|o| o.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_bytes(&self, key: &CanonicalKey) -> StorageResult<Vec<u8>> {
        self.begin(key, StorageOp::GetBytes).map(|o| o.bytes)
    }

    async fn issue_download_url(&self, key: &CanonicalKey) -> StorageResult<Url> {
        self.begin(key, StorageOp::IssueUrl)?;
        Url::parse(&self.download_url(key.as_str()))
            .map_err(|e| StorageError::Network(format!("{key}: {e}")))
    }

    async fn get_metadata(&self, key: &CanonicalKey) -> StorageResult<ObjectMetadata> {
        self.begin(key, StorageOp::GetMetadata).map(|o| ObjectMetadata {
            size: o.bytes.len() as u64,
            content_type: o.content_type,
        })
    }
}
