use super::{Strategy, ensure_alt_media};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use storyvault_api::{
    CanonicalKey, FetchError, Fetcher, ObjectStore, ResolutionSource, ResolveError, ResolveResult,
    Resolved,
};

pub const MOCK_SCHEME: &str = "mock://";

/// Sentinel URL handed out when a media object exists but cannot be played
/// from here.
pub fn mock_url(key: &CanonicalKey) -> String {
    format!("{MOCK_SCHEME}{key}")
}

pub fn is_mock_url(url: &str) -> bool {
    url.starts_with(MOCK_SCHEME)
}

/// Content type guessed from a lower-cased file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Issue a download URL and check it is reachable.
///
/// A probe refused by the origin policy yields the `mock://` sentinel: the
/// object exists but this context may not load it.
pub struct IssuedUrl {
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl IssuedUrl {
    pub fn new(store: Arc<dyn ObjectStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { store, fetcher }
    }
}

#[async_trait]
impl Strategy<String> for IssuedUrl {
    fn name(&self) -> &'static str {
        "issued-url"
    }

    async fn attempt(&self, key: &CanonicalKey) -> ResolveResult<Resolved<String>> {
        let url = ensure_alt_media(self.store.issue_download_url(key).await?);

        match self.fetcher.probe(url.as_str()).await {
            Ok(()) => Ok(Resolved::live(url.to_string(), ResolutionSource::DownloadUrl)),
            Err(FetchError::CorsBlocked(_)) => {
                Ok(Resolved::fallback(mock_url(key), ResolutionSource::Mock))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Embed the object in a `data:` URL, for objects small enough.
pub struct InlineBytes {
    store: Arc<dyn ObjectStore>,
    limit: u64,
}

impl InlineBytes {
    pub fn new(store: Arc<dyn ObjectStore>, limit: u64) -> Self {
        Self { store, limit }
    }
}

#[async_trait]
impl Strategy<String> for InlineBytes {
    fn name(&self) -> &'static str {
        "inline-bytes"
    }

    async fn attempt(&self, key: &CanonicalKey) -> ResolveResult<Resolved<String>> {
        let metadata = self.store.get_metadata(key).await?;
        if metadata.size > self.limit {
            return Err(ResolveError::TooLarge {
                size: metadata.size,
                limit: self.limit,
            });
        }

        let bytes = self.store.get_bytes(key).await?;
        let mime = metadata
            .content_type
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| {
                let ext = key.extension().unwrap_or_default();
                mime_for_extension(&ext).to_string()
            });

        let data_url = format!("data:{};base64,{}", mime, STANDARD.encode(bytes));
        Ok(Resolved::live(data_url, ResolutionSource::InlineBytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryObjectStore;

    #[tokio::test]
    async fn inline_bytes_builds_data_url() {
        let store = Arc::new(MemoryObjectStore::default());
        store.insert("images/a.png", b"png!".to_vec(), None);

        let strategy = InlineBytes::new(store, 1024);
        let resolved = strategy
            .attempt(&CanonicalKey::new("images/a.png"))
            .await
            .unwrap();
        assert_eq!(resolved.value, "data:image/png;base64,cG5nIQ==");
        assert_eq!(resolved.source, ResolutionSource::InlineBytes);
    }

    #[tokio::test]
    async fn inline_bytes_respects_limit() {
        let store = Arc::new(MemoryObjectStore::default());
        store.insert("audio/big.mp3", vec![0u8; 64], Some("audio/mpeg"));

        let strategy = InlineBytes::new(store, 16);
        let err = strategy
            .attempt(&CanonicalKey::new("audio/big.mp3"))
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::TooLarge { size: 64, limit: 16 });
    }

    #[test]
    fn mock_urls() {
        let url = mock_url(&CanonicalKey::new("audio/dragon-no-volar.mp3"));
        assert_eq!(url, "mock://audio/dragon-no-volar.mp3");
        assert!(is_mock_url(&url));
        assert_eq!(mime_for_extension("jpeg"), "image/jpeg");
    }
}
