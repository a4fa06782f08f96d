use super::{Strategy, ensure_alt_media};
use crate::proxy::ProxyChannel;
use async_trait::async_trait;
use std::sync::Arc;
use storyvault_api::{
    CanonicalKey, FetchError, FetchFormat, Fetcher, ObjectStore, ResolutionSource, ResolveError,
    ResolveResult, Resolved,
};
use url::Url;

/// Read the object through the store and decode it as UTF-8.
pub struct DirectBytes {
    store: Arc<dyn ObjectStore>,
}

impl DirectBytes {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Strategy<String> for DirectBytes {
    fn name(&self) -> &'static str {
        "direct-bytes"
    }

    async fn attempt(&self, key: &CanonicalKey) -> ResolveResult<Resolved<String>> {
        let bytes = self.store.get_bytes(key).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ResolveError::Decode(format!("{key}: {e}")))?;
        Ok(Resolved::live(text, ResolutionSource::DirectBytes))
    }
}

/// Fetch the object's download URL directly, relaying through the proxy
/// channel when the direct fetch is refused or the network fails.
pub struct DownloadUrl {
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn Fetcher>,
    proxy: Option<ProxyChannel>,
}

impl DownloadUrl {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn Fetcher>,
        proxy: Option<ProxyChannel>,
    ) -> Self {
        Self {
            store,
            fetcher,
            proxy,
        }
    }

    async fn relay(&self, key: &CanonicalKey, url: &Url, direct: FetchError) -> ResolveResult<Resolved<String>> {
        let Some(proxy) = &self.proxy else {
            return Err(direct.into());
        };

        tracing::debug!(key = %key, "Direct fetch failed ({}), relaying through proxy", direct);
        match proxy.fetch(url.as_str(), FetchFormat::Text).await {
            Ok(payload) => Ok(Resolved::live(payload.into_text()?, ResolutionSource::Proxy)),
            Err(e) if e.is_unavailable() => {
                tracing::debug!(key = %key, "Proxy unavailable: {}", e);
                Err(direct.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Strategy<String> for DownloadUrl {
    fn name(&self) -> &'static str {
        "download-url"
    }

    async fn attempt(&self, key: &CanonicalKey) -> ResolveResult<Resolved<String>> {
        let url = ensure_alt_media(self.store.issue_download_url(key).await?);

        match self.fetcher.fetch(url.as_str(), FetchFormat::Text).await {
            Ok(payload) => Ok(Resolved::live(payload.into_text()?, ResolutionSource::DownloadUrl)),
            Err(e @ (FetchError::Network(_) | FetchError::CorsBlocked(_))) => {
                self.relay(key, &url, e).await
            }
            Err(e) => Err(e.into()),
        }
    }
}
