//! REST client for Firebase-style storage buckets

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use storyvault_api::{CanonicalKey, ObjectMetadata, ObjectStore, StorageError, StorageResult};
use url::Url;

/// Object resource returned by `GET /v0/b/{bucket}/o/{key}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    content_type: Option<String>,
    /// The API reports sizes as decimal strings.
    size: Option<String>,
    download_tokens: Option<String>,
}

pub struct FirebaseStorageClient {
    client: Client,
    base_url: String,
    bucket: String,
}

impl FirebaseStorageClient {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, bucket)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &CanonicalKey) -> String {
        format!(
            "{}/v0/b/{}/o/{}",
            self.base_url,
            self.bucket,
            urlencoding::encode(key.as_str())
        )
    }

    async fn fetch_resource(&self, key: &CanonicalKey) -> StorageResult<ObjectResource> {
        let response = self
            .client
            .get(self.object_url(key))
            .send()
            .await
            .map_err(|e| StorageError::Network(format!("{key}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status, key));
        }

        response
            .json::<ObjectResource>()
            .await
            .map_err(|e| StorageError::Network(format!("{key}: invalid metadata response: {e}")))
    }
}

#[async_trait]
impl ObjectStore for FirebaseStorageClient {
    async fn get_bytes(&self, key: &CanonicalKey) -> StorageResult<Vec<u8>> {
        let response = self
            .client
            .get(self.object_url(key))
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(|e| StorageError::Network(format!("{key}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status, key));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Network(format!("{key}: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn issue_download_url(&self, key: &CanonicalKey) -> StorageResult<Url> {
        let resource = self.fetch_resource(key).await?;
        let token = resource
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
            .ok_or_else(|| {
                StorageError::PermissionDenied(format!("{key}: object has no download token"))
            })?;

        let mut url = Url::parse(&self.object_url(key))
            .map_err(|e| StorageError::Network(format!("{key}: invalid download url: {e}")))?;
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(url)
    }

    async fn get_metadata(&self, key: &CanonicalKey) -> StorageResult<ObjectMetadata> {
        let resource = self.fetch_resource(key).await?;
        let size = resource
            .size
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(ObjectMetadata {
            content_type: resource.content_type,
            size,
        })
    }
}

fn map_status(status: StatusCode, key: &CanonicalKey) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound(key.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StorageError::PermissionDenied(key.to_string())
        }
        other => StorageError::Network(format!("{key}: HTTP {}", other.as_u16())),
    }
}

impl std::fmt::Debug for FirebaseStorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseStorageClient")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use storyvault_api::AssetClass;

    #[test]
    fn object_url_encodes_the_whole_key() {
        let client = FirebaseStorageClient::new("https://firebasestorage.googleapis.com/", "tales.appspot.com");
        let key = CanonicalKey::new("audio/dragon no volar.mp3");
        assert_eq!(
            client.object_url(&key),
            "https://firebasestorage.googleapis.com/v0/b/tales.appspot.com/o/audio%2Fdragon%20no%20volar.mp3"
        );
    }

    #[test]
    fn object_url_normalizes_back_to_key() {
        let client = FirebaseStorageClient::new(crate::config::DEFAULT_STORAGE_BASE_URL, "tales.appspot.com");
        let key = CanonicalKey::new("stories/dragon-share.txt");
        let url = format!("{}?alt=media&token=t0", client.object_url(&key));
        assert_eq!(normalize(&url, AssetClass::Text), Some(key));
    }

    #[test]
    fn status_mapping() {
        let key = CanonicalKey::new("stories/a.txt");
        assert!(matches!(map_status(StatusCode::NOT_FOUND, &key), StorageError::NotFound(_)));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, &key),
            StorageError::PermissionDenied(_)
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_GATEWAY, &key),
            StorageError::Network(_)
        ));
    }
}
