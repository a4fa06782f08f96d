//! Engine configuration.
//!
//! Values come from defaults, an optional JSON file, then `STORYVAULT_*`
//! environment variables, in that order.

use crate::error::{Result, StoryvaultError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com";
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_INLINE_MEDIA_LIMIT: u64 = 2 * 1024 * 1024;
const DEFAULT_CACHE_DIR: &str = "storyvault/resource_cache";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Object store bucket, e.g. `my-app.appspot.com`.
    pub bucket: String,
    pub storage_base_url: String,
    /// Origin presented by direct fetches. `None` disables the origin policy.
    pub origin: Option<String>,
    pub handshake_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub cache_dir: Option<PathBuf>,
    pub inline_media_limit: u64,
    pub proxy_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
            origin: None,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache_dir: None,
            inline_media_limit: DEFAULT_INLINE_MEDIA_LIMIT,
            proxy_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Defaults, overlaid with `path` when given, overlaid with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.apply_env())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(mut self) -> Self {
        if let Ok(bucket) = std::env::var("STORYVAULT_BUCKET") {
            self.bucket = bucket;
        }
        if let Ok(origin) = std::env::var("STORYVAULT_ORIGIN") {
            self.origin = Some(origin).filter(|o| !o.is_empty());
        }
        if let Ok(dir) = std::env::var("STORYVAULT_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 || self.handshake_timeout_ms == 0 {
            return Err(StoryvaultError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.storage_base_url).map_err(|e| {
            StoryvaultError::Config(format!("invalid storageBaseUrl {}: {e}", self.storage_base_url))
        })?;
        Ok(())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Cache directory, falling back to the user cache location.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".cache")
            })
            .join(DEFAULT_CACHE_DIR)
    }
}
