use crate::models::AssetClass;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Independent persisted table of the resource cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheNamespace {
    Text,
    Audio,
    Image,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 3] = [
        CacheNamespace::Text,
        CacheNamespace::Audio,
        CacheNamespace::Image,
    ];

    /// Fixed well-known key the table is persisted under.
    pub fn storage_key(&self) -> &'static str {
        match self {
            CacheNamespace::Text => "storyvault.textCache",
            CacheNamespace::Audio => "storyvault.audioUrlCache",
            CacheNamespace::Image => "storyvault.imageUrlCache",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheNamespace::Text => "text",
            CacheNamespace::Audio => "audio",
            CacheNamespace::Image => "image",
        }
    }
}

impl From<AssetClass> for CacheNamespace {
    fn from(class: AssetClass) -> Self {
        match class {
            AssetClass::Text => CacheNamespace::Text,
            AssetClass::Audio => CacheNamespace::Audio,
            AssetClass::Image => CacheNamespace::Image,
        }
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CacheNamespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<AssetClass>().map(CacheNamespace::from)
    }
}

/// Entry count of one namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub namespace: CacheNamespace,
    pub storage_key: String,
    pub entries: usize,
}

/// Statistics for the resource cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub namespaces: Vec<NamespaceStats>,
    pub total_entries: usize,
    /// Where the tables are persisted; `None` for in-memory stores.
    pub location: Option<PathBuf>,
}

/// Service interface for managing the resource cache
#[async_trait]
pub trait CacheManager: Send + Sync {
    async fn stats(&self) -> CacheStats;

    /// Clear one namespace, or every namespace when `None`.
    async fn clear(&self, namespace: Option<CacheNamespace>) -> Result<(), String>;
}
