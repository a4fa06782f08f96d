use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use storyvault_api::CacheNamespace;

const TABLE_VERSION: u32 = 1;
const TABLE_EXTENSION: &str = "msgpack";

/// Durable backing for the cache tables. One flat table per namespace.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Load a table; a table never written loads empty.
    async fn load(&self, namespace: CacheNamespace) -> Result<HashMap<String, String>>;

    async fn save(&self, namespace: CacheNamespace, entries: &HashMap<String, String>) -> Result<()>;

    async fn remove(&self, namespace: CacheNamespace) -> Result<()>;

    fn location(&self) -> Option<PathBuf>;
}

/// On-disk table file
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheTable {
    pub version: u32,
    pub storage_key: String,
    pub updated_at: u64,
    pub entries: HashMap<String, String>,
}

impl CacheTable {
    pub fn new(namespace: CacheNamespace, entries: HashMap<String, String>) -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            version: TABLE_VERSION,
            storage_key: namespace.storage_key().to_string(),
            updated_at: now,
            entries,
        }
    }
}

/// MessagePack files under a cache directory, one per namespace.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    base_dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// e.g. `storyvault.textCache.msgpack`
    fn table_path(&self, namespace: CacheNamespace) -> PathBuf {
        self.base_dir
            .join(format!("{}.{}", namespace.storage_key(), TABLE_EXTENSION))
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self, namespace: CacheNamespace) -> Result<HashMap<String, String>> {
        let path = self.table_path(namespace);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        match rmp_serde::from_slice::<CacheTable>(&bytes) {
            Ok(table)
                if table.version == TABLE_VERSION
                    && table.storage_key == namespace.storage_key() =>
            {
                Ok(table.entries)
            }
            Ok(table) => {
                tracing::warn!(
                    "Ignoring cache table {} (version {}, key {})",
                    path.display(),
                    table.version,
                    table.storage_key
                );
                Ok(HashMap::new())
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable cache table {}: {}", path.display(), e);
                Ok(HashMap::new())
            }
        }
    }

    async fn save(&self, namespace: CacheNamespace, entries: &HashMap<String, String>) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let table = CacheTable::new(namespace, entries.clone());
        let bytes = rmp_serde::to_vec(&table)?;

        // Write-then-rename so a crash never leaves a torn table behind.
        let path = self.table_path(namespace);
        let tmp = path.with_extension(format!("{TABLE_EXTENSION}.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, namespace: CacheNamespace) -> Result<()> {
        match tokio::fs::remove_file(self.table_path(namespace)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> Option<PathBuf> {
        Some(self.base_dir.clone())
    }
}

/// Process-local tables, gone with the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    tables: DashMap<CacheNamespace, HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self, namespace: CacheNamespace) -> Result<HashMap<String, String>> {
        Ok(self
            .tables
            .get(&namespace)
            .map(|t| t.clone())
            .unwrap_or_default())
    }

    async fn save(&self, namespace: CacheNamespace, entries: &HashMap<String, String>) -> Result<()> {
        self.tables.insert(namespace, entries.clone());
        Ok(())
    }

    async fn remove(&self, namespace: CacheNamespace) -> Result<()> {
        self.tables.remove(&namespace);
        Ok(())
    }

    fn location(&self) -> Option<PathBuf> {
        None
    }
}
