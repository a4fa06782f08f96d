use super::store::CacheStore;
use crate::error::StoryvaultError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use storyvault_api::{
    CacheManager, CacheNamespace, CacheStats, NamespaceStats, ResolutionSource, Resolved,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    loaded: bool,
    entries: HashMap<String, String>,
}

/// Durable memoization of resolved payloads, one table per namespace.
///
/// Entries never expire. Concurrent misses for the same id are not
/// coalesced; each resolves and the last write wins.
pub struct ResourceCache {
    store: Arc<dyn CacheStore>,
    text: RwLock<Table>,
    audio: RwLock<Table>,
    image: RwLock<Table>,
}

impl ResourceCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            text: RwLock::new(Table::default()),
            audio: RwLock::new(Table::default()),
            image: RwLock::new(Table::default()),
        }
    }

    fn table(&self, namespace: CacheNamespace) -> &RwLock<Table> {
        match namespace {
            CacheNamespace::Text => &self.text,
            CacheNamespace::Audio => &self.audio,
            CacheNamespace::Image => &self.image,
        }
    }

    /// Load the table from the store on first use. Returns whether the
    /// table is loaded; a failed load is retried on the next access.
    async fn ensure_loaded(&self, namespace: CacheNamespace) -> bool {
        if self.table(namespace).read().await.loaded {
            return true;
        }

        let mut table = self.table(namespace).write().await;
        if table.loaded {
            return true;
        }
        match self.store.load(namespace).await {
            Ok(entries) => {
                tracing::debug!(
                    namespace = %namespace,
                    entries = entries.len(),
                    "Loaded cache table"
                );
                // Entries put while the table could not be loaded win.
                let unsaved = std::mem::replace(&mut table.entries, entries);
                table.entries.extend(unsaved);
                table.loaded = true;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load cache table {}: {}", namespace.storage_key(), e);
                false
            }
        }
    }

    pub async fn get(&self, namespace: CacheNamespace, id: &str) -> Option<String> {
        self.ensure_loaded(namespace).await;
        self.table(namespace).read().await.entries.get(id).cloned()
    }

    /// Store a value and write the table through to the backing store.
    ///
    /// While the persisted table cannot be loaded the value is kept in memory
    /// only, so the stored table is never replaced by a partial one.
    pub async fn put(
        &self,
        namespace: CacheNamespace,
        id: impl Into<String>,
        value: impl Into<String>,
    ) -> crate::Result<()> {
        let loaded = self.ensure_loaded(namespace).await;
        let mut table = self.table(namespace).write().await;
        table.entries.insert(id.into(), value.into());
        if !loaded {
            return Err(StoryvaultError::Internal(format!(
                "cache table {} is not loaded; write-through skipped",
                namespace.storage_key()
            )));
        }
        self.store.save(namespace, &table.entries).await
    }

    /// Return the cached value for `id`, or run `resolver` and remember its
    /// result.
    ///
    /// Resolver errors propagate and leave the table untouched. Fallback
    /// results are returned but not stored. A failed write-through is
    /// logged; the resolved value is still returned.
    pub async fn get_or_resolve<F, Fut, E>(
        &self,
        namespace: CacheNamespace,
        id: &str,
        resolver: F,
    ) -> Result<Resolved<String>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Resolved<String>, E>>,
    {
        if let Some(value) = self.get(namespace, id).await {
            tracing::debug!(namespace = %namespace, id, "Cache hit");
            return Ok(Resolved::live(value, ResolutionSource::Cache));
        }

        let resolved = resolver().await?;
        if resolved.is_fallback {
            return Ok(resolved);
        }

        if let Err(e) = self.put(namespace, id, resolved.value.clone()).await {
            tracing::warn!(namespace = %namespace, id, "Failed to persist cache entry: {}", e);
        }
        Ok(resolved)
    }

    pub async fn invalidate(&self, namespace: CacheNamespace) -> crate::Result<()> {
        let mut table = self.table(namespace).write().await;
        table.entries.clear();
        table.loaded = true;
        self.store.remove(namespace).await
    }

    pub async fn invalidate_all(&self) -> crate::Result<()> {
        for namespace in CacheNamespace::ALL {
            self.invalidate(namespace).await?;
        }
        Ok(())
    }

    pub async fn len(&self, namespace: CacheNamespace) -> usize {
        self.ensure_loaded(namespace).await;
        self.table(namespace).read().await.entries.len()
    }
}

#[async_trait]
impl CacheManager for ResourceCache {
    async fn stats(&self) -> CacheStats {
        let mut namespaces = Vec::with_capacity(CacheNamespace::ALL.len());
        for namespace in CacheNamespace::ALL {
            namespaces.push(NamespaceStats {
                namespace,
                storage_key: namespace.storage_key().to_string(),
                entries: self.len(namespace).await,
            });
        }
        let total_entries = namespaces.iter().map(|n| n.entries).sum();

        CacheStats {
            namespaces,
            total_entries,
            location: self.store.location(),
        }
    }

    async fn clear(&self, namespace: Option<CacheNamespace>) -> Result<(), String> {
        let result = match namespace {
            Some(namespace) => self.invalidate(namespace).await,
            None => self.invalidate_all().await,
        };
        result.map_err(|e| e.to_string())
    }
}
