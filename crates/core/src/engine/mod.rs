//! Story asset engine
//!
//! The [`Engine`] owns one resolution pipeline, its cache and its proxy
//! channel. Nothing is global: build as many engines as needed and inject
//! them where they are used.

pub mod builder;

pub use builder::EngineBuilder;

use crate::cache::{FileCacheStore, ResourceCache};
use crate::config::EngineConfig;
use crate::error::{Result, StoryvaultError};
use crate::normalize::PathNormalizer;
use crate::pipeline::ResolutionPipeline;
use crate::proxy::ProxyChannel;
use crate::storage::FirebaseStorageClient;
use async_trait::async_trait;
use std::sync::Arc;
use storyvault_api::{
    CacheManager, CacheNamespace, CacheStats, ResolveResult, Resolved, ResourceResolver,
    StoryRecord,
};

pub struct Engine {
    config: EngineConfig,
    pipeline: ResolutionPipeline,
    cache: Arc<ResourceCache>,
    proxy: Option<ProxyChannel>,
}

/// Every asset of a story, resolved.
#[derive(Debug, Clone)]
pub struct ResolvedStory {
    pub id: String,
    pub title: String,
    pub text: ResolveResult<Resolved<String>>,
    /// `None` when the record has no audio.
    pub audio: Option<ResolveResult<Resolved<String>>>,
    pub image: Option<ResolveResult<Resolved<String>>>,
}

impl ResolvedStory {
    /// True when any asset came back degraded or failed.
    pub fn is_degraded(&self) -> bool {
        [Some(&self.text), self.audio.as_ref(), self.image.as_ref()]
            .into_iter()
            .flatten()
            .any(|r| r.as_ref().map(|r| r.is_fallback).unwrap_or(true))
    }
}

impl Engine {
    pub fn builder(store: Arc<dyn storyvault_api::ObjectStore>) -> EngineBuilder {
        EngineBuilder::new(store)
    }

    /// Production engine: REST object store, file-backed cache.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        if config.bucket.trim().is_empty() {
            return Err(StoryvaultError::Config(
                "no bucket configured (set `bucket` or STORYVAULT_BUCKET)".to_string(),
            ));
        }

        let store = FirebaseStorageClient::new(&config.storage_base_url, &config.bucket);
        let cache_dir = config.resolved_cache_dir();
        tracing::info!(
            bucket = %config.bucket,
            cache_dir = %cache_dir.display(),
            "Initializing storyvault engine"
        );

        Ok(EngineBuilder::new(Arc::new(store))
            .with_cache_store(Arc::new(FileCacheStore::new(cache_dir)))
            .with_config(config)
            .build())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        self.pipeline.normalizer()
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    pub fn proxy(&self) -> Option<&ProxyChannel> {
        self.proxy.as_ref()
    }

    /// Resolve text, audio and image of a story concurrently.
    pub async fn resolve_story(&self, story: &StoryRecord) -> ResolvedStory {
        let text_reference = story.text_reference();
        let text = self.resolve(&text_reference);
        let audio = async {
            match story.audio_reference() {
                Some(reference) => Some(self.resolve(&reference).await),
                None => None,
            }
        };
        let image = async {
            match story.image_reference() {
                Some(reference) => Some(self.resolve(&reference).await),
                None => None,
            }
        };
        let (text, audio, image) = tokio::join!(text, audio, image);

        ResolvedStory {
            id: story.id.clone(),
            title: story.title.clone(),
            text,
            audio,
            image,
        }
    }

    pub async fn invalidate(&self, namespace: CacheNamespace) -> Result<()> {
        self.cache.invalidate(namespace).await
    }

    /// Release the proxy child context. Resolution keeps working without it.
    pub fn shutdown(&self) {
        if let Some(proxy) = &self.proxy {
            proxy.teardown();
        }
    }
}

#[async_trait]
impl ResourceResolver for Engine {
    async fn resolve_text(&self, raw_path: &str) -> ResolveResult<Resolved<String>> {
        self.pipeline.resolve_text(raw_path).await
    }

    async fn resolve_audio_url(&self, raw_path: &str) -> ResolveResult<Resolved<String>> {
        self.pipeline.resolve_audio_url(raw_path).await
    }

    async fn resolve_image_url(&self, raw_path: &str) -> ResolveResult<Resolved<String>> {
        self.pipeline.resolve_image_url(raw_path).await
    }
}

#[async_trait]
impl CacheManager for Engine {
    async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn clear(&self, namespace: Option<CacheNamespace>) -> std::result::Result<(), String> {
        self.cache.clear(namespace).await
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
