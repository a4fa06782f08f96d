//! Engine assembly
//!
//! `EngineBuilder` collects the collaborators an [`Engine`] needs. Anything
//! not supplied falls back to the production default: an origin-restricted
//! [`HttpFetcher`], a [`RelayContext`] child, and an in-memory cache.

use super::Engine;
use crate::cache::{CacheStore, MemoryCacheStore, ResourceCache};
use crate::config::EngineConfig;
use crate::fetch::HttpFetcher;
use crate::normalize::PathNormalizer;
use crate::pipeline::{
    Builtin, DirectBytes, DownloadUrl, InlineBytes, IssuedUrl, ResolutionPipeline, Strategy,
    StrategyChain,
};
use crate::proxy::{ChildContext, ProxyChannel, ProxyConfig, RelayContext};
use std::sync::Arc;
use storyvault_api::{Fetcher, ObjectStore};

pub struct EngineBuilder {
    store: Arc<dyn ObjectStore>,
    fetcher: Option<Arc<dyn Fetcher>>,
    child: Option<Arc<dyn ChildContext>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            fetcher: None,
            child: None,
            cache_store: None,
            config: EngineConfig::default(),
        }
    }

    /// Fetcher used for direct downloads and reachability probes.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_child_context(mut self, child: Arc<dyn ChildContext>) -> Self {
        self.child = Some(child);
        self
    }

    pub fn with_cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn without_proxy(mut self) -> Self {
        self.config.proxy_enabled = false;
        self
    }

    pub fn build(self) -> Engine {
        let config = self.config;

        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => match &config.origin {
                Some(origin) => Arc::new(HttpFetcher::with_origin(origin.clone())),
                None => Arc::new(HttpFetcher::new()),
            },
        };

        let proxy = if config.proxy_enabled {
            let child: Arc<dyn ChildContext> = match self.child {
                Some(child) => child,
                None => Arc::new(RelayContext::new(Arc::new(HttpFetcher::new()))),
            };
            Some(ProxyChannel::new(child, ProxyConfig::from(&config)))
        } else {
            None
        };

        let cache_store: Arc<dyn CacheStore> = match self.cache_store {
            Some(store) => store,
            None => Arc::new(MemoryCacheStore::new()),
        };
        let cache = Arc::new(ResourceCache::new(cache_store));

        let store = self.store;
        let text = StrategyChain::<String>::new()
            .with(Arc::new(DirectBytes::new(Arc::clone(&store))))
            .with(Arc::new(DownloadUrl::new(
                Arc::clone(&store),
                Arc::clone(&fetcher),
                proxy.clone(),
            )))
            .with(Arc::new(Builtin));

        let issued: Arc<dyn Strategy<String>> =
            Arc::new(IssuedUrl::new(Arc::clone(&store), Arc::clone(&fetcher)));
        let inline: Arc<dyn Strategy<String>> =
            Arc::new(InlineBytes::new(Arc::clone(&store), config.inline_media_limit));
        let audio = StrategyChain::<String>::new()
            .with(Arc::clone(&issued))
            .with(Arc::clone(&inline));
        let image = StrategyChain::<String>::new().with(issued).with(inline);

        tracing::debug!(
            proxy = config.proxy_enabled,
            text = ?text.names(),
            media = ?audio.names(),
            "Assembling engine"
        );

        let pipeline = ResolutionPipeline::new(
            PathNormalizer::for_storage_base_url(&config.storage_base_url),
            Arc::clone(&cache),
            text,
            audio,
            image,
        );

        Engine {
            config,
            pipeline,
            cache,
            proxy,
        }
    }
}
