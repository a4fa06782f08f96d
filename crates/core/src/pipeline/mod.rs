//! Resolution pipeline
//!
//! An asset path is normalized into a [`CanonicalKey`], looked up in the
//! [`ResourceCache`], and on a miss handed to an ordered [`StrategyChain`].
//! The first strategy that succeeds wins; failures are logged and the chain
//! moves on.
//!
//! Text resolution always ends in [`Builtin`], so it cannot fail for a
//! well-formed path. Media resolution can run out of strategies and reports
//! [`ResolveError::Exhausted`] with the last cause.

pub mod fallback;
pub mod media;
pub mod text;

pub use fallback::Builtin;
pub use media::{InlineBytes, IssuedUrl};
pub use text::{DirectBytes, DownloadUrl};

use crate::cache::ResourceCache;
use crate::normalize::PathNormalizer;
use async_trait::async_trait;
use std::sync::Arc;
use storyvault_api::{
    AssetClass, CacheNamespace, CanonicalKey, ResolveError, ResolveResult, Resolved,
};
use url::Url;

/// One way of turning a key into a value.
#[async_trait]
pub trait Strategy<T>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn attempt(&self, key: &CanonicalKey) -> ResolveResult<Resolved<T>>;
}

/// Ordered strategies, tried until the first success.
pub struct StrategyChain<T> {
    strategies: Vec<Arc<dyn Strategy<T>>>,
}

impl<T> Default for StrategyChain<T> {
    fn default() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }
}

impl<T> StrategyChain<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, strategy: Arc<dyn Strategy<T>>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn push(&mut self, strategy: Arc<dyn Strategy<T>>) {
        self.strategies.push(strategy);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub async fn run(&self, key: &CanonicalKey) -> ResolveResult<Resolved<T>> {
        let mut last = None;
        for strategy in &self.strategies {
            match strategy.attempt(key).await {
                Ok(resolved) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        key = %key,
                        source = %resolved.source,
                        fallback = resolved.is_fallback,
                        "Strategy succeeded"
                    );
                    return Ok(resolved);
                }
                Err(e) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        key = %key,
                        "Strategy failed: {}",
                        e
                    );
                    last = Some(e);
                }
            }
        }

        let last = last.unwrap_or_else(|| ResolveError::NotFound(key.to_string()));
        Err(ResolveError::Exhausted {
            key: key.to_string(),
            last: Box::new(last),
        })
    }
}

/// Normalization, caching and one strategy chain per asset class.
pub struct ResolutionPipeline {
    normalizer: PathNormalizer,
    cache: Arc<ResourceCache>,
    text: StrategyChain<String>,
    audio: StrategyChain<String>,
    image: StrategyChain<String>,
}

impl ResolutionPipeline {
    pub fn new(
        normalizer: PathNormalizer,
        cache: Arc<ResourceCache>,
        text: StrategyChain<String>,
        audio: StrategyChain<String>,
        image: StrategyChain<String>,
    ) -> Self {
        Self {
            normalizer,
            cache,
            text,
            audio,
            image,
        }
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    fn chain(&self, class: AssetClass) -> &StrategyChain<String> {
        match class {
            AssetClass::Text => &self.text,
            AssetClass::Audio => &self.audio,
            AssetClass::Image => &self.image,
        }
    }

    pub async fn resolve(&self, raw_path: &str, class: AssetClass) -> ResolveResult<Resolved<String>> {
        let key = self
            .normalizer
            .normalize(raw_path, class)
            .ok_or_else(|| ResolveError::MalformedReference(raw_path.to_string()))?;

        let chain = self.chain(class);
        let resolved = self
            .cache
            .get_or_resolve(CacheNamespace::from(class), key.as_str(), || chain.run(&key))
            .await;

        match &resolved {
            Ok(r) if r.is_fallback => {
                tracing::warn!(key = %key, source = %r.source, "Serving degraded {} asset", class);
            }
            Err(e) => {
                tracing::warn!(key = %key, "Could not resolve {} asset: {}", class, e);
            }
            Ok(_) => {}
        }
        resolved
    }

    pub async fn resolve_text(&self, raw_path: &str) -> ResolveResult<Resolved<String>> {
        self.resolve(raw_path, AssetClass::Text).await
    }

    pub async fn resolve_audio_url(&self, raw_path: &str) -> ResolveResult<Resolved<String>> {
        self.resolve(raw_path, AssetClass::Audio).await
    }

    pub async fn resolve_image_url(&self, raw_path: &str) -> ResolveResult<Resolved<String>> {
        self.resolve(raw_path, AssetClass::Image).await
    }
}

/// Add `alt=media` unless the URL already asks for the object body.
pub(crate) fn ensure_alt_media(mut url: Url) -> Url {
    let has_media = url
        .query_pairs()
        .any(|(name, value)| name == "alt" && value == "media");
    if !has_media {
        url.query_pairs_mut().append_pair("alt", "media");
    }
    url
}
