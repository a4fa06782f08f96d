use crate::error::ResolveResult;
use crate::models::{AssetClass, AssetReference, Resolved};
use async_trait::async_trait;

/// Entry points the UI layer calls to turn asset paths into content.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Resolve story text. Total for any non-empty path: degraded results come
    /// back with `is_fallback` set instead of an error.
    async fn resolve_text(&self, raw_path: &str) -> ResolveResult<Resolved<String>>;

    /// Resolve a playable audio URL, possibly a `mock://` sentinel.
    async fn resolve_audio_url(&self, raw_path: &str) -> ResolveResult<Resolved<String>>;

    /// Resolve a displayable image URL, possibly a `mock://` sentinel.
    async fn resolve_image_url(&self, raw_path: &str) -> ResolveResult<Resolved<String>>;

    /// Dispatch on the reference's asset class.
    async fn resolve(&self, reference: &AssetReference) -> ResolveResult<Resolved<String>> {
        match reference.asset_class {
            AssetClass::Text => self.resolve_text(&reference.raw_path).await,
            AssetClass::Audio => self.resolve_audio_url(&reference.raw_path).await,
            AssetClass::Image => self.resolve_image_url(&reference.raw_path).await,
        }
    }
}
