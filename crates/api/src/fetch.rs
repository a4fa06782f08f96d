use crate::error::FetchError;
use crate::models::{FetchFormat, Payload};
use async_trait::async_trait;

/// Fetches URLs from the current execution context.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, format: FetchFormat) -> Result<Payload, FetchError>;

    /// Check that a URL is reachable without downloading it.
    async fn probe(&self, url: &str) -> Result<(), FetchError>;
}
