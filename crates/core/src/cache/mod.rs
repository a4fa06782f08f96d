//! Namespaced resource cache
//!
//! Resolved payloads are kept per namespace (text, audio, image) and trusted
//! until explicitly invalidated. Tables are persisted through a
//! [`CacheStore`] so they survive restarts.

pub mod resource_cache;
pub mod store;

pub use resource_cache::ResourceCache;
pub use store::{CacheStore, CacheTable, FileCacheStore, MemoryCacheStore};
