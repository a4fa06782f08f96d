pub mod cache;
pub mod error;
pub mod fetch;
pub mod models;
pub mod resolver;
pub mod storage;

// Re-export commonly used types
pub use cache::{CacheManager, CacheNamespace, CacheStats, NamespaceStats};
pub use error::{FetchError, ResolveError, ResolveResult, StorageError, StorageResult};
pub use fetch::Fetcher;
pub use models::*;
pub use resolver::ResourceResolver;
pub use storage::ObjectStore;
