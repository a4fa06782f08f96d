use std::path::Path;
use std::sync::Arc;
use storyvault_api::CacheManager;
use storyvault_core::cache::{FileCacheStore, ResourceCache};
use storyvault_core::{Engine, EngineConfig};

/// Loads the engine configuration: defaults, then the optional JSON file,
/// then `STORYVAULT_*` environment overrides.
pub fn load_config(path: Option<&Path>) -> storyvault_core::Result<EngineConfig> {
    let config = EngineConfig::load(path)?;
    config.validate()?;
    Ok(config)
}

/// Bootstraps the production engine: REST object store, origin-restricted
/// direct fetches, relay child context and the on-disk resource cache.
pub fn build_default_engine(config: EngineConfig) -> storyvault_core::Result<Arc<Engine>> {
    let engine = Engine::from_config(config)?;
    if engine.proxy().is_none() {
        tracing::info!("Proxy relay disabled by configuration");
    }
    Ok(Arc::new(engine))
}

/// The on-disk resource cache, without the rest of the engine.
pub fn get_cache_manager(config: &EngineConfig) -> Arc<dyn CacheManager> {
    let store = FileCacheStore::new(config.resolved_cache_dir());
    Arc::new(ResourceCache::new(Arc::new(store)))
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
pub fn init_logging(component: &str, to_stderr: bool) -> Option<impl Drop> {
    Some(storyvault_core::logging::init_logging(component, to_stderr))
}
