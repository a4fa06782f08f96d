use clap::Subcommand;
use storyvault_api::{CacheManager, CacheNamespace};
use storyvault_core::EngineConfig;
use tabled::{Table, Tabled};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show entries per namespace
    Stats,
    /// Clear the cache
    Clear {
        /// Only clear this namespace (text, audio or image)
        #[arg(long)]
        namespace: Option<CacheNamespace>,
    },
}

#[derive(Tabled)]
struct NamespaceRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Key")]
    storage_key: String,
    #[tabled(rename = "Entries")]
    entries: usize,
}

pub async fn run(config: &EngineConfig, cmd: CacheCommands) -> Result<(), Box<dyn std::error::Error>> {
    // The cache lives on disk; no engine needed to inspect it.
    let cache = storyvault_runtime::get_cache_manager(config);

    match cmd {
        CacheCommands::Stats => {
            let stats = cache.stats().await;
            match &stats.location {
                Some(dir) => println!("Cache Directory: {}", dir.display()),
                None => println!("Cache Directory: (in memory)"),
            }
            println!("Total Entries:   {}", stats.total_entries);

            let rows: Vec<NamespaceRow> = stats
                .namespaces
                .into_iter()
                .map(|n| NamespaceRow {
                    namespace: n.namespace.to_string(),
                    storage_key: n.storage_key,
                    entries: n.entries,
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        CacheCommands::Clear { namespace } => {
            cache.clear(namespace).await?;
            match namespace {
                Some(ns) => tracing::info!("Cleared {} cache", ns),
                None => tracing::info!("Cleared all caches"),
            }
            println!("Cache cleared.");
        }
    }
    Ok(())
}
