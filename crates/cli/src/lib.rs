mod cache;
mod resolve;

use cache::CacheCommands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use storyvault_api::AssetClass;

#[derive(Parser)]
#[command(
    name = "storyvault",
    version,
    about = "Resolve children's story assets from cloud object storage",
    long_about = "Storyvault turns the loosely specified asset paths found in story records into \
                  readable text and playable media URLs. It normalizes paths, tries several \
                  retrieval strategies, relays blocked fetches through a proxy context and \
                  remembers what it resolved."
)]
pub struct Cli {
    /// JSON configuration file (bucket, origin, timeouts, cache directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the canonical storage key for a path
    Normalize {
        #[arg(value_name = "PATH")]
        path: String,

        /// Asset class used when the extension does not tell
        #[arg(long, default_value = "text")]
        class: AssetClass,
    },
    /// Resolve story text
    Text {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Resolve a playable audio URL
    Audio {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Resolve a displayable image URL
    Image {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Resolve every asset of a story record (JSON file)
    Story {
        #[arg(value_name = "RECORD")]
        record: PathBuf,
    },
    /// Inspect or clear the resource cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let _guard = storyvault_runtime::init_logging("cli", cli.verbose);
    let config = storyvault_runtime::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Normalize { path, class } => resolve::normalize(&config, &path, class),
        Commands::Cache(cmd) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cache::run(&config, cmd))
        }
        command => {
            let rt = tokio::runtime::Runtime::new()?;
            let engine = storyvault_runtime::build_default_engine(config)?;
            let result = rt.block_on(async {
                match command {
                    Commands::Text { path } => resolve::asset(&engine, AssetClass::Text, &path).await,
                    Commands::Audio { path } => {
                        resolve::asset(&engine, AssetClass::Audio, &path).await
                    }
                    Commands::Image { path } => {
                        resolve::asset(&engine, AssetClass::Image, &path).await
                    }
                    Commands::Story { record } => resolve::story(&engine, &record).await,
                    Commands::Normalize { .. } | Commands::Cache(_) => Ok(()),
                }
            });
            engine.shutdown();
            result
        }
    }
}
