pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod proxy;
pub mod storage;

pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder, ResolvedStory};
pub use error::{Result, StoryvaultError};
pub use normalize::{PathNormalizer, normalize};
