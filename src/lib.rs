pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::http::{http_pipeline, HttpLookupPipeline, HttpPrimaryRegistry, HttpSecondaryRegistry};
pub use adapters::storage::LocalStorage;
pub use core::engine::{BatchOutcome, LookupEngine};
pub use core::lookup::LookupPipeline;
pub use core::worker_pool::{BatchReport, WorkerPool};
pub use domain::model::{BatchEvent, Identifier, Progress, ResultRow};
pub use utils::error::{Result, RuesError};
