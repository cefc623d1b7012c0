use super::{
    validate_provider, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_FILE, DEFAULT_OUTPUT_PATH,
    DEFAULT_PRIMARY_ENDPOINT, DEFAULT_SECONDARY_ENDPOINT, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_file_extension, validate_path, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "rues-lookup")]
#[command(about = "Resolve NITs into company records using the RUES registries")]
pub struct CliConfig {
    /// File whose first column holds the NITs (.csv or .txt)
    #[arg(short, long)]
    pub input: String,

    /// TOML configuration file; replaces the registry, batch and output flags
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long, default_value = DEFAULT_PRIMARY_ENDPOINT)]
    pub primary_endpoint: String,

    #[arg(long, default_value = DEFAULT_SECONDARY_ENDPOINT)]
    pub secondary_endpoint: String,

    /// Number of NITs looked up at the same time
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-request timeout for each registry call
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    pub output_path: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn primary_endpoint(&self) -> &str {
        &self.primary_endpoint
    }

    fn secondary_endpoint(&self) -> &str {
        &self.secondary_endpoint
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_file(&self) -> &str {
        &self.output_file
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input)?;
        validate_file_extension("input", &self.input, &["csv", "txt"])?;
        if self.config.is_none() {
            validate_provider(self)?;
        }
        Ok(())
    }
}
