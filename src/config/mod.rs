#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

pub use crate::adapters::http::{DEFAULT_PRIMARY_ENDPOINT, DEFAULT_SECONDARY_ENDPOINT};
pub use crate::core::worker_pool::DEFAULT_CONCURRENCY;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_OUTPUT_FILE: &str = "ResultadoRues.csv";
pub const MAX_CONCURRENCY: usize = 64;
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Checks shared by every configuration source.
pub(crate) fn validate_provider<C: crate::core::ConfigProvider + ?Sized>(
    config: &C,
) -> crate::utils::error::Result<()> {
    use crate::utils::validation::{validate_path, validate_range, validate_url};

    validate_url("primary_endpoint", config.primary_endpoint())?;
    validate_url("secondary_endpoint", config.secondary_endpoint())?;
    validate_range("concurrency", config.concurrency(), 1, MAX_CONCURRENCY)?;
    validate_range(
        "timeout_seconds",
        config.request_timeout().as_secs(),
        1,
        MAX_TIMEOUT_SECONDS,
    )?;
    validate_path("output_path", config.output_path())?;
    validate_path("output_file", config.output_file())?;
    Ok(())
}
