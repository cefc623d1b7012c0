use super::{
    validate_provider, DEFAULT_CONCURRENCY, DEFAULT_OUTPUT_FILE, DEFAULT_OUTPUT_PATH,
    DEFAULT_PRIMARY_ENDPOINT, DEFAULT_SECONDARY_ENDPOINT, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::ConfigProvider;
use crate::utils::error::{Result, RuesError};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub registry: RegistryConfig,
    pub batch: BatchConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub primary_endpoint: String,
    pub secondary_endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            primary_endpoint: DEFAULT_PRIMARY_ENDPOINT.to_string(),
            secondary_endpoint: DEFAULT_SECONDARY_ENDPOINT.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
            file: DEFAULT_OUTPUT_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| RuesError::ConfigError {
                message: format!("Cannot read {}: {}", path.as_ref().display(), e),
            })?;
        Self::from_toml_str(&content)
    }

    /// Parses a TOML document; `${VAR}` placeholders are replaced from the
    /// environment first. Missing sections fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| RuesError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Unset variables are left as-is so validation can point at them.
    fn substitute_env_vars(content: &str) -> String {
        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER
            .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }
}

impl ConfigProvider for TomlConfig {
    fn primary_endpoint(&self) -> &str {
        &self.registry.primary_endpoint
    }

    fn secondary_endpoint(&self) -> &str {
        &self.registry.secondary_endpoint
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.timeout_seconds)
    }

    fn concurrency(&self) -> usize {
        self.batch.concurrency
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_file(&self) -> &str {
        &self.output.file
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)?;
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(RuesError::InvalidConfigValueError {
                field: "server.bind_address".to_string(),
                value: self.server.bind_address.clone(),
                reason: "Expected host:port".to_string(),
            });
        }
        Ok(())
    }
}
