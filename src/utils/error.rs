use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuesError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("El parámetro 'nit' es requerido")]
    MissingIdentifier,

    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("No se encontraron registros para este NIT")]
    NotFound { identifier: String },

    #[error("{registry} registry lookup timed out after {timeout:?}")]
    Timeout { registry: String, timeout: Duration },

    #[error("{registry} registry answered with HTTP {status}")]
    UnexpectedStatus { registry: String, status: u16 },

    #[error("Consulta cancelada")]
    Cancelled,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

impl RuesError {
    /// Client-side errors are rejected before any registry is contacted.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RuesError::MissingIdentifier | RuesError::InvalidIdentifier { .. }
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            RuesError::ConfigError { .. }
                | RuesError::ConfigValidationError { .. }
                | RuesError::InvalidConfigValueError { .. }
                | RuesError::MissingConfigError { .. }
        )
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RuesError::ApiError(e) if e.is_connect() => {
                "Could not connect to the registry".to_string()
            }
            RuesError::IoError(e) => format!("File access failed: {}", e),
            RuesError::CsvError(e) => format!("Could not read the identifier file: {}", e),
            e if e.is_config_error() => format!("Invalid configuration: {}", e),
            e => e.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RuesError::ApiError(_) | RuesError::Timeout { .. } => {
                "Check network connectivity to the registries or raise the request timeout"
            }
            RuesError::UnexpectedStatus { .. } => {
                "The registry may be temporarily unavailable; try again later"
            }
            RuesError::IoError(_) | RuesError::CsvError(_) => {
                "Make sure the input file exists and its first column holds the NITs"
            }
            RuesError::MissingIdentifier | RuesError::InvalidIdentifier { .. } => {
                "Provide a NIT made of 1 to 9 digits"
            }
            e if e.is_config_error() => "Review the configuration file and command-line flags",
            _ => "Re-run with --verbose for more details",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuesError>;
