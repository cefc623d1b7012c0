use crate::core::lookup::LookupPipeline;
use crate::core::worker_pool::DEFAULT_CONCURRENCY;
use crate::core::{Identifier, PrimaryRegistry, SecondaryRegistry};
use crate::utils::error::RuesError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Status code plus JSON body, independent of the HTTP framework serving it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupResponse {
    pub status: u16,
    pub body: Value,
}

impl LookupResponse {
    fn error(status: u16, identifier: Option<&str>, message: impl Into<String>) -> Self {
        let body = match identifier {
            Some(nit) => json!({ "nit": nit, "error": message.into() }),
            None => json!({ "error": message.into() }),
        };
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single-NIT lookup: 400 for a missing or malformed NIT (no registry
/// traffic), 404 when the primary registry has no records, 500 for any other
/// failure, 200 with the merged row otherwise.
pub async fn handle_lookup<P: PrimaryRegistry, S: SecondaryRegistry>(
    pipeline: &LookupPipeline<P, S>,
    nit: Option<&str>,
) -> LookupResponse {
    let identifier = match Identifier::parse(nit.unwrap_or_default()) {
        Ok(identifier) => identifier,
        Err(e) if e.is_client_error() => return LookupResponse::error(400, None, e.to_string()),
        Err(e) => return LookupResponse::error(500, nit, e.to_string()),
    };

    match pipeline.lookup(&identifier).await {
        Ok(row) => match serde_json::to_value(&row) {
            Ok(body) => LookupResponse { status: 200, body },
            Err(e) => LookupResponse::error(500, Some(identifier.as_str()), e.to_string()),
        },
        Err(e @ RuesError::NotFound { .. }) => {
            tracing::info!("NIT {} not found", identifier);
            LookupResponse::error(404, Some(identifier.as_str()), e.to_string())
        }
        Err(e) => {
            tracing::warn!("❌ Lookup for NIT {} failed: {}", identifier, e);
            LookupResponse::error(500, Some(identifier.as_str()), e.to_string())
        }
    }
}

/// Body of a batch request. Raw NITs are normalized like spreadsheet cells.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub nits: Vec<String>,
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl BatchRequest {
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.nits
            .iter()
            .filter_map(|raw| Identifier::normalize(raw))
            .collect()
    }

    pub fn concurrency_or_default(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }
}
