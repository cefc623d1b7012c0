use crate::core::lookup::LookupPipeline;
use crate::core::{
    CandidateRecord, CompoundKey, ConfigProvider, EnrichmentRecord, Identifier, PrimaryRegistry,
    SecondaryRegistry,
};
use crate::domain::model::DetailEnvelope;
use crate::utils::error::{Result, RuesError};
use async_trait::async_trait;
use reqwest::Client;

pub const DEFAULT_PRIMARY_ENDPOINT: &str = "https://www.datos.gov.co/resource/c82u-588k.json";
pub const DEFAULT_SECONDARY_ENDPOINT: &str =
    "https://ruesapi.rues.org.co/WEB2/api/Expediente/DetalleRM";

pub type HttpLookupPipeline = LookupPipeline<HttpPrimaryRegistry, HttpSecondaryRegistry>;

/// Open-data company registry, queried with `?nit=<id>`.
#[derive(Debug, Clone)]
pub struct HttpPrimaryRegistry {
    client: Client,
    endpoint: String,
}

impl HttpPrimaryRegistry {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PrimaryRegistry for HttpPrimaryRegistry {
    async fn search(&self, identifier: &Identifier) -> Result<Vec<CandidateRecord>> {
        tracing::debug!("Making primary request to: {}?nit={}", self.endpoint, identifier);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("nit", identifier.as_str())])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Primary response status: {}", status);
        if !status.is_success() {
            return Err(RuesError::UnexpectedStatus {
                registry: "primary".to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Vec<CandidateRecord>>().await?)
    }
}

/// RUES detail registry, addressed by `<endpoint>/<compound key>`.
#[derive(Debug, Clone)]
pub struct HttpSecondaryRegistry {
    client: Client,
    endpoint: String,
}

impl HttpSecondaryRegistry {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn url_for(&self, key: &CompoundKey) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl SecondaryRegistry for HttpSecondaryRegistry {
    async fn detail(&self, key: &CompoundKey) -> Result<Option<EnrichmentRecord>> {
        let url = self.url_for(key);
        tracing::debug!("Making detail request to: {}", url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuesError::UnexpectedStatus {
                registry: "secondary".to_string(),
                status: status.as_u16(),
            });
        }

        let envelope: DetailEnvelope = response.json().await?;
        if envelope.code.as_deref() != Some(crate::domain::model::SUCCESS_CODE) {
            tracing::debug!("Detail {} answered codigo_error {:?}", key, envelope.code);
        }
        Ok(envelope.into_enrichment())
    }
}

/// Wires both HTTP registries into a pipeline using one shared client.
pub fn http_pipeline<C: ConfigProvider + ?Sized>(config: &C) -> HttpLookupPipeline {
    let client = Client::new();
    LookupPipeline::with_timeout(
        HttpPrimaryRegistry::new(client.clone(), config.primary_endpoint()),
        HttpSecondaryRegistry::new(client, config.secondary_endpoint()),
        config.request_timeout(),
    )
}
