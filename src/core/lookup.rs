use crate::core::merger::merge_records;
use crate::core::selector::select_candidate;
use crate::core::{CandidateRecord, Identifier, PrimaryRegistry, ResultRow, SecondaryRegistry};
use crate::domain::model::EnrichmentRecord;
use crate::utils::error::{Result, RuesError};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Two-stage enrichment for a single identifier:
/// primary search, candidate selection, best-effort detail lookup, merge.
pub struct LookupPipeline<P: PrimaryRegistry, S: SecondaryRegistry> {
    primary: P,
    secondary: S,
    timeout: Duration,
}

impl<P: PrimaryRegistry, S: SecondaryRegistry> LookupPipeline<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self::with_timeout(primary, secondary, DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds each registry call on its own.
    pub fn with_timeout(primary: P, secondary: S, timeout: Duration) -> Self {
        Self {
            primary,
            secondary,
            timeout,
        }
    }

    /// Fails with `NotFound` when the primary registry has no candidates,
    /// or with the primary call's timeout/transport error. Secondary
    /// failures never fail the lookup.
    pub async fn lookup(&self, identifier: &Identifier) -> Result<ResultRow> {
        let candidates = self.search_primary(identifier).await?;
        tracing::debug!(
            "NIT {}: {} candidate(s) from primary registry",
            identifier,
            candidates.len()
        );

        let candidate = select_candidate(&candidates).ok_or_else(|| RuesError::NotFound {
            identifier: identifier.to_string(),
        })?;

        let enrichment = self.fetch_enrichment(identifier, candidate).await;
        Ok(merge_records(
            identifier.as_str(),
            candidate,
            enrichment.as_ref(),
        ))
    }

    /// Same as [`lookup`](Self::lookup) but folds every error into the row.
    pub async fn lookup_row(&self, identifier: &Identifier) -> ResultRow {
        match self.lookup(identifier).await {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("❌ NIT {}: {}", identifier, e);
                ResultRow::failed(identifier, e.to_string())
            }
        }
    }

    async fn search_primary(&self, identifier: &Identifier) -> Result<Vec<CandidateRecord>> {
        match tokio::time::timeout(self.timeout, self.primary.search(identifier)).await {
            Ok(result) => result,
            Err(_) => Err(RuesError::Timeout {
                registry: "primary".to_string(),
                timeout: self.timeout,
            }),
        }
    }

    async fn fetch_enrichment(
        &self,
        identifier: &Identifier,
        candidate: &CandidateRecord,
    ) -> Option<EnrichmentRecord> {
        let key = candidate.compound_key();
        tracing::debug!("NIT {}: requesting detail {}", identifier, key);

        match tokio::time::timeout(self.timeout, self.secondary.detail(&key)).await {
            Ok(Ok(Some(record))) if record.is_usable() => Some(record),
            Ok(Ok(_)) => {
                tracing::debug!("NIT {}: no usable detail for {}, using primary data", identifier, key);
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("⚠️ NIT {}: detail lookup failed ({}), using primary data", identifier, e);
                None
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ NIT {}: detail lookup timed out after {:?}, using primary data",
                    identifier,
                    self.timeout
                );
                None
            }
        }
    }
}
