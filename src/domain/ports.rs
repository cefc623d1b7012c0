use crate::domain::model::{
    BatchEvent, CandidateRecord, CompoundKey, EnrichmentRecord, Identifier, Progress, ResultRow,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn primary_endpoint(&self) -> &str;
    fn secondary_endpoint(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn concurrency(&self) -> usize;
    fn output_path(&self) -> &str;
    fn output_file(&self) -> &str;
}

/// Open-data registry queried by NIT.
#[async_trait]
pub trait PrimaryRegistry: Send + Sync {
    async fn search(&self, identifier: &Identifier) -> Result<Vec<CandidateRecord>>;
}

/// Detail registry addressed by compound key. `Ok(None)` means the registry
/// answered but had nothing usable.
#[async_trait]
pub trait SecondaryRegistry: Send + Sync {
    async fn detail(&self, key: &CompoundKey) -> Result<Option<EnrichmentRecord>>;
}

#[async_trait]
impl<T: PrimaryRegistry + ?Sized> PrimaryRegistry for Arc<T> {
    async fn search(&self, identifier: &Identifier) -> Result<Vec<CandidateRecord>> {
        (**self).search(identifier).await
    }
}

#[async_trait]
impl<T: SecondaryRegistry + ?Sized> SecondaryRegistry for Arc<T> {
    async fn detail(&self, key: &CompoundKey) -> Result<Option<EnrichmentRecord>> {
        (**self).detail(key).await
    }
}

/// Receives batch lifecycle callbacks from the worker pool.
///
/// `on_completed` is invoked exactly once per identifier, serialized across
/// lanes, with `progress.completed` strictly increasing.
pub trait BatchObserver: Send + Sync {
    fn on_started(&self, _total: usize) {}

    fn on_completed(&self, row: &ResultRow, progress: Progress);

    fn on_finished(&self, _progress: Progress) {}
}

/// Forwards every completion into an unbounded channel.
impl BatchObserver for tokio::sync::mpsc::UnboundedSender<BatchEvent> {
    fn on_completed(&self, row: &ResultRow, progress: Progress) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(BatchEvent {
            row: row.clone(),
            progress,
        });
    }
}
