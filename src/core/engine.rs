use crate::adapters::export::rows_to_csv;
use crate::core::worker_pool::WorkerPool;
use crate::core::{
    BatchObserver, Identifier, PrimaryRegistry, Progress, ResultRow, SecondaryRegistry, Storage,
};
use crate::utils::error::Result;

/// Logs each completion the way the batch progress bar reads.
pub struct LoggingObserver;

impl BatchObserver for LoggingObserver {
    fn on_started(&self, total: usize) {
        tracing::info!("📋 {} NIT(s) queued", total);
    }

    fn on_completed(&self, row: &ResultRow, progress: Progress) {
        match &row.error {
            None => tracing::info!(
                "🔍 Procesando {}/{} ({:.0}%) - NIT {}: {}",
                progress.completed,
                progress.total,
                progress.percent(),
                row.identifier,
                row.company_name
            ),
            Some(error) => tracing::warn!(
                "🔍 Procesando {}/{} ({:.0}%) - NIT {}: {}",
                progress.completed,
                progress.total,
                progress.percent(),
                row.identifier,
                error
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub output_path: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs a batch end to end: lookup every identifier, restore input order,
/// export the rows through `Storage`.
pub struct LookupEngine<P: PrimaryRegistry, S: SecondaryRegistry, St: Storage> {
    pool: WorkerPool<P, S>,
    storage: St,
    output_path: String,
    output_file: String,
}

impl<P: PrimaryRegistry, S: SecondaryRegistry, St: Storage> LookupEngine<P, S, St> {
    pub fn new(
        pool: WorkerPool<P, S>,
        storage: St,
        output_path: impl Into<String>,
        output_file: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            storage,
            output_path: output_path.into(),
            output_file: output_file.into(),
        }
    }

    pub async fn run(&self, identifiers: Vec<Identifier>) -> Result<BatchOutcome> {
        self.run_with_observer(identifiers, &LoggingObserver).await
    }

    pub async fn run_with_observer<O: BatchObserver + ?Sized>(
        &self,
        identifiers: Vec<Identifier>,
        observer: &O,
    ) -> Result<BatchOutcome> {
        let report = self.pool.run(identifiers.clone(), observer).await;
        let (succeeded, failed) = (report.succeeded(), report.failed());

        let rows = report.into_input_order(&identifiers);
        let data = rows_to_csv(&rows)?;
        tracing::debug!("Writing {} bytes to {}", data.len(), self.output_file);
        self.storage.write_file(&self.output_file, &data).await?;

        let output_path = std::path::Path::new(&self.output_path)
            .join(&self.output_file)
            .to_string_lossy()
            .into_owned();
        tracing::info!("💾 Results saved to {}", output_path);

        Ok(BatchOutcome {
            output_path,
            total: rows.len(),
            succeeded,
            failed,
        })
    }
}
