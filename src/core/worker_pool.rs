//! Bounded-concurrency batch executor.
//!
//! A fixed number of lanes drain a shared queue of identifiers. Each lane
//! claims one identifier at a time, runs the lookup pipeline and reports the
//! resulting row. Lanes are plain futures polled together, so concurrency is
//! bounded by the lane count rather than by spawned tasks.

use crate::core::lookup::LookupPipeline;
use crate::core::{
    BatchEvent, BatchObserver, Identifier, PrimaryRegistry, Progress, ResultRow,
    SecondaryRegistry,
};
use crate::utils::error::RuesError;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::{HashMap, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENCY: usize = 3;

/// Shared state of one batch run: the pending queue, the completion counter
/// and the rows emitted so far.
pub struct BatchState {
    queue: tokio::sync::Mutex<VecDeque<Identifier>>,
    completed: AtomicUsize,
    total: usize,
    rows: Mutex<Vec<ResultRow>>,
}

impl BatchState {
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        let total = identifiers.len();
        Self {
            queue: tokio::sync::Mutex::new(identifiers.into()),
            completed: AtomicUsize::new(0),
            total,
            rows: Mutex::new(Vec::with_capacity(total)),
        }
    }

    /// Removes and returns the next unclaimed identifier.
    pub async fn claim(&self) -> Option<Identifier> {
        self.queue.lock().await.pop_front()
    }

    pub async fn pending(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed.load(Ordering::SeqCst),
            total: self.total,
        }
    }

    /// Records a finished row and notifies the observer. Serialized so that
    /// observers see `completed` strictly increasing.
    fn complete<O: BatchObserver + ?Sized>(&self, row: ResultRow, observer: &O) -> Progress {
        let mut rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let progress = Progress {
            completed,
            total: self.total,
        };
        observer.on_completed(&row, progress);
        rows.push(row);
        progress
    }

    fn into_report(self) -> BatchReport {
        let progress = self.progress();
        BatchReport {
            rows: self.rows.into_inner().unwrap_or_else(PoisonError::into_inner),
            progress,
        }
    }
}

/// Rows of a finished batch, in completion order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub rows: Vec<ResultRow>,
    pub progress: Progress,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_error()).count()
    }

    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| r.is_error()).count()
    }

    /// Reorders rows to follow `input`. Repeated identifiers keep one row each.
    pub fn into_input_order(self, input: &[Identifier]) -> Vec<ResultRow> {
        let mut by_identifier: HashMap<String, VecDeque<ResultRow>> = HashMap::new();
        for row in self.rows {
            by_identifier
                .entry(row.identifier.clone())
                .or_default()
                .push_back(row);
        }

        let mut ordered = Vec::with_capacity(input.len());
        for identifier in input {
            if let Some(row) = by_identifier
                .get_mut(identifier.as_str())
                .and_then(VecDeque::pop_front)
            {
                ordered.push(row);
            }
        }
        ordered.extend(by_identifier.into_values().flatten());
        ordered
    }
}

pub struct WorkerPool<P: PrimaryRegistry, S: SecondaryRegistry> {
    pipeline: Arc<LookupPipeline<P, S>>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl<P: PrimaryRegistry, S: SecondaryRegistry> WorkerPool<P, S> {
    /// A concurrency of 0 is raised to 1.
    pub fn new(pipeline: Arc<LookupPipeline<P, S>>, concurrency: usize) -> Self {
        Self {
            pipeline,
            concurrency: concurrency.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Processes every identifier exactly once and returns once all lanes
    /// have exited.
    pub async fn run<O: BatchObserver + ?Sized>(
        &self,
        identifiers: Vec<Identifier>,
        observer: &O,
    ) -> BatchReport {
        let state = BatchState::new(identifiers);
        self.run_with_state(&state, observer).await;
        state.into_report()
    }

    /// Drives an externally owned [`BatchState`].
    pub async fn run_with_state<O: BatchObserver + ?Sized>(&self, state: &BatchState, observer: &O) {
        let total = state.total;
        let lanes = self.concurrency.min(total);
        tracing::info!(
            "🚀 Starting batch of {} NIT(s) with {} lane(s)",
            total,
            lanes
        );
        observer.on_started(total);

        join_all((0..lanes).map(|lane| self.lane(lane, state, observer))).await;

        let progress = state.progress();
        tracing::info!(
            "✅ Batch finished: {}/{} processed",
            progress.completed,
            progress.total
        );
        observer.on_finished(progress);
    }

    /// Runs the batch on a background task and streams each completion.
    /// The receiver closes once every identifier has been reported.
    pub fn spawn_stream(
        self: Arc<Self>,
        identifiers: Vec<Identifier>,
    ) -> (JoinHandle<BatchReport>, mpsc::UnboundedReceiver<BatchEvent>)
    where
        P: 'static,
        S: 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move { self.run(identifiers, &tx).await });
        (handle, rx)
    }

    async fn lane<O: BatchObserver + ?Sized>(&self, lane: usize, state: &BatchState, observer: &O) {
        let mut handled = 0usize;
        while let Some(identifier) = state.claim().await {
            let row = self.process(&identifier).await;
            state.complete(row, observer);
            handled += 1;
        }
        tracing::debug!("lane {} exiting after {} NIT(s)", lane, handled);
    }

    async fn process(&self, identifier: &Identifier) -> ResultRow {
        if self.cancel.is_cancelled() {
            return ResultRow::failed(identifier, RuesError::Cancelled.to_string());
        }

        let lookup = AssertUnwindSafe(self.pipeline.lookup_row(identifier)).catch_unwind();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                ResultRow::failed(identifier, RuesError::Cancelled.to_string())
            }
            outcome = lookup => match outcome {
                Ok(row) => row,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!("💥 NIT {}: lookup panicked: {}", identifier, message);
                    ResultRow::failed(identifier, RuesError::ProcessingError { message }.to_string())
                }
            },
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CandidateRecord, CompoundKey, EnrichmentRecord};
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Primary registry that tracks how many searches run at once.
    #[derive(Default)]
    struct CountingPrimary {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PrimaryRegistry for CountingPrimary {
        async fn search(&self, identifier: &Identifier) -> Result<Vec<CandidateRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            // uneven latency so completion order differs from input order
            let delay = 5 + (identifier.as_str().len() as u64 * 7) % 20;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match identifier.as_str() {
                "404" => Ok(vec![]),
                "500" => Err(RuesError::UnexpectedStatus {
                    registry: "primary".to_string(),
                    status: 500,
                }),
                "666" => panic!("malformed registry payload"),
                _ => Ok(vec![CandidateRecord {
                    legal_name: Some(format!("EMPRESA {}", identifier)),
                    status: Some("ACTIVA".to_string()),
                    ..Default::default()
                }]),
            }
        }
    }

    struct NoDetail;

    #[async_trait]
    impl SecondaryRegistry for NoDetail {
        async fn detail(&self, _key: &CompoundKey) -> Result<Option<EnrichmentRecord>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(ResultRow, Progress)>>,
        started: AtomicUsize,
        finished: Mutex<Option<Progress>>,
    }

    impl BatchObserver for Recorder {
        fn on_started(&self, total: usize) {
            self.started.store(total, Ordering::SeqCst);
        }

        fn on_completed(&self, row: &ResultRow, progress: Progress) {
            self.events.lock().unwrap().push((row.clone(), progress));
        }

        fn on_finished(&self, progress: Progress) {
            *self.finished.lock().unwrap() = Some(progress);
        }
    }

    fn ids(values: &[&str]) -> Vec<Identifier> {
        values.iter().map(|v| Identifier::parse(v).unwrap()).collect()
    }

    fn pool(primary: Arc<CountingPrimary>, concurrency: usize) -> WorkerPool<Arc<CountingPrimary>, NoDetail> {
        let pipeline = LookupPipeline::with_timeout(primary, NoDetail, Duration::from_secs(5));
        WorkerPool::new(Arc::new(pipeline), concurrency)
    }

    #[tokio::test]
    async fn test_every_identifier_yields_exactly_one_row() {
        let primary = Arc::new(CountingPrimary::default());
        let input: Vec<String> = (1..=25).map(|i| format!("{}", 1000 + i * 37)).collect();
        let input_refs: Vec<&str> = input.iter().map(String::as_str).collect();
        let identifiers = ids(&input_refs);

        let recorder = Recorder::default();
        let report = pool(primary.clone(), 3).run(identifiers.clone(), &recorder).await;

        assert_eq!(report.rows.len(), 25);
        let seen: HashSet<&str> = report.rows.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(seen.len(), 25);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 25);
        assert_eq!(report.progress, Progress { completed: 25, total: 25 });
        assert_eq!(recorder.events.lock().unwrap().len(), 25);
        assert_eq!(recorder.started.load(Ordering::SeqCst), 25);
        assert_eq!(
            *recorder.finished.lock().unwrap(),
            Some(Progress { completed: 25, total: 25 })
        );
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_is_respected() {
        for limit in [1, 2, 3, 5] {
            let primary = Arc::new(CountingPrimary::default());
            let identifiers: Vec<Identifier> = (1..=20)
                .map(|i| Identifier::parse(&format!("{}", 7000 + i)).unwrap())
                .collect();

            pool(primary.clone(), limit).run(identifiers, &Recorder::default()).await;

            let peak = primary.peak.load(Ordering::SeqCst);
            assert!(peak <= limit, "peak {} exceeded limit {}", peak, limit);
            assert!(peak >= 1);
        }
    }

    #[tokio::test]
    async fn test_progress_is_strictly_increasing() {
        let primary = Arc::new(CountingPrimary::default());
        let recorder = Recorder::default();
        pool(primary, 4)
            .run(ids(&["1", "22", "333", "4444", "55555", "666666", "7"]), &recorder)
            .await;

        let completed: Vec<usize> = recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.completed)
            .collect();
        assert_eq!(completed, (1..=7).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let primary = Arc::new(CountingPrimary::default());
        let report = pool(primary, 2)
            .run(ids(&["111", "404", "500", "666", "222"]), &Recorder::default())
            .await;

        let rows = report.clone().into_input_order(&ids(&["111", "404", "500", "666", "222"]));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].company_name, "EMPRESA 111");
        assert_eq!(
            rows[1].error.as_deref(),
            Some("No se encontraron registros para este NIT")
        );
        assert_eq!(
            rows[2].error.as_deref(),
            Some("primary registry answered with HTTP 500")
        );
        assert!(rows[3]
            .error
            .as_deref()
            .unwrap()
            .contains("malformed registry payload"));
        assert_eq!(rows[3].company_name, "");
        assert_eq!(rows[4].company_name, "EMPRESA 222");
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 3);
    }

    #[test]
    fn test_zero_concurrency_runs_one_lane() {
        let pool = pool(Arc::new(CountingPrimary::default()), 0);
        assert_eq!(pool.concurrency(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_completes_immediately() {
        let primary = Arc::new(CountingPrimary::default());
        let recorder = Recorder::default();
        let report = pool(primary, 3).run(vec![], &recorder).await;
        assert!(report.rows.is_empty());
        assert!(report.progress.is_complete());
        assert_eq!(*recorder.finished.lock().unwrap(), Some(Progress { completed: 0, total: 0 }));
    }

    #[tokio::test]
    async fn test_cancelled_batch_still_reports_every_identifier() {
        let primary = Arc::new(CountingPrimary::default());
        let token = CancellationToken::new();
        token.cancel();
        let pool = pool(primary.clone(), 2).with_cancellation(token);

        let report = pool.run(ids(&["1", "2", "3", "4"]), &Recorder::default()).await;

        assert_eq!(report.rows.len(), 4);
        assert!(report
            .rows
            .iter()
            .all(|r| r.error.as_deref() == Some("Consulta cancelada")));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    /// Primary registry slow enough to be interrupted mid-call.
    #[derive(Default)]
    struct SlowPrimary {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PrimaryRegistry for SlowPrimary {
        async fn search(&self, _identifier: &Identifier) -> Result<Vec<CandidateRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(vec![CandidateRecord::default()])
        }
    }

    #[tokio::test]
    async fn test_cancelling_in_flight_lookups_still_reports_every_identifier() {
        let primary = Arc::new(SlowPrimary::default());
        let pipeline = LookupPipeline::with_timeout(primary.clone(), NoDetail, Duration::from_secs(5));
        let pool = WorkerPool::new(Arc::new(pipeline), 2);

        let token = pool.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let report = pool
            .run(ids(&["1", "2", "3", "4", "5", "6"]), &Recorder::default())
            .await;

        assert_eq!(report.rows.len(), 6);
        assert!(report
            .rows
            .iter()
            .all(|r| r.error.as_deref() == Some("Consulta cancelada")));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.progress, Progress { completed: 6, total: 6 });
    }

    #[tokio::test]
    async fn test_run_with_state_exposes_live_progress() {
        let primary = Arc::new(CountingPrimary::default());
        let pool = pool(primary, 1);
        let identifiers: Vec<Identifier> = (0..8)
            .map(|i| Identifier::parse(&format!("{}", 1000 + i)).unwrap())
            .collect();
        let state = BatchState::new(identifiers);
        assert_eq!(state.pending().await, 8);

        let recorder = Recorder::default();
        let run = pool.run_with_state(&state, &recorder);
        let watch = async {
            let mut samples = Vec::new();
            loop {
                let progress = state.progress();
                samples.push(progress.completed);
                if progress.is_complete() {
                    break samples;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        };
        let ((), samples) = tokio::join!(run, watch);

        assert!(samples.windows(2).all(|w| w[0] <= w[1]));
        assert!(samples.iter().any(|&c| c > 0 && c < 8));
        assert_eq!(state.pending().await, 0);

        let report = state.into_report();
        assert_eq!(report.rows.len(), 8);
        assert_eq!(report.progress, Progress { completed: 8, total: 8 });
    }

    #[tokio::test]
    async fn test_spawn_stream_emits_all_events_then_closes() {
        let primary = Arc::new(CountingPrimary::default());
        let pool = Arc::new(pool(primary, 3));
        let (handle, mut rx) = pool.spawn_stream(ids(&["10", "20", "30", "40"]));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        let report = handle.await.unwrap();

        assert_eq!(events.len(), 4);
        assert_eq!(events.last().unwrap().progress, Progress { completed: 4, total: 4 });
        assert_eq!(report.rows.len(), 4);
    }

    #[test]
    fn test_into_input_order_handles_duplicates() {
        let row = |id: &str, name: &str| ResultRow {
            identifier: id.to_string(),
            company_name: name.to_string(),
            ..Default::default()
        };
        let report = BatchReport {
            rows: vec![row("2", "b"), row("1", "a1"), row("1", "a2")],
            progress: Progress { completed: 3, total: 3 },
        };
        let ordered = report.into_input_order(&ids(&["1", "2", "1"]));
        let names: Vec<&str> = ordered.iter().map(|r| r.company_name.as_str()).collect();
        assert_eq!(names, vec!["a1", "b", "a2"]);
    }
}
