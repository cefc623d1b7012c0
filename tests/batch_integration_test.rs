use async_trait::async_trait;
use httpmock::prelude::*;
use rues_lookup::core::{
    CandidateRecord, CompoundKey, EnrichmentRecord, PrimaryRegistry, SecondaryRegistry,
};
use rues_lookup::{
    BatchEvent, HttpPrimaryRegistry, HttpSecondaryRegistry, Identifier, LocalStorage,
    LookupEngine, LookupPipeline, Result, WorkerPool,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn ids(values: &[&str]) -> Vec<Identifier> {
    values.iter().map(|v| Identifier::parse(v).unwrap()).collect()
}

#[tokio::test]
async fn test_end_to_end_batch_writes_csv_in_input_order() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start_async().await;
    for (nit, name, key) in [("111", "UNO S.A.S.", "1"), ("333", "TRES LTDA", "3")] {
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/primary")
                    .query_param("nit", nit);
                then.status(200).json_body(serde_json::json!([
                    {"nit": nit, "razon_social": name, "estado_matricula": "ACTIVA",
                     "codigo_camara": "1", "matricula": key, "cod_ciiu_act_econ_pri": "0111"}
                ]));
            })
            .await;
    }
    server
        .mock_async(|when, then| {
            when.method(GET).path("/primary").query_param("nit", "222");
            then.status(200).json_body(serde_json::json!([]));
        })
        .await;
    let detail_mock = server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/detail/");
            then.status(200)
                .json_body(serde_json::json!({"codigo_error": "0001", "registros": null}));
        })
        .await;

    let client = reqwest::Client::new();
    let pipeline = LookupPipeline::with_timeout(
        HttpPrimaryRegistry::new(client.clone(), server.url("/primary")),
        HttpSecondaryRegistry::new(client, server.url("/detail")),
        Duration::from_secs(5),
    );
    let engine = LookupEngine::new(
        WorkerPool::new(Arc::new(pipeline), 2),
        LocalStorage::new(output_path.clone()),
        output_path.clone(),
        "ResultadoRues.csv",
    );

    let outcome = engine.run(ids(&["111", "222", "333"])).await.unwrap();

    detail_mock.assert_hits_async(2).await;
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.output_path.ends_with("ResultadoRues.csv"));

    let csv = std::fs::read_to_string(temp_dir.path().join("ResultadoRues.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("NIT,Nombre Empresa"));
    assert!(lines[1].starts_with("111,UNO S.A.S."));
    assert!(lines[2].starts_with("222,"));
    assert!(lines[2].ends_with("No se encontraron registros para este NIT"));
    assert!(lines[3].starts_with("333,TRES LTDA"));
}

/// Primary registry that records the highest number of overlapping searches.
#[derive(Default)]
struct SlowPrimary {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl PrimaryRegistry for SlowPrimary {
    async fn search(&self, identifier: &Identifier) -> Result<Vec<CandidateRecord>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(vec![CandidateRecord {
            identifier: Some(identifier.to_string()),
            legal_name: Some(format!("EMPRESA {}", identifier)),
            status: Some("ACTIVA".to_string()),
            ..Default::default()
        }])
    }
}

struct NoDetail;

#[async_trait]
impl SecondaryRegistry for NoDetail {
    async fn detail(&self, _key: &CompoundKey) -> Result<Option<EnrichmentRecord>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_streamed_batch_respects_concurrency_limit() {
    let primary = Arc::new(SlowPrimary::default());
    let pipeline = Arc::new(LookupPipeline::new(primary.clone(), NoDetail));
    let pool = Arc::new(WorkerPool::new(pipeline, 3));

    let identifiers: Vec<Identifier> = (1..=12)
        .map(|i| Identifier::parse(&(5000 + i).to_string()).unwrap())
        .collect();
    let (handle, mut rx) = pool.spawn_stream(identifiers);

    let mut events: Vec<BatchEvent> = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let report = handle.await.unwrap();

    assert_eq!(events.len(), 12);
    assert_eq!(report.rows.len(), 12);
    assert_eq!(report.succeeded(), 12);
    assert!(primary.peak.load(Ordering::SeqCst) <= 3);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.progress.completed, i + 1);
        assert_eq!(event.progress.total, 12);
    }
    assert!(events.last().unwrap().progress.is_complete());
}
