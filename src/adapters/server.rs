use crate::adapters::http::HttpLookupPipeline;
use crate::config::MAX_CONCURRENCY;
use crate::core::endpoint::{handle_lookup, BatchRequest};
use crate::core::worker_pool::WorkerPool;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::{stream, Stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ServerState {
    pipeline: Arc<HttpLookupPipeline>,
}

impl ServerState {
    pub fn new(pipeline: HttpLookupPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/rues/lookup", get(lookup))
        .route("/api/rues/batch", post(batch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn lookup(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let nit = params.get("nit").map(String::as_str);
    let response = handle_lookup(state.pipeline.as_ref(), nit).await;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body)).into_response()
}

/// Streams one `result` event per NIT as it completes, then a `done` event
/// carrying the final progress. Dropping the connection cancels pending work.
async fn batch(
    State(state): State<ServerState>,
    Json(request): Json<BatchRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let identifiers = request.identifiers();
    let concurrency = request.concurrency_or_default().min(MAX_CONCURRENCY);
    tracing::info!(
        "📥 Batch request: {} NIT(s), concurrency {}",
        identifiers.len(),
        concurrency
    );

    let pool = Arc::new(WorkerPool::new(state.pipeline.clone(), concurrency));
    let guard = pool.cancellation_token().drop_guard();
    let (handle, rx) = pool.spawn_stream(identifiers);

    let results = UnboundedReceiverStream::new(rx)
        .map(|event| Event::default().event("result").json_data(&event));
    let done = stream::once(async move {
        let _guard = guard;
        match handle.await {
            Ok(report) => Event::default().event("done").json_data(report.progress),
            Err(e) => {
                tracing::error!("❌ Batch task failed: {}", e);
                Ok(Event::default().event("error").data(e.to_string()))
            }
        }
    });

    Sse::new(results.chain(done)).keep_alive(KeepAlive::default())
}
