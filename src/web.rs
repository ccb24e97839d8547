//! HTTP daemon exposing the query surface and the batch trigger.
//!
//! The similarity endpoint does model inference, so its work is pushed
//! onto the blocking pool instead of running on the async workers.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::signal;

use crate::embedding::{EmbeddingError, ServiceEmbedding};
use crate::events::{DetectedEvent, UserSignals};
use crate::orchestrator::{MiningRun, MlOrchestrator};

#[derive(Clone)]
struct SharedState {
    orchestrator: Arc<MlOrchestrator>,
}

pub fn start_daemon(orchestrator: Arc<MlOrchestrator>, listen: String) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(orchestrator, listen).await });
}

async fn start_app(orchestrator: Arc<MlOrchestrator>, listen: String) {
    let shared_state = Arc::new(SharedState { orchestrator });

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let app = Router::new()
        .route("/api/embed_service", post(embed_service))
        .route("/api/similar", post(similar))
        .route("/api/events/detect", post(detect))
        .route("/api/patterns/mine", post(mine))
        .route("/api/health", get(health))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind(&listen).await.unwrap();
    log::info!("listening on {listen}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("either query_text or query_vector is required")]
    MissingQuery,

    #[error("a mining run is already in flight")]
    MiningInFlight,

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug)]
struct HttpError(ApiError);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        match self.0 {
            ApiError::MissingQuery => (
                axum::http::StatusCode::BAD_REQUEST,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            ApiError::MiningInFlight => (
                axum::http::StatusCode::CONFLICT,
                json!({"error": self.0.to_string()}).to_string(),
            ),
            ApiError::Embedding(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
            ApiError::Internal(_) => {
                log::error!("{self:?}");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.0.to_string()}).to_string(),
                )
            }
        }
        .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<ApiError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

fn default_top_k() -> usize {
    10
}

#[derive(Debug, Deserialize)]
struct EmbedServiceRequest {
    service_id: String,
    name: String,
    #[serde(default)]
    description: String,
    category_name: String,
    #[serde(default)]
    tags: Vec<String>,
    vendor_id: String,
}

/// Materialize a `ServiceEmbedding` for the caller's pool. The caller
/// resolves `category_id` afterwards; it is returned empty.
async fn embed_service(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<EmbedServiceRequest>,
) -> Result<Json<ServiceEmbedding>, HttpError> {
    let orchestrator = state.orchestrator.clone();

    let embedding = tokio::task::spawn_blocking(move || {
        orchestrator.embeddings().embed_service(
            &payload.service_id,
            &payload.name,
            &payload.description,
            &payload.category_name,
            &payload.tags,
            &payload.vendor_id,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .map_err(ApiError::Embedding)?;

    Ok(Json(embedding))
}

#[derive(Debug, Deserialize)]
struct SimilarRequest {
    /// Query text to embed; ignored when `query_vector` is supplied
    query_text: Option<String>,
    /// Pre-computed query vector
    query_vector: Option<Vec<f32>>,
    /// Candidate pool to rank; the caller owns embedding persistence
    candidates: Vec<ServiceEmbedding>,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default)]
    exclude_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SimilarHit {
    service_id: String,
    score: f32,
}

#[derive(Debug, Serialize)]
struct SimilarResponse {
    results: Vec<SimilarHit>,
    /// True when running on the fallback encoder; scores carry no
    /// semantic meaning in that mode
    degraded: bool,
}

async fn similar(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<SimilarRequest>,
) -> Result<Json<SimilarResponse>, HttpError> {
    let orchestrator = state.orchestrator.clone();

    let response = tokio::task::spawn_blocking(move || -> Result<SimilarResponse, ApiError> {
        let ranked = match (payload.query_vector, payload.query_text) {
            (Some(vector), _) => orchestrator.similar_by_vector(
                &vector,
                &payload.candidates,
                payload.top_k,
                &payload.exclude_ids,
            ),
            (None, Some(text)) => orchestrator.similar_services(
                &text,
                &payload.candidates,
                payload.top_k,
                &payload.exclude_ids,
            )?,
            (None, None) => return Err(ApiError::MissingQuery),
        };

        let results = ranked
            .into_iter()
            .map(|ranked| SimilarHit {
                service_id: ranked.embedding.service_id.clone(),
                score: ranked.score,
            })
            .collect();

        Ok(SimilarResponse {
            results,
            degraded: orchestrator.embeddings().is_degraded(),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(response))
}

async fn detect(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<UserSignals>,
) -> Json<Vec<DetectedEvent>> {
    Json(state.orchestrator.detect_events(&payload))
}

#[derive(Debug, Default, Deserialize)]
struct MineRequest {
    event_type: Option<String>,
    time_window_days: Option<i64>,
}

async fn mine(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<MineRequest>,
) -> Result<impl IntoResponse, HttpError> {
    let orchestrator = state.orchestrator.clone();

    let run = tokio::task::spawn_blocking(move || {
        orchestrator.run_daily_jobs(payload.event_type.as_deref(), payload.time_window_days)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    match run {
        MiningRun::Completed { rules } => {
            Ok(Json(json!({"status": "completed", "rules": rules})))
        }
        MiningRun::Aborted => Ok(Json(json!({"status": "aborted", "rules": 0}))),
        MiningRun::InFlight => Err(ApiError::MiningInFlight.into()),
    }
}

async fn health(State(state): State<Arc<SharedState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "degraded": state.orchestrator.embeddings().is_degraded(),
        "dimensions": state.orchestrator.embeddings().dimensions(),
    }))
}
