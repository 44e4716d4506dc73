//! HTTP API over the loaded statute corpus.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service metadata and endpoint list |
//! | `POST` | `/ask` | Rank articles for a question |
//! | `GET`  | `/kanunlar` | Summaries of every loaded statute |
//! | `GET`  | `/health` | Loaded counts and model-ready flag |
//! | `GET`  | `/status` | Liveness check |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "internal", "message": "Soru işlenirken hata: ..." } }
//! ```
//!
//! Malformed request bodies are rejected by axum's `Json` extractor before
//! reaching a handler.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::loader::Loader;
use crate::models::{DocumentSummary, SearchResult};
use crate::service::{Health, KanunService};

/// Loads the corpus and serves the API until the process is terminated.
///
/// Startup order: embedding model, then documents from the manifest, then
/// the chunk index. Startup succeeds with however many documents loaded.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let embedder = create_embedder(&config.embedding).await?;
    if let Some(embedder) = &embedder {
        tracing::info!(model = embedder.model_name(), dims = embedder.dims(), "embedding model loaded");
    }

    let loader = Loader::new(config.source.clone())?;
    let documents = loader.load_all().await;

    let service = KanunService::build(
        documents,
        embedder,
        config.retrieval.clone(),
        config.embedding.batch_size,
    )
    .await;

    let app = build_router(Arc::new(service));

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// The API router with permissive CORS, ready to serve or to drive in tests.
pub fn build_router(service: Arc<KanunService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/ask", post(handle_ask))
        .route("/kanunlar", get(handle_kanunlar))
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .layer(cors)
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct Endpoints {
    ask: &'static str,
    kanunlar: &'static str,
    health: &'static str,
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
    loaded_kanunlar: usize,
    status: &'static str,
    endpoints: Endpoints,
}

async fn handle_root(State(service): State<Arc<KanunService>>) -> Json<RootResponse> {
    Json(RootResponse {
        message: "Kanun Sorgulama API",
        version: env!("CARGO_PKG_VERSION"),
        loaded_kanunlar: service.documents().len(),
        status: "ready",
        endpoints: Endpoints {
            ask: "/ask",
            kanunlar: "/kanunlar",
            health: "/health",
        },
    })
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
    /// Overrides `[retrieval].max_results` for this request.
    #[serde(default)]
    max_results: Option<usize>,
}

#[derive(Serialize)]
struct QuestionResponse {
    question: String,
    answers: Vec<SearchResult>,
    total_found: usize,
    status: &'static str,
}

async fn handle_ask(
    State(service): State<Arc<KanunService>>,
    Json(req): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, AppError> {
    let answers = service
        .ask(&req.question, req.max_results)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "question failed");
            internal(format!("Soru işlenirken hata: {}", e))
        })?;

    Ok(Json(QuestionResponse {
        question: req.question,
        total_found: answers.len(),
        answers,
        status: "success",
    }))
}

// ============ GET /kanunlar ============

#[derive(Serialize)]
struct KanunlarResponse {
    total: usize,
    kanunlar: Vec<DocumentSummary>,
}

async fn handle_kanunlar(State(service): State<Arc<KanunService>>) -> Json<KanunlarResponse> {
    let kanunlar = service.summaries();
    Json(KanunlarResponse {
        total: kanunlar.len(),
        kanunlar,
    })
}

// ============ GET /health, GET /status ============

async fn handle_health(State(service): State<Arc<KanunService>>) -> Json<Health> {
    Json(service.health())
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn handle_status() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}
