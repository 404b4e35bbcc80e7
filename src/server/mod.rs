//! HTTP API over the RAG pipeline.
//!
//! Routes mirror the ingestion/query split: `/data/*` reloads the index from
//! a document, `/rag` answers questions over it. All outbound calls are
//! blocking clients wrapped in `spawn_blocking`.


use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::RagError;
use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::EmbeddingClient;
use crate::fetcher::{DocumentFetcher, doc_url_from_id};
use crate::ingest::IngestPipeline;
use crate::llm::{self, LanguageModel};

/// Shared application state: explicitly constructed dependencies, one set per
/// process, handed to every request handler.
pub struct AppState {
    pub config: Config,
    pub store: VectorStore,
    pub embedder: EmbeddingClient,
    pub llm: Box<dyn LanguageModel>,
    pub fetcher: DocumentFetcher,
}

impl AppState {
    /// Construct all dependencies from the configuration.
    #[inline]
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = VectorStore::new(&config)
            .await
            .context("Failed to initialize vector store")?;
        let embedder =
            EmbeddingClient::new(&config).context("Failed to initialize embedding client")?;
        let llm = llm::from_config(&config).context("Failed to initialize language model")?;

        Ok(Self {
            config,
            store,
            embedder,
            llm,
            fetcher: DocumentFetcher::new(),
        })
    }

    fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(
            self.fetcher.clone(),
            self.embedder.clone(),
            self.store.clone(),
        )
    }
}

/// JSON error responses for the API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream failure: {0}")]
    Upstream(String),
    /// A backing service (embedding server, language model) is unreachable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    #[inline]
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<RagError> for ApiError {
    #[inline]
    fn from(err: RagError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Build the application router with all routes and middleware.
#[inline]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/rag", get(ask_question))
        .route("/data/ingest-id", post(ingest_by_id))
        .route("/data/ingest-url", post(ingest_by_url))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and run the HTTP server until shutdown.
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config).await?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Serving RAG API on {}", addr);
    axum::serve(listener, router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Server is UP" }))
}

#[derive(Debug, Deserialize)]
struct AskParams {
    q: String,
    limit: Option<usize>,
}

async fn ask_question(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AskParams>,
) -> Result<impl IntoResponse, ApiError> {
    let question = params.q.trim().to_string();
    if question.is_empty() {
        return Err(ApiError::BadRequest("query parameter 'q' is empty".to_string()));
    }
    let limit = params.limit.unwrap_or(state.config.search.limit);

    let embedder = state.embedder.clone();
    let embed_question = question.clone();
    let query_vector = tokio::task::spawn_blocking(move || embedder.embed_query(&embed_question))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::ServiceUnavailable(format!("Failed to embed question: {}", e)))?;

    let relevant = state.store.search(&query_vector, limit).await?;
    for chunk in &relevant {
        debug!("Retrieved chunk (score {:.3}): {}", chunk.score, chunk.text);
    }
    let context = relevant
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let llm_state = Arc::clone(&state);
    let llm_question = question.clone();
    let answer = tokio::task::spawn_blocking(move || {
        llm_state.llm.generate(&llm_question, &context)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?
    .map_err(|e| {
        error!("Generation failed: {}", e);
        ApiError::ServiceUnavailable(format!("Failed to generate answer: {}", e))
    })?;

    Ok(Json(json!({ "message": answer })))
}

#[derive(Debug, Deserialize)]
struct IngestIdParams {
    doc_id: String,
}

async fn ingest_by_id(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngestIdParams>,
) -> Result<impl IntoResponse, ApiError> {
    if params.doc_id.trim().is_empty() {
        return Err(ApiError::BadRequest("query parameter 'doc_id' is empty".to_string()));
    }
    let url = doc_url_from_id(params.doc_id.trim());
    run_ingest(&state, &url).await
}

#[derive(Debug, Deserialize)]
struct IngestUrlParams {
    url: String,
}

async fn ingest_by_url(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngestUrlParams>,
) -> Result<impl IntoResponse, ApiError> {
    crate::fetcher::extract_doc_id(&params.url)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    run_ingest(&state, &params.url).await
}

async fn run_ingest(state: &Arc<AppState>, url: &str) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.pipeline().ingest_url(url).await.map_err(|e| {
        error!("Ingestion failed: {}", e);
        ApiError::Upstream(format!("Data ingestion failed: {}", e))
    })?;

    Ok(Json(json!({
        "status": "Data ingested",
        "num_chunks": stats.chunks_stored,
    })))
}
