//! REST API handlers for the rules-retrieval service

use crate::answer::AnswerGenerator;
use crate::history::{HistoryEntry, HistoryStore};
use crate::retrieval::{InvalidInput, RetrievalEngine};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Minimum question length accepted by the API
const MIN_QUESTION_CHARS: usize = 5;

/// Shared, read-only application state
///
/// The engine is immutable after load, so handlers share it without
/// locking. Generator and history are optional collaborators; the search
/// result is returned whether or not they are configured or succeed.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RetrievalEngine>,
    pub generator: Option<Arc<dyn AnswerGenerator>>,
    pub history: Option<Arc<HistoryStore>>,
    pub default_top_k: usize,
}

/// Query parameters for /api/ask_rule
#[derive(Debug, Deserialize)]
pub struct AskQuery {
    /// The rules question
    question: String,
    /// Number of chunks to retrieve (default from config)
    top_k: Option<usize>,
}

/// Response for /api/ask_rule
#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub context: Vec<String>,
    pub answer: Option<String>,
    pub elapsed_ms: f64,
}

/// Query parameters for /api/history
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: usize,
}

fn default_history_limit() -> usize {
    10
}

/// Response for /api/history
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryEntry>,
}

/// Response for /api/stats
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub num_chunks: usize,
    pub embedding_dim: usize,
    pub model_id: String,
}

/// Response for /api/health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Retrieve rule context for a question, generate an answer when a
/// generator is configured, and log the interaction.
pub async fn ask_rule_handler(
    State(state): State<AppState>,
    Query(params): Query<AskQuery>,
) -> Result<Json<AskResponse>, (StatusCode, String)> {
    let start = Instant::now();

    if params.question.trim().chars().count() < MIN_QUESTION_CHARS {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("question must be at least {MIN_QUESTION_CHARS} characters"),
        ));
    }

    let top_k = params.top_k.unwrap_or(state.default_top_k);
    if top_k == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "top_k must be at least 1".to_string(),
        ));
    }

    let results = state
        .engine
        .search(&params.question, top_k)
        .map_err(|e| {
            let status = if e.downcast_ref::<InvalidInput>().is_some() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        })?;
    let context: Vec<String> = results.into_iter().map(|r| r.text).collect();

    let answer = match &state.generator {
        Some(generator) => {
            let answer = generator
                .generate(&params.question, &context)
                .await
                .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

            // Best effort: a failed save never fails the request.
            if let Some(history) = &state.history {
                if let Err(e) = history.save(&params.question, &context, &answer) {
                    warn!(error = %e, "Failed to save history entry");
                }
            }

            Some(answer)
        }
        None => None,
    };

    info!(
        question = %params.question,
        top_k,
        context_chunks = context.len(),
        answered = answer.is_some(),
        "Question served"
    );

    Ok(Json(AskResponse {
        question: params.question,
        context,
        answer,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

/// Latest logged interactions, newest first
pub async fn history_handler(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let Some(history) = &state.history else {
        return Err((
            StatusCode::NOT_FOUND,
            "history logging is disabled".to_string(),
        ));
    };

    let entries = history
        .recent(params.limit)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(HistoryResponse { entries }))
}

/// Engine statistics
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.engine.stats();
    Json(StatsResponse {
        num_chunks: stats.num_chunks,
        embedding_dim: stats.embedding_dim,
        model_id: stats.model_id,
    })
}

/// Handle health check requests
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
