//! REST API endpoints.

use crate::state::{AppState, ConceptSummary};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chemkg::prelude::{ChemkgError, ConceptError, LearningPath, Trace};
use serde::{Deserialize, Serialize};

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{error}")]
    NotFound {
        error: String,
        suggestions: Vec<String>,
    },

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, suggestions) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::NotFound { error, suggestions } => {
                (StatusCode::NOT_FOUND, error, Some(suggestions))
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };
        (status, Json(ErrorResponse { error, suggestions })).into_response()
    }
}

impl From<ChemkgError> for ApiError {
    fn from(err: ChemkgError) -> Self {
        match err {
            ChemkgError::Concept(ConceptError::Unknown { name, suggestions }) => ApiError::NotFound {
                error: format!("Unknown concept: {}", name),
                suggestions,
            },
            ChemkgError::Concept(ConceptError::EmptyQuery) => {
                ApiError::BadRequest("query is empty".to_string())
            }
            other => {
                tracing::error!(error = %other, "request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing query parameter: {}", name)))
}

#[derive(Debug, Deserialize)]
pub struct TraceParams {
    pub q: Option<String>,
}

/// Prerequisite funnel for a concept or free-text question.
pub async fn trace(
    State(state): State<AppState>,
    Query(params): Query<TraceParams>,
) -> Result<Json<Trace>, ApiError> {
    let q = required(params.q, "q")?;
    tracing::info!(query = %q, "trace");
    Ok(Json(state.trace(q).await?))
}

#[derive(Debug, Deserialize)]
pub struct ConceptParams {
    #[serde(default = "default_min_count")]
    pub min_count: u64,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_min_count() -> u64 {
    10
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct ConceptsResponse {
    pub concepts: Vec<ConceptSummary>,
    pub total: usize,
}

/// Topics ordered by mention count.
pub async fn concepts(
    State(state): State<AppState>,
    Query(params): Query<ConceptParams>,
) -> Json<ConceptsResponse> {
    let concepts = state.concepts(params.min_count, params.limit);
    Json(ConceptsResponse {
        total: concepts.len(),
        concepts,
    })
}

#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub target: Option<String>,
    /// Comma-separated known concepts.
    #[serde(default)]
    pub known: Option<String>,
}

/// Learning path to a target, skipping known concepts.
pub async fn path(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> Result<Json<LearningPath>, ApiError> {
    let target = required(params.target, "target")?;
    let known: Vec<String> = params
        .known
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    Ok(Json(state.learning_path(target, known).await?))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub nodes: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        nodes: state.node_count(),
    })
}
