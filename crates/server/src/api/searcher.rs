//! Searcher API handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use selectarr_core::{Release, SearchError, TargetIds};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

fn default_pattern() -> String {
    ".*".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Deviation pattern hits must match; everything by default.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub ids: Option<TargetIds>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub pattern: String,
    pub releases: Vec<Release>,
    pub duration_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_status(error: &SearchError) -> StatusCode {
    match error {
        SearchError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
        SearchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SearchError::ConnectionFailed(_) | SearchError::ApiError(_) => StatusCode::BAD_GATEWAY,
        SearchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/search
///
/// Run one ad-hoc query through the configured indexer pipeline.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, impl IntoResponse> {
    let searcher = match state.searcher() {
        Some(s) => s,
        None => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Search backend not configured".to_string(),
                }),
            ))
        }
    };

    let started = Instant::now();
    match searcher
        .scrape(&body.query, &body.pattern, body.ids.as_ref())
        .await
    {
        Ok(releases) => {
            let duration_ms = started.elapsed().as_millis() as u64;
            info!(
                searcher = searcher.name(),
                query = %body.query,
                releases = releases.len(),
                duration_ms,
                "Ad-hoc search"
            );
            Ok(Json(SearchResponse {
                query: body.query,
                pattern: body.pattern,
                releases,
                duration_ms,
            }))
        }
        Err(e) => Err((
            error_status(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}
