//! Retry tracker handlers: the suppression list and its explicit reversal.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::info;
use selectarr_core::metrics::RETRY_TRANSITIONS;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IgnoredEntry {
    pub key: String,
    pub failures: u32,
}

#[derive(Debug, Serialize)]
pub struct SuppressedResponse {
    /// Media keys no longer attempted.
    pub suppressed: Vec<String>,
    /// Items still retried, with their failure counts.
    pub ignored: Vec<IgnoredEntry>,
}

#[derive(Debug, Serialize)]
pub struct SuppressedErrorResponse {
    pub error: String,
}

/// GET /api/v1/suppressed
pub async fn list_suppressed(State(state): State<Arc<AppState>>) -> Json<SuppressedResponse> {
    let session = state.session();
    Json(SuppressedResponse {
        suppressed: session.suppressed().await,
        ignored: session
            .ignored()
            .await
            .into_iter()
            .map(|(key, failures)| IgnoredEntry { key, failures })
            .collect(),
    })
}

/// DELETE /api/v1/suppressed/{key}
///
/// Reverse a suppression so the item is attempted again next cycle.
pub async fn unsuppress(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, impl IntoResponse> {
    if state.session().unsuppress(&key).await {
        info!(key = %key, "Unsuppressed item");
        RETRY_TRANSITIONS.with_label_values(&["cleared"]).inc();
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(SuppressedErrorResponse {
                error: format!("Item is not suppressed: {}", key),
            }),
        ))
    }
}
