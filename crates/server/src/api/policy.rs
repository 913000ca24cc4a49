//! Release policy state handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::info;
use selectarr_core::policy::PolicyState;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PolicyErrorResponse {
    pub error: String,
}

/// GET /api/v1/policy
///
/// The persisted 4K timers and upgrade queue.
pub async fn get_policy(State(state): State<Arc<AppState>>) -> Json<PolicyState> {
    Json(state.policy().store().snapshot().await)
}

/// DELETE /api/v1/policy/upgrades/{key}
///
/// Drop an entry from the upgrade queue.
pub async fn remove_upgrade(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<StatusCode, impl IntoResponse> {
    if state.policy().remove_upgrade(&key).await {
        info!(key = %key, "Removed upgrade queue entry");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(PolicyErrorResponse {
                error: format!("No upgrade queue entry for {}", key),
            }),
        ))
    }
}
