//! Internal maintenance endpoints, triggered cron-like by the operator.

use axum::{extract::State, Json};
use hub_core::error::AppError;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    models::{AuditAction, AuditLogEntry},
    AppState,
};

/// Result of a session sweep.
#[derive(Debug, Serialize, ToSchema)]
pub struct CleanupResponse {
    pub swept: u64,
}

/// Sweep expired sessions
#[utoipa::path(
    post,
    path = "/internal/sessions/cleanup",
    responses(
        (status = 200, description = "Sweep result", body = CleanupResponse)
    ),
    tag = "Administration",
    security(("bearer_auth" = []))
)]
pub async fn cleanup_sessions(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, AppError> {
    let swept = state.sessions.cleanup_expired().await?;

    if swept > 0 {
        state.audit.record(
            AuditLogEntry::system_action(AuditAction::SessionsSwept, Some("sessao".to_string()), None)
                .with_metadata(serde_json::json!({ "swept": swept })),
        );
    }

    Ok(Json(CleanupResponse { swept }))
}
