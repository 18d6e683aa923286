//! Administrative gate: requires seguranca:administrar on top of a session.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use hub_core::error::AppError;

use crate::models::{PermissionAction, PermissionModule};
use crate::services::CallerContext;
use crate::AppState;

/// Middleware guarding the administrative surface. Must run after
/// session_auth_middleware so the caller context is present.
pub async fn admin_guard_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let ctx = req
        .extensions()
        .get::<CallerContext>()
        .cloned()
        .ok_or_else(|| {
            AppError::AuthenticationRequired(anyhow::anyhow!("Not authenticated"))
        })?;

    state
        .authz
        .require(&ctx, PermissionModule::Seguranca, PermissionAction::Administrar)
        .await?;

    Ok(next.run(req).await)
}
