//! Authorization evaluation handlers.
//!
//! Check a single tuple, evaluate a batch, or fetch the caller's effective
//! permission snapshot for UI gating.

use axum::{
    extract::{Query, State},
    Json,
};
use hub_core::error::AppError;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    middleware::CurrentUser,
    models::{AssignmentDetail, PermissionAction, PermissionModule},
    services::{AccessDecision, AccessRequest},
    AppState,
};

/// Query for a single permission check.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthCheckQuery {
    pub module: PermissionModule,
    pub action: PermissionAction,
    pub resource_type: Option<String>,
    pub resource_owner_id: Option<Uuid>,
}

/// Single-check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthCheckResponse {
    pub module: PermissionModule,
    pub action: PermissionAction,
    #[serde(flatten)]
    pub decision: AccessDecision,
}

/// Batch evaluation request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EvaluateRequest {
    pub checks: Vec<AccessRequest>,
}

/// Batch evaluation response.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvaluateResponse {
    pub person_id: Uuid,
    pub all_allowed: bool,
    pub decisions: Vec<AccessDecision>,
}

/// Effective caller context snapshot.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthContextResponse {
    pub person_id: Uuid,
    pub church_id: Uuid,
    pub congregation_id: Option<Uuid>,
    pub role_code: String,
    pub security_level: i16,
    pub is_admin: bool,
    pub permissions: Vec<String>,
    pub assignments: Vec<AssignmentDetail>,
}

/// Check one permission tuple for the caller
#[utoipa::path(
    get,
    path = "/authz/check",
    params(AuthCheckQuery),
    responses(
        (status = 200, description = "Decision", body = AuthCheckResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn check(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Query(query): Query<AuthCheckQuery>,
) -> Result<Json<AuthCheckResponse>, AppError> {
    let mut request = AccessRequest::new(query.module, query.action);
    request.resource_type = query.resource_type;
    request.resource_owner_id = query.resource_owner_id;

    let decision = state.authz.decide(&ctx, &request).await?;
    Ok(Json(AuthCheckResponse {
        module: query.module,
        action: query.action,
        decision,
    }))
}

/// Evaluate a batch of permission tuples for the caller
#[utoipa::path(
    post,
    path = "/authz/evaluate",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Decisions", body = EvaluateResponse)
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn evaluate(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let mut decisions = Vec::with_capacity(req.checks.len());
    for check in &req.checks {
        decisions.push(state.authz.decide(&ctx, check).await?);
    }
    let all_allowed = decisions.iter().all(|d| d.allowed);

    Ok(Json(EvaluateResponse {
        person_id: ctx.person_id,
        all_allowed,
        decisions,
    }))
}

/// Get the caller's effective permission snapshot
#[utoipa::path(
    get,
    path = "/authz/context",
    responses(
        (status = 200, description = "Effective context", body = AuthContextResponse)
    ),
    tag = "Authorization",
    security(("bearer_auth" = []))
)]
pub async fn context(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<AuthContextResponse>, AppError> {
    let security_level = state.authz.get_user_security_level(&ctx).await?;
    let is_admin = state.authz.is_admin(&ctx).await?;
    let permissions = state.authz.effective_permissions(&ctx).await?;
    let assignments = state
        .db
        .find_assignment_details_for_person(ctx.person_id)
        .await?;

    Ok(Json(AuthContextResponse {
        person_id: ctx.person_id,
        church_id: ctx.church_id,
        congregation_id: ctx.congregation_id,
        role_code: ctx.role.as_str().to_string(),
        security_level,
        is_admin,
        permissions,
        assignments,
    }))
}
