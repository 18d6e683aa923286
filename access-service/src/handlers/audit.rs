//! Audit log and security event query handlers (admin surface).

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use hub_core::error::AppError;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    models::{AuditLogResponse, SecurityEventResponse},
    AppState,
};

/// Filters for the audit log query.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    pub actor_person_id: Option<Uuid>,
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub from_utc: Option<DateTime<Utc>>,
    pub to_utc: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Paginated audit log page.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogPage {
    pub entries: Vec<AuditLogResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query the audit log
#[utoipa::path(
    get,
    path = "/admin/audit-logs",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Audit log page", body = AuditLogPage)
    ),
    tag = "Administration",
    security(("bearer_auth" = []))
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> Result<Json<AuditLogPage>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);

    let (entries, total) = state
        .db
        .find_audit_logs(
            query.actor_person_id,
            query.action.as_deref(),
            query.resource_type.as_deref(),
            query.resource_id,
            query.from_utc,
            query.to_utc,
            limit,
            offset,
        )
        .await?;

    Ok(Json(AuditLogPage {
        entries: entries.into_iter().map(AuditLogResponse::from).collect(),
        total,
        limit,
        offset,
    }))
}

/// Filters for the security event query.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SecurityEventQuery {
    pub person_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// List recent security events.
pub async fn list_security_events(
    State(state): State<AppState>,
    Query(query): Query<SecurityEventQuery>,
) -> Result<Json<Vec<SecurityEventResponse>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);

    let events = state
        .db
        .find_security_events(query.person_id, limit, offset)
        .await?;

    Ok(Json(
        events.into_iter().map(SecurityEventResponse::from).collect(),
    ))
}
