//! Person handlers: own profile plus a permission-gated directory view.

use axum::{
    extract::{Path, State},
    Json,
};
use hub_core::error::AppError;
use uuid::Uuid;

use crate::{
    middleware::CurrentUser,
    models::{
        AuditAction, AuditLogEntry, PermissionAction, PermissionModule, PersonResponse,
        UpdatePersonRequest,
    },
    services::ServiceError,
    AppState,
};

/// Get the caller's own person record
#[utoipa::path(
    get,
    path = "/people/me",
    responses(
        (status = 200, description = "Caller's person record", body = PersonResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "People",
    security(("bearer_auth" = []))
)]
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<PersonResponse>, AppError> {
    let person = state
        .db
        .find_person_by_id(ctx.person_id)
        .await?
        .ok_or(ServiceError::PersonNotFound)?;
    Ok(Json(person.into()))
}

/// Update the caller's own editable fields.
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Json(req): Json<UpdatePersonRequest>,
) -> Result<Json<PersonResponse>, AppError> {
    let mut person = state
        .db
        .find_person_by_id(ctx.person_id)
        .await?
        .ok_or(ServiceError::PersonNotFound)?;

    let before = serde_json::json!({
        "full_name": person.full_name,
        "phone": person.phone,
        "congregation_id": person.congregation_id,
    });

    if let Some(full_name) = req.full_name {
        person.full_name = full_name;
    }
    if req.phone.is_some() {
        person.phone = req.phone;
    }
    if req.congregation_id.is_some() {
        person.congregation_id = req.congregation_id;
    }

    state.db.update_person(&person).await?;

    state.audit.record(
        AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::PersonUpdated,
            Some("pessoa".to_string()),
            Some(person.person_id),
        )
        .with_snapshots(
            Some(before),
            Some(serde_json::json!({
                "full_name": person.full_name,
                "phone": person.phone,
                "congregation_id": person.congregation_id,
            })),
        ),
    );

    Ok(Json(person.into()))
}

/// List active people in the caller's church. Requires pessoas:visualizar.
pub async fn list_people(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<Vec<PersonResponse>>, AppError> {
    state
        .authz
        .require(&ctx, PermissionModule::Pessoas, PermissionAction::Visualizar)
        .await?;

    let people = state.db.find_people_by_church(ctx.church_id).await?;
    Ok(Json(people.into_iter().map(PersonResponse::from).collect()))
}

/// Get one person. Requires pessoas:visualizar and the same church.
pub async fn get_person(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(person_id): Path<Uuid>,
) -> Result<Json<PersonResponse>, AppError> {
    state
        .authz
        .require(&ctx, PermissionModule::Pessoas, PermissionAction::Visualizar)
        .await?;

    let person = state
        .db
        .find_person_by_id(person_id)
        .await?
        .filter(|p| p.church_id == ctx.church_id)
        .ok_or(ServiceError::PersonNotFound)?;

    Ok(Json(person.into()))
}
