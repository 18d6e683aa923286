//! Administrative handlers for security profiles, grants, and assignments.
//!
//! Grant and assignment mutations are sensitive permission changes: their
//! audit writes are fail-closed, so the mutation is rejected when the audit
//! trail cannot be written.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use hub_core::error::AppError;
use uuid::Uuid;

use crate::{
    middleware::CurrentUser,
    models::{
        AssignProfileRequest, AssignmentResponse, AuditAction, AuditLogEntry, AuditSeverity,
        CreatePermissionRequest, CreateProfileRequest, GrantDetail, Permission,
        PermissionResponse, ProfilePermissionGrant, ProfileResponse, ProfileWithGrants,
        SecurityProfile, SetGrantRequest, UpdateProfileRequest, UserProfileAssignment,
    },
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

// ==================== Profiles ====================

/// Create a security profile
#[utoipa::path(
    post,
    path = "/admin/profiles",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 409, description = "Profile name already exists")
    ),
    tag = "Administration",
    security(("bearer_auth" = []))
)]
pub async fn create_profile(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut profile = SecurityProfile::new(req.name, req.display_name, req.level);
    profile.description = req.description;
    profile.color = req.color;
    profile.icon = req.icon;

    state.db.insert_profile(&profile).await?;

    state.audit.record(
        AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::ProfileCreated,
            Some("perfil_seguranca".to_string()),
            Some(profile.profile_id),
        )
        .with_snapshots(None, serde_json::to_value(&profile).ok()),
    );

    Ok((StatusCode::CREATED, Json(ProfileResponse::from(profile))))
}

/// List all profiles.
pub async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfileResponse>>, AppError> {
    let profiles = state.db.find_profiles().await?;
    Ok(Json(profiles.into_iter().map(ProfileResponse::from).collect()))
}

/// Get one profile with its grants.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<ProfileWithGrants>, AppError> {
    let profile = state
        .db
        .find_profile_by_id(profile_id)
        .await?
        .ok_or(ServiceError::ProfileNotFound)?;

    let grants = state.db.find_grant_details_for_profile(profile_id).await?;
    let mut grant_details = Vec::with_capacity(grants.len());
    for grant in grants {
        let permission = state
            .db
            .find_permission_by_id(grant.permission_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Grant {} references missing permission",
                    grant.grant_id
                ))
            })?;
        grant_details.push(GrantDetail {
            grant_id: grant.grant_id,
            granted: grant.granted,
            conditions: grant.conditions,
            permission: PermissionResponse::from(permission),
        });
    }

    Ok(Json(ProfileWithGrants {
        profile: ProfileResponse::from(profile),
        grants: grant_details,
    }))
}

/// Update a profile's mutable fields.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(profile_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let mut profile = state
        .db
        .find_profile_by_id(profile_id)
        .await?
        .ok_or(ServiceError::ProfileNotFound)?;

    let before = serde_json::to_value(&profile).ok();

    if let Some(display_name) = req.display_name {
        profile.display_name = display_name;
    }
    if req.description.is_some() {
        profile.description = req.description;
    }
    if req.color.is_some() {
        profile.color = req.color;
    }
    if req.icon.is_some() {
        profile.icon = req.icon;
    }
    if let Some(level) = req.level {
        profile.level = level;
    }
    if let Some(active) = req.active {
        if !active && !profile.can_delete() {
            return Err(ServiceError::SystemProfileProtected.into());
        }
        profile.active_flag = active;
    }

    state.db.update_profile(&profile).await?;

    state
        .audit
        .record_required(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::ProfileUpdated,
                Some("perfil_seguranca".to_string()),
                Some(profile.profile_id),
            )
            .with_snapshots(before, serde_json::to_value(&profile).ok()),
        )
        .await?;

    Ok(Json(ProfileResponse::from(profile)))
}

/// Deactivate a profile. System profiles are protected.
pub async fn deactivate_profile(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(profile_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .db
        .find_profile_by_id(profile_id)
        .await?
        .ok_or(ServiceError::ProfileNotFound)?;

    if !profile.can_delete() {
        return Err(ServiceError::SystemProfileProtected.into());
    }

    // Fail closed: deactivating a profile changes effective permissions.
    state
        .audit
        .record_required(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::ProfileDeactivated,
                Some("perfil_seguranca".to_string()),
                Some(profile_id),
            )
            .with_severity(AuditSeverity::Warning),
        )
        .await?;

    state.db.deactivate_profile(profile_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ==================== Grants ====================

/// Set (insert or replace) a grant on a profile
#[utoipa::path(
    put,
    path = "/admin/profiles/{profile_id}/grants",
    request_body = SetGrantRequest,
    params(("profile_id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 204, description = "Grant stored"),
        (status = 404, description = "Profile or permission not found")
    ),
    tag = "Administration",
    security(("bearer_auth" = []))
)]
pub async fn set_grant(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(profile_id): Path<Uuid>,
    Json(req): Json<SetGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state
        .db
        .find_profile_by_id(profile_id)
        .await?
        .ok_or(ServiceError::ProfileNotFound)?;

    let permission = state
        .db
        .find_permission_by_id(req.permission_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Permission not found")))?;

    // Fail closed: a grant change must never commit without its audit row.
    state
        .audit
        .record_required(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::ProfileGrantChanged,
                Some("permissao_perfil".to_string()),
                Some(profile.profile_id),
            )
            .with_severity(AuditSeverity::Warning)
            .with_metadata(serde_json::json!({
                "permission": permission.permission_key(),
                "granted": req.granted,
                "conditions": req.conditions.clone(),
            }))
            .with_request_context(ctx.ip_address.clone(), ctx.user_agent.clone(), ctx.session_id),
        )
        .await?;

    let grant = ProfilePermissionGrant::new(
        profile_id,
        req.permission_id,
        req.granted,
        req.conditions,
    );
    state.db.upsert_grant(&grant).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Remove a grant from a profile.
pub async fn remove_grant(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path((profile_id, permission_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .audit
        .record_required(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::ProfileGrantChanged,
                Some("permissao_perfil".to_string()),
                Some(profile_id),
            )
            .with_severity(AuditSeverity::Warning)
            .with_metadata(serde_json::json!({
                "permission_id": permission_id,
                "removed": true,
            })),
        )
        .await?;

    state.db.delete_grant(profile_id, permission_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Permissions ====================

/// Register a permission in the catalog.
pub async fn create_permission(
    State(state): State<AppState>,
    Json(req): Json<CreatePermissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(existing) = state
        .db
        .find_permission_by_tuple(
            req.module.as_str(),
            req.action.as_str(),
            req.resource_type.as_deref(),
        )
        .await?
    {
        // Identity is the tuple; duplicates are not meaningful
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Permission {} already exists",
            existing.permission_key()
        )));
    }

    let permission = Permission::new(req.module, req.action, req.resource_type);
    state.db.insert_permission(&permission).await?;
    Ok((StatusCode::CREATED, Json(PermissionResponse::from(permission))))
}

/// List the permission catalog.
pub async fn list_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PermissionResponse>>, AppError> {
    let permissions = state.db.find_permissions().await?;
    Ok(Json(
        permissions.into_iter().map(PermissionResponse::from).collect(),
    ))
}

// ==================== Assignments ====================

/// Assign a profile to a person
#[utoipa::path(
    post,
    path = "/admin/assignments",
    request_body = AssignProfileRequest,
    responses(
        (status = 201, description = "Assignment created", body = AssignmentResponse),
        (status = 404, description = "Person or profile not found")
    ),
    tag = "Administration",
    security(("bearer_auth" = []))
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Json(req): Json<AssignProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let person = state
        .db
        .find_person_by_id(req.person_id)
        .await?
        .ok_or(ServiceError::PersonNotFound)?;
    let profile = state
        .db
        .find_profile_by_id(req.profile_id)
        .await?
        .filter(|p| p.active_flag)
        .ok_or(ServiceError::ProfileNotFound)?;

    let assignment = UserProfileAssignment::new(
        person.person_id,
        profile.profile_id,
        Some(ctx.person_id),
        req.expires_at_utc,
    );

    // Fail closed: assignments change effective permissions.
    state
        .audit
        .record_required(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::ProfileAssigned,
                Some("perfil_usuario".to_string()),
                Some(assignment.assignment_id),
            )
            .with_severity(AuditSeverity::Warning)
            .with_metadata(serde_json::json!({
                "person_id": person.person_id,
                "profile": profile.name,
                "expires_at_utc": assignment.expires_at_utc,
            })),
        )
        .await?;

    state.db.insert_assignment(&assignment).await?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from(assignment))))
}

/// End an assignment (unassign). Idempotent.
pub async fn end_assignment(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(assignment_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = state
        .db
        .find_assignment_by_id(assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Assignment not found")))?;

    state
        .audit
        .record_required(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::ProfileUnassigned,
                Some("perfil_usuario".to_string()),
                Some(assignment.assignment_id),
            )
            .with_severity(AuditSeverity::Warning)
            .with_metadata(serde_json::json!({
                "person_id": assignment.person_id,
                "profile_id": assignment.profile_id,
            })),
        )
        .await?;

    state.db.deactivate_assignment(assignment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a person's active assignments with profile details.
pub async fn list_person_assignments(
    State(state): State<AppState>,
    Path(person_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let details = state.db.find_assignment_details_for_person(person_id).await?;
    Ok(Json(details))
}
