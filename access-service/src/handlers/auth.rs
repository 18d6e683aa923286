//! Authentication and session handlers.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use hub_core::error::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    middleware::CurrentUser,
    models::{
        AuditAction, AuditLogEntry, PasskeyResponse, PersonResponse, RegisterPasskeyRequest,
        SessionInfo,
    },
    utils::ValidatedJson,
    AppState,
};
use validator::Validate;

/// Login with email and password.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "maria@igreja.example")]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login with a platform-verified passkey assertion.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PasskeyLoginRequest {
    pub credential_id: String,
    pub counter: i64,
}

/// Verify a single-use MFA backup code.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BackupCodeRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

/// Successful login response. The session token is shown exactly once.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub person: PersonResponse,
    pub session_id: Uuid,
    pub session_token: String,
    pub expires_at_utc: DateTime<Utc>,
    pub suspicious: bool,
}

/// Freshly generated backup codes, shown exactly once.
#[derive(Debug, Serialize, ToSchema)]
pub struct BackupCodesResponse {
    pub codes: Vec<String>,
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Validation error"),
        (status = 429, description = "Too many attempts")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (ip, agent) = request_meta(&headers);
    let outcome = state
        .auth
        .login_password(&req.email, &req.password, ip, agent)
        .await?;
    Ok((StatusCode::OK, Json(login_response(outcome))))
}

/// Login with a passkey assertion
#[utoipa::path(
    post,
    path = "/auth/login/passkey",
    request_body = PasskeyLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Replay detected or unknown credential")
    ),
    tag = "Authentication"
)]
pub async fn login_passkey(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PasskeyLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (ip, agent) = request_meta(&headers);
    let outcome = state
        .auth
        .login_passkey(&req.credential_id, req.counter, ip, agent)
        .await?;
    Ok((StatusCode::OK, Json(login_response(outcome))))
}

/// Logout and revoke the presented session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out (idempotent)"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = bearer_token(&headers) {
        state.auth.logout(&token).await?;
    }
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}

/// Verify a single-use backup code for the current session's person.
pub async fn verify_backup_code(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    ValidatedJson(req): ValidatedJson<BackupCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.verify_backup_code(ctx.person_id, &req.code).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "verified": true })),
    ))
}

/// Regenerate the caller's backup codes.
pub async fn regenerate_backup_codes(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let codes = state
        .credentials
        .regenerate_backup_codes(&ctx, state.config.security.backup_code_count)
        .await?;
    Ok((StatusCode::OK, Json(BackupCodesResponse { codes })))
}

/// Register a passkey for the caller.
pub async fn register_passkey(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Json(req): Json<RegisterPasskeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let credential = state.credentials.register_passkey(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(PasskeyResponse::from(credential))))
}

/// List the caller's passkeys.
pub async fn list_passkeys(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<Vec<PasskeyResponse>>, AppError> {
    let credentials = state.credentials.list_passkeys(ctx.person_id).await?;
    Ok(Json(
        credentials.into_iter().map(PasskeyResponse::from).collect(),
    ))
}

/// List the caller's live sessions
#[utoipa::path(
    get,
    path = "/auth/sessions",
    responses(
        (status = 200, description = "Live sessions", body = [SessionInfo])
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<Vec<SessionInfo>>, AppError> {
    let sessions = state.sessions.list(ctx.person_id).await?;
    let infos = sessions
        .into_iter()
        .map(|s| {
            let is_current = ctx.session_id == Some(s.session_id);
            let mut info = SessionInfo::from(s);
            info.is_current = is_current;
            info
        })
        .collect();
    Ok(Json(infos))
}

/// Revoke one of the caller's sessions. Idempotent.
pub async fn revoke_session(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke(ctx.person_id, session_id).await?;
    state.audit.record(
        AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::SessionRevoked,
            Some("sessao".to_string()),
            Some(session_id),
        )
        .with_request_context(ctx.ip_address.clone(), ctx.user_agent.clone(), ctx.session_id),
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke every session the caller holds.
pub async fn revoke_all_sessions(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke_all(ctx.person_id).await?;
    state.audit.record(
        AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::SessionRevoked,
            Some("sessao".to_string()),
            None,
        )
        .with_metadata(serde_json::json!({ "scope": "all" }))
        .with_request_context(ctx.ip_address.clone(), ctx.user_agent.clone(), ctx.session_id),
    );
    Ok(StatusCode::NO_CONTENT)
}

fn login_response(outcome: crate::services::LoginOutcome) -> LoginResponse {
    LoginResponse {
        person: outcome.person,
        session_id: outcome.session_id,
        session_token: outcome.session_token,
        expires_at_utc: outcome.expires_at_utc,
        suspicious: outcome.suspicious,
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

fn request_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string());
    let agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    (ip, agent)
}
