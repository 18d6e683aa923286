//! Handlers backed by the platform's callable functions.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use hub_core::error::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    middleware::CurrentUser,
    models::{AuditAction, AuditLogEntry, PermissionAction, PermissionModule},
    utils::ValidatedJson,
    AppState,
};

/// Request a password-reset link.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request to provision a demo user.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DemoUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request to create a payment intent.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentIntentRequest {
    pub amount_cents: i64,
    pub currency: String,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub intent_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DemoUserResponse {
    pub account_id: Uuid,
}

/// Request a password reset. Always answers the same way so account
/// existence is never disclosed; the link goes out through the platform.
pub async fn request_password_reset(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(account) = state.db.find_account_by_email(&req.email).await? {
        match state.platform.issue_password_reset_link(&account.email).await {
            Ok(reset_url) => {
                let person = state.db.find_person_by_id(account.person_id).await?;
                if let Some(phone) = person.as_ref().and_then(|p| p.phone.clone()) {
                    let platform = state.platform.clone();
                    let body = format!(
                        "Recebemos um pedido de redefinicao de senha. Acesse: {}",
                        reset_url
                    );
                    tokio::spawn(async move {
                        if let Err(e) = platform.send_whatsapp_message(&phone, &body).await {
                            tracing::error!(error = %e, "Failed to dispatch password-reset link");
                        }
                    });
                }
                state.audit.record(
                    AuditLogEntry::user_action(
                        account.person_id,
                        AuditAction::PasswordResetRequested,
                        Some("conta_acesso".to_string()),
                        Some(account.account_id),
                    ),
                );
            }
            Err(e) => {
                // Transient platform failure: the caller still gets the
                // generic answer and can retry.
                tracing::error!(error = %e, "Password-reset link issuance failed");
            }
        }
    }

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Se a conta existir, um link de redefinicao foi enviado."
        })),
    ))
}

/// Provision a demo user through the platform (admin).
pub async fn provision_demo_user(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    ValidatedJson(req): ValidatedJson<DemoUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account_id = state.platform.provision_demo_user(&req.email).await?;

    state.audit.record(
        AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::DemoUserProvisioned,
            Some("conta_acesso".to_string()),
            Some(account_id),
        )
        .with_metadata(serde_json::json!({ "email": req.email })),
    );

    Ok((StatusCode::CREATED, Json(DemoUserResponse { account_id })))
}

/// Create a payment intent. Requires financas:gerenciar.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    Json(req): Json<PaymentIntentRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .authz
        .require(&ctx, PermissionModule::Financas, PermissionAction::Gerenciar)
        .await?;

    if req.amount_cents <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount must be positive"
        )));
    }

    let intent_id = state
        .platform
        .create_payment_intent(
            req.amount_cents,
            &req.currency,
            req.metadata.unwrap_or_else(|| serde_json::json!({})),
        )
        .await?;

    state.audit.record(
        AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::PaymentIntentCreated,
            Some("intencao_pagamento".to_string()),
            None,
        )
        .with_metadata(serde_json::json!({
            "intent_id": intent_id,
            "amount_cents": req.amount_cents,
            "currency": req.currency,
        })),
    );

    Ok((StatusCode::CREATED, Json(PaymentIntentResponse { intent_id })))
}
