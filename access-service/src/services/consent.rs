//! Privacy consent and data-request lifecycle.

use hub_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    AuditAction, AuditLogEntry, DataRequest, DataRequestState, DataRequestType, PrivacyConsent,
};

use super::{AuditService, CallerContext, Database, ServiceError};

#[derive(Clone)]
pub struct ConsentService {
    db: Database,
    audit: AuditService,
}

impl ConsentService {
    pub fn new(db: Database, audit: AuditService) -> Self {
        Self { db, audit }
    }

    /// Record a granted consent for the caller.
    pub async fn grant(
        &self,
        ctx: &CallerContext,
        consent_type: String,
        version: String,
    ) -> Result<PrivacyConsent, AppError> {
        let consent = PrivacyConsent::new(ctx.person_id, consent_type, version);
        self.db.insert_consent(&consent).await?;

        self.audit.record(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::ConsentGranted,
                Some("consentimento".to_string()),
                Some(consent.consent_id),
            )
            .with_metadata(serde_json::json!({
                "consent_type": consent.consent_type_code,
                "version": consent.version_text,
            })),
        );

        Ok(consent)
    }

    /// Revoke a consent the caller granted. Idempotent.
    pub async fn revoke(&self, ctx: &CallerContext, consent_id: Uuid) -> Result<(), AppError> {
        self.db.revoke_consent(ctx.person_id, consent_id).await?;

        self.audit.record(AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::ConsentRevoked,
            Some("consentimento".to_string()),
            Some(consent_id),
        ));

        Ok(())
    }

    /// List the caller's consents.
    pub async fn list(&self, person_id: Uuid) -> Result<Vec<PrivacyConsent>, AppError> {
        self.db.find_consents_for_person(person_id).await
    }

    /// Open an export/delete request for the caller.
    pub async fn open_request(
        &self,
        ctx: &CallerContext,
        request_type: DataRequestType,
    ) -> Result<DataRequest, AppError> {
        let request = DataRequest::new(ctx.person_id, request_type);
        self.db.insert_data_request(&request).await?;

        self.audit.record(AuditLogEntry::user_action(
            ctx.person_id,
            AuditAction::DataRequestOpened,
            Some("solicitacao_dados".to_string()),
            Some(request.request_id),
        ));

        Ok(request)
    }

    /// Advance a data request's lifecycle. Illegal transitions conflict.
    pub async fn advance_request(
        &self,
        ctx: &CallerContext,
        request_id: Uuid,
        next: DataRequestState,
        failure_reason: Option<String>,
    ) -> Result<DataRequest, AppError> {
        let mut request = self
            .db
            .find_data_request_by_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Data request not found")))?;

        let previous_state = request.state_code.clone();
        if !request.transition(next, failure_reason) {
            return Err(ServiceError::InvalidTransition {
                from: previous_state,
                to: next.as_str().to_string(),
            }
            .into());
        }

        self.db.update_data_request(&request).await?;

        self.audit.record(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::DataRequestAdvanced,
                Some("solicitacao_dados".to_string()),
                Some(request.request_id),
            )
            .with_snapshots(
                Some(serde_json::json!({ "state": previous_state })),
                Some(serde_json::json!({ "state": request.state_code })),
            ),
        );

        Ok(request)
    }

    /// List data requests, optionally filtered by state (admin view).
    pub async fn list_requests(
        &self,
        state: Option<DataRequestState>,
    ) -> Result<Vec<DataRequest>, AppError> {
        self.db.find_data_requests(state).await
    }

    /// List the caller's own data requests.
    pub async fn list_requests_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<DataRequest>, AppError> {
        self.db.find_data_requests_for_person(person_id).await
    }
}
