//! Passkey and MFA backup-code handling.

use hub_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    AuditAction, AuditLogEntry, AuditSeverity, MfaSettings, PasskeyCredential,
    RegisterPasskeyRequest, SecurityEvent, SecurityEventType,
};

use super::{AuditService, CallerContext, Database, ServiceError};

#[derive(Clone)]
pub struct CredentialService {
    db: Database,
    audit: AuditService,
}

impl CredentialService {
    pub fn new(db: Database, audit: AuditService) -> Self {
        Self { db, audit }
    }

    /// Register a passkey for the caller. The public key must be valid
    /// base64; the platform verified the attestation before we got here.
    pub async fn register_passkey(
        &self,
        ctx: &CallerContext,
        req: RegisterPasskeyRequest,
    ) -> Result<PasskeyCredential, AppError> {
        use base64::Engine;
        if base64::engine::general_purpose::STANDARD
            .decode(req.public_key.as_bytes())
            .is_err()
        {
            return Err(
                ServiceError::ValidationError("Public key is not valid base64".to_string()).into(),
            );
        }

        let credential = PasskeyCredential::new(
            req.credential_id,
            ctx.person_id,
            req.public_key,
            req.transports,
            req.label,
        );
        self.db.insert_passkey(&credential).await?;

        self.audit.record(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::PasskeyRegistered,
                Some("credencial_passkey".to_string()),
                None,
            )
            .with_request_context(ctx.ip_address.clone(), ctx.user_agent.clone(), ctx.session_id),
        );

        Ok(credential)
    }

    /// Validate a passkey assertion's counter for a credential.
    ///
    /// The platform verifies the signature; this check is the replay
    /// defense. A counter that does not strictly increase is rejected and
    /// recorded as a security event. On success the stored counter advances
    /// before the caller proceeds.
    pub async fn authenticate_passkey(
        &self,
        credential_id: &str,
        presented_counter: i64,
    ) -> Result<PasskeyCredential, AppError> {
        let mut credential = self
            .db
            .find_passkey_by_credential_id(credential_id)
            .await?
            .ok_or(ServiceError::CredentialNotFound)?;

        let stored_counter = credential.sign_count;
        if !credential.accept_counter(presented_counter) {
            self.audit.record_event(SecurityEvent::passkey_replay(
                credential.person_id,
                credential_id,
                stored_counter,
                presented_counter,
            ));
            self.audit.record(
                AuditLogEntry::user_action(
                    credential.person_id,
                    AuditAction::PasskeyReplayRejected,
                    Some("credencial_passkey".to_string()),
                    None,
                )
                .failed(AuditSeverity::Critical),
            );
            return Err(ServiceError::ReplayDetected(credential_id.to_string()).into());
        }

        self.db
            .update_passkey_counter(credential_id, credential.sign_count)
            .await?;

        Ok(credential)
    }

    /// List the caller's passkeys.
    pub async fn list_passkeys(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<PasskeyCredential>, AppError> {
        self.db.find_passkeys_for_person(person_id).await
    }

    /// Verify and consume a backup code. Codes are single-use.
    pub async fn verify_backup_code(
        &self,
        person_id: Uuid,
        code: &str,
    ) -> Result<(), AppError> {
        let mut settings = self
            .db
            .find_mfa_settings(person_id)
            .await?
            .ok_or(ServiceError::InvalidBackupCode)?;

        if !settings.consume_backup_code(code) {
            return Err(ServiceError::InvalidBackupCode.into());
        }

        self.db
            .update_backup_code_hashes(person_id, &settings.backup_code_hashes)
            .await?;

        self.audit.record_event(SecurityEvent::new(
            Some(person_id),
            SecurityEventType::BackupCodeUsed,
            AuditSeverity::Info,
            Some(serde_json::json!({
                "remaining": settings.remaining_backup_codes(),
            })),
            None,
            None,
        ));
        self.audit.record(AuditLogEntry::user_action(
            person_id,
            AuditAction::BackupCodeUsed,
            Some("mfa_usuario".to_string()),
            None,
        ));

        Ok(())
    }

    /// Replace the caller's backup codes with a fresh set, creating MFA
    /// settings if none exist. Returns the plaintext codes, shown once.
    pub async fn regenerate_backup_codes(
        &self,
        ctx: &CallerContext,
        code_count: usize,
    ) -> Result<Vec<String>, AppError> {
        let (settings, codes) = match self.db.find_mfa_settings(ctx.person_id).await? {
            Some(mut settings) => {
                let codes = settings.regenerate_backup_codes(code_count);
                (settings, codes)
            }
            None => MfaSettings::new(ctx.person_id, code_count),
        };
        self.db.upsert_mfa_settings(&settings).await?;

        self.audit.record(
            AuditLogEntry::user_action(
                ctx.person_id,
                AuditAction::BackupCodesRegenerated,
                Some("mfa_usuario".to_string()),
                None,
            )
            .with_request_context(ctx.ip_address.clone(), ctx.user_agent.clone(), ctx.session_id),
        );

        Ok(codes)
    }
}
