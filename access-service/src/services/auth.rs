//! Authentication flows: password and passkey login, backup-code MFA,
//! idempotent logout.

use chrono::{DateTime, Utc};
use hub_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    AuditAction, AuditLogEntry, AuditSeverity, Person, PersonResponse,
};
use crate::utils::password::{verify_password, Password, PasswordHashString};

use super::{
    AuditService, CredentialService, Database, ServiceError, SessionService,
    SuspiciousLoginService,
};

/// Successful login: the person, the plain session token (shown once) and
/// its expiry.
#[derive(Debug)]
pub struct LoginOutcome {
    pub person: PersonResponse,
    pub session_id: Uuid,
    pub session_token: String,
    pub expires_at_utc: DateTime<Utc>,
    pub suspicious: bool,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    sessions: SessionService,
    credentials: CredentialService,
    suspicious: SuspiciousLoginService,
    audit: AuditService,
}

impl AuthService {
    pub fn new(
        db: Database,
        sessions: SessionService,
        credentials: CredentialService,
        suspicious: SuspiciousLoginService,
        audit: AuditService,
    ) -> Self {
        Self {
            db,
            sessions,
            credentials,
            suspicious,
            audit,
        }
    }

    /// Login with email and password.
    pub async fn login_password(
        &self,
        email: &str,
        password: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<LoginOutcome, AppError> {
        let account = self
            .db
            .find_account_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let presented = Password::new(password.to_string());
        let stored = PasswordHashString::new(account.password_hash_text.clone());
        if verify_password(&presented, &stored).is_err() {
            self.audit.record(
                AuditLogEntry::system_action(AuditAction::LoginFailed, None, None)
                    .failed(AuditSeverity::Warning)
                    .with_metadata(serde_json::json!({ "email": email }))
                    .with_request_context(ip_address, user_agent, None),
            );
            return Err(ServiceError::InvalidCredentials.into());
        }

        let person = self.load_active_person(account.person_id).await?;
        self.open_session(person, ip_address, user_agent).await
    }

    /// Login with a passkey assertion that the platform already verified;
    /// this path enforces the counter replay defense and opens the session.
    pub async fn login_passkey(
        &self,
        credential_id: &str,
        presented_counter: i64,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<LoginOutcome, AppError> {
        let credential = self
            .credentials
            .authenticate_passkey(credential_id, presented_counter)
            .await?;

        let person = self.load_active_person(credential.person_id).await?;
        self.open_session(person, ip_address, user_agent).await
    }

    /// Second-factor check with a single-use backup code.
    pub async fn verify_backup_code(
        &self,
        person_id: Uuid,
        code: &str,
    ) -> Result<(), AppError> {
        self.credentials.verify_backup_code(person_id, code).await
    }

    /// Logout: revoke the presented session. Idempotent: an unknown or
    /// already-revoked token is a successful no-op.
    pub async fn logout(&self, token: &str) -> Result<(), AppError> {
        if let Some(person_id) = self.sessions.revoke_by_token(token).await? {
            self.audit.record(AuditLogEntry::user_action(
                person_id,
                AuditAction::Logout,
                Some("sessao".to_string()),
                None,
            ));
        }
        Ok(())
    }

    async fn load_active_person(&self, person_id: Uuid) -> Result<Person, AppError> {
        let person = self
            .db
            .find_person_by_id(person_id)
            .await?
            .filter(|p| p.is_active())
            .ok_or(ServiceError::InvalidCredentials)?;
        Ok(person)
    }

    async fn open_session(
        &self,
        person: Person,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<LoginOutcome, AppError> {
        // Assess against history before this login lands in it.
        let verdict = self
            .suspicious
            .inspect_login(&person, ip_address.clone(), user_agent.clone())
            .await;

        let (session, token) = self
            .sessions
            .open(person.person_id, ip_address.clone(), user_agent.clone())
            .await?;

        self.audit.record(
            AuditLogEntry::user_action(
                person.person_id,
                AuditAction::LoginSucceeded,
                Some("sessao".to_string()),
                Some(session.session_id),
            )
            .with_request_context(ip_address, user_agent, Some(session.session_id)),
        );

        Ok(LoginOutcome {
            person: person.into(),
            session_id: session.session_id,
            session_token: token,
            expires_at_utc: session.expires_at_utc,
            suspicious: verdict.suspicious(),
        })
    }
}
