//! Audit log model - append-only record of sensitive and state-changing actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Audit severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSeverity::Info => "info",
            AuditSeverity::Warning => "warning",
            AuditSeverity::Critical => "critical",
        }
    }
}

/// Audited action keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoginSucceeded,
    LoginFailed,
    Logout,
    SessionRevoked,
    SessionsSwept,
    PermissionDenied,
    ProfileCreated,
    ProfileUpdated,
    ProfileDeactivated,
    ProfileGrantChanged,
    ProfileAssigned,
    ProfileUnassigned,
    PasskeyRegistered,
    PasskeyReplayRejected,
    BackupCodesRegenerated,
    BackupCodeUsed,
    ConsentGranted,
    ConsentRevoked,
    DataRequestOpened,
    DataRequestAdvanced,
    PersonUpdated,
    PasswordResetRequested,
    DemoUserProvisioned,
    PaymentIntentCreated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::LoginSucceeded => "login_succeeded",
            AuditAction::LoginFailed => "login_failed",
            AuditAction::Logout => "logout",
            AuditAction::SessionRevoked => "session_revoked",
            AuditAction::SessionsSwept => "sessions_swept",
            AuditAction::PermissionDenied => "permission_denied",
            AuditAction::ProfileCreated => "profile_created",
            AuditAction::ProfileUpdated => "profile_updated",
            AuditAction::ProfileDeactivated => "profile_deactivated",
            AuditAction::ProfileGrantChanged => "profile_grant_changed",
            AuditAction::ProfileAssigned => "profile_assigned",
            AuditAction::ProfileUnassigned => "profile_unassigned",
            AuditAction::PasskeyRegistered => "passkey_registered",
            AuditAction::PasskeyReplayRejected => "passkey_replay_rejected",
            AuditAction::BackupCodesRegenerated => "backup_codes_regenerated",
            AuditAction::BackupCodeUsed => "backup_code_used",
            AuditAction::ConsentGranted => "consent_granted",
            AuditAction::ConsentRevoked => "consent_revoked",
            AuditAction::DataRequestOpened => "data_request_opened",
            AuditAction::DataRequestAdvanced => "data_request_advanced",
            AuditAction::PersonUpdated => "person_updated",
            AuditAction::PasswordResetRequested => "password_reset_requested",
            AuditAction::DemoUserProvisioned => "demo_user_provisioned",
            AuditAction::PaymentIntentCreated => "payment_intent_created",
        }
    }
}

/// Audit log entity (logs_auditoria). Write-once: rows are inserted and
/// queried, never updated or deleted by the application.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntry {
    pub log_id: Uuid,
    pub actor_person_id: Option<Uuid>,
    pub action_key: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub success_flag: bool,
    pub severity_code: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub session_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Create an audit entry for a user action.
    pub fn user_action(
        actor_person_id: Uuid,
        action: AuditAction,
        resource_type: Option<String>,
        resource_id: Option<Uuid>,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4(),
            actor_person_id: Some(actor_person_id),
            action_key: action.as_str().to_string(),
            resource_type,
            resource_id,
            old_value: None,
            new_value: None,
            success_flag: true,
            severity_code: AuditSeverity::Info.as_str().to_string(),
            ip_address: None,
            user_agent: None,
            session_id: None,
            metadata: None,
            created_utc: Utc::now(),
        }
    }

    /// Create a system-level audit entry (no actor).
    pub fn system_action(
        action: AuditAction,
        resource_type: Option<String>,
        resource_id: Option<Uuid>,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4(),
            actor_person_id: None,
            action_key: action.as_str().to_string(),
            resource_type,
            resource_id,
            old_value: None,
            new_value: None,
            success_flag: true,
            severity_code: AuditSeverity::Info.as_str().to_string(),
            ip_address: None,
            user_agent: None,
            session_id: None,
            metadata: None,
            created_utc: Utc::now(),
        }
    }

    /// Mark the entry as a failed/denied attempt.
    pub fn failed(mut self, severity: AuditSeverity) -> Self {
        self.success_flag = false;
        self.severity_code = severity.as_str().to_string();
        self
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity_code = severity.as_str().to_string();
        self
    }

    pub fn with_snapshots(
        mut self,
        old_value: Option<serde_json::Value>,
        new_value: Option<serde_json::Value>,
    ) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach request context (ip, user agent, session).
    pub fn with_request_context(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
        session_id: Option<Uuid>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self.session_id = session_id;
        self
    }
}

/// Audit log response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub log_id: Uuid,
    pub actor_person_id: Option<Uuid>,
    pub action_key: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub old_value: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub new_value: Option<serde_json::Value>,
    pub success: bool,
    pub severity: String,
    pub ip_address: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<AuditLogEntry> for AuditLogResponse {
    fn from(e: AuditLogEntry) -> Self {
        Self {
            log_id: e.log_id,
            actor_person_id: e.actor_person_id,
            action_key: e.action_key,
            resource_type: e.resource_type,
            resource_id: e.resource_id,
            old_value: e.old_value,
            new_value: e.new_value,
            success: e.success_flag,
            severity: e.severity_code,
            ip_address: e.ip_address,
            created_utc: e.created_utc,
        }
    }
}
