//! Security event model - authentication-adjacent occurrences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::audit_log::AuditSeverity;

/// Security event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    /// Login from a device never seen for this person
    NewDevice,
    /// Login from an approximate location never seen for this person
    NewLocation,
    /// Login that deviates materially from the person's history
    SuspiciousLogin,
    /// Passkey assertion with a non-increasing counter
    PasskeyReplay,
    /// MFA backup code consumed
    BackupCodeUsed,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventType::NewDevice => "new_device",
            SecurityEventType::NewLocation => "new_location",
            SecurityEventType::SuspiciousLogin => "suspicious_login",
            SecurityEventType::PasskeyReplay => "passkey_replay",
            SecurityEventType::BackupCodeUsed => "backup_code_used",
        }
    }
}

/// Security event entity (eventos_seguranca). Append-only; feeds
/// notification dispatch.
#[derive(Debug, Clone, FromRow)]
pub struct SecurityEvent {
    pub event_id: Uuid,
    pub person_id: Option<Uuid>,
    pub event_type_code: String,
    pub severity_code: String,
    pub context: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl SecurityEvent {
    /// Create a new security event.
    pub fn new(
        person_id: Option<Uuid>,
        event_type: SecurityEventType,
        severity: AuditSeverity,
        context: Option<serde_json::Value>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            person_id,
            event_type_code: event_type.as_str().to_string(),
            severity_code: severity.as_str().to_string(),
            context,
            ip_address,
            user_agent,
            created_utc: Utc::now(),
        }
    }

    /// Create a suspicious-login event with the reasons that triggered it.
    pub fn suspicious_login(
        person_id: Uuid,
        reasons: &[String],
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        Self::new(
            Some(person_id),
            SecurityEventType::SuspiciousLogin,
            AuditSeverity::Warning,
            Some(serde_json::json!({ "reasons": reasons })),
            ip_address,
            user_agent,
        )
    }

    /// Create a passkey-replay event for a credential.
    pub fn passkey_replay(
        person_id: Uuid,
        credential_id: &str,
        stored_counter: i64,
        presented_counter: i64,
    ) -> Self {
        Self::new(
            Some(person_id),
            SecurityEventType::PasskeyReplay,
            AuditSeverity::Critical,
            Some(serde_json::json!({
                "credential_id": credential_id,
                "stored_counter": stored_counter,
                "presented_counter": presented_counter,
            })),
            None,
            None,
        )
    }
}

/// Security event response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct SecurityEventResponse {
    pub event_id: Uuid,
    pub person_id: Option<Uuid>,
    pub event_type_code: String,
    pub severity: String,
    #[schema(value_type = Option<Object>)]
    pub context: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<SecurityEvent> for SecurityEventResponse {
    fn from(e: SecurityEvent) -> Self {
        Self {
            event_id: e.event_id,
            person_id: e.person_id,
            event_type_code: e.event_type_code,
            severity: e.severity_code,
            context: e.context,
            ip_address: e.ip_address,
            created_utc: e.created_utc,
        }
    }
}
