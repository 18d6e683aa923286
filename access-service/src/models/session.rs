//! Active session model - one row per live login.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Active session entity (sessoes_ativas).
///
/// Only the sha-256 hash of the session token is stored.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSession {
    pub session_id: Uuid,
    pub person_id: Uuid,
    pub token_hash_text: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_label: Option<String>,
    pub location_label: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub last_activity_utc: DateTime<Utc>,
    pub expires_at_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
}

impl ActiveSession {
    /// Create a new session.
    pub fn new(
        person_id: Uuid,
        token_hash: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
        expiry_hours: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            person_id,
            token_hash_text: token_hash,
            ip_address,
            user_agent,
            device_label: None,
            location_label: None,
            created_utc: now,
            last_activity_utc: now,
            expires_at_utc: now + Duration::hours(expiry_hours),
            revoked_utc: None,
        }
    }

    /// Check if session is valid (not expired, not revoked).
    pub fn is_valid(&self) -> bool {
        self.revoked_utc.is_none() && self.expires_at_utc > Utc::now()
    }

    /// Check if session is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at_utc <= Utc::now()
    }

    /// Check if session is revoked.
    pub fn is_revoked(&self) -> bool {
        self.revoked_utc.is_some()
    }

    /// Mark the session revoked. Returns whether the state changed;
    /// revoking an already-revoked session is a no-op.
    pub fn mark_revoked(&mut self) -> bool {
        if self.revoked_utc.is_some() {
            return false;
        }
        self.revoked_utc = Some(Utc::now());
        true
    }
}

/// Session info for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_label: Option<String>,
    pub location_label: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub last_activity_utc: DateTime<Utc>,
    pub expires_at_utc: DateTime<Utc>,
    pub is_current: bool,
}

impl From<ActiveSession> for SessionInfo {
    fn from(s: ActiveSession) -> Self {
        Self {
            session_id: s.session_id,
            ip_address: s.ip_address,
            user_agent: s.user_agent,
            device_label: s.device_label,
            location_label: s.location_label,
            created_utc: s.created_utc,
            last_activity_utc: s.last_activity_utc,
            expires_at_utc: s.expires_at_utc,
            is_current: false, // Set by caller
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ActiveSession {
        ActiveSession::new(Uuid::new_v4(), "hash".to_string(), None, None, 24)
    }

    #[test]
    fn test_new_session_is_valid() {
        let s = session();
        assert!(s.is_valid());
        assert!(!s.is_expired());
        assert!(!s.is_revoked());
    }

    #[test]
    fn test_expired_session_is_invalid() {
        let mut s = session();
        s.expires_at_utc = Utc::now() - Duration::minutes(1);
        assert!(s.is_expired());
        assert!(!s.is_valid());
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let mut s = session();
        assert!(s.mark_revoked());
        let first_revocation = s.revoked_utc;
        // Second revoke: same end state, no error, timestamp unchanged
        assert!(!s.mark_revoked());
        assert_eq!(s.revoked_utc, first_revocation);
        assert!(s.is_revoked());
        assert!(!s.is_valid());
    }
}
