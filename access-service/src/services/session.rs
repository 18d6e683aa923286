//! Session lifecycle: open, heartbeat, revoke, sweep.

use hub_core::error::AppError;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::ActiveSession;

use super::Database;

/// Generate an opaque session token (256 bits, hex).
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a session token for storage and lookup.
pub fn hash_session_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Session service. Only token hashes ever reach the database.
#[derive(Clone)]
pub struct SessionService {
    db: Database,
    expiry_hours: i64,
}

impl SessionService {
    pub fn new(db: Database, expiry_hours: i64) -> Self {
        Self { db, expiry_hours }
    }

    /// Open a session for a person. Returns the row and the plain token;
    /// the token is shown to the caller exactly once.
    pub async fn open(
        &self,
        person_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<(ActiveSession, String), AppError> {
        let token = generate_session_token();
        let session = ActiveSession::new(
            person_id,
            hash_session_token(&token),
            ip_address,
            user_agent,
            self.expiry_hours,
        );
        self.db.insert_session(&session).await?;
        Ok((session, token))
    }

    /// Resolve a presented token to a live session and touch its heartbeat.
    ///
    /// An unknown, revoked, or expired token yields an
    /// authentication-required error, never an authorization one.
    pub async fn authenticate(&self, token: &str) -> Result<ActiveSession, AppError> {
        let hash = hash_session_token(token);
        let session = self
            .db
            .find_session_by_token_hash(&hash)
            .await?
            .ok_or_else(|| AppError::AuthenticationRequired(anyhow::anyhow!("Unknown session")))?;

        if !session.is_valid() {
            return Err(AppError::AuthenticationRequired(anyhow::anyhow!(
                "Session expired or revoked"
            )));
        }

        // Heartbeat is best-effort: a failed touch never fails the request.
        if let Err(e) = self.db.touch_session(session.session_id).await {
            tracing::warn!(error = %e, session_id = %session.session_id, "Failed to touch session");
        }

        Ok(session)
    }

    /// Revoke the session behind a token. Idempotent: revoking an unknown
    /// or already-revoked session is a no-op.
    pub async fn revoke_by_token(&self, token: &str) -> Result<Option<Uuid>, AppError> {
        let hash = hash_session_token(token);
        let session = self.db.find_session_by_token_hash(&hash).await?;
        if let Some(ref s) = session {
            self.db.revoke_session(s.session_id).await?;
        }
        Ok(session.map(|s| s.person_id))
    }

    /// Revoke one of a person's sessions by id. Idempotent.
    pub async fn revoke(&self, person_id: Uuid, session_id: Uuid) -> Result<(), AppError> {
        self.db
            .revoke_person_session(person_id, session_id)
            .await
    }

    /// Revoke every session a person holds.
    pub async fn revoke_all(&self, person_id: Uuid) -> Result<(), AppError> {
        self.db.revoke_all_person_sessions(person_id).await
    }

    /// List a person's live sessions.
    pub async fn list(&self, person_id: Uuid) -> Result<Vec<ActiveSession>, AppError> {
        self.db.find_active_sessions_for_person(person_id).await
    }

    /// Sweep sessions past their expiry. Returns how many rows were
    /// revoked; safe to trigger repeatedly or concurrently.
    pub async fn cleanup_expired(&self) -> Result<u64, AppError> {
        let swept = self.db.revoke_expired_sessions().await?;
        if swept > 0 {
            tracing::info!(count = swept, "Swept expired sessions");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique_and_opaque() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_token_hash_is_stable_and_distinct() {
        let token = generate_session_token();
        assert_eq!(hash_session_token(&token), hash_session_token(&token));
        assert_ne!(hash_session_token(&token), token);
    }
}
