//! Secondary-auth credentials: passkeys and MFA backup codes.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use subtle::ConstantTimeEq;
use utoipa::ToSchema;
use uuid::Uuid;

/// Passkey credential entity (credenciais_passkey).
///
/// The credential id is the WebAuthn credential id, base64url-encoded.
/// The assertion itself is verified by the platform; this row carries the
/// replay-defense bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PasskeyCredential {
    pub credential_id: String,
    pub person_id: Uuid,
    pub public_key_text: String,
    pub sign_count: i64,
    pub transports: Vec<String>,
    pub label: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub last_used_utc: Option<DateTime<Utc>>,
}

impl PasskeyCredential {
    /// Register a new passkey.
    pub fn new(
        credential_id: String,
        person_id: Uuid,
        public_key_text: String,
        transports: Vec<String>,
        label: Option<String>,
    ) -> Self {
        Self {
            credential_id,
            person_id,
            public_key_text,
            sign_count: 0,
            transports,
            label,
            created_utc: Utc::now(),
            last_used_utc: None,
        }
    }

    /// Accept an authentication counter.
    ///
    /// The counter must be strictly greater than the stored one; anything
    /// else is a possible clone/replay and is rejected without touching
    /// state. On acceptance the stored counter and last-use time advance.
    pub fn accept_counter(&mut self, presented: i64) -> bool {
        if presented <= self.sign_count {
            return false;
        }
        self.sign_count = presented;
        self.last_used_utc = Some(Utc::now());
        true
    }
}

/// Per-person MFA settings (mfa_usuario): backup codes and phone.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MfaSettings {
    pub person_id: Uuid,
    pub phone_number: Option<String>,
    pub backup_code_hashes: Vec<String>,
    pub enabled_flag: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl MfaSettings {
    /// Create MFA settings with a fresh set of backup codes.
    /// Returns the settings and the plaintext codes (shown once).
    pub fn new(person_id: Uuid, code_count: usize) -> (Self, Vec<String>) {
        let codes = generate_backup_codes(code_count);
        let hashes = codes.iter().map(|c| hash_backup_code(c)).collect();
        let now = Utc::now();
        let settings = Self {
            person_id,
            phone_number: None,
            backup_code_hashes: hashes,
            enabled_flag: true,
            created_utc: now,
            updated_utc: now,
        };
        (settings, codes)
    }

    /// Consume a backup code. Codes are single-use: a matching hash is
    /// removed so the same code can never verify twice. Comparison is
    /// constant-time.
    pub fn consume_backup_code(&mut self, code: &str) -> bool {
        let presented = hash_backup_code(code);
        let found = self
            .backup_code_hashes
            .iter()
            .position(|stored| stored.as_bytes().ct_eq(presented.as_bytes()).into());

        match found {
            Some(idx) => {
                self.backup_code_hashes.remove(idx);
                self.updated_utc = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Replace all backup codes with a fresh set; returns the plaintext.
    pub fn regenerate_backup_codes(&mut self, code_count: usize) -> Vec<String> {
        let codes = generate_backup_codes(code_count);
        self.backup_code_hashes = codes.iter().map(|c| hash_backup_code(c)).collect();
        self.updated_utc = Utc::now();
        codes
    }

    pub fn remaining_backup_codes(&self) -> usize {
        self.backup_code_hashes.len()
    }
}

/// Hash a backup code for storage (sha-256 hex of the normalized code).
pub fn hash_backup_code(code: &str) -> String {
    let normalized = code.trim().to_ascii_uppercase().replace('-', "");
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Generate backup codes in XXXX-XXXX form.
fn generate_backup_codes(count: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let raw: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(8)
                .map(|c| (c as char).to_ascii_uppercase())
                .collect();
            format!("{}-{}", &raw[..4], &raw[4..])
        })
        .collect()
}

/// Request to register a passkey.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterPasskeyRequest {
    pub credential_id: String,
    pub public_key: String,
    #[serde(default)]
    pub transports: Vec<String>,
    pub label: Option<String>,
}

/// Passkey response for API (no key material).
#[derive(Debug, Serialize, ToSchema)]
pub struct PasskeyResponse {
    pub credential_id: String,
    pub label: Option<String>,
    pub transports: Vec<String>,
    pub created_utc: DateTime<Utc>,
    pub last_used_utc: Option<DateTime<Utc>>,
}

impl From<PasskeyCredential> for PasskeyResponse {
    fn from(c: PasskeyCredential) -> Self {
        Self {
            credential_id: c.credential_id,
            label: c.label,
            transports: c.transports,
            created_utc: c.created_utc,
            last_used_utc: c.last_used_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passkey() -> PasskeyCredential {
        PasskeyCredential::new(
            "cred-abc".to_string(),
            Uuid::new_v4(),
            "pk".to_string(),
            vec!["internal".to_string()],
            None,
        )
    }

    #[test]
    fn test_counter_must_strictly_increase() {
        let mut c = passkey();
        assert!(c.accept_counter(1));
        assert_eq!(c.sign_count, 1);
        assert!(c.accept_counter(5));
        assert_eq!(c.sign_count, 5);
    }

    #[test]
    fn test_counter_replay_rejected() {
        let mut c = passkey();
        assert!(c.accept_counter(10));
        // Equal counter: replay
        assert!(!c.accept_counter(10));
        // Lower counter: clone
        assert!(!c.accept_counter(3));
        assert_eq!(c.sign_count, 10);
    }

    #[test]
    fn test_backup_code_single_use() {
        let (mut settings, codes) = MfaSettings::new(Uuid::new_v4(), 4);
        assert_eq!(settings.remaining_backup_codes(), 4);

        let code = codes[0].clone();
        assert!(settings.consume_backup_code(&code));
        assert_eq!(settings.remaining_backup_codes(), 3);

        // Replaying the same code must fail
        assert!(!settings.consume_backup_code(&code));
        assert_eq!(settings.remaining_backup_codes(), 3);
    }

    #[test]
    fn test_backup_code_normalization() {
        let (mut settings, codes) = MfaSettings::new(Uuid::new_v4(), 1);
        let sloppy = format!(" {} ", codes[0].to_ascii_lowercase());
        assert!(settings.consume_backup_code(&sloppy));
    }

    #[test]
    fn test_unknown_backup_code_rejected() {
        let (mut settings, _codes) = MfaSettings::new(Uuid::new_v4(), 2);
        assert!(!settings.consume_backup_code("ZZZZ-ZZZZ"));
        assert_eq!(settings.remaining_backup_codes(), 2);
    }

    #[test]
    fn test_regenerate_invalidates_old_codes() {
        let (mut settings, old_codes) = MfaSettings::new(Uuid::new_v4(), 2);
        let new_codes = settings.regenerate_backup_codes(2);
        assert!(!settings.consume_backup_code(&old_codes[0]));
        assert!(settings.consume_backup_code(&new_codes[0]));
    }
}
