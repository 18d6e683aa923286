//! Suspicious-login heuristic.
//!
//! Flags logins that deviate materially from a person's history: a
//! first-seen IP, user agent, or coarse location. The verdict only raises
//! security events and a notification; it never blocks a login, and any
//! internal failure is treated as "not suspicious" (fail open, fail noisy).

use std::sync::Arc;

use crate::models::{AuditSeverity, Person, SecurityEvent, SecurityEventType};

use super::{AuditService, Database, PlatformFunctions};

/// One historical or current login's comparable attributes.
#[derive(Debug, Clone, Default)]
pub struct LoginObservation {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub location_label: Option<String>,
}

/// Heuristic verdict with the deviations that triggered it.
#[derive(Debug, Clone, Default)]
pub struct SuspicionVerdict {
    pub new_ip: bool,
    pub new_device: bool,
    pub new_location: bool,
    pub reasons: Vec<String>,
}

impl SuspicionVerdict {
    pub fn suspicious(&self) -> bool {
        self.new_ip || self.new_device || self.new_location
    }
}

/// Assess a login against history.
///
/// An empty history is never suspicious: the heuristic flags deviation, and
/// a first login has nothing to deviate from.
pub fn assess(history: &[LoginObservation], current: &LoginObservation) -> SuspicionVerdict {
    let mut verdict = SuspicionVerdict::default();
    if history.is_empty() {
        return verdict;
    }

    if let Some(ip) = &current.ip_address {
        if !history.iter().any(|h| h.ip_address.as_ref() == Some(ip)) {
            verdict.new_ip = true;
            verdict.reasons.push(format!("primeiro acesso do IP {}", ip));
        }
    }

    if let Some(agent) = &current.user_agent {
        if !history.iter().any(|h| h.user_agent.as_ref() == Some(agent)) {
            verdict.new_device = true;
            verdict
                .reasons
                .push("primeiro acesso deste dispositivo".to_string());
        }
    }

    if let Some(location) = &current.location_label {
        if !history
            .iter()
            .any(|h| h.location_label.as_ref() == Some(location))
        {
            verdict.new_location = true;
            verdict
                .reasons
                .push(format!("primeiro acesso de {}", location));
        }
    }

    verdict
}

/// Service wrapper: loads history, assesses, and raises the alarm.
#[derive(Clone)]
pub struct SuspiciousLoginService {
    db: Database,
    audit: AuditService,
    platform: Arc<dyn PlatformFunctions>,
    history_window: i64,
}

impl SuspiciousLoginService {
    pub fn new(db: Database, audit: AuditService, platform: Arc<dyn PlatformFunctions>) -> Self {
        Self {
            db,
            audit,
            platform,
            history_window: 50,
        }
    }

    /// Inspect a fresh login. Never returns an error: failures are logged
    /// and the login proceeds unflagged.
    pub async fn inspect_login(
        &self,
        person: &Person,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> SuspicionVerdict {
        let history = match self
            .db
            .find_recent_sessions_for_person(person.person_id, self.history_window)
            .await
        {
            Ok(sessions) => sessions
                .into_iter()
                .map(|s| LoginObservation {
                    ip_address: s.ip_address,
                    user_agent: s.user_agent,
                    location_label: s.location_label,
                })
                .collect::<Vec<_>>(),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    person_id = %person.person_id,
                    "Suspicious-login check failed; allowing login unflagged"
                );
                return SuspicionVerdict::default();
            }
        };

        let current = LoginObservation {
            ip_address,
            user_agent,
            location_label: None,
        };
        let verdict = assess(&history, &current);

        if verdict.suspicious() {
            if verdict.new_device {
                self.audit.record_event(SecurityEvent::new(
                    Some(person.person_id),
                    SecurityEventType::NewDevice,
                    AuditSeverity::Info,
                    current.user_agent.clone().map(|agent| {
                        serde_json::json!({ "user_agent": agent })
                    }),
                    current.ip_address.clone(),
                    current.user_agent.clone(),
                ));
            }
            if verdict.new_location {
                self.audit.record_event(SecurityEvent::new(
                    Some(person.person_id),
                    SecurityEventType::NewLocation,
                    AuditSeverity::Info,
                    current
                        .location_label
                        .clone()
                        .map(|location| serde_json::json!({ "location": location })),
                    current.ip_address.clone(),
                    current.user_agent.clone(),
                ));
            }
            self.audit.record_event(SecurityEvent::suspicious_login(
                person.person_id,
                &verdict.reasons,
                current.ip_address.clone(),
                current.user_agent.clone(),
            ));

            if let Some(phone) = person.phone.clone() {
                let platform = self.platform.clone();
                let name = person.full_name.clone();
                let reasons = verdict.reasons.join("; ");
                tokio::spawn(async move {
                    let body = format!(
                        "Ola {}, detectamos um acesso incomum a sua conta ({}). \
                         Se nao foi voce, revogue suas sessoes.",
                        name, reasons
                    );
                    if let Err(e) = platform.send_whatsapp_message(&phone, &body).await {
                        tracing::error!(error = %e, "Failed to dispatch suspicious-login notification");
                    }
                });
            }
        }

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(ip: &str, agent: &str) -> LoginObservation {
        LoginObservation {
            ip_address: Some(ip.to_string()),
            user_agent: Some(agent.to_string()),
            location_label: None,
        }
    }

    #[test]
    fn test_first_login_is_not_suspicious() {
        let verdict = assess(&[], &obs("203.0.113.7", "Mozilla/5.0"));
        assert!(!verdict.suspicious());
    }

    #[test]
    fn test_known_ip_and_agent_are_clear() {
        let history = vec![obs("203.0.113.7", "Mozilla/5.0")];
        let verdict = assess(&history, &obs("203.0.113.7", "Mozilla/5.0"));
        assert!(!verdict.suspicious());
        assert!(verdict.reasons.is_empty());
    }

    #[test]
    fn test_new_ip_is_flagged() {
        let history = vec![obs("203.0.113.7", "Mozilla/5.0")];
        let verdict = assess(&history, &obs("198.51.100.23", "Mozilla/5.0"));
        assert!(verdict.suspicious());
        assert!(verdict.new_ip);
        assert!(!verdict.new_device);
    }

    #[test]
    fn test_new_ip_and_agent_give_two_reasons() {
        let history = vec![obs("203.0.113.7", "Mozilla/5.0")];
        let verdict = assess(&history, &obs("198.51.100.23", "curl/8.0"));
        assert!(verdict.suspicious());
        assert_eq!(verdict.reasons.len(), 2);
    }

    #[test]
    fn test_missing_attributes_are_not_compared() {
        let history = vec![obs("203.0.113.7", "Mozilla/5.0")];
        let verdict = assess(&history, &LoginObservation::default());
        assert!(!verdict.suspicious());
    }

    #[test]
    fn test_new_location_is_flagged() {
        let mut known = obs("203.0.113.7", "Mozilla/5.0");
        known.location_label = Some("Sao Paulo, BR".to_string());
        let mut current = obs("203.0.113.7", "Mozilla/5.0");
        current.location_label = Some("Lisboa, PT".to_string());

        let verdict = assess(&[known], &current);
        assert!(verdict.suspicious());
        assert!(verdict.new_location);
    }
}
