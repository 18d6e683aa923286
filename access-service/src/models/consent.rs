//! Privacy consent and data-request models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Privacy consent entity (consentimentos).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PrivacyConsent {
    pub consent_id: Uuid,
    pub person_id: Uuid,
    pub consent_type_code: String,
    pub version_text: String,
    pub granted_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
}

impl PrivacyConsent {
    /// Record a granted consent.
    pub fn new(person_id: Uuid, consent_type: String, version: String) -> Self {
        Self {
            consent_id: Uuid::new_v4(),
            person_id,
            consent_type_code: consent_type,
            version_text: version,
            granted_utc: Utc::now(),
            revoked_utc: None,
        }
    }

    /// Check if the consent currently stands.
    pub fn is_granted(&self) -> bool {
        self.revoked_utc.is_none()
    }
}

/// Data request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataRequestType {
    Exportacao,
    Exclusao,
}

impl DataRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataRequestType::Exportacao => "exportacao",
            DataRequestType::Exclusao => "exclusao",
        }
    }
}

/// Data request lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataRequestState {
    Pendente,
    Processando,
    Concluida,
    Falhou,
}

impl DataRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataRequestState::Pendente => "pendente",
            DataRequestState::Processando => "processando",
            DataRequestState::Concluida => "concluida",
            DataRequestState::Falhou => "falhou",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pendente" => Some(DataRequestState::Pendente),
            "processando" => Some(DataRequestState::Processando),
            "concluida" => Some(DataRequestState::Concluida),
            "falhou" => Some(DataRequestState::Falhou),
            _ => None,
        }
    }

    /// Legal transitions: pendente → processando → concluida | falhou.
    pub fn can_transition_to(&self, next: DataRequestState) -> bool {
        matches!(
            (self, next),
            (DataRequestState::Pendente, DataRequestState::Processando)
                | (DataRequestState::Processando, DataRequestState::Concluida)
                | (DataRequestState::Processando, DataRequestState::Falhou)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DataRequestState::Concluida | DataRequestState::Falhou)
    }
}

/// Data request entity (solicitacoes_dados).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DataRequest {
    pub request_id: Uuid,
    pub person_id: Uuid,
    pub request_type_code: String,
    pub state_code: String,
    pub failure_reason: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub completed_utc: Option<DateTime<Utc>>,
}

impl DataRequest {
    /// Open a new pending request.
    pub fn new(person_id: Uuid, request_type: DataRequestType) -> Self {
        let now = Utc::now();
        Self {
            request_id: Uuid::new_v4(),
            person_id,
            request_type_code: request_type.as_str().to_string(),
            state_code: DataRequestState::Pendente.as_str().to_string(),
            failure_reason: None,
            created_utc: now,
            updated_utc: now,
            completed_utc: None,
        }
    }

    /// Parse the stored state.
    pub fn state(&self) -> Option<DataRequestState> {
        DataRequestState::from_code(&self.state_code)
    }

    /// Advance the lifecycle. Returns false (leaving the row untouched)
    /// when the transition is not legal.
    pub fn transition(&mut self, next: DataRequestState, failure_reason: Option<String>) -> bool {
        let Some(current) = self.state() else {
            return false;
        };
        if !current.can_transition_to(next) {
            return false;
        }
        self.state_code = next.as_str().to_string();
        self.updated_utc = Utc::now();
        if next.is_terminal() {
            self.completed_utc = Some(self.updated_utc);
        }
        if next == DataRequestState::Falhou {
            self.failure_reason = failure_reason;
        }
        true
    }
}

/// Request to grant a consent.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantConsentRequest {
    pub consent_type: String,
    pub version: String,
}

/// Request to open a data request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OpenDataRequest {
    pub request_type: DataRequestType,
}

/// Request to advance a data request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceDataRequest {
    pub state: DataRequestState,
    pub failure_reason: Option<String>,
}

/// Consent response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConsentResponse {
    pub consent_id: Uuid,
    pub consent_type_code: String,
    pub version_text: String,
    pub granted_utc: DateTime<Utc>,
    pub revoked_utc: Option<DateTime<Utc>>,
}

impl From<PrivacyConsent> for ConsentResponse {
    fn from(c: PrivacyConsent) -> Self {
        Self {
            consent_id: c.consent_id,
            consent_type_code: c.consent_type_code,
            version_text: c.version_text,
            granted_utc: c.granted_utc,
            revoked_utc: c.revoked_utc,
        }
    }
}

/// Data request response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct DataRequestResponse {
    pub request_id: Uuid,
    pub person_id: Uuid,
    pub request_type_code: String,
    pub state_code: String,
    pub failure_reason: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub completed_utc: Option<DateTime<Utc>>,
}

impl From<DataRequest> for DataRequestResponse {
    fn from(r: DataRequest) -> Self {
        Self {
            request_id: r.request_id,
            person_id: r.person_id,
            request_type_code: r.request_type_code,
            state_code: r.state_code,
            failure_reason: r.failure_reason,
            created_utc: r.created_utc,
            completed_utc: r.completed_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        let mut req = DataRequest::new(Uuid::new_v4(), DataRequestType::Exportacao);
        assert_eq!(req.state(), Some(DataRequestState::Pendente));

        assert!(req.transition(DataRequestState::Processando, None));
        assert!(req.transition(DataRequestState::Concluida, None));
        assert!(req.completed_utc.is_some());
    }

    #[test]
    fn test_lifecycle_failure_records_reason() {
        let mut req = DataRequest::new(Uuid::new_v4(), DataRequestType::Exclusao);
        assert!(req.transition(DataRequestState::Processando, None));
        assert!(req.transition(
            DataRequestState::Falhou,
            Some("storage unavailable".to_string())
        ));
        assert_eq!(req.failure_reason.as_deref(), Some("storage unavailable"));
        assert!(req.state().unwrap().is_terminal());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let mut req = DataRequest::new(Uuid::new_v4(), DataRequestType::Exportacao);
        // Cannot skip processing
        assert!(!req.transition(DataRequestState::Concluida, None));
        assert_eq!(req.state(), Some(DataRequestState::Pendente));

        assert!(req.transition(DataRequestState::Processando, None));
        assert!(req.transition(DataRequestState::Concluida, None));
        // Terminal states are final
        assert!(!req.transition(DataRequestState::Processando, None));
        assert!(!req.transition(DataRequestState::Falhou, None));
    }

    #[test]
    fn test_revoked_consent_not_granted() {
        let mut consent =
            PrivacyConsent::new(Uuid::new_v4(), "comunicacao".to_string(), "v2".to_string());
        assert!(consent.is_granted());
        consent.revoked_utc = Some(Utc::now());
        assert!(!consent.is_granted());
    }
}
