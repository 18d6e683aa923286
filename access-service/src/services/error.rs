use hub_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Person not found")]
    PersonNotFound,

    #[error("Profile not found")]
    ProfileNotFound,

    #[error("System profiles cannot be removed")]
    SystemProfileProtected,

    #[error("Credential not found")]
    CredentialNotFound,

    #[error("Authenticator counter did not increase for credential {0}")]
    ReplayDetected(String),

    #[error("Invalid backup code")]
    InvalidBackupCode,

    #[error("Illegal data request transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidCredentials => {
                AppError::AuthenticationRequired(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::PersonNotFound => AppError::NotFound(anyhow::anyhow!("Person not found")),
            ServiceError::ProfileNotFound => {
                AppError::NotFound(anyhow::anyhow!("Profile not found"))
            }
            ServiceError::SystemProfileProtected => {
                AppError::Conflict(anyhow::anyhow!("System profiles cannot be removed"))
            }
            ServiceError::CredentialNotFound => {
                AppError::NotFound(anyhow::anyhow!("Credential not found"))
            }
            ServiceError::ReplayDetected(id) => AppError::AuthenticationRequired(anyhow::anyhow!(
                "Authenticator counter did not increase for credential {}",
                id
            )),
            ServiceError::InvalidBackupCode => {
                AppError::AuthenticationRequired(anyhow::anyhow!("Invalid backup code"))
            }
            ServiceError::InvalidTransition { from, to } => AppError::Conflict(anyhow::anyhow!(
                "Illegal data request transition from {} to {}",
                from,
                to
            )),
            ServiceError::ValidationError(e) => AppError::BadRequest(anyhow::anyhow!(e)),
        }
    }
}
