//! Person model - church members and their role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::church_role::ChurchRole;

/// Person entity (pessoas).
#[derive(Debug, Clone, FromRow)]
pub struct Person {
    pub person_id: Uuid,
    pub account_id: Option<Uuid>,
    pub church_id: Uuid,
    pub congregation_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_code: String,
    pub active_flag: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Person {
    /// Create a new person with the default church role.
    pub fn new(church_id: Uuid, full_name: String, email: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            person_id: Uuid::new_v4(),
            account_id: None,
            church_id,
            congregation_id: None,
            full_name,
            email,
            phone: None,
            role_code: ChurchRole::MembroComum.as_str().to_string(),
            active_flag: true,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// Parse the stored church role code.
    pub fn church_role(&self) -> Option<ChurchRole> {
        ChurchRole::from_code(&self.role_code)
    }

    pub fn is_active(&self) -> bool {
        self.active_flag
    }
}

/// Request to update a person's editable fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePersonRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub congregation_id: Option<Uuid>,
}

/// Person response for API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PersonResponse {
    pub person_id: Uuid,
    pub church_id: Uuid,
    pub congregation_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_code: String,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<Person> for PersonResponse {
    fn from(p: Person) -> Self {
        Self {
            person_id: p.person_id,
            church_id: p.church_id,
            congregation_id: p.congregation_id,
            full_name: p.full_name,
            email: p.email,
            phone: p.phone,
            role_code: p.role_code,
            active: p.active_flag,
            created_utc: p.created_utc,
        }
    }
}
