//! Security profile model - named permission bundles and their grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::permission::PermissionResponse;

/// Security profile entity (perfis_seguranca).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SecurityProfile {
    pub profile_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub level: i16,
    pub is_system: bool,
    pub active_flag: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl SecurityProfile {
    /// Create a new custom profile.
    pub fn new(name: String, display_name: String, level: i16) -> Self {
        let now = Utc::now();
        Self {
            profile_id: Uuid::new_v4(),
            name,
            display_name,
            description: None,
            color: None,
            icon: None,
            level,
            is_system: false,
            active_flag: true,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// System profiles are protected from deletion/deactivation.
    pub fn can_delete(&self) -> bool {
        !self.is_system
    }
}

/// Profile permission grant (permissoes_perfil).
///
/// `granted = false` is an explicit deny, not the absence of a grant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfilePermissionGrant {
    pub grant_id: Uuid,
    pub profile_id: Uuid,
    pub permission_id: Uuid,
    pub granted: bool,
    pub conditions: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
}

impl ProfilePermissionGrant {
    /// Create a new grant row.
    pub fn new(
        profile_id: Uuid,
        permission_id: Uuid,
        granted: bool,
        conditions: Option<serde_json::Value>,
    ) -> Self {
        Self {
            grant_id: Uuid::new_v4(),
            profile_id,
            permission_id,
            granted,
            conditions,
            created_utc: Utc::now(),
        }
    }
}

/// Request to create a profile.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProfileRequest {
    #[validate(length(min = 2, message = "Profile name must be at least 2 characters"))]
    pub name: String,
    #[validate(length(min = 2, message = "Display name must be at least 2 characters"))]
    pub display_name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Level must be between 1 and 10"))]
    pub level: i16,
}

/// Request to update a profile.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Level must be between 1 and 10"))]
    pub level: Option<i16>,
    pub active: Option<bool>,
}

/// Request to set a grant on a profile.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetGrantRequest {
    pub permission_id: Uuid,
    pub granted: bool,
    #[schema(value_type = Option<Object>)]
    pub conditions: Option<serde_json::Value>,
}

/// Profile response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub profile_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub level: i16,
    pub is_system: bool,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<SecurityProfile> for ProfileResponse {
    fn from(p: SecurityProfile) -> Self {
        Self {
            profile_id: p.profile_id,
            name: p.name,
            display_name: p.display_name,
            description: p.description,
            color: p.color,
            icon: p.icon,
            level: p.level,
            is_system: p.is_system,
            active: p.active_flag,
            created_utc: p.created_utc,
        }
    }
}

/// Profile with its permission grants for detailed responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileWithGrants {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub grants: Vec<GrantDetail>,
}

/// One grant with the permission it targets.
#[derive(Debug, Serialize, ToSchema)]
pub struct GrantDetail {
    pub grant_id: Uuid,
    pub granted: bool,
    #[schema(value_type = Option<Object>)]
    pub conditions: Option<serde_json::Value>,
    pub permission: PermissionResponse,
}
