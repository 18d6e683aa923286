//! Profile assignment model - time-bounded person→profile bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Profile assignment entity (perfis_usuario).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfileAssignment {
    pub assignment_id: Uuid,
    pub person_id: Uuid,
    pub profile_id: Uuid,
    pub active_flag: bool,
    pub assigned_by: Option<Uuid>,
    pub assigned_at_utc: DateTime<Utc>,
    pub expires_at_utc: Option<DateTime<Utc>>,
}

impl UserProfileAssignment {
    /// Create a new assignment starting now.
    pub fn new(
        person_id: Uuid,
        profile_id: Uuid,
        assigned_by: Option<Uuid>,
        expires_at_utc: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            assignment_id: Uuid::new_v4(),
            person_id,
            profile_id,
            active_flag: true,
            assigned_by,
            assigned_at_utc: Utc::now(),
            expires_at_utc,
        }
    }

    /// Check if the assignment contributes to the effective permission set:
    /// it must be active and not past its expiry.
    pub fn is_current(&self) -> bool {
        self.active_flag && !self.has_expired()
    }

    /// Check if the assignment has expired.
    pub fn has_expired(&self) -> bool {
        self.expires_at_utc.is_some_and(|at| at <= Utc::now())
    }
}

/// Request to assign a profile to a person.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignProfileRequest {
    pub person_id: Uuid,
    pub profile_id: Uuid,
    pub expires_at_utc: Option<DateTime<Utc>>,
}

/// Assignment response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentResponse {
    pub assignment_id: Uuid,
    pub person_id: Uuid,
    pub profile_id: Uuid,
    pub active: bool,
    pub assigned_by: Option<Uuid>,
    pub assigned_at_utc: DateTime<Utc>,
    pub expires_at_utc: Option<DateTime<Utc>>,
    pub is_current: bool,
}

impl From<UserProfileAssignment> for AssignmentResponse {
    fn from(a: UserProfileAssignment) -> Self {
        let is_current = a.is_current();
        Self {
            assignment_id: a.assignment_id,
            person_id: a.person_id,
            profile_id: a.profile_id,
            active: a.active_flag,
            assigned_by: a.assigned_by,
            assigned_at_utc: a.assigned_at_utc,
            expires_at_utc: a.expires_at_utc,
            is_current,
        }
    }
}

/// Assignment with profile details (join row).
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct AssignmentDetail {
    pub assignment_id: Uuid,
    pub profile_id: Uuid,
    pub profile_name: String,
    pub profile_level: i16,
    pub assigned_at_utc: DateTime<Utc>,
    pub expires_at_utc: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_open_ended_assignment_is_current() {
        let a = UserProfileAssignment::new(Uuid::new_v4(), Uuid::new_v4(), None, None);
        assert!(a.is_current());
        assert!(!a.has_expired());
    }

    #[test]
    fn test_expired_assignment_is_not_current() {
        let mut a = UserProfileAssignment::new(Uuid::new_v4(), Uuid::new_v4(), None, None);
        a.expires_at_utc = Some(Utc::now() - Duration::hours(1));
        // active_flag alone must not keep the assignment alive
        assert!(a.active_flag);
        assert!(!a.is_current());
    }

    #[test]
    fn test_inactive_assignment_is_not_current() {
        let mut a = UserProfileAssignment::new(Uuid::new_v4(), Uuid::new_v4(), None, None);
        a.active_flag = false;
        assert!(!a.is_current());
    }
}
