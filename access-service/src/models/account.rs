//! Access account model - primary login identity for a person.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Access account entity (contas_acesso). Accounts are provisioned by the
/// platform; this service only reads them to resolve logins.
#[derive(Debug, Clone, FromRow)]
pub struct AccessAccount {
    pub account_id: Uuid,
    pub person_id: Uuid,
    pub email: String,
    pub password_hash_text: String,
    pub created_utc: DateTime<Utc>,
}
