//! Services layer for the access core.
//!
//! Business logic for authorization, audit, sessions, credentials, consent,
//! and the platform-function client.

pub mod audit;
pub mod auth;
pub mod authorization;
pub mod consent;
pub mod credential;
mod database;
pub mod error;
pub mod platform;
pub mod session;
pub mod suspicious;

pub use audit::{AuditService, AuditStore, MemoryAuditStore, PgAuditStore};
pub use auth::{AuthService, LoginOutcome};
pub use authorization::{
    AccessDecision, AccessRequest, AuthorizationService, CallerContext, DecisionSource,
    ProfileGrantDetail,
};
pub use consent::ConsentService;
pub use credential::CredentialService;
pub use database::Database;
pub use error::ServiceError;
pub use platform::{HttpPlatformClient, MockPlatformClient, PlatformFunctions};
pub use session::SessionService;
pub use suspicious::{assess, LoginObservation, SuspicionVerdict, SuspiciousLoginService};
