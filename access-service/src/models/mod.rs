//! Domain models for the access core.

pub mod account;
pub mod audit_log;
pub mod church_role;
pub mod consent;
pub mod credential;
pub mod permission;
pub mod person;
pub mod profile_assignment;
pub mod security_event;
pub mod security_profile;
pub mod session;
pub mod system_permission;

pub use account::AccessAccount;
pub use audit_log::{AuditAction, AuditLogEntry, AuditLogResponse, AuditSeverity};
pub use church_role::{ChurchRole, ADMIN_LEVEL};
pub use consent::{
    AdvanceDataRequest, ConsentResponse, DataRequest, DataRequestResponse, DataRequestState,
    DataRequestType, GrantConsentRequest, OpenDataRequest, PrivacyConsent,
};
pub use credential::{MfaSettings, PasskeyCredential, PasskeyResponse, RegisterPasskeyRequest};
pub use permission::{
    default_sensitivity, parse_permission_key, CreatePermissionRequest, Permission,
    PermissionAction, PermissionModule, PermissionResponse,
};
pub use person::{Person, PersonResponse, UpdatePersonRequest};
pub use profile_assignment::{
    AssignProfileRequest, AssignmentDetail, AssignmentResponse, UserProfileAssignment,
};
pub use security_event::{SecurityEvent, SecurityEventResponse, SecurityEventType};
pub use security_profile::{
    CreateProfileRequest, GrantDetail, ProfilePermissionGrant, ProfileResponse, ProfileWithGrants,
    SecurityProfile, SetGrantRequest, UpdateProfileRequest,
};
pub use session::{ActiveSession, SessionInfo};
pub use system_permission::{min_level, SystemPermission, SystemPermissionMatrix};
