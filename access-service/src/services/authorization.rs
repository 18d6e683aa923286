//! Role and permission resolution.
//!
//! One resolver, two data sources: the fixed permissoes_sistema matrix keyed
//! by church role, and the flexible profile-grant system. Access is allowed
//! when either source authorizes the requested tuple; within the profile
//! source an explicit `granted = false` on any current assignment vetoes the
//! grant (deny-overrides).

use hub_core::error::AppError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    default_sensitivity, AuditAction, AuditLogEntry, AuditSeverity, ChurchRole, PermissionAction,
    PermissionModule, SystemPermissionMatrix, UserProfileAssignment, ADMIN_LEVEL,
};

use super::{AuditService, Database};

/// Request-scoped caller identity, resolved from the session by the auth
/// middleware and passed explicitly to every operation.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub person_id: Uuid,
    pub church_id: Uuid,
    pub congregation_id: Option<Uuid>,
    pub role: ChurchRole,
    pub session_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl CallerContext {
    pub fn new(person_id: Uuid, church_id: Uuid, role: ChurchRole) -> Self {
        Self {
            person_id,
            church_id,
            congregation_id: None,
            role,
            session_id: None,
            ip_address: None,
            user_agent: None,
        }
    }
}

/// A requested (module, action, resource) tuple plus the resource scope
/// needed to evaluate grant conditions.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AccessRequest {
    pub module: PermissionModule,
    pub action: PermissionAction,
    pub resource_type: Option<String>,
    pub resource_owner_id: Option<Uuid>,
    pub resource_church_id: Option<Uuid>,
    pub resource_congregation_id: Option<Uuid>,
}

impl AccessRequest {
    pub fn new(module: PermissionModule, action: PermissionAction) -> Self {
        Self {
            module,
            action,
            resource_type: None,
            resource_owner_id: None,
            resource_church_id: None,
            resource_congregation_id: None,
        }
    }
}

/// Which source authorized the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    SystemRole,
    Profile,
}

/// Outcome of a resolution. Total: allow or deny, never partial.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AccessDecision {
    pub allowed: bool,
    pub source: Option<DecisionSource>,
    pub reason: String,
    pub granted_by_profile: Option<Uuid>,
    pub sensitive: bool,
}

impl AccessDecision {
    fn denied(reason: impl Into<String>, sensitive: bool) -> Self {
        Self {
            allowed: false,
            source: None,
            reason: reason.into(),
            granted_by_profile: None,
            sensitive,
        }
    }
}

/// One profile grant joined with the permission it targets.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileGrantDetail {
    pub grant_id: Uuid,
    pub profile_id: Uuid,
    pub permission_id: Uuid,
    pub granted: bool,
    pub conditions: Option<serde_json::Value>,
    pub module_code: String,
    pub action_code: String,
    pub resource_type: Option<String>,
    pub is_sensitive: bool,
}

impl ProfileGrantDetail {
    /// Check if this grant's permission covers the requested tuple.
    fn covers(&self, request: &AccessRequest) -> bool {
        if self.module_code != request.module.as_str()
            || self.action_code != request.action.as_str()
        {
            return false;
        }
        match (&self.resource_type, &request.resource_type) {
            (None, _) => true,
            (Some(own), Some(requested)) => own == requested,
            (Some(_), None) => false,
        }
    }
}

/// Evaluate a grant's JSON conditions against the caller and resource scope.
///
/// Supported keys: `igreja_id`, `congregacao_id` (caller must belong to the
/// given id), `mesma_igreja`, `propria_congregacao` (resource must share the
/// caller's church/congregation), `apenas_proprios` (caller must own the
/// resource). Unknown keys fail the condition: an unintelligible narrowing
/// must not widen access.
pub fn conditions_satisfied(
    ctx: &CallerContext,
    request: &AccessRequest,
    conditions: &serde_json::Value,
) -> bool {
    let Some(object) = conditions.as_object() else {
        return false;
    };

    object.iter().all(|(key, value)| match key.as_str() {
        "igreja_id" => value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .is_some_and(|id| id == ctx.church_id),
        "congregacao_id" => value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .is_some_and(|id| Some(id) == ctx.congregation_id),
        "mesma_igreja" => {
            !value.as_bool().unwrap_or(false)
                || request.resource_church_id == Some(ctx.church_id)
        }
        "propria_congregacao" => {
            !value.as_bool().unwrap_or(false)
                || (ctx.congregation_id.is_some()
                    && request.resource_congregation_id == ctx.congregation_id)
        }
        "apenas_proprios" => {
            !value.as_bool().unwrap_or(false)
                || request.resource_owner_id == Some(ctx.person_id)
        }
        _ => false,
    })
}

/// Resolve an access request against loaded rows.
///
/// Assignments past their expiry contribute nothing even when their active
/// flag is still set.
pub fn resolve(
    ctx: &CallerContext,
    request: &AccessRequest,
    matrix: &SystemPermissionMatrix,
    assignments: &[UserProfileAssignment],
    grants: &[ProfileGrantDetail],
) -> AccessDecision {
    let sensitive = default_sensitivity(request.module, request.action)
        || grants
            .iter()
            .any(|g| g.covers(request) && g.is_sensitive);

    // Fixed-role path
    let system_allows = matrix.allows(ctx.role, request.module, request.action);

    // Profile path
    let current_profiles: std::collections::HashSet<Uuid> = assignments
        .iter()
        .filter(|a| a.is_current())
        .map(|a| a.profile_id)
        .collect();

    let mut profile_allow: Option<Uuid> = None;
    let mut profile_veto = false;

    for grant in grants {
        if !current_profiles.contains(&grant.profile_id) || !grant.covers(request) {
            continue;
        }
        if !grant.granted {
            profile_veto = true;
            continue;
        }
        let conditions_ok = match &grant.conditions {
            Some(conditions) => conditions_satisfied(ctx, request, conditions),
            None => true,
        };
        if conditions_ok && profile_allow.is_none() {
            profile_allow = Some(grant.profile_id);
        }
    }

    if system_allows {
        return AccessDecision {
            allowed: true,
            source: Some(DecisionSource::SystemRole),
            reason: format!(
                "Role {} holds {}:{}",
                ctx.role, request.module, request.action
            ),
            granted_by_profile: None,
            sensitive,
        };
    }

    if profile_veto {
        return AccessDecision::denied(
            "An assigned profile explicitly denies this permission",
            sensitive,
        );
    }

    if let Some(profile_id) = profile_allow {
        return AccessDecision {
            allowed: true,
            source: Some(DecisionSource::Profile),
            reason: "Granted by an assigned security profile".to_string(),
            granted_by_profile: Some(profile_id),
            sensitive,
        };
    }

    AccessDecision::denied("No role or profile grants this permission", sensitive)
}

/// Authorization service: loads the caller's rows, resolves, and records
/// denials of sensitive actions in the audit log.
#[derive(Clone)]
pub struct AuthorizationService {
    db: Database,
    audit: AuditService,
}

impl AuthorizationService {
    pub fn new(db: Database, audit: AuditService) -> Self {
        Self { db, audit }
    }

    /// Resolve with pre-loaded rows, auditing sensitive denials.
    /// Split out so the engine can be driven without a database.
    pub fn decide_with_rows(
        ctx: &CallerContext,
        request: &AccessRequest,
        matrix: &SystemPermissionMatrix,
        assignments: &[UserProfileAssignment],
        grants: &[ProfileGrantDetail],
        audit: &AuditService,
    ) -> AccessDecision {
        let decision = resolve(ctx, request, matrix, assignments, grants);

        if !decision.allowed && decision.sensitive {
            audit.record(
                AuditLogEntry::user_action(
                    ctx.person_id,
                    AuditAction::PermissionDenied,
                    Some(request.module.as_str().to_string()),
                    None,
                )
                .failed(AuditSeverity::Warning)
                .with_metadata(serde_json::json!({
                    "module": request.module.as_str(),
                    "action": request.action.as_str(),
                    "resource_type": request.resource_type,
                }))
                .with_request_context(
                    ctx.ip_address.clone(),
                    ctx.user_agent.clone(),
                    ctx.session_id,
                ),
            );
        }

        decision
    }

    /// Resolve an access request for the caller.
    pub async fn decide(
        &self,
        ctx: &CallerContext,
        request: &AccessRequest,
    ) -> Result<AccessDecision, AppError> {
        let matrix_rows = self.db.find_system_permissions_for_role(ctx.role).await?;
        let matrix = SystemPermissionMatrix::from_rows(&matrix_rows);

        let assignments = self.db.find_assignments_for_person(ctx.person_id).await?;
        let profile_ids: Vec<Uuid> = assignments.iter().map(|a| a.profile_id).collect();
        let grants = self.db.find_grant_details_for_profiles(&profile_ids).await?;

        Ok(Self::decide_with_rows(
            ctx,
            request,
            &matrix,
            &assignments,
            &grants,
            &self.audit,
        ))
    }

    /// Resolve and fail with an authorization error when denied.
    pub async fn require(
        &self,
        ctx: &CallerContext,
        module: PermissionModule,
        action: PermissionAction,
    ) -> Result<(), AppError> {
        let decision = self.decide(ctx, &AccessRequest::new(module, action)).await?;
        if decision.allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Permission denied for {}:{}",
                module,
                action
            )))
        }
    }

    /// Helper contract: has_permission(user, module, action, resource_type?).
    pub async fn has_permission(
        &self,
        ctx: &CallerContext,
        module: PermissionModule,
        action: PermissionAction,
        resource_type: Option<String>,
    ) -> Result<bool, AppError> {
        let mut request = AccessRequest::new(module, action);
        request.resource_type = resource_type;
        Ok(self.decide(ctx, &request).await?.allowed)
    }

    /// Helper contract: the caller's security level is the maximum of the
    /// church-role level and the levels of currently-assigned profiles.
    pub async fn get_user_security_level(&self, ctx: &CallerContext) -> Result<i16, AppError> {
        let profile_level = self
            .db
            .find_max_profile_level_for_person(ctx.person_id)
            .await?
            .unwrap_or(0);
        Ok(ctx.role.level().max(profile_level))
    }

    /// Helper contract: is_admin(user).
    pub async fn is_admin(&self, ctx: &CallerContext) -> Result<bool, AppError> {
        Ok(self.get_user_security_level(ctx).await? >= ADMIN_LEVEL)
    }

    /// Helper contract: get_user_church_id(user).
    pub async fn get_user_church_id(&self, person_id: Uuid) -> Result<Uuid, AppError> {
        let person = self
            .db
            .find_person_by_id(person_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Person not found")))?;
        Ok(person.church_id)
    }

    /// Effective permission snapshot for UI gating: every (module, action)
    /// key the caller currently holds, from both sources.
    pub async fn effective_permissions(
        &self,
        ctx: &CallerContext,
    ) -> Result<Vec<String>, AppError> {
        let matrix_rows = self.db.find_system_permissions_for_role(ctx.role).await?;
        let matrix = SystemPermissionMatrix::from_rows(&matrix_rows);

        let assignments = self.db.find_assignments_for_person(ctx.person_id).await?;
        let profile_ids: Vec<Uuid> = assignments.iter().map(|a| a.profile_id).collect();
        let grants = self.db.find_grant_details_for_profiles(&profile_ids).await?;

        let mut keys: Vec<String> = Vec::new();
        for module in PermissionModule::ALL {
            for action in PermissionAction::ALL {
                let request = AccessRequest::new(module, action);
                let decision = resolve(ctx, &request, &matrix, &assignments, &grants);
                if decision.allowed {
                    keys.push(format!("{}:{}", module, action));
                }
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SecurityProfile;

    fn ctx() -> CallerContext {
        CallerContext::new(Uuid::new_v4(), Uuid::new_v4(), ChurchRole::MembroComum)
    }

    fn grant_for(
        profile_id: Uuid,
        module: PermissionModule,
        action: PermissionAction,
        granted: bool,
    ) -> ProfileGrantDetail {
        ProfileGrantDetail {
            grant_id: Uuid::new_v4(),
            profile_id,
            permission_id: Uuid::new_v4(),
            granted,
            conditions: None,
            module_code: module.as_str().to_string(),
            action_code: action.as_str().to_string(),
            resource_type: None,
            is_sensitive: default_sensitivity(module, action),
        }
    }

    #[test]
    fn test_explicit_deny_overrides_allow() {
        let ctx = ctx();
        let profile_a = SecurityProfile::new("editor".into(), "Editor".into(), 3);
        let profile_b = SecurityProfile::new("restrito".into(), "Restrito".into(), 2);
        let assignments = vec![
            UserProfileAssignment::new(ctx.person_id, profile_a.profile_id, None, None),
            UserProfileAssignment::new(ctx.person_id, profile_b.profile_id, None, None),
        ];
        let grants = vec![
            grant_for(
                profile_a.profile_id,
                PermissionModule::Pessoas,
                PermissionAction::Editar,
                true,
            ),
            grant_for(
                profile_b.profile_id,
                PermissionModule::Pessoas,
                PermissionAction::Editar,
                false,
            ),
        ];

        let decision = resolve(
            &ctx,
            &AccessRequest::new(PermissionModule::Pessoas, PermissionAction::Editar),
            &SystemPermissionMatrix::default(),
            &assignments,
            &grants,
        );
        assert!(!decision.allowed);
    }

    #[test]
    fn test_unknown_condition_key_fails_closed() {
        let ctx = ctx();
        let request = AccessRequest::new(PermissionModule::Agenda, PermissionAction::Criar);
        let conditions = serde_json::json!({ "fase_da_lua": "cheia" });
        assert!(!conditions_satisfied(&ctx, &request, &conditions));
    }

    #[test]
    fn test_own_resource_condition() {
        let ctx = ctx();
        let mut request = AccessRequest::new(PermissionModule::Pessoas, PermissionAction::Editar);
        let conditions = serde_json::json!({ "apenas_proprios": true });

        request.resource_owner_id = Some(ctx.person_id);
        assert!(conditions_satisfied(&ctx, &request, &conditions));

        request.resource_owner_id = Some(Uuid::new_v4());
        assert!(!conditions_satisfied(&ctx, &request, &conditions));
    }
}
