//! Resolution-engine tests: hierarchy, deny-overrides, expiry, and the
//! sensitive-denial audit trail.

use std::sync::Arc;
use std::time::Duration;

use access_service::models::{
    default_sensitivity, ChurchRole, PermissionAction, PermissionModule, SecurityProfile,
    SystemPermissionMatrix, UserProfileAssignment,
};
use access_service::services::{
    AccessRequest, AuditService, AuthorizationService, CallerContext, DecisionSource,
    MemoryAuditStore, ProfileGrantDetail,
};
use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

fn caller(role: ChurchRole) -> CallerContext {
    CallerContext::new(Uuid::new_v4(), Uuid::new_v4(), role)
}

fn grant(
    profile_id: Uuid,
    module: PermissionModule,
    action: PermissionAction,
    granted: bool,
    conditions: Option<serde_json::Value>,
) -> ProfileGrantDetail {
    ProfileGrantDetail {
        grant_id: Uuid::new_v4(),
        profile_id,
        permission_id: Uuid::new_v4(),
        granted,
        conditions,
        module_code: module.as_str().to_string(),
        action_code: action.as_str().to_string(),
        resource_type: None,
        is_sensitive: default_sensitivity(module, action),
    }
}

async fn wait_for_logs(store: &MemoryAuditStore, expected: usize) {
    for _ in 0..100 {
        if store.logs().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("audit store never received {} entries", expected);
}

#[test]
fn matrix_is_monotonic_across_the_whole_ladder() {
    // Every (role, module, action) held at a level is held at all higher
    // levels for the same module.
    let matrix = SystemPermissionMatrix::builtin();
    for module in PermissionModule::ALL {
        for action in PermissionAction::ALL {
            let mut held_below = false;
            for role in ChurchRole::ALL {
                let held = matrix.allows(role, module, action);
                assert!(
                    !(held_below && !held),
                    "monotonicity broken at {}:{} for {}",
                    module,
                    action,
                    role
                );
                held_below = held_below || held;
            }
        }
    }
}

#[test]
fn explicit_deny_wins_over_allow_from_another_profile() {
    // Profile A grants pessoas:editar, profile B (assigned later) denies it.
    let ctx = caller(ChurchRole::MembroComum);
    let profile_a = SecurityProfile::new("cadastro".into(), "Cadastro".into(), 3);
    let profile_b = SecurityProfile::new("somente-leitura".into(), "Somente leitura".into(), 2);

    let mut first = UserProfileAssignment::new(ctx.person_id, profile_a.profile_id, None, None);
    first.assigned_at_utc = Utc::now() - ChronoDuration::days(30);
    let second = UserProfileAssignment::new(ctx.person_id, profile_b.profile_id, None, None);

    let grants = vec![
        grant(
            profile_a.profile_id,
            PermissionModule::Pessoas,
            PermissionAction::Editar,
            true,
            None,
        ),
        grant(
            profile_b.profile_id,
            PermissionModule::Pessoas,
            PermissionAction::Editar,
            false,
            None,
        ),
    ];

    let decision = access_service::services::authorization::resolve(
        &ctx,
        &AccessRequest::new(PermissionModule::Pessoas, PermissionAction::Editar),
        &SystemPermissionMatrix::default(),
        &[first, second],
        &grants,
    );

    assert!(!decision.allowed);
    assert!(decision.reason.contains("denies"));
}

#[test]
fn expired_assignment_contributes_nothing() {
    let ctx = caller(ChurchRole::MembroComum);
    let profile = SecurityProfile::new("agenda".into(), "Agenda".into(), 3);

    let mut assignment = UserProfileAssignment::new(ctx.person_id, profile.profile_id, None, None);
    assignment.expires_at_utc = Some(Utc::now() - ChronoDuration::hours(1));
    assert!(assignment.active_flag);

    let grants = vec![grant(
        profile.profile_id,
        PermissionModule::Agenda,
        PermissionAction::Criar,
        true,
        None,
    )];

    let decision = access_service::services::authorization::resolve(
        &ctx,
        &AccessRequest::new(PermissionModule::Agenda, PermissionAction::Criar),
        &SystemPermissionMatrix::default(),
        &[assignment],
        &grants,
    );

    assert!(!decision.allowed);
}

#[test]
fn fixed_role_path_is_independent_of_profile_veto() {
    // The two mechanisms are parallel: a profile deny narrows the profile
    // path only, it does not strip what the fixed role already holds.
    let ctx = caller(ChurchRole::LiderCelula);
    let profile = SecurityProfile::new("restrito".into(), "Restrito".into(), 1);
    let assignment = UserProfileAssignment::new(ctx.person_id, profile.profile_id, None, None);
    let grants = vec![grant(
        profile.profile_id,
        PermissionModule::Celulas,
        PermissionAction::Editar,
        false,
        None,
    )];

    let decision = access_service::services::authorization::resolve(
        &ctx,
        &AccessRequest::new(PermissionModule::Celulas, PermissionAction::Editar),
        &SystemPermissionMatrix::builtin(),
        &[assignment],
        &grants,
    );

    assert!(decision.allowed);
    assert_eq!(decision.source, Some(DecisionSource::SystemRole));
}

#[test]
fn church_condition_narrows_a_grant() {
    let ctx = caller(ChurchRole::MembroComum);
    let profile = SecurityProfile::new("local".into(), "Local".into(), 2);
    let assignment = UserProfileAssignment::new(ctx.person_id, profile.profile_id, None, None);

    let own_church = vec![grant(
        profile.profile_id,
        PermissionModule::Celulas,
        PermissionAction::Visualizar,
        true,
        Some(serde_json::json!({ "igreja_id": ctx.church_id.to_string() })),
    )];
    let other_church = vec![grant(
        profile.profile_id,
        PermissionModule::Celulas,
        PermissionAction::Visualizar,
        true,
        Some(serde_json::json!({ "igreja_id": Uuid::new_v4().to_string() })),
    )];

    let request = AccessRequest::new(PermissionModule::Celulas, PermissionAction::Visualizar);
    let matrix = SystemPermissionMatrix::default();

    let allowed = access_service::services::authorization::resolve(
        &ctx,
        &request,
        &matrix,
        std::slice::from_ref(&assignment),
        &own_church,
    );
    assert!(allowed.allowed);
    assert_eq!(allowed.granted_by_profile, Some(profile.profile_id));

    let denied = access_service::services::authorization::resolve(
        &ctx,
        &request,
        &matrix,
        std::slice::from_ref(&assignment),
        &other_church,
    );
    assert!(!denied.allowed);
}

#[tokio::test]
async fn scenario_cell_leader_editing_cells_and_touching_finance() {
    // Person with lider_celula (level 4): celulas:editar allowed,
    // financas:administrar denied with an audit row (success = false).
    let store = Arc::new(MemoryAuditStore::new());
    let audit = AuditService::new(store.clone());
    let ctx = caller(ChurchRole::LiderCelula);
    let matrix = SystemPermissionMatrix::builtin();

    let edit_cells = AuthorizationService::decide_with_rows(
        &ctx,
        &AccessRequest::new(PermissionModule::Celulas, PermissionAction::Editar),
        &matrix,
        &[],
        &[],
        &audit,
    );
    assert!(edit_cells.allowed);

    let administer_finance = AuthorizationService::decide_with_rows(
        &ctx,
        &AccessRequest::new(PermissionModule::Financas, PermissionAction::Administrar),
        &matrix,
        &[],
        &[],
        &audit,
    );
    assert!(!administer_finance.allowed);
    assert!(administer_finance.sensitive);

    wait_for_logs(&store, 1).await;
    let logs = store.logs();
    assert_eq!(logs.len(), 1);
    let entry = &logs[0];
    assert_eq!(entry.action_key, "permission_denied");
    assert!(!entry.success_flag);
    assert_eq!(entry.actor_person_id, Some(ctx.person_id));
    assert_eq!(entry.resource_type.as_deref(), Some("financas"));
}

#[tokio::test]
async fn non_sensitive_denial_is_not_audited() {
    let store = Arc::new(MemoryAuditStore::new());
    let audit = AuditService::new(store.clone());
    let ctx = caller(ChurchRole::MembroComum);

    let decision = AuthorizationService::decide_with_rows(
        &ctx,
        &AccessRequest::new(PermissionModule::Agenda, PermissionAction::Excluir),
        &SystemPermissionMatrix::builtin(),
        &[],
        &[],
        &audit,
    );
    assert!(!decision.allowed);
    assert!(!decision.sensitive);

    // Give any stray spawned task a chance to land before asserting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.logs().is_empty());
}
