//! Audit writer semantics: fire-and-forget vs fail-closed, insert-only.

use std::sync::Arc;
use std::time::Duration;

use access_service::models::{AuditAction, AuditLogEntry, AuditSeverity};
use access_service::services::{AuditService, MemoryAuditStore};
use uuid::Uuid;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn fire_and_forget_write_lands() {
    let store = Arc::new(MemoryAuditStore::new());
    let audit = AuditService::new(store.clone());

    audit.record(AuditLogEntry::user_action(
        Uuid::new_v4(),
        AuditAction::LoginSucceeded,
        Some("sessao".to_string()),
        None,
    ));

    settle().await;
    assert_eq!(store.logs().len(), 1);
    assert_eq!(store.logs()[0].action_key, "login_succeeded");
}

#[tokio::test]
async fn fire_and_forget_failure_never_surfaces() {
    let store = Arc::new(MemoryAuditStore::new());
    store.set_failing(true);
    let audit = AuditService::new(store.clone());

    // record() returns immediately; the failed write only hits the
    // operational log.
    audit.record(AuditLogEntry::system_action(
        AuditAction::SessionsSwept,
        None,
        None,
    ));

    settle().await;
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn required_write_fails_closed() {
    let store = Arc::new(MemoryAuditStore::new());
    let audit = AuditService::new(store.clone());

    let entry = AuditLogEntry::user_action(
        Uuid::new_v4(),
        AuditAction::ProfileGrantChanged,
        Some("permissao_perfil".to_string()),
        Some(Uuid::new_v4()),
    )
    .with_severity(AuditSeverity::Warning);

    assert!(audit.record_required(entry.clone()).await.is_ok());

    store.set_failing(true);
    let denied = audit.record_required(entry).await;
    assert!(denied.is_err());
    // Only the first write landed
    assert_eq!(store.logs().len(), 1);
}

#[tokio::test]
async fn audit_rows_are_insert_only() {
    let store = Arc::new(MemoryAuditStore::new());
    let audit = AuditService::new(store.clone());

    let first = AuditLogEntry::user_action(
        Uuid::new_v4(),
        AuditAction::LoginSucceeded,
        Some("sessao".to_string()),
        None,
    );
    let first_id = first.log_id;
    audit.record_required(first).await.unwrap();

    // Later activity appends; the earlier row is untouched.
    audit
        .record_required(AuditLogEntry::user_action(
            Uuid::new_v4(),
            AuditAction::Logout,
            Some("sessao".to_string()),
            None,
        ))
        .await
        .unwrap();

    let logs = store.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].log_id, first_id);
    assert_eq!(logs[0].action_key, "login_succeeded");
    assert!(logs[0].success_flag);
}
