//! Audit service - append-only writes for audit logs and security events.
//!
//! Writes are fire-and-forget by default: a failed write is reported to the
//! operational log and never blocks the triggering action. Sensitive
//! permission changes use the fail-closed variant instead.

use async_trait::async_trait;
use hub_core::error::AppError;
use std::sync::Arc;

use crate::models::{AuditLogEntry, SecurityEvent};

use super::Database;

/// Append-only sink for audit records. There is deliberately no update or
/// delete operation on this trait.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_log(&self, entry: &AuditLogEntry) -> Result<(), AppError>;
    async fn insert_event(&self, event: &SecurityEvent) -> Result<(), AppError>;
}

/// PostgreSQL-backed audit store.
#[derive(Clone)]
pub struct PgAuditStore {
    db: Database,
}

impl PgAuditStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn insert_log(&self, entry: &AuditLogEntry) -> Result<(), AppError> {
        self.db.insert_audit_log(entry).await
    }

    async fn insert_event(&self, event: &SecurityEvent) -> Result<(), AppError> {
        self.db.insert_security_event(event).await
    }
}

/// In-memory audit store for tests.
#[derive(Default)]
pub struct MemoryAuditStore {
    logs: std::sync::Mutex<Vec<AuditLogEntry>>,
    events: std::sync::Mutex<Vec<SecurityEvent>>,
    failing: std::sync::atomic::AtomicBool,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise failure paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn logs(&self) -> Vec<AuditLogEntry> {
        self.logs.lock().expect("mock lock poisoned").clone()
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().expect("mock lock poisoned").clone()
    }

    fn check_failing(&self) -> Result<(), AppError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::ServiceUnavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn insert_log(&self, entry: &AuditLogEntry) -> Result<(), AppError> {
        self.check_failing()?;
        self.logs
            .lock()
            .expect("mock lock poisoned")
            .push(entry.clone());
        Ok(())
    }

    async fn insert_event(&self, event: &SecurityEvent) -> Result<(), AppError> {
        self.check_failing()?;
        self.events
            .lock()
            .expect("mock lock poisoned")
            .push(event.clone());
        Ok(())
    }
}

/// Audit writer used across the service.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuditStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append an audit entry asynchronously (non-blocking).
    ///
    /// A failed write is logged operationally and never surfaces to the
    /// caller.
    pub fn record(&self, entry: AuditLogEntry) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.insert_log(&entry).await {
                tracing::error!(
                    error = %e,
                    action = %entry.action_key,
                    "Failed to write audit log"
                );
            }
        });
    }

    /// Append an audit entry and fail the caller if the write fails.
    ///
    /// Reserved for sensitive permission changes, which must not commit
    /// without their audit trail.
    pub async fn record_required(&self, entry: AuditLogEntry) -> Result<(), AppError> {
        self.store.insert_log(&entry).await.map_err(|e| {
            tracing::error!(
                error = %e,
                action = %entry.action_key,
                "Required audit write failed; aborting action"
            );
            e
        })
    }

    /// Append a security event asynchronously (non-blocking).
    pub fn record_event(&self, event: SecurityEvent) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.insert_event(&event).await {
                tracing::error!(
                    error = %e,
                    event_type = %event.event_type_code,
                    "Failed to write security event"
                );
            } else {
                tracing::warn!(
                    event_type = %event.event_type_code,
                    severity = %event.severity_code,
                    "Security event recorded"
                );
            }
        });
    }
}
