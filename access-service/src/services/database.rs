//! PostgreSQL database service for the access core.
//!
//! Single wrapper over the connection pool; every query the service runs
//! lives here.

use chrono::{DateTime, Utc};
use hub_core::error::AppError;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::models::{
    AccessAccount, ActiveSession, AssignmentDetail, AuditLogEntry, ChurchRole, DataRequest,
    DataRequestState, MfaSettings, PasskeyCredential, Permission, Person, PrivacyConsent,
    ProfilePermissionGrant, SecurityEvent, SecurityProfile, SystemPermission,
    SystemPermissionMatrix, UserProfileAssignment,
};
use crate::services::authorization::ProfileGrantDetail;

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Database health check failed: {}", e))
            })?;
        Ok(())
    }

    // ==================== Person Operations ====================

    /// Find person by ID.
    pub async fn find_person_by_id(&self, person_id: Uuid) -> Result<Option<Person>, AppError> {
        sqlx::query_as::<_, Person>("SELECT * FROM pessoas WHERE person_id = $1")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    /// Find active people in a church.
    pub async fn find_people_by_church(&self, church_id: Uuid) -> Result<Vec<Person>, AppError> {
        sqlx::query_as::<_, Person>(
            "SELECT * FROM pessoas WHERE church_id = $1 AND active_flag = true ORDER BY full_name",
        )
        .bind(church_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Update a person's editable fields.
    pub async fn update_person(&self, person: &Person) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE pessoas
            SET full_name = $1, phone = $2, congregation_id = $3, updated_utc = NOW()
            WHERE person_id = $4
            "#,
        )
        .bind(&person.full_name)
        .bind(&person.phone)
        .bind(person.congregation_id)
        .bind(person.person_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    // ==================== Account Operations ====================

    /// Find access account by email.
    pub async fn find_account_by_email(
        &self,
        email: &str,
    ) -> Result<Option<AccessAccount>, AppError> {
        sqlx::query_as::<_, AccessAccount>(
            "SELECT * FROM contas_acesso WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Security Profile Operations ====================

    /// Find profile by ID.
    pub async fn find_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<SecurityProfile>, AppError> {
        sqlx::query_as::<_, SecurityProfile>(
            "SELECT * FROM perfis_seguranca WHERE profile_id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Find all profiles, active first.
    pub async fn find_profiles(&self) -> Result<Vec<SecurityProfile>, AppError> {
        sqlx::query_as::<_, SecurityProfile>(
            "SELECT * FROM perfis_seguranca ORDER BY active_flag DESC, level DESC, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Insert a new profile.
    pub async fn insert_profile(&self, profile: &SecurityProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO perfis_seguranca (profile_id, name, display_name, description, color, icon, level, is_system, active_flag, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(profile.profile_id)
        .bind(&profile.name)
        .bind(&profile.display_name)
        .bind(&profile.description)
        .bind(&profile.color)
        .bind(&profile.icon)
        .bind(profile.level)
        .bind(profile.is_system)
        .bind(profile.active_flag)
        .bind(profile.created_utc)
        .bind(profile.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Update a profile's mutable fields.
    pub async fn update_profile(&self, profile: &SecurityProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE perfis_seguranca
            SET display_name = $1, description = $2, color = $3, icon = $4, level = $5, active_flag = $6, updated_utc = NOW()
            WHERE profile_id = $7
            "#,
        )
        .bind(&profile.display_name)
        .bind(&profile.description)
        .bind(&profile.color)
        .bind(&profile.icon)
        .bind(profile.level)
        .bind(profile.active_flag)
        .bind(profile.profile_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Deactivate a profile (soft delete).
    pub async fn deactivate_profile(&self, profile_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE perfis_seguranca SET active_flag = false, updated_utc = NOW() WHERE profile_id = $1",
        )
        .bind(profile_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    // ==================== Permission Operations ====================

    /// Find permission by ID.
    pub async fn find_permission_by_id(
        &self,
        permission_id: Uuid,
    ) -> Result<Option<Permission>, AppError> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissoes WHERE permission_id = $1")
            .bind(permission_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    /// Find permission by its identity tuple.
    pub async fn find_permission_by_tuple(
        &self,
        module_code: &str,
        action_code: &str,
        resource_type: Option<&str>,
    ) -> Result<Option<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            r#"
            SELECT * FROM permissoes
            WHERE module_code = $1 AND action_code = $2 AND resource_type IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(module_code)
        .bind(action_code)
        .bind(resource_type)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Get all permissions.
    pub async fn find_permissions(&self) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissoes ORDER BY module_code, action_code, resource_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Insert a new permission.
    pub async fn insert_permission(&self, permission: &Permission) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO permissoes (permission_id, module_code, action_code, resource_type, is_sensitive, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(permission.permission_id)
        .bind(&permission.module_code)
        .bind(&permission.action_code)
        .bind(&permission.resource_type)
        .bind(permission.is_sensitive)
        .bind(permission.created_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    // ==================== Profile Grant Operations ====================

    /// Insert or replace a grant on a profile.
    pub async fn upsert_grant(&self, grant: &ProfilePermissionGrant) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO permissoes_perfil (grant_id, profile_id, permission_id, granted, conditions, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (profile_id, permission_id)
            DO UPDATE SET granted = EXCLUDED.granted, conditions = EXCLUDED.conditions
            "#,
        )
        .bind(grant.grant_id)
        .bind(grant.profile_id)
        .bind(grant.permission_id)
        .bind(grant.granted)
        .bind(&grant.conditions)
        .bind(grant.created_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Remove a grant from a profile.
    pub async fn delete_grant(
        &self,
        profile_id: Uuid,
        permission_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "DELETE FROM permissoes_perfil WHERE profile_id = $1 AND permission_id = $2",
        )
        .bind(profile_id)
        .bind(permission_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Grants of one profile, joined with their permissions.
    pub async fn find_grant_details_for_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Vec<ProfileGrantDetail>, AppError> {
        self.find_grant_details_for_profiles(&[profile_id]).await
    }

    /// Grants of a set of profiles, joined with their permissions.
    pub async fn find_grant_details_for_profiles(
        &self,
        profile_ids: &[Uuid],
    ) -> Result<Vec<ProfileGrantDetail>, AppError> {
        if profile_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ProfileGrantDetail>(
            r#"
            SELECT pg.grant_id, pg.profile_id, pg.permission_id, pg.granted, pg.conditions,
                   p.module_code, p.action_code, p.resource_type, p.is_sensitive
            FROM permissoes_perfil pg
            JOIN permissoes p ON p.permission_id = pg.permission_id
            WHERE pg.profile_id = ANY($1)
            "#,
        )
        .bind(profile_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Profile Assignment Operations ====================

    /// Active-flagged assignments for a person. Expiry is evaluated by the
    /// resolver, not here.
    pub async fn find_assignments_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<UserProfileAssignment>, AppError> {
        sqlx::query_as::<_, UserProfileAssignment>(
            "SELECT * FROM perfis_usuario WHERE person_id = $1 AND active_flag = true",
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Assignment rows joined with profile details for display.
    pub async fn find_assignment_details_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<AssignmentDetail>, AppError> {
        sqlx::query_as::<_, AssignmentDetail>(
            r#"
            SELECT a.assignment_id, a.profile_id, p.name AS profile_name, p.level AS profile_level,
                   a.assigned_at_utc, a.expires_at_utc
            FROM perfis_usuario a
            JOIN perfis_seguranca p ON p.profile_id = a.profile_id
            WHERE a.person_id = $1 AND a.active_flag = true
            ORDER BY a.assigned_at_utc DESC
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Insert a new assignment.
    pub async fn insert_assignment(
        &self,
        assignment: &UserProfileAssignment,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO perfis_usuario (assignment_id, person_id, profile_id, active_flag, assigned_by, assigned_at_utc, expires_at_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(assignment.assignment_id)
        .bind(assignment.person_id)
        .bind(assignment.profile_id)
        .bind(assignment.active_flag)
        .bind(assignment.assigned_by)
        .bind(assignment.assigned_at_utc)
        .bind(assignment.expires_at_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Deactivate an assignment (unassign).
    pub async fn deactivate_assignment(&self, assignment_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE perfis_usuario SET active_flag = false WHERE assignment_id = $1")
            .bind(assignment_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    /// Find assignment by ID.
    pub async fn find_assignment_by_id(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<UserProfileAssignment>, AppError> {
        sqlx::query_as::<_, UserProfileAssignment>(
            "SELECT * FROM perfis_usuario WHERE assignment_id = $1",
        )
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Highest level among the person's current profiles.
    pub async fn find_max_profile_level_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Option<i16>, AppError> {
        let row: (Option<i16>,) = sqlx::query_as(
            r#"
            SELECT MAX(p.level) FROM perfis_seguranca p
            JOIN perfis_usuario a ON a.profile_id = p.profile_id
            WHERE a.person_id = $1
              AND a.active_flag = true
              AND p.active_flag = true
              AND (a.expires_at_utc IS NULL OR a.expires_at_utc > NOW())
            "#,
        )
        .bind(person_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.0)
    }

    // ==================== System Permission Operations ====================

    /// Matrix rows for one role.
    pub async fn find_system_permissions_for_role(
        &self,
        role: ChurchRole,
    ) -> Result<Vec<SystemPermission>, AppError> {
        sqlx::query_as::<_, SystemPermission>(
            "SELECT * FROM permissoes_sistema WHERE role_code = $1",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Seed the fixed matrix when the table is empty. Idempotent; returns
    /// the number of rows inserted.
    pub async fn ensure_system_permissions(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM permissoes_sistema")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;
        if count > 0 {
            return Ok(0);
        }

        let rows = SystemPermissionMatrix::builtin_rows();
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        for row in &rows {
            sqlx::query(
                r#"
                INSERT INTO permissoes_sistema (rule_id, role_code, module_code, action_code, created_utc)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (role_code, module_code, action_code) DO NOTHING
                "#,
            )
            .bind(row.rule_id)
            .bind(&row.role_code)
            .bind(&row.module_code)
            .bind(&row.action_code)
            .bind(row.created_utc)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;
        }
        tx.commit().await.map_err(AppError::from)?;
        Ok(rows.len() as u64)
    }

    // ==================== Session Operations ====================

    /// Insert a new session.
    pub async fn insert_session(&self, session: &ActiveSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessoes_ativas (session_id, person_id, token_hash_text, ip_address, user_agent, device_label, location_label, created_utc, last_activity_utc, expires_at_utc, revoked_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(session.session_id)
        .bind(session.person_id)
        .bind(&session.token_hash_text)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(&session.device_label)
        .bind(&session.location_label)
        .bind(session.created_utc)
        .bind(session.last_activity_utc)
        .bind(session.expires_at_utc)
        .bind(session.revoked_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Find a non-revoked session by token hash.
    pub async fn find_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<ActiveSession>, AppError> {
        sqlx::query_as::<_, ActiveSession>(
            "SELECT * FROM sessoes_ativas WHERE token_hash_text = $1 AND revoked_utc IS NULL",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Touch a session's heartbeat.
    pub async fn touch_session(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessoes_ativas SET last_activity_utc = NOW() WHERE session_id = $1 AND revoked_utc IS NULL",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Revoke a session. A no-op when already revoked.
    pub async fn revoke_session(&self, session_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessoes_ativas SET revoked_utc = NOW() WHERE session_id = $1 AND revoked_utc IS NULL",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Revoke a session owned by a specific person. A no-op when already
    /// revoked or not owned.
    pub async fn revoke_person_session(
        &self,
        person_id: Uuid,
        session_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessoes_ativas SET revoked_utc = NOW() WHERE session_id = $1 AND person_id = $2 AND revoked_utc IS NULL",
        )
        .bind(session_id)
        .bind(person_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Revoke all sessions for a person.
    pub async fn revoke_all_person_sessions(&self, person_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE sessoes_ativas SET revoked_utc = NOW() WHERE person_id = $1 AND revoked_utc IS NULL",
        )
        .bind(person_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Live sessions for a person.
    pub async fn find_active_sessions_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<ActiveSession>, AppError> {
        sqlx::query_as::<_, ActiveSession>(
            r#"
            SELECT * FROM sessoes_ativas
            WHERE person_id = $1 AND revoked_utc IS NULL AND expires_at_utc > NOW()
            ORDER BY last_activity_utc DESC
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Recent sessions for a person, including revoked ones (login history
    /// for the suspicious-login heuristic).
    pub async fn find_recent_sessions_for_person(
        &self,
        person_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ActiveSession>, AppError> {
        sqlx::query_as::<_, ActiveSession>(
            "SELECT * FROM sessoes_ativas WHERE person_id = $1 ORDER BY created_utc DESC LIMIT $2",
        )
        .bind(person_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Revoke every session past its expiry; returns the swept count.
    pub async fn revoke_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE sessoes_ativas SET revoked_utc = NOW() WHERE expires_at_utc <= NOW() AND revoked_utc IS NULL",
        )
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }

    // ==================== Passkey Operations ====================

    /// Insert a new passkey.
    pub async fn insert_passkey(&self, credential: &PasskeyCredential) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO credenciais_passkey (credential_id, person_id, public_key_text, sign_count, transports, label, created_utc, last_used_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&credential.credential_id)
        .bind(credential.person_id)
        .bind(&credential.public_key_text)
        .bind(credential.sign_count)
        .bind(&credential.transports)
        .bind(&credential.label)
        .bind(credential.created_utc)
        .bind(credential.last_used_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Find passkey by credential ID.
    pub async fn find_passkey_by_credential_id(
        &self,
        credential_id: &str,
    ) -> Result<Option<PasskeyCredential>, AppError> {
        sqlx::query_as::<_, PasskeyCredential>(
            "SELECT * FROM credenciais_passkey WHERE credential_id = $1",
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Advance a passkey's counter after a successful assertion.
    pub async fn update_passkey_counter(
        &self,
        credential_id: &str,
        sign_count: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE credenciais_passkey SET sign_count = $1, last_used_utc = NOW() WHERE credential_id = $2",
        )
        .bind(sign_count)
        .bind(credential_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Passkeys registered by a person.
    pub async fn find_passkeys_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<PasskeyCredential>, AppError> {
        sqlx::query_as::<_, PasskeyCredential>(
            "SELECT * FROM credenciais_passkey WHERE person_id = $1 ORDER BY created_utc",
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== MFA Operations ====================

    /// Find a person's MFA settings.
    pub async fn find_mfa_settings(
        &self,
        person_id: Uuid,
    ) -> Result<Option<MfaSettings>, AppError> {
        sqlx::query_as::<_, MfaSettings>("SELECT * FROM mfa_usuario WHERE person_id = $1")
            .bind(person_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)
    }

    /// Insert or replace a person's MFA settings.
    pub async fn upsert_mfa_settings(&self, settings: &MfaSettings) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO mfa_usuario (person_id, phone_number, backup_code_hashes, enabled_flag, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (person_id)
            DO UPDATE SET phone_number = EXCLUDED.phone_number,
                          backup_code_hashes = EXCLUDED.backup_code_hashes,
                          enabled_flag = EXCLUDED.enabled_flag,
                          updated_utc = NOW()
            "#,
        )
        .bind(settings.person_id)
        .bind(&settings.phone_number)
        .bind(&settings.backup_code_hashes)
        .bind(settings.enabled_flag)
        .bind(settings.created_utc)
        .bind(settings.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Persist the remaining backup-code hashes after one is consumed.
    pub async fn update_backup_code_hashes(
        &self,
        person_id: Uuid,
        hashes: &[String],
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE mfa_usuario SET backup_code_hashes = $1, updated_utc = NOW() WHERE person_id = $2",
        )
        .bind(hashes)
        .bind(person_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    // ==================== Audit Log Operations ====================

    /// Append an audit log entry. Audit rows are insert-only.
    pub async fn insert_audit_log(&self, entry: &AuditLogEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO logs_auditoria (log_id, actor_person_id, action_key, resource_type, resource_id, old_value, new_value, success_flag, severity_code, ip_address, user_agent, session_id, metadata, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(entry.log_id)
        .bind(entry.actor_person_id)
        .bind(&entry.action_key)
        .bind(&entry.resource_type)
        .bind(entry.resource_id)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .bind(entry.success_flag)
        .bind(&entry.severity_code)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(entry.session_id)
        .bind(&entry.metadata)
        .bind(entry.created_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Find audit logs with filtering and pagination.
    #[allow(clippy::too_many_arguments)]
    pub async fn find_audit_logs(
        &self,
        actor_person_id: Option<Uuid>,
        action_key: Option<&str>,
        resource_type: Option<&str>,
        resource_id: Option<Uuid>,
        from_utc: Option<DateTime<Utc>>,
        to_utc: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<AuditLogEntry>, i64), AppError> {
        // Build dynamic WHERE clause
        let mut conditions = vec!["1 = 1".to_string()];
        let mut param_idx = 1;

        if actor_person_id.is_some() {
            conditions.push(format!("actor_person_id = ${}", param_idx));
            param_idx += 1;
        }
        if action_key.is_some() {
            conditions.push(format!("action_key = ${}", param_idx));
            param_idx += 1;
        }
        if resource_type.is_some() {
            conditions.push(format!("resource_type = ${}", param_idx));
            param_idx += 1;
        }
        if resource_id.is_some() {
            conditions.push(format!("resource_id = ${}", param_idx));
            param_idx += 1;
        }
        if from_utc.is_some() {
            conditions.push(format!("created_utc >= ${}", param_idx));
            param_idx += 1;
        }
        if to_utc.is_some() {
            conditions.push(format!("created_utc <= ${}", param_idx));
            param_idx += 1;
        }

        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM logs_auditoria WHERE {}", where_clause);
        let data_query = format!(
            "SELECT * FROM logs_auditoria WHERE {} ORDER BY created_utc DESC LIMIT ${} OFFSET ${}",
            where_clause,
            param_idx,
            param_idx + 1
        );

        let mut count_q = sqlx::query_as::<_, (i64,)>(&count_query);
        if let Some(actor) = actor_person_id {
            count_q = count_q.bind(actor);
        }
        if let Some(action) = action_key {
            count_q = count_q.bind(action);
        }
        if let Some(kind) = resource_type {
            count_q = count_q.bind(kind);
        }
        if let Some(rid) = resource_id {
            count_q = count_q.bind(rid);
        }
        if let Some(from) = from_utc {
            count_q = count_q.bind(from);
        }
        if let Some(to) = to_utc {
            count_q = count_q.bind(to);
        }

        let (total,) = count_q.fetch_one(&self.pool).await.map_err(AppError::from)?;

        let mut data_q = sqlx::query_as::<_, AuditLogEntry>(&data_query);
        if let Some(actor) = actor_person_id {
            data_q = data_q.bind(actor);
        }
        if let Some(action) = action_key {
            data_q = data_q.bind(action);
        }
        if let Some(kind) = resource_type {
            data_q = data_q.bind(kind);
        }
        if let Some(rid) = resource_id {
            data_q = data_q.bind(rid);
        }
        if let Some(from) = from_utc {
            data_q = data_q.bind(from);
        }
        if let Some(to) = to_utc {
            data_q = data_q.bind(to);
        }
        data_q = data_q.bind(limit).bind(offset);

        let entries = data_q.fetch_all(&self.pool).await.map_err(AppError::from)?;

        Ok((entries, total))
    }

    // ==================== Security Event Operations ====================

    /// Append a security event.
    pub async fn insert_security_event(&self, event: &SecurityEvent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO eventos_seguranca (event_id, person_id, event_type_code, severity_code, context, ip_address, user_agent, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.event_id)
        .bind(event.person_id)
        .bind(&event.event_type_code)
        .bind(&event.severity_code)
        .bind(&event.context)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(event.created_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Recent security events, optionally for one person.
    pub async fn find_security_events(
        &self,
        person_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SecurityEvent>, AppError> {
        match person_id {
            Some(person_id) => sqlx::query_as::<_, SecurityEvent>(
                "SELECT * FROM eventos_seguranca WHERE person_id = $1 ORDER BY created_utc DESC LIMIT $2 OFFSET $3",
            )
            .bind(person_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from),
            None => sqlx::query_as::<_, SecurityEvent>(
                "SELECT * FROM eventos_seguranca ORDER BY created_utc DESC LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from),
        }
    }

    // ==================== Consent Operations ====================

    /// Record a consent grant.
    pub async fn insert_consent(&self, consent: &PrivacyConsent) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO consentimentos (consent_id, person_id, consent_type_code, version_text, granted_utc, revoked_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(consent.consent_id)
        .bind(consent.person_id)
        .bind(&consent.consent_type_code)
        .bind(&consent.version_text)
        .bind(consent.granted_utc)
        .bind(consent.revoked_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Revoke a consent owned by a person. A no-op when already revoked.
    pub async fn revoke_consent(&self, person_id: Uuid, consent_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE consentimentos SET revoked_utc = NOW() WHERE consent_id = $1 AND person_id = $2 AND revoked_utc IS NULL",
        )
        .bind(consent_id)
        .bind(person_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// A person's consents, newest first.
    pub async fn find_consents_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<PrivacyConsent>, AppError> {
        sqlx::query_as::<_, PrivacyConsent>(
            "SELECT * FROM consentimentos WHERE person_id = $1 ORDER BY granted_utc DESC",
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }

    // ==================== Data Request Operations ====================

    /// Open a data request.
    pub async fn insert_data_request(&self, request: &DataRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO solicitacoes_dados (request_id, person_id, request_type_code, state_code, failure_reason, created_utc, updated_utc, completed_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.request_id)
        .bind(request.person_id)
        .bind(&request.request_type_code)
        .bind(&request.state_code)
        .bind(&request.failure_reason)
        .bind(request.created_utc)
        .bind(request.updated_utc)
        .bind(request.completed_utc)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Find data request by ID.
    pub async fn find_data_request_by_id(
        &self,
        request_id: Uuid,
    ) -> Result<Option<DataRequest>, AppError> {
        sqlx::query_as::<_, DataRequest>(
            "SELECT * FROM solicitacoes_dados WHERE request_id = $1",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)
    }

    /// Persist a data request's lifecycle change.
    pub async fn update_data_request(&self, request: &DataRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE solicitacoes_dados
            SET state_code = $1, failure_reason = $2, updated_utc = $3, completed_utc = $4
            WHERE request_id = $5
            "#,
        )
        .bind(&request.state_code)
        .bind(&request.failure_reason)
        .bind(request.updated_utc)
        .bind(request.completed_utc)
        .bind(request.request_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }

    /// Data requests, optionally filtered by state, newest first.
    pub async fn find_data_requests(
        &self,
        state: Option<DataRequestState>,
    ) -> Result<Vec<DataRequest>, AppError> {
        match state {
            Some(state) => sqlx::query_as::<_, DataRequest>(
                "SELECT * FROM solicitacoes_dados WHERE state_code = $1 ORDER BY created_utc DESC",
            )
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from),
            None => sqlx::query_as::<_, DataRequest>(
                "SELECT * FROM solicitacoes_dados ORDER BY created_utc DESC",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from),
        }
    }

    /// A person's own data requests.
    pub async fn find_data_requests_for_person(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<DataRequest>, AppError> {
        sqlx::query_as::<_, DataRequest>(
            "SELECT * FROM solicitacoes_dados WHERE person_id = $1 ORDER BY created_utc DESC",
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)
    }
}
