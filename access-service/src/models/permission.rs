//! Permission model - atomic (module, action, resource_type) capabilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Application modules a permission can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionModule {
    Pessoas,
    Celulas,
    Agenda,
    Financas,
    Ensino,
    Escalas,
    Comunicacao,
    Seguranca,
}

impl PermissionModule {
    pub const ALL: [PermissionModule; 8] = [
        PermissionModule::Pessoas,
        PermissionModule::Celulas,
        PermissionModule::Agenda,
        PermissionModule::Financas,
        PermissionModule::Ensino,
        PermissionModule::Escalas,
        PermissionModule::Comunicacao,
        PermissionModule::Seguranca,
    ];

    /// Legacy storage code for this module.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionModule::Pessoas => "pessoas",
            PermissionModule::Celulas => "celulas",
            PermissionModule::Agenda => "agenda",
            PermissionModule::Financas => "financas",
            PermissionModule::Ensino => "ensino",
            PermissionModule::Escalas => "escalas",
            PermissionModule::Comunicacao => "comunicacao",
            PermissionModule::Seguranca => "seguranca",
        }
    }

    /// Parse a legacy storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        PermissionModule::ALL.into_iter().find(|m| m.as_str() == code)
    }
}

impl std::fmt::Display for PermissionModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a permission can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    Visualizar,
    Criar,
    Editar,
    Excluir,
    Aprovar,
    Exportar,
    Gerenciar,
    Administrar,
}

impl PermissionAction {
    pub const ALL: [PermissionAction; 8] = [
        PermissionAction::Visualizar,
        PermissionAction::Criar,
        PermissionAction::Editar,
        PermissionAction::Excluir,
        PermissionAction::Aprovar,
        PermissionAction::Exportar,
        PermissionAction::Gerenciar,
        PermissionAction::Administrar,
    ];

    /// Legacy storage code for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionAction::Visualizar => "visualizar",
            PermissionAction::Criar => "criar",
            PermissionAction::Editar => "editar",
            PermissionAction::Excluir => "excluir",
            PermissionAction::Aprovar => "aprovar",
            PermissionAction::Exportar => "exportar",
            PermissionAction::Gerenciar => "gerenciar",
            PermissionAction::Administrar => "administrar",
        }
    }

    /// Parse a legacy storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        PermissionAction::ALL.into_iter().find(|a| a.as_str() == code)
    }
}

impl std::fmt::Display for PermissionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission entity. Identity is the (module, action, resource_type) tuple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub permission_id: Uuid,
    pub module_code: String,
    pub action_code: String,
    pub resource_type: Option<String>,
    pub is_sensitive: bool,
    pub created_utc: DateTime<Utc>,
}

impl Permission {
    /// Create a new permission.
    pub fn new(
        module: PermissionModule,
        action: PermissionAction,
        resource_type: Option<String>,
    ) -> Self {
        Self {
            permission_id: Uuid::new_v4(),
            module_code: module.as_str().to_string(),
            action_code: action.as_str().to_string(),
            resource_type,
            is_sensitive: default_sensitivity(module, action),
            created_utc: Utc::now(),
        }
    }

    /// Parse the stored module code.
    pub fn module(&self) -> Option<PermissionModule> {
        PermissionModule::from_code(&self.module_code)
    }

    /// Parse the stored action code.
    pub fn action(&self) -> Option<PermissionAction> {
        PermissionAction::from_code(&self.action_code)
    }

    /// Check if this permission covers the requested tuple.
    ///
    /// A permission without a resource_type covers any resource of its
    /// (module, action); one with a resource_type covers only that type.
    pub fn matches(
        &self,
        module: PermissionModule,
        action: PermissionAction,
        resource_type: Option<&str>,
    ) -> bool {
        if self.module_code != module.as_str() || self.action_code != action.as_str() {
            return false;
        }
        match (&self.resource_type, resource_type) {
            (None, _) => true,
            (Some(own), Some(requested)) => own == requested,
            (Some(_), None) => false,
        }
    }

    /// Canonical key: {modulo}:{acao}[:{recurso}].
    pub fn permission_key(&self) -> String {
        match &self.resource_type {
            Some(resource) => format!("{}:{}:{}", self.module_code, self.action_code, resource),
            None => format!("{}:{}", self.module_code, self.action_code),
        }
    }
}

/// Parse a canonical permission key into its parts.
pub fn parse_permission_key(
    key: &str,
) -> Option<(PermissionModule, PermissionAction, Option<String>)> {
    let mut parts = key.splitn(3, ':');
    let module = PermissionModule::from_code(parts.next()?)?;
    let action = PermissionAction::from_code(parts.next()?)?;
    let resource = parts.next().map(|s| s.to_string());
    Some((module, action, resource))
}

/// Default sensitivity for a (module, action) pair.
///
/// Finance and security permissions are sensitive across the board, as are
/// destructive or exporting operations on people records.
pub fn default_sensitivity(module: PermissionModule, action: PermissionAction) -> bool {
    match module {
        PermissionModule::Financas | PermissionModule::Seguranca => true,
        PermissionModule::Pessoas => matches!(
            action,
            PermissionAction::Excluir | PermissionAction::Exportar
        ),
        _ => false,
    }
}

/// Request to create a permission.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePermissionRequest {
    pub module: PermissionModule,
    pub action: PermissionAction,
    pub resource_type: Option<String>,
}

/// Permission response for API.
#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionResponse {
    pub permission_id: Uuid,
    pub module_code: String,
    pub action_code: String,
    pub resource_type: Option<String>,
    pub is_sensitive: bool,
    pub created_utc: DateTime<Utc>,
}

impl From<Permission> for PermissionResponse {
    fn from(p: Permission) -> Self {
        Self {
            permission_id: p.permission_id,
            module_code: p.module_code,
            action_code: p.action_code,
            resource_type: p.resource_type,
            is_sensitive: p.is_sensitive,
            created_utc: p.created_utc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_permission_key() {
        let (module, action, resource) = parse_permission_key("celulas:editar").unwrap();
        assert_eq!(module, PermissionModule::Celulas);
        assert_eq!(action, PermissionAction::Editar);
        assert!(resource.is_none());
    }

    #[test]
    fn test_parse_permission_key_with_resource() {
        let (module, action, resource) =
            parse_permission_key("financas:exportar:relatorio").unwrap();
        assert_eq!(module, PermissionModule::Financas);
        assert_eq!(action, PermissionAction::Exportar);
        assert_eq!(resource.as_deref(), Some("relatorio"));
    }

    #[test]
    fn test_parse_permission_key_rejects_unknown_codes() {
        assert!(parse_permission_key("louvor:editar").is_none());
        assert!(parse_permission_key("pessoas:destruir").is_none());
    }

    #[test]
    fn test_matches_resource_narrowing() {
        let broad = Permission::new(PermissionModule::Pessoas, PermissionAction::Editar, None);
        let narrow = Permission::new(
            PermissionModule::Pessoas,
            PermissionAction::Editar,
            Some("contato".to_string()),
        );

        assert!(broad.matches(PermissionModule::Pessoas, PermissionAction::Editar, None));
        assert!(broad.matches(
            PermissionModule::Pessoas,
            PermissionAction::Editar,
            Some("contato")
        ));
        assert!(narrow.matches(
            PermissionModule::Pessoas,
            PermissionAction::Editar,
            Some("contato")
        ));
        assert!(!narrow.matches(PermissionModule::Pessoas, PermissionAction::Editar, None));
        assert!(!narrow.matches(
            PermissionModule::Pessoas,
            PermissionAction::Editar,
            Some("endereco")
        ));
    }

    #[test]
    fn test_default_sensitivity() {
        assert!(default_sensitivity(
            PermissionModule::Financas,
            PermissionAction::Visualizar
        ));
        assert!(default_sensitivity(
            PermissionModule::Pessoas,
            PermissionAction::Exportar
        ));
        assert!(!default_sensitivity(
            PermissionModule::Celulas,
            PermissionAction::Editar
        ));
    }
}
