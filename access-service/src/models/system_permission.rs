//! System permission matrix - the fixed (papel, modulo, acao) lookup table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashSet;
use uuid::Uuid;

use super::church_role::ChurchRole;
use super::permission::{PermissionAction, PermissionModule};

/// One row of permissoes_sistema.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemPermission {
    pub rule_id: Uuid,
    pub role_code: String,
    pub module_code: String,
    pub action_code: String,
    pub created_utc: DateTime<Utc>,
}

impl SystemPermission {
    /// Create a new matrix row.
    pub fn new(role: ChurchRole, module: PermissionModule, action: PermissionAction) -> Self {
        Self {
            rule_id: Uuid::new_v4(),
            role_code: role.as_str().to_string(),
            module_code: module.as_str().to_string(),
            action_code: action.as_str().to_string(),
            created_utc: Utc::now(),
        }
    }
}

/// Minimum hierarchy level required for a (module, action) pair.
///
/// The matrix is generated from these thresholds, which keeps it monotonic
/// in the role level by construction.
pub fn min_level(module: PermissionModule, action: PermissionAction) -> i16 {
    let action_floor = match action {
        PermissionAction::Visualizar => 1,
        PermissionAction::Criar => 2,
        PermissionAction::Editar => 3,
        PermissionAction::Excluir => 5,
        PermissionAction::Aprovar => 5,
        PermissionAction::Exportar => 6,
        PermissionAction::Gerenciar => 6,
        PermissionAction::Administrar => 8,
    };
    let module_floor = match module {
        PermissionModule::Financas => 5,
        PermissionModule::Seguranca => 8,
        _ => 1,
    };
    action_floor.max(module_floor)
}

/// In-memory view of the fixed permission matrix.
#[derive(Debug, Clone, Default)]
pub struct SystemPermissionMatrix {
    rules: HashSet<(ChurchRole, PermissionModule, PermissionAction)>,
}

impl SystemPermissionMatrix {
    /// Build from stored rows. Rows with unknown codes are ignored.
    pub fn from_rows(rows: &[SystemPermission]) -> Self {
        let rules = rows
            .iter()
            .filter_map(|row| {
                Some((
                    ChurchRole::from_code(&row.role_code)?,
                    PermissionModule::from_code(&row.module_code)?,
                    PermissionAction::from_code(&row.action_code)?,
                ))
            })
            .collect();
        Self { rules }
    }

    /// The built-in matrix: every role holds every action whose threshold
    /// its level meets.
    pub fn builtin() -> Self {
        let mut rules = HashSet::new();
        for role in ChurchRole::ALL {
            for module in PermissionModule::ALL {
                for action in PermissionAction::ALL {
                    if role.level() >= min_level(module, action) {
                        rules.insert((role, module, action));
                    }
                }
            }
        }
        Self { rules }
    }

    /// Materialize the built-in matrix as seed rows.
    pub fn builtin_rows() -> Vec<SystemPermission> {
        let mut rows: Vec<SystemPermission> = Self::builtin()
            .rules
            .into_iter()
            .map(|(role, module, action)| SystemPermission::new(role, module, action))
            .collect();
        rows.sort_by(|a, b| {
            (&a.role_code, &a.module_code, &a.action_code)
                .cmp(&(&b.role_code, &b.module_code, &b.action_code))
        });
        rows
    }

    /// Check whether the matrix allows (role, module, action).
    pub fn allows(
        &self,
        role: ChurchRole,
        module: PermissionModule,
        action: PermissionAction,
    ) -> bool {
        self.rules.contains(&(role, module, action))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_matrix_is_monotonic() {
        // Hierarchy invariant: an action held at a lower level is held at
        // every higher level for the same module.
        let matrix = SystemPermissionMatrix::builtin();
        for module in PermissionModule::ALL {
            for action in PermissionAction::ALL {
                for lower in ChurchRole::ALL {
                    for higher in ChurchRole::ALL {
                        if lower.level() < higher.level()
                            && matrix.allows(lower, module, action)
                        {
                            assert!(
                                matrix.allows(higher, module, action),
                                "{} holds {}:{} but {} does not",
                                lower,
                                module,
                                action,
                                higher
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_cell_leader_can_edit_cells() {
        let matrix = SystemPermissionMatrix::builtin();
        assert!(matrix.allows(
            ChurchRole::LiderCelula,
            PermissionModule::Celulas,
            PermissionAction::Editar
        ));
    }

    #[test]
    fn test_cell_leader_cannot_administer_finance() {
        let matrix = SystemPermissionMatrix::builtin();
        assert!(!matrix.allows(
            ChurchRole::LiderCelula,
            PermissionModule::Financas,
            PermissionAction::Administrar
        ));
        assert!(matrix.allows(
            ChurchRole::Pastor,
            PermissionModule::Financas,
            PermissionAction::Administrar
        ));
    }

    #[test]
    fn test_rows_round_trip() {
        let rows = SystemPermissionMatrix::builtin_rows();
        let rebuilt = SystemPermissionMatrix::from_rows(&rows);
        assert_eq!(rebuilt.len(), SystemPermissionMatrix::builtin().len());
    }

    #[test]
    fn test_unknown_codes_ignored() {
        let mut row = SystemPermission::new(
            ChurchRole::Pastor,
            PermissionModule::Agenda,
            PermissionAction::Criar,
        );
        row.role_code = "cardeal".to_string();
        let matrix = SystemPermissionMatrix::from_rows(&[row]);
        assert!(matrix.is_empty());
    }
}
