//! Church role model - the fixed papel_igreja hierarchy.

use serde::{Deserialize, Serialize};

/// Security level at or above which a caller counts as administrator.
pub const ADMIN_LEVEL: i16 = 10;

/// Fixed church role ladder (papel_igreja codes).
///
/// Levels are monotonic: a higher level never loses an action a lower
/// level holds for the same module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurchRole {
    MembroComum,
    Voluntario,
    LiderEmTreinamento,
    LiderCelula,
    Supervisor,
    Coordenador,
    Tesoureiro,
    Pastor,
    AdministradorGeral,
}

impl ChurchRole {
    /// All roles, ordered by ascending hierarchy level.
    pub const ALL: [ChurchRole; 9] = [
        ChurchRole::MembroComum,
        ChurchRole::Voluntario,
        ChurchRole::LiderEmTreinamento,
        ChurchRole::LiderCelula,
        ChurchRole::Supervisor,
        ChurchRole::Coordenador,
        ChurchRole::Tesoureiro,
        ChurchRole::Pastor,
        ChurchRole::AdministradorGeral,
    ];

    /// Hierarchy level (higher = more authority).
    pub fn level(&self) -> i16 {
        match self {
            ChurchRole::MembroComum => 1,
            ChurchRole::Voluntario => 2,
            ChurchRole::LiderEmTreinamento => 3,
            ChurchRole::LiderCelula => 4,
            ChurchRole::Supervisor => 5,
            ChurchRole::Coordenador => 6,
            ChurchRole::Tesoureiro => 7,
            ChurchRole::Pastor => 8,
            ChurchRole::AdministradorGeral => 10,
        }
    }

    /// Legacy storage code for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChurchRole::MembroComum => "membro_comum",
            ChurchRole::Voluntario => "voluntario",
            ChurchRole::LiderEmTreinamento => "lider_em_treinamento",
            ChurchRole::LiderCelula => "lider_celula",
            ChurchRole::Supervisor => "supervisor",
            ChurchRole::Coordenador => "coordenador",
            ChurchRole::Tesoureiro => "tesoureiro",
            ChurchRole::Pastor => "pastor",
            ChurchRole::AdministradorGeral => "administrador_geral",
        }
    }

    /// Parse a legacy storage code.
    pub fn from_code(code: &str) -> Option<Self> {
        ChurchRole::ALL.into_iter().find(|r| r.as_str() == code)
    }

    /// Check if this role counts as administrator on its own.
    pub fn is_admin(&self) -> bool {
        self.level() >= ADMIN_LEVEL
    }
}

impl std::str::FromStr for ChurchRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChurchRole::from_code(s).ok_or_else(|| format!("Unknown church role: {}", s))
    }
}

impl std::fmt::Display for ChurchRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_ordered_by_level() {
        let levels: Vec<i16> = ChurchRole::ALL.iter().map(|r| r.level()).collect();
        let mut sorted = levels.clone();
        sorted.sort_unstable();
        assert_eq!(levels, sorted);
    }

    #[test]
    fn test_code_round_trip() {
        for role in ChurchRole::ALL {
            assert_eq!(ChurchRole::from_code(role.as_str()), Some(role));
        }
        assert_eq!(ChurchRole::from_code("bispo"), None);
    }

    #[test]
    fn test_only_top_role_is_admin() {
        assert!(ChurchRole::AdministradorGeral.is_admin());
        assert!(!ChurchRole::Pastor.is_admin());
        assert!(!ChurchRole::MembroComum.is_admin());
    }
}
