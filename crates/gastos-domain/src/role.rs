// role.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Rol de aplicación asignable a un usuario.
///
/// `Administrador` pasa por encima de cualquier verificación de rol; esa
/// excepción vive en la guardia, no aquí.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Solicitante,
  Aprobador,
  Pagador,
  Lector,
  Administrador,
}

/// Conjunto de roles de un usuario, ordenado y sin duplicados.
pub type RoleSet = BTreeSet<Role>;

impl Role {
  pub const ALL: [Role; 5] =
    [Role::Solicitante, Role::Aprobador, Role::Pagador, Role::Lector, Role::Administrador];

  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Solicitante => "solicitante",
      Role::Aprobador => "aprobador",
      Role::Pagador => "pagador",
      Role::Lector => "lector",
      Role::Administrador => "administrador",
    }
  }

  pub fn parse(label: &str) -> Result<Self, DomainError> {
    match label.trim().to_lowercase().as_str() {
      "solicitante" => Ok(Role::Solicitante),
      "aprobador" => Ok(Role::Aprobador),
      "pagador" => Ok(Role::Pagador),
      "lector" => Ok(Role::Lector),
      "administrador" => Ok(Role::Administrador),
      other => Err(DomainError::ValidationError(format!("Rol desconocido: '{}'", other))),
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_roundtrip() -> Result<(), DomainError> {
    for role in Role::ALL {
      assert_eq!(Role::parse(role.as_str())?, role);
    }
    Ok(())
  }

  #[test]
  fn parse_rejects_unknown() {
    assert!(Role::parse("auditor").is_err());
  }

  #[test]
  fn roleset_deduplicates() {
    let mut set = RoleSet::new();
    set.insert(Role::Pagador);
    set.insert(Role::Pagador);
    assert_eq!(set.len(), 1);
  }
}
