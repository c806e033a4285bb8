// supplier.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Proveedor al que se asocia un gasto. Entidad de catálogo sin ciclo de
/// vida propio: se crea y se lista; la unicidad por nombre la garantiza el
/// repositorio al escribir.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
  id: Uuid,
  name: String,
}

impl Supplier {
  pub fn new(name: &str) -> Result<Self, DomainError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(DomainError::ValidationError("El nombre del proveedor no puede estar vacío".to_string()));
    }
    Ok(Self { id: Uuid::new_v4(), name: name.to_string() })
  }

  pub fn from_parts(id: Uuid, name: &str) -> Result<Self, DomainError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(DomainError::ValidationError("El nombre del proveedor no puede estar vacío".to_string()));
    }
    Ok(Self { id, name: name.to_string() })
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl fmt::Display for Supplier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Supplier(id: {}, nombre: {})", self.id, self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_trims_name() -> Result<(), DomainError> {
    let supplier = Supplier::new("  Papelería Central  ")?;
    assert_eq!(supplier.name(), "Papelería Central");
    Ok(())
  }

  #[test]
  fn new_rejects_empty_name() {
    assert!(Supplier::new("   ").is_err());
  }
}
