// person.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Persona a la que puede reembolsarse un gasto. Catálogo simple, análogo a
/// `Supplier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  id: Uuid,
  name: String,
}

impl Person {
  pub fn new(name: &str) -> Result<Self, DomainError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(DomainError::ValidationError("El nombre de la persona no puede estar vacío".to_string()));
    }
    Ok(Self { id: Uuid::new_v4(), name: name.to_string() })
  }

  pub fn from_parts(id: Uuid, name: &str) -> Result<Self, DomainError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(DomainError::ValidationError("El nombre de la persona no puede estar vacío".to_string()));
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

impl fmt::Display for Person {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Person(id: {}, nombre: {})", self.id, self.name)
  }
}
