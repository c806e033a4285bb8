// user.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Cuenta de usuario conocida por la aplicación. La autenticación ocurre
/// fuera; aquí sólo viven la identidad y el correo para enriquecer listados.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
  id: Uuid,
  email: String,
}

impl UserAccount {
  /// Normaliza el correo a minúsculas y valida una forma mínima
  /// (algo@algo). La validación fuerte la hace el proveedor de identidad.
  pub fn new(email: &str) -> Result<Self, DomainError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
      return Err(DomainError::ValidationError("El correo no puede estar vacío".to_string()));
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() {
      return Err(DomainError::ValidationError(format!("Correo inválido: '{}'", email)));
    }
    Ok(Self { id: Uuid::new_v4(), email })
  }

  pub fn from_parts(id: Uuid, email: &str) -> Result<Self, DomainError> {
    let mut account = Self::new(email)?;
    account.id = id;
    Ok(account)
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn email(&self) -> &str {
    &self.email
  }
}

impl fmt::Display for UserAccount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "UserAccount(id: {}, email: {})", self.id, self.email)
  }
}
