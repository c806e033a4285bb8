// status.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estado del ciclo de vida de un gasto.
///
/// Las etiquetas canónicas en minúsculas ("solicitado", "aprobado",
/// "rechazado", "pagado") son las que viajan en persistencia y bitácora.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
  Solicitado,
  Aprobado,
  Rechazado,
  Pagado,
}

impl ExpenseStatus {
  pub const ALL: [ExpenseStatus; 4] =
    [ExpenseStatus::Solicitado, ExpenseStatus::Aprobado, ExpenseStatus::Rechazado, ExpenseStatus::Pagado];

  pub fn as_str(&self) -> &'static str {
    match self {
      ExpenseStatus::Solicitado => "solicitado",
      ExpenseStatus::Aprobado => "aprobado",
      ExpenseStatus::Rechazado => "rechazado",
      ExpenseStatus::Pagado => "pagado",
    }
  }

  /// Interpreta una etiqueta de estado. Acepta mayúsculas y espacios
  /// alrededor pero no sinónimos.
  pub fn parse(label: &str) -> Result<Self, DomainError> {
    match label.trim().to_lowercase().as_str() {
      "solicitado" => Ok(ExpenseStatus::Solicitado),
      "aprobado" => Ok(ExpenseStatus::Aprobado),
      "rechazado" => Ok(ExpenseStatus::Rechazado),
      "pagado" => Ok(ExpenseStatus::Pagado),
      other => Err(DomainError::ValidationError(format!("Estado desconocido: '{}'", other))),
    }
  }
}

impl fmt::Display for ExpenseStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
