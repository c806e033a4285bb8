// amount.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monto monetario de punto fijo con exactamente dos decimales.
///
/// Se representa internamente en centavos (`i64`) para que las comparaciones
/// de igualdad sean exactas. Nunca se usan flotantes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
  /// Construye un monto a partir de centavos. Rechaza valores negativos.
  pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
    if cents < 0 {
      return Err(DomainError::ValidationError(format!("El monto no puede ser negativo: {}", cents)));
    }
    Ok(Self(cents))
  }

  /// Interpreta una cadena decimal con hasta dos decimales ("150", "150.5",
  /// "150.00"). Rechaza signos, más de dos decimales y caracteres extraños.
  pub fn parse(input: &str) -> Result<Self, DomainError> {
    let text = input.trim();
    if text.is_empty() {
      return Err(DomainError::ValidationError("El monto no puede estar vacío".to_string()));
    }
    let (integer, fraction) = match text.split_once('.') {
      Some((i, f)) => (i, f),
      None => (text, ""),
    };
    if integer.is_empty() || !integer.chars().all(|c| c.is_ascii_digit()) {
      return Err(DomainError::ValidationError(format!("Monto inválido: '{}'", input)));
    }
    if fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
      return Err(DomainError::ValidationError(format!("El monto admite como máximo dos decimales: '{}'", input)));
    }
    let whole: i64 = integer.parse()
                            .map_err(|_| DomainError::ValidationError(format!("Monto fuera de rango: '{}'", input)))?;
    let cents_part: i64 = match fraction.len() {
      0 => 0,
      1 => fraction.parse::<i64>().map_err(|_| DomainError::ValidationError(format!("Monto inválido: '{}'", input)))? * 10,
      _ => fraction.parse().map_err(|_| DomainError::ValidationError(format!("Monto inválido: '{}'", input)))?,
    };
    let cents = whole.checked_mul(100)
                     .and_then(|c| c.checked_add(cents_part))
                     .ok_or_else(|| DomainError::ValidationError(format!("Monto fuera de rango: '{}'", input)))?;
    Ok(Self(cents))
  }

  pub fn cents(&self) -> i64 {
    self.0
  }

  pub fn is_zero(&self) -> bool {
    self.0 == 0
  }
}

impl fmt::Display for Amount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
  }
}
