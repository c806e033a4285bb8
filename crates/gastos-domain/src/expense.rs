// expense.rs
use crate::{Amount, DomainError, ExpenseStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Datos de entrada para crear un gasto nuevo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
  pub supplier_id: Uuid,
  pub amount: Amount,
  pub category: String,
  pub description: Option<String>,
  pub supporting_doc_key: String,
  pub reimbursement: bool,
  pub reimbursement_person: Option<String>,
}

/// Campos completos de un gasto ya persistido, para rehidratación.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseParts {
  pub id: Uuid,
  pub requested_by: Uuid,
  pub supplier_id: Uuid,
  pub amount: Amount,
  pub category: String,
  pub description: Option<String>,
  pub status: ExpenseStatus,
  pub supporting_doc_key: String,
  pub payment_doc_key: Option<String>,
  pub payment_date: Option<NaiveDate>,
  pub paid_by: Option<Uuid>,
  pub approved_by: Option<Uuid>,
  pub reimbursement: bool,
  pub reimbursement_person: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// Gasto del flujo de aprobación.
///
/// Invariantes que el tipo ayuda a conservar:
/// - `requested_by` y `supporting_doc_key` son inmutables tras la creación.
/// - `payment_doc_key`, `payment_date` y `paid_by` sólo existen en estado
///   `pagado`; al salir de `pagado` se limpian.
/// - `approved_by` se fija al aprobar o rechazar y no se borra después.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
  id: Uuid,
  requested_by: Uuid,
  supplier_id: Uuid,
  amount: Amount,
  category: String,
  description: Option<String>,
  status: ExpenseStatus,
  supporting_doc_key: String,
  payment_doc_key: Option<String>,
  payment_date: Option<NaiveDate>,
  paid_by: Option<Uuid>,
  approved_by: Option<Uuid>,
  reimbursement: bool,
  reimbursement_person: Option<String>,
  created_at: DateTime<Utc>,
}

fn trimmed(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Expense {
  /// Crea un gasto nuevo en estado `solicitado`, validando los campos
  /// obligatorios.
  pub fn new(requested_by: Uuid, datos: NewExpense) -> Result<Self, DomainError> {
    if datos.amount.is_zero() {
      return Err(DomainError::ValidationError("El monto debe ser mayor que cero".to_string()));
    }
    if datos.category.trim().is_empty() {
      return Err(DomainError::ValidationError("La categoría no puede estar vacía".to_string()));
    }
    if datos.supporting_doc_key.trim().is_empty() {
      return Err(DomainError::ValidationError("El gasto requiere un documento de respaldo".to_string()));
    }
    Ok(Self { id: Uuid::new_v4(),
              requested_by,
              supplier_id: datos.supplier_id,
              amount: datos.amount,
              category: datos.category.trim().to_string(),
              description: trimmed(datos.description),
              status: ExpenseStatus::Solicitado,
              supporting_doc_key: datos.supporting_doc_key.trim().to_string(),
              payment_doc_key: None,
              payment_date: None,
              paid_by: None,
              approved_by: None,
              reimbursement: datos.reimbursement,
              reimbursement_person: trimmed(datos.reimbursement_person),
              created_at: Utc::now() })
  }

  /// Reconstruye un gasto persistido. Aplica las mismas validaciones de
  /// contenido que `new` y además exige coherencia entre el estado y los
  /// campos de pago, de modo que una fila corrupta falle al cargarse.
  pub fn from_parts(parts: ExpenseParts) -> Result<Self, DomainError> {
    if parts.amount.is_zero() {
      return Err(DomainError::ValidationError("El monto debe ser mayor que cero".to_string()));
    }
    if parts.category.trim().is_empty() {
      return Err(DomainError::ValidationError("La categoría no puede estar vacía".to_string()));
    }
    if parts.supporting_doc_key.trim().is_empty() {
      return Err(DomainError::ValidationError("El gasto requiere un documento de respaldo".to_string()));
    }
    let paid = parts.status == ExpenseStatus::Pagado;
    if paid != parts.payment_doc_key.is_some() {
      return Err(DomainError::ValidationError(format!("Campos de pago incoherentes para el gasto {} en estado '{}'",
                                                      parts.id, parts.status)));
    }
    Ok(Self { id: parts.id,
              requested_by: parts.requested_by,
              supplier_id: parts.supplier_id,
              amount: parts.amount,
              category: parts.category,
              description: parts.description,
              status: parts.status,
              supporting_doc_key: parts.supporting_doc_key,
              payment_doc_key: parts.payment_doc_key,
              payment_date: parts.payment_date,
              paid_by: parts.paid_by,
              approved_by: parts.approved_by,
              reimbursement: parts.reimbursement,
              reimbursement_person: parts.reimbursement_person,
              created_at: parts.created_at })
  }

  /// Copia con el estado cambiado. Al salir de `pagado` limpia los campos de
  /// pago para conservar la equivalencia pago ⟺ estado `pagado`.
  pub fn with_status(&self, status: ExpenseStatus) -> Self {
    let mut updated = self.clone();
    updated.status = status;
    if status != ExpenseStatus::Pagado {
      updated.payment_doc_key = None;
      updated.payment_date = None;
      updated.paid_by = None;
    }
    updated
  }

  /// Copia con `approved_by` fijado. Nunca se usa para borrarlo.
  pub fn with_approved_by(&self, user: Uuid) -> Self {
    let mut updated = self.clone();
    updated.approved_by = Some(user);
    updated
  }

  /// Copia con los tres campos de pago fijados.
  pub fn with_payment(&self, doc_key: impl Into<String>, date: NaiveDate, paid_by: Uuid) -> Self {
    let mut updated = self.clone();
    updated.payment_doc_key = Some(doc_key.into());
    updated.payment_date = Some(date);
    updated.paid_by = Some(paid_by);
    updated
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn requested_by(&self) -> Uuid {
    self.requested_by
  }

  pub fn supplier_id(&self) -> Uuid {
    self.supplier_id
  }

  pub fn amount(&self) -> Amount {
    self.amount
  }

  pub fn category(&self) -> &str {
    &self.category
  }

  pub fn description(&self) -> Option<&str> {
    self.description.as_deref()
  }

  pub fn status(&self) -> ExpenseStatus {
    self.status
  }

  pub fn supporting_doc_key(&self) -> &str {
    &self.supporting_doc_key
  }

  pub fn payment_doc_key(&self) -> Option<&str> {
    self.payment_doc_key.as_deref()
  }

  pub fn payment_date(&self) -> Option<NaiveDate> {
    self.payment_date
  }

  pub fn paid_by(&self) -> Option<Uuid> {
    self.paid_by
  }

  pub fn approved_by(&self) -> Option<Uuid> {
    self.approved_by
  }

  pub fn reimbursement(&self) -> bool {
    self.reimbursement
  }

  pub fn reimbursement_person(&self) -> Option<&str> {
    self.reimbursement_person.as_deref()
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn is_paid(&self) -> bool {
    self.status == ExpenseStatus::Pagado
  }

  /// Equivalencia de los campos de pago con el estado actual.
  pub fn payment_is_consistent(&self) -> bool {
    let paid = self.is_paid();
    paid == self.payment_doc_key.is_some()
      && paid == self.payment_date.is_some()
      && paid == self.paid_by.is_some()
  }
}

impl fmt::Display for Expense {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Expense(id: {}, estado: {}, monto: {}, categoría: {})",
           self.id, self.status, self.amount, self.category)
  }
}
