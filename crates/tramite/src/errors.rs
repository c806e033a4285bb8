// Archivo: errors.rs
// Propósito: definir los errores del trámite de gastos y el alias Result<T>
// usado por las APIs del crate. Los comentarios y variantes están en español.
use gastos_domain::{DomainError, ExpenseStatus};
use thiserror::Error;
use uuid::Uuid;
/// Errores del ciclo de vida de gastos.
///
/// - `NotAuthenticated`: no hay sesión activa.
/// - `RoleNotAuthorized`: el actor no tiene un rol permitido.
/// - `ExpenseNotFound`: el gasto no existe.
/// - `InvalidTargetState`: la etiqueta de estado destino no es válida.
/// - `MissingPaymentProof`: falta comprobante al pasar a pagado.
/// - `ConcurrentModification`: el estado cambió entre lectura y escritura.
/// - `Validation`: datos de entrada inválidos.
/// - `Storage`: error al acceder al almacenamiento externo.
#[derive(Error, Debug)]
pub enum TramiteError {
  /// No hay sesión: toda operación exige un usuario autenticado.
  #[error("No autenticado: se requiere una sesión activa")]
  NotAuthenticated,
  /// El actor carece de los roles permitidos para la operación.
  #[error("Rol no autorizado: el usuario {actor} no puede ejecutar '{operation}'")]
  RoleNotAuthorized { actor: Uuid, operation: String },
  /// El gasto referenciado no existe.
  #[error("Gasto no encontrado: {0}")]
  ExpenseNotFound(Uuid),
  /// La etiqueta de estado destino no corresponde a ningún estado.
  #[error("Estado destino inválido: '{0}'")]
  InvalidTargetState(String),
  /// Pasar a pagado exige comprobante o la elección explícita de copiar el
  /// documento de respaldo.
  #[error("Falta comprobante de pago para el gasto {expense_id}")]
  MissingPaymentProof { expense_id: Uuid },
  /// Conflicto optimista: el estado leído ya no coincide al escribir.
  #[error("Modificación concurrente del gasto {expense_id}: el estado cambió antes de aplicar '{attempted}'")]
  ConcurrentModification { expense_id: Uuid, attempted: ExpenseStatus },
  /// Datos de entrada inválidos.
  #[error("Error de validación: {0}")]
  Validation(String),
  /// Error genérico de almacenamiento (BD, object store, etc.).
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
  /// Error proveniente de la capa de dominio.
  #[error("Error de dominio: {0}")]
  Domain(#[from] DomainError),
  /// Error de serialización de payloads JSON.
  #[error("Error de serialización: {0}")]
  Serialization(#[from] serde_json::Error),
}
/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, TramiteError>;
