// Archivo: domain.rs
// Propósito: tipos de datos compartidos del trámite: bitácora, comentarios,
// solicitudes de transición, filtros y vistas enriquecidas para listados.
use chrono::{DateTime, NaiveDate, Utc};
use gastos_domain::{Expense, ExpenseStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Etiqueta usada cuando el correo de un actor ya no puede resolverse.
pub const UNKNOWN_ACTOR: &str = "desconocido";

/// Acción registrada en la bitácora.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Created,
    StatusChanged,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::Created => "created",
            LogAction::StatusChanged => "status_changed",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "created" => Some(LogAction::Created),
            "status_changed" => Some(LogAction::StatusChanged),
            _ => None,
        }
    }
}

/// Entrada de bitácora, append-only. Una sola representación estructurada:
/// el mensaje humano se deriva de los campos máquina (`old_status`,
/// `new_status`), nunca al revés.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub actor: Uuid,
    pub action: LogAction,
    pub message: String,
    pub old_status: Option<ExpenseStatus>,
    pub new_status: Option<ExpenseStatus>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    /// Entrada única de creación de un gasto.
    pub fn created(expense: &Expense, supplier_name: &str, actor: Uuid) -> Self {
        Self { id: Uuid::new_v4(),
               expense_id: expense.id(),
               actor,
               action: LogAction::Created,
               message: format!("create: supplier={}, amount={}, category={}",
                                supplier_name,
                                expense.amount(),
                                expense.category()),
               old_status: None,
               new_status: Some(expense.status()),
               created_at: Utc::now() }
    }

    /// Entrada única por transición aplicada; lleva ambos estados.
    pub fn status_changed(expense_id: Uuid, actor: Uuid, old: ExpenseStatus, new: ExpenseStatus) -> Self {
        Self { id: Uuid::new_v4(),
               expense_id,
               actor,
               action: LogAction::StatusChanged,
               message: format!("status: {} -> {}", old, new),
               old_status: Some(old),
               new_status: Some(new),
               created_at: Utc::now() }
    }
}

/// Comentario sobre un gasto. Canal separado de la bitácora: escribir un
/// comentario nunca produce una entrada de bitácora.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub expense_id: Uuid,
    pub author: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(expense_id: Uuid, author: Uuid, text: &str) -> Self {
        Self { id: Uuid::new_v4(),
               expense_id,
               author,
               text: text.trim().to_string(),
               created_at: Utc::now() }
    }
}

/// Campos de pago ya resueltos que acompañan una transición a `pagado`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFields {
    pub doc_key: String,
    pub date: NaiveDate,
    pub paid_by: Uuid,
}

/// Cambio de estado que el repositorio debe aplicar de forma atómica.
/// El repositorio sólo escribe si el estado actual coincide con el esperado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub new_status: ExpenseStatus,
    pub approved_by: Option<Uuid>,
    pub payment: Option<PaymentFields>,
}

/// Resultado del compare-and-set sobre el estado de un gasto.
#[derive(Debug, Clone)]
pub enum CasResult {
    /// La escritura se aplicó; contiene el gasto actualizado.
    Applied(Expense),
    /// El estado ya no coincidía con el esperado; no se escribió nada.
    Conflict,
}

/// Documento de pago elegido por el actor al pagar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaymentDoc {
    /// Clave de un comprobante ya subido al almacén de documentos.
    Key(String),
    /// Elección explícita de reutilizar el documento de respaldo: se copia
    /// bajo el prefijo de pagos y el original se conserva.
    ReuseSupporting,
}

/// Comprobante que acompaña una transición a `pagado`. `doc` puede omitirse
/// sólo cuando el gasto ya está pagado (actualización de fecha).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentProof {
    pub doc: Option<PaymentDoc>,
    pub date: Option<NaiveDate>,
}

/// Datos opcionales que acompañan una transición.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub comment: Option<String>,
    pub payment: Option<PaymentProof>,
}

impl TransitionRequest {
    pub fn with_comment(text: &str) -> Self {
        Self { comment: Some(text.to_string()), payment: None }
    }

    pub fn paying(doc: PaymentDoc, date: Option<NaiveDate>) -> Self {
        Self { comment: None, payment: Some(PaymentProof { doc: Some(doc), date }) }
    }
}

/// Desenlace de una llamada a `transition`.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// El estado (o los datos de pago) cambió y quedó registrado en bitácora.
    Applied(Expense),
    /// Sólo se agregó el comentario; ni estado ni bitácora cambiaron.
    CommentOnly,
    /// Mismo estado y sin cambios: no se escribió nada.
    NothingToSave,
}

impl fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionOutcome::Applied(_) => f.write_str("Solicitud actualizada"),
            TransitionOutcome::CommentOnly => f.write_str("Comentario agregado"),
            TransitionOutcome::NothingToSave => f.write_str("No hay cambios que guardar."),
        }
    }
}

/// Desenlace de quitar un rol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRemoval {
    Removed,
    /// Auto-bloqueo evitado: quitarse el propio rol 'administrador' se
    /// ignora con advertencia, nunca es error.
    SelfAdminIgnored,
}

/// Filtro de búsqueda de gastos. Todos los campos son opcionales y se
/// combinan con AND.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseFilter {
    pub status: Option<ExpenseStatus>,
    pub requested_by: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub category: Option<String>,
}

impl ExpenseFilter {
    pub fn by_status(status: ExpenseStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn by_supplier(supplier_id: Uuid) -> Self {
        Self { supplier_id: Some(supplier_id), ..Self::default() }
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        self.status.map_or(true, |s| expense.status() == s)
            && self.requested_by.map_or(true, |r| expense.requested_by() == r)
            && self.supplier_id.map_or(true, |s| expense.supplier_id() == s)
            && self.category.as_deref().map_or(true, |c| expense.category() == c)
    }
}

/// Entrada de bitácora enriquecida con el correo del actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogView {
    pub created_at: DateTime<Utc>,
    pub actor_email: String,
    pub action: LogAction,
    pub message: String,
    pub old_status: Option<ExpenseStatus>,
    pub new_status: Option<ExpenseStatus>,
}

impl LogView {
    pub fn from_entry(entry: LogEntry, emails: &HashMap<Uuid, String>) -> Self {
        Self { created_at: entry.created_at,
               actor_email: emails.get(&entry.actor)
                                  .cloned()
                                  .unwrap_or_else(|| UNKNOWN_ACTOR.to_string()),
               action: entry.action,
               message: entry.message,
               old_status: entry.old_status,
               new_status: entry.new_status }
    }
}

/// Comentario enriquecido con el correo del autor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub created_at: DateTime<Utc>,
    pub author_email: String,
    pub text: String,
}

impl CommentView {
    pub fn from_comment(comment: Comment, emails: &HashMap<Uuid, String>) -> Self {
        Self { created_at: comment.created_at,
               author_email: emails.get(&comment.author)
                                   .cloned()
                                   .unwrap_or_else(|| UNKNOWN_ACTOR.to_string()),
               text: comment.text }
    }
}

/// Gasto enriquecido con nombre de proveedor y correo del solicitante.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseView {
    pub expense: Expense,
    pub supplier_name: String,
    pub requester_email: String,
}
