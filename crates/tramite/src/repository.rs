// Archivo: repository.rs
// Propósito: definir los contratos de persistencia del trámite
// (`ExpenseRepository`, `AuditRepository`, `IdentityRepository`) y el store
// de documentos (`DocumentStore`). Describe lo que deben implementar las
// persistencias (Diesel, in-memory, etc.).
use crate::domain::{CasResult, Comment, ExpenseFilter, LogEntry, StatusUpdate};
use crate::errors::Result;
use gastos_domain::{Expense, ExpenseStatus, Role, RoleSet, UserAccount};
use std::collections::HashMap;
use uuid::Uuid;

/// Contrato del repositorio de gastos.
///
/// Los gastos nunca se borran físicamente: el contrato sólo expone alta,
/// lectura y el cambio de estado con control optimista.
pub trait ExpenseRepository: Send + Sync {
    /// Recupera un gasto por id, si existe.
    fn get(&self, id: &Uuid) -> Result<Option<Expense>>;

    /// Inserta un gasto recién creado.
    fn insert(&self, expense: &Expense) -> Result<()>;

    /// Aplica un cambio de estado con compare-and-set: sólo escribe si el
    /// estado actual sigue siendo `expected_current`. Devuelve
    /// `CasResult::Conflict` sin escribir nada cuando ya no coincide.
    fn update_status(&self, id: &Uuid, expected_current: ExpenseStatus, update: &StatusUpdate) -> Result<CasResult>;

    /// Lista gastos que cumplen el filtro, ordenados del más reciente al
    /// más antiguo.
    fn find(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>>;

    /// Lista las categorías distintas presentes en los gastos, ordenadas.
    fn list_categories(&self) -> Result<Vec<String>>;
}

/// Contrato de la bitácora y los comentarios. Ambos canales son append-only:
/// no existen operaciones de edición ni borrado.
pub trait AuditRepository: Send + Sync {
    /// Agrega una entrada de bitácora.
    fn append_log(&self, entry: &LogEntry) -> Result<()>;

    /// Agrega un comentario.
    fn append_comment(&self, comment: &Comment) -> Result<()>;

    /// Lee la bitácora de un gasto, del más reciente al más antiguo.
    fn list_log(&self, expense_id: &Uuid) -> Result<Vec<LogEntry>>;

    /// Lee los comentarios de un gasto, del más reciente al más antiguo.
    fn list_comments(&self, expense_id: &Uuid) -> Result<Vec<Comment>>;
}

/// Contrato de identidad y roles. La emisión de sesiones ocurre fuera; aquí
/// sólo viven las cuentas conocidas, sus correos y sus roles.
pub trait IdentityRepository: Send + Sync {
    /// Roles actuales del usuario. Usuario desconocido ⇒ conjunto vacío.
    fn get_roles(&self, user_id: &Uuid) -> Result<RoleSet>;

    /// Asigna un rol. Idempotente: asignar un rol ya presente no es error.
    fn assign_role(&self, user_id: &Uuid, role: Role) -> Result<()>;

    /// Quita un rol. Idempotente: quitar un rol ausente no es error.
    fn remove_role(&self, user_id: &Uuid, role: Role) -> Result<()>;

    /// Resuelve correos para un lote de ids en una sola consulta. Los ids
    /// desconocidos simplemente no aparecen en el mapa.
    fn emails_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>>;

    /// Busca una cuenta por correo (ya normalizado a minúsculas).
    fn lookup_by_email(&self, email: &str) -> Result<Option<UserAccount>>;

    /// Registra una cuenta nueva.
    fn register_user(&self, account: &UserAccount) -> Result<()>;

    /// Lista todas las cuentas conocidas, ordenadas por correo.
    fn list_users(&self) -> Result<Vec<UserAccount>>;

    /// Mapa usuario → roles en una sola consulta, para listados.
    fn roles_map(&self) -> Result<HashMap<Uuid, RoleSet>>;
}

/// Store de documentos (cotizaciones y comprobantes). El contenido es opaco
/// para el trámite; sólo importan las claves.
pub trait DocumentStore: Send + Sync {
    /// Sube bytes bajo una clave.
    fn upload(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Copia un documento a otra clave conservando el original.
    fn copy(&self, src_key: &str, dest_key: &str) -> Result<()>;

    /// URL firmada de lectura con vigencia limitada, si el documento existe.
    fn signed_url(&self, key: &str, ttl_secs: u64) -> Result<Option<String>>;
}
