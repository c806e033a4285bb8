// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y wiring rápido.
//
// Incluye un almacén en memoria (`InMemoryStore`) que implementa sobre la
// misma estructura los cuatro contratos que consume el motor, y un store de
// documentos simulado (`InMemoryDocumentStore`). Estas implementaciones no
// son durables y se usan para demos o pruebas locales.
use crate::domain::{CasResult, Comment, ExpenseFilter, LogEntry, StatusUpdate};
use crate::errors::{Result, TramiteError};
use crate::repository::{AuditRepository, DocumentStore, ExpenseRepository, IdentityRepository};
use gastos_domain::{CatalogRepository, DomainError, Expense, ExpenseStatus, Person, Role, RoleSet, Supplier,
                    UserAccount};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Almacén en memoria del trámite completo: gastos, bitácora, comentarios,
/// identidad y catálogo sobre la misma estructura.
pub struct InMemoryStore {
    /// Gastos indexados por id.
    expenses: Mutex<HashMap<Uuid, Expense>>,
    /// Bitácora global en orden de inserción.
    logs: Mutex<Vec<LogEntry>>,
    /// Comentarios globales en orden de inserción.
    comments: Mutex<Vec<Comment>>,
    /// Cuentas indexadas por id.
    users: Mutex<HashMap<Uuid, UserAccount>>,
    /// Roles por usuario; usuario ausente equivale a conjunto vacío.
    roles: Mutex<HashMap<Uuid, RoleSet>>,
    suppliers: Mutex<HashMap<Uuid, Supplier>>,
    people: Mutex<HashMap<Uuid, Person>>,
    /// Cuántas veces se consultaron correos por lote (observable en pruebas).
    email_queries: AtomicUsize,
}

impl InMemoryStore {
    /// Crea una nueva instancia vacía del almacén en memoria.
    pub fn new() -> Self {
        Self { expenses: Mutex::new(HashMap::new()),
               logs: Mutex::new(Vec::new()),
               comments: Mutex::new(Vec::new()),
               users: Mutex::new(HashMap::new()),
               roles: Mutex::new(HashMap::new()),
               suppliers: Mutex::new(HashMap::new()),
               people: Mutex::new(HashMap::new()),
               email_queries: AtomicUsize::new(0) }
    }

    /// Helper para mapear `Mutex::lock()` en un `Result` con
    /// `TramiteError::Storage`.
    fn lock<'a, T>(&'a self, m: &'a Mutex<T>) -> std::result::Result<MutexGuard<'a, T>, TramiteError> {
        m.lock().map_err(|e| TramiteError::Storage(format!("mutex poisoned: {:?}", e)))
    }

    /// Igual que `lock` pero para los contratos de catálogo, que hablan
    /// `DomainError`.
    fn lock_catalog<'a, T>(&'a self, m: &'a Mutex<T>) -> std::result::Result<MutexGuard<'a, T>, DomainError> {
        m.lock().map_err(|e| DomainError::ExternalError(format!("mutex poisoned: {:?}", e)))
    }

    /// Número de consultas de correos por lote realizadas hasta ahora.
    pub fn email_query_count(&self) -> usize {
        self.email_queries.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseRepository for InMemoryStore {
    fn get(&self, id: &Uuid) -> Result<Option<Expense>> {
        let expenses = self.lock(&self.expenses)?;
        Ok(expenses.get(id).cloned())
    }

    fn insert(&self, expense: &Expense) -> Result<()> {
        self.lock(&self.expenses)?.insert(expense.id(), expense.clone());
        Ok(())
    }

    /// Compare-and-set: la escritura ocurre con el candado tomado, de modo
    /// que comparar y escribir es un solo paso observable.
    fn update_status(&self, id: &Uuid, expected_current: ExpenseStatus, update: &StatusUpdate) -> Result<CasResult> {
        let mut expenses = self.lock(&self.expenses)?;
        let current = expenses.get(id).ok_or(TramiteError::ExpenseNotFound(*id))?;
        if current.status() != expected_current {
            return Ok(CasResult::Conflict);
        }
        let mut updated = current.with_status(update.new_status);
        if let Some(approver) = update.approved_by {
            updated = updated.with_approved_by(approver);
        }
        if let Some(payment) = &update.payment {
            updated = updated.with_payment(payment.doc_key.clone(), payment.date, payment.paid_by);
        }
        expenses.insert(*id, updated.clone());
        Ok(CasResult::Applied(updated))
    }

    fn find(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
        let expenses = self.lock(&self.expenses)?;
        let mut found: Vec<Expense> = expenses.values().filter(|e| filter.matches(e)).cloned().collect();
        // Más recientes primero
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(found)
    }

    fn list_categories(&self) -> Result<Vec<String>> {
        let expenses = self.lock(&self.expenses)?;
        let set: BTreeSet<String> = expenses.values().map(|e| e.category().to_string()).collect();
        Ok(set.into_iter().collect())
    }
}

impl AuditRepository for InMemoryStore {
    fn append_log(&self, entry: &LogEntry) -> Result<()> {
        self.lock(&self.logs)?.push(entry.clone());
        Ok(())
    }

    fn append_comment(&self, comment: &Comment) -> Result<()> {
        self.lock(&self.comments)?.push(comment.clone());
        Ok(())
    }

    /// El orden de inserción es la verdad del stub: lo más reciente es lo
    /// último insertado, así que se recorre al revés.
    fn list_log(&self, expense_id: &Uuid) -> Result<Vec<LogEntry>> {
        let logs = self.lock(&self.logs)?;
        Ok(logs.iter().filter(|e| &e.expense_id == expense_id).rev().cloned().collect())
    }

    fn list_comments(&self, expense_id: &Uuid) -> Result<Vec<Comment>> {
        let comments = self.lock(&self.comments)?;
        Ok(comments.iter().filter(|c| &c.expense_id == expense_id).rev().cloned().collect())
    }
}

impl IdentityRepository for InMemoryStore {
    fn get_roles(&self, user_id: &Uuid) -> Result<RoleSet> {
        let roles = self.lock(&self.roles)?;
        Ok(roles.get(user_id).cloned().unwrap_or_default())
    }

    fn assign_role(&self, user_id: &Uuid, role: Role) -> Result<()> {
        self.lock(&self.roles)?.entry(*user_id).or_default().insert(role);
        Ok(())
    }

    fn remove_role(&self, user_id: &Uuid, role: Role) -> Result<()> {
        if let Some(set) = self.lock(&self.roles)?.get_mut(user_id) {
            set.remove(&role);
        }
        Ok(())
    }

    fn emails_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        self.email_queries.fetch_add(1, Ordering::Relaxed);
        let users = self.lock(&self.users)?;
        Ok(ids.iter()
              .filter_map(|id| users.get(id).map(|u| (*id, u.email().to_string())))
              .collect())
    }

    fn lookup_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        let needle = email.trim().to_lowercase();
        let users = self.lock(&self.users)?;
        Ok(users.values().find(|u| u.email() == needle).cloned())
    }

    fn register_user(&self, account: &UserAccount) -> Result<()> {
        let mut users = self.lock(&self.users)?;
        if users.values().any(|u| u.id() != account.id() && u.email() == account.email()) {
            return Err(TramiteError::Validation(format!("Ya existe un usuario con el correo '{}'",
                                                        account.email())));
        }
        users.insert(account.id(), account.clone());
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<UserAccount>> {
        let users = self.lock(&self.users)?;
        let mut list: Vec<UserAccount> = users.values().cloned().collect();
        list.sort_by(|a, b| a.email().cmp(b.email()));
        Ok(list)
    }

    fn roles_map(&self) -> Result<HashMap<Uuid, RoleSet>> {
        let roles = self.lock(&self.roles)?;
        Ok(roles.clone())
    }
}

impl CatalogRepository for InMemoryStore {
    fn save_supplier(&self, supplier: Supplier) -> std::result::Result<Uuid, DomainError> {
        let mut suppliers = self.lock_catalog(&self.suppliers)?;
        if suppliers.values()
                    .any(|s| s.id() != supplier.id() && s.name().eq_ignore_ascii_case(supplier.name()))
        {
            return Err(DomainError::ValidationError(format!("Ya existe un proveedor con el nombre '{}'",
                                                            supplier.name())));
        }
        let id = supplier.id();
        suppliers.insert(id, supplier);
        Ok(id)
    }

    fn get_supplier(&self, id: &Uuid) -> std::result::Result<Option<Supplier>, DomainError> {
        let suppliers = self.lock_catalog(&self.suppliers)?;
        Ok(suppliers.get(id).cloned())
    }

    fn list_suppliers(&self) -> std::result::Result<Vec<Supplier>, DomainError> {
        let suppliers = self.lock_catalog(&self.suppliers)?;
        let mut list: Vec<Supplier> = suppliers.values().cloned().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(list)
    }

    fn save_person(&self, person: Person) -> std::result::Result<Uuid, DomainError> {
        let mut people = self.lock_catalog(&self.people)?;
        if people.values().any(|p| p.id() != person.id() && p.name().eq_ignore_ascii_case(person.name())) {
            return Err(DomainError::ValidationError(format!("Ya existe una persona con el nombre '{}'",
                                                            person.name())));
        }
        let id = person.id();
        people.insert(id, person);
        Ok(id)
    }

    fn list_people(&self) -> std::result::Result<Vec<Person>, DomainError> {
        let people = self.lock_catalog(&self.people)?;
        let mut list: Vec<Person> = people.values().cloned().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(list)
    }
}

/// Store de documentos en memoria. Registra las copias realizadas para que
/// las pruebas puedan verificar que el original se conserva.
pub struct InMemoryDocumentStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    copies: Mutex<Vec<(String, String)>>,
}

impl InMemoryDocumentStore {
    /// Crea un store de documentos vacío.
    pub fn new() -> Self {
        Self { objects: Mutex::new(HashMap::new()),
               copies: Mutex::new(Vec::new()) }
    }

    fn lock<'a, T>(&'a self, m: &'a Mutex<T>) -> std::result::Result<MutexGuard<'a, T>, TramiteError> {
        m.lock().map_err(|e| TramiteError::Storage(format!("mutex poisoned: {:?}", e)))
    }

    /// Pares (origen, destino) de todas las copias realizadas.
    pub fn copies(&self) -> Result<Vec<(String, String)>> {
        Ok(self.lock(&self.copies)?.clone())
    }

    /// Verifica si existe un objeto bajo la clave dada.
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.lock(&self.objects)?.contains_key(key))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn upload(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock(&self.objects)?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    /// Copia el contenido bajo una clave nueva. El original se conserva tal
    /// cual; un origen desconocido copia contenido vacío.
    fn copy(&self, src_key: &str, dest_key: &str) -> Result<()> {
        let mut objects = self.lock(&self.objects)?;
        let bytes = objects.get(src_key).cloned().unwrap_or_default();
        objects.insert(dest_key.to_string(), bytes);
        drop(objects);
        self.lock(&self.copies)?.push((src_key.to_string(), dest_key.to_string()));
        Ok(())
    }

    fn signed_url(&self, key: &str, ttl_secs: u64) -> Result<Option<String>> {
        let objects = self.lock(&self.objects)?;
        if objects.contains_key(key) {
            Ok(Some(format!("inmem://{}?ttl={}", key, ttl_secs)))
        } else {
            Ok(None)
        }
    }
}
