// Archivo: engine.rs
// Propósito: implementar el motor `LifecycleEngine` del trámite de gastos.
//
// Nota: el motor orquesta guardia de roles, tabla de transiciones, CAS de
// estado, bitácora y enriquecimiento de listados. No conoce la persistencia
// concreta: todo pasa por los contratos de `repository.rs`.
use crate::cache::SignatureCache;
use crate::domain::{CasResult, Comment, ExpenseFilter, ExpenseView, LogEntry, LogView, CommentView, PaymentDoc,
                    PaymentFields, PaymentProof, RoleRemoval, StatusUpdate, TransitionOutcome, TransitionRequest,
                    UNKNOWN_ACTOR};
use crate::errors::{Result, TramiteError};
use crate::guard;
use crate::repository::{AuditRepository, DocumentStore, ExpenseRepository, IdentityRepository};
use crate::transitions;
use chrono::{Duration, Utc};
use gastos_domain::{CatalogRepository, Expense, ExpenseStatus, NewExpense, Person, Role, RoleSet, Supplier,
                    UserAccount};
use gastos_domain::Amount;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Límite de resultados del detector de gastos similares.
const SIMILAR_LIMIT: usize = 20;

/// Firmas de cache para los catálogos.
const SIG_SUPPLIERS: &str = "suppliers";
const SIG_PEOPLE: &str = "people";

fn roles_signature(user: Uuid) -> String {
    format!("roles/{}", user)
}

/// Configuración del motor.
///
/// Los valores por defecto reproducen el comportamiento estándar del
/// trámite: ventana de 30 días para similares, URLs firmadas de 10 minutos
/// y comprobantes reutilizados bajo `payments/`.
pub struct EngineConfig {
    /// Ventana en días, hacia atrás desde hoy, del detector de similares.
    pub similar_window_days: i64,
    /// Vigencia en segundos de las URLs firmadas de documentos.
    pub signed_url_ttl_secs: u64,
    /// Prefijo bajo el que se copia el respaldo reutilizado como comprobante.
    pub payments_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { similar_window_days: 30,
               signed_url_ttl_secs: 600,
               payments_prefix: "payments/".to_string() }
    }
}

/// Motor del ciclo de vida de gastos.
///
/// Responsabilidades principales:
/// - Verificar sesión y roles antes de cualquier mutación (falla cerrado)
/// - Aplicar la tabla de transiciones y el CAS de estado
/// - Derivar exactamente una entrada de bitácora por transición aplicada
/// - Enriquecer listados con una sola consulta de identidad por llamada
///
/// Nota sobre errores y concurrencia:
/// - `update_status` usa compare-and-set sobre el estado leído; un
///   `CasResult::Conflict` se reporta como `ConcurrentModification` y no
///   escribe nada.
/// - La entrada de bitácora de una transición se escribe de forma síncrona
///   y propaga errores; la de creación es best-effort y sólo se advierte.
pub struct LifecycleEngine<S, D>
    where S: ExpenseRepository + AuditRepository + IdentityRepository + CatalogRepository,
          D: DocumentStore
{
    store: Arc<S>,
    documents: Arc<D>,
    config: EngineConfig,
    /// Cache explícita por firma (roles y catálogos); las mutaciones que
    /// cambian esos datos la invalidan.
    cache: SignatureCache,
}

impl<S, D> LifecycleEngine<S, D>
    where S: ExpenseRepository + AuditRepository + IdentityRepository + CatalogRepository,
          D: DocumentStore
{
    /// Crea una nueva instancia del motor sobre el almacén y el store de
    /// documentos inyectados.
    pub fn new(store: Arc<S>, documents: Arc<D>, config: EngineConfig) -> Self {
        Self { store,
               documents,
               config,
               cache: SignatureCache::new() }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ----- alta y transición de gastos -----

    /// Crea un gasto en estado `solicitado`. Requiere rol `solicitante`.
    ///
    /// Valida monto > 0, proveedor existente y documento de respaldo. La
    /// entrada de bitácora "create" es best-effort: si falla se advierte en
    /// el log y el gasto queda creado de todas formas.
    pub fn create_expense(&self, actor: Uuid, datos: NewExpense) -> Result<Expense> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Solicitante], "crear gasto")?;

        let supplier = self.store
                           .get_supplier(&datos.supplier_id)?
                           .ok_or_else(|| TramiteError::Validation(format!("Proveedor no encontrado: {}",
                                                                           datos.supplier_id)))?;
        let expense = Expense::new(actor, datos)?;
        self.store.insert(&expense)?;

        let entry = LogEntry::created(&expense, supplier.name(), actor);
        if let Err(e) = self.store.append_log(&entry) {
            log::warn!("bitácora de creación no registrada para el gasto {}: {}", expense.id(), e);
        }
        Ok(expense)
    }

    /// Cambia el estado de un gasto según la tabla de transiciones.
    ///
    /// - El rol del actor debe permitir el estado destino.
    /// - Pasar a `pagado` exige comprobante (`PaymentDoc::Key`) o la
    ///   elección explícita de copiar el respaldo
    ///   (`PaymentDoc::ReuseSupporting`); la fecha de pago por omisión es
    ///   hoy. El comprobante se ignora para cualquier otro destino.
    /// - Mismo estado y sin cambios de pago: no se escribe nada
    ///   (`NothingToSave`), o sólo el comentario (`CommentOnly`).
    /// - Toda escritura aplicada deja exactamente una entrada de bitácora
    ///   "anterior -> nuevo"; el comentario opcional va por su canal y
    ///   nunca a la bitácora.
    pub fn transition(&self,
                      expense_id: Uuid,
                      actor: Uuid,
                      new_status: ExpenseStatus,
                      request: TransitionRequest)
                      -> Result<TransitionOutcome> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor,
                            &roles,
                            transitions::roles_allowed_for(new_status),
                            &format!("cambiar estado a '{}'", new_status))?;

        let expense = self.load_expense(&expense_id)?;
        let previous = expense.status();

        let payment = if new_status == ExpenseStatus::Pagado {
            Some(self.resolve_payment(&expense, actor, request.payment.as_ref())?)
        } else {
            None
        };

        let status_changed = new_status != previous;
        let payment_changed = match &payment {
            Some(fields) => {
                expense.payment_doc_key() != Some(fields.doc_key.as_str())
                    || expense.payment_date() != Some(fields.date)
            }
            None => false,
        };
        let comment_text = request.comment.as_deref().map(str::trim).filter(|t| !t.is_empty());

        if !status_changed && !payment_changed {
            return match comment_text {
                Some(text) => {
                    self.store.append_comment(&Comment::new(expense_id, actor, text))?;
                    Ok(TransitionOutcome::CommentOnly)
                }
                None => Ok(TransitionOutcome::NothingToSave),
            };
        }

        let update = StatusUpdate { new_status,
                                    approved_by: matches!(new_status,
                                                          ExpenseStatus::Aprobado | ExpenseStatus::Rechazado)
                                                 .then_some(actor),
                                    payment };
        let updated = match self.store.update_status(&expense_id, previous, &update)? {
            CasResult::Applied(updated) => updated,
            CasResult::Conflict => {
                return Err(TramiteError::ConcurrentModification { expense_id, attempted: new_status })
            }
        };

        self.store
            .append_log(&LogEntry::status_changed(expense_id, actor, previous, new_status))?;
        if let Some(text) = comment_text {
            self.store.append_comment(&Comment::new(expense_id, actor, text))?;
        }
        Ok(TransitionOutcome::Applied(updated))
    }

    /// Resuelve los campos de pago para una transición a `pagado`.
    ///
    /// Sin comprobante nuevo, un gasto ya pagado conserva el actual (permite
    /// actualizar sólo la fecha); un gasto sin comprobante es
    /// `MissingPaymentProof`.
    fn resolve_payment(&self, expense: &Expense, actor: Uuid, proof: Option<&PaymentProof>) -> Result<PaymentFields> {
        let (doc, date) = match proof {
            Some(p) => (p.doc.as_ref(), p.date),
            None => (None, None),
        };
        let doc_key = match doc {
            Some(PaymentDoc::Key(key)) => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(TramiteError::Validation("La clave del comprobante no puede estar vacía".to_string()));
                }
                key.to_string()
            }
            Some(PaymentDoc::ReuseSupporting) => {
                let dest = format!("{}{}", self.config.payments_prefix, expense.supporting_doc_key());
                self.documents.copy(expense.supporting_doc_key(), &dest)?;
                dest
            }
            None => match expense.payment_doc_key() {
                Some(existing) => existing.to_string(),
                None => return Err(TramiteError::MissingPaymentProof { expense_id: expense.id() }),
            },
        };
        let date = date.or_else(|| expense.payment_date()).unwrap_or_else(|| Utc::now().date_naive());
        Ok(PaymentFields { doc_key, date, paid_by: actor })
    }

    /// Agrega un comentario a un gasto. Cualquier rol puede comentar, en
    /// cualquier estado. Nunca genera entrada de bitácora.
    pub fn add_comment(&self, expense_id: Uuid, actor: Uuid, text: &str) -> Result<Comment> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "comentar")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TramiteError::Validation("El comentario no puede estar vacío".to_string()));
        }
        self.load_expense(&expense_id)?;
        let comment = Comment::new(expense_id, actor, text);
        self.store.append_comment(&comment)?;
        Ok(comment)
    }

    /// Gastos del mismo proveedor con el mismo monto exacto dentro de la
    /// ventana configurada. Es sólo una advertencia para el solicitante:
    /// nunca bloquea la creación.
    pub fn find_similar(&self, actor: Uuid, supplier_id: Uuid, amount: Amount) -> Result<Vec<Expense>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Solicitante], "buscar gastos similares")?;
        let cutoff = Utc::now() - Duration::days(self.config.similar_window_days);
        let mut similar: Vec<Expense> = self.store
                                            .find(&ExpenseFilter::by_supplier(supplier_id))?
                                            .into_iter()
                                            .filter(|e| e.amount() == amount && e.created_at() >= cutoff)
                                            .collect();
        similar.truncate(SIMILAR_LIMIT);
        Ok(similar)
    }

    // ----- consultas enriquecidas -----

    /// Bitácora de un gasto, del más reciente al más antiguo, con el correo
    /// de cada actor resuelto en una sola consulta de identidad.
    pub fn list_log(&self, actor: Uuid, expense_id: Uuid) -> Result<Vec<LogView>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "ver bitácora")?;
        self.load_expense(&expense_id)?;
        let entries = self.store.list_log(&expense_id)?;
        let emails = self.emails_for(entries.iter().map(|e| e.actor))?;
        Ok(entries.into_iter().map(|e| LogView::from_entry(e, &emails)).collect())
    }

    /// Comentarios de un gasto, del más reciente al más antiguo, con el
    /// correo de cada autor resuelto en una sola consulta de identidad.
    pub fn list_comments(&self, actor: Uuid, expense_id: Uuid) -> Result<Vec<CommentView>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "ver comentarios")?;
        self.load_expense(&expense_id)?;
        let comments = self.store.list_comments(&expense_id)?;
        let emails = self.emails_for(comments.iter().map(|c| c.author))?;
        Ok(comments.into_iter().map(|c| CommentView::from_comment(c, &emails)).collect())
    }

    /// Un gasto enriquecido. Un actor cuyo único rol es `solicitante` sólo
    /// puede ver sus propios gastos.
    pub fn get_expense(&self, actor: Uuid, expense_id: Uuid) -> Result<ExpenseView> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "ver gasto")?;
        let expense = self.load_expense(&expense_id)?;
        if self.solicitante_only(&roles) && expense.requested_by() != actor {
            return Err(TramiteError::RoleNotAuthorized { actor, operation: "ver gasto ajeno".to_string() });
        }
        let mut views = self.enrich(vec![expense])?;
        views.pop()
             .ok_or_else(|| TramiteError::Storage("enriquecimiento vacío".to_string()))
    }

    /// Gastos que cumplen el filtro, enriquecidos. A un actor cuyo único rol
    /// es `solicitante` se le fuerza el filtro a sus propios gastos.
    pub fn list_expenses(&self, actor: Uuid, filter: &ExpenseFilter) -> Result<Vec<ExpenseView>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "listar gastos")?;
        let mut filter = filter.clone();
        if self.solicitante_only(&roles) {
            filter.requested_by = Some(actor);
        }
        let expenses = self.store.find(&filter)?;
        self.enrich(expenses)
    }

    /// Categorías distintas presentes en los gastos, ordenadas.
    pub fn list_categories(&self, actor: Uuid) -> Result<Vec<String>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "listar categorías")?;
        self.store.list_categories()
    }

    /// URL firmada de lectura para un documento, con la vigencia
    /// configurada.
    pub fn document_url(&self, actor: Uuid, key: &str) -> Result<Option<String>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "ver documento")?;
        self.documents.signed_url(key, self.config.signed_url_ttl_secs)
    }

    // ----- administración de usuarios y roles -----

    /// Registra (o devuelve, si ya existe) una cuenta por correo. Sólo
    /// `administrador`.
    pub fn register_user(&self, actor: Uuid, email: &str) -> Result<UserAccount> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Administrador], "registrar usuario")?;
        let account = UserAccount::new(email)?;
        if let Some(existing) = self.store.lookup_by_email(account.email())? {
            return Ok(existing);
        }
        self.store.register_user(&account)?;
        Ok(account)
    }

    /// Asigna un rol a un usuario. Idempotente. Sólo `administrador`.
    pub fn assign_role(&self, actor: Uuid, target: Uuid, role: Role) -> Result<()> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Administrador], "asignar rol")?;
        self.require_known_user(&target)?;
        self.store.assign_role(&target, role)?;
        self.cache.invalidate(&roles_signature(target))?;
        Ok(())
    }

    /// Quita un rol a un usuario. Idempotente. Sólo `administrador`.
    ///
    /// Quitarse el propio rol `administrador` se ignora con advertencia
    /// (`RoleRemoval::SelfAdminIgnored`): nunca es error, nunca escribe.
    pub fn remove_role(&self, actor: Uuid, target: Uuid, role: Role) -> Result<RoleRemoval> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Administrador], "quitar rol")?;
        if role == Role::Administrador && target == actor {
            log::warn!("No puedes quitarte el rol 'administrador' a ti mismo.");
            return Ok(RoleRemoval::SelfAdminIgnored);
        }
        self.require_known_user(&target)?;
        self.store.remove_role(&target, role)?;
        self.cache.invalidate(&roles_signature(target))?;
        Ok(RoleRemoval::Removed)
    }

    /// Cuentas conocidas con sus roles, resueltos con una sola consulta de
    /// roles. Sólo `administrador`.
    pub fn users_with_roles(&self, actor: Uuid) -> Result<Vec<(UserAccount, RoleSet)>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Administrador], "listar usuarios")?;
        let users = self.store.list_users()?;
        let mut roles_map = self.store.roles_map()?;
        Ok(users.into_iter()
                .map(|u| {
                    let user_roles = roles_map.remove(&u.id()).unwrap_or_default();
                    (u, user_roles)
                })
                .collect())
    }

    /// Roles del propio actor (para menús y demos).
    pub fn my_roles(&self, actor: Uuid) -> Result<RoleSet> {
        self.roles_of(actor)
    }

    // ----- catálogo -----

    /// Alta de proveedor. Unicidad por nombre. Sólo `administrador`.
    pub fn create_supplier(&self, actor: Uuid, name: &str) -> Result<Supplier> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Administrador], "crear proveedor")?;
        let supplier = Supplier::new(name)?;
        self.store.save_supplier(supplier.clone())?;
        self.cache.invalidate(SIG_SUPPLIERS)?;
        Ok(supplier)
    }

    /// Alta de persona de reembolso. Unicidad por nombre. Sólo
    /// `administrador`.
    pub fn create_person(&self, actor: Uuid, name: &str) -> Result<Person> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &[Role::Administrador], "crear persona")?;
        let person = Person::new(name)?;
        self.store.save_person(person.clone())?;
        self.cache.invalidate(SIG_PEOPLE)?;
        Ok(person)
    }

    /// Proveedores ordenados por nombre (cacheados por firma).
    pub fn list_suppliers(&self, actor: Uuid) -> Result<Vec<Supplier>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "listar proveedores")?;
        self.suppliers_cached()
    }

    /// Personas ordenadas por nombre (cacheadas por firma).
    pub fn list_people(&self, actor: Uuid) -> Result<Vec<Person>> {
        let roles = self.roles_of(actor)?;
        guard::require_role(actor, &roles, &Role::ALL, "listar personas")?;
        self.people_cached()
    }

    // ----- helpers internos -----

    fn load_expense(&self, expense_id: &Uuid) -> Result<Expense> {
        self.store
            .get(expense_id)?
            .ok_or(TramiteError::ExpenseNotFound(*expense_id))
    }

    fn roles_of(&self, user: Uuid) -> Result<RoleSet> {
        let signature = roles_signature(user);
        if let Some(value) = self.cache.get(&signature)? {
            if let Ok(roles) = serde_json::from_value::<RoleSet>(value) {
                return Ok(roles);
            }
        }
        let roles = self.store.get_roles(&user)?;
        self.cache.put(&signature, serde_json::to_value(&roles)?)?;
        Ok(roles)
    }

    /// Único rol efectivo `solicitante`: sin aprobador, pagador, lector ni
    /// administrador.
    fn solicitante_only(&self, roles: &RoleSet) -> bool {
        roles.contains(&Role::Solicitante)
            && !roles.contains(&Role::Aprobador)
            && !roles.contains(&Role::Pagador)
            && !roles.contains(&Role::Lector)
            && !roles.contains(&Role::Administrador)
    }

    /// Una sola consulta de correos por listado, nunca una por fila.
    fn emails_for<I>(&self, ids: I) -> Result<HashMap<Uuid, String>>
        where I: IntoIterator<Item = Uuid>
    {
        let mut unique: Vec<Uuid> = ids.into_iter().collect();
        unique.sort();
        unique.dedup();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.emails_by_ids(&unique)
    }

    fn require_known_user(&self, user_id: &Uuid) -> Result<()> {
        let known = self.store.emails_by_ids(std::slice::from_ref(user_id))?;
        if known.contains_key(user_id) {
            Ok(())
        } else {
            Err(TramiteError::Validation(format!("Usuario no encontrado: {}", user_id)))
        }
    }

    fn suppliers_cached(&self) -> Result<Vec<Supplier>> {
        if let Some(value) = self.cache.get(SIG_SUPPLIERS)? {
            if let Ok(list) = serde_json::from_value::<Vec<Supplier>>(value) {
                return Ok(list);
            }
        }
        let list = self.store.list_suppliers()?;
        self.cache.put(SIG_SUPPLIERS, serde_json::to_value(&list)?)?;
        Ok(list)
    }

    fn people_cached(&self) -> Result<Vec<Person>> {
        if let Some(value) = self.cache.get(SIG_PEOPLE)? {
            if let Ok(list) = serde_json::from_value::<Vec<Person>>(value) {
                return Ok(list);
            }
        }
        let list = self.store.list_people()?;
        self.cache.put(SIG_PEOPLE, serde_json::to_value(&list)?)?;
        Ok(list)
    }

    fn enrich(&self, expenses: Vec<Expense>) -> Result<Vec<ExpenseView>> {
        let suppliers: HashMap<Uuid, String> = self.suppliers_cached()?
                                                   .into_iter()
                                                   .map(|s| (s.id(), s.name().to_string()))
                                                   .collect();
        let emails = self.emails_for(expenses.iter().map(|e| e.requested_by()))?;
        Ok(expenses.into_iter()
                   .map(|expense| {
                       let supplier_name = suppliers.get(&expense.supplier_id())
                                                    .cloned()
                                                    .unwrap_or_else(|| UNKNOWN_ACTOR.to_string());
                       let requester_email = emails.get(&expense.requested_by())
                                                   .cloned()
                                                   .unwrap_or_else(|| UNKNOWN_ACTOR.to_string());
                       ExpenseView { expense, supplier_name, requester_email }
                   })
                   .collect())
    }
}
