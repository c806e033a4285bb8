use crate::schema;
use crate::schema::expense_comments::dsl as comments_dsl;
use crate::schema::expense_logs::dsl as logs_dsl;
use crate::schema::expenses::dsl as expenses_dsl;
use crate::schema::people::dsl as people_dsl;
use crate::schema::suppliers::dsl as suppliers_dsl;
use crate::schema::user_roles::dsl as user_roles_dsl;
use crate::schema::users::dsl as users_dsl;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use gastos_domain::{Amount, CatalogRepository, DomainError, Expense, ExpenseParts, ExpenseStatus, Person, Role,
                    RoleSet, Supplier, UserAccount};
use std::collections::HashMap;
use std::sync::Arc;
use tramite::{AuditRepository, CasResult, Comment, ExpenseFilter, ExpenseRepository, IdentityRepository, LogAction,
              LogEntry, StatusUpdate, TramiteError};
use uuid::Uuid;
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
#[cfg(all(feature = "pg", not(test)))]
type DbPool = Pool<ConnectionManager<PgConnection>>;
#[cfg(any(test, not(feature = "pg")))]
type DbPool = Pool<ConnectionManager<SqliteConnection>>;
#[cfg(all(feature = "pg", not(test)))]
type DbConn = PgConnection;
#[cfg(any(test, not(feature = "pg")))]
type DbConn = SqliteConnection;
/// Store Diesel que implementa los cuatro contratos de persistencia del
/// trámite (`ExpenseRepository`, `AuditRepository`, `IdentityRepository` y
/// `CatalogRepository`) sobre un solo pool de conexiones.
pub struct DieselGastosStore {
  pool: Arc<DbPool>,
}
impl DieselGastosStore {
  pub fn new(database_url: &str) -> Self {
    #[cfg(any(test, not(feature = "pg")))]
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    #[cfg(all(feature = "pg", not(test)))]
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().max_size(4).build(manager).expect("no se pudo crear el pool de conexiones");
    let store = DieselGastosStore { pool: Arc::new(pool) };
    if let Ok(mut c) = store.conn_raw() {
      // Los PRAGMA sólo existen en SQLite; en Postgres fallan y se ignoran.
      let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
      let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
      if let Err(e) = c.run_pending_migrations(MIGRATIONS) {
        log::warn!("migraciones pendientes sin aplicar: {}", e);
      }
    }
    store
  }
  fn conn_raw(&self) -> std::result::Result<PooledConnection<ConnectionManager<DbConn>>, r2d2::Error> {
    self.pool.get()
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, TramiteError> {
    self.conn_raw().map_err(|e| TramiteError::Storage(format!("pool: {}", e)))
  }
  // El catálogo habla `DomainError`, el resto `TramiteError`.
  fn conn_catalog(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>, DomainError> {
    self.conn_raw().map_err(|e| DomainError::ExternalError(format!("pool: {}", e)))
  }
}
// Filas Diesel de las tablas del trámite
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::expenses)]
struct ExpenseRow {
  pub id: String,
  pub requested_by: String,
  pub supplier_id: String,
  pub amount_cents: i64,
  pub category: String,
  pub description: Option<String>,
  pub status: String,
  pub supporting_doc_key: String,
  pub payment_doc_key: Option<String>,
  pub payment_date: Option<String>,
  pub paid_by: Option<String>,
  pub approved_by: Option<String>,
  pub reimbursement: bool,
  pub reimbursement_person: Option<String>,
  pub created_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::expense_logs)]
struct LogRow {
  pub id: String,
  pub expense_id: String,
  pub actor: String,
  pub action: String,
  pub message: String,
  pub old_status: Option<String>,
  pub new_status: Option<String>,
  pub created_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::expense_comments)]
struct CommentRow {
  pub id: String,
  pub expense_id: String,
  pub author: String,
  pub body: String,
  pub created_at_ts: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::users)]
struct UserRow {
  pub id: String,
  pub email: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::user_roles)]
struct UserRoleRow {
  pub id: String,
  pub user_id: String,
  pub role: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::suppliers)]
struct SupplierRow {
  pub id: String,
  pub name: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::people)]
struct PersonRow {
  pub id: String,
  pub name: String,
}
fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, TramiteError> {
  res.map_err(|e| TramiteError::Storage(format!("db: {}", e)))
}
fn map_catalog_err<T>(res: std::result::Result<T, DieselError>) -> Result<T, DomainError> {
  res.map_err(|e| DomainError::ExternalError(format!("db: {}", e)))
}
fn parse_uuid(value: &str) -> Result<Uuid, TramiteError> {
  Uuid::parse_str(value).map_err(|e| TramiteError::Storage(format!("uuid inválido: {}", e)))
}
fn parse_date(value: &str) -> Result<NaiveDate, TramiteError> {
  NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| TramiteError::Storage(format!("fecha inválida: {}", e)))
}
fn ts_to_datetime(ts: i64) -> Result<DateTime<Utc>, TramiteError> {
  Utc.timestamp_opt(ts, 0).single().ok_or_else(|| TramiteError::Storage(format!("timestamp inválido: {}", ts)))
}
fn expense_to_row(expense: &Expense) -> ExpenseRow {
  ExpenseRow { id: expense.id().to_string(),
               requested_by: expense.requested_by().to_string(),
               supplier_id: expense.supplier_id().to_string(),
               amount_cents: expense.amount().cents(),
               category: expense.category().to_string(),
               description: expense.description().map(|s| s.to_string()),
               status: expense.status().as_str().to_string(),
               supporting_doc_key: expense.supporting_doc_key().to_string(),
               payment_doc_key: expense.payment_doc_key().map(|s| s.to_string()),
               payment_date: expense.payment_date().map(|d| d.to_string()),
               paid_by: expense.paid_by().map(|u| u.to_string()),
               approved_by: expense.approved_by().map(|u| u.to_string()),
               reimbursement: expense.reimbursement(),
               reimbursement_person: expense.reimbursement_person().map(|s| s.to_string()),
               created_at_ts: expense.created_at().timestamp() }
}
fn expense_from_row(row: ExpenseRow) -> Result<Expense, TramiteError> {
  let payment_date = match row.payment_date {
    Some(d) => Some(parse_date(&d)?),
    None => None,
  };
  let paid_by = match row.paid_by {
    Some(u) => Some(parse_uuid(&u)?),
    None => None,
  };
  let approved_by = match row.approved_by {
    Some(u) => Some(parse_uuid(&u)?),
    None => None,
  };
  let parts = ExpenseParts { id: parse_uuid(&row.id)?,
                             requested_by: parse_uuid(&row.requested_by)?,
                             supplier_id: parse_uuid(&row.supplier_id)?,
                             amount: Amount::from_cents(row.amount_cents)?,
                             category: row.category,
                             description: row.description,
                             status: ExpenseStatus::parse(&row.status)?,
                             supporting_doc_key: row.supporting_doc_key,
                             payment_doc_key: row.payment_doc_key,
                             payment_date,
                             paid_by,
                             approved_by,
                             reimbursement: row.reimbursement,
                             reimbursement_person: row.reimbursement_person,
                             created_at: ts_to_datetime(row.created_at_ts)? };
  // `from_parts` valida la coherencia pago ⟺ estado; una fila corrupta
  // falla aquí en lugar de circular por el trámite.
  Ok(Expense::from_parts(parts)?)
}
fn log_from_row(row: LogRow) -> Result<LogEntry, TramiteError> {
  let action = LogAction::parse(&row.action)
    .ok_or_else(|| TramiteError::Storage(format!("acción de bitácora desconocida: '{}'", row.action)))?;
  let old_status = match row.old_status {
    Some(s) => Some(ExpenseStatus::parse(&s)?),
    None => None,
  };
  let new_status = match row.new_status {
    Some(s) => Some(ExpenseStatus::parse(&s)?),
    None => None,
  };
  Ok(LogEntry { id: parse_uuid(&row.id)?,
                expense_id: parse_uuid(&row.expense_id)?,
                actor: parse_uuid(&row.actor)?,
                action,
                message: row.message,
                old_status,
                new_status,
                created_at: ts_to_datetime(row.created_at_ts)? })
}
fn comment_from_row(row: CommentRow) -> Result<Comment, TramiteError> {
  Ok(Comment { id: parse_uuid(&row.id)?,
               expense_id: parse_uuid(&row.expense_id)?,
               author: parse_uuid(&row.author)?,
               text: row.body,
               created_at: ts_to_datetime(row.created_at_ts)? })
}
fn user_from_row(row: UserRow) -> Result<UserAccount, TramiteError> {
  let id = parse_uuid(&row.id)?;
  Ok(UserAccount::from_parts(id, &row.email)?)
}
impl ExpenseRepository for DieselGastosStore {
  fn get(&self, id: &Uuid) -> Result<Option<Expense>, TramiteError> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let opt = expenses_dsl::expenses.filter(expenses_dsl::id.eq(&id_s))
                                    .first::<ExpenseRow>(&mut conn)
                                    .optional()
                                    .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    match opt {
      Some(row) => Ok(Some(expense_from_row(row)?)),
      None => Ok(None),
    }
  }
  fn insert(&self, expense: &Expense) -> Result<(), TramiteError> {
    let mut conn = self.conn()?;
    let row = expense_to_row(expense);
    map_db_err(diesel::insert_into(schema::expenses::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  fn update_status(&self, id: &Uuid, expected_current: ExpenseStatus, update: &StatusUpdate)
                   -> Result<CasResult, TramiteError> {
    let mut conn = self.conn()?;
    let id_s = id.to_string();
    let opt = expenses_dsl::expenses.filter(expenses_dsl::id.eq(&id_s))
                                    .first::<ExpenseRow>(&mut conn)
                                    .optional()
                                    .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let row = opt.ok_or(TramiteError::ExpenseNotFound(*id))?;
    let current = expense_from_row(row)?;
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
    // El compare-and-set real es la condición de estado en el UPDATE; la
    // lectura previa sólo reconstruye la entidad. Si otro escritor ganó
    // entre lectura y escritura, el UPDATE no toca ninguna fila.
    let written =
      diesel::update(expenses_dsl::expenses.filter(expenses_dsl::id.eq(&id_s))
                                           .filter(expenses_dsl::status.eq(expected_current.as_str())))
        .set((expenses_dsl::status.eq(updated.status().as_str()),
              expenses_dsl::approved_by.eq(updated.approved_by().map(|u| u.to_string())),
              expenses_dsl::payment_doc_key.eq(updated.payment_doc_key().map(|s| s.to_string())),
              expenses_dsl::payment_date.eq(updated.payment_date().map(|d| d.to_string())),
              expenses_dsl::paid_by.eq(updated.paid_by().map(|u| u.to_string()))))
        .execute(&mut conn)
        .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    if written == 0 {
      return Ok(CasResult::Conflict);
    }
    Ok(CasResult::Applied(updated))
  }
  fn find(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, TramiteError> {
    let mut conn = self.conn()?;
    let mut query = expenses_dsl::expenses.into_boxed();
    if let Some(status) = filter.status {
      query = query.filter(expenses_dsl::status.eq(status.as_str()));
    }
    if let Some(requested_by) = filter.requested_by {
      query = query.filter(expenses_dsl::requested_by.eq(requested_by.to_string()));
    }
    if let Some(supplier_id) = filter.supplier_id {
      query = query.filter(expenses_dsl::supplier_id.eq(supplier_id.to_string()));
    }
    if let Some(category) = &filter.category {
      query = query.filter(expenses_dsl::category.eq(category.clone()));
    }
    let rows = query.order(expenses_dsl::created_at_ts.desc())
                    .load::<ExpenseRow>(&mut conn)
                    .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      out.push(expense_from_row(row)?);
    }
    Ok(out)
  }
  fn list_categories(&self) -> Result<Vec<String>, TramiteError> {
    let mut conn = self.conn()?;
    let cats = expenses_dsl::expenses.select(expenses_dsl::category)
                                     .distinct()
                                     .order(expenses_dsl::category.asc())
                                     .load::<String>(&mut conn)
                                     .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    Ok(cats)
  }
}
impl AuditRepository for DieselGastosStore {
  fn append_log(&self, entry: &LogEntry) -> Result<(), TramiteError> {
    let mut conn = self.conn()?;
    let row = LogRow { id: entry.id.to_string(),
                       expense_id: entry.expense_id.to_string(),
                       actor: entry.actor.to_string(),
                       action: entry.action.as_str().to_string(),
                       message: entry.message.clone(),
                       old_status: entry.old_status.map(|s| s.as_str().to_string()),
                       new_status: entry.new_status.map(|s| s.as_str().to_string()),
                       created_at_ts: entry.created_at.timestamp() };
    map_db_err(diesel::insert_into(schema::expense_logs::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  fn append_comment(&self, comment: &Comment) -> Result<(), TramiteError> {
    let mut conn = self.conn()?;
    let row = CommentRow { id: comment.id.to_string(),
                           expense_id: comment.expense_id.to_string(),
                           author: comment.author.to_string(),
                           body: comment.text.clone(),
                           created_at_ts: comment.created_at.timestamp() };
    map_db_err(diesel::insert_into(schema::expense_comments::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  fn list_log(&self, expense_id: &Uuid) -> Result<Vec<LogEntry>, TramiteError> {
    let mut conn = self.conn()?;
    let id_s = expense_id.to_string();
    let rows = logs_dsl::expense_logs.filter(logs_dsl::expense_id.eq(&id_s))
                                     .order(logs_dsl::created_at_ts.desc())
                                     .load::<LogRow>(&mut conn)
                                     .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      out.push(log_from_row(row)?);
    }
    Ok(out)
  }
  fn list_comments(&self, expense_id: &Uuid) -> Result<Vec<Comment>, TramiteError> {
    let mut conn = self.conn()?;
    let id_s = expense_id.to_string();
    let rows = comments_dsl::expense_comments.filter(comments_dsl::expense_id.eq(&id_s))
                                             .order(comments_dsl::created_at_ts.desc())
                                             .load::<CommentRow>(&mut conn)
                                             .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      out.push(comment_from_row(row)?);
    }
    Ok(out)
  }
}
impl IdentityRepository for DieselGastosStore {
  fn get_roles(&self, user_id: &Uuid) -> Result<RoleSet, TramiteError> {
    let mut conn = self.conn()?;
    let id_s = user_id.to_string();
    let labels = user_roles_dsl::user_roles.filter(user_roles_dsl::user_id.eq(&id_s))
                                           .select(user_roles_dsl::role)
                                           .load::<String>(&mut conn)
                                           .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let mut roles = RoleSet::new();
    for label in labels {
      roles.insert(Role::parse(&label)?);
    }
    Ok(roles)
  }
  fn assign_role(&self, user_id: &Uuid, role: Role) -> Result<(), TramiteError> {
    let mut conn = self.conn()?;
    let id_s = user_id.to_string();
    // Idempotente: si el rol ya está asignado no se inserta de nuevo.
    let existing = user_roles_dsl::user_roles.filter(user_roles_dsl::user_id.eq(&id_s))
                                             .filter(user_roles_dsl::role.eq(role.as_str()))
                                             .select(user_roles_dsl::id)
                                             .first::<String>(&mut conn)
                                             .optional()
                                             .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    if existing.is_some() {
      return Ok(());
    }
    let row = UserRoleRow { id: Uuid::new_v4().to_string(), user_id: id_s, role: role.as_str().to_string() };
    map_db_err(diesel::insert_into(schema::user_roles::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  fn remove_role(&self, user_id: &Uuid, role: Role) -> Result<(), TramiteError> {
    let mut conn = self.conn()?;
    let id_s = user_id.to_string();
    map_db_err(diesel::delete(user_roles_dsl::user_roles.filter(user_roles_dsl::user_id.eq(&id_s))
                                                        .filter(user_roles_dsl::role.eq(role.as_str())))
                 .execute(&mut conn))?;
    Ok(())
  }
  fn emails_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>, TramiteError> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let mut conn = self.conn()?;
    let id_strings: Vec<String> = ids.iter().map(|u| u.to_string()).collect();
    let rows = users_dsl::users.filter(users_dsl::id.eq_any(&id_strings))
                               .load::<UserRow>(&mut conn)
                               .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let mut map = HashMap::with_capacity(rows.len());
    for row in rows {
      map.insert(parse_uuid(&row.id)?, row.email);
    }
    Ok(map)
  }
  fn lookup_by_email(&self, email: &str) -> Result<Option<UserAccount>, TramiteError> {
    let mut conn = self.conn()?;
    let normalized = email.trim().to_lowercase();
    let opt = users_dsl::users.filter(users_dsl::email.eq(&normalized))
                              .first::<UserRow>(&mut conn)
                              .optional()
                              .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    match opt {
      Some(row) => Ok(Some(user_from_row(row)?)),
      None => Ok(None),
    }
  }
  fn register_user(&self, account: &UserAccount) -> Result<(), TramiteError> {
    let mut conn = self.conn()?;
    let existing = users_dsl::users.filter(users_dsl::email.eq(account.email()))
                                   .first::<UserRow>(&mut conn)
                                   .optional()
                                   .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    if let Some(row) = existing {
      if row.id == account.id().to_string() {
        return Ok(());
      }
      return Err(TramiteError::Validation(format!("Ya existe un usuario con el correo '{}'", account.email())));
    }
    let row = UserRow { id: account.id().to_string(), email: account.email().to_string() };
    map_db_err(diesel::insert_into(schema::users::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  fn list_users(&self) -> Result<Vec<UserAccount>, TramiteError> {
    let mut conn = self.conn()?;
    let rows = users_dsl::users.order(users_dsl::email.asc())
                               .load::<UserRow>(&mut conn)
                               .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      out.push(user_from_row(row)?);
    }
    Ok(out)
  }
  fn roles_map(&self) -> Result<HashMap<Uuid, RoleSet>, TramiteError> {
    let mut conn = self.conn()?;
    let rows = user_roles_dsl::user_roles.load::<UserRoleRow>(&mut conn)
                                         .map_err(|e| TramiteError::Storage(format!("db: {}", e)))?;
    let mut map: HashMap<Uuid, RoleSet> = HashMap::new();
    for row in rows {
      let user = parse_uuid(&row.user_id)?;
      map.entry(user).or_default().insert(Role::parse(&row.role)?);
    }
    Ok(map)
  }
}
impl CatalogRepository for DieselGastosStore {
  fn save_supplier(&self, supplier: Supplier) -> Result<Uuid, DomainError> {
    let mut conn = self.conn_catalog()?;
    // La unicidad por nombre (sin distinguir mayúsculas) se verifica en
    // Rust sobre el catálogo completo, que es pequeño.
    let rows = suppliers_dsl::suppliers.load::<SupplierRow>(&mut conn)
                                       .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let id_s = supplier.id().to_string();
    if rows.iter().any(|r| r.id != id_s && r.name.eq_ignore_ascii_case(supplier.name())) {
      return Err(DomainError::ValidationError(format!("Ya existe un proveedor con el nombre '{}'", supplier.name())));
    }
    let row = SupplierRow { id: id_s.clone(), name: supplier.name().to_string() };
    if diesel::insert_into(suppliers_dsl::suppliers).values(&row).execute(&mut conn).is_err() {
      // Reemplazo: borrar la fila existente e insertar de nuevo
      let _ = diesel::delete(suppliers_dsl::suppliers.filter(suppliers_dsl::id.eq(&id_s))).execute(&mut conn);
      map_catalog_err(diesel::insert_into(suppliers_dsl::suppliers).values(&row).execute(&mut conn))?;
    }
    Ok(supplier.id())
  }
  fn get_supplier(&self, id: &Uuid) -> Result<Option<Supplier>, DomainError> {
    let mut conn = self.conn_catalog()?;
    let id_s = id.to_string();
    let opt = suppliers_dsl::suppliers.filter(suppliers_dsl::id.eq(&id_s))
                                      .first::<SupplierRow>(&mut conn)
                                      .optional()
                                      .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    match opt {
      Some(row) => {
        let db_id = Uuid::parse_str(&row.id).map_err(|e| DomainError::ExternalError(format!("uuid inválido: {}", e)))?;
        Ok(Some(Supplier::from_parts(db_id, &row.name)?))
      }
      None => Ok(None),
    }
  }
  fn list_suppliers(&self) -> Result<Vec<Supplier>, DomainError> {
    let mut conn = self.conn_catalog()?;
    let rows = suppliers_dsl::suppliers.order(suppliers_dsl::name.asc())
                                       .load::<SupplierRow>(&mut conn)
                                       .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      let db_id = Uuid::parse_str(&row.id).map_err(|e| DomainError::ExternalError(format!("uuid inválido: {}", e)))?;
      out.push(Supplier::from_parts(db_id, &row.name)?);
    }
    Ok(out)
  }
  fn save_person(&self, person: Person) -> Result<Uuid, DomainError> {
    let mut conn = self.conn_catalog()?;
    let rows = people_dsl::people.load::<PersonRow>(&mut conn)
                                 .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let id_s = person.id().to_string();
    if rows.iter().any(|r| r.id != id_s && r.name.eq_ignore_ascii_case(person.name())) {
      return Err(DomainError::ValidationError(format!("Ya existe una persona con el nombre '{}'", person.name())));
    }
    let row = PersonRow { id: id_s.clone(), name: person.name().to_string() };
    if diesel::insert_into(people_dsl::people).values(&row).execute(&mut conn).is_err() {
      let _ = diesel::delete(people_dsl::people.filter(people_dsl::id.eq(&id_s))).execute(&mut conn);
      map_catalog_err(diesel::insert_into(people_dsl::people).values(&row).execute(&mut conn))?;
    }
    Ok(person.id())
  }
  fn list_people(&self) -> Result<Vec<Person>, DomainError> {
    let mut conn = self.conn_catalog()?;
    let rows = people_dsl::people.order(people_dsl::name.asc())
                                 .load::<PersonRow>(&mut conn)
                                 .map_err(|e| DomainError::ExternalError(format!("db: {}", e)))?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
      let db_id = Uuid::parse_str(&row.id).map_err(|e| DomainError::ExternalError(format!("uuid inválido: {}", e)))?;
      out.push(Person::from_parts(db_id, &row.name)?);
    }
    Ok(out)
  }
}
/// Crear el store desde las variables de entorno, con default SQLite en
/// memoria cuando no hay nada configurado.
pub fn new_store_from_env() -> Result<DieselGastosStore, TramiteError> {
  dotenvy::dotenv().ok();
  // Con soporte Postgres compilado se prefiere GASTOS_DB_URL, con
  // DATABASE_URL como respaldo.
  if cfg!(all(feature = "pg", not(test))) {
    let url = std::env::var("GASTOS_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                            .map_err(|_| {
                                              TramiteError::Storage("GASTOS_DB_URL / DATABASE_URL no configurada".into())
                                            })?;
    let l = url.to_lowercase();
    if !(l.starts_with("postgres") || l.starts_with("postgresql://") || url.contains('@')) {
      return Err(TramiteError::Storage("GASTOS_DB_URL / DATABASE_URL no parece una URL de Postgres".into()));
    }
    Ok(DieselGastosStore::new(&url))
  } else {
    let url = std::env::var("GASTOS_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                            .unwrap_or_else(|_| "file:gastosdb?mode=memory&cache=shared".into());
    Ok(DieselGastosStore::new(&url))
  }
}
// Variante estricta de `new_from_env`: falla en lugar de caer a un default
// cuando la URL configurada no corresponde al backend compilado.
#[cfg(all(feature = "pg", not(test)))]
pub fn new_from_env() -> Result<DieselGastosStore, TramiteError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("GASTOS_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| {
                                            TramiteError::Storage("GASTOS_DB_URL / DATABASE_URL no configurada".into())
                                          })?;
  if !(url.starts_with("postgres") || url.starts_with("postgresql://") || url.contains('@')) {
    return Err(TramiteError::Storage("GASTOS_DB_URL no parece una URL de Postgres".into()));
  }
  Ok(DieselGastosStore::new(&url))
}
#[cfg(test)]
pub fn new_from_env() -> Result<DieselGastosStore, TramiteError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("GASTOS_DB_URL").unwrap_or_else(|_| "file:gastosdb?mode=memory&cache=shared".into());
  Ok(DieselGastosStore::new(&url))
}
#[cfg(all(not(feature = "pg"), not(test)))]
pub fn new_from_env() -> Result<DieselGastosStore, TramiteError> {
  dotenvy::dotenv().ok();
  let url = std::env::var("GASTOS_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| {
                                            TramiteError::Storage("GASTOS_DB_URL / DATABASE_URL no configurada".into())
                                          })?;
  let url_l = url.to_lowercase();
  if url_l.starts_with("file:") || url_l.contains("mode=memory") || url_l.contains("sqlite") {
    return Ok(DieselGastosStore::new(&url));
  }
  Err(TramiteError::Storage("gastos-persistence se compiló sin la feature 'pg'; habilítala para usar Postgres en \
                             producción"
                                        .into()))
}
// Helper de tests: construye el store sobre SQLite con la URL dada, sin
// pasar por la detección de entorno.
#[cfg(not(feature = "pg"))]
pub fn new_sqlite_for_test(database_url: &str) -> DieselGastosStore {
  use diesel::r2d2::ConnectionManager;
  use diesel::sqlite::SqliteConnection;
  let manager = ConnectionManager::<SqliteConnection>::new(database_url);
  let pool = Pool::builder().max_size(4).build(manager).expect("no se pudo crear el pool de conexiones");
  let store = DieselGastosStore { pool: Arc::new(pool) };
  if let Ok(mut c) = store.conn_raw() {
    let _ = diesel::sql_query("PRAGMA journal_mode = WAL;").execute(&mut c);
    let _ = diesel::sql_query("PRAGMA busy_timeout = 5000;").execute(&mut c);
    let _ = c.run_pending_migrations(MIGRATIONS);
  }
  store
}
