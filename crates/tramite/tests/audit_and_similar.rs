use chrono::{Duration, Utc};
use gastos_domain::{Amount, CatalogRepository, Expense, ExpenseParts, ExpenseStatus, NewExpense, Role, Supplier,
                    UserAccount};
use std::sync::Arc;
use tramite::domain::{LogAction, LogEntry, PaymentDoc, PaymentProof, TransitionOutcome, TransitionRequest,
                      UNKNOWN_ACTOR};
use tramite::engine::{EngineConfig, LifecycleEngine};
use tramite::errors::TramiteError;
use tramite::repository::{AuditRepository, ExpenseRepository, IdentityRepository};
use tramite::stubs::{InMemoryDocumentStore, InMemoryStore};
use uuid::Uuid;

fn seed_user(store: &InMemoryStore, email: &str, roles: &[Role]) -> Uuid {
  let account = UserAccount::new(email).expect("user");
  store.register_user(&account).expect("register");
  for role in roles {
    store.assign_role(&account.id(), *role).expect("assign role");
  }
  account.id()
}

struct Ctx {
  engine: LifecycleEngine<InMemoryStore, InMemoryDocumentStore>,
  store: Arc<InMemoryStore>,
  solicitante: Uuid,
  aprobador: Uuid,
  pagador: Uuid,
  supplier_id: Uuid,
}

fn setup() -> Ctx {
  let store = Arc::new(InMemoryStore::new());
  let docs = Arc::new(InMemoryDocumentStore::new());
  let solicitante = seed_user(&store, "sol@empresa.mx", &[Role::Solicitante]);
  let aprobador = seed_user(&store, "apro@empresa.mx", &[Role::Aprobador]);
  let pagador = seed_user(&store, "pago@empresa.mx", &[Role::Pagador]);
  let supplier_id = store.save_supplier(Supplier::new("Papelería Central").expect("supplier"))
                         .expect("save supplier");
  let engine = LifecycleEngine::new(store.clone(), docs, EngineConfig::default());
  Ctx { engine, store, solicitante, aprobador, pagador, supplier_id }
}

fn solicitud(supplier_id: Uuid, amount: &str) -> NewExpense {
  NewExpense { supplier_id,
               amount: Amount::parse(amount).expect("amount"),
               category: "viáticos".to_string(),
               description: None,
               supporting_doc_key: "quotes/q-base.pdf".to_string(),
               reimbursement: false,
               reimbursement_person: None }
}

fn backdated(requested_by: Uuid, supplier_id: Uuid, amount: &str, days_ago: i64) -> Expense {
  Expense::from_parts(ExpenseParts { id: Uuid::new_v4(),
                                     requested_by,
                                     supplier_id,
                                     amount: Amount::parse(amount).expect("amount"),
                                     category: "viáticos".to_string(),
                                     description: None,
                                     status: ExpenseStatus::Solicitado,
                                     supporting_doc_key: "quotes/q-old.pdf".to_string(),
                                     payment_doc_key: None,
                                     payment_date: None,
                                     paid_by: None,
                                     approved_by: None,
                                     reimbursement: false,
                                     reimbursement_person: None,
                                     created_at: Utc::now() - Duration::days(days_ago) }).expect("expense")
}

#[test]
fn exactly_one_log_entry_per_applied_transition() {
  let ctx = setup();
  let expense = ctx.engine
                   .create_expense(ctx.solicitante, solicitud(ctx.supplier_id, "700.00"))
                   .expect("create");
  ctx.engine
     .transition(expense.id(), ctx.aprobador, ExpenseStatus::Aprobado, TransitionRequest::default())
     .expect("approve");
  ctx.engine
     .transition(expense.id(), ctx.pagador, ExpenseStatus::Pagado,
                 TransitionRequest::paying(PaymentDoc::ReuseSupporting, None))
     .expect("pay");
  // corrección de fecha sobre un gasto ya pagado
  ctx.engine
     .transition(expense.id(), ctx.pagador, ExpenseStatus::Pagado,
                 TransitionRequest { comment: None,
                                     payment: Some(PaymentProof { doc: None,
                                                                  date: Some(Utc::now().date_naive()
                                                                             - Duration::days(1)) }) })
     .expect("fix date");
  ctx.engine
     .transition(expense.id(), ctx.pagador, ExpenseStatus::Aprobado, TransitionRequest::default())
     .expect("revert");

  let log = ctx.store.list_log(&expense.id()).expect("log");
  let created = log.iter().filter(|e| e.action == LogAction::Created).count();
  let changed = log.iter().filter(|e| e.action == LogAction::StatusChanged).count();
  assert_eq!(created, 1);
  assert_eq!(changed, 4);
}

#[test]
fn comment_only_and_nothing_to_save_paths() {
  let ctx = setup();
  let expense = ctx.engine
                   .create_expense(ctx.solicitante, solicitud(ctx.supplier_id, "80.00"))
                   .expect("create");
  ctx.engine
     .transition(expense.id(), ctx.aprobador, ExpenseStatus::Aprobado, TransitionRequest::default())
     .expect("approve");

  // mismo estado con comentario: sólo se guarda el comentario
  let outcome = ctx.engine
                   .transition(expense.id(), ctx.aprobador, ExpenseStatus::Aprobado,
                               TransitionRequest::with_comment("revalidado en comité"))
                   .expect("comment only");
  assert!(matches!(outcome, TransitionOutcome::CommentOnly));
  assert_eq!(ctx.store.list_comments(&expense.id()).expect("comments").len(), 1);
  assert_eq!(ctx.store.list_log(&expense.id()).expect("log").len(), 2);

  // mismo estado sin comentario: no se escribe nada
  let outcome = ctx.engine
                   .transition(expense.id(), ctx.aprobador, ExpenseStatus::Aprobado, TransitionRequest::default())
                   .expect("noop");
  assert!(matches!(outcome, TransitionOutcome::NothingToSave));
  assert_eq!(ctx.store.list_comments(&expense.id()).expect("comments").len(), 1);
  assert_eq!(ctx.store.list_log(&expense.id()).expect("log").len(), 2);

  // un comentario en blanco tampoco cuenta como cambio
  let outcome = ctx.engine
                   .transition(expense.id(), ctx.aprobador, ExpenseStatus::Aprobado,
                               TransitionRequest::with_comment("   "))
                   .expect("blank comment");
  assert!(matches!(outcome, TransitionOutcome::NothingToSave));
}

#[test]
fn comments_never_reach_the_log() {
  let ctx = setup();
  let expense = ctx.engine
                   .create_expense(ctx.solicitante, solicitud(ctx.supplier_id, "45.00"))
                   .expect("create");

  ctx.engine.add_comment(expense.id(), ctx.solicitante, "cotización adjunta").expect("c1");
  ctx.engine.add_comment(expense.id(), ctx.aprobador, "favor de detallar el uso").expect("c2");

  // más reciente primero
  let comments = ctx.engine.list_comments(ctx.aprobador, expense.id()).expect("comments");
  assert_eq!(comments.len(), 2);
  assert_eq!(comments[0].text, "favor de detallar el uso");
  assert_eq!(comments[1].text, "cotización adjunta");

  // la bitácora sólo tiene la entrada de creación
  let log = ctx.store.list_log(&expense.id()).expect("log");
  assert_eq!(log.len(), 1);
  assert_eq!(log[0].action, LogAction::Created);

  // comentario vacío rechazado
  let err = ctx.engine.add_comment(expense.id(), ctx.solicitante, "  ").expect_err("vacío");
  assert!(matches!(err, TramiteError::Validation(_)));
}

#[test]
fn log_views_resolve_actor_emails_in_one_batched_query() {
  let ctx = setup();
  let expense = ctx.engine
                   .create_expense(ctx.solicitante, solicitud(ctx.supplier_id, "60.00"))
                   .expect("create");
  ctx.engine
     .transition(expense.id(), ctx.aprobador, ExpenseStatus::Aprobado, TransitionRequest::default())
     .expect("approve");
  // una entrada con un actor que ya no existe en identidad
  ctx.store
     .append_log(&LogEntry::status_changed(expense.id(), Uuid::new_v4(), ExpenseStatus::Aprobado,
                                           ExpenseStatus::Rechazado))
     .expect("raw log");

  let before = ctx.store.email_query_count();
  let log = ctx.engine.list_log(ctx.aprobador, expense.id()).expect("log views");
  assert_eq!(ctx.store.email_query_count() - before, 1, "una sola consulta de correos por listado");

  assert_eq!(log.len(), 3);
  assert_eq!(log[0].actor_email, UNKNOWN_ACTOR);
  assert_eq!(log[1].actor_email, "apro@empresa.mx");
  assert_eq!(log[2].actor_email, "sol@empresa.mx");
}

#[test]
fn expense_listing_enriches_with_one_email_query() {
  let ctx = setup();
  for amount in ["10.00", "20.00", "30.00"] {
    ctx.engine
       .create_expense(ctx.solicitante, solicitud(ctx.supplier_id, amount))
       .expect("create");
  }

  let before = ctx.store.email_query_count();
  let views = ctx.engine
                 .list_expenses(ctx.aprobador, &tramite::domain::ExpenseFilter::default())
                 .expect("views");
  assert_eq!(ctx.store.email_query_count() - before, 1);
  assert_eq!(views.len(), 3);
  for view in &views {
    assert_eq!(view.supplier_name, "Papelería Central");
    assert_eq!(view.requester_email, "sol@empresa.mx");
  }
}

#[test]
fn find_similar_honors_window_amount_and_supplier() {
  let ctx = setup();
  let otro_proveedor = ctx.store
                          .save_supplier(Supplier::new("Viajes del Norte").expect("supplier"))
                          .expect("save supplier");

  let base = ctx.engine
                .create_expense(ctx.solicitante, solicitud(ctx.supplier_id, "100.00"))
                .expect("create");
  let en_ventana = backdated(ctx.solicitante, ctx.supplier_id, "100.00", 29);
  let fuera_de_ventana = backdated(ctx.solicitante, ctx.supplier_id, "100.00", 31);
  let otros_centavos = backdated(ctx.solicitante, ctx.supplier_id, "100.01", 5);
  let otro_supplier = backdated(ctx.solicitante, otro_proveedor, "100.00", 5);
  for e in [&en_ventana, &fuera_de_ventana, &otros_centavos, &otro_supplier] {
    ctx.store.insert(e).expect("insert");
  }

  let similares = ctx.engine
                     .find_similar(ctx.solicitante, ctx.supplier_id, Amount::parse("100.00").expect("amount"))
                     .expect("similar");
  let ids: Vec<Uuid> = similares.iter().map(|e| e.id()).collect();
  assert_eq!(ids, vec![base.id(), en_ventana.id()], "más reciente primero, ventana de 30 días");

  // el detector es exclusivo del solicitante
  let err = ctx.engine
               .find_similar(ctx.aprobador, ctx.supplier_id, Amount::parse("100.00").expect("amount"))
               .expect_err("sólo solicitante");
  assert!(matches!(err, TramiteError::RoleNotAuthorized { .. }));
}

#[test]
fn find_similar_caps_results_at_twenty() {
  let ctx = setup();
  for days_ago in 1..=25 {
    let e = backdated(ctx.solicitante, ctx.supplier_id, "55.00", days_ago);
    ctx.store.insert(&e).expect("insert");
  }

  let similares = ctx.engine
                     .find_similar(ctx.solicitante, ctx.supplier_id, Amount::parse("55.00").expect("amount"))
                     .expect("similar");
  assert_eq!(similares.len(), 20);
  // y el tope conserva los más recientes
  let newest = similares.first().expect("primero");
  assert!(newest.created_at() > Utc::now() - Duration::days(2));
}

#[test]
fn categories_are_distinct_and_sorted() {
  let ctx = setup();
  for (amount, category) in [("10.00", "viáticos"), ("20.00", "papelería"), ("30.00", "viáticos")] {
    let mut datos = solicitud(ctx.supplier_id, amount);
    datos.category = category.to_string();
    ctx.engine.create_expense(ctx.solicitante, datos).expect("create");
  }

  let categorias = ctx.engine.list_categories(ctx.solicitante).expect("categorias");
  assert_eq!(categorias, vec!["papelería".to_string(), "viáticos".to_string()]);
}
