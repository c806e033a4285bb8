// Tests del backend SQLite sobre archivo temporal. Con la feature `pg` el
// store queda tipado contra Postgres, así que este archivo se omite entero.
#![cfg(not(feature = "pg"))]
use chrono::{Duration, NaiveDate, Utc};
use gastos_domain::{Amount, Expense, ExpenseStatus, NewExpense};
use gastos_persistence::{new_sqlite_for_test, DieselGastosStore};
use std::path::PathBuf;
use tramite::{AuditRepository, CasResult, Comment, ExpenseFilter, ExpenseRepository, LogAction, LogEntry,
              PaymentFields, StatusUpdate, TramiteError};
use uuid::Uuid;

// Archivo temporal por test para poder correr en paralelo sin estado
// compartido.
fn store_for_test() -> (DieselGastosStore, PathBuf) {
  let tmp_path = std::env::temp_dir().join(format!("gastos_test_{}.db", Uuid::new_v4()));
  let db_url = tmp_path.to_str().expect("ruta temporal utf-8").to_string();
  (new_sqlite_for_test(&db_url), tmp_path)
}

fn solicitud(supplier_id: Uuid, requested_by: Uuid, amount: &str, category: &str) -> Expense {
  let datos = NewExpense { supplier_id,
                           amount: Amount::parse(amount).expect("monto válido"),
                           category: category.to_string(),
                           description: None,
                           supporting_doc_key: "quotes/q-100.pdf".to_string(),
                           reimbursement: false,
                           reimbursement_person: None };
  Expense::new(requested_by, datos).expect("gasto válido")
}

#[test]
fn expense_roundtrip_preserves_every_field() {
  let (store, tmp_path) = store_for_test();
  let requester = Uuid::new_v4();
  let supplier = Uuid::new_v4();
  let datos = NewExpense { supplier_id: supplier,
                           amount: Amount::parse("1234.56").expect("monto válido"),
                           category: "viáticos".to_string(),
                           description: Some("hotel en León".to_string()),
                           supporting_doc_key: "quotes/q-100.pdf".to_string(),
                           reimbursement: true,
                           reimbursement_person: Some("Ana López".to_string()) };
  let expense = Expense::new(requester, datos).expect("gasto válido");
  store.insert(&expense).expect("insert");

  let loaded = store.get(&expense.id()).expect("get").expect("el gasto existe");
  assert_eq!(loaded.id(), expense.id());
  assert_eq!(loaded.requested_by(), requester);
  assert_eq!(loaded.supplier_id(), supplier);
  assert_eq!(loaded.amount().cents(), 123_456);
  assert_eq!(loaded.category(), "viáticos");
  assert_eq!(loaded.description(), Some("hotel en León"));
  assert_eq!(loaded.status(), ExpenseStatus::Solicitado);
  assert_eq!(loaded.supporting_doc_key(), "quotes/q-100.pdf");
  assert!(loaded.reimbursement());
  assert_eq!(loaded.reimbursement_person(), Some("Ana López"));
  assert!(loaded.payment_doc_key().is_none());
  assert!(loaded.approved_by().is_none());
  assert!(loaded.payment_is_consistent());

  assert!(store.get(&Uuid::new_v4()).expect("get").is_none());
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn cas_applies_once_and_rejects_stale_writers() {
  let (store, tmp_path) = store_for_test();
  let aprobador = Uuid::new_v4();
  let expense = solicitud(Uuid::new_v4(), Uuid::new_v4(), "300.00", "papelería");
  store.insert(&expense).expect("insert");

  let approve = StatusUpdate { new_status: ExpenseStatus::Aprobado, approved_by: Some(aprobador), payment: None };
  match store.update_status(&expense.id(), ExpenseStatus::Solicitado, &approve).expect("cas") {
    CasResult::Applied(updated) => {
      assert_eq!(updated.status(), ExpenseStatus::Aprobado);
      assert_eq!(updated.approved_by(), Some(aprobador));
    }
    CasResult::Conflict => panic!("la primera escritura no debía chocar"),
  }

  // Reintento con el estado esperado ya viejo: choca y no escribe nada.
  let reject = StatusUpdate { new_status: ExpenseStatus::Rechazado, approved_by: Some(aprobador), payment: None };
  match store.update_status(&expense.id(), ExpenseStatus::Solicitado, &reject).expect("cas") {
    CasResult::Conflict => {}
    CasResult::Applied(_) => panic!("una escritura con estado viejo debía chocar"),
  }
  let current = store.get(&expense.id()).expect("get").expect("el gasto existe");
  assert_eq!(current.status(), ExpenseStatus::Aprobado);
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn cas_on_missing_expense_reports_not_found() {
  let (store, tmp_path) = store_for_test();
  let approve = StatusUpdate { new_status: ExpenseStatus::Aprobado, approved_by: Some(Uuid::new_v4()), payment: None };
  match store.update_status(&Uuid::new_v4(), ExpenseStatus::Solicitado, &approve) {
    Err(TramiteError::ExpenseNotFound(_)) => {}
    other => panic!("esperaba ExpenseNotFound, llegó: {:?}", other),
  }
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn payment_fields_persist_and_clear_on_revert() {
  let (store, tmp_path) = store_for_test();
  let aprobador = Uuid::new_v4();
  let pagador = Uuid::new_v4();
  let fecha = NaiveDate::from_ymd_opt(2024, 5, 20).expect("fecha válida");
  let expense = solicitud(Uuid::new_v4(), Uuid::new_v4(), "512.00", "servicios");
  store.insert(&expense).expect("insert");

  let approve = StatusUpdate { new_status: ExpenseStatus::Aprobado, approved_by: Some(aprobador), payment: None };
  store.update_status(&expense.id(), ExpenseStatus::Solicitado, &approve).expect("cas aprobar");
  let pay = StatusUpdate { new_status: ExpenseStatus::Pagado,
                           approved_by: None,
                           payment: Some(PaymentFields { doc_key: "payments/rec-9.pdf".to_string(),
                                                         date: fecha,
                                                         paid_by: pagador }) };
  store.update_status(&expense.id(), ExpenseStatus::Aprobado, &pay).expect("cas pagar");

  let paid = store.get(&expense.id()).expect("get").expect("el gasto existe");
  assert_eq!(paid.status(), ExpenseStatus::Pagado);
  assert_eq!(paid.payment_doc_key(), Some("payments/rec-9.pdf"));
  assert_eq!(paid.payment_date(), Some(fecha));
  assert_eq!(paid.paid_by(), Some(pagador));
  assert!(paid.payment_is_consistent());

  // Al salir de pagado los campos de pago se limpian en la fila, pero
  // approved_by se conserva.
  let revert = StatusUpdate { new_status: ExpenseStatus::Aprobado, approved_by: None, payment: None };
  store.update_status(&expense.id(), ExpenseStatus::Pagado, &revert).expect("cas revertir");
  let reverted = store.get(&expense.id()).expect("get").expect("el gasto existe");
  assert!(reverted.payment_doc_key().is_none());
  assert!(reverted.payment_date().is_none());
  assert!(reverted.paid_by().is_none());
  assert_eq!(reverted.approved_by(), Some(aprobador));
  assert!(reverted.payment_is_consistent());
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn find_combines_filters_and_list_categories_sorts() {
  let (store, tmp_path) = store_for_test();
  let ana = Uuid::new_v4();
  let luis = Uuid::new_v4();
  let acme = Uuid::new_v4();
  let gamma = Uuid::new_v4();
  let e1 = solicitud(acme, ana, "100.00", "viáticos");
  let e2 = solicitud(gamma, ana, "200.00", "papelería");
  let e3 = solicitud(acme, luis, "300.00", "viáticos");
  for e in [&e1, &e2, &e3] {
    store.insert(e).expect("insert");
  }
  let approve = StatusUpdate { new_status: ExpenseStatus::Aprobado, approved_by: Some(Uuid::new_v4()), payment: None };
  store.update_status(&e3.id(), ExpenseStatus::Solicitado, &approve).expect("cas");

  let by_supplier = store.find(&ExpenseFilter::by_supplier(acme)).expect("find");
  assert_eq!(by_supplier.len(), 2);
  assert!(by_supplier.iter().all(|e| e.supplier_id() == acme));

  let de_ana = ExpenseFilter { requested_by: Some(ana), ..ExpenseFilter::default() };
  let by_requester = store.find(&de_ana).expect("find");
  assert_eq!(by_requester.len(), 2);

  let by_status = store.find(&ExpenseFilter::by_status(ExpenseStatus::Aprobado)).expect("find");
  assert_eq!(by_status.len(), 1);
  assert_eq!(by_status[0].id(), e3.id());

  // Los filtros se combinan con AND.
  let combinado = ExpenseFilter { supplier_id: Some(acme),
                                  requested_by: Some(ana),
                                  ..ExpenseFilter::default() };
  let both = store.find(&combinado).expect("find");
  assert_eq!(both.len(), 1);
  assert_eq!(both[0].id(), e1.id());

  let cats = store.list_categories().expect("categorías");
  assert_eq!(cats, vec!["papelería".to_string(), "viáticos".to_string()]);
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn log_and_comments_roundtrip_in_separate_channels() {
  let (store, tmp_path) = store_for_test();
  let requester = Uuid::new_v4();
  let aprobador = Uuid::new_v4();
  let expense = solicitud(Uuid::new_v4(), requester, "100.00", "viáticos");
  store.insert(&expense).expect("insert");

  store.append_log(&LogEntry::created(&expense, "Papelería Central", requester)).expect("log creación");
  store.append_log(&LogEntry::status_changed(expense.id(), aprobador, ExpenseStatus::Solicitado,
                                             ExpenseStatus::Aprobado))
       .expect("log cambio");

  let log = store.list_log(&expense.id()).expect("bitácora");
  assert_eq!(log.len(), 2);
  assert!(log.iter().any(|e| e.action == LogAction::Created && e.message.contains("Papelería Central")));
  assert!(log.iter().any(|e| e.action == LogAction::StatusChanged
                            && e.old_status == Some(ExpenseStatus::Solicitado)
                            && e.new_status == Some(ExpenseStatus::Aprobado)));

  store.append_comment(&Comment::new(expense.id(), requester, "  urge  ")).expect("comentario");
  let comments = store.list_comments(&expense.id()).expect("comentarios");
  assert_eq!(comments.len(), 1);
  assert_eq!(comments[0].text, "urge");
  assert_eq!(comments[0].author, requester);

  // La bitácora de otro gasto queda vacía.
  assert!(store.list_log(&Uuid::new_v4()).expect("bitácora").is_empty());
  assert!(store.list_comments(&Uuid::new_v4()).expect("comentarios").is_empty());
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn list_log_returns_newest_first() {
  let (store, tmp_path) = store_for_test();
  let expense_id = Uuid::new_v4();
  let actor = Uuid::new_v4();
  // Marcas de tiempo explícitas y bien separadas: el orden no puede
  // depender de la velocidad del test.
  let viejo = LogEntry { id: Uuid::new_v4(),
                         expense_id,
                         actor,
                         action: LogAction::Created,
                         message: "create: supplier=Acme, amount=100.00, category=viáticos".to_string(),
                         old_status: None,
                         new_status: Some(ExpenseStatus::Solicitado),
                         created_at: Utc::now() - Duration::seconds(90) };
  let nuevo = LogEntry { id: Uuid::new_v4(),
                         expense_id,
                         actor,
                         action: LogAction::StatusChanged,
                         message: "status: solicitado -> aprobado".to_string(),
                         old_status: Some(ExpenseStatus::Solicitado),
                         new_status: Some(ExpenseStatus::Aprobado),
                         created_at: Utc::now() };
  store.append_log(&viejo).expect("log viejo");
  store.append_log(&nuevo).expect("log nuevo");

  let log = store.list_log(&expense_id).expect("bitácora");
  assert_eq!(log.len(), 2);
  assert_eq!(log[0].id, nuevo.id);
  assert_eq!(log[1].id, viejo.id);

  // Mismo orden para comentarios.
  let c_viejo = Comment { id: Uuid::new_v4(),
                          expense_id,
                          author: actor,
                          text: "primero".to_string(),
                          created_at: Utc::now() - Duration::seconds(90) };
  let c_nuevo = Comment::new(expense_id, actor, "segundo");
  store.append_comment(&c_viejo).expect("comentario viejo");
  store.append_comment(&c_nuevo).expect("comentario nuevo");
  let comments = store.list_comments(&expense_id).expect("comentarios");
  assert_eq!(comments[0].text, "segundo");
  assert_eq!(comments[1].text, "primero");
  let _ = std::fs::remove_file(tmp_path);
}
