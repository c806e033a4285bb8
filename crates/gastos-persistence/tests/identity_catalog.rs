// Identidad (usuarios y roles) y catálogo (proveedores y personas) sobre el
// backend SQLite. Con la feature `pg` este archivo se omite entero.
#![cfg(not(feature = "pg"))]
use gastos_domain::{CatalogRepository, DomainError, Person, Role, Supplier, UserAccount};
use gastos_persistence::{new_sqlite_for_test, DieselGastosStore};
use std::path::PathBuf;
use tramite::{IdentityRepository, TramiteError};
use uuid::Uuid;

fn store_for_test() -> (DieselGastosStore, PathBuf) {
  let tmp_path = std::env::temp_dir().join(format!("gastos_test_{}.db", Uuid::new_v4()));
  let db_url = tmp_path.to_str().expect("ruta temporal utf-8").to_string();
  (new_sqlite_for_test(&db_url), tmp_path)
}

#[test]
fn user_registration_normalizes_and_rejects_taken_emails() {
  let (store, tmp_path) = store_for_test();
  let ana = UserAccount::new(" Ana.Lopez@Empresa.MX ").expect("cuenta válida");
  store.register_user(&ana).expect("registro");
  // Registrar dos veces la misma cuenta es idempotente.
  store.register_user(&ana).expect("registro repetido");

  let found = store.lookup_by_email("ana.lopez@empresa.mx").expect("lookup").expect("la cuenta existe");
  assert_eq!(found.id(), ana.id());
  assert_eq!(found.email(), "ana.lopez@empresa.mx");
  // El lookup también normaliza su argumento.
  assert!(store.lookup_by_email(" ANA.LOPEZ@EMPRESA.MX ").expect("lookup").is_some());

  // El mismo correo con otro id es otra cuenta y se rechaza.
  let impostor = UserAccount::from_parts(Uuid::new_v4(), "ana.lopez@empresa.mx").expect("cuenta válida");
  match store.register_user(&impostor) {
    Err(TramiteError::Validation(_)) => {}
    other => panic!("esperaba Validation por correo duplicado, llegó: {:?}", other),
  }
  assert!(store.lookup_by_email("nadie@empresa.mx").expect("lookup").is_none());
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn role_assignment_and_removal_are_idempotent() {
  let (store, tmp_path) = store_for_test();
  let user = Uuid::new_v4();
  store.assign_role(&user, Role::Aprobador).expect("asignar");
  store.assign_role(&user, Role::Aprobador).expect("asignar repetido");
  store.assign_role(&user, Role::Lector).expect("asignar lector");

  let roles = store.get_roles(&user).expect("roles");
  assert_eq!(roles.len(), 2);
  assert!(roles.contains(&Role::Aprobador));
  assert!(roles.contains(&Role::Lector));

  store.remove_role(&user, Role::Aprobador).expect("quitar");
  store.remove_role(&user, Role::Aprobador).expect("quitar rol ausente");
  let roles = store.get_roles(&user).expect("roles");
  assert!(!roles.contains(&Role::Aprobador));
  assert!(roles.contains(&Role::Lector));

  // Usuario desconocido: conjunto vacío, nunca error.
  assert!(store.get_roles(&Uuid::new_v4()).expect("roles").is_empty());
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn emails_by_ids_resolves_only_known_accounts() {
  let (store, tmp_path) = store_for_test();
  let ana = UserAccount::new("ana@empresa.mx").expect("cuenta válida");
  let luis = UserAccount::new("luis@empresa.mx").expect("cuenta válida");
  store.register_user(&ana).expect("registro");
  store.register_user(&luis).expect("registro");

  let stranger = Uuid::new_v4();
  let map = store.emails_by_ids(&[ana.id(), luis.id(), stranger]).expect("lote");
  assert_eq!(map.len(), 2);
  assert_eq!(map.get(&ana.id()).map(String::as_str), Some("ana@empresa.mx"));
  assert_eq!(map.get(&luis.id()).map(String::as_str), Some("luis@empresa.mx"));
  assert!(!map.contains_key(&stranger));

  assert!(store.emails_by_ids(&[]).expect("lote vacío").is_empty());
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn list_users_sorts_by_email_and_roles_map_groups_by_user() {
  let (store, tmp_path) = store_for_test();
  let zoe = UserAccount::new("zoe@empresa.mx").expect("cuenta válida");
  let ana = UserAccount::new("ana@empresa.mx").expect("cuenta válida");
  store.register_user(&zoe).expect("registro");
  store.register_user(&ana).expect("registro");
  store.assign_role(&ana.id(), Role::Solicitante).expect("rol");
  store.assign_role(&ana.id(), Role::Lector).expect("rol");
  store.assign_role(&zoe.id(), Role::Administrador).expect("rol");

  let emails: Vec<String> = store.list_users().expect("usuarios").iter().map(|u| u.email().to_string()).collect();
  assert_eq!(emails, vec!["ana@empresa.mx".to_string(), "zoe@empresa.mx".to_string()]);

  let map = store.roles_map().expect("mapa de roles");
  assert_eq!(map.get(&ana.id()).map(|r| r.len()), Some(2));
  assert_eq!(map.get(&zoe.id()).map(|r| r.len()), Some(1));
  assert!(map.get(&zoe.id()).map_or(false, |r| r.contains(&Role::Administrador)));
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn supplier_catalog_enforces_unique_names_and_allows_rename() {
  let (store, tmp_path) = store_for_test();
  let id = store.save_supplier(Supplier::new("Acme").expect("proveedor")).expect("alta");
  let loaded = store.get_supplier(&id).expect("get").expect("el proveedor existe");
  assert_eq!(loaded.name(), "Acme");

  // Mismo nombre con otras mayúsculas: duplicado.
  match store.save_supplier(Supplier::new("acme").expect("proveedor")) {
    Err(DomainError::ValidationError(_)) => {}
    other => panic!("esperaba ValidationError por nombre duplicado, llegó: {:?}", other),
  }

  // Re-guardar el mismo id sí se permite: renombra.
  let renamed = Supplier::from_parts(id, "Acme Norte").expect("proveedor");
  store.save_supplier(renamed).expect("renombrar");
  assert_eq!(store.get_supplier(&id).expect("get").expect("existe").name(), "Acme Norte");

  store.save_supplier(Supplier::new("Zeta Gas").expect("proveedor")).expect("alta");
  let names: Vec<String> = store.list_suppliers().expect("proveedores").iter().map(|s| s.name().to_string()).collect();
  assert_eq!(names, vec!["Acme Norte".to_string(), "Zeta Gas".to_string()]);

  assert!(store.get_supplier(&Uuid::new_v4()).expect("get").is_none());
  let _ = std::fs::remove_file(tmp_path);
}

#[test]
fn people_catalog_roundtrip_with_unique_names() {
  let (store, tmp_path) = store_for_test();
  store.save_person(Person::new("Carlos Pérez").expect("persona")).expect("alta");
  store.save_person(Person::new("Ana López").expect("persona")).expect("alta");
  match store.save_person(Person::new("ana lópez").expect("persona")) {
    Err(DomainError::ValidationError(_)) => {}
    other => panic!("esperaba ValidationError por nombre duplicado, llegó: {:?}", other),
  }
  let names: Vec<String> = store.list_people().expect("personas").iter().map(|p| p.name().to_string()).collect();
  assert_eq!(names, vec!["Ana López".to_string(), "Carlos Pérez".to_string()]);
  let _ = std::fs::remove_file(tmp_path);
}
