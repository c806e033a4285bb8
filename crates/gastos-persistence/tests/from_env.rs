use tramite::{ExpenseRepository, IdentityRepository};
use uuid::Uuid;

#[test]
fn env_constructors_bootstrap_sqlite() {
  // Base en archivo temporal cuyo nombre "parece SQLite" para que también
  // la acepte la variante estricta.
  let tmp_path = std::env::temp_dir().join(format!("gastos_test_{}.sqlite", Uuid::new_v4()));
  let db_url = tmp_path.to_str().expect("ruta temporal utf-8").to_string();
  std::env::set_var("GASTOS_DB_URL", &db_url);
  // Compilado con `pg` el store queda tipado contra Postgres; este test es
  // sólo del backend SQLite, se omite en runtime.
  if cfg!(feature = "pg") {
    eprintln!("se omite el test sqlite porque la feature 'pg' está habilitada");
    return;
  }
  let store = gastos_persistence::new_store_from_env().expect("store desde el entorno");
  // Las migraciones corrieron: las consultas básicas funcionan sobre una
  // base recién creada.
  assert!(store.list_categories().expect("categorías").is_empty());

  let strict = gastos_persistence::new_from_env().expect("store estricto");
  assert!(strict.list_users().expect("usuarios").is_empty());
  let _ = std::fs::remove_file(tmp_path);
}
