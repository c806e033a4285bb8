//! Persistencia Diesel de los contratos del trámite de gastos.
//! Este archivo expone el módulo `schema` y reexporta el store Diesel que
//! implementa los traits de persistencia (`ExpenseRepository`,
//! `AuditRepository`, `IdentityRepository`, `CatalogRepository`). La
//! implementación detallada está en `tramite_persistence.rs`.

pub mod schema;
mod tramite_persistence;

#[cfg(not(feature = "pg"))]
pub use tramite_persistence::new_sqlite_for_test;
pub use tramite_persistence::{new_from_env, new_store_from_env, DieselGastosStore};
