//! Crate `tramite` — ciclo de vida de gastos con guardia de roles
//!
//! Este crate define los tipos del trámite (`LogEntry`, `Comment`,
//! `TransitionRequest`, vistas enriquecidas), los contratos de persistencia
//! (`ExpenseRepository`, `AuditRepository`, `IdentityRepository`,
//! `DocumentStore`) y una implementación en memoria útil para pruebas
//! (`InMemoryStore`). También expone el motor `LifecycleEngine`, que aplica
//! la tabla de transiciones por rol y deriva la bitácora.
//!
//! Diseño resumido:
//! - Bitácora append-only: cada transición aplicada produce exactamente una
//!   entrada con el estado anterior y el nuevo; los comentarios van por un
//!   canal separado y nunca generan entradas de bitácora.
//! - Locking optimista: el cambio de estado usa compare-and-set sobre el
//!   estado leído (`CasResult::Conflict` ⇒ `ConcurrentModification`).
//! - Guardia única de roles: toda operación mutante pasa por
//!   `guard::require_role`; `administrador` pasa cualquier verificación.
//! - Cache explícita: las consultas repetidas (roles, catálogos) se guardan
//!   por firma y se invalidan desde la mutación que cambió los datos.
//!
//! Ejemplo rápido:
//! ```rust
//! use tramite::stubs::{InMemoryDocumentStore, InMemoryStore};
//! use tramite::engine::EngineConfig;
//! use std::sync::Arc;
//! let store = Arc::new(InMemoryStore::new());
//! let docs = Arc::new(InMemoryDocumentStore::new());
//! let engine = tramite::LifecycleEngine::new(store, docs, EngineConfig::default());
//! ```
pub mod cache;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod guard;
pub mod repository;
pub mod stubs;
pub mod transitions;

pub use cache::*;
pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use guard::*;
pub use repository::*;
pub use stubs::*;
pub use transitions::*;
