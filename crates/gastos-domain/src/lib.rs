mod amount;
mod catalog_repository;
mod catalog_stubs;
mod errors;
mod expense;
mod person;
mod role;
mod status;
mod supplier;
mod user;

pub use amount::Amount;
pub use catalog_repository::{CatalogRepository, InMemoryCatalogRepository};
pub use errors::DomainError;
pub use expense::{Expense, ExpenseParts, NewExpense};
pub use person::Person;
pub use role::{Role, RoleSet};
pub use status::ExpenseStatus;
pub use supplier::Supplier;
pub use user::UserAccount;
// Re-export del stub para que pruebas y demos puedan sembrar catálogos
pub use catalog_stubs::CatalogStubs;
