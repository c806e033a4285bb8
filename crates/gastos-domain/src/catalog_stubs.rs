use crate::catalog_repository::{CatalogRepository, InMemoryCatalogRepository};
use crate::{Person, Supplier};

pub struct CatalogStubs;

impl CatalogStubs {
    /// Crea un catálogo en memoria pre-poblado con proveedores y una persona
    /// de ejemplo.
    pub fn sample_repo() -> InMemoryCatalogRepository {
        let repo = InMemoryCatalogRepository::new();

        let s1 = Supplier::new("Papelería Central").unwrap();
        let s2 = Supplier::new("Viajes del Norte").unwrap();
        let p1 = Person::new("Ana López").unwrap();

        let _ = repo.save_supplier(s1);
        let _ = repo.save_supplier(s2);
        let _ = repo.save_person(p1);

        repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_repo_comes_populated() {
        let repo = CatalogStubs::sample_repo();
        let suppliers = repo.list_suppliers().expect("listar proveedores");
        let people = repo.list_people().expect("listar personas");
        assert_eq!(suppliers.len(), 2);
        assert_eq!(people.len(), 1);
        assert!(suppliers.iter().any(|s| s.name() == "Papelería Central"));
    }
}
