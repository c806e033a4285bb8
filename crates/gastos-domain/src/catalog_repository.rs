use crate::DomainError;
use crate::{Person, Supplier};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Trait que define la persistencia del catálogo de referencia (proveedores
/// y personas de reembolso). Los gastos referencian estas entidades por id.
pub trait CatalogRepository: Send + Sync {
    /// Guarda un proveedor y devuelve su `Uuid`. La unicidad por nombre se
    /// verifica aquí, al escribir.
    fn save_supplier(&self, supplier: Supplier) -> Result<Uuid, DomainError>;

    /// Recupera un proveedor por su `Uuid`.
    fn get_supplier(&self, id: &Uuid) -> Result<Option<Supplier>, DomainError>;

    /// Lista los proveedores ordenados por nombre.
    fn list_suppliers(&self) -> Result<Vec<Supplier>, DomainError>;

    /// Guarda una persona de reembolso y devuelve su `Uuid`. Unicidad por
    /// nombre al escribir.
    fn save_person(&self, person: Person) -> Result<Uuid, DomainError>;

    /// Lista las personas ordenadas por nombre.
    fn list_people(&self) -> Result<Vec<Person>, DomainError>;
}

/// Implementación en memoria para tests y desarrollo.
pub struct InMemoryCatalogRepository {
    suppliers: Arc<Mutex<HashMap<Uuid, Supplier>>>,
    people: Arc<Mutex<HashMap<Uuid, Person>>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self { suppliers: Arc::new(Mutex::new(HashMap::new())),
               people: Arc::new(Mutex::new(HashMap::new())) }
    }

    // Helper to map poisoned mutex errors into DomainError
    fn lock_map<'a, T>(&'a self, m: &'a Mutex<T>, name: &str) -> Result<std::sync::MutexGuard<'a, T>, DomainError> {
        m.lock()
         .map_err(|e| DomainError::ExternalError(format!("Mutex '{}' poisoned: {}", name, e)))
    }
}

impl CatalogRepository for InMemoryCatalogRepository {
    fn save_supplier(&self, supplier: Supplier) -> Result<Uuid, DomainError> {
        let id = supplier.id();
        let mut suppliers = self.lock_map(&self.suppliers, "suppliers")?;
        if suppliers.values().any(|s| s.id() != id && s.name().eq_ignore_ascii_case(supplier.name())) {
            return Err(DomainError::ValidationError(format!("Ya existe un proveedor con el nombre '{}'",
                                                            supplier.name())));
        }
        suppliers.insert(id, supplier);
        Ok(id)
    }

    fn get_supplier(&self, id: &Uuid) -> Result<Option<Supplier>, DomainError> {
        let suppliers = self.lock_map(&self.suppliers, "suppliers")?;
        Ok(suppliers.get(id).cloned())
    }

    fn list_suppliers(&self) -> Result<Vec<Supplier>, DomainError> {
        let suppliers = self.lock_map(&self.suppliers, "suppliers")?;
        let mut all: Vec<Supplier> = suppliers.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(all)
    }

    fn save_person(&self, person: Person) -> Result<Uuid, DomainError> {
        let id = person.id();
        let mut people = self.lock_map(&self.people, "people")?;
        if people.values().any(|p| p.id() != id && p.name().eq_ignore_ascii_case(person.name())) {
            return Err(DomainError::ValidationError(format!("Ya existe una persona con el nombre '{}'",
                                                            person.name())));
        }
        people.insert(id, person);
        Ok(id)
    }

    fn list_people(&self) -> Result<Vec<Person>, DomainError> {
        let people = self.lock_map(&self.people, "people")?;
        let mut all: Vec<Person> = people.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(all)
    }
}

impl Default for InMemoryCatalogRepository {
    fn default() -> Self {
        Self::new()
    }
}
