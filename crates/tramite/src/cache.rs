// Archivo: cache.rs
// Propósito: cache explícita de consultas, indexada por firma de consulta.
// No hay TTL: la invalidación la dispara la mutación que cambió los datos
// subyacentes, nunca un vencimiento implícito.
use crate::errors::{Result, TramiteError};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Cache de resultados serializados, con clave por firma ("roles/<uuid>",
/// "suppliers", ...). Los valores se guardan como JSON para que cualquier
/// consulta serializable pueda usar la misma cache.
pub struct SignatureCache {
    entries: Mutex<HashMap<String, JsonValue>>,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, JsonValue>>> {
        self.entries
            .lock()
            .map_err(|e| TramiteError::Storage(format!("mutex poisoned: {:?}", e)))
    }

    /// Valor cacheado para la firma, si existe.
    pub fn get(&self, signature: &str) -> Result<Option<JsonValue>> {
        Ok(self.lock()?.get(signature).cloned())
    }

    /// Guarda (o reemplaza) el valor de una firma.
    pub fn put(&self, signature: &str, value: JsonValue) -> Result<()> {
        self.lock()?.insert(signature.to_string(), value);
        Ok(())
    }

    /// Invalida una firma exacta.
    pub fn invalidate(&self, signature: &str) -> Result<()> {
        self.lock()?.remove(signature);
        Ok(())
    }

    /// Invalida todas las firmas con el prefijo dado.
    pub fn invalidate_prefix(&self, prefix: &str) -> Result<()> {
        self.lock()?.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new()
    }
}
