// Archivo: guard.rs
// Propósito: guardia única de autenticación y roles. Toda operación mutante
// del motor pasa por aquí; la verificación falla cerrada.
use crate::errors::{Result, TramiteError};
use gastos_domain::{Role, RoleSet};
use uuid::Uuid;

/// Convierte una sesión opcional en un actor autenticado.
/// Sin sesión ⇒ `NotAuthenticated`, antes de tocar cualquier dato.
pub fn authenticate(session: Option<Uuid>) -> Result<Uuid> {
    session.ok_or(TramiteError::NotAuthenticated)
}

/// Verifica que el actor tenga alguno de los roles permitidos para la
/// operación. `administrador` pasa cualquier verificación. Un conjunto de
/// roles vacío siempre falla.
pub fn require_role(actor: Uuid, roles: &RoleSet, allowed: &[Role], operation: &str) -> Result<()> {
    if roles.contains(&Role::Administrador) || allowed.iter().any(|r| roles.contains(r)) {
        return Ok(());
    }
    Err(TramiteError::RoleNotAuthorized { actor, operation: operation.to_string() })
}
