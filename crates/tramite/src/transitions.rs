// Archivo: transitions.rs
// Propósito: tabla de transiciones del ciclo de vida. Las aristas se
// definen por rol y estado destino; no es un DAG: cualquier estado puede
// revisitarse si un rol lo permite.
use crate::errors::{Result, TramiteError};
use gastos_domain::{ExpenseStatus, Role, RoleSet};

/// Roles que pueden fijar cada estado destino. `administrador` no aparece
/// en la tabla: su excepción vive en `can_set_status`.
pub fn roles_allowed_for(target: ExpenseStatus) -> &'static [Role] {
    match target {
        ExpenseStatus::Solicitado => &[Role::Aprobador, Role::Pagador],
        ExpenseStatus::Aprobado => &[Role::Aprobador, Role::Pagador],
        ExpenseStatus::Rechazado => &[Role::Aprobador, Role::Pagador],
        ExpenseStatus::Pagado => &[Role::Pagador],
    }
}

/// Indica si alguno de `roles` puede fijar `target`. `administrador`
/// siempre puede; `solicitante` y `lector` nunca.
pub fn can_set_status(roles: &RoleSet, target: ExpenseStatus) -> bool {
    roles.contains(&Role::Administrador) || roles_allowed_for(target).iter().any(|r| roles.contains(r))
}

/// Estados destino que `roles` permite fijar, en orden canónico. Útil para
/// construir menús.
pub fn allowed_targets(roles: &RoleSet) -> Vec<ExpenseStatus> {
    ExpenseStatus::ALL.into_iter().filter(|s| can_set_status(roles, *s)).collect()
}

/// Interpreta una etiqueta de estado destino proveniente de una interfaz.
/// Una etiqueta desconocida es `InvalidTargetState`, no un error de parseo
/// genérico.
pub fn parse_target(label: &str) -> Result<ExpenseStatus> {
    ExpenseStatus::parse(label).map_err(|_| TramiteError::InvalidTargetState(label.trim().to_string()))
}
