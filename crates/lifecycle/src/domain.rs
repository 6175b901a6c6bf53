// Archivo: domain.rs
// Propósito: tipos compartidos entre el motor y las persistencias: el
// resultado de un commit con control optimista y el filtro de listados.
use request_domain::{Priority, Request, StateCode};
use serde::{Deserialize, Serialize};

/// Resultado de aplicar una transición en el repositorio.
///
/// `Conflict` indica que la versión almacenada ya no coincide con la
/// esperada: no se escribió nada.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersistResult {
    Ok { new_version: i64 },
    Conflict,
}

/// Filtro de listado de solicitudes. Los criterios presentes se combinan con
/// AND; un filtro vacío devuelve todo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub state: Option<StateCode>,
    pub request_type_id: Option<i64>,
    pub priority: Option<Priority>,
    pub assigned_to_id: Option<i64>,
    pub requested_by_id: Option<i64>,
}

impl RequestFilter {
    pub fn with_state(mut self, state: StateCode) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_request_type(mut self, request_type_id: i64) -> Self {
        self.request_type_id = Some(request_type_id);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, user_id: i64) -> Self {
        self.assigned_to_id = Some(user_id);
        self
    }

    pub fn with_requester(mut self, user_id: i64) -> Self {
        self.requested_by_id = Some(user_id);
        self
    }

    /// Evalúa el filtro en memoria. Las persistencias SQL traducen los mismos
    /// criterios a cláusulas `WHERE`.
    pub fn matches(&self, request: &Request) -> bool {
        self.state.map_or(true, |s| request.state() == s)
        && self.request_type_id.map_or(true, |t| request.request_type_id() == t)
        && self.priority.map_or(true, |p| request.priority() == Some(p))
        && self.assigned_to_id.map_or(true, |u| request.assigned_to_id() == Some(u))
        && self.requested_by_id.map_or(true, |u| request.requested_by_id() == u)
    }
}
