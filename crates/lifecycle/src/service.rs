// Archivo: service.rs
// Propósito: implementar `RequestService`, la capa orquestadora que expone
// las operaciones de alto nivel sobre solicitudes: las transiciones del
// motor, listados filtrados, sugerencia de prioridad y lectura de los
// vocabularios. Esta capa debe ser invocada desde handlers o desde la CLI.
use crate::domain::RequestFilter;
use crate::engine::{LifecycleEngine, LifecycleEngineConfig};
use crate::errors::{EntityKind, LifecycleError, Result};
use crate::repository::{ReferenceCatalog, RequestRepository, UserDirectory};
use chrono::{DateTime, Utc};
use request_domain::{suggest_priority_by_request_type, Channel, HistoryEntry, Priority, Request, RequestType, State,
                     User};
use std::sync::Arc;
use uuid::Uuid;

/// Servicio de alto nivel sobre solicitudes.
///
/// Orquesta el repositorio, los catálogos de sólo lectura y el motor. El
/// `LifecycleEngine` se construye internamente y se reusa.
pub struct RequestService<R> where R: RequestRepository
{
    repo: Arc<R>,
    catalog: Arc<dyn ReferenceCatalog>,
    users: Arc<dyn UserDirectory>,
    engine: LifecycleEngine<R>,
}

impl<R> RequestService<R> where R: RequestRepository
{
    pub fn new(repo: Arc<R>,
               catalog: Arc<dyn ReferenceCatalog>,
               users: Arc<dyn UserDirectory>,
               engine_config: LifecycleEngineConfig)
               -> Self {
        let engine = LifecycleEngine::new(repo.clone(), catalog.clone(), users.clone(), engine_config);
        Self { repo, catalog, users, engine }
    }

    pub fn create(&self,
                  description: &str,
                  request_type_id: i64,
                  channel_id: i64,
                  requested_by_id: i64,
                  registered_at: Option<DateTime<Utc>>)
                  -> Result<Request> {
        self.engine
            .create(description, request_type_id, channel_id, requested_by_id, registered_at)
    }

    pub fn classify(&self,
                    request_id: &Uuid,
                    request_type_id: i64,
                    priority: Priority,
                    justification: Option<&str>,
                    actor_id: i64)
                    -> Result<Request> {
        self.engine
            .classify(request_id, request_type_id, priority, justification, actor_id)
    }

    pub fn assign(&self, request_id: &Uuid, assignee_id: i64, actor_id: i64) -> Result<Request> {
        self.engine.assign(request_id, assignee_id, actor_id)
    }

    pub fn attend(&self, request_id: &Uuid, actor_id: i64, observations: Option<&str>) -> Result<Request> {
        self.engine.attend(request_id, actor_id, observations)
    }

    pub fn close(&self, request_id: &Uuid, closure_observation: Option<&str>, actor_id: i64) -> Result<Request> {
        self.engine.close(request_id, closure_observation, actor_id)
    }

    pub fn find_request(&self, request_id: &Uuid) -> Result<Request> {
        self.engine.find_request(request_id)
    }

    pub fn history(&self, request_id: &Uuid) -> Result<Vec<HistoryEntry>> {
        self.engine.history(request_id)
    }

    /// Solicitudes que cumplen `filter`, por fecha de registro descendente.
    pub fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>> {
        self.repo.list_requests(filter)
    }

    /// Sugerencia de prioridad para un tipo registrado. Sólo consulta: no
    /// modifica ninguna solicitud.
    pub fn suggest_priority_for_type(&self, request_type_id: i64) -> Result<Priority> {
        let request_type = self.catalog
                               .request_type(request_type_id)?
                               .ok_or_else(|| LifecycleError::not_found(EntityKind::RequestType, request_type_id))?;
        Ok(suggest_priority_by_request_type(Some(&request_type.code)))
    }

    pub fn states(&self) -> Result<Vec<State>> {
        self.catalog.list_states()
    }

    pub fn request_types(&self) -> Result<Vec<RequestType>> {
        self.catalog.list_request_types()
    }

    pub fn channels(&self) -> Result<Vec<Channel>> {
        self.catalog.list_channels()
    }

    pub fn active_users(&self) -> Result<Vec<User>> {
        self.users.list_active_users()
    }
}
