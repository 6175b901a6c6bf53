// Archivo: engine.rs
// Propósito: implementar `LifecycleEngine`, la máquina de estados de una
// solicitud. Cada transición carga la solicitud, valida guardas en orden fijo,
// resuelve las entidades auxiliares, muta el agregado y delega en el
// repositorio el commit atómico de solicitud + entrada de historial.
use crate::domain::PersistResult;
use crate::errors::{EntityKind, LifecycleError, Result};
use crate::repository::{ReferenceCatalog, RequestRepository, UserDirectory};
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, info, warn};
use request_domain::{check_transition, ensure_not_terminal, HistoryAction, HistoryEntry, LifecycleAction, Priority,
                     Request, RequestType, State, StateCode, TransitionError, User};
use std::sync::Arc;
use uuid::Uuid;

/// Configuración del motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleEngineConfig {
    /// Con `true` cada commit lleva la versión leída al cargar la solicitud y
    /// una transición concurrente que ya la avanzó produce
    /// `LifecycleError::Conflict`. Con `false` el commit se aplica sin
    /// comprobar versión.
    pub optimistic_locking: bool,
}

impl Default for LifecycleEngineConfig {
    fn default() -> Self {
        Self { optimistic_locking: true }
    }
}

/// Motor del ciclo de vida.
///
/// Orden de evaluación de guardas en todas las transiciones:
/// 1. cargar la solicitud (`NotFound`);
/// 2. estado terminal (`TransitionError::Closed`);
/// 3. guardas de entrada propias de la operación (observación de cierre,
///    responsable existente y activo);
/// 4. estado de partida (`TransitionError::WrongState`);
/// 5. resolución del resto de entidades (tipo, actor, fila del estado
///    destino);
/// 6. mutación y commit atómico.
///
/// Cualquier fallo antes del paso 6 deja la solicitud y su historial
/// intactos. El motor no guarda estado propio entre llamadas.
pub struct LifecycleEngine<R>
    where R: RequestRepository
{
    repo: Arc<R>,
    catalog: Arc<dyn ReferenceCatalog>,
    users: Arc<dyn UserDirectory>,
    config: LifecycleEngineConfig,
}

impl<R> LifecycleEngine<R> where R: RequestRepository
{
    pub fn new(repo: Arc<R>,
               catalog: Arc<dyn ReferenceCatalog>,
               users: Arc<dyn UserDirectory>,
               config: LifecycleEngineConfig)
               -> Self {
        Self { repo, catalog, users, config }
    }

    /// Registra una solicitud nueva en REGISTRADA y agrega la entrada
    /// REGISTERED a nombre del solicitante.
    pub fn create(&self,
                  description: &str,
                  request_type_id: i64,
                  channel_id: i64,
                  requested_by_id: i64,
                  registered_at: Option<DateTime<Utc>>)
                  -> Result<Request> {
        self.resolve_request_type(request_type_id)?;
        self.catalog
            .channel(channel_id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Channel, channel_id))?;
        let requester = self.resolve_user(requested_by_id)?;
        self.resolve_state(StateCode::Registrada)?;

        let now = now();
        let request = Request::register(description,
                                        request_type_id,
                                        channel_id,
                                        requester.id,
                                        registered_at.map(|t| t.trunc_subsecs(6)),
                                        now);
        let entry = HistoryEntry::new(request.id(),
                                      1,
                                      now,
                                      HistoryAction::Registered,
                                      requester.id,
                                      Some("Request registered"));
        self.repo.insert_request(&request, &entry)?;
        info!("solicitud {} registrada por usuario {}", request.id(), requester.id);
        Ok(request)
    }

    /// REGISTRADA → CLASIFICADA: fija tipo, prioridad y justificación.
    pub fn classify(&self,
                    request_id: &Uuid,
                    request_type_id: i64,
                    priority: Priority,
                    justification: Option<&str>,
                    actor_id: i64)
                    -> Result<Request> {
        let action = LifecycleAction::Classify;
        let mut request = self.load_open(request_id, action)?;
        self.ensure_precondition(&request, action)?;
        let request_type = self.resolve_request_type(request_type_id)?;
        let actor = self.resolve_user(actor_id)?;
        self.resolve_state(action.target())?;

        let before = request.version();
        let at = now();
        request.classify(request_type.id, priority, justification, at)?;
        let observation = classification_observation(&request_type, priority, justification);
        self.commit(request, before, action, &actor, Some(&observation), at)
    }

    /// CLASIFICADA → EN_ATENCION: fija el responsable, que debe existir y
    /// estar activo.
    pub fn assign(&self, request_id: &Uuid, assignee_id: i64, actor_id: i64) -> Result<Request> {
        let action = LifecycleAction::Assign;
        let mut request = self.load_open(request_id, action)?;
        let assignee = self.resolve_user(assignee_id)?;
        if !assignee.active {
            warn!("asignación rechazada: usuario {} inactivo", assignee.id);
            return Err(LifecycleError::InvalidInput(format!("Cannot assign to inactive user: {}", assignee.id)));
        }
        self.ensure_precondition(&request, action)?;
        let actor = self.resolve_user(actor_id)?;
        self.resolve_state(action.target())?;

        let before = request.version();
        let at = now();
        request.assign(assignee.id, at)?;
        let observation = format!("Assigned to {} ({})", assignee.name, assignee.identifier);
        self.commit(request, before, action, &actor, Some(&observation), at)
    }

    /// EN_ATENCION → ATENDIDA. Las observaciones sólo van al historial.
    pub fn attend(&self, request_id: &Uuid, actor_id: i64, observations: Option<&str>) -> Result<Request> {
        let action = LifecycleAction::Attend;
        let mut request = self.load_open(request_id, action)?;
        self.ensure_precondition(&request, action)?;
        let actor = self.resolve_user(actor_id)?;
        self.resolve_state(action.target())?;

        let before = request.version();
        let at = now();
        request.attend(at)?;
        self.commit(request, before, action, &actor, observations, at)
    }

    /// ATENDIDA → CERRADA. La observación de cierre es obligatoria y no puede
    /// estar en blanco.
    pub fn close(&self, request_id: &Uuid, closure_observation: Option<&str>, actor_id: i64) -> Result<Request> {
        let action = LifecycleAction::Close;
        let mut request = self.load_open(request_id, action)?;
        let closure = closure_observation.filter(|o| !o.trim().is_empty())
                                         .ok_or_else(|| {
                                             LifecycleError::InvalidInput("Closure observation is required".into())
                                         })?;
        self.ensure_precondition(&request, action)?;
        let actor = self.resolve_user(actor_id)?;
        self.resolve_state(action.target())?;

        let before = request.version();
        let at = now();
        request.close(closure, at)?;
        self.commit(request, before, action, &actor, Some(closure), at)
    }

    /// Obtiene la solicitud o `NotFound`.
    pub fn find_request(&self, request_id: &Uuid) -> Result<Request> {
        debug!("buscando solicitud {}", request_id);
        self.repo
            .get_request(request_id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::Request, request_id))
    }

    /// Historial de la solicitud, más reciente primero.
    pub fn history(&self, request_id: &Uuid) -> Result<Vec<HistoryEntry>> {
        self.find_request(request_id)?;
        self.repo.read_history(request_id)
    }

    fn load_open(&self, request_id: &Uuid, action: LifecycleAction) -> Result<Request> {
        let request = self.find_request(request_id)?;
        ensure_not_terminal(request.state()).map_err(|e| rejected(&request, action, e))?;
        Ok(request)
    }

    fn ensure_precondition(&self, request: &Request, action: LifecycleAction) -> Result<()> {
        check_transition(request.state(), action).map_err(|e| rejected(request, action, e))?;
        Ok(())
    }

    fn resolve_request_type(&self, id: i64) -> Result<RequestType> {
        self.catalog
            .request_type(id)?
            .ok_or_else(|| LifecycleError::not_found(EntityKind::RequestType, id))
    }

    fn resolve_user(&self, id: i64) -> Result<User> {
        self.users.user(id)?.ok_or_else(|| LifecycleError::not_found(EntityKind::User, id))
    }

    fn resolve_state(&self, code: StateCode) -> Result<State> {
        self.catalog.state(code)?.ok_or_else(|| {
            LifecycleError::ReferenceData(format!("State {} not found. Ensure reference data is loaded.", code))
        })
    }

    fn commit(&self,
              request: Request,
              before_version: i64,
              action: LifecycleAction,
              actor: &User,
              observations: Option<&str>,
              at: DateTime<Utc>)
              -> Result<Request> {
        let cursor = self.repo.count_history(&request.id())? + 1;
        let entry = HistoryEntry::new(request.id(), cursor, at, action.history_action(), actor.id, observations);
        let expected_version = self.config.optimistic_locking.then_some(before_version);
        match self.repo.apply_transition(&request, expected_version, &entry)? {
            PersistResult::Ok { new_version } => {
                info!("solicitud {}: {} -> {} por usuario {} (v{})",
                      request.id(),
                      action.precondition(),
                      request.state(),
                      actor.id,
                      new_version);
                Ok(request)
            }
            PersistResult::Conflict => {
                warn!("conflicto de versión en solicitud {} al {} (esperada v{})",
                      request.id(),
                      action,
                      before_version);
                Err(LifecycleError::Conflict(format!("Request {} was modified concurrently", request.id())))
            }
        }
    }
}

fn rejected(request: &Request, action: LifecycleAction, e: TransitionError) -> LifecycleError {
    warn!("transición '{}' rechazada para solicitud {}: {}", action, request.id(), e);
    LifecycleError::InvalidStateTransition(e)
}

/// `"Type: <code>, Priority: <PRIORITY>"` más `". <justificación>"` si ésta no
/// está en blanco.
fn classification_observation(request_type: &RequestType, priority: Priority, justification: Option<&str>) -> String {
    let mut text = format!("Type: {}, Priority: {}", request_type.code, priority);
    if let Some(j) = justification.filter(|j| !j.trim().is_empty()) {
        text.push_str(". ");
        text.push_str(j);
    }
    text
}

fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_observation_skips_blank_justification() {
        let t = RequestType { id: 2, code: "HOMOLOG".into(), name: "Homologación".into(), description: None };
        assert_eq!(classification_observation(&t, Priority::High, None), "Type: HOMOLOG, Priority: HIGH");
        assert_eq!(classification_observation(&t, Priority::High, Some("  ")), "Type: HOMOLOG, Priority: HIGH");
        assert_eq!(classification_observation(&t, Priority::Low, Some("urgente")),
                   "Type: HOMOLOG, Priority: LOW. urgente");
    }
}
