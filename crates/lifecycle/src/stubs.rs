// Archivo: stubs.rs
// Propósito: implementaciones en memoria de los puertos para pruebas y
// wiring rápido. No son durables y se usan para demos o pruebas locales.
use crate::domain::{PersistResult, RequestFilter};
use crate::errors::{EntityKind, LifecycleError, Result};
use crate::repository::{ReferenceCatalog, RequestRepository, UserDirectory};
use request_domain::{default_channels, default_request_types, default_states, Channel, HistoryEntry, Request,
                     RequestType, State, StateCode, User};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Helper para mapear `Mutex::lock()` en un `Result` con
/// `LifecycleError::Storage`.
fn lock<T>(m: &Mutex<T>) -> std::result::Result<MutexGuard<'_, T>, LifecycleError> {
    m.lock().map_err(|e| LifecycleError::Storage(format!("mutex poisoned: {:?}", e)))
}

/// Repositorio en memoria de solicitudes e historial.
///
/// Las escrituras toman ambos mutex (siempre en el mismo orden) durante la
/// operación completa, de modo que solicitud y entrada se ven juntas o no
/// se ven.
pub struct InMemoryRequestRepository {
    requests: Mutex<HashMap<Uuid, Request>>,
    history: Mutex<HashMap<Uuid, Vec<HistoryEntry>>>,
}

impl InMemoryRequestRepository {
    pub fn new() -> Self {
        Self { requests: Mutex::new(HashMap::new()),
               history: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryRequestRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestRepository for InMemoryRequestRepository {
    fn get_request(&self, id: &Uuid) -> Result<Option<Request>> {
        Ok(lock(&self.requests)?.get(id).cloned())
    }

    fn insert_request(&self, request: &Request, entry: &HistoryEntry) -> Result<()> {
        let mut requests = lock(&self.requests)?;
        let mut history = lock(&self.history)?;
        if requests.contains_key(&request.id()) {
            return Err(LifecycleError::Conflict(format!("request {} already exists", request.id())));
        }
        requests.insert(request.id(), request.clone());
        history.insert(request.id(), vec![entry.clone()]);
        Ok(())
    }

    fn apply_transition(&self,
                        request: &Request,
                        expected_version: Option<i64>,
                        entry: &HistoryEntry)
                        -> Result<PersistResult> {
        let mut requests = lock(&self.requests)?;
        let mut history = lock(&self.history)?;
        let stored = requests.get_mut(&request.id())
                             .ok_or_else(|| LifecycleError::not_found(EntityKind::Request, request.id()))?;
        if let Some(expected) = expected_version {
            if stored.version() != expected {
                return Ok(PersistResult::Conflict);
            }
        }

        let entries = history.entry(request.id()).or_default();
        let last_cursor = entries.iter().map(|e| e.cursor).max().unwrap_or(0);
        if entry.cursor <= last_cursor {
            return Err(LifecycleError::Conflict(format!("cursor {} not greater than current {}",
                                                        entry.cursor, last_cursor)));
        }

        entries.push(entry.clone());
        *stored = request.clone();
        Ok(PersistResult::Ok { new_version: request.version() })
    }

    fn read_history(&self, request_id: &Uuid) -> Result<Vec<HistoryEntry>> {
        let mut entries = lock(&self.history)?.get(request_id).cloned().unwrap_or_default();
        entries.sort_by(HistoryEntry::newest_first);
        Ok(entries)
    }

    fn count_history(&self, request_id: &Uuid) -> Result<i64> {
        Ok(lock(&self.history)?.get(request_id).map_or(0, |v| v.len() as i64))
    }

    fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>> {
        let mut found: Vec<Request> = lock(&self.requests)?.values()
                                                           .filter(|r| filter.matches(r))
                                                           .cloned()
                                                           .collect();
        found.sort_by(|a, b| b.registered_at().cmp(&a.registered_at()));
        Ok(found)
    }
}

/// Catálogo de referencia en memoria.
pub struct InMemoryReferenceCatalog {
    states: Vec<State>,
    request_types: Vec<RequestType>,
    channels: Vec<Channel>,
}

impl InMemoryReferenceCatalog {
    pub fn new(states: Vec<State>, request_types: Vec<RequestType>, channels: Vec<Channel>) -> Self {
        Self { states, request_types, channels }
    }

    /// Catálogo con los vocabularios por defecto.
    pub fn seeded() -> Self {
        Self::new(default_states().to_vec(),
                  default_request_types().to_vec(),
                  default_channels().to_vec())
    }
}

impl ReferenceCatalog for InMemoryReferenceCatalog {
    fn state(&self, code: StateCode) -> Result<Option<State>> {
        Ok(self.states.iter().find(|s| s.code == code).cloned())
    }

    fn list_states(&self) -> Result<Vec<State>> {
        let mut states = self.states.clone();
        states.sort_by_key(|s| s.display_order);
        Ok(states)
    }

    fn request_type(&self, id: i64) -> Result<Option<RequestType>> {
        Ok(self.request_types.iter().find(|t| t.id == id).cloned())
    }

    fn list_request_types(&self) -> Result<Vec<RequestType>> {
        Ok(self.request_types.clone())
    }

    fn channel(&self, id: i64) -> Result<Option<Channel>> {
        Ok(self.channels.iter().find(|c| c.id == id).cloned())
    }

    fn list_channels(&self) -> Result<Vec<Channel>> {
        Ok(self.channels.clone())
    }
}

/// Directorio de usuarios en memoria.
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<i64, User>>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self { users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()) }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn user(&self, id: i64) -> Result<Option<User>> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    fn list_active_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = lock(&self.users)?.values().filter(|u| u.active).cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }
}
