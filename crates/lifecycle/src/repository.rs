// Archivo: repository.rs
// Propósito: definir los puertos que el motor consume: el repositorio de
// solicitudes (con su historial), el catálogo de referencia y el directorio
// de usuarios. Describe el contrato que deben implementar las persistencias
// (Diesel, in-memory, etc.).
use crate::domain::{PersistResult, RequestFilter};
use crate::errors::Result;
use request_domain::{Channel, HistoryEntry, Request, RequestType, State, StateCode, User};
use uuid::Uuid;

/// Contrato del repositorio de solicitudes y de su historial.
///
/// El historial es sólo de inserción: el contrato no expone ninguna forma de
/// modificar o borrar entradas. Toda escritura de una solicitud viaja junto a
/// exactamente una entrada de historial y debe ser atómica.
pub trait RequestRepository: Send + Sync {
    /// Obtiene la solicitud, `None` si no existe.
    fn get_request(&self, id: &Uuid) -> Result<Option<Request>>;

    /// Inserta una solicitud nueva junto con su entrada REGISTERED en una
    /// única unidad atómica.
    fn insert_request(&self, request: &Request, entry: &HistoryEntry) -> Result<()>;

    /// Guarda el nuevo estado de la solicitud y agrega `entry` en una única
    /// unidad atómica. Con `expected_version` presente, la escritura sólo
    /// procede si la versión almacenada coincide; en otro caso devuelve
    /// `PersistResult::Conflict` sin escribir nada.
    fn apply_transition(&self,
                        request: &Request,
                        expected_version: Option<i64>,
                        entry: &HistoryEntry)
                        -> Result<PersistResult>;

    /// Historial de la solicitud, más reciente primero (`cursor` desempata).
    fn read_history(&self, request_id: &Uuid) -> Result<Vec<HistoryEntry>>;

    /// Número de entradas de historial: el `cursor` de la siguiente entrada
    /// es este valor más uno.
    fn count_history(&self, request_id: &Uuid) -> Result<i64>;

    /// Solicitudes que cumplen `filter`, por fecha de registro descendente.
    fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>>;
}

/// Vocabularios fijos. El motor sólo los lee.
pub trait ReferenceCatalog: Send + Sync {
    fn state(&self, code: StateCode) -> Result<Option<State>>;

    /// Estados por orden de presentación ascendente.
    fn list_states(&self) -> Result<Vec<State>>;

    fn request_type(&self, id: i64) -> Result<Option<RequestType>>;

    fn list_request_types(&self) -> Result<Vec<RequestType>>;

    fn channel(&self, id: i64) -> Result<Option<Channel>>;

    fn list_channels(&self) -> Result<Vec<Channel>>;
}

/// Directorio de usuarios: identidad y bandera de actividad.
pub trait UserDirectory: Send + Sync {
    fn user(&self, id: i64) -> Result<Option<User>>;

    fn list_active_users(&self) -> Result<Vec<User>>;
}
