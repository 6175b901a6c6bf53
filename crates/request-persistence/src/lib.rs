//! Persistencia Diesel para el ciclo de vida de solicitudes.
//! Este crate expone el módulo `schema`, la configuración leída del entorno
//! y el repositorio Diesel que implementa los puertos del motor
//! (`RequestRepository`, `ReferenceCatalog`, `UserDirectory`). La
//! implementación detallada está en `request_persistence.rs`.

mod config;
mod request_persistence;
pub mod schema;

pub use config::{PersistenceConfig, DEFAULT_POOL_SIZE, DEFAULT_SQLITE_URL};
pub use request_persistence::{new_from_env, DieselRequestRepository, MIGRATIONS};
