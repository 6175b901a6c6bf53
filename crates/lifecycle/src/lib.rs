//! Crate `lifecycle` — motor del ciclo de vida de solicitudes
//!
//! Este crate define los puertos que el motor consume (`RequestRepository`,
//! `ReferenceCatalog`, `UserDirectory`), el motor `LifecycleEngine` con sus
//! cinco transiciones guardadas, la fachada `RequestService` y adaptadores
//! en memoria útiles para pruebas.
//!
//! Diseño resumido:
//! - Máquina de estados lineal: REGISTRADA → CLASIFICADA → EN_ATENCION →
//!   ATENDIDA → CERRADA. CERRADA es terminal.
//! - Historial inmutable: cada transición exitosa agrega exactamente una
//!   entrada, en la misma unidad atómica que la mutación de la solicitud.
//! - Locking optimista: el commit lleva la versión leída
//!   (`PersistResult::Conflict` si otra transición llegó antes).
//!
//! Ejemplo rápido:
//! ```rust
//! use lifecycle::{InMemoryReferenceCatalog, InMemoryRequestRepository, InMemoryUserDirectory};
//! use lifecycle::{LifecycleEngineConfig, RequestService};
//! use request_domain::DomainStubs;
//! use std::sync::Arc;
//! let service = RequestService::new(Arc::new(InMemoryRequestRepository::new()),
//!                                   Arc::new(InMemoryReferenceCatalog::seeded()),
//!                                   Arc::new(InMemoryUserDirectory::new(DomainStubs::sample_users())),
//!                                   LifecycleEngineConfig::default());
//! let request = service.create("Solicitud de cupo", 4, 1, 1, None).unwrap();
//! assert_eq!(service.history(&request.id()).unwrap().len(), 1);
//! ```
pub mod domain;
pub mod engine;
pub mod errors;
pub mod repository;
pub mod service;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use repository::*;
pub use service::*;
pub use stubs::*;
