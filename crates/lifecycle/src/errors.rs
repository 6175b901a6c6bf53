// Archivo: errors.rs
// Propósito: definir los errores del motor de ciclo de vida, su categoría
// (para que capas externas decidan cómo reportarlos) y el alias Result<T>
// usado por las APIs del crate.
use request_domain::{DomainError, TransitionError};
use std::fmt;
use thiserror::Error;

/// Entidad que no pudo resolverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
  Request,
  RequestType,
  Channel,
  User,
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
               EntityKind::Request => "Request",
               EntityKind::RequestType => "Request type",
               EntityKind::Channel => "Channel",
               EntityKind::User => "User",
             })
  }
}

/// Categoría gruesa de un error, pensada para mapear a respuestas externas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
  NotFound,
  BadInput,
  Conflict,
  Internal,
}

/// Errores del motor de ciclo de vida.
///
/// - `NotFound`: la solicitud o una entidad referenciada no existe.
/// - `InvalidStateTransition`: la acción no aplica al estado actual.
/// - `InvalidInput`: datos inválidos (observación vacía, responsable
///   inactivo, código desconocido).
/// - `Conflict`: otra transición avanzó la solicitud primero.
/// - `ReferenceData`: falta un estado fijo en el catálogo.
/// - `Storage`: error del almacenamiento subyacente.
#[derive(Error, Debug)]
pub enum LifecycleError {
  #[error("{entity} not found: {id}")]
  NotFound { entity: EntityKind, id: String },
  #[error(transparent)]
  InvalidStateTransition(#[from] TransitionError),
  #[error("{0}")]
  InvalidInput(String),
  #[error("Conflicto: {0}")]
  Conflict(String),
  #[error("Datos de referencia incompletos: {0}")]
  ReferenceData(String),
  #[error("Error de almacenamiento: {0}")]
  Storage(String),
}

impl LifecycleError {
  pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
    LifecycleError::NotFound { entity, id: id.to_string() }
  }

  /// Una solicitud inexistente es `NotFound`; un id referenciado que no
  /// resuelve es un error del llamador (`BadInput`).
  pub fn category(&self) -> ErrorCategory {
    match self {
      LifecycleError::NotFound { entity: EntityKind::Request, .. } => ErrorCategory::NotFound,
      LifecycleError::NotFound { .. } | LifecycleError::InvalidInput(_) => ErrorCategory::BadInput,
      LifecycleError::InvalidStateTransition(_) | LifecycleError::Conflict(_) => ErrorCategory::Conflict,
      LifecycleError::ReferenceData(_) | LifecycleError::Storage(_) => ErrorCategory::Internal,
    }
  }
}

impl From<DomainError> for LifecycleError {
  fn from(e: DomainError) -> Self {
    LifecycleError::InvalidInput(e.to_string())
  }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, LifecycleError>;
