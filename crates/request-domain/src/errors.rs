// errors.rs
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  /// Código de vocabulario desconocido (estado, prioridad, acción).
  #[error("Código desconocido para {kind}: {code}")]
  UnknownCode { kind: &'static str, code: String },
}

impl DomainError {
  pub(crate) fn unknown(kind: &'static str, code: &str) -> Self {
    Self::UnknownCode { kind, code: code.to_string() }
  }
}
