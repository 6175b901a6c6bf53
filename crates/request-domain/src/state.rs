// state.rs
//
// Máquina de estados lineal de una solicitud expresada como datos: el orden
// total de los estados vive en `StateCode::ORDER` y cada acción del ciclo de
// vida declara su estado de partida y de llegada en `LifecycleAction`.
use crate::errors::DomainError;
use crate::history::HistoryAction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Código estable de un estado del ciclo de vida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateCode {
  Registrada,
  Clasificada,
  EnAtencion,
  Atendida,
  Cerrada,
}

impl StateCode {
  /// Orden canónico. Un estado sólo puede avanzar al siguiente de la lista.
  pub const ORDER: [StateCode; 5] =
    [StateCode::Registrada, StateCode::Clasificada, StateCode::EnAtencion, StateCode::Atendida, StateCode::Cerrada];

  pub fn as_str(&self) -> &'static str {
    match self {
      StateCode::Registrada => "REGISTRADA",
      StateCode::Clasificada => "CLASIFICADA",
      StateCode::EnAtencion => "EN_ATENCION",
      StateCode::Atendida => "ATENDIDA",
      StateCode::Cerrada => "CERRADA",
    }
  }

  fn position(&self) -> usize {
    Self::ORDER.iter().position(|s| s == self).unwrap_or(0)
  }

  /// Siguiente estado permitido, `None` para el estado terminal.
  pub fn next(&self) -> Option<StateCode> {
    Self::ORDER.get(self.position() + 1).copied()
  }

  pub fn is_terminal(&self) -> bool {
    self.next().is_none()
  }

  /// Orden de presentación (1-based) usado por el vocabulario por defecto.
  pub fn display_order(&self) -> i32 {
    self.position() as i32 + 1
  }
}

impl fmt::Display for StateCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StateCode {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_uppercase();
    Self::ORDER.iter()
               .find(|c| c.as_str() == normalized)
               .copied()
               .ok_or_else(|| DomainError::unknown("estado", s))
  }
}

/// Entidad de referencia de un estado: código, nombre visible y orden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
  pub code: StateCode,
  pub name: String,
  pub display_order: i32,
}

/// Acciones que mueven una solicitud un paso hacia adelante. La creación no
/// aparece aquí porque no tiene estado de partida.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
  Classify,
  Assign,
  Attend,
  Close,
}

impl LifecycleAction {
  pub const ALL: [LifecycleAction; 4] =
    [LifecycleAction::Classify, LifecycleAction::Assign, LifecycleAction::Attend, LifecycleAction::Close];

  /// Estado en el que debe estar la solicitud para aplicar la acción.
  pub fn precondition(&self) -> StateCode {
    match self {
      LifecycleAction::Classify => StateCode::Registrada,
      LifecycleAction::Assign => StateCode::Clasificada,
      LifecycleAction::Attend => StateCode::EnAtencion,
      LifecycleAction::Close => StateCode::Atendida,
    }
  }

  pub fn target(&self) -> StateCode {
    match self {
      LifecycleAction::Classify => StateCode::Clasificada,
      LifecycleAction::Assign => StateCode::EnAtencion,
      LifecycleAction::Attend => StateCode::Atendida,
      LifecycleAction::Close => StateCode::Cerrada,
    }
  }

  pub fn history_action(&self) -> HistoryAction {
    match self {
      LifecycleAction::Classify => HistoryAction::Classified,
      LifecycleAction::Assign => HistoryAction::Assigned,
      LifecycleAction::Attend => HistoryAction::Attended,
      LifecycleAction::Close => HistoryAction::Closed,
    }
  }

  pub fn verb(&self) -> &'static str {
    match self {
      LifecycleAction::Classify => "classify",
      LifecycleAction::Assign => "assign",
      LifecycleAction::Attend => "attend",
      LifecycleAction::Close => "close",
    }
  }
}

impl fmt::Display for LifecycleAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.verb())
  }
}

/// Transición rechazada. `Closed` se distingue del estado incorrecto genérico
/// porque CERRADA es terminal: la solicitud quedó congelada.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
  #[error("Request is closed and cannot be modified")]
  Closed,
  #[error("Cannot {action}: request is in state {current}, expected {expected}")]
  WrongState {
    action: LifecycleAction,
    current: StateCode,
    expected: StateCode,
  },
}

/// Falla con `Closed` si `current` es terminal.
pub fn ensure_not_terminal(current: StateCode) -> Result<(), TransitionError> {
  if current.is_terminal() {
    return Err(TransitionError::Closed);
  }
  Ok(())
}

/// Valida `action` contra `current` y devuelve el estado de llegada.
pub fn check_transition(current: StateCode, action: LifecycleAction) -> Result<StateCode, TransitionError> {
  ensure_not_terminal(current)?;
  let expected = action.precondition();
  if current != expected {
    return Err(TransitionError::WrongState { action, current, expected });
  }
  Ok(action.target())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn action_table_follows_the_linear_order() {
    for action in LifecycleAction::ALL {
      assert_eq!(action.precondition().next(), Some(action.target()), "{action}");
    }
    assert!(StateCode::Cerrada.is_terminal());
    assert_eq!(StateCode::Registrada.display_order(), 1);
    assert_eq!(StateCode::Cerrada.display_order(), 5);
  }

  #[test]
  fn codes_parse_case_insensitively() {
    assert_eq!("en_atencion".parse::<StateCode>().unwrap(), StateCode::EnAtencion);
    assert!("ABIERTA".parse::<StateCode>().is_err());
  }

  #[test]
  fn wrong_state_message_names_both_codes() {
    let err = check_transition(StateCode::Clasificada, LifecycleAction::Classify).unwrap_err();
    assert_eq!(err.to_string(), "Cannot classify: request is in state CLASIFICADA, expected REGISTRADA");
    let err = check_transition(StateCode::Cerrada, LifecycleAction::Attend).unwrap_err();
    assert_eq!(err, TransitionError::Closed);
  }
}
