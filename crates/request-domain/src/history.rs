// history.rs
use crate::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Código de acción registrado en el historial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
  Registered,
  Classified,
  Assigned,
  Attended,
  Closed,
}

impl HistoryAction {
  pub fn as_str(&self) -> &'static str {
    match self {
      HistoryAction::Registered => "REGISTERED",
      HistoryAction::Classified => "CLASSIFIED",
      HistoryAction::Assigned => "ASSIGNED",
      HistoryAction::Attended => "ATTENDED",
      HistoryAction::Closed => "CLOSED",
    }
  }
}

impl fmt::Display for HistoryAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for HistoryAction {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_uppercase().as_str() {
      "REGISTERED" => Ok(HistoryAction::Registered),
      "CLASSIFIED" => Ok(HistoryAction::Classified),
      "ASSIGNED" => Ok(HistoryAction::Assigned),
      "ATTENDED" => Ok(HistoryAction::Attended),
      "CLOSED" => Ok(HistoryAction::Closed),
      _ => Err(DomainError::unknown("acción de historial", s)),
    }
  }
}

/// Registro inmutable de una transición.
///
/// `cursor` es la posición (1-based) dentro del historial de la solicitud y
/// desempata entradas con el mismo `occurred_at`. Las observaciones en blanco
/// se guardan como `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
  pub id: Uuid,
  pub request_id: Uuid,
  pub cursor: i64,
  pub occurred_at: DateTime<Utc>,
  pub action: HistoryAction,
  pub user_id: i64,
  pub observations: Option<String>,
}

impl HistoryEntry {
  pub fn new(request_id: Uuid,
             cursor: i64,
             occurred_at: DateTime<Utc>,
             action: HistoryAction,
             user_id: i64,
             observations: Option<&str>)
             -> Self {
    let observations = observations.filter(|o| !o.trim().is_empty()).map(str::to_string);
    Self { id: Uuid::new_v4(),
           request_id,
           cursor,
           occurred_at,
           action,
           user_id,
           observations }
  }

  /// Orden de listado: más reciente primero, `cursor` como desempate.
  pub fn newest_first(a: &HistoryEntry, b: &HistoryEntry) -> Ordering {
    b.occurred_at.cmp(&a.occurred_at).then_with(|| b.cursor.cmp(&a.cursor))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn blank_observations_are_dropped() {
    let e = HistoryEntry::new(Uuid::new_v4(), 1, Utc::now(), HistoryAction::Attended, 1, Some("   "));
    assert_eq!(e.observations, None);
  }

  #[test]
  fn newest_first_uses_cursor_on_ties() {
    let rid = Uuid::new_v4();
    let t = Utc::now();
    let a = HistoryEntry::new(rid, 1, t, HistoryAction::Registered, 1, None);
    let b = HistoryEntry::new(rid, 2, t, HistoryAction::Classified, 1, None);
    let c = HistoryEntry::new(rid, 3, t - Duration::seconds(5), HistoryAction::Assigned, 1, None);
    let mut v = vec![a.clone(), c.clone(), b.clone()];
    v.sort_by(HistoryEntry::newest_first);
    assert_eq!(v, vec![b, a, c]);
  }
}
