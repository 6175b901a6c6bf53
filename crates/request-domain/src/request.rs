// request.rs
use crate::priority::Priority;
use crate::state::{check_transition, LifecycleAction, StateCode, TransitionError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Agregado de la solicitud.
///
/// Los campos son privados: el estado sólo avanza mediante `classify`,
/// `assign`, `attend` y `close`, que validan la transición contra la tabla de
/// `LifecycleAction` antes de tocar nada. Cada transición exitosa refresca
/// `updated_at` e incrementa `version`. Se serializa para mostrarlo, pero
/// sólo se reconstruye con `from_parts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request {
  id: Uuid,
  description: String,
  registered_at: DateTime<Utc>,
  state: StateCode,
  request_type_id: i64,
  channel_id: i64,
  priority: Option<Priority>,
  priority_justification: Option<String>,
  requested_by_id: i64,
  assigned_to_id: Option<i64>,
  closure_observation: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
  version: i64,
}

/// Representación plana usada por las persistencias para rehidratar el
/// agregado tal como fue guardado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParts {
  pub id: Uuid,
  pub description: String,
  pub registered_at: DateTime<Utc>,
  pub state: StateCode,
  pub request_type_id: i64,
  pub channel_id: i64,
  pub priority: Option<Priority>,
  pub priority_justification: Option<String>,
  pub requested_by_id: i64,
  pub assigned_to_id: Option<i64>,
  pub closure_observation: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub version: i64,
}

impl Request {
  /// Nueva solicitud en REGISTRADA. `registered_at` cae a `now` si no viene.
  pub fn register(description: &str,
                  request_type_id: i64,
                  channel_id: i64,
                  requested_by_id: i64,
                  registered_at: Option<DateTime<Utc>>,
                  now: DateTime<Utc>)
                  -> Self {
    Self { id: Uuid::new_v4(),
           description: description.to_string(),
           registered_at: registered_at.unwrap_or(now),
           state: StateCode::Registrada,
           request_type_id,
           channel_id,
           priority: None,
           priority_justification: None,
           requested_by_id,
           assigned_to_id: None,
           closure_observation: None,
           created_at: now,
           updated_at: now,
           version: 0 }
  }

  pub fn from_parts(parts: RequestParts) -> Self {
    Self { id: parts.id,
           description: parts.description,
           registered_at: parts.registered_at,
           state: parts.state,
           request_type_id: parts.request_type_id,
           channel_id: parts.channel_id,
           priority: parts.priority,
           priority_justification: parts.priority_justification,
           requested_by_id: parts.requested_by_id,
           assigned_to_id: parts.assigned_to_id,
           closure_observation: parts.closure_observation,
           created_at: parts.created_at,
           updated_at: parts.updated_at,
           version: parts.version }
  }

  fn advance(&mut self, action: LifecycleAction, at: DateTime<Utc>) -> Result<(), TransitionError> {
    self.state = check_transition(self.state, action)?;
    self.updated_at = at;
    self.version += 1;
    Ok(())
  }

  /// REGISTRADA → CLASIFICADA. La justificación ausente queda como `""`.
  pub fn classify(&mut self,
                  request_type_id: i64,
                  priority: Priority,
                  justification: Option<&str>,
                  at: DateTime<Utc>)
                  -> Result<(), TransitionError> {
    self.advance(LifecycleAction::Classify, at)?;
    self.request_type_id = request_type_id;
    self.priority = Some(priority);
    self.priority_justification = Some(justification.unwrap_or_default().to_string());
    Ok(())
  }

  /// CLASIFICADA → EN_ATENCION.
  pub fn assign(&mut self, assignee_id: i64, at: DateTime<Utc>) -> Result<(), TransitionError> {
    self.advance(LifecycleAction::Assign, at)?;
    self.assigned_to_id = Some(assignee_id);
    Ok(())
  }

  /// EN_ATENCION → ATENDIDA.
  pub fn attend(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
    self.advance(LifecycleAction::Attend, at)
  }

  /// ATENDIDA → CERRADA. La validación de texto en blanco la hace el motor
  /// antes de llegar aquí.
  pub fn close(&mut self, closure_observation: &str, at: DateTime<Utc>) -> Result<(), TransitionError> {
    self.advance(LifecycleAction::Close, at)?;
    self.closure_observation = Some(closure_observation.to_string());
    Ok(())
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn description(&self) -> &str {
    &self.description
  }

  pub fn registered_at(&self) -> DateTime<Utc> {
    self.registered_at
  }

  pub fn state(&self) -> StateCode {
    self.state
  }

  pub fn is_closed(&self) -> bool {
    self.state.is_terminal()
  }

  pub fn request_type_id(&self) -> i64 {
    self.request_type_id
  }

  pub fn channel_id(&self) -> i64 {
    self.channel_id
  }

  pub fn priority(&self) -> Option<Priority> {
    self.priority
  }

  pub fn priority_justification(&self) -> Option<&str> {
    self.priority_justification.as_deref()
  }

  pub fn requested_by_id(&self) -> i64 {
    self.requested_by_id
  }

  pub fn assigned_to_id(&self) -> Option<i64> {
    self.assigned_to_id
  }

  pub fn closure_observation(&self) -> Option<&str> {
    self.closure_observation.as_deref()
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn updated_at(&self) -> DateTime<Utc> {
    self.updated_at
  }

  pub fn version(&self) -> i64 {
    self.version
  }
}

impl fmt::Display for Request {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f,
           "Request({} [{}] priority={} description={:?})",
           self.id,
           self.state,
           self.priority.map(|p| p.as_str()).unwrap_or("-"),
           self.description)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  #[test]
  fn register_defaults_registered_at_to_now() {
    let now = Utc::now();
    let r = Request::register("desc", 1, 1, 7, None, now);
    assert_eq!(r.state(), StateCode::Registrada);
    assert_eq!(r.registered_at(), now);
    assert_eq!(r.version(), 0);
    let earlier = now - Duration::days(2);
    let r = Request::register("desc", 1, 1, 7, Some(earlier), now);
    assert_eq!(r.registered_at(), earlier);
    assert_eq!(r.created_at(), now);
  }

  #[test]
  fn rejected_transition_leaves_aggregate_untouched() {
    let now = Utc::now();
    let mut r = Request::register("desc", 1, 1, 7, None, now);
    let before = r.clone();
    assert!(r.close("obs", now + Duration::seconds(1)).is_err());
    assert_eq!(r, before);
  }

  #[test]
  fn from_parts_rebuilds_the_stored_aggregate() {
    let now = Utc::now();
    let mut r = Request::register("desc", 1, 2, 7, None, now);
    r.classify(3, Priority::High, Some("urgente"), now).unwrap();
    r.assign(9, now).unwrap();
    let rebuilt = Request::from_parts(RequestParts { id: r.id(),
                                                     description: r.description().to_string(),
                                                     registered_at: r.registered_at(),
                                                     state: r.state(),
                                                     request_type_id: r.request_type_id(),
                                                     channel_id: r.channel_id(),
                                                     priority: r.priority(),
                                                     priority_justification: Some("urgente".into()),
                                                     requested_by_id: r.requested_by_id(),
                                                     assigned_to_id: r.assigned_to_id(),
                                                     closure_observation: None,
                                                     created_at: r.created_at(),
                                                     updated_at: r.updated_at(),
                                                     version: r.version() });
    assert_eq!(rebuilt, r);
    // la rehidratación no salta la tabla de transiciones
    let mut rebuilt = rebuilt;
    assert!(rebuilt.close("obs", now).is_err());
    assert_eq!(rebuilt.state(), StateCode::EnAtencion);
  }

  #[test]
  fn classify_stores_empty_justification_when_absent() {
    let now = Utc::now();
    let mut r = Request::register("desc", 1, 1, 7, None, now);
    r.classify(2, Priority::Low, None, now).unwrap();
    assert_eq!(r.priority_justification(), Some(""));
    assert_eq!(r.request_type_id(), 2);
    assert_eq!(r.version(), 1);
  }
}
