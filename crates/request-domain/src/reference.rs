// reference.rs
//
// Vocabularios de referencia (tipos de solicitud, canales, estados) y el
// usuario. El motor del ciclo de vida sólo los lee.
use crate::state::{State, StateCode};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestType {
  pub id: i64,
  pub code: String,
  pub name: String,
  pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
  pub id: i64,
  pub code: String,
  pub name: String,
}

/// Actor del sistema: solicitante, responsable o quien ejecuta una acción.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id: i64,
  pub identifier: String,
  pub name: String,
  pub active: bool,
  pub role: Option<String>,
}

impl User {
  pub fn new(id: i64, identifier: &str, name: &str, active: bool) -> Self {
    Self { id, identifier: identifier.to_string(), name: name.to_string(), active, role: None }
  }

  pub fn with_role(mut self, role: &str) -> Self {
    self.role = Some(role.to_string());
    self
  }
}

static DEFAULT_STATES: Lazy<Vec<State>> = Lazy::new(|| {
  StateCode::ORDER.iter()
                  .map(|code| {
                    let name = match code {
                      StateCode::Registrada => "Registrada",
                      StateCode::Clasificada => "Clasificada",
                      StateCode::EnAtencion => "En atención",
                      StateCode::Atendida => "Atendida",
                      StateCode::Cerrada => "Cerrada",
                    };
                    State { code: *code, name: name.to_string(), display_order: code.display_order() }
                  })
                  .collect()
});

static DEFAULT_CHANNELS: Lazy<Vec<Channel>> = Lazy::new(|| {
  [("CSU", "Centro de Servicios Universitarios"),
   ("EMAIL", "Correo electrónico"),
   ("SAC", "Sistema de Atención al Ciudadano"),
   ("PRESENCIAL", "Presencial")].iter()
                                .enumerate()
                                .map(|(i, (code, name))| Channel { id: i as i64 + 1,
                                                                   code: code.to_string(),
                                                                   name: name.to_string() })
                                .collect()
});

static DEFAULT_REQUEST_TYPES: Lazy<Vec<RequestType>> = Lazy::new(|| {
  [("REG_ASIG", "Registro / Asignatura", "Trámites de registro o asignaturas"),
   ("HOMOLOG", "Homologación", "Homologación de materias"),
   ("CANCEL", "Cancelación de asignaturas", "Cancelación o retiro de asignaturas"),
   ("CUPOS", "Solicitud de cupos", "Solicitud de cupos en asignaturas"),
   ("CONSULTA", "Consulta académica", "Consultas generales")].iter()
                                                              .enumerate()
                                                              .map(|(i, (code, name, desc))| RequestType {
                                                                id: i as i64 + 1,
                                                                code: code.to_string(),
                                                                name: name.to_string(),
                                                                description: Some(desc.to_string()),
                                                              })
                                                              .collect()
});

/// Los cinco estados fijos en orden de presentación.
pub fn default_states() -> &'static [State] {
  &DEFAULT_STATES
}

/// Canales por defecto con ids 1..=4.
pub fn default_channels() -> &'static [Channel] {
  &DEFAULT_CHANNELS
}

/// Tipos de solicitud por defecto con ids 1..=5.
pub fn default_request_types() -> &'static [RequestType] {
  &DEFAULT_REQUEST_TYPES
}
