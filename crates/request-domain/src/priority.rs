// priority.rs
use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
  Low,
  Medium,
  High,
}

impl Priority {
  pub fn as_str(&self) -> &'static str {
    match self {
      Priority::Low => "LOW",
      Priority::Medium => "MEDIUM",
      Priority::High => "HIGH",
    }
  }
}

impl fmt::Display for Priority {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Priority {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_uppercase().as_str() {
      "LOW" => Ok(Priority::Low),
      "MEDIUM" => Ok(Priority::Medium),
      "HIGH" => Ok(Priority::High),
      _ => Err(DomainError::ValidationError(format!("Invalid priority: {}. Must be LOW, MEDIUM, or HIGH", s))),
    }
  }
}

/// Sugerencia de prioridad por código de tipo de solicitud. Es sólo un
/// consejo: ninguna transición la invoca por sí sola.
pub fn suggest_priority_by_request_type(request_type_code: Option<&str>) -> Priority {
  match request_type_code.map(|c| c.trim().to_uppercase()).as_deref() {
    Some("HOMOLOG") | Some("CUPOS") => Priority::High,
    Some("CONSULTA") => Priority::Low,
    _ => Priority::Medium,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn suggestion_table() {
    assert_eq!(suggest_priority_by_request_type(Some("HOMOLOG")), Priority::High);
    assert_eq!(suggest_priority_by_request_type(Some("CUPOS")), Priority::High);
    assert_eq!(suggest_priority_by_request_type(Some("consulta")), Priority::Low);
    assert_eq!(suggest_priority_by_request_type(Some("REG_ASIG")), Priority::Medium);
    assert_eq!(suggest_priority_by_request_type(Some("NOPE")), Priority::Medium);
    assert_eq!(suggest_priority_by_request_type(None), Priority::Medium);
  }

  #[test]
  fn parse_rejects_unknown_priority() {
    assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
    let err = "URGENT".parse::<Priority>().unwrap_err();
    assert!(err.to_string().contains("Must be LOW, MEDIUM, or HIGH"));
  }
}
