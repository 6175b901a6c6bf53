// config.rs
//
// Configuración de la persistencia leída del entorno (con `.env` opcional vía
// dotenvy).
use lifecycle::{LifecycleEngineConfig, LifecycleError};

pub const DEFAULT_SQLITE_URL: &str = "requestflow.db";
pub const DEFAULT_POOL_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
  pub database_url: String,
  pub pool_size: u32,
  pub optimistic_locking: bool,
}

impl PersistenceConfig {
  pub fn new(database_url: &str) -> Self {
    Self { database_url: database_url.to_string(),
           pool_size: DEFAULT_POOL_SIZE,
           optimistic_locking: true }
  }

  /// Lee `REQUESTS_DB_URL` (o `DATABASE_URL`), `REQUESTS_DB_POOL_SIZE` y
  /// `REQUESTS_OPTIMISTIC_LOCKING`.
  ///
  /// Sin la feature `pg` la URL cae a `requestflow.db`; con `pg` es
  /// obligatoria y debe parecer una URL de Postgres.
  pub fn from_env() -> Result<Self, LifecycleError> {
    dotenvy::dotenv().ok();
    let url = std::env::var("REQUESTS_DB_URL").or_else(|_| std::env::var("DATABASE_URL")).ok();
    let database_url = resolve_url(url)?;

    let pool_size = match std::env::var("REQUESTS_DB_POOL_SIZE") {
      Ok(raw) => raw.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| LifecycleError::InvalidInput(format!("REQUESTS_DB_POOL_SIZE inválido: {}", raw)))?,
      Err(_) => DEFAULT_POOL_SIZE,
    };

    let optimistic_locking = match std::env::var("REQUESTS_OPTIMISTIC_LOCKING") {
      Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                                   LifecycleError::InvalidInput(format!("REQUESTS_OPTIMISTIC_LOCKING inválido: {}", raw))
                                 })?,
      Err(_) => true,
    };

    Ok(Self { database_url, pool_size, optimistic_locking })
  }

  pub fn engine_config(&self) -> LifecycleEngineConfig {
    LifecycleEngineConfig { optimistic_locking: self.optimistic_locking }
  }
}

#[cfg(feature = "pg")]
fn resolve_url(url: Option<String>) -> Result<String, LifecycleError> {
  let url =
    url.ok_or_else(|| LifecycleError::Storage("REQUESTS_DB_URL / DATABASE_URL not set".into()))?;
  let l = url.to_lowercase();
  if !(l.starts_with("postgres") || url.contains('@')) {
    return Err(LifecycleError::Storage("REQUESTS_DB_URL / DATABASE_URL does not look like Postgres URL".into()));
  }
  Ok(url)
}

#[cfg(not(feature = "pg"))]
fn resolve_url(url: Option<String>) -> Result<String, LifecycleError> {
  let url = url.unwrap_or_else(|| DEFAULT_SQLITE_URL.into());
  if url.to_lowercase().starts_with("postgres") {
    return Err(LifecycleError::Storage("request-persistence was compiled without 'pg' feature; enable the 'pg' \
                                        feature to use Postgres"
                                                                .into()));
  }
  Ok(url)
}

fn parse_flag(raw: &str) -> Option<bool> {
  match raw.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_accept_common_spellings() {
    assert_eq!(parse_flag("TRUE"), Some(true));
    assert_eq!(parse_flag(" off "), Some(false));
    assert_eq!(parse_flag("quizás"), None);
  }

  #[cfg(not(feature = "pg"))]
  #[test]
  fn sqlite_url_defaults_to_local_file() {
    assert_eq!(resolve_url(None).unwrap(), DEFAULT_SQLITE_URL);
    assert!(resolve_url(Some("postgres://u@h/db".into())).is_err());
  }
}
