use crate::config::PersistenceConfig;
use crate::schema;
use crate::schema::app_users::dsl as users_dsl;
use crate::schema::channels::dsl as channels_dsl;
use crate::schema::history_entries::dsl as history_dsl;
use crate::schema::request_types::dsl as types_dsl;
use crate::schema::requests::dsl as requests_dsl;
use crate::schema::states::dsl as states_dsl;
use chrono::{DateTime, Utc};
#[cfg(not(feature = "pg"))]
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use lifecycle::{LifecycleEngineConfig, LifecycleError, PersistResult, ReferenceCatalog, RequestFilter, RequestRepository,
                RequestService, Result, UserDirectory};
use log::{debug, info};
use request_domain::{Channel, HistoryEntry, Request, RequestParts, RequestType, State, StateCode, User};
use std::sync::Arc;
use uuid::Uuid;
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");
#[cfg(feature = "pg")]
type DbConn = PgConnection;
#[cfg(not(feature = "pg"))]
type DbConn = SqliteConnection;
type DbPool = Pool<ConnectionManager<DbConn>>;
/// Pragmas por conexión: cada conexión del pool espera en vez de fallar con
/// `database is locked` y valida claves foráneas.
#[cfg(not(feature = "pg"))]
#[derive(Debug)]
struct SqlitePragmas;
#[cfg(not(feature = "pg"))]
impl r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
        .map_err(diesel::r2d2::Error::QueryError)
  }
}
/// Repo Diesel que implementa `RequestRepository`, `ReferenceCatalog` y
/// `UserDirectory` sobre el mismo pool.
pub struct DieselRequestRepository {
  pool: Arc<DbPool>,
  engine_config: LifecycleEngineConfig,
}
impl DieselRequestRepository {
  /// Crea el pool y aplica las migraciones pendientes.
  pub fn new(config: &PersistenceConfig) -> Result<Self> {
    let manager = ConnectionManager::<DbConn>::new(&config.database_url);
    let builder = Pool::builder().max_size(config.pool_size);
    #[cfg(not(feature = "pg"))]
    let builder = builder.connection_customizer(Box::new(SqlitePragmas));
    let pool = builder.build(manager)
                      .map_err(|e| LifecycleError::Storage(format!("no se pudo crear el pool de conexiones: {}", e)))?;
    let repo = DieselRequestRepository { pool: Arc::new(pool), engine_config: config.engine_config() };
    let mut c = repo.conn()?;
    #[cfg(not(feature = "pg"))]
    map_db_err(c.batch_execute("PRAGMA journal_mode = WAL;"))?;
    let applied = c.run_pending_migrations(MIGRATIONS)
                   .map_err(|e| LifecycleError::Storage(format!("migrations: {}", e)))?;
    info!("persistencia lista en {} ({} migraciones aplicadas)", config.database_url, applied.len());
    Ok(repo)
  }
  /// Servicio completo sobre este repositorio, que actúa también como
  /// catálogo y directorio de usuarios. El locking optimista sale de la
  /// configuración con la que se abrió.
  pub fn into_service(self: Arc<Self>) -> RequestService<DieselRequestRepository> {
    let catalog: Arc<dyn ReferenceCatalog> = self.clone();
    let users: Arc<dyn UserDirectory> = self.clone();
    let engine_config = self.engine_config;
    RequestService::new(self, catalog, users, engine_config)
  }
  fn conn(&self) -> Result<PooledConnection<ConnectionManager<DbConn>>> {
    self.pool.get().map_err(|e| LifecycleError::Storage(format!("pool: {}", e)))
  }
  /// Alta de un tipo de solicitud. El código se guarda en mayúsculas.
  pub fn register_request_type(&self, request_type: &RequestType) -> Result<()> {
    let mut conn = self.conn()?;
    let row = RequestTypeRow { id: request_type.id,
                               code: request_type.code.trim().to_uppercase(),
                               name: request_type.name.clone(),
                               description: request_type.description.clone() };
    map_db_err(diesel::insert_into(schema::request_types::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  pub fn register_channel(&self, channel: &Channel) -> Result<()> {
    let mut conn = self.conn()?;
    let row = ChannelRow { id: channel.id,
                           code: channel.code.trim().to_uppercase(),
                           name: channel.name.clone() };
    map_db_err(diesel::insert_into(schema::channels::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  pub fn register_user(&self, user: &User) -> Result<()> {
    let mut conn = self.conn()?;
    let row = UserRow { id: user.id,
                        identifier: user.identifier.clone(),
                        name: user.name.clone(),
                        active: user.active,
                        role: user.role.clone() };
    map_db_err(diesel::insert_into(schema::app_users::table).values(&row).execute(&mut conn))?;
    Ok(())
  }
  /// Inserta los vocabularios y usuarios cuyo id aún no existe. Es
  /// idempotente: puede llamarse en cada arranque.
  pub fn seed_reference_data(&self, request_types: &[RequestType], channels: &[Channel], users: &[User]) -> Result<()> {
    for t in request_types {
      if ReferenceCatalog::request_type(self, t.id)?.is_none() {
        self.register_request_type(t)?;
      }
    }
    for c in channels {
      if ReferenceCatalog::channel(self, c.id)?.is_none() {
        self.register_channel(c)?;
      }
    }
    for u in users {
      if UserDirectory::user(self, u.id)?.is_none() {
        self.register_user(u)?;
      }
    }
    Ok(())
  }
}
#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = schema::requests)]
#[diesel(treat_none_as_null = true)]
struct RequestRow {
  pub id: String,
  pub description: String,
  pub registered_at_ts: i64,
  pub request_type_id: i64,
  pub channel_id: i64,
  pub state_code: String,
  pub priority: Option<String>,
  pub priority_justification: Option<String>,
  pub requested_by_id: i64,
  pub assigned_to_id: Option<i64>,
  pub closure_observation: Option<String>,
  pub created_at_ts: i64,
  pub updated_at_ts: i64,
  pub version: i64,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::history_entries)]
struct HistoryRow {
  pub id: String,
  pub request_id: String,
  pub cursor: i64,
  pub occurred_at_ts: i64,
  pub action: String,
  pub user_id: i64,
  pub observations: Option<String>,
}
#[derive(Debug, Queryable)]
struct StateRow {
  pub code: String,
  pub name: String,
  pub display_order: i32,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::request_types)]
struct RequestTypeRow {
  pub id: i64,
  pub code: String,
  pub name: String,
  pub description: Option<String>,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::channels)]
struct ChannelRow {
  pub id: i64,
  pub code: String,
  pub name: String,
}
#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::app_users)]
struct UserRow {
  pub id: i64,
  pub identifier: String,
  pub name: String,
  pub active: bool,
  pub role: Option<String>,
}
fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T> {
  res.map_err(|e| match e {
       DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
         LifecycleError::Conflict(format!("db: {}", info.message()))
       }
       other => LifecycleError::Storage(format!("db: {}", other)),
     })
}
fn corrupt(what: &str, detail: impl std::fmt::Display) -> LifecycleError {
  LifecycleError::Storage(format!("fila inválida ({}): {}", what, detail))
}
fn from_micros(us: i64) -> Result<DateTime<Utc>> {
  DateTime::<Utc>::from_timestamp_micros(us).ok_or_else(|| corrupt("timestamp", us))
}
fn parse_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|e| corrupt("uuid", e))
}
impl From<&Request> for RequestRow {
  fn from(r: &Request) -> Self {
    RequestRow { id: r.id().to_string(),
                 description: r.description().to_string(),
                 registered_at_ts: r.registered_at().timestamp_micros(),
                 request_type_id: r.request_type_id(),
                 channel_id: r.channel_id(),
                 state_code: r.state().as_str().to_string(),
                 priority: r.priority().map(|p| p.as_str().to_string()),
                 priority_justification: r.priority_justification().map(str::to_string),
                 requested_by_id: r.requested_by_id(),
                 assigned_to_id: r.assigned_to_id(),
                 closure_observation: r.closure_observation().map(str::to_string),
                 created_at_ts: r.created_at().timestamp_micros(),
                 updated_at_ts: r.updated_at().timestamp_micros(),
                 version: r.version() }
  }
}
impl RequestRow {
  fn into_request(self) -> Result<Request> {
    let priority = match self.priority {
      Some(p) => Some(p.parse().map_err(|e| corrupt("priority", e))?),
      None => None,
    };
    Ok(Request::from_parts(RequestParts { id: parse_uuid(&self.id)?,
                                          description: self.description,
                                          registered_at: from_micros(self.registered_at_ts)?,
                                          state: self.state_code.parse().map_err(|e| corrupt("state", e))?,
                                          request_type_id: self.request_type_id,
                                          channel_id: self.channel_id,
                                          priority,
                                          priority_justification: self.priority_justification,
                                          requested_by_id: self.requested_by_id,
                                          assigned_to_id: self.assigned_to_id,
                                          closure_observation: self.closure_observation,
                                          created_at: from_micros(self.created_at_ts)?,
                                          updated_at: from_micros(self.updated_at_ts)?,
                                          version: self.version }))
  }
}
impl From<&HistoryEntry> for HistoryRow {
  fn from(e: &HistoryEntry) -> Self {
    HistoryRow { id: e.id.to_string(),
                 request_id: e.request_id.to_string(),
                 cursor: e.cursor,
                 occurred_at_ts: e.occurred_at.timestamp_micros(),
                 action: e.action.as_str().to_string(),
                 user_id: e.user_id,
                 observations: e.observations.clone() }
  }
}
impl HistoryRow {
  fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry { id: parse_uuid(&self.id)?,
                      request_id: parse_uuid(&self.request_id)?,
                      cursor: self.cursor,
                      occurred_at: from_micros(self.occurred_at_ts)?,
                      action: self.action.parse().map_err(|e| corrupt("action", e))?,
                      user_id: self.user_id,
                      observations: self.observations })
  }
}
impl StateRow {
  fn into_state(self) -> Result<State> {
    Ok(State { code: self.code.parse().map_err(|e| corrupt("state", e))?,
               name: self.name,
               display_order: self.display_order })
  }
}
impl From<RequestTypeRow> for RequestType {
  fn from(r: RequestTypeRow) -> Self {
    RequestType { id: r.id, code: r.code, name: r.name, description: r.description }
  }
}
impl From<ChannelRow> for Channel {
  fn from(r: ChannelRow) -> Self {
    Channel { id: r.id, code: r.code, name: r.name }
  }
}
impl From<UserRow> for User {
  fn from(r: UserRow) -> Self {
    User { id: r.id, identifier: r.identifier, name: r.name, active: r.active, role: r.role }
  }
}
impl RequestRepository for DieselRequestRepository {
  fn get_request(&self, id: &Uuid) -> Result<Option<Request>> {
    let mut conn = self.conn()?;
    let opt = map_db_err(requests_dsl::requests.filter(requests_dsl::id.eq(id.to_string()))
                                               .first::<RequestRow>(&mut conn)
                                               .optional())?;
    opt.map(RequestRow::into_request).transpose()
  }
  fn insert_request(&self, request: &Request, entry: &HistoryEntry) -> Result<()> {
    let mut conn = self.conn()?;
    let row = RequestRow::from(request);
    let entry_row = HistoryRow::from(entry);
    map_db_err(conn.transaction::<(), DieselError, _>(|conn| {
                     diesel::insert_into(schema::requests::table).values(&row).execute(conn)?;
                     diesel::insert_into(schema::history_entries::table).values(&entry_row).execute(conn)?;
                     Ok(())
                   }))?;
    debug!("solicitud {} insertada", request.id());
    Ok(())
  }
  fn apply_transition(&self,
                      request: &Request,
                      expected_version: Option<i64>,
                      entry: &HistoryEntry)
                      -> Result<PersistResult> {
    let mut conn = self.conn()?;
    let row = RequestRow::from(request);
    let entry_row = HistoryRow::from(entry);
    // UPDATE con filtro de versión + INSERT del historial en la misma
    // transacción: 0 filas actualizadas significa que otro commit llegó antes.
    map_db_err(conn.transaction::<PersistResult, DieselError, _>(|conn| {
                     let target = requests_dsl::requests.filter(requests_dsl::id.eq(&row.id));
                     let updated = match expected_version {
                       Some(v) => diesel::update(target.filter(requests_dsl::version.eq(v))).set(&row)
                                                                                          .execute(conn)?,
                       None => diesel::update(target).set(&row).execute(conn)?,
                     };
                     if updated == 0 {
                       return Ok(PersistResult::Conflict);
                     }
                     diesel::insert_into(schema::history_entries::table).values(&entry_row).execute(conn)?;
                     Ok(PersistResult::Ok { new_version: row.version })
                   }))
  }
  fn read_history(&self, request_id: &Uuid) -> Result<Vec<HistoryEntry>> {
    let mut conn = self.conn()?;
    let rows = map_db_err(history_dsl::history_entries.filter(history_dsl::request_id.eq(request_id.to_string()))
                                                      .order((history_dsl::occurred_at_ts.desc(),
                                                              history_dsl::cursor.desc()))
                                                      .load::<HistoryRow>(&mut conn))?;
    rows.into_iter().map(HistoryRow::into_entry).collect()
  }
  fn count_history(&self, request_id: &Uuid) -> Result<i64> {
    let mut conn = self.conn()?;
    map_db_err(history_dsl::history_entries.filter(history_dsl::request_id.eq(request_id.to_string()))
                                           .count()
                                           .get_result::<i64>(&mut conn))
  }
  fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>> {
    let mut conn = self.conn()?;
    let mut query = requests_dsl::requests.into_boxed();
    if let Some(state) = filter.state {
      query = query.filter(requests_dsl::state_code.eq(state.as_str()));
    }
    if let Some(type_id) = filter.request_type_id {
      query = query.filter(requests_dsl::request_type_id.eq(type_id));
    }
    if let Some(priority) = filter.priority {
      query = query.filter(requests_dsl::priority.eq(priority.as_str()));
    }
    if let Some(user_id) = filter.assigned_to_id {
      query = query.filter(requests_dsl::assigned_to_id.eq(user_id));
    }
    if let Some(user_id) = filter.requested_by_id {
      query = query.filter(requests_dsl::requested_by_id.eq(user_id));
    }
    let rows = map_db_err(query.order(requests_dsl::registered_at_ts.desc()).load::<RequestRow>(&mut conn))?;
    debug!("list_requests: {} filas", rows.len());
    rows.into_iter().map(RequestRow::into_request).collect()
  }
}
impl ReferenceCatalog for DieselRequestRepository {
  fn state(&self, code: StateCode) -> Result<Option<State>> {
    let mut conn = self.conn()?;
    let opt = map_db_err(states_dsl::states.filter(states_dsl::code.eq(code.as_str()))
                                           .first::<StateRow>(&mut conn)
                                           .optional())?;
    opt.map(StateRow::into_state).transpose()
  }
  fn list_states(&self) -> Result<Vec<State>> {
    let mut conn = self.conn()?;
    let rows = map_db_err(states_dsl::states.order(states_dsl::display_order.asc()).load::<StateRow>(&mut conn))?;
    rows.into_iter().map(StateRow::into_state).collect()
  }
  fn request_type(&self, id: i64) -> Result<Option<RequestType>> {
    let mut conn = self.conn()?;
    let opt = map_db_err(types_dsl::request_types.filter(types_dsl::id.eq(id))
                                                 .first::<RequestTypeRow>(&mut conn)
                                                 .optional())?;
    Ok(opt.map(RequestType::from))
  }
  fn list_request_types(&self) -> Result<Vec<RequestType>> {
    let mut conn = self.conn()?;
    let rows = map_db_err(types_dsl::request_types.order(types_dsl::id.asc()).load::<RequestTypeRow>(&mut conn))?;
    Ok(rows.into_iter().map(RequestType::from).collect())
  }
  fn channel(&self, id: i64) -> Result<Option<Channel>> {
    let mut conn = self.conn()?;
    let opt = map_db_err(channels_dsl::channels.filter(channels_dsl::id.eq(id))
                                               .first::<ChannelRow>(&mut conn)
                                               .optional())?;
    Ok(opt.map(Channel::from))
  }
  fn list_channels(&self) -> Result<Vec<Channel>> {
    let mut conn = self.conn()?;
    let rows = map_db_err(channels_dsl::channels.order(channels_dsl::id.asc()).load::<ChannelRow>(&mut conn))?;
    Ok(rows.into_iter().map(Channel::from).collect())
  }
}
impl UserDirectory for DieselRequestRepository {
  fn user(&self, id: i64) -> Result<Option<User>> {
    let mut conn = self.conn()?;
    let opt = map_db_err(users_dsl::app_users.filter(users_dsl::id.eq(id))
                                             .first::<UserRow>(&mut conn)
                                             .optional())?;
    Ok(opt.map(User::from))
  }
  fn list_active_users(&self) -> Result<Vec<User>> {
    let mut conn = self.conn()?;
    let rows = map_db_err(users_dsl::app_users.filter(users_dsl::active.eq(true))
                                              .order(users_dsl::id.asc())
                                              .load::<UserRow>(&mut conn))?;
    Ok(rows.into_iter().map(User::from).collect())
  }
}
/// Crear repo desde las variables de entorno (ver `PersistenceConfig::from_env`).
pub fn new_from_env() -> Result<DieselRequestRepository> {
  let config = PersistenceConfig::from_env()?;
  DieselRequestRepository::new(&config)
}
