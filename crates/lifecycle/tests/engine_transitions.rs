use lifecycle::{EntityKind, ErrorCategory, InMemoryReferenceCatalog, InMemoryRequestRepository, InMemoryUserDirectory,
                LifecycleEngine, LifecycleEngineConfig, LifecycleError};
use request_domain::{default_channels, default_request_types, default_states, DomainStubs, HistoryAction, Priority,
                     Request, StateCode, TransitionError};
use std::sync::Arc;

const STUDENT: i64 = 1;
const STAFF: i64 = 2;
const ASSIGNEE: i64 = 3;
const INACTIVE: i64 = 4;

fn engine() -> LifecycleEngine<InMemoryRequestRepository> {
  LifecycleEngine::new(Arc::new(InMemoryRequestRepository::new()),
                       Arc::new(InMemoryReferenceCatalog::seeded()),
                       Arc::new(InMemoryUserDirectory::new(DomainStubs::sample_users())),
                       LifecycleEngineConfig::default())
}

fn registered(engine: &LifecycleEngine<InMemoryRequestRepository>) -> Request {
  engine.create("Solicitud de homologación", 1, 1, STUDENT, None).expect("create")
}

fn attended(engine: &LifecycleEngine<InMemoryRequestRepository>) -> Request {
  let r = registered(engine);
  engine.classify(&r.id(), 2, Priority::High, None, STAFF).expect("classify");
  engine.assign(&r.id(), ASSIGNEE, STAFF).expect("assign");
  engine.attend(&r.id(), ASSIGNEE, None).expect("attend")
}

#[test]
fn full_path_records_one_entry_per_transition() {
  let engine = engine();
  let r = registered(&engine);
  assert_eq!(r.state(), StateCode::Registrada);
  assert_eq!(r.requested_by_id(), STUDENT);
  assert!(r.priority().is_none());

  let r = engine.classify(&r.id(), 2, Priority::High, Some("Fin de semestre"), STAFF).expect("classify");
  assert_eq!(r.state(), StateCode::Clasificada);
  assert_eq!(r.request_type_id(), 2);
  assert_eq!(r.priority(), Some(Priority::High));
  assert_eq!(r.priority_justification(), Some("Fin de semestre"));

  let r = engine.assign(&r.id(), ASSIGNEE, STAFF).expect("assign");
  assert_eq!(r.state(), StateCode::EnAtencion);
  assert_eq!(r.assigned_to_id(), Some(ASSIGNEE));

  let r = engine.attend(&r.id(), ASSIGNEE, Some("Revisado con coordinación")).expect("attend");
  assert_eq!(r.state(), StateCode::Atendida);

  let r = engine.close(&r.id(), Some("Homologación aprobada"), STAFF).expect("close");
  assert_eq!(r.state(), StateCode::Cerrada);
  assert_eq!(r.closure_observation(), Some("Homologación aprobada"));
  assert_eq!(r.version(), 4);
  assert!(r.updated_at() >= r.created_at());
  assert_eq!(engine.find_request(&r.id()).expect("find"), r);

  let history = engine.history(&r.id()).expect("history");
  let actions: Vec<HistoryAction> = history.iter().map(|e| e.action).collect();
  assert_eq!(actions,
             vec![HistoryAction::Closed,
                  HistoryAction::Attended,
                  HistoryAction::Assigned,
                  HistoryAction::Classified,
                  HistoryAction::Registered]);
  let cursors: Vec<i64> = history.iter().map(|e| e.cursor).collect();
  assert_eq!(cursors, vec![5, 4, 3, 2, 1]);

  let obs: Vec<Option<&str>> = history.iter().map(|e| e.observations.as_deref()).collect();
  assert_eq!(obs,
             vec![Some("Homologación aprobada"),
                  Some("Revisado con coordinación"),
                  Some("Assigned to María Gómez (mgomez)"),
                  Some("Type: HOMOLOG, Priority: HIGH. Fin de semestre"),
                  Some("Request registered")]);
  assert_eq!(history[4].user_id, STUDENT);
  assert_eq!(history[3].user_id, STAFF);
  assert_eq!(history[1].user_id, ASSIGNEE);
}

#[test]
fn precondition_failure_changes_nothing() {
  let engine = engine();
  let r = registered(&engine);

  let err = engine.attend(&r.id(), STAFF, None).unwrap_err();
  assert_eq!(err.to_string(), "Cannot attend: request is in state REGISTRADA, expected EN_ATENCION");
  assert_eq!(err.category(), ErrorCategory::Conflict);
  assert!(matches!(err,
                   LifecycleError::InvalidStateTransition(TransitionError::WrongState { current: StateCode::Registrada,
                                                                                        expected: StateCode::EnAtencion,
                                                                                        .. })));

  let err = engine.assign(&r.id(), ASSIGNEE, STAFF).unwrap_err();
  assert!(err.to_string().contains("expected CLASIFICADA"));

  assert_eq!(engine.find_request(&r.id()).expect("find"), r);
  assert_eq!(engine.history(&r.id()).expect("history").len(), 1);
}

#[test]
fn closed_request_rejects_every_transition() {
  let engine = engine();
  let r = attended(&engine);
  let r = engine.close(&r.id(), Some("Listo"), STAFF).expect("close");

  let errors = vec![engine.classify(&r.id(), 1, Priority::Low, None, STAFF).unwrap_err(),
                    engine.assign(&r.id(), ASSIGNEE, STAFF).unwrap_err(),
                    engine.attend(&r.id(), STAFF, None).unwrap_err(),
                    engine.close(&r.id(), Some("otra vez"), STAFF).unwrap_err(),
                    // el estado terminal se evalúa antes que las guardas de entrada
                    engine.close(&r.id(), Some("  "), STAFF).unwrap_err(),
                    engine.assign(&r.id(), INACTIVE, STAFF).unwrap_err()];
  for err in errors {
    assert!(matches!(err, LifecycleError::InvalidStateTransition(TransitionError::Closed)), "{err}");
    assert_eq!(err.to_string(), "Request is closed and cannot be modified");
  }
  assert_eq!(engine.find_request(&r.id()).expect("find"), r);
  assert_eq!(engine.history(&r.id()).expect("history").len(), 5);
}

#[test]
fn close_requires_non_blank_observation() {
  let engine = engine();
  let r = attended(&engine);
  for blank in [None, Some(""), Some("   \t")] {
    let err = engine.close(&r.id(), blank, STAFF).unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidInput(ref m) if m == "Closure observation is required"));
    assert_eq!(err.category(), ErrorCategory::BadInput);
  }
  assert_eq!(engine.find_request(&r.id()).expect("find").state(), StateCode::Atendida);
  assert_eq!(engine.history(&r.id()).expect("history").len(), 4);

  // la observación en blanco se rechaza aunque el estado tampoco sea el correcto
  let fresh = registered(&engine);
  let err = engine.close(&fresh.id(), Some(" "), STAFF).unwrap_err();
  assert!(matches!(err, LifecycleError::InvalidInput(_)));
}

#[test]
fn assign_rejects_inactive_user() {
  let engine = engine();
  let r = registered(&engine);
  engine.classify(&r.id(), 5, Priority::Low, None, STAFF).expect("classify");

  let err = engine.assign(&r.id(), INACTIVE, STAFF).unwrap_err();
  assert!(err.to_string().contains("inactive"), "{err}");
  assert_eq!(err.category(), ErrorCategory::BadInput);
  let stored = engine.find_request(&r.id()).expect("find");
  assert_eq!(stored.state(), StateCode::Clasificada);
  assert_eq!(stored.assigned_to_id(), None);

  let other = registered(&engine);
  let err = engine.assign(&other.id(), INACTIVE, STAFF).unwrap_err();
  assert!(matches!(err, LifecycleError::InvalidInput(_)));
}

#[test]
fn unresolved_references_fail_before_mutation() {
  let engine = engine();
  let err = engine.create("x", 99, 1, STUDENT, None).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::RequestType, .. }));
  assert_eq!(err.category(), ErrorCategory::BadInput);
  let err = engine.create("x", 1, 99, STUDENT, None).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::Channel, .. }));
  let err = engine.create("x", 1, 1, 99, None).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::User, .. }));

  let r = registered(&engine);
  let err = engine.classify(&r.id(), 99, Priority::Low, None, STAFF).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::RequestType, .. }));
  let err = engine.classify(&r.id(), 1, Priority::Low, None, 99).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::User, .. }));
  assert_eq!(engine.find_request(&r.id()).expect("find"), r);
  assert_eq!(engine.history(&r.id()).expect("history").len(), 1);

  let missing = uuid::Uuid::new_v4();
  let err = engine.find_request(&missing).unwrap_err();
  assert_eq!(err.category(), ErrorCategory::NotFound);
  assert_eq!(err.to_string(), format!("Request not found: {missing}"));
  assert!(matches!(engine.history(&missing).unwrap_err(),
                   LifecycleError::NotFound { entity: EntityKind::Request, .. }));
  assert!(matches!(engine.attend(&missing, STAFF, None).unwrap_err(),
                   LifecycleError::NotFound { entity: EntityKind::Request, .. }));
}

#[test]
fn unknown_assignee_or_actor_is_not_found() {
  let engine = engine();
  let r = registered(&engine);
  engine.classify(&r.id(), 1, Priority::Medium, None, STAFF).expect("classify");

  let err = engine.assign(&r.id(), 99, STAFF).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::User, ref id } if id == "99"), "{err}");
  assert_eq!(err.category(), ErrorCategory::BadInput);
  let err = engine.assign(&r.id(), ASSIGNEE, 99).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::User, .. }));
  assert_eq!(engine.find_request(&r.id()).expect("find").assigned_to_id(), None);

  engine.assign(&r.id(), ASSIGNEE, STAFF).expect("assign");
  let err = engine.attend(&r.id(), 99, None).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::User, .. }));
  assert_eq!(engine.find_request(&r.id()).expect("find").state(), StateCode::EnAtencion);

  engine.attend(&r.id(), ASSIGNEE, None).expect("attend");
  let err = engine.close(&r.id(), Some("Resuelto"), 99).unwrap_err();
  assert!(matches!(err, LifecycleError::NotFound { entity: EntityKind::User, .. }));
  let stored = engine.find_request(&r.id()).expect("find");
  assert_eq!(stored.state(), StateCode::Atendida);
  assert_eq!(stored.closure_observation(), None);
  assert_eq!(engine.history(&r.id()).expect("history").len(), 4);
}

#[test]
fn history_is_unaffected_by_other_requests() {
  let engine = engine();
  let r = registered(&engine);
  engine.classify(&r.id(), 2, Priority::High, None, STAFF).expect("classify");
  let before = engine.history(&r.id()).expect("history");

  let other = attended(&engine);
  engine.close(&other.id(), Some("Listo"), STAFF).expect("close");
  let third = registered(&engine);
  assert!(engine.assign(&third.id(), ASSIGNEE, STAFF).is_err());

  assert_eq!(engine.history(&r.id()).expect("history"), before);
  assert_eq!(engine.history(&other.id()).expect("history").len(), 5);
  assert!(engine.history(&other.id())
                .expect("history")
                .iter()
                .all(|e| e.request_id == other.id()));
}

#[test]
fn classify_without_justification_stores_empty_text() {
  let engine = engine();
  let r = registered(&engine);
  let r = engine.classify(&r.id(), 5, Priority::Low, None, STAFF).expect("classify");
  assert_eq!(r.priority_justification(), Some(""));
  let latest = &engine.history(&r.id()).expect("history")[0];
  assert_eq!(latest.action, HistoryAction::Classified);
  assert_eq!(latest.observations.as_deref(), Some("Type: CONSULTA, Priority: LOW"));
}

#[test]
fn attend_with_blank_observations_records_none() {
  let engine = engine();
  let r = attended(&engine);
  let latest = &engine.history(&r.id()).expect("history")[0];
  assert_eq!(latest.action, HistoryAction::Attended);
  assert_eq!(latest.observations, None);
}

#[test]
fn missing_state_row_is_reported_as_reference_data_error() {
  let states = default_states().iter()
                               .filter(|s| s.code != StateCode::Clasificada)
                               .cloned()
                               .collect();
  let catalog = InMemoryReferenceCatalog::new(states, default_request_types().to_vec(), default_channels().to_vec());
  let engine = LifecycleEngine::new(Arc::new(InMemoryRequestRepository::new()),
                                    Arc::new(catalog),
                                    Arc::new(InMemoryUserDirectory::new(DomainStubs::sample_users())),
                                    LifecycleEngineConfig::default());
  let r = registered(&engine);
  let err = engine.classify(&r.id(), 1, Priority::Medium, None, STAFF).unwrap_err();
  assert!(matches!(err, LifecycleError::ReferenceData(_)));
  assert_eq!(err.category(), ErrorCategory::Internal);
  assert_eq!(engine.find_request(&r.id()).expect("find").state(), StateCode::Registrada);
  assert_eq!(engine.history(&r.id()).expect("history").len(), 1);
}

#[test]
fn registered_at_defaults_to_creation_time() {
  let engine = engine();
  let r = registered(&engine);
  assert_eq!(r.registered_at(), r.created_at());

  let past = chrono::Utc::now() - chrono::Duration::days(3);
  let r = engine.create("Solicitud antigua", 1, 2, STUDENT, Some(past)).expect("create");
  assert!(r.registered_at() < r.created_at());
}
