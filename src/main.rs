use chrono::{NaiveDate, TimeZone, Utc};
use lifecycle::{RequestFilter, RequestService};
use request_domain::{default_channels, default_request_types, DomainStubs, Priority, StateCode};
use request_persistence::DieselRequestRepository;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Pequeño menú interactivo para administrar solicitudes usando la
/// persistencia configurada por `request-persistence`.
///
/// Opciones soportadas:
/// 1) Listar solicitudes (filtro opcional por estado)
/// 2) Registrar solicitud
/// 3-6) Clasificar, asignar, atender y cerrar
/// 7) Ver historial
/// 8) Sugerir prioridad para un tipo
/// 9) Ver solicitud como JSON
/// 0) Salir
fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    // RUST_LOG controla el nivel; los registros `log` de las librerías llegan
    // por el puente tracing-log del subscriber.
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env()
                                          .unwrap_or_else(|_| "info".into()))
                                  .with(tracing_subscriber::fmt::layer().with_target(false))
                                  .init();

    // Inicializar repo (aplica migraciones embebidas) y sembrar vocabularios
    let repo = Arc::new(request_persistence::new_from_env()?);
    repo.seed_reference_data(default_request_types(), default_channels(), &DomainStubs::sample_users())?;
    let service = repo.into_service();
    log::info!("{} solicitudes registradas", service.list_requests(&RequestFilter::default())?.len());

    loop {
        println!("\n== Requests CLI menu ==");
        println!("1) Listar solicitudes");
        println!("2) Registrar solicitud");
        println!("3) Clasificar");
        println!("4) Asignar responsable");
        println!("5) Marcar como atendida");
        println!("6) Cerrar");
        println!("7) Ver historial");
        println!("8) Sugerir prioridad por tipo");
        println!("9) Ver solicitud (JSON)");
        println!("0) Salir");
        let choice = prompt("Elige una opción: ")?;
        let outcome = match choice.trim() {
            "1" => list(&service),
            "2" => create(&service),
            "3" => classify(&service),
            "4" => assign(&service),
            "5" => attend(&service),
            "6" => close(&service),
            "7" => history(&service),
            "8" => suggest(&service),
            "9" => show(&service),
            "0" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
                Ok(())
            }
        };
        if let Err(e) = outcome {
            eprintln!("Error: {}", e);
        }
    }

    Ok(())
}

type Service = RequestService<DieselRequestRepository>;
type CliResult = Result<(), Box<dyn Error>>;

fn list(service: &Service) -> CliResult {
    let state = prompt("Estado (enter para todos): ")?;
    let mut filter = RequestFilter::default();
    if !state.trim().is_empty() {
        filter = filter.with_state(state.trim().parse::<StateCode>()?);
    }
    let requests = service.list_requests(&filter)?;
    println!("\nID                                   | ESTADO      | PRIORIDAD | DESCRIPCIÓN");
    println!("-----------------------------------------------------------------------------------");
    for r in requests {
        println!("{} | {:<11} | {:<9} | {}",
                 r.id(),
                 r.state().as_str(),
                 r.priority().map(|p| p.as_str()).unwrap_or("-"),
                 r.description());
    }
    Ok(())
}

fn create(service: &Service) -> CliResult {
    for t in service.request_types()? {
        println!("  tipo {}: {} ({})", t.id, t.name, t.code);
    }
    for c in service.channels()? {
        println!("  canal {}: {}", c.id, c.name);
    }
    let description = prompt("Descripción: ")?;
    let type_id = prompt_i64("Tipo (id): ")?;
    let channel_id = prompt_i64("Canal (id): ")?;
    let requester = prompt_i64("Solicitante (id de usuario): ")?;
    let date = prompt("Fecha de registro YYYY-MM-DD (enter para ahora): ")?;
    let registered_at = if date.trim().is_empty() {
        None
    } else {
        let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")?;
        day.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
    };
    let r = service.create(description.trim(), type_id, channel_id, requester, registered_at)?;
    println!("Solicitud registrada: {}", r.id());
    Ok(())
}

fn classify(service: &Service) -> CliResult {
    let id = prompt_uuid()?;
    let type_id = prompt_i64("Tipo (id): ")?;
    let suggested = service.suggest_priority_for_type(type_id)?;
    let raw = prompt(&format!("Prioridad LOW/MEDIUM/HIGH (enter para {}): ", suggested))?;
    let priority = if raw.trim().is_empty() { suggested } else { raw.parse::<Priority>()? };
    let justification = prompt("Justificación (opcional): ")?;
    let actor = prompt_i64("Actor (id de usuario): ")?;
    let r = service.classify(&id, type_id, priority, non_blank(&justification), actor)?;
    println!("{}", r);
    Ok(())
}

fn assign(service: &Service) -> CliResult {
    let id = prompt_uuid()?;
    for u in service.active_users()? {
        println!("  usuario {}: {} ({})", u.id, u.name, u.identifier);
    }
    let assignee = prompt_i64("Responsable (id de usuario): ")?;
    let actor = prompt_i64("Actor (id de usuario): ")?;
    let r = service.assign(&id, assignee, actor)?;
    println!("{}", r);
    Ok(())
}

fn attend(service: &Service) -> CliResult {
    let id = prompt_uuid()?;
    let observations = prompt("Observaciones (opcional): ")?;
    let actor = prompt_i64("Actor (id de usuario): ")?;
    let r = service.attend(&id, actor, non_blank(&observations))?;
    println!("{}", r);
    Ok(())
}

fn close(service: &Service) -> CliResult {
    let id = prompt_uuid()?;
    let observation = prompt("Observación de cierre: ")?;
    let actor = prompt_i64("Actor (id de usuario): ")?;
    let r = service.close(&id, Some(observation.trim()), actor)?;
    println!("{}", r);
    Ok(())
}

fn history(service: &Service) -> CliResult {
    let id = prompt_uuid()?;
    for e in service.history(&id)? {
        println!("#{:<2} {} {:<10} usuario={} {}",
                 e.cursor,
                 e.occurred_at.format("%Y-%m-%d %H:%M:%S"),
                 e.action.as_str(),
                 e.user_id,
                 e.observations.as_deref().unwrap_or(""));
    }
    Ok(())
}

fn suggest(service: &Service) -> CliResult {
    let type_id = prompt_i64("Tipo (id): ")?;
    println!("Prioridad sugerida: {}", service.suggest_priority_for_type(type_id)?);
    Ok(())
}

fn show(service: &Service) -> CliResult {
    let id = prompt_uuid()?;
    let r = service.find_request(&id)?;
    println!("{}", serde_json::to_string_pretty(&r)?);
    Ok(())
}

fn non_blank(s: &str) -> Option<&str> {
    Some(s.trim()).filter(|t| !t.is_empty())
}

fn prompt_uuid() -> Result<Uuid, Box<dyn Error>> {
    let raw = prompt("Solicitud (UUID): ")?;
    Ok(Uuid::parse_str(raw.trim())?)
}

fn prompt_i64(msg: &str) -> Result<i64, Box<dyn Error>> {
    let raw = prompt(msg)?;
    Ok(raw.trim().parse::<i64>()?)
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
