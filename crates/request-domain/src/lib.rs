mod domain_stubs;
mod errors;
mod history;
mod priority;
mod reference;
mod request;
mod state;

pub use domain_stubs::DomainStubs;
pub use errors::DomainError;
pub use history::{HistoryAction, HistoryEntry};
pub use priority::{suggest_priority_by_request_type, Priority};
pub use reference::{default_channels, default_request_types, default_states, Channel, RequestType, User};
pub use request::{Request, RequestParts};
pub use state::{check_transition, ensure_not_terminal, LifecycleAction, State, StateCode, TransitionError};
