pub mod audit_event;
pub mod pending_login;

pub use audit_event::ActorKind;
