//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no SeaORM, no Axum).
//! Only the status state machine and domain error types.

pub mod errors;
pub mod status;

pub use errors::DomainError;
pub use status::LoginStatus;
