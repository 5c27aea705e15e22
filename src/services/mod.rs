//! Services Layer
//!
//! Business logic shared between the HTTP handlers and the automation
//! engine: the pending-login store, the audit event fan-out and the
//! operational notification sink.

pub mod events;
pub mod notifier;
pub mod store;

pub use events::EventBus;
pub use notifier::{Notifier, Stage};
pub use store::{JobOutcome, NewPendingLogin, PendingLoginStore, TransitionOpts};
