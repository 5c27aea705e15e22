//! Application state shared across all handlers

use crate::automation::AutomationEngine;
use crate::services::{EventBus, Notifier, PendingLoginStore};

#[derive(Clone)]
pub struct AppState {
    pub store: PendingLoginStore,
    pub engine: AutomationEngine,
    /// Shared admin secret; None disables the check (development mode)
    pub admin_secret: Option<String>,
}

impl AppState {
    pub fn new(
        db: sea_orm::DatabaseConnection,
        config: &crate::config::Config,
    ) -> Self {
        let events = EventBus::new();
        let notifier = Notifier::new(
            config.bot_api_url.clone(),
            config.bot_chat_id.clone(),
            config.webhook_url.clone(),
        );

        Self {
            store: PendingLoginStore::new(db, events),
            engine: AutomationEngine::new(config, notifier),
            admin_secret: config.admin_secret.clone(),
        }
    }
}
