use std::env;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Shared administrative secret gating the decision endpoints.
    /// When unset, decision endpoints are open (development mode).
    pub admin_secret: Option<String>,
    /// Base URL of the remote browser-management service (profile directory)
    pub profile_api_url: String,
    pub profile_api_token: Option<String>,
    /// Optional operational notification sinks
    pub bot_api_url: Option<String>,
    pub bot_chat_id: Option<String>,
    pub webhook_url: Option<String>,
    pub cors_allowed_origins: Vec<String>,
    pub profile: String,
}

impl Config {
    pub fn from_env() -> Self {
        let profile = env::var("PROFILE").unwrap_or_else(|_| "default".to_string());

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            if profile == "default" {
                "sqlite://credrelay.db?mode=rwc".to_string()
            } else {
                format!("sqlite://credrelay_{}.db?mode=rwc", profile)
            }
        });

        Self {
            database_url,
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            admin_secret: env::var("ADMIN_SECRET").ok(),
            profile_api_url: env::var("PROFILE_API_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:36912".to_string()),
            profile_api_token: env::var("PROFILE_API_TOKEN").ok(),
            bot_api_url: env::var("BOT_API_URL").ok(),
            bot_chat_id: env::var("BOT_CHAT_ID").ok(),
            webhook_url: env::var("WEBHOOK_URL").ok(),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(Vec::new),
            profile,
        }
    }
}
