//! Operational notification sink
//!
//! Automation stage transitions are pushed to a chat-bot endpoint and/or a
//! generic webhook. Strictly fire-and-forget: delivery failures are logged
//! and never influence job outcome or store state.

use serde_json::json;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Start,
    ResolveProfile,
    StartProfile,
    OtpRequired,
    Done,
    Exception,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::ResolveProfile => "resolve_profile",
            Stage::StartProfile => "start_profile",
            Stage::OtpRequired => "otp_required",
            Stage::Done => "done",
            Stage::Exception => "exception",
        }
    }
}

#[derive(Clone, Default)]
pub struct Notifier {
    bot_api_url: Option<String>,
    bot_chat_id: Option<String>,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(
        bot_api_url: Option<String>,
        bot_chat_id: Option<String>,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            bot_api_url,
            bot_chat_id,
            webhook_url,
        }
    }

    /// Notify a job stage transition on a detached task.
    pub fn notify_stage(&self, job_id: &str, platform: &str, stage: Stage, detail: Option<String>) {
        let this = self.clone();
        let job_id = job_id.to_string();
        let platform = platform.to_string();

        tokio::spawn(async move {
            this.send(&job_id, &platform, stage, detail.as_deref()).await;
        });
    }

    async fn send(&self, job_id: &str, platform: &str, stage: Stage, detail: Option<&str>) {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to build notification client: {}", e);
                return;
            }
        };

        if let (Some(url), Some(chat_id)) = (&self.bot_api_url, &self.bot_chat_id) {
            let mut text = format!("[{}] job {} ({})", stage.as_str(), job_id, platform);
            if let Some(detail) = detail {
                text.push_str(&format!(": {}", detail));
            }
            let res = client
                .post(format!("{}/sendMessage", url.trim_end_matches('/')))
                .json(&json!({ "chat_id": chat_id, "text": text }))
                .send()
                .await;
            if let Err(e) = res {
                tracing::warn!("Bot notification failed for job {}: {}", job_id, e);
            }
        }

        if let Some(url) = &self.webhook_url {
            let res = client
                .post(url)
                .json(&json!({
                    "job_id": job_id,
                    "platform": platform,
                    "stage": stage.as_str(),
                    "detail": detail,
                }))
                .send()
                .await;
            if let Err(e) = res {
                tracing::warn!("Webhook notification failed for job {}: {}", job_id, e);
            }
        }
    }
}
