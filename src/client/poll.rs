//! Status poll loop
//!
//! After a submission is accepted for review, the submitter polls the
//! status endpoint with exponential backoff until a terminal outcome or
//! the deadline. One logical timer per submission, at most one status read
//! in flight, cancellable at any time.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Success,
    NeedsOtp,
    Failed,
    Timeout,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollState::Success | PollState::NeedsOtp | PollState::Failed | PollState::Timeout
        )
    }
}

#[derive(Clone, Debug)]
pub struct PollConfig {
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    /// Wall-clock window measured from loop entry
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(2000),
            backoff_factor: 1.5,
            max_delay: Duration::from_millis(10_000),
            deadline: Duration::from_millis(60_000),
        }
    }
}

/// Next tick delay: `min(cap, round(delay * factor))`.
pub fn next_delay(current: Duration, config: &PollConfig) -> Duration {
    let scaled = (current.as_millis() as f64 * config.backoff_factor).round() as u64;
    Duration::from_millis(scaled.min(config.max_delay.as_millis() as u64))
}

/// What to poll: a specific job, or the generic session status when no job
/// id came back with the submission.
#[derive(Clone, Debug)]
pub enum PollTarget {
    Job(String),
    Session,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Clone)]
pub struct StatusPoller {
    base_url: String,
    config: PollConfig,
    client: reqwest::Client,
}

/// Handle to a running poll loop. Dropping it does NOT cancel the loop;
/// call `cancel()` to clear the scheduled tick.
pub struct PollHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<PollState>,
}

impl PollHandle {
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Wait until the loop reaches a terminal state and return it.
    pub async fn wait(mut self) -> PollState {
        while !self.state.borrow().is_terminal() {
            if self.state.changed().await.is_err() {
                break;
            }
        }
        let state = *self.state.borrow();
        let _ = self.task.await;
        state
    }

    /// Cancel the loop: clears any pending scheduled tick, no further
    /// status reads are issued. The state stays wherever it was.
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl StatusPoller {
    pub fn new(base_url: &str, config: PollConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
            client,
        }
    }

    fn status_url(&self, target: &PollTarget) -> String {
        match target {
            PollTarget::Job(id) => {
                format!("{}/api/relay/submissions/{}/status", self.base_url, id)
            }
            PollTarget::Session => format!("{}/api/relay/session/status", self.base_url),
        }
    }

    /// Enter the polling loop. `on_terminal` fires exactly once with the
    /// terminal state. Each call is a fresh loop with fresh budgets.
    pub fn start<F>(&self, target: PollTarget, on_terminal: F) -> PollHandle
    where
        F: FnOnce(PollState) + Send + 'static,
    {
        let (tx, rx) = watch::channel(PollState::Polling);
        let tx = Arc::new(tx);

        let poller = self.clone();
        let task = tokio::spawn({
            let tx = tx.clone();
            async move {
                let terminal = poller.run_loop(&target).await;
                let _ = tx.send(terminal);
                on_terminal(terminal);
            }
        });

        PollHandle { task, state: rx }
    }

    async fn run_loop(&self, target: &PollTarget) -> PollState {
        let started = tokio::time::Instant::now();
        let mut delay = self.config.initial_delay;
        let url = self.status_url(target);

        loop {
            tokio::time::sleep(delay).await;

            match self.read_status(&url).await {
                Some(terminal) => return terminal,
                None => {
                    // Non-terminal or transport error: keep polling
                }
            }

            if started.elapsed() >= self.config.deadline {
                tracing::debug!("Poll deadline elapsed for {}", url);
                return PollState::Timeout;
            }
            delay = next_delay(delay, &self.config);
        }
    }

    /// One status read. Some(state) on a terminal signal, None otherwise
    /// (including transport errors, which are transient here).
    async fn read_status(&self, url: &str) -> Option<PollState> {
        let res = match self.client.get(url).send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::debug!("Status read failed (transient): {}", e);
                return None;
            }
        };

        let body: StatusResponse = match res.json().await {
            Ok(body) => body,
            Err(_) => return None,
        };

        match body.status.as_str() {
            "success" => Some(PollState::Success),
            "otp" => Some(PollState::NeedsOtp),
            "failed" | "denied" | "error" => Some(PollState::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence() {
        let config = PollConfig::default();
        let mut delay = config.initial_delay;
        let mut seen = vec![delay.as_millis() as u64];

        for _ in 0..6 {
            delay = next_delay(delay, &config);
            seen.push(delay.as_millis() as u64);
        }

        assert_eq!(seen, vec![2000, 3000, 4500, 6750, 10_000, 10_000, 10_000]);
    }

    #[test]
    fn test_default_budgets() {
        let config = PollConfig::default();
        assert_eq!(config.initial_delay, Duration::from_millis(2000));
        assert_eq!(config.deadline, Duration::from_millis(60_000));

        // The cumulative schedule crosses the 60s deadline on the ninth
        // tick, never before
        let mut delay = config.initial_delay;
        let mut elapsed = 0u64;
        let mut ticks = 0;
        while elapsed < 60_000 {
            elapsed += delay.as_millis() as u64;
            delay = next_delay(delay, &config);
            ticks += 1;
        }
        assert_eq!(ticks, 9);
        assert!(elapsed >= 60_000);
    }

    #[test]
    fn test_terminal_states() {
        assert!(PollState::Success.is_terminal());
        assert!(PollState::NeedsOtp.is_terminal());
        assert!(PollState::Failed.is_terminal());
        assert!(PollState::Timeout.is_terminal());
        assert!(!PollState::Polling.is_terminal());
        assert!(!PollState::Idle.is_terminal());
    }
}
