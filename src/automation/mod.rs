//! Automation flow engine
//!
//! Runs once a job is approved: resolves a remote browser profile, starts
//! it through the browser-management service, attaches over the DevTools
//! protocol and executes the platform's login flow, probing for a
//! second-factor challenge after credential submission.
//!
//! Steps inside a job are strictly sequential; independent jobs may run
//! concurrently. Only three failures are hard (`profile_not_resolved`,
//! `no_endpoint`, a remote-control connect failure); selector and
//! navigation timeouts degrade permissively.

pub mod cdp;
pub mod flows;
pub mod profiles;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::services::notifier::{Notifier, Stage};

pub const PROFILE_NOT_RESOLVED: &str = "profile_not_resolved";
pub const NO_ENDPOINT: &str = "no_endpoint";

#[derive(Debug)]
pub enum AutomationError {
    /// No profile identifier could be resolved; the browser-start step is
    /// never contacted in this case.
    ProfileNotResolved,
    /// The browser-management service returned no remote-control endpoint
    NoEndpoint,
    /// Unrecoverable remote-control (CDP) connection failure
    Connect(String),
    /// Soft failure inside a flow step; callers log and continue
    Step(String),
}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationError::ProfileNotResolved => f.write_str(PROFILE_NOT_RESOLVED),
            AutomationError::NoEndpoint => f.write_str(NO_ENDPOINT),
            AutomationError::Connect(msg) => write!(f, "connect failed: {}", msg),
            AutomationError::Step(msg) => write!(f, "step failed: {}", msg),
        }
    }
}

impl std::error::Error for AutomationError {}

/// One approved relay job handed to the engine.
#[derive(Clone, Debug)]
pub struct JobRequest {
    pub platform: String,
    pub username: String,
    pub password: String,
    pub profile_ref: Option<String>,
    pub otp: Option<String>,
    pub dry_run: bool,
}

#[derive(Clone, Debug)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub needs_otp: bool,
    pub error: Option<String>,
}

impl JobResult {
    fn ok(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: true,
            needs_otp: false,
            error: None,
        }
    }

    fn needs_otp(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: false,
            needs_otp: true,
            error: None,
        }
    }

    fn failed(job_id: &str, error: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            success: false,
            needs_otp: false,
            error: Some(error),
        }
    }
}

/// Minimal page-driving capability the flows program against. The CDP
/// session implements it for real browsers; tests use scripted doubles.
///
/// There is deliberately no close/terminate operation: the live browser
/// session is always left running for manual takeover.
#[async_trait]
pub trait PageDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), AutomationError>;
    /// Wait for a selector to appear. Returns false on timeout (soft).
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> bool;
    async fn exists(&mut self, selector: &str) -> bool;
    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), AutomationError>;
    async fn click(&mut self, selector: &str) -> Result<(), AutomationError>;
    /// Best-effort wait for the page to settle after a submit
    async fn wait_for_load(&mut self, timeout: Duration);
    /// Flow pacing between steps
    async fn pause(&mut self, ms: u64);
}

#[derive(Clone)]
pub struct AutomationEngine {
    profiles: profiles::ProfileClient,
    notifier: Notifier,
}

impl AutomationEngine {
    pub fn new(config: &Config, notifier: Notifier) -> Self {
        Self {
            profiles: profiles::ProfileClient::new(
                config.profile_api_url.clone(),
                config.profile_api_token.clone(),
            ),
            notifier,
        }
    }

    pub fn with_profiles(profiles: profiles::ProfileClient, notifier: Notifier) -> Self {
        Self { profiles, notifier }
    }

    /// Execute one job end to end and report its result. Never panics the
    /// caller; all failure modes come back as a JobResult.
    pub async fn run(&self, job_id: &str, req: JobRequest) -> JobResult {
        let flow = flows::flow_for(&req.platform);
        self.notifier
            .notify_stage(job_id, &req.platform, Stage::Start, None);

        // Dry runs short-circuit before any external call and only predict
        // the second-factor outcome from the flow identifier.
        if req.dry_run {
            return if flow.expects_second_factor() && req.otp.is_none() {
                JobResult::needs_otp(job_id)
            } else {
                JobResult::ok(job_id)
            };
        }

        let result = self.run_steps(job_id, &req, flow.as_ref()).await;

        match &result {
            r if r.needs_otp => {
                self.notifier
                    .notify_stage(job_id, &req.platform, Stage::OtpRequired, None);
            }
            r if r.success => {
                self.notifier
                    .notify_stage(job_id, &req.platform, Stage::Done, None);
            }
            r => {
                self.notifier.notify_stage(
                    job_id,
                    &req.platform,
                    Stage::Exception,
                    r.error.clone(),
                );
            }
        }

        result
    }

    async fn run_steps(
        &self,
        job_id: &str,
        req: &JobRequest,
        flow: &dyn flows::LoginFlow,
    ) -> JobResult {
        // 1. Resolve profile (direct ref wins over a directory lookup)
        let profile_id = match &req.profile_ref {
            Some(r) if !r.trim().is_empty() => r.clone(),
            _ => match self.profiles.resolve(&req.platform).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    tracing::warn!("Job {}: no profile matching '{}'", job_id, req.platform);
                    return JobResult::failed(job_id, PROFILE_NOT_RESOLVED.to_string());
                }
                Err(e) => {
                    tracing::warn!("Job {}: profile directory error: {}", job_id, e);
                    return JobResult::failed(job_id, PROFILE_NOT_RESOLVED.to_string());
                }
            },
        };
        self.notifier.notify_stage(
            job_id,
            &req.platform,
            Stage::ResolveProfile,
            Some(profile_id.clone()),
        );

        // 2. Start the remote browser and extract its endpoint
        let endpoint = match self.profiles.start(&profile_id).await {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => return JobResult::failed(job_id, NO_ENDPOINT.to_string()),
            Err(e) => {
                tracing::warn!("Job {}: browser start failed: {}", job_id, e);
                return JobResult::failed(job_id, NO_ENDPOINT.to_string());
            }
        };
        self.notifier.notify_stage(
            job_id,
            &req.platform,
            Stage::StartProfile,
            Some(endpoint.clone()),
        );

        // 3 + 4. Normalize the endpoint and attach to a page
        let mut session = match cdp::CdpSession::attach(&endpoint).await {
            Ok(s) => s,
            Err(e) => return JobResult::failed(job_id, e.to_string()),
        };

        let result = self.execute_flow(job_id, req, flow, &mut session).await;

        // Detach only; the authenticated session stays open for takeover
        session.detach().await;
        result
    }

    /// Steps 5-7: platform flow, second-factor probe, finish. Separated
    /// from attachment so tests can drive it with a scripted PageDriver.
    pub(crate) async fn execute_flow(
        &self,
        job_id: &str,
        req: &JobRequest,
        flow: &dyn flows::LoginFlow,
        driver: &mut dyn PageDriver,
    ) -> JobResult {
        if let Err(e) = flow.login(driver, &req.username, &req.password).await {
            // Permissive: log and keep going, the probe below still runs
            tracing::warn!("Job {}: login step degraded: {}", job_id, e);
        }

        if flow.detect_second_factor(driver).await {
            match &req.otp {
                None => {
                    tracing::info!("Job {}: second-factor challenge, no OTP on file", job_id);
                    return JobResult::needs_otp(job_id);
                }
                Some(code) => {
                    if let Err(e) = flow.submit_second_factor(driver, code).await {
                        tracing::warn!("Job {}: OTP submit degraded: {}", job_id, e);
                    }
                }
            }
        }

        if let Err(e) = driver.navigate(&flow.home_url()).await {
            tracing::warn!("Job {}: final navigation degraded: {}", job_id, e);
        }
        driver.wait_for_load(Duration::from_secs(10)).await;

        JobResult::ok(job_id)
    }
}
