//! Platform login flow strategies
//!
//! One strategy per platform, looked up by identifier. Adding a platform
//! means implementing LoginFlow and listing it in the registry below;
//! unknown platforms fall back to the single-step generic flow.

pub mod facebook;
pub mod generic;
pub mod google;
pub mod microsoft;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{AutomationError, PageDriver};

/// Bounded wait for any single selector; exceeding it is non-fatal.
pub(crate) const SELECTOR_TIMEOUT: Duration = Duration::from_secs(20);

/// Heuristic "looks like an OTP field" selector set, used by the generic
/// flow and as a fallback probe for unknown providers.
pub(crate) const GENERIC_OTP_SELECTOR: &str = "input[autocomplete='one-time-code'], \
     input[name*='otp'], input[id*='otp'], input[name*='2fa'], \
     input[name*='verification'], input[name*='code']";

#[async_trait]
pub trait LoginFlow: Send + Sync {
    /// Platform identifiers this flow handles
    fn aliases(&self) -> &'static [&'static str];

    /// Authenticated landing page navigated to before detaching
    fn home_url(&self) -> String;

    /// Whether this provider normally presents a second-factor step.
    /// Used by dry runs to predict `needs_otp` without touching a browser.
    fn expects_second_factor(&self) -> bool;

    async fn login(
        &self,
        driver: &mut dyn PageDriver,
        username: &str,
        password: &str,
    ) -> Result<(), AutomationError>;

    async fn detect_second_factor(&self, driver: &mut dyn PageDriver) -> bool;

    async fn submit_second_factor(
        &self,
        driver: &mut dyn PageDriver,
        code: &str,
    ) -> Result<(), AutomationError>;
}

static REGISTRY: Lazy<HashMap<&'static str, Arc<dyn LoginFlow>>> = Lazy::new(|| {
    let flows: Vec<Arc<dyn LoginFlow>> = vec![
        Arc::new(facebook::FacebookFlow),
        Arc::new(google::GoogleFlow),
        Arc::new(microsoft::MicrosoftFlow),
    ];

    let mut map: HashMap<&'static str, Arc<dyn LoginFlow>> = HashMap::new();
    for flow in flows {
        for alias in flow.aliases() {
            map.insert(alias, flow.clone());
        }
    }
    map
});

/// Select the flow strategy for a platform identifier.
pub fn flow_for(platform: &str) -> Arc<dyn LoginFlow> {
    let key = platform.trim().to_lowercase();
    match REGISTRY.get(key.as_str()) {
        Some(flow) => flow.clone(),
        None => Arc::new(generic::GenericFlow::new(&key)),
    }
}
