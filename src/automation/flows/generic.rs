//! Single-step flow for basic platforms (vote sites, small forums).
//!
//! One page holds both credential fields: type username, type password,
//! submit, best-effort wait for a logged-in marker, go home.

use async_trait::async_trait;

use super::{GENERIC_OTP_SELECTOR, LoginFlow, SELECTOR_TIMEOUT};
use crate::automation::{AutomationError, PageDriver};

const USERNAME_SELECTOR: &str =
    "input[type='email'], input[name='email'], input[name='username'], input[type='text']";
const PASSWORD_SELECTOR: &str = "input[type='password']";
const SUBMIT_SELECTOR: &str = "button[type='submit'], input[type='submit']";
const LOGGED_IN_MARKER: &str = "a[href*='logout'], a[href*='signout'], [data-logged-in]";

pub struct GenericFlow {
    platform: String,
    domain: String,
}

impl GenericFlow {
    pub fn new(platform: &str) -> Self {
        // Accept either a bare platform name or a full domain
        let domain = if platform.contains('.') {
            platform.to_string()
        } else {
            format!("www.{}.com", platform)
        };
        Self {
            platform: platform.to_string(),
            domain,
        }
    }

    fn login_url(&self) -> String {
        format!("https://{}/login", self.domain)
    }
}

#[async_trait]
impl LoginFlow for GenericFlow {
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn home_url(&self) -> String {
        format!("https://{}/", self.domain)
    }

    fn expects_second_factor(&self) -> bool {
        false
    }

    async fn login(
        &self,
        driver: &mut dyn PageDriver,
        username: &str,
        password: &str,
    ) -> Result<(), AutomationError> {
        driver.navigate(&self.login_url()).await?;

        if !driver
            .wait_for_selector(USERNAME_SELECTOR, SELECTOR_TIMEOUT)
            .await
        {
            tracing::warn!("{}: username field never appeared", self.platform);
        }
        driver.type_into(USERNAME_SELECTOR, username).await?;
        driver.type_into(PASSWORD_SELECTOR, password).await?;
        driver.click(SUBMIT_SELECTOR).await?;

        driver.wait_for_load(SELECTOR_TIMEOUT).await;
        if driver.exists(LOGGED_IN_MARKER).await {
            tracing::debug!("{}: logged-in marker present", self.platform);
        }

        Ok(())
    }

    async fn detect_second_factor(&self, driver: &mut dyn PageDriver) -> bool {
        driver.exists(GENERIC_OTP_SELECTOR).await
    }

    async fn submit_second_factor(
        &self,
        driver: &mut dyn PageDriver,
        code: &str,
    ) -> Result<(), AutomationError> {
        driver.type_into(GENERIC_OTP_SELECTOR, code).await?;
        driver.click(SUBMIT_SELECTOR).await?;
        driver.wait_for_load(SELECTOR_TIMEOUT).await;
        Ok(())
    }
}
