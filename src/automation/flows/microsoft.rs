//! Microsoft account login flow.
//!
//! Multi-step like Google, plus the "stay signed in" interstitial that is
//! dismissed when present.

use async_trait::async_trait;

use super::{LoginFlow, SELECTOR_TIMEOUT};
use crate::automation::{AutomationError, PageDriver};

const LOGIN_URL: &str = "https://login.live.com/login.srf";
const IDENTIFIER_SELECTOR: &str = "input[name='loginfmt'], #i0116";
const PASSWORD_SELECTOR: &str = "input[name='passwd'], #i0118";
const NEXT_SELECTOR: &str = "#idSIButton9, input[type='submit']";
const STAY_SIGNED_IN_DECLINE: &str = "#idBtn_Back";
const OTP_SELECTOR: &str = "input[name='otc'], #idTxtBx_SAOTCC_OTC";

pub struct MicrosoftFlow;

#[async_trait]
impl LoginFlow for MicrosoftFlow {
    fn aliases(&self) -> &'static [&'static str] {
        &["microsoft", "outlook", "hotmail", "live"]
    }

    fn home_url(&self) -> String {
        "https://outlook.live.com/mail/".to_string()
    }

    fn expects_second_factor(&self) -> bool {
        true
    }

    async fn login(
        &self,
        driver: &mut dyn PageDriver,
        username: &str,
        password: &str,
    ) -> Result<(), AutomationError> {
        driver.navigate(LOGIN_URL).await?;

        if !driver
            .wait_for_selector(IDENTIFIER_SELECTOR, SELECTOR_TIMEOUT)
            .await
        {
            tracing::warn!("microsoft: identifier field never appeared");
        }
        driver.type_into(IDENTIFIER_SELECTOR, username).await?;
        driver.click(NEXT_SELECTOR).await?;
        driver.pause(1000).await;

        if !driver
            .wait_for_selector(PASSWORD_SELECTOR, SELECTOR_TIMEOUT)
            .await
        {
            tracing::warn!("microsoft: password field never appeared");
        }
        driver.type_into(PASSWORD_SELECTOR, password).await?;
        driver.click(NEXT_SELECTOR).await?;
        driver.pause(1000).await;

        // "Stay signed in?" interstitial, not always shown
        if driver.exists(STAY_SIGNED_IN_DECLINE).await {
            if let Err(e) = driver.click(STAY_SIGNED_IN_DECLINE).await {
                tracing::debug!("microsoft: kmsi dismiss failed: {}", e);
            }
        }

        driver.wait_for_load(SELECTOR_TIMEOUT).await;
        Ok(())
    }

    async fn detect_second_factor(&self, driver: &mut dyn PageDriver) -> bool {
        driver.exists(OTP_SELECTOR).await
    }

    async fn submit_second_factor(
        &self,
        driver: &mut dyn PageDriver,
        code: &str,
    ) -> Result<(), AutomationError> {
        driver.type_into(OTP_SELECTOR, code).await?;
        driver.pause(500).await;
        driver.click(NEXT_SELECTOR).await?;
        driver.wait_for_load(SELECTOR_TIMEOUT).await;
        Ok(())
    }
}
