//! Google login flow.
//!
//! Multi-step: identifier page, then password page, then (usually) a
//! verification step. Google paces its page swaps with animations, hence
//! the longer pauses between steps.

use async_trait::async_trait;

use super::{LoginFlow, SELECTOR_TIMEOUT};
use crate::automation::{AutomationError, PageDriver};

const LOGIN_URL: &str = "https://accounts.google.com/signin/v2/identifier";
const IDENTIFIER_SELECTOR: &str = "input[type='email'], #identifierId";
const IDENTIFIER_NEXT: &str = "#identifierNext button, #identifierNext";
const PASSWORD_SELECTOR: &str = "#password input[type='password'], input[type='password']";
const PASSWORD_NEXT: &str = "#passwordNext button, #passwordNext";
const OTP_SELECTOR: &str = "input[name='totpPin'], #totpPin, input[name='idvPin']";
const OTP_NEXT: &str = "#totpNext button, #totpNext, #idvPreregisteredPhoneNext";

pub struct GoogleFlow;

#[async_trait]
impl LoginFlow for GoogleFlow {
    fn aliases(&self) -> &'static [&'static str] {
        &["google", "gmail"]
    }

    fn home_url(&self) -> String {
        "https://mail.google.com/".to_string()
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
            tracing::warn!("google: identifier field never appeared");
        }
        driver.type_into(IDENTIFIER_SELECTOR, username).await?;
        driver.click(IDENTIFIER_NEXT).await?;
        driver.pause(1500).await;

        if !driver
            .wait_for_selector(PASSWORD_SELECTOR, SELECTOR_TIMEOUT)
            .await
        {
            tracing::warn!("google: password field never appeared");
        }
        driver.type_into(PASSWORD_SELECTOR, password).await?;
        driver.click(PASSWORD_NEXT).await?;
        driver.pause(1500).await;

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
        driver.click(OTP_NEXT).await?;
        driver.wait_for_load(SELECTOR_TIMEOUT).await;
        Ok(())
    }
}
