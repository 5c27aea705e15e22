//! Facebook login flow.
//!
//! Credentials live on a single page; the second-factor challenge shows up
//! as the checkpoint approvals code input after submit.

use async_trait::async_trait;

use super::{LoginFlow, SELECTOR_TIMEOUT};
use crate::automation::{AutomationError, PageDriver};

const LOGIN_URL: &str = "https://www.facebook.com/login/";
const EMAIL_SELECTOR: &str = "#email, input[name='email']";
const PASSWORD_SELECTOR: &str = "#pass, input[name='pass']";
const SUBMIT_SELECTOR: &str = "button[name='login'], #loginbutton";
const OTP_SELECTOR: &str = "input[name='approvals_code'], #approvals_code";
const OTP_SUBMIT_SELECTOR: &str = "#checkpointSubmitButton, button[type='submit']";

pub struct FacebookFlow;

#[async_trait]
impl LoginFlow for FacebookFlow {
    fn aliases(&self) -> &'static [&'static str] {
        &["facebook", "fb"]
    }

    fn home_url(&self) -> String {
        "https://www.facebook.com/".to_string()
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
            .wait_for_selector(EMAIL_SELECTOR, SELECTOR_TIMEOUT)
            .await
        {
            tracing::warn!("facebook: email field never appeared");
        }
        driver.type_into(EMAIL_SELECTOR, username).await?;
        driver.pause(400).await;
        driver.type_into(PASSWORD_SELECTOR, password).await?;
        driver.pause(400).await;
        driver.click(SUBMIT_SELECTOR).await?;

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
        driver.pause(400).await;
        driver.click(OTP_SUBMIT_SELECTOR).await?;
        driver.wait_for_load(SELECTOR_TIMEOUT).await;
        Ok(())
    }
}
