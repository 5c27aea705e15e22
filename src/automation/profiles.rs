//! Remote browser profile directory client
//!
//! Talks to the external browser-management service: lists named profiles
//! and starts one, extracting the remote-control endpoint from the start
//! response. Several generations of that service used different field
//! names for the endpoint, all of which are accepted here.

use serde::Deserialize;
use std::time::Duration;

use crate::domain::DomainError;

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct StartProfileResponse {
    #[serde(
        rename = "wsUrl",
        alias = "ws_url",
        alias = "websocketUrl",
        alias = "remoteDebuggingUrl",
        alias = "debuggerAddress"
    )]
    endpoint: Option<String>,
}

#[derive(Clone)]
pub struct ProfileClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ProfileClient {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Resolve a profile name to its identifier. Case-insensitive exact
    /// match, first hit wins. Ok(None) when nothing matches.
    pub async fn resolve(&self, name: &str) -> Result<Option<String>, DomainError> {
        let url = format!("{}/profiles", self.base_url);
        let res = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|e| DomainError::External(e.to_string()))?;

        if !res.status().is_success() {
            return Err(DomainError::External(format!(
                "profile directory returned {}",
                res.status()
            )));
        }

        let profiles: Vec<ProfileEntry> = res
            .json()
            .await
            .map_err(|e| DomainError::External(e.to_string()))?;

        let wanted = name.to_lowercase();
        Ok(profiles
            .into_iter()
            .find(|p| p.name.to_lowercase() == wanted)
            .map(|p| p.id))
    }

    /// Start the profile's browser and return its remote-control endpoint,
    /// or Ok(None) when the response carries no recognizable endpoint.
    pub async fn start(&self, profile_id: &str) -> Result<Option<String>, DomainError> {
        let url = format!("{}/profiles/{}/start", self.base_url, profile_id);
        let res = self
            .with_auth(self.client.post(&url))
            .send()
            .await
            .map_err(|e| DomainError::External(e.to_string()))?;

        if !res.status().is_success() {
            return Err(DomainError::External(format!(
                "browser start returned {}",
                res.status()
            )));
        }

        let body: StartProfileResponse = res
            .json()
            .await
            .map_err(|e| DomainError::External(e.to_string()))?;

        Ok(body.endpoint.filter(|e| !e.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_field_aliases() {
        for field in [
            "wsUrl",
            "ws_url",
            "websocketUrl",
            "remoteDebuggingUrl",
            "debuggerAddress",
        ] {
            let json = format!(r#"{{ "{}": "127.0.0.1:9222" }}"#, field);
            let parsed: StartProfileResponse = serde_json::from_str(&json).unwrap();
            assert_eq!(
                parsed.endpoint.as_deref(),
                Some("127.0.0.1:9222"),
                "field {}",
                field
            );
        }
    }

    #[test]
    fn test_missing_endpoint_is_none() {
        let parsed: StartProfileResponse = serde_json::from_str(r#"{ "status": "ok" }"#).unwrap();
        assert!(parsed.endpoint.is_none());
    }
}
