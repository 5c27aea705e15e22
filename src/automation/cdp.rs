//! Chrome DevTools Protocol session
//!
//! Attaches to an already-running remote browser. Endpoint normalization:
//! a fully-qualified ws:// URL is taken as-is, a bare host:port is resolved
//! through the browser's /json/version endpoint. Page selection reuses the
//! first open page and only opens a new one when none exists.
//!
//! Detaching closes the websocket only. The browser itself is never
//! terminated from here; the live session is handed over to an operator.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use super::{AutomationError, PageDriver};

const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(500);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
pub struct NormalizedEndpoint {
    /// http(s) base of the browser's management endpoints (/json/...)
    pub http_base: String,
    /// Canonical remote-control websocket URL for the browser
    pub browser_ws: String,
}

/// Normalize whatever endpoint the management service handed us.
pub async fn normalize_endpoint(endpoint: &str) -> Result<NormalizedEndpoint, AutomationError> {
    let endpoint = endpoint.trim();

    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        let parsed = url::Url::parse(endpoint)
            .map_err(|e| AutomationError::Connect(format!("bad ws url '{}': {}", endpoint, e)))?;
        let scheme = if parsed.scheme() == "wss" { "https" } else { "http" };
        let host = parsed
            .host_str()
            .ok_or_else(|| AutomationError::Connect(format!("no host in '{}'", endpoint)))?;
        let http_base = match parsed.port() {
            Some(port) => format!("{}://{}:{}", scheme, host, port),
            None => format!("{}://{}", scheme, host),
        };
        return Ok(NormalizedEndpoint {
            http_base,
            browser_ws: endpoint.to_string(),
        });
    }

    // Bare host:port. Ask the browser itself for the canonical ws URL.
    let http_base = format!("http://{}", endpoint);
    let version: Value = reqwest::Client::new()
        .get(format!("{}/json/version", http_base))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| AutomationError::Connect(format!("version probe failed: {}", e)))?
        .json()
        .await
        .map_err(|e| AutomationError::Connect(format!("version probe body: {}", e)))?;

    let browser_ws = version
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AutomationError::Connect("no webSocketDebuggerUrl".to_string()))?
        .to_string();

    Ok(NormalizedEndpoint {
        http_base,
        browser_ws,
    })
}

pub struct CdpSession {
    ws: WsStream,
    next_id: u64,
}

impl CdpSession {
    /// Normalize the endpoint, pick a page and open a protocol session.
    pub async fn attach(endpoint: &str) -> Result<CdpSession, AutomationError> {
        let normalized = normalize_endpoint(endpoint).await?;
        let page_ws = pick_page(&normalized.http_base).await?;

        let (ws, _) = connect_async(&page_ws)
            .await
            .map_err(|e| AutomationError::Connect(format!("attach to '{}': {}", page_ws, e)))?;

        tracing::info!("Attached to remote page at {}", page_ws);
        Ok(CdpSession { ws, next_id: 0 })
    }

    /// Close our protocol connection. The browser keeps running.
    pub async fn detach(mut self) {
        let _ = self.ws.close(None).await;
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, AutomationError> {
        self.next_id += 1;
        let id = self.next_id;
        let msg = json!({ "id": id, "method": method, "params": params });

        self.ws
            .send(Message::Text(msg.to_string()))
            .await
            .map_err(|e| AutomationError::Connect(format!("send {}: {}", method, e)))?;

        let deadline = tokio::time::Instant::now() + CALL_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(AutomationError::Step(format!("{} timed out", method)));
            }

            let next = tokio::time::timeout(remaining, self.ws.next()).await;
            let frame = match next {
                Ok(Some(Ok(frame))) => frame,
                Ok(Some(Err(e))) => {
                    return Err(AutomationError::Connect(format!("recv: {}", e)));
                }
                Ok(None) => {
                    return Err(AutomationError::Connect("connection closed".to_string()));
                }
                Err(_) => {
                    return Err(AutomationError::Step(format!("{} timed out", method)));
                }
            };

            let Message::Text(text) = frame else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                continue;
            };

            // Protocol events have no id; skip until our reply arrives
            if value.get("id").and_then(|v| v.as_u64()) != Some(id) {
                continue;
            }

            if let Some(err) = value.get("error") {
                return Err(AutomationError::Step(format!("{}: {}", method, err)));
            }
            return Ok(value.get("result").cloned().unwrap_or(Value::Null));
        }
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Value, AutomationError> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;
        Ok(result
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn selector_present(&mut self, selector: &str) -> bool {
        let sel = json_str(selector);
        matches!(
            self.evaluate(&format!("!!document.querySelector({})", sel))
                .await,
            Ok(Value::Bool(true))
        )
    }
}

fn json_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Reuse the first open page, else open a fresh one.
async fn pick_page(http_base: &str) -> Result<String, AutomationError> {
    let client = reqwest::Client::new();

    let targets: Vec<Value> = client
        .get(format!("{}/json/list", http_base))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| AutomationError::Connect(format!("list pages: {}", e)))?
        .json()
        .await
        .unwrap_or_default();

    let existing = targets.iter().find_map(|t| {
        if t.get("type").and_then(|v| v.as_str()) == Some("page") {
            t.get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        } else {
            None
        }
    });

    if let Some(ws) = existing {
        return Ok(ws);
    }

    // Newer Chrome wants PUT for /json/new
    let created: Value = client
        .put(format!("{}/json/new", http_base))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| AutomationError::Connect(format!("open page: {}", e)))?
        .json()
        .await
        .map_err(|e| AutomationError::Connect(format!("open page body: {}", e)))?;

    created
        .get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AutomationError::Connect("new page has no debugger url".to_string()))
}

#[async_trait]
impl PageDriver for CdpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AutomationError> {
        self.call("Page.navigate", json!({ "url": url })).await?;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.selector_present(selector).await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn exists(&mut self, selector: &str) -> bool {
        self.selector_present(selector).await
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), AutomationError> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.focus();
                el.value = {text};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            sel = json_str(selector),
            text = json_str(text),
        );
        match self.evaluate(&script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(AutomationError::Step(format!(
                "no element for '{}'",
                selector
            ))),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), AutomationError> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({sel});
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            sel = json_str(selector),
        );
        match self.evaluate(&script).await? {
            Value::Bool(true) => Ok(()),
            _ => Err(AutomationError::Step(format!(
                "no element for '{}'",
                selector
            ))),
        }
    }

    async fn wait_for_load(&mut self, timeout: Duration) {
        // Give a just-submitted navigation a moment to start
        tokio::time::sleep(Duration::from_millis(500)).await;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ready = matches!(
                self.evaluate("document.readyState === 'complete'").await,
                Ok(Value::Bool(true))
            );
            if ready || tokio::time::Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn pause(&mut self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
