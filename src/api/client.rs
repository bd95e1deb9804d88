use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use yansi::Paint;

use super::error::GatewayError;

static SILENT: AtomicBool = AtomicBool::new(false);

pub fn set_silent(silent: bool) {
    SILENT.store(silent, Ordering::Relaxed);
}

fn log_output(msg: String) {
    if !SILENT.load(Ordering::Relaxed) {
        println!("{}", msg);
    }
}

fn log_request(method: &Method, url: &str, body: Option<&Value>) {
    let mut parts = Vec::new();
    parts.push(Paint::new("curl").fg(yansi::Color::Green).bold().to_string());
    parts.push(format!("-X {}", Paint::new(method.as_str()).fg(yansi::Color::Yellow).bold()));
    parts.push(format!("'{}'", Paint::new(url).fg(yansi::Color::Cyan)));

    if let Some(d) = body {
        parts.push(format!("{} {}",
            Paint::new("-H").fg(yansi::Color::Magenta),
            Paint::new("'Content-Type: application/json'").fg(yansi::Color::Magenta)
        ));
        let json_str = serde_json::to_string_pretty(d).unwrap_or_default();
        let escaped_json = json_str.replace('\'', "'\\''");
        parts.push(format!("{} {}",
            Paint::new("-d").fg(yansi::Color::Blue),
            Paint::new(format!("'{}'", escaped_json)).fg(yansi::Color::White)
        ));
    }
    log_output(format!("Request:\n{}", parts.join(" ")));
}

/// Thin JSON-over-HTTP client for the deployment backend.
///
/// Every call is a single attempt; retrying is left to callers.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("fleetdeck/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the JSON body of a 2xx response into `T`.
    ///
    /// # Errors
    ///
    /// `GatewayError::Http` for non-2xx responses (carrying the backend's
    /// `message` when present), `GatewayError::Timeout` / `Transport` for
    /// network failures, `GatewayError::Malformed` for undecodable bodies.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, endpoint);
        log_request(&method, &url, body);

        let mut req = self.client.request(method.clone(), &url);
        if let Some(b) = body {
            req = req.json(b);
        }

        let response = req.send().await.map_err(GatewayError::from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(GatewayError::from_reqwest)?;

        if !status.is_success() {
            log_output(format!("Response:\n{}", Paint::new(format!("HTTP {}: {}", status, text)).fg(yansi::Color::Red)));
            let err = GatewayError::from_status(status.as_u16(), &text);
            tracing::warn!(%method, %url, status = status.as_u16(), "Backend rejected request: {}", err);
            return Err(err);
        }

        // Grayed out so payloads do not drown the request lines
        log_output(format!("Response:\n{}", Paint::new(&text).rgb(100, 100, 100)));

        let raw = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(raw).map_err(|e| {
            tracing::warn!(%method, %url, "Undecodable backend response: {}", e);
            GatewayError::Malformed(e.to_string())
        })
    }
}
