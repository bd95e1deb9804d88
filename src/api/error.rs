/// Error types for the deployment gateway
use thiserror::Error;

/// Failures talking to the deployment backend. Never retried here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Non-2xx response. `message` is the backend's `message` field when the
    /// body carried one, otherwise a generic text built from the status code.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure before any response arrived
    #[error("Request failed: {0}")]
    Transport(String),

    /// 2xx response whose body could not be understood
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Build the error for a non-2xx response from its raw body.
    ///
    /// # Examples
    ///
    /// ```
    /// use fleetdeck::api::GatewayError;
    ///
    /// let err = GatewayError::from_status(409, r#"{"message":"Instance already exists"}"#);
    /// assert_eq!(err.to_string(), "Instance already exists");
    ///
    /// let err = GatewayError::from_status(500, "<html>oops</html>");
    /// assert_eq!(err.to_string(), "HTTP error! status: 500");
    /// ```
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(|s| s.to_string()))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));
        GatewayError::Http { status, message }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    /// Short machine-readable kind used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Http { .. } => "gateway_http",
            GatewayError::Timeout => "gateway_timeout",
            GatewayError::Transport(_) => "gateway_transport",
            GatewayError::Malformed(_) => "gateway_malformed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_falls_back_to_status() {
        let err = GatewayError::from_status(400, r#"{"message":"  "}"#);
        assert_eq!(err, GatewayError::Http { status: 400, message: "HTTP error! status: 400".into() });
    }

    #[test]
    fn test_message_without_field() {
        let err = GatewayError::from_status(503, r#"{"error":"down"}"#);
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[test]
    fn test_kind() {
        assert_eq!(GatewayError::Timeout.kind(), "gateway_timeout");
        assert_eq!(GatewayError::Malformed("x".into()).kind(), "gateway_malformed");
    }
}
