use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::error::FleetError;

/// External identity/session collaborator.
pub trait IdentityProvider {
    fn user_id(&self) -> Option<String>;
}

/// Identity fixed at construction (CLI flag or environment).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<String>);

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> Option<String> {
        self.0.clone().filter(|id| !id.trim().is_empty())
    }
}

/// Reads the `sub` claim of a bearer JWT issued by the identity service.
///
/// The signature is not checked here; tokens are verified by the identity
/// service in front of this process.
#[derive(Debug, Clone)]
pub struct BearerTokenIdentity {
    token: Option<String>,
}

impl BearerTokenIdentity {
    /// Build from a raw `Authorization` header value.
    pub fn from_header(header: Option<&str>) -> Self {
        let token = header
            .map(str::trim)
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { token }
    }
}

impl IdentityProvider for BearerTokenIdentity {
    fn user_id(&self) -> Option<String> {
        let token = self.token.as_deref()?;
        match subject_from_jwt(token) {
            Some(sub) => Some(sub),
            None => {
                tracing::debug!("Bearer token carried no readable subject");
                None
            }
        }
    }
}

fn subject_from_jwt(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("sub")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
}

/// Resolve the acting user, falling back to a configured default id.
///
/// # Errors
///
/// `FleetError::Unauthenticated` when the provider has no id and no default
/// is configured.
pub fn resolve_user_id(provider: &dyn IdentityProvider, default_user_id: Option<&str>) -> Result<String, FleetError> {
    if let Some(id) = provider.user_id() {
        return Ok(id);
    }
    match default_user_id.map(str::trim).filter(|d| !d.is_empty()) {
        Some(fallback) => {
            tracing::warn!(user_id = fallback, "No user identity available; using configured default user id");
            Ok(fallback.to_string())
        }
        None => Err(FleetError::Unauthenticated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(claims: &str) -> String {
        format!("eyJhbGciOiJSUzI1NiJ9.{}.c2lnbmF0dXJl", URL_SAFE_NO_PAD.encode(claims))
    }

    #[test]
    fn test_bearer_subject() {
        let header = format!("Bearer {}", token_with(r#"{"sub":"8f2c-user","token_use":"access"}"#));
        let identity = BearerTokenIdentity::from_header(Some(&header));
        assert_eq!(identity.user_id().as_deref(), Some("8f2c-user"));
    }

    #[test]
    fn test_bearer_without_sub() {
        let header = format!("Bearer {}", token_with(r#"{"scope":"openid"}"#));
        assert!(BearerTokenIdentity::from_header(Some(&header)).user_id().is_none());
        assert!(BearerTokenIdentity::from_header(Some("Basic abc")).user_id().is_none());
        assert!(BearerTokenIdentity::from_header(Some("Bearer not-a-jwt")).user_id().is_none());
        assert!(BearerTokenIdentity::from_header(None).user_id().is_none());
    }

    #[test]
    fn test_resolve_prefers_provider() {
        let id = resolve_user_id(&StaticIdentity(Some("alice".into())), Some("123")).unwrap();
        assert_eq!(id, "alice");
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let id = resolve_user_id(&StaticIdentity(None), Some("123")).unwrap();
        assert_eq!(id, "123");
    }

    #[test]
    fn test_resolve_without_default_fails() {
        assert_eq!(resolve_user_id(&StaticIdentity(Some("  ".into())), None), Err(FleetError::Unauthenticated));
        assert_eq!(resolve_user_id(&StaticIdentity(None), Some("")), Err(FleetError::Unauthenticated));
    }
}
