/// Error types for fleet store operations
use serde::Serialize;
use thiserror::Error;

use crate::api::GatewayError;

/// Preconditions checked locally, before any network call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// An active principal already exists
    #[error("An active principal instance already exists ({existing_id})")]
    AlreadyExists { existing_id: String },

    /// Attaching would exceed the accelerator cap
    #[error("Accelerator limit reached: {active} active, {requested} requested, maximum {max}")]
    Capacity { active: usize, requested: usize, max: usize },

    /// Accelerator family differs from the active accelerators
    #[error("Accelerator type {found} does not match the {expected} family already in use")]
    TypeMismatch { expected: String, found: String },

    #[error("Instance type is required")]
    MissingInstanceType,

    #[error("At least one accelerator must be requested")]
    NoAccelerators,
}

/// Errors surfaced by the fleet store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FleetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Id does not reference an active instance of the expected kind
    #[error("Instance not found: {0}")]
    NotFound(String),

    /// A deploy, destroy or refresh is already in flight
    #[error("Another fleet operation is in progress")]
    Busy,

    /// No user id from the identity provider and no configured default
    #[error("No user identity available")]
    Unauthenticated,
}

impl FleetError {
    /// Short machine-readable kind used in API error bodies and error banners.
    pub fn kind(&self) -> &'static str {
        match self {
            FleetError::Validation(ValidationError::AlreadyExists { .. }) => "already_exists",
            FleetError::Validation(ValidationError::Capacity { .. }) => "capacity",
            FleetError::Validation(ValidationError::TypeMismatch { .. }) => "type_mismatch",
            FleetError::Validation(_) => "validation",
            FleetError::Gateway(e) => e.kind(),
            FleetError::NotFound(_) => "not_found",
            FleetError::Busy => "busy",
            FleetError::Unauthenticated => "unauthenticated",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, FleetError::Validation(_))
    }
}

/// The single error a dashboard shows at a time.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: String,
    pub message: String,
}

impl From<&FleetError> for ErrorNotice {
    fn from(err: &FleetError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_message_passes_through() {
        let err = FleetError::from(GatewayError::from_status(400, r#"{"message":"quota exceeded"}"#));
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.kind(), "gateway_http");
        assert!(!err.is_validation());
    }

    #[test]
    fn test_validation_kinds() {
        let err = FleetError::from(ValidationError::Capacity { active: 3, requested: 1, max: 3 });
        assert_eq!(err.kind(), "capacity");
        assert!(err.is_validation());
        let notice = ErrorNotice::from(&err);
        assert_eq!(notice.message, "Accelerator limit reached: 3 active, 1 requested, maximum 3");
    }
}
