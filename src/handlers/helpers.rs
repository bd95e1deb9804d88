use axum::extract::rejection::JsonRejection;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::sync::Arc;

use crate::api::GatewayError;
use crate::models::AppState;
use crate::services::{resolve_user_id, BearerTokenIdentity, FleetError, FleetStore, ValidationError};

/// Handler failure rendered as a `{kind, message}` JSON body.
#[derive(Debug)]
pub enum ApiError {
    Fleet(FleetError),
    /// Request body missing, not JSON, or not the expected shape
    Body(JsonRejection),
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        ApiError::Fleet(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Fleet(FleetError::Validation(ValidationError::AlreadyExists { .. })) => StatusCode::CONFLICT,
            ApiError::Fleet(FleetError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Fleet(FleetError::Busy) => StatusCode::CONFLICT,
            ApiError::Fleet(FleetError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Fleet(FleetError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Fleet(FleetError::Gateway(GatewayError::Timeout)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Fleet(FleetError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Body(rejection) => rejection.status(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Fleet(err) => err.kind(),
            ApiError::Body(_) => "invalid_body",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Fleet(err) => err.to_string(),
            ApiError::Body(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "kind": self.kind(),
            "message": self.message(),
        }));
        (self.status(), body).into_response()
    }
}

/// Resolve the caller from the `Authorization` header and return their store.
pub fn store_for_request(state: &AppState, headers: &HeaderMap) -> Result<Arc<FleetStore>, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let identity = BearerTokenIdentity::from_header(header);
    let user_id = resolve_user_id(&identity, state.default_user_id.as_deref())?;
    Ok(state.store_for(&user_id))
}
