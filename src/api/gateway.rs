use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::client::ApiClient;
use super::error::GatewayError;
use super::wire::{BackendInstance, DeployRequest, DestroyRequest, NormalizedInstance, ResourceListing};
use crate::services::identifiers::IdentifierSource;

pub const DEPLOY_PATH: &str = "/api/v1/deploy";
pub const DESTROY_PATH: &str = "/api/v1/destroy";
pub const USER_RESOURCES_PATH: &str = "/api/v1/user-resources";

/// Boundary between the fleet store and the deployment backend.
///
/// Implementations hold no state between calls.
#[async_trait]
pub trait DeploymentGateway: Send + Sync {
    /// Request a new principal instance of `instance_type` for `user_id`.
    async fn deploy(&self, instance_type: &str, user_id: &str) -> Result<NormalizedInstance, GatewayError>;

    /// Destroy the user's current principal. The backend scopes this to the
    /// user, not to an instance id.
    async fn destroy(&self, user_id: &str) -> Result<(), GatewayError>;

    /// Full resource listing for `user_id`.
    async fn list_resources(&self, user_id: &str) -> Result<Vec<NormalizedInstance>, GatewayError>;
}

/// `DeploymentGateway` speaking the backend's JSON-over-HTTP contract.
pub struct HttpGateway {
    api: ApiClient,
    ids: Arc<dyn IdentifierSource>,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration, ids: Arc<dyn IdentifierSource>) -> Result<Self, GatewayError> {
        Ok(Self {
            api: ApiClient::new(base_url, timeout)?,
            ids,
        })
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }
}

fn to_body<T: serde::Serialize>(payload: &T) -> Result<Value, GatewayError> {
    serde_json::to_value(payload).map_err(|e| GatewayError::Malformed(e.to_string()))
}

#[async_trait]
impl DeploymentGateway for HttpGateway {
    async fn deploy(&self, instance_type: &str, user_id: &str) -> Result<NormalizedInstance, GatewayError> {
        let request = DeployRequest {
            user_id: user_id.to_string(),
            instance_name: self.ids.instance_name(),
            instance_type: instance_type.to_string(),
        };
        let body = to_body(&request)?;
        let raw: BackendInstance = self.api.send_json(Method::POST, DEPLOY_PATH, Some(&body)).await?;
        let mut normalized = NormalizedInstance::from(raw);
        if normalized.name.is_none() {
            normalized.name = Some(request.instance_name);
        }
        if normalized.instance_type.is_none() {
            normalized.instance_type = Some(request.instance_type);
        }
        tracing::debug!(id = %normalized.id, status = ?normalized.status, "Deploy acknowledged");
        Ok(normalized)
    }

    async fn destroy(&self, user_id: &str) -> Result<(), GatewayError> {
        let body = to_body(&DestroyRequest { user_id: user_id.to_string() })?;
        // The acknowledgement shape is backend-defined; only success matters.
        let _ack: Value = self.api.send_json(Method::POST, DESTROY_PATH, Some(&body)).await?;
        Ok(())
    }

    async fn list_resources(&self, user_id: &str) -> Result<Vec<NormalizedInstance>, GatewayError> {
        let endpoint = format!("{}/{}", USER_RESOURCES_PATH, urlencoding::encode(user_id));
        let listing: ResourceListing = self.api.send_json(Method::GET, &endpoint, None).await?;
        tracing::debug!("Backend listed {} instances for user", listing.instances.len());
        Ok(listing.instances.into_iter().map(NormalizedInstance::from).collect())
    }
}
