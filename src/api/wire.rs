//! Request and response bodies of the deployment backend, and their mapping
//! onto the local vocabulary.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{InstanceRole, InstanceStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployRequest {
    pub user_id: String,
    pub instance_name: String,
    pub instance_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestroyRequest {
    pub user_id: String,
}

/// `State` arrives either as a bare string or as an EC2-style
/// `{"Code": 16, "Name": "running"}` object.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BackendState {
    Name(String),
    Object {
        #[serde(rename = "Name")]
        name: String,
    },
}

impl BackendState {
    pub fn as_str(&self) -> &str {
        match self {
            BackendState::Name(s) => s,
            BackendState::Object { name } => name,
        }
    }
}

/// Instance record as the backend reports it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackendInstance {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "State")]
    pub state: BackendState,
    #[serde(default)]
    pub hierarchy: Option<String>,
    #[serde(rename = "LaunchTime", default)]
    pub launch_time: Option<String>,
    #[serde(rename = "PrivateIp", default)]
    pub private_ip: Option<String>,
    #[serde(rename = "InstanceType", default)]
    pub instance_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceListing {
    pub instances: Vec<BackendInstance>,
}

/// A backend record translated into local enums.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInstance {
    pub id: String,
    pub name: Option<String>,
    pub instance_type: Option<String>,
    pub status: InstanceStatus,
    pub role: InstanceRole,
    pub launched_at: Option<DateTime<Utc>>,
    pub endpoint: Option<String>,
}

impl From<BackendInstance> for NormalizedInstance {
    fn from(raw: BackendInstance) -> Self {
        let status = InstanceStatus::from_backend(raw.state.as_str());
        let role = raw
            .hierarchy
            .as_deref()
            .map(InstanceRole::from_hierarchy)
            .unwrap_or(InstanceRole::Unknown);
        let launched_at = raw.launch_time.as_deref().and_then(parse_launch_time);
        NormalizedInstance {
            id: raw.instance_id,
            name: non_blank(raw.name),
            instance_type: non_blank(raw.instance_type),
            status,
            role,
            launched_at,
            endpoint: non_blank(raw.private_ip),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_launch_time(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!("Ignoring unparsable LaunchTime {:?}: {}", raw, e);
            None
        }
    }
}
