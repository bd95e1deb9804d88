use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::base_type_prefix;

/// Endpoint value shown until the backend reports a real address.
pub const PENDING_ENDPOINT: &str = "Pending";

/// Place an instance occupies in a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceRole {
    /// The single workstation-class instance of a user.
    Principal,
    /// A GPU instance attached to a principal.
    Accelerator,
    /// Backend reported a hierarchy this client does not know.
    Unknown,
}

impl InstanceRole {
    /// Map the backend `hierarchy` field onto a local role.
    ///
    /// # Examples
    ///
    /// ```
    /// use fleetdeck::models::InstanceRole;
    ///
    /// assert_eq!(InstanceRole::from_hierarchy("principal"), InstanceRole::Principal);
    /// assert_eq!(InstanceRole::from_hierarchy("help"), InstanceRole::Accelerator);
    /// assert_eq!(InstanceRole::from_hierarchy("sidecar"), InstanceRole::Unknown);
    /// ```
    pub fn from_hierarchy(hierarchy: &str) -> Self {
        match hierarchy.trim().to_lowercase().as_str() {
            "principal" => InstanceRole::Principal,
            "help" => InstanceRole::Accelerator,
            _ => InstanceRole::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstanceRole::Principal => "Principal",
            InstanceRole::Accelerator => "Accelerator",
            InstanceRole::Unknown => "Unknown",
        }
    }
}

/// Lifecycle state of an instance. `Terminated` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Pending,
    Running,
    Stopping,
    Stopped,
    Terminated,
    Unknown,
}

impl InstanceStatus {
    /// Map the backend `State` field onto a local status.
    ///
    /// Unrecognised values become `Unknown` instead of failing.
    ///
    /// # Examples
    ///
    /// ```
    /// use fleetdeck::models::InstanceStatus;
    ///
    /// assert_eq!(InstanceStatus::from_backend("running"), InstanceStatus::Running);
    /// assert_eq!(InstanceStatus::from_backend("shutting-down"), InstanceStatus::Unknown);
    /// ```
    pub fn from_backend(state: &str) -> Self {
        match state.trim().to_lowercase().as_str() {
            "running" => InstanceStatus::Running,
            "pending" => InstanceStatus::Pending,
            "stopping" => InstanceStatus::Stopping,
            "stopped" => InstanceStatus::Stopped,
            "terminated" => InstanceStatus::Terminated,
            _ => InstanceStatus::Unknown,
        }
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, InstanceStatus::Terminated)
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstanceStatus::Pending => "Pending",
            InstanceStatus::Running => "Running",
            InstanceStatus::Stopping => "Stopping",
            InstanceStatus::Stopped => "Stopped",
            InstanceStatus::Terminated => "Terminated",
            InstanceStatus::Unknown => "Unknown",
        }
    }
}

/// Where a record came from. Accelerators are attached locally because the
/// backend only provisions principals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Backend,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub instance_type: String,
    pub role: InstanceRole,
    pub status: InstanceStatus,
    /// Principal this accelerator augments. Always `None` for principals.
    pub related_to: Option<String>,
    pub group_id: Option<String>,
    pub launched_at: DateTime<Utc>,
    /// Reachability address, or [`PENDING_ENDPOINT`].
    pub endpoint: String,
    pub origin: Origin,
}

impl Instance {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminated()
    }

    pub fn is_active_principal(&self) -> bool {
        self.is_active() && self.role == InstanceRole::Principal
    }

    pub fn is_active_accelerator(&self) -> bool {
        self.is_active() && self.role == InstanceRole::Accelerator
    }

    pub fn base_type(&self) -> &str {
        base_type_prefix(&self.instance_type)
    }

    pub fn has_endpoint(&self) -> bool {
        self.endpoint != PENDING_ENDPOINT
    }

    /// Whether terminating this record reaches the backend. Destroy is
    /// user-scoped, so only the principal can be destroyed remotely; any
    /// other record is terminated in the local list only.
    pub fn terminates_remotely(&self) -> bool {
        self.role == InstanceRole::Principal
    }

    /// Final transition. Returns false when the record was already terminated.
    pub fn mark_terminated(&mut self) -> bool {
        if self.status.is_terminated() {
            return false;
        }
        self.status = InstanceStatus::Terminated;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: InstanceStatus) -> Instance {
        Instance {
            id: "i-1".into(),
            name: "vw-pro-render-1".into(),
            instance_type: "g4dn.2xlarge".into(),
            role: InstanceRole::Accelerator,
            status,
            related_to: Some("i-0".into()),
            group_id: None,
            launched_at: Utc::now(),
            endpoint: PENDING_ENDPOINT.into(),
            origin: Origin::Local,
        }
    }

    #[test]
    fn test_status_table() {
        let table = [
            ("running", InstanceStatus::Running),
            ("pending", InstanceStatus::Pending),
            ("stopping", InstanceStatus::Stopping),
            ("stopped", InstanceStatus::Stopped),
            ("terminated", InstanceStatus::Terminated),
            ("RUNNING", InstanceStatus::Running),
            ("", InstanceStatus::Unknown),
            ("rebooting", InstanceStatus::Unknown),
        ];
        for (raw, expected) in table {
            assert_eq!(InstanceStatus::from_backend(raw), expected, "state {:?}", raw);
        }
    }

    #[test]
    fn test_role_table() {
        assert_eq!(InstanceRole::from_hierarchy("principal"), InstanceRole::Principal);
        assert_eq!(InstanceRole::from_hierarchy(" Help "), InstanceRole::Accelerator);
        assert_eq!(InstanceRole::from_hierarchy("gpu"), InstanceRole::Unknown);
    }

    #[test]
    fn test_terminated_is_final() {
        let mut inst = sample(InstanceStatus::Running);
        assert!(inst.mark_terminated());
        assert!(!inst.mark_terminated());
        assert!(!inst.is_active());
    }

    #[test]
    fn test_base_type_and_endpoint() {
        let inst = sample(InstanceStatus::Pending);
        assert_eq!(inst.base_type(), "g4dn");
        assert!(!inst.has_endpoint());
        assert!(inst.is_active_accelerator());
        assert!(!inst.is_active_principal());
    }

    #[test]
    fn test_only_principal_terminates_remotely() {
        let mut inst = sample(InstanceStatus::Running);
        assert!(!inst.terminates_remotely());
        inst.role = InstanceRole::Unknown;
        assert!(!inst.terminates_remotely());
        inst.role = InstanceRole::Principal;
        assert!(inst.terminates_remotely());
    }
}
