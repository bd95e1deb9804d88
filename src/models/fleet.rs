use serde::{Deserialize, Serialize};

use crate::models::Instance;
use crate::services::error::ErrorNotice;

/// One accelerator requested in an attach call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AcceleratorSpec {
    #[serde(rename = "type")]
    pub instance_type: String,
}

impl AcceleratorSpec {
    pub fn new(instance_type: impl Into<String>) -> Self {
        Self { instance_type: instance_type.into() }
    }
}

/// Read-only projection of a fleet, recomputed on every query.
#[derive(Debug, Clone, Serialize)]
pub struct FleetView {
    pub user_id: String,
    pub principal: Option<Instance>,
    pub accelerators: Vec<Instance>,
    pub remaining_accelerator_slots: usize,
    pub busy: bool,
    pub error: Option<ErrorNotice>,
}

/// Notification published after a change has been committed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    PrincipalDeployed { instance: Instance },
    AcceleratorsAttached { instances: Vec<Instance> },
    InstancesTerminated { ids: Vec<String> },
    Refreshed { active: usize },
    ErrorRaised { error: ErrorNotice },
    ErrorDismissed,
}

impl FleetEvent {
    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            FleetEvent::PrincipalDeployed { .. } => "principal.deployed",
            FleetEvent::AcceleratorsAttached { .. } => "accelerators.attached",
            FleetEvent::InstancesTerminated { .. } => "instances.terminated",
            FleetEvent::Refreshed { .. } => "fleet.refreshed",
            FleetEvent::ErrorRaised { .. } => "error.raised",
            FleetEvent::ErrorDismissed => "error.dismissed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_uses_type_key() {
        let spec: AcceleratorSpec = serde_json::from_str(r#"{"type":"g4dn.xlarge"}"#).unwrap();
        assert_eq!(spec, AcceleratorSpec::new("g4dn.xlarge"));
    }

    #[test]
    fn test_event_tagging() {
        let ev = FleetEvent::InstancesTerminated { ids: vec!["i-1".into()] };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "instances_terminated");
        assert_eq!(ev.name(), "instances.terminated");
    }
}
