use serde::Serialize;

use crate::utils::shares_base_type;

/// One selectable instance shape.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct InstanceTypeOption {
    pub value: &'static str,
    pub gpu: &'static str,
    pub label: String,
}

impl InstanceTypeOption {
    fn new(value: &'static str) -> Self {
        let gpu = gpu_model(value);
        Self {
            value,
            gpu,
            label: format!("{} - {}", value, gpu),
        }
    }
}

const PRINCIPAL_TYPES: &[&str] = &[
    "g4dn.xlarge",
    "g4dn.2xlarge",
    "g5.xlarge",
    "g5.2xlarge",
    "p3.2xlarge",
    "p4d.24xlarge",
];

const ACCELERATOR_TYPES: &[&str] = &[
    "g4dn.xlarge",
    "g4dn.2xlarge",
    "g5.xlarge",
    "g5.2xlarge",
    "p3.2xlarge",
    "inf2.xlarge",
];

/// GPU carried by an instance family.
///
/// # Examples
///
/// ```
/// use fleetdeck::models::gpu_model;
///
/// assert_eq!(gpu_model("g4dn.xlarge"), "NVIDIA T4");
/// assert_eq!(gpu_model("p4d.24xlarge"), "8x NVIDIA A100");
/// assert_eq!(gpu_model("m5.large"), "GPU");
/// ```
pub fn gpu_model(instance_type: &str) -> &'static str {
    let t = instance_type.trim().to_lowercase();
    if t.starts_with("g4") {
        "NVIDIA T4"
    } else if t.starts_with("g5") {
        "NVIDIA A10G"
    } else if t.starts_with("p3") {
        "NVIDIA V100"
    } else if t.starts_with("p4d") {
        "8x NVIDIA A100"
    } else if t.starts_with("inf2") {
        "AWS Inferentia2"
    } else {
        "GPU"
    }
}

pub fn principal_types() -> Vec<InstanceTypeOption> {
    PRINCIPAL_TYPES.iter().copied().map(InstanceTypeOption::new).collect()
}

pub fn accelerator_types() -> Vec<InstanceTypeOption> {
    ACCELERATOR_TYPES.iter().copied().map(InstanceTypeOption::new).collect()
}

/// Accelerator shapes that may join the current accelerators.
///
/// With no active accelerator every shape is offered; otherwise only the
/// shapes of the same family as `existing_type`.
pub fn compatible_accelerators(existing_type: Option<&str>) -> Vec<InstanceTypeOption> {
    match existing_type {
        Some(existing) => accelerator_types()
            .into_iter()
            .filter(|opt| shares_base_type(opt.value, existing))
            .collect(),
        None => accelerator_types(),
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Catalog {
    pub principal: Vec<InstanceTypeOption>,
    pub accelerators: Vec<InstanceTypeOption>,
}

impl Catalog {
    pub fn load() -> Self {
        Self {
            principal: principal_types(),
            accelerators: accelerator_types(),
        }
    }
}
