pub mod app_state;
pub mod catalog;
pub mod fleet;
pub mod instance;

pub use app_state::AppState;
pub use catalog::{compatible_accelerators, gpu_model, Catalog, InstanceTypeOption};
pub use fleet::{AcceleratorSpec, FleetEvent, FleetView};
pub use instance::{Instance, InstanceRole, InstanceStatus, Origin, PENDING_ENDPOINT};
