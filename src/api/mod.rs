// Deployment backend access
pub mod client;
pub mod error;
pub mod gateway;
pub mod wire;

// Re-export commonly used items
pub use client::{set_silent, ApiClient};
pub use error::GatewayError;
pub use gateway::{DeploymentGateway, HttpGateway};
pub use wire::{BackendInstance, NormalizedInstance};
