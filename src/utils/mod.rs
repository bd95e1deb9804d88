// Instance type helpers
pub mod instance_type;

// Display helpers
pub mod status_formatter;

pub use instance_type::{base_type_prefix, shares_base_type};
pub use status_formatter::paint_status;
