use yansi::Paint;

use crate::models::InstanceStatus;

/// Colourised status label for terminal tables.
pub fn paint_status(status: InstanceStatus) -> String {
    let label = status.label();
    match status {
        InstanceStatus::Running => Paint::new(label).green().to_string(),
        InstanceStatus::Pending | InstanceStatus::Stopping => Paint::new(label).yellow().to_string(),
        InstanceStatus::Terminated => Paint::new(label).red().to_string(),
        InstanceStatus::Stopped | InstanceStatus::Unknown => Paint::new(label).dim().to_string(),
    }
}
