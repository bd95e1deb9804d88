pub mod catalog;
pub mod events;
pub mod fleet;
pub mod helpers;
pub mod system;
