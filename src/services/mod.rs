pub mod error;
pub mod fleet_store;
pub mod identifiers;
pub mod identity;

// Re-export commonly used items
pub use error::{ErrorNotice, FleetError, ValidationError};
pub use fleet_store::{FleetStore, MAX_ACCELERATORS};
pub use identifiers::{IdentifierSource, RandomIdentifiers, SequentialIdentifiers};
pub use identity::{resolve_user_id, BearerTokenIdentity, IdentityProvider, StaticIdentity};
