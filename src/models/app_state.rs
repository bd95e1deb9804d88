use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::DeploymentGateway;
use crate::services::{FleetStore, IdentifierSource};

#[derive(Clone)]
pub struct AppState {
    /// One store per user id, created on first request. Stores that hold
    /// nothing are evicted whenever a new one is created.
    pub stores: Arc<Mutex<HashMap<String, Arc<FleetStore>>>>,
    pub gateway: Arc<dyn DeploymentGateway>,
    pub ids: Arc<dyn IdentifierSource>,
    pub default_user_id: Option<String>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn DeploymentGateway>, ids: Arc<dyn IdentifierSource>, default_user_id: Option<String>) -> Self {
        Self {
            stores: Arc::new(Mutex::new(HashMap::new())),
            gateway,
            ids,
            default_user_id,
        }
    }

    pub fn store_for(&self, user_id: &str) -> Arc<FleetStore> {
        let mut stores = self.stores.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(store) = stores.get(user_id) {
            return store.clone();
        }

        // Identities are unverified bearer subjects; keep only stores with state or users.
        let before = stores.len();
        stores.retain(|_, store| Arc::strong_count(store) > 1 || !store.is_idle());
        if stores.len() < before {
            tracing::debug!(evicted = before - stores.len(), "Evicted idle fleet stores");
        }

        tracing::debug!(user_id, "Creating fleet store");
        let store = Arc::new(FleetStore::new(user_id, self.gateway.clone(), self.ids.clone()));
        stores.insert(user_id.to_string(), store.clone());
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GatewayError, NormalizedInstance};
    use crate::services::SequentialIdentifiers;
    use async_trait::async_trait;

    struct RefusingGateway;

    #[async_trait]
    impl DeploymentGateway for RefusingGateway {
        async fn deploy(&self, _instance_type: &str, _user_id: &str) -> Result<NormalizedInstance, GatewayError> {
            Err(GatewayError::Transport("offline".into()))
        }

        async fn destroy(&self, _user_id: &str) -> Result<(), GatewayError> {
            Err(GatewayError::Transport("offline".into()))
        }

        async fn list_resources(&self, _user_id: &str) -> Result<Vec<NormalizedInstance>, GatewayError> {
            Err(GatewayError::Transport("offline".into()))
        }
    }

    fn state() -> AppState {
        AppState::new(Arc::new(RefusingGateway), Arc::new(SequentialIdentifiers::new()), None)
    }

    #[test]
    fn test_same_user_gets_same_store() {
        let state = state();
        let a = state.store_for("alice");
        let b = state.store_for("alice");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_idle_stores_are_evicted() {
        let state = state();
        drop(state.store_for("ghost-1"));
        drop(state.store_for("ghost-2"));
        drop(state.store_for("ghost-3"));
        assert_eq!(state.stores.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_held_or_subscribed_stores_survive() {
        let state = state();
        let held = state.store_for("alice");
        let _rx = state.store_for("bob").subscribe();
        state.store_for("carol");

        let stores = state.stores.lock().unwrap();
        assert!(stores.contains_key("alice"));
        assert!(stores.contains_key("bob"));
        assert!(stores.contains_key("carol"));
        drop(held);
    }
}
