//! In-memory fleet of one user's instances.
//!
//! The store is the only writer of the instance list. It enforces:
//! - at most one active principal;
//! - at most [`MAX_ACCELERATORS`] active accelerators, all of one base type;
//! - every active accelerator points at an active principal, so terminating a
//!   principal terminates its accelerators in the same operation.
//!
//! Terminated records stay in the list with `status = Terminated` and are
//! excluded from every active view.
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::api::{DeploymentGateway, NormalizedInstance};
use crate::models::{
    AcceleratorSpec, FleetEvent, FleetView, Instance, InstanceRole, InstanceStatus, Origin, PENDING_ENDPOINT,
};
use crate::utils::{base_type_prefix, shares_base_type};

use super::error::{ErrorNotice, FleetError, ValidationError};
use super::identifiers::IdentifierSource;

pub const MAX_ACCELERATORS: usize = 3;

/// Instance type recorded when the backend does not report one.
pub const UNKNOWN_INSTANCE_TYPE: &str = "unknown";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct FleetState {
    instances: Vec<Instance>,
    last_error: Option<ErrorNotice>,
}

impl FleetState {
    fn active_principal(&self) -> Option<&Instance> {
        self.instances.iter().find(|i| i.is_active_principal())
    }

    fn active_accelerators(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(|i| i.is_active_accelerator())
    }

    fn find_active(&self, id: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.is_active() && i.id == id)
    }
}

/// Clears the busy flag when an operation ends, on every exit path.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct FleetStore {
    user_id: String,
    gateway: Arc<dyn DeploymentGateway>,
    ids: Arc<dyn IdentifierSource>,
    state: Mutex<FleetState>,
    busy: AtomicBool,
    events: broadcast::Sender<FleetEvent>,
}

impl FleetStore {
    pub fn new(user_id: impl Into<String>, gateway: Arc<dyn DeploymentGateway>, ids: Arc<dyn IdentifierSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            user_id: user_id.into(),
            gateway,
            ids,
            state: Mutex::new(FleetState::default()),
            busy: AtomicBool::new(false),
            events,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Receive every event committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.events.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Open event subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Nothing recorded, nothing in flight and nobody listening.
    pub fn is_idle(&self) -> bool {
        !self.is_busy() && self.subscriber_count() == 0 && self.lock().instances.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) -> Result<BusyGuard<'_>, FleetError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyGuard(&self.busy))
            .map_err(|_| FleetError::Busy)
    }

    fn publish(&self, event: FleetEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Record the outcome of a mutating operation as the single visible error state.
    fn settle<T>(&self, operation: &str, result: Result<T, FleetError>) -> Result<T, FleetError> {
        match &result {
            Ok(_) => {
                self.lock().last_error = None;
            }
            Err(err) => {
                let notice = ErrorNotice::from(err);
                if err.is_validation() {
                    tracing::warn!(user_id = %self.user_id, operation, "Rejected: {}", err);
                } else {
                    tracing::warn!(user_id = %self.user_id, operation, kind = err.kind(), "Failed: {}", err);
                }
                self.lock().last_error = Some(notice.clone());
                self.publish(FleetEvent::ErrorRaised { error: notice });
            }
        }
        result
    }

    // ---- Read views ----

    /// Active instances in insertion order.
    pub fn list_active(&self) -> Vec<Instance> {
        self.lock().instances.iter().filter(|i| i.is_active()).cloned().collect()
    }

    /// Every known record, terminated ones included.
    pub fn all(&self) -> Vec<Instance> {
        self.lock().instances.clone()
    }

    pub fn get(&self, id: &str) -> Option<Instance> {
        self.lock().instances.iter().find(|i| i.id == id).cloned()
    }

    pub fn principal(&self) -> Option<Instance> {
        self.lock().active_principal().cloned()
    }

    pub fn accelerators(&self) -> Vec<Instance> {
        self.lock().active_accelerators().cloned().collect()
    }

    pub fn remaining_accelerator_slots(&self) -> usize {
        MAX_ACCELERATORS.saturating_sub(self.lock().active_accelerators().count())
    }

    /// Principal an accelerator augments, if it is still known.
    pub fn related_principal(&self, accelerator: &Instance) -> Option<Instance> {
        let related = accelerator.related_to.as_deref()?;
        self.lock().instances.iter().find(|i| i.id == related).cloned()
    }

    pub fn last_error(&self) -> Option<ErrorNotice> {
        self.lock().last_error.clone()
    }

    pub fn dismiss_error(&self) {
        let had_error = self.lock().last_error.take().is_some();
        if had_error {
            self.publish(FleetEvent::ErrorDismissed);
        }
    }

    pub fn view(&self) -> FleetView {
        let state = self.lock();
        let accelerators: Vec<Instance> = state.active_accelerators().cloned().collect();
        FleetView {
            user_id: self.user_id.clone(),
            principal: state.active_principal().cloned(),
            remaining_accelerator_slots: MAX_ACCELERATORS.saturating_sub(accelerators.len()),
            accelerators,
            busy: self.is_busy(),
            error: state.last_error.clone(),
        }
    }

    // ---- Mutations ----

    /// Deploy the user's principal instance through the gateway.
    ///
    /// # Errors
    ///
    /// `ValidationError::AlreadyExists` (no network call) when a principal is
    /// active, `FleetError::Busy` while another operation is in flight, and
    /// any `GatewayError` from the backend. The list is untouched on failure.
    pub async fn deploy_principal(&self, instance_type: &str) -> Result<Instance, FleetError> {
        let result = self.try_deploy_principal(instance_type).await;
        self.settle("deploy_principal", result)
    }

    async fn try_deploy_principal(&self, instance_type: &str) -> Result<Instance, FleetError> {
        let instance_type = instance_type.trim();
        if instance_type.is_empty() {
            return Err(ValidationError::MissingInstanceType.into());
        }
        if let Some(existing) = self.lock().active_principal() {
            return Err(ValidationError::AlreadyExists { existing_id: existing.id.clone() }.into());
        }

        let _busy = self.begin()?;
        let normalized = self.gateway.deploy(instance_type, &self.user_id).await?;
        if normalized.role == InstanceRole::Accelerator {
            tracing::warn!(id = %normalized.id, "Backend reported an accelerator hierarchy for a deploy; recording as principal");
        }

        let instance = Instance {
            name: normalized.name.clone().unwrap_or_else(|| normalized.id.clone()),
            instance_type: normalized.instance_type.clone().unwrap_or_else(|| instance_type.to_string()),
            role: InstanceRole::Principal,
            status: normalized.status,
            related_to: None,
            group_id: Some(self.ids.group_id()),
            launched_at: normalized.launched_at.unwrap_or_else(Utc::now),
            endpoint: normalized.endpoint.clone().unwrap_or_else(|| PENDING_ENDPOINT.to_string()),
            origin: Origin::Backend,
            id: normalized.id,
        };

        {
            let mut state = self.lock();
            match state.instances.iter_mut().find(|i| i.id == instance.id) {
                Some(slot) => *slot = instance.clone(),
                None => state.instances.push(instance.clone()),
            }
        }
        tracing::info!(user_id = %self.user_id, id = %instance.id, instance_type = %instance.instance_type, status = instance.status.label(), "Principal deployed");
        self.publish(FleetEvent::PrincipalDeployed { instance: instance.clone() });
        Ok(instance)
    }

    /// Attach accelerators to an active principal. Local only: the backend
    /// has no accelerator provisioning endpoint.
    ///
    /// # Errors
    ///
    /// `FleetError::NotFound` when `principal_id` is not an active principal,
    /// `ValidationError::Capacity` past [`MAX_ACCELERATORS`],
    /// `ValidationError::TypeMismatch` when a spec leaves the active family.
    pub fn attach_accelerators(&self, principal_id: &str, specs: &[AcceleratorSpec]) -> Result<Vec<Instance>, FleetError> {
        let result = self.try_attach_accelerators(principal_id, specs);
        self.settle("attach_accelerators", result)
    }

    fn try_attach_accelerators(&self, principal_id: &str, specs: &[AcceleratorSpec]) -> Result<Vec<Instance>, FleetError> {
        if specs.is_empty() {
            return Err(ValidationError::NoAccelerators.into());
        }
        if specs.iter().any(|s| s.instance_type.trim().is_empty()) {
            return Err(ValidationError::MissingInstanceType.into());
        }
        let _busy = self.begin()?;

        let mut state = self.lock();
        let principal = state
            .find_active(principal_id)
            .filter(|i| i.role == InstanceRole::Principal)
            .ok_or_else(|| FleetError::NotFound(principal_id.to_string()))?;
        let group_id = principal.group_id.clone();

        let active: Vec<&Instance> = state.active_accelerators().collect();
        if active.len() + specs.len() > MAX_ACCELERATORS {
            return Err(ValidationError::Capacity {
                active: active.len(),
                requested: specs.len(),
                max: MAX_ACCELERATORS,
            }
            .into());
        }

        let reference = active
            .first()
            .map(|i| i.instance_type.clone())
            .unwrap_or_else(|| specs[0].instance_type.trim().to_string());
        if let Some(odd) = specs.iter().find(|s| !shares_base_type(&s.instance_type, &reference)) {
            return Err(ValidationError::TypeMismatch {
                expected: base_type_prefix(&reference).to_string(),
                found: odd.instance_type.trim().to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let created: Vec<Instance> = specs
            .iter()
            .map(|spec| Instance {
                id: self.ids.instance_id(),
                name: self.ids.instance_name(),
                instance_type: spec.instance_type.trim().to_string(),
                role: InstanceRole::Accelerator,
                status: InstanceStatus::Pending,
                related_to: Some(principal_id.to_string()),
                group_id: group_id.clone(),
                launched_at: now,
                endpoint: PENDING_ENDPOINT.to_string(),
                origin: Origin::Local,
            })
            .collect();
        state.instances.extend(created.iter().cloned());
        drop(state);

        tracing::info!(user_id = %self.user_id, principal_id, count = created.len(), "Accelerators attached");
        self.publish(FleetEvent::AcceleratorsAttached { instances: created.clone() });
        Ok(created)
    }

    /// Terminate an active instance.
    ///
    /// A principal is destroyed through the gateway first; on success it and
    /// every accelerator related to it are marked terminated together. Any
    /// other record is terminated locally only, since the backend destroy
    /// call is user-scoped and cannot address a single accelerator.
    ///
    /// Returns the ids that were terminated.
    pub async fn terminate(&self, instance_id: &str) -> Result<Vec<String>, FleetError> {
        let result = self.try_terminate(instance_id).await;
        self.settle("terminate", result)
    }

    async fn try_terminate(&self, instance_id: &str) -> Result<Vec<String>, FleetError> {
        let role = self
            .lock()
            .find_active(instance_id)
            .map(|i| i.role)
            .ok_or_else(|| FleetError::NotFound(instance_id.to_string()))?;

        let _busy = self.begin()?;
        if role == InstanceRole::Principal {
            self.gateway.destroy(&self.user_id).await?;
        } else if role == InstanceRole::Unknown {
            tracing::warn!(id = instance_id, "Terminating a record of unknown role locally only");
        }

        let terminated: Vec<String> = {
            let mut state = self.lock();
            let cascade = role == InstanceRole::Principal;
            state
                .instances
                .iter_mut()
                .filter(|i| {
                    i.id == instance_id
                        || (cascade && i.role == InstanceRole::Accelerator && i.related_to.as_deref() == Some(instance_id))
                })
                .filter_map(|i| i.mark_terminated().then(|| i.id.clone()))
                .collect()
        };

        tracing::info!(user_id = %self.user_id, id = instance_id, terminated = terminated.len(), "Instances terminated");
        self.publish(FleetEvent::InstancesTerminated { ids: terminated.clone() });
        Ok(terminated)
    }

    /// Re-synchronise with the backend's listing for this user.
    ///
    /// Backend records replace the list. Accelerators attached locally are
    /// kept while their principal is still active and the cap allows.
    /// Calling this twice against an unchanged backend yields the same list.
    ///
    /// # Errors
    ///
    /// A failed listing leaves the previous list in place; the error is
    /// returned and becomes the visible error state.
    pub async fn refresh(&self) -> Result<Vec<Instance>, FleetError> {
        let result = self.try_refresh().await;
        self.settle("refresh", result)
    }

    async fn try_refresh(&self) -> Result<Vec<Instance>, FleetError> {
        let _busy = self.begin()?;
        let records = self.gateway.list_resources(&self.user_id).await?;

        let active = {
            let mut state = self.lock();
            let rebuilt = self.rebuild(&state.instances, records);
            state.instances = rebuilt;
            state.instances.iter().filter(|i| i.is_active()).count()
        };

        tracing::info!(user_id = %self.user_id, active, "Fleet refreshed");
        self.publish(FleetEvent::Refreshed { active });
        Ok(self.list_active())
    }

    fn rebuild(&self, previous: &[Instance], records: Vec<NormalizedInstance>) -> Vec<Instance> {
        let known: HashMap<&str, &Instance> = previous.iter().map(|i| (i.id.as_str(), i)).collect();

        let mut rebuilt: Vec<Instance> = records
            .into_iter()
            .map(|record| {
                let prior = known.get(record.id.as_str()).copied();
                Instance {
                    name: record
                        .name
                        .or_else(|| prior.map(|p| p.name.clone()))
                        .unwrap_or_else(|| record.id.clone()),
                    instance_type: record
                        .instance_type
                        .or_else(|| prior.map(|p| p.instance_type.clone()))
                        .unwrap_or_else(|| UNKNOWN_INSTANCE_TYPE.to_string()),
                    role: record.role,
                    status: record.status,
                    related_to: prior.and_then(|p| p.related_to.clone()),
                    group_id: prior.and_then(|p| p.group_id.clone()),
                    launched_at: record
                        .launched_at
                        .or_else(|| prior.map(|p| p.launched_at))
                        .unwrap_or_else(Utc::now),
                    endpoint: record.endpoint.unwrap_or_else(|| PENDING_ENDPOINT.to_string()),
                    origin: Origin::Backend,
                    id: record.id,
                }
            })
            .collect();

        // The backend destroys per user, so only one principal can be managed.
        let mut first_principal: Option<String> = None;
        for inst in rebuilt.iter_mut().filter(|i| i.is_active_principal()) {
            if first_principal.is_none() {
                first_principal = Some(inst.id.clone());
            } else {
                tracing::warn!(user_id = %self.user_id, id = %inst.id, "Backend lists more than one active principal; marking terminated");
                inst.mark_terminated();
            }
        }

        // A principal seen for the first time starts a new group.
        if let Some(pid) = &first_principal {
            if let Some(p) = rebuilt.iter_mut().find(|i| &i.id == pid) {
                if p.group_id.is_none() {
                    p.group_id = Some(self.ids.group_id());
                }
            }
        }
        let principal = rebuilt
            .iter()
            .find(|i| i.is_active_principal())
            .map(|p| (p.id.clone(), p.group_id.clone()));

        // Backend accelerators carry no link; the user's single principal is the only candidate.
        // They are kept in listing order up to the cap, within the first one's family.
        let mut kept = 0usize;
        let mut family: Option<String> = None;
        for inst in rebuilt.iter_mut().filter(|i| i.is_active_accelerator()) {
            let Some((pid, group)) = &principal else {
                tracing::warn!(id = %inst.id, "Accelerator without an active principal; marking terminated");
                inst.mark_terminated();
                continue;
            };
            let same_family = family
                .as_deref()
                .map_or(true, |f| shares_base_type(f, &inst.instance_type));
            if kept >= MAX_ACCELERATORS || !same_family {
                tracing::warn!(id = %inst.id, instance_type = %inst.instance_type, "Accelerator exceeds the cap or family; marking terminated");
                inst.mark_terminated();
                continue;
            }
            if family.is_none() {
                family = Some(inst.instance_type.clone());
            }
            kept += 1;
            inst.related_to = Some(pid.clone());
            if inst.group_id.is_none() {
                inst.group_id = group.clone();
            }
        }

        if let Some((pid, _)) = &principal {
            let mut slots = MAX_ACCELERATORS.saturating_sub(kept);
            for local in previous.iter().filter(|i| {
                i.origin == Origin::Local && i.is_active_accelerator() && i.related_to.as_deref() == Some(pid.as_str())
            }) {
                if rebuilt.iter().any(|i| i.id == local.id) {
                    continue;
                }
                let compatible = family
                    .as_deref()
                    .map_or(true, |f| shares_base_type(f, &local.instance_type));
                if slots == 0 || !compatible {
                    tracing::warn!(id = %local.id, "Dropping locally attached accelerator that no longer fits the fleet");
                    continue;
                }
                if family.is_none() {
                    family = Some(local.instance_type.clone());
                }
                slots -= 1;
                rebuilt.push(local.clone());
            }
        }

        rebuilt
    }
}
