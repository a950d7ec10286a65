//! # Lifecycle
//!
//! Finalizer state machine for `ConfigMapSyncer` resources.
//!
//! | finalizer | deletionTimestamp | state              | action            |
//! |-----------|-------------------|--------------------|-------------------|
//! | no        | no                | `NoFinalizer`      | `AddFinalizer`    |
//! | yes       | no                | `FinalizerPresent` | `Sync`            |
//! | yes       | yes               | `Deleting`         | `RemoveFinalizer` |
//! | no        | yes               | `Removed`          | `Ignore`          |
//!
//! Target ConfigMaps are never deleted: removing the finalizer is the only
//! cleanup, and it never depends on the master ConfigMap being readable.

use crate::constants::FINALIZER_NAME;
use crate::crd::ConfigMapSyncer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NoFinalizer,
    FinalizerPresent,
    Deleting,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Persist the finalizer and requeue immediately, no sync this pass
    AddFinalizer,
    /// Run a full sync pass
    Sync,
    /// Drop the finalizer so the API server can finish deletion
    RemoveFinalizer,
    /// Nothing left to do for this identity
    Ignore,
}

impl LifecycleState {
    #[must_use]
    pub fn classify(has_finalizer: bool, deletion_marked: bool) -> Self {
        match (has_finalizer, deletion_marked) {
            (false, false) => LifecycleState::NoFinalizer,
            (true, false) => LifecycleState::FinalizerPresent,
            (true, true) => LifecycleState::Deleting,
            (false, true) => LifecycleState::Removed,
        }
    }

    #[must_use]
    pub fn of(syncer: &ConfigMapSyncer) -> Self {
        Self::classify(
            has_finalizer(syncer),
            syncer.metadata.deletion_timestamp.is_some(),
        )
    }

    #[must_use]
    pub fn action(self) -> LifecycleAction {
        match self {
            LifecycleState::NoFinalizer => LifecycleAction::AddFinalizer,
            LifecycleState::FinalizerPresent => LifecycleAction::Sync,
            LifecycleState::Deleting => LifecycleAction::RemoveFinalizer,
            LifecycleState::Removed => LifecycleAction::Ignore,
        }
    }
}

#[must_use]
pub fn has_finalizer(syncer: &ConfigMapSyncer) -> bool {
    syncer
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == FINALIZER_NAME))
}

/// Add the controller's finalizer; returns false if it was already present
pub fn add_finalizer(syncer: &mut ConfigMapSyncer) -> bool {
    if has_finalizer(syncer) {
        return false;
    }
    syncer
        .metadata
        .finalizers
        .get_or_insert_with(Vec::new)
        .push(FINALIZER_NAME.to_string());
    true
}

/// Remove the controller's finalizer, leaving others in place; returns false if absent
pub fn remove_finalizer(syncer: &mut ConfigMapSyncer) -> bool {
    let Some(finalizers) = syncer.metadata.finalizers.as_mut() else {
        return false;
    };
    let before = finalizers.len();
    finalizers.retain(|f| f != FINALIZER_NAME);
    before != finalizers.len()
}
