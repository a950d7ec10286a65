//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::reconciler::cluster::{ClusterClient, ClusterError};
use crate::controller::reconciler::targets::ResolveError;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to fetch ConfigMapSyncer: {0}")]
    FetchSyncer(#[source] ClusterError),
    #[error("failed to update finalizers: {0}")]
    Finalizer(#[source] ClusterError),
    #[error("failed to fetch master ConfigMap: {0}")]
    FetchSource(#[source] ClusterError),
    #[error("failed to resolve target ConfigMaps: {0}")]
    ResolveTargets(#[from] ResolveError),
    #[error("failed to persist status: {0}")]
    PersistStatus(#[source] ClusterError),
}

/// What the scheduler should do after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    RequeueAfter(Duration),
    RequeueNow,
    NoRequeue,
}

impl NextAction {
    /// Label used for the requeue metric
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NextAction::RequeueAfter(_) => "requeue-after",
            NextAction::RequeueNow => "requeue-now",
            NextAction::NoRequeue => "no-requeue",
        }
    }
}

impl From<NextAction> for Action {
    fn from(next: NextAction) -> Self {
        match next {
            NextAction::RequeueAfter(delay) => Action::requeue(delay),
            NextAction::RequeueNow => Action::requeue(Duration::ZERO),
            NextAction::NoRequeue => Action::await_change(),
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Shared reconciliation context
#[derive(Clone)]
pub struct Reconciler {
    pub cluster: Arc<dyn ClusterClient>,
    pub config: ControllerConfig,
    // Keyed by namespace/name, only touched from the error policy and on success
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    // Set once on shutdown; passes stop issuing writes when they see it
    pub shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("shutdown", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(cluster: Arc<dyn ClusterClient>, config: ControllerConfig) -> Self {
        Self {
            cluster,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Signal in-flight passes to stop writing
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Clear the error backoff of one resource after a successful pass
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }

    /// Advance the error backoff of one resource, returning (delay seconds, error count)
    ///
    /// Falls back to the configured minimum if the state lock is poisoned.
    pub fn next_error_backoff(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(|| {
                        BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                    });
                state.increment_error();
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(e) => {
                tracing::warn!("Failed to lock backoff_states: {e}, using minimum backoff");
                (self.config.backoff_min_secs.max(1), 0)
            }
        }
    }
}
