//! # Reconciler
//!
//! Core reconciliation logic for `ConfigMapSyncer` resources.
//!
//! - `cluster`: the cluster operations a pass needs, behind a trait
//! - `lifecycle`: finalizer state machine
//! - `merge`: computes a target's payload from the master's
//! - `targets`: resolves target namespaces and ConfigMaps
//! - `sync`: creates or updates each target
//! - `status`: Ready condition tracking
//! - `reconcile`: ties the above into one pass

pub mod cluster;
pub mod lifecycle;
pub mod merge;
pub mod reconcile;
pub mod status;
pub mod sync;
pub mod targets;
pub mod types;

// Re-export public API
pub use cluster::{ClusterClient, ClusterError, KubeClusterClient};
pub use reconcile::reconcile;
pub use types::{BackoffState, NextAction, Reconciler, ReconcilerError};
