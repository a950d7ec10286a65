//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use configmap_sync_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, BackoffState, ClusterClient, ClusterError, KubeClusterClient, NextAction,
    Reconciler, ReconcilerError,
};

pub use crate::config::ControllerConfig;
