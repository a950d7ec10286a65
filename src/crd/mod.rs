//! # Custom Resource Definitions
//!
//! CRD types for the ConfigMap Sync Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `ConfigMapSyncer` specification, merge strategy and defaults
//! - `status.rs` - Status types: aggregate conditions and per-target sync records

mod spec;
mod status;

// Re-export all public types
pub use spec::{
    default_sync_interval, ConfigMapReference, ConfigMapSyncer, ConfigMapSyncerSpec,
    MergeStrategy, ResolvedStrategy,
};
pub use status::{
    Condition, ConditionReason, ConditionStatus, ConfigMapSyncerStatus, SyncState, SyncStatus,
};
