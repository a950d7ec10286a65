//! ConfigMap Sync Controller Library
//!
//! Propagates a master ConfigMap into target ConfigMaps across namespaces,
//! driven by `ConfigMapSyncer` custom resources.
//!
//! ## Quick Start
//!
//! ```rust
//! use configmap_sync_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod runtime;
