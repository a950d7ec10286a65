//! # Runtime
//!
//! Process wiring around the reconciler.
//!
//! - `initialization`: rustls, tracing, metrics, probe server, Kubernetes client
//! - `watch_loop`: the `kube_runtime::Controller` driving reconciliations
//! - `error_policy`: backoff after failed passes and watch error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
