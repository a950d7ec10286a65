//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Interval values are defaults; `ControllerConfig` can override the ones that
//! are operational knobs rather than part of the resource contract.

/// Finalizer placed on every `ConfigMapSyncer` before its first sync pass
pub const FINALIZER_NAME: &str = "configmapsyncer.conf-sync.com/finalizer";

/// Label written on every target ConfigMap, value is `<sourceNamespace>.<sourceName>`
pub const SOURCE_CONFIGMAP_LABEL: &str = "configmapsyncer.conf-sync.com/source";

/// Field manager / controller name used for API writes and log context
pub const CONTROLLER_NAME: &str = "configmap-sync-controller";

/// Type of the single aggregate condition
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Sync interval used when the spec leaves it unset or below the minimum (seconds)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Smallest sync interval the CRD schema accepts (seconds)
pub const MIN_SYNC_INTERVAL_SECS: i32 = 1;

/// Requeue delay while the master ConfigMap does not exist (seconds)
pub const DEFAULT_SOURCE_NOT_FOUND_REQUEUE_SECS: u64 = 60;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Lower bound of the Fibonacci backoff used after reconciliation errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Upper bound of the Fibonacci backoff used after reconciliation errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting the watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default bound on concurrently running reconciliations
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;
