//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::ConfigMapSyncer;
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per resource, so one failing resource does not
/// slow down retries of another.
pub fn handle_reconciliation_error(
    obj: Arc<ConfigMapSyncer>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {:?}", namespace, name, error);
    metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = ctx.next_error_backoff(&resource_key);

    info!(
        backoff_seconds,
        error_count, "Retrying with Fibonacci backoff (trigger source: error-backoff)"
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Broad class of a controller stream error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// 401, RBAC revoked or token expired
    Unauthorized,
    /// 410, resource version too old; the watcher relists
    Expired,
    /// 429, API server storage reinitializing or throttling
    TooManyRequests,
    /// 404, CRD missing or object deleted mid-flight
    NotFound,
    Other,
}

/// Classify a controller stream error from its debug rendering
///
/// 404 is checked before 401: a plain-text 404 body surfaces as a decode error
/// whose chain also mentions the failed watch.
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::TooManyRequests
    } else if is_not_found {
        WatchErrorKind::NotFound
    } else {
        WatchErrorKind::Other
    }
}

/// Log a controller stream error according to its class
pub fn handle_watch_stream_error(error_string: &str) -> WatchErrorKind {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    let kind = classify_watch_error(error_string);
    match kind {
        WatchErrorKind::Unauthorized => {
            error!(
                "Watch authentication failed (401 Unauthorized) - check the controller's ClusterRole and ServiceAccount token"
            );
        }
        WatchErrorKind::Expired => {
            warn!(error_type = "410", "watch.error.resource_version_expired");
        }
        WatchErrorKind::TooManyRequests => {
            warn!(error_type = "429", "API server throttling or reinitializing storage");
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Resource not found (404) - expected if it was deleted or the CRD is missing: {}",
                error_string
            );
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
        }
    }
    kind
}
