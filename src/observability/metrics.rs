//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `configmap_sync_reconciliations_total` - Total number of reconciliations
//! - `configmap_sync_reconciliation_errors_total` - Total number of reconciliation errors
//! - `configmap_sync_reconciliation_duration_seconds` - Duration of reconciliation operations
//! - `configmap_sync_target_operations_total` - Target ConfigMap outcomes by result
//! - `configmap_sync_requeues_total` - Requeues by reason
//! - `configmap_sync_managed_targets` - Targets resolved in each syncer's most recent pass

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGaugeVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "configmap_sync_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "configmap_sync_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "configmap_sync_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static TARGET_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "configmap_sync_target_operations_total",
            "Total number of target ConfigMap operations by result",
        ),
        &["result"],
    )
    .expect("Failed to create TARGET_OPERATIONS_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "configmap_sync_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static MANAGED_TARGETS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new(
            "configmap_sync_managed_targets",
            "Number of target ConfigMaps resolved in the most recent pass of each ConfigMapSyncer",
        ),
        &["namespace", "name"],
    )
    .expect("Failed to create MANAGED_TARGETS metric - this should never happen")
});

/// Register all metrics with the registry
///
/// Call once at startup; a second call fails with a duplicate registration error.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(TARGET_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MANAGED_TARGETS.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

/// Count one target outcome: `created`, `updated`, `unchanged` or `failed`
pub fn record_target_operation(result: &str) {
    TARGET_OPERATIONS_TOTAL.with_label_values(&[result]).inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}

#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    reason = "target counts are far below i64::MAX"
)]
pub fn set_managed_targets(namespace: &str, name: &str, count: usize) {
    MANAGED_TARGETS
        .with_label_values(&[namespace, name])
        .set(count as i64);
}

/// Drop the gauge series of a deleted ConfigMapSyncer
pub fn remove_managed_targets(namespace: &str, name: &str) {
    // Err only means no pass ever recorded a value
    let _ = MANAGED_TARGETS.remove_label_values(&[namespace, name]);
}
