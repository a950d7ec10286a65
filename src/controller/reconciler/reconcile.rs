//! # Reconcile
//!
//! One reconciliation pass for a single `ConfigMapSyncer` identity.
//!
//! 1. Fetch the syncer fresh. Gone means nothing to do.
//! 2. Run the finalizer state machine. Adding or removing the finalizer ends
//!    the pass; only `FinalizerPresent` goes on to sync.
//! 3. Fetch the master ConfigMap. Missing sets Ready=False and requeues after a
//!    short fixed delay.
//! 4. Resolve targets and sync each one.
//! 5. Replace `syncStatuses`, set Ready=True and persist.
//!
//! Ready=True means the pass completed. Individual targets may still be
//! `Failed`; their records carry the detail.

use crate::controller::reconciler::lifecycle::{
    add_finalizer, remove_finalizer, LifecycleAction, LifecycleState,
};
use crate::controller::reconciler::merge::Payload;
use crate::controller::reconciler::status::{now_rfc3339, set_ready, summarize};
use crate::controller::reconciler::sync::sync_targets;
use crate::controller::reconciler::targets::resolve_targets;
use crate::controller::reconciler::types::{NextAction, Reconciler, ReconcilerError};
use crate::crd::{ConditionReason, ConditionStatus, ConfigMapSyncer, ConfigMapSyncerStatus};
use crate::observability::metrics;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Reconcile the `ConfigMapSyncer` at `namespace/name`
///
/// Per-target failures never surface here; they are recorded in status.
/// Errors are returned only when the pass itself could not run or its result
/// could not be persisted.
pub async fn reconcile(
    namespace: &str,
    name: &str,
    ctx: &Reconciler,
) -> Result<NextAction, ReconcilerError> {
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.namespace = namespace,
        resource.name = name
    );
    let start = Instant::now();
    metrics::increment_reconciliations();

    let result = reconcile_pass(namespace, name, ctx).instrument(span).await;

    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    if let Ok(next) = &result {
        metrics::increment_requeues_total(next.as_str());
        ctx.reset_backoff(&format!("{namespace}/{name}"));
    }
    result
}

async fn reconcile_pass(
    namespace: &str,
    name: &str,
    ctx: &Reconciler,
) -> Result<NextAction, ReconcilerError> {
    let Some(mut syncer) = ctx
        .cluster
        .get_syncer(namespace, name)
        .await
        .map_err(ReconcilerError::FetchSyncer)?
    else {
        debug!("ConfigMapSyncer no longer exists, nothing to do");
        return Ok(NextAction::NoRequeue);
    };

    let state = LifecycleState::of(&syncer);
    match state.action() {
        LifecycleAction::AddFinalizer => {
            add_finalizer(&mut syncer);
            persist_finalizers(ctx, &syncer).await?;
            info!("Added finalizer, requeueing for first sync");
            Ok(NextAction::RequeueNow)
        }
        LifecycleAction::RemoveFinalizer => {
            remove_finalizer(&mut syncer);
            persist_finalizers(ctx, &syncer).await?;
            metrics::remove_managed_targets(namespace, name);
            info!("ConfigMapSyncer is being deleted, removed finalizer");
            Ok(NextAction::NoRequeue)
        }
        LifecycleAction::Ignore => {
            debug!(?state, "Deletion in progress without our finalizer, skipping");
            Ok(NextAction::NoRequeue)
        }
        LifecycleAction::Sync => sync_pass(namespace, name, &syncer, ctx).await,
    }
}

async fn persist_finalizers(
    ctx: &Reconciler,
    syncer: &ConfigMapSyncer,
) -> Result<(), ReconcilerError> {
    match ctx.cluster.update_syncer(syncer).await {
        Ok(_) => Ok(()),
        // Deleted between read and write, the finalizer no longer matters
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ReconcilerError::Finalizer(e)),
    }
}

async fn sync_pass(
    namespace: &str,
    name: &str,
    syncer: &ConfigMapSyncer,
    ctx: &Reconciler,
) -> Result<NextAction, ReconcilerError> {
    let spec = &syncer.spec;
    let source = &spec.master_config_map;
    let mut status = syncer.status.clone().unwrap_or_default();

    let resolved = spec.strategy();
    if let Some(token) = resolved.unrecognized.as_deref() {
        warn!(
            merge_strategy = token,
            "Unrecognized merge strategy, falling back to Merge"
        );
    }

    let source_config_map = match ctx
        .cluster
        .get_config_map(&source.namespace, &source.name)
        .await
    {
        Ok(Some(config_map)) => config_map,
        Ok(None) => {
            warn!(source = %source, "Master ConfigMap not found");
            set_ready(
                &mut status,
                ConditionStatus::False,
                ConditionReason::MasterConfigMapNotFound,
                format!("Master ConfigMap {source} not found"),
                &now_rfc3339(),
            );
            persist_status(ctx, namespace, name, &status).await?;
            return Ok(NextAction::RequeueAfter(
                ctx.config.source_not_found_requeue(),
            ));
        }
        Err(e) => {
            let message = format!("Failed to fetch master ConfigMap {source}: {e}");
            record_failure(ctx, namespace, name, &mut status, message).await;
            return Err(ReconcilerError::FetchSource(e));
        }
    };

    let candidates = match resolve_targets(spec, ctx.cluster.as_ref()).await {
        Ok(candidates) => candidates,
        Err(e) => {
            record_failure(ctx, namespace, name, &mut status, e.to_string()).await;
            return Err(e.into());
        }
    };
    metrics::set_managed_targets(namespace, name, candidates.len());
    debug!(
        targets = candidates.len(),
        strategy = %resolved.strategy,
        "Resolved target ConfigMaps"
    );

    let outcome = sync_targets(
        ctx.cluster.as_ref(),
        source,
        &Payload::from_config_map(&source_config_map),
        candidates,
        resolved.strategy,
        &ctx.shutdown,
    )
    .await;
    status.sync_statuses = outcome.records;

    if outcome.cancelled {
        // Keep what was done; Ready is left as it was
        persist_status(ctx, namespace, name, &status).await?;
        return Ok(NextAction::RequeueNow);
    }

    let now = now_rfc3339();
    let summary = summarize(&status.sync_statuses);
    status.last_sync_time = Some(now.clone());
    status.observed_generation = syncer.metadata.generation;
    set_ready(
        &mut status,
        ConditionStatus::True,
        ConditionReason::SyncSuccess,
        summary.as_str(),
        &now,
    );
    persist_status(ctx, namespace, name, &status).await?;

    info!(summary = summary.as_str(), "Sync pass completed");
    Ok(NextAction::RequeueAfter(
        spec.sync_interval_or(ctx.config.default_sync_interval()),
    ))
}

/// Set Ready=False/SyncFailed and try to persist it
///
/// The caller returns its own error either way, so a persist failure here is
/// only logged.
async fn record_failure(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
    status: &mut ConfigMapSyncerStatus,
    message: String,
) {
    set_ready(
        status,
        ConditionStatus::False,
        ConditionReason::SyncFailed,
        message,
        &now_rfc3339(),
    );
    if let Err(e) = persist_status(ctx, namespace, name, status).await {
        warn!(error = %e, "Failed to record SyncFailed condition");
    }
}

async fn persist_status(
    ctx: &Reconciler,
    namespace: &str,
    name: &str,
    status: &ConfigMapSyncerStatus,
) -> Result<(), ReconcilerError> {
    ctx.cluster
        .update_syncer_status(namespace, name, status)
        .await
        .map_err(ReconcilerError::PersistStatus)
}
