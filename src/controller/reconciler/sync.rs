//! # Target Sync
//!
//! Applies the master payload to each resolved target ConfigMap.
//!
//! Each target is handled on its own: a failed create or update becomes a
//! `Failed` record and the loop moves on. A target whose payload already
//! matches is recorded as `Synced` without any write.

use crate::constants::SOURCE_CONFIGMAP_LABEL;
use crate::controller::reconciler::cluster::ClusterClient;
use crate::controller::reconciler::merge::{self, Payload};
use crate::controller::reconciler::status::now_rfc3339;
use crate::controller::reconciler::targets::{CandidateState, TargetCandidate};
use crate::crd::{ConfigMapReference, MergeStrategy, SyncStatus};
use crate::observability::metrics;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// What happened to one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetResult {
    Created,
    Updated,
    Unchanged,
    Failed,
}

impl TargetResult {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetResult::Created => "created",
            TargetResult::Updated => "updated",
            TargetResult::Unchanged => "unchanged",
            TargetResult::Failed => "failed",
        }
    }
}

/// Records produced by one pass over the targets
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    pub records: Vec<SyncStatus>,
    /// Set when shutdown interrupted the pass before every target was visited
    pub cancelled: bool,
}

/// Provenance label value for a master ConfigMap
#[must_use]
pub fn provenance_value(source: &ConfigMapReference) -> String {
    format!("{}.{}", source.namespace, source.name)
}

/// Sync every candidate, stopping early once `cancelled` is set
pub async fn sync_targets(
    client: &dyn ClusterClient,
    source: &ConfigMapReference,
    source_payload: &Payload,
    candidates: Vec<TargetCandidate>,
    strategy: MergeStrategy,
    cancelled: &AtomicBool,
) -> SyncOutcome {
    let provenance = provenance_value(source);
    let mut outcome = SyncOutcome::default();

    for candidate in candidates {
        if cancelled.load(Ordering::Relaxed) {
            warn!(
                synced = outcome.records.len(),
                "Shutdown requested, stopping before remaining targets"
            );
            outcome.cancelled = true;
            break;
        }

        let (result, record) =
            sync_target(client, &provenance, source_payload, candidate, strategy).await;
        metrics::record_target_operation(result.as_str());
        outcome.records.push(record);
    }

    outcome
}

async fn sync_target(
    client: &dyn ClusterClient,
    provenance: &str,
    source_payload: &Payload,
    candidate: TargetCandidate,
    strategy: MergeStrategy,
) -> (TargetResult, SyncStatus) {
    let TargetCandidate {
        namespace,
        name,
        current,
    } = candidate;

    match current {
        CandidateState::Unreadable(e) => {
            warn!(
                target.namespace = namespace.as_str(),
                target.name = name.as_str(),
                error = %e,
                "Failed to read target ConfigMap"
            );
            (
                TargetResult::Failed,
                SyncStatus::failed(&namespace, &name, format!("Failed to read ConfigMap: {e}")),
            )
        }
        CandidateState::Missing => {
            let mut target = ConfigMap {
                metadata: ObjectMeta {
                    name: Some(name.clone()),
                    namespace: Some(namespace.clone()),
                    labels: Some(BTreeMap::from([(
                        SOURCE_CONFIGMAP_LABEL.to_string(),
                        provenance.to_string(),
                    )])),
                    ..ObjectMeta::default()
                },
                ..ConfigMap::default()
            };
            merge::compute(source_payload, None, strategy).write_to(&mut target);

            match client.create_config_map(&target).await {
                Ok(()) => {
                    info!(
                        target.namespace = namespace.as_str(),
                        target.name = name.as_str(),
                        "Created target ConfigMap"
                    );
                    (
                        TargetResult::Created,
                        SyncStatus::synced(&namespace, &name, &now_rfc3339()),
                    )
                }
                Err(e) => {
                    warn!(
                        target.namespace = namespace.as_str(),
                        target.name = name.as_str(),
                        error = %e,
                        "Failed to create target ConfigMap"
                    );
                    (
                        TargetResult::Failed,
                        SyncStatus::failed(
                            &namespace,
                            &name,
                            format!("Failed to create ConfigMap: {e}"),
                        ),
                    )
                }
            }
        }
        CandidateState::Existing(existing) => {
            let current_payload = Payload::from_config_map(&existing);
            let desired = merge::compute(source_payload, Some(&current_payload), strategy);

            if desired == current_payload {
                debug!(
                    target.namespace = namespace.as_str(),
                    target.name = name.as_str(),
                    "Target ConfigMap already in sync"
                );
                return (
                    TargetResult::Unchanged,
                    SyncStatus::synced(&namespace, &name, &now_rfc3339()),
                );
            }

            let mut target = *existing;
            target
                .metadata
                .labels
                .get_or_insert_with(BTreeMap::new)
                .insert(SOURCE_CONFIGMAP_LABEL.to_string(), provenance.to_string());
            desired.write_to(&mut target);

            match client.update_config_map(&target).await {
                Ok(()) => {
                    info!(
                        target.namespace = namespace.as_str(),
                        target.name = name.as_str(),
                        "Updated target ConfigMap"
                    );
                    (
                        TargetResult::Updated,
                        SyncStatus::synced(&namespace, &name, &now_rfc3339()),
                    )
                }
                Err(e) => {
                    warn!(
                        target.namespace = namespace.as_str(),
                        target.name = name.as_str(),
                        conflict = e.is_conflict(),
                        error = %e,
                        "Failed to update target ConfigMap"
                    );
                    (
                        TargetResult::Failed,
                        SyncStatus::failed(
                            &namespace,
                            &name,
                            format!("Failed to update ConfigMap: {e}"),
                        ),
                    )
                }
            }
        }
    }
}
