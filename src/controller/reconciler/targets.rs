//! # Target Resolution
//!
//! Expands a `ConfigMapSyncer` spec into the concrete target ConfigMaps of one pass.
//!
//! 1. Candidate namespaces are `targetNamespaces` when set, otherwise every
//!    namespace in the cluster. The master's namespace is always removed.
//! 2. With `targetSelector`, each namespace contributes every ConfigMap matching
//!    the selector. An unusable selector skips the namespace, not the pass.
//! 3. Without a selector, each namespace contributes one ConfigMap named
//!    `targetConfigMapName` (or the master's name), which may not exist yet.

use crate::controller::reconciler::cluster::{ClusterClient, ClusterError};
use crate::crd::ConfigMapSyncerSpec;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::Selector;
use kube::ResourceExt;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Failures that abort target resolution for the whole pass
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to list namespaces: {0}")]
    ListNamespaces(#[source] ClusterError),
    #[error("failed to list ConfigMaps in namespace {namespace}: {source}")]
    ListConfigMaps {
        namespace: String,
        #[source]
        source: ClusterError,
    },
}

#[derive(Debug, Error)]
#[error("invalid target selector: {0}")]
pub struct SelectorError(String);

/// One target ConfigMap location plus what was observed there
#[derive(Debug, Clone)]
pub struct TargetCandidate {
    pub namespace: String,
    pub name: String,
    pub current: CandidateState,
}

#[derive(Debug, Clone)]
pub enum CandidateState {
    Existing(Box<ConfigMap>),
    Missing,
    /// Reading the target failed; recorded as a per-target failure
    Unreadable(ClusterError),
}

/// Render a `LabelSelector` as a list-query string
///
/// Returns `None` for a selector with no requirements, which matches everything.
pub fn selector_query(selector: &LabelSelector) -> Result<Option<String>, SelectorError> {
    let parsed =
        Selector::try_from(selector.clone()).map_err(|e| SelectorError(e.to_string()))?;
    let query = parsed.to_string();
    Ok((!query.is_empty()).then_some(query))
}

/// Namespaces to sync into, never including `source_namespace`
pub async fn candidate_namespaces(
    spec: &ConfigMapSyncerSpec,
    client: &dyn ClusterClient,
) -> Result<Vec<String>, ResolveError> {
    let source_namespace = spec.master_config_map.namespace.as_str();

    let namespaces = if spec.target_namespaces.is_empty() {
        client
            .list_namespaces()
            .await
            .map_err(ResolveError::ListNamespaces)?
    } else {
        spec.target_namespaces.clone()
    };

    let mut seen = HashSet::new();
    Ok(namespaces
        .into_iter()
        .filter(|ns| ns != source_namespace)
        .filter(|ns| seen.insert(ns.clone()))
        .collect())
}

/// Resolve every target ConfigMap for one pass
pub async fn resolve_targets(
    spec: &ConfigMapSyncerSpec,
    client: &dyn ClusterClient,
) -> Result<Vec<TargetCandidate>, ResolveError> {
    let namespaces = candidate_namespaces(spec, client).await?;
    let selector = spec.target_selector.as_ref().map(selector_query);

    let mut candidates = Vec::new();
    for namespace in namespaces {
        match &selector {
            Some(Err(e)) => {
                warn!(
                    target.namespace = namespace.as_str(),
                    error = %e,
                    "Skipping namespace - target selector cannot be parsed"
                );
            }
            Some(Ok(query)) => {
                let found = client
                    .list_config_maps(&namespace, query.as_deref())
                    .await
                    .map_err(|source| ResolveError::ListConfigMaps {
                        namespace: namespace.clone(),
                        source,
                    })?;
                debug!(
                    target.namespace = namespace.as_str(),
                    matched = found.len(),
                    "Selected target ConfigMaps"
                );
                candidates.extend(found.into_iter().map(|config_map| TargetCandidate {
                    namespace: namespace.clone(),
                    name: config_map.name_any(),
                    current: CandidateState::Existing(Box::new(config_map)),
                }));
            }
            None => {
                let name = spec.target_name();
                let current = match client.get_config_map(&namespace, name).await {
                    Ok(Some(config_map)) => CandidateState::Existing(Box::new(config_map)),
                    Ok(None) => CandidateState::Missing,
                    Err(e) => CandidateState::Unreadable(e),
                };
                candidates.push(TargetCandidate {
                    namespace,
                    name: name.to_string(),
                    current,
                });
            }
        }
    }

    Ok(candidates)
}
