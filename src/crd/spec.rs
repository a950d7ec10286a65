//! # ConfigMapSyncer Spec
//!
//! Main CRD specification and default values.

use crate::constants::{DEFAULT_SYNC_INTERVAL_SECS, MIN_SYNC_INTERVAL_SECS};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// ConfigMapSyncer Custom Resource Definition
///
/// Propagates one master ConfigMap into a set of target ConfigMaps, either in an
/// explicit list of namespaces or in every namespace except the master's own.
///
/// # Example
///
/// ```yaml
/// apiVersion: conf-sync.com/v1alpha1
/// kind: ConfigMapSyncer
/// metadata:
///   name: shared-settings
///   namespace: default
/// spec:
///   masterConfigMap:
///     name: source-config
///     namespace: default
///   targetNamespaces: ["app1", "app2"]
///   mergeStrategy: Merge
///   syncInterval: 300
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ConfigMapSyncer",
    group = "conf-sync.com",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::ConfigMapSyncerStatus",
    shortname = "cms",
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapSyncerSpec {
    /// Reference to the source ConfigMap that is propagated
    pub master_config_map: ConfigMapReference,
    /// Name used for target ConfigMaps
    /// Defaults to the master ConfigMap's name. Ignored when `targetSelector` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_config_map_name: Option<String>,
    /// Namespaces to propagate into
    /// When empty, every namespace except the master's is targeted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_namespaces: Vec<String>,
    /// Label selector picking existing ConfigMaps inside each target namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_selector: Option<LabelSelector>,
    /// How target data is combined with the master's data: `Replace` or `Merge` (default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<String>,
    /// Seconds between sync passes
    #[serde(default = "default_sync_interval")]
    #[schemars(range(min = 1))]
    pub sync_interval: i32,
}

/// Reference to a ConfigMap by namespace and name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapReference {
    /// Name of the ConfigMap
    pub name: String,
    /// Namespace of the ConfigMap
    pub namespace: String,
}

impl fmt::Display for ConfigMapReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    reason = "the default interval is a small constant"
)]
pub fn default_sync_interval() -> i32 {
    DEFAULT_SYNC_INTERVAL_SECS as i32
}

impl ConfigMapSyncerSpec {
    /// Name for target ConfigMaps in explicit-name mode
    #[must_use]
    pub fn target_name(&self) -> &str {
        self.target_config_map_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.master_config_map.name)
    }

    /// Requeue interval after a completed pass
    ///
    /// Values below the schema minimum fall back to `fallback`.
    #[must_use]
    pub fn sync_interval_or(&self, fallback: Duration) -> Duration {
        if self.sync_interval < MIN_SYNC_INTERVAL_SECS {
            return fallback;
        }
        Duration::from_secs(u64::from(self.sync_interval.unsigned_abs()))
    }

    /// Resolve the configured merge strategy token
    #[must_use]
    pub fn strategy(&self) -> ResolvedStrategy {
        MergeStrategy::resolve(self.merge_strategy.as_deref())
    }
}

/// How the master's payload is combined with an existing target's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Target payload becomes an exact copy of the master's
    Replace,
    /// Master keys overwrite target keys, target-only keys are kept
    #[default]
    Merge,
}

/// Result of resolving a strategy token
///
/// `unrecognized` carries the offending token when the resolver fell back to
/// `Merge`, so the caller can report it as a policy warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStrategy {
    pub strategy: MergeStrategy,
    pub unrecognized: Option<String>,
}

impl MergeStrategy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Replace => "Replace",
            MergeStrategy::Merge => "Merge",
        }
    }

    /// Resolve a strategy token from the spec
    ///
    /// An absent token is the documented default (Merge). An empty or unknown
    /// token also yields Merge but is reported back as unrecognized.
    #[must_use]
    pub fn resolve(token: Option<&str>) -> ResolvedStrategy {
        match token {
            None => ResolvedStrategy {
                strategy: MergeStrategy::Merge,
                unrecognized: None,
            },
            Some("Replace") => ResolvedStrategy {
                strategy: MergeStrategy::Replace,
                unrecognized: None,
            },
            Some("Merge") => ResolvedStrategy {
                strategy: MergeStrategy::Merge,
                unrecognized: None,
            },
            Some(other) => ResolvedStrategy {
                strategy: MergeStrategy::Merge,
                unrecognized: Some(other.to_string()),
            },
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
