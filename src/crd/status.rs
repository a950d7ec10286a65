//! # ConfigMapSyncer Status
//!
//! Status types for tracking the aggregate Ready condition and the outcome of
//! the last pass for every resolved target.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of the ConfigMapSyncer resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapSyncerStatus {
    /// Conditions represent the latest available observations
    /// At most one entry per condition type
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Sync outcome for each target ConfigMap resolved in the last pass
    #[serde(default)]
    pub sync_statuses: Vec<SyncStatus>,
    /// Time of the last completed sync pass (RFC3339)
    #[serde(default)]
    pub last_sync_time: Option<String>,
    /// Generation of the spec the last pass ran against
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

/// Per-target sync record, regenerated on every pass
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Name of the target ConfigMap
    pub config_map_name: String,
    /// Namespace of the target ConfigMap
    pub namespace: String,
    /// Outcome of the sync operation
    pub status: SyncState,
    /// Additional information, set on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Time of the last successful sync (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<String>,
}

impl SyncStatus {
    #[must_use]
    pub fn synced(namespace: &str, name: &str, at: &str) -> Self {
        Self {
            config_map_name: name.to_string(),
            namespace: namespace.to_string(),
            status: SyncState::Synced,
            message: None,
            last_sync_time: Some(at.to_string()),
        }
    }

    #[must_use]
    pub fn failed(namespace: &str, name: &str, message: String) -> Self {
        Self {
            config_map_name: name.to_string(),
            namespace: namespace.to_string(),
            status: SyncState::Failed,
            message: Some(message),
            last_sync_time: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum SyncState {
    Pending,
    Synced,
    Failed,
}

/// Condition represents an aggregate observation of the resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition
    pub status: ConditionStatus,
    /// Machine-readable reason for the last update
    pub reason: ConditionReason,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Last time `status` changed value (RFC3339)
    #[serde(default)]
    pub last_transition_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionReason {
    SyncSuccess,
    SyncFailed,
    MasterConfigMapNotFound,
}

impl ConditionReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionReason::SyncSuccess => "SyncSuccess",
            ConditionReason::SyncFailed => "SyncFailed",
            ConditionReason::MasterConfigMapNotFound => "MasterConfigMapNotFound",
        }
    }
}

impl fmt::Display for ConditionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
