//! # Status
//!
//! Condition tracking for `ConfigMapSyncer` status.
//!
//! Conditions are keyed by type and updated in place. `lastTransitionTime` only
//! moves when the condition's status value flips, so a resource that stays
//! Ready across many passes keeps the time it first became Ready.

use crate::constants::CONDITION_TYPE_READY;
use crate::crd::{
    Condition, ConditionReason, ConditionStatus, ConfigMapSyncerStatus, SyncState, SyncStatus,
};

/// Current time in the RFC3339 form used throughout status
#[must_use]
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Insert or update a condition, keyed by its type
///
/// - Same type, same status: only `reason` and `message` change.
/// - Same type, different status: replaced, `lastTransitionTime` set to `now`.
/// - No condition of that type: appended with `lastTransitionTime` set to `now`.
///
/// Any duplicate entries of the same type are dropped, keeping the first.
pub fn set_condition(conditions: &mut Vec<Condition>, mut new: Condition, now: &str) {
    let Some(first) = conditions.iter().position(|c| c.r#type == new.r#type) else {
        new.last_transition_time = Some(now.to_string());
        conditions.push(new);
        return;
    };

    let mut index = 0;
    conditions.retain(|c| {
        let keep = index <= first || c.r#type != new.r#type;
        index += 1;
        keep
    });

    if let Some(existing) = conditions.get_mut(first) {
        if existing.status == new.status {
            existing.reason = new.reason;
            existing.message = new.message;
        } else {
            new.last_transition_time = Some(now.to_string());
            *existing = new;
        }
    }
}

/// Set the aggregate Ready condition on a status
pub fn set_ready(
    status: &mut ConfigMapSyncerStatus,
    value: ConditionStatus,
    reason: ConditionReason,
    message: impl Into<String>,
    now: &str,
) {
    set_condition(
        &mut status.conditions,
        Condition {
            r#type: CONDITION_TYPE_READY.to_string(),
            status: value,
            reason,
            message: message.into(),
            last_transition_time: None,
        },
        now,
    );
}

/// The Ready condition, if any
#[must_use]
pub fn ready_condition(status: &ConfigMapSyncerStatus) -> Option<&Condition> {
    status
        .conditions
        .iter()
        .find(|c| c.r#type == CONDITION_TYPE_READY)
}

/// Human-readable summary of one pass's records
#[must_use]
pub fn summarize(records: &[SyncStatus]) -> String {
    let synced = records
        .iter()
        .filter(|r| r.status == SyncState::Synced)
        .count();
    let failed = records
        .iter()
        .filter(|r| r.status == SyncState::Failed)
        .count();
    format!(
        "Synced {synced} of {} target ConfigMaps, {failed} failed",
        records.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: &str = "2025-01-01T00:00:00+00:00";
    const T1: &str = "2025-01-01T00:05:00+00:00";
    const T2: &str = "2025-01-01T00:10:00+00:00";

    fn ready(status: ConditionStatus, reason: ConditionReason, message: &str) -> Condition {
        Condition {
            r#type: CONDITION_TYPE_READY.to_string(),
            status,
            reason,
            message: message.to_string(),
            last_transition_time: None,
        }
    }

    #[test]
    fn test_absent_condition_is_appended_with_time() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            ready(ConditionStatus::True, ConditionReason::SyncSuccess, "ok"),
            T0,
        );
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(T0));
    }

    #[test]
    fn test_same_status_keeps_transition_time() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            ready(ConditionStatus::True, ConditionReason::SyncSuccess, "first"),
            T0,
        );
        set_condition(
            &mut conditions,
            ready(ConditionStatus::True, ConditionReason::SyncSuccess, "second"),
            T1,
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message, "second");
        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(T0));
    }

    #[test]
    fn test_transition_time_moves_only_on_status_change() {
        let mut conditions = Vec::new();
        set_condition(
            &mut conditions,
            ready(ConditionStatus::True, ConditionReason::SyncSuccess, "ok"),
            T0,
        );
        set_condition(
            &mut conditions,
            ready(
                ConditionStatus::False,
                ConditionReason::MasterConfigMapNotFound,
                "gone",
            ),
            T1,
        );
        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(
            conditions[0].reason,
            ConditionReason::MasterConfigMapNotFound
        );
        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(T1));

        // Reason changes but status stays False
        set_condition(
            &mut conditions,
            ready(ConditionStatus::False, ConditionReason::SyncFailed, "boom"),
            T2,
        );
        assert_eq!(conditions[0].reason, ConditionReason::SyncFailed);
        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(T1));
    }

    #[test]
    fn test_duplicate_types_collapse_to_one() {
        let mut first = ready(ConditionStatus::True, ConditionReason::SyncSuccess, "a");
        first.last_transition_time = Some(T0.to_string());
        let mut other = first.clone();
        other.r#type = "Degraded".to_string();
        let duplicate = ready(ConditionStatus::False, ConditionReason::SyncFailed, "b");

        let mut conditions = vec![first, other, duplicate];
        set_condition(
            &mut conditions,
            ready(ConditionStatus::True, ConditionReason::SyncSuccess, "c"),
            T1,
        );

        let ready_count = conditions
            .iter()
            .filter(|c| c.r#type == CONDITION_TYPE_READY)
            .count();
        assert_eq!(ready_count, 1);
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].message, "c");
        assert_eq!(conditions[0].last_transition_time.as_deref(), Some(T0));
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let records = vec![
            SyncStatus::synced("app1", "cfg", T0),
            SyncStatus::failed("app2", "cfg", "conflict".to_string()),
            SyncStatus::synced("app3", "cfg", T0),
        ];
        assert_eq!(
            summarize(&records),
            "Synced 2 of 3 target ConfigMaps, 1 failed"
        );
    }
}
