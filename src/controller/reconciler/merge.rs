//! # Merge Engine
//!
//! Computes the desired `data`/`binaryData` of a target ConfigMap from the
//! master's payload, the target's current payload and the merge strategy.
//!
//! Payloads are key-indexed `BTreeMap`s, so equality is structural and does not
//! depend on insertion order.

use crate::crd::MergeStrategy;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;

/// The part of a ConfigMap the controller owns
///
/// An absent map on the ConfigMap and an empty map are the same payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    pub data: BTreeMap<String, String>,
    pub binary_data: BTreeMap<String, ByteString>,
}

impl Payload {
    #[must_use]
    pub fn from_config_map(config_map: &ConfigMap) -> Self {
        Self {
            data: config_map.data.clone().unwrap_or_default(),
            binary_data: config_map.binary_data.clone().unwrap_or_default(),
        }
    }

    /// Write this payload onto a ConfigMap, replacing its data and binaryData
    ///
    /// Empty maps are written as absent so the API server's representation
    /// round-trips to the same payload.
    pub fn write_to(self, config_map: &mut ConfigMap) {
        config_map.data = (!self.data.is_empty()).then_some(self.data);
        config_map.binary_data = (!self.binary_data.is_empty()).then_some(self.binary_data);
    }
}

/// Compute the desired payload for one target
///
/// - `Replace`: an independent copy of `source`; `existing` is ignored.
/// - `Merge`: a copy of `existing` (empty when absent) with every key of
///   `source` written over it.
#[must_use]
pub fn compute(source: &Payload, existing: Option<&Payload>, strategy: MergeStrategy) -> Payload {
    match strategy {
        MergeStrategy::Replace => source.clone(),
        MergeStrategy::Merge => {
            let mut merged = existing.cloned().unwrap_or_default();
            merged.data.extend(
                source
                    .data
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
            merged.binary_data.extend(
                source
                    .binary_data
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
            merged
        }
    }
}
