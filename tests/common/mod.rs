//! Common test utilities for reconciliation tests
//!
//! `FakeCluster` is an in-memory `ClusterClient` with write counters and
//! failure injection, so whole passes can run without an API server.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use configmap_sync_controller::config::ControllerConfig;
use configmap_sync_controller::constants::FINALIZER_NAME;
use configmap_sync_controller::controller::reconciler::{ClusterClient, ClusterError, Reconciler};
use configmap_sync_controller::crd::{
    ConfigMapReference, ConfigMapSyncer, ConfigMapSyncerSpec, ConfigMapSyncerStatus,
};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Default)]
struct State {
    syncers: BTreeMap<Key, ConfigMapSyncer>,
    config_maps: BTreeMap<Key, ConfigMap>,
    namespaces: Vec<String>,
    next_version: u64,

    creates: usize,
    updates: usize,
    syncer_updates: usize,
    status_writes: usize,

    fail_create_in: HashSet<String>,
    fail_update_in: HashSet<String>,
    fail_get: HashSet<Key>,
    stale_reads: HashSet<Key>,
    fail_list_namespaces: bool,
    fail_status_writes: bool,
    cancel_after_writes: Option<(usize, Arc<AtomicBool>)>,
}

impl State {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn count_target_write(&mut self) {
        if let Some((limit, flag)) = &self.cancel_after_writes {
            if self.creates + self.updates >= *limit {
                flag.store(true, Ordering::Relaxed);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<State>>,
}

impl FakeCluster {
    pub fn new(namespaces: &[&str]) -> Self {
        let cluster = Self::default();
        cluster.state().namespaces = namespaces.iter().map(|ns| (*ns).to_string()).collect();
        cluster
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake cluster state poisoned")
    }

    pub fn put_config_map(
        &self,
        namespace: &str,
        name: &str,
        data: &[(&str, &str)],
        labels: &[(&str, &str)],
    ) {
        let mut state = self.state();
        let version = state.bump_version();
        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                resource_version: Some(version),
                labels: (!labels.is_empty()).then(|| {
                    labels
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                        .collect()
                }),
                ..ObjectMeta::default()
            },
            data: (!data.is_empty()).then(|| {
                data.iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect()
            }),
            ..ConfigMap::default()
        };
        state.config_maps.insert(key(namespace, name), config_map);
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.state().config_maps.get(&key(namespace, name)).cloned()
    }

    pub fn data_of(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.config_map(namespace, name)
            .map(|cm| cm.data.unwrap_or_default())
    }

    pub fn put_syncer(&self, syncer: ConfigMapSyncer) {
        let namespace = syncer.metadata.namespace.clone().unwrap_or_default();
        let name = syncer.metadata.name.clone().unwrap_or_default();
        self.state().syncers.insert(key(&namespace, &name), syncer);
    }

    pub fn syncer(&self, namespace: &str, name: &str) -> Option<ConfigMapSyncer> {
        self.state().syncers.get(&key(namespace, name)).cloned()
    }

    pub fn status_of(&self, namespace: &str, name: &str) -> ConfigMapSyncerStatus {
        self.syncer(namespace, name)
            .and_then(|s| s.status)
            .unwrap_or_default()
    }

    pub fn creates(&self) -> usize {
        self.state().creates
    }

    pub fn updates(&self) -> usize {
        self.state().updates
    }

    pub fn target_writes(&self) -> usize {
        let state = self.state();
        state.creates + state.updates
    }

    pub fn syncer_updates(&self) -> usize {
        self.state().syncer_updates
    }

    pub fn status_writes(&self) -> usize {
        self.state().status_writes
    }

    pub fn fail_creates_in(&self, namespace: &str) {
        self.state().fail_create_in.insert(namespace.to_string());
    }

    pub fn fail_updates_in(&self, namespace: &str) {
        self.state().fail_update_in.insert(namespace.to_string());
    }

    pub fn fail_get(&self, namespace: &str, name: &str) {
        self.state().fail_get.insert(key(namespace, name));
    }

    pub fn fail_list_namespaces(&self) {
        self.state().fail_list_namespaces = true;
    }

    pub fn fail_status_writes(&self) {
        self.state().fail_status_writes = true;
    }

    /// Set `flag` once `writes` target creates/updates have happened
    pub fn cancel_after_writes(&self, writes: usize, flag: Arc<AtomicBool>) {
        self.state().cancel_after_writes = Some((writes, flag));
    }

    /// Have another writer modify `namespace/name` right after each read of it,
    /// so the next update from the reader is stale
    pub fn modify_after_read(&self, namespace: &str, name: &str) {
        self.state().stale_reads.insert(key(namespace, name));
    }
}

fn matches_selector(config_map: &ConfigMap, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let labels = config_map.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.get(k.trim()).map(String::as_str) == Some(v.trim()),
            None => labels.contains_key(term.trim()),
        })
}

fn api_error(code: u16, message: &str) -> ClusterError {
    ClusterError::Api {
        code,
        message: message.to_string(),
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_syncer(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMapSyncer>, ClusterError> {
        let state = self.state();
        if state.fail_get.contains(&key(namespace, name)) {
            return Err(api_error(500, "injected get failure"));
        }
        Ok(state.syncers.get(&key(namespace, name)).cloned())
    }

    async fn update_syncer(
        &self,
        syncer: &ConfigMapSyncer,
    ) -> Result<ConfigMapSyncer, ClusterError> {
        let namespace = syncer.metadata.namespace.clone().unwrap_or_default();
        let name = syncer.metadata.name.clone().unwrap_or_default();
        let mut state = self.state();
        let k = key(&namespace, &name);
        if !state.syncers.contains_key(&k) {
            return Err(api_error(404, "not found"));
        }
        state.syncer_updates += 1;

        let finalizers_empty = syncer
            .metadata
            .finalizers
            .as_ref()
            .is_none_or(Vec::is_empty);
        if syncer.metadata.deletion_timestamp.is_some() && finalizers_empty {
            // The API server completes deletion once the last finalizer is gone
            state.syncers.remove(&k);
        } else {
            state.syncers.insert(k, syncer.clone());
        }
        Ok(syncer.clone())
    }

    async fn update_syncer_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ConfigMapSyncerStatus,
    ) -> Result<(), ClusterError> {
        let mut state = self.state();
        if state.fail_status_writes {
            return Err(api_error(500, "injected status failure"));
        }
        let Some(syncer) = state.syncers.get_mut(&key(namespace, name)) else {
            return Err(api_error(404, "not found"));
        };
        syncer.status = Some(status.clone());
        state.status_writes += 1;
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError> {
        let mut state = self.state();
        let k = key(namespace, name);
        if state.fail_get.contains(&k) {
            return Err(api_error(500, "injected get failure"));
        }
        let found = state.config_maps.get(&k).cloned();
        if found.is_some() && state.stale_reads.contains(&k) {
            let version = state.bump_version();
            if let Some(cm) = state.config_maps.get_mut(&k) {
                cm.metadata.resource_version = Some(version);
            }
        }
        Ok(found)
    }

    async fn list_config_maps(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<ConfigMap>, ClusterError> {
        let state = self.state();
        Ok(state
            .config_maps
            .iter()
            .filter(|((ns, _), cm)| ns == namespace && matches_selector(cm, label_selector))
            .map(|(_, cm)| cm.clone())
            .collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let state = self.state();
        if state.fail_list_namespaces {
            return Err(ClusterError::Request("injected list failure".to_string()));
        }
        Ok(state.namespaces.clone())
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), ClusterError> {
        let namespace = config_map.metadata.namespace.clone().unwrap_or_default();
        let name = config_map.metadata.name.clone().unwrap_or_default();
        let mut state = self.state();
        if state.fail_create_in.contains(&namespace) {
            return Err(api_error(403, "injected create failure"));
        }
        let k = key(&namespace, &name);
        if state.config_maps.contains_key(&k) {
            return Err(ClusterError::Conflict("already exists".to_string()));
        }
        let mut stored = config_map.clone();
        stored.metadata.resource_version = Some(state.bump_version());
        state.config_maps.insert(k, stored);
        state.creates += 1;
        state.count_target_write();
        Ok(())
    }

    async fn update_config_map(&self, config_map: &ConfigMap) -> Result<(), ClusterError> {
        let namespace = config_map.metadata.namespace.clone().unwrap_or_default();
        let name = config_map.metadata.name.clone().unwrap_or_default();
        let mut state = self.state();
        if state.fail_update_in.contains(&namespace) {
            return Err(api_error(500, "injected update failure"));
        }
        let k = key(&namespace, &name);
        let Some(current) = state.config_maps.get(&k) else {
            return Err(api_error(404, "not found"));
        };
        if current.metadata.resource_version != config_map.metadata.resource_version {
            return Err(ClusterError::Conflict(
                "the object has been modified".to_string(),
            ));
        }
        let mut stored = config_map.clone();
        stored.metadata.resource_version = Some(state.bump_version());
        state.config_maps.insert(k, stored);
        state.updates += 1;
        state.count_target_write();
        Ok(())
    }
}

pub fn spec(targets: &[&str], strategy: Option<&str>) -> ConfigMapSyncerSpec {
    ConfigMapSyncerSpec {
        master_config_map: ConfigMapReference {
            name: "source-config".to_string(),
            namespace: "default".to_string(),
        },
        target_config_map_name: None,
        target_namespaces: targets.iter().map(|ns| (*ns).to_string()).collect(),
        target_selector: None,
        merge_strategy: strategy.map(str::to_string),
        sync_interval: 300,
    }
}

/// A syncer named `shared` in `default`, finalizer already in place
pub fn syncer(spec: ConfigMapSyncerSpec) -> ConfigMapSyncer {
    let mut syncer = ConfigMapSyncer::new("shared", spec);
    syncer.metadata.namespace = Some("default".to_string());
    syncer.metadata.generation = Some(1);
    syncer.metadata.finalizers = Some(vec![FINALIZER_NAME.to_string()]);
    syncer
}

pub fn reconciler(cluster: &FakeCluster) -> Reconciler {
    Reconciler::new(Arc::new(cluster.clone()), ControllerConfig::default())
}
