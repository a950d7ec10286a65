//! # Cluster Access
//!
//! The reconciler talks to the cluster only through [`ClusterClient`], which
//! covers the get/list/create/update/status operations a sync pass needs.
//! [`KubeClusterClient`] is the production implementation on top of `kube::Api`.

use crate::constants::CONTROLLER_NAME;
use crate::crd::{ConfigMapSyncer, ConfigMapSyncerStatus};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use thiserror::Error;

/// Errors returned by cluster operations
///
/// NotFound on reads is not an error: getters return `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// Optimistic concurrency conflict, the object changed since it was read
    #[error("conflict: {0}")]
    Conflict(String),
    /// The API server rejected the request
    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },
    /// Transport, serialization or client-side failure
    #[error("request failed: {0}")]
    Request(String),
}

impl ClusterError {
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClusterError::Conflict(_))
    }

    /// The object was deleted between read and write
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::Api { code: 404, .. })
    }
}

impl From<kube::Error> for ClusterError {
    fn from(error: kube::Error) -> Self {
        match &error {
            kube::Error::Api(api_err) if api_err.code == 409 => {
                ClusterError::Conflict(api_err.message.clone())
            }
            kube::Error::Api(api_err) => ClusterError::Api {
                code: api_err.code,
                message: api_err.message.clone(),
            },
            _ => ClusterError::Request(error.to_string()),
        }
    }
}

/// Cluster operations used by a sync pass
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a ConfigMapSyncer, `None` if it does not exist
    async fn get_syncer(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMapSyncer>, ClusterError>;

    /// Write a ConfigMapSyncer's metadata/spec (used for finalizer changes)
    async fn update_syncer(&self, syncer: &ConfigMapSyncer)
        -> Result<ConfigMapSyncer, ClusterError>;

    /// Write a ConfigMapSyncer's status subresource
    async fn update_syncer_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ConfigMapSyncerStatus,
    ) -> Result<(), ClusterError>;

    /// Fetch a ConfigMap, `None` if it does not exist
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError>;

    /// List ConfigMaps in a namespace, optionally filtered by a label selector query
    async fn list_config_maps(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<ConfigMap>, ClusterError>;

    /// Names of all namespaces in the cluster
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError>;

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), ClusterError>;

    /// Replace a ConfigMap; fails with [`ClusterError::Conflict`] on a stale resourceVersion
    async fn update_config_map(&self, config_map: &ConfigMap) -> Result<(), ClusterError>;
}

/// [`ClusterClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn syncers(&self, namespace: &str) -> Api<ConfigMapSyncer> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn namespace_of<K: ResourceExt>(object: &K) -> Result<String, ClusterError> {
    object
        .namespace()
        .ok_or_else(|| ClusterError::Request(format!("{} has no namespace", object.name_any())))
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_syncer(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMapSyncer>, ClusterError> {
        Ok(self.syncers(namespace).get_opt(name).await?)
    }

    async fn update_syncer(
        &self,
        syncer: &ConfigMapSyncer,
    ) -> Result<ConfigMapSyncer, ClusterError> {
        let namespace = namespace_of(syncer)?;
        Ok(self
            .syncers(&namespace)
            .replace(&syncer.name_any(), &PostParams::default(), syncer)
            .await?)
    }

    async fn update_syncer_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ConfigMapSyncerStatus,
    ) -> Result<(), ClusterError> {
        // Merge patch replaces lists wholesale, so syncStatuses never accumulates
        let patch = serde_json::json!({ "status": status });
        self.syncers(namespace)
            .patch_status(
                name,
                &PatchParams::apply(CONTROLLER_NAME),
                &Patch::Merge(patch),
            )
            .await?;
        Ok(())
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError> {
        Ok(self.config_maps(namespace).get_opt(name).await?)
    }

    async fn list_config_maps(
        &self,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<ConfigMap>, ClusterError> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.config_maps(namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(ResourceExt::name_any).collect())
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), ClusterError> {
        let namespace = namespace_of(config_map)?;
        self.config_maps(&namespace)
            .create(&PostParams::default(), config_map)
            .await?;
        Ok(())
    }

    async fn update_config_map(&self, config_map: &ConfigMap) -> Result<(), ClusterError> {
        let namespace = namespace_of(config_map)?;
        self.config_maps(&namespace)
            .replace(&config_map.name_any(), &PostParams::default(), config_map)
            .await?;
        Ok(())
    }
}
