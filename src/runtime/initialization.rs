//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{KubeClusterClient, Reconciler};
use crate::controller::server::{start_server, ServerState};
use crate::crd::ConfigMapSyncer;
use crate::observability;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const SERVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const SERVER_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// API for the ConfigMapSyncer CRD across all namespaces
    pub syncers: Api<ConfigMapSyncer>,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - Reconciler setup
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    let config = ControllerConfig::from_env();
    observability::logging::init_tracing(&config)?;

    if !provider_installed {
        warn!("rustls crypto provider was already installed, keeping the existing one");
    }

    info!("Starting ConfigMap Sync Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, "Loaded controller configuration");

    if config.enable_metrics {
        observability::metrics::register_metrics()?;
    }

    let server_state = Arc::new(ServerState::new());

    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let syncers: Api<ConfigMapSyncer> = Api::all(client.clone());

    let reconciler = Arc::new(Reconciler::new(
        Arc::new(KubeClusterClient::new(client.clone())),
        config.clone(),
    ));

    log_existing_resources(&syncers).await?;

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        syncers,
        reconciler,
        server_state,
        config,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > SERVER_STARTUP_TIMEOUT {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                SERVER_STARTUP_TIMEOUT.as_secs()
            ));
        }

        tokio::time::sleep(SERVER_POLL_INTERVAL).await;
    }
}

/// Check the CRD is queryable and log a per-namespace summary of existing resources
///
/// The controller's initial list reconciles each of them once the watch starts.
async fn log_existing_resources(syncers: &Api<ConfigMapSyncer>) -> Result<()> {
    let span = tracing::span!(
        tracing::Level::INFO,
        "controller.startup.existing_resources"
    );
    let _guard = span.enter();

    let list = syncers
        .list(&ListParams::default())
        .await
        .context("ConfigMapSyncer CRD is not queryable - is it installed?")?;

    let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in &list.items {
        by_namespace
            .entry(item.namespace().unwrap_or_default())
            .or_default()
            .push(item.name_any());
    }

    info!(
        total = list.items.len(),
        namespaces = by_namespace.len(),
        "Found existing ConfigMapSyncer resources"
    );
    for (namespace, mut names) in by_namespace {
        names.sort();
        info!(namespace = namespace.as_str(), resources = ?names, "Existing resources");
    }

    Ok(())
}
