//! # Watch Loop
//!
//! Controller watch loop that monitors `ConfigMapSyncer` resources and triggers
//! reconciliation when changes are detected.
//!
//! Master ConfigMap changes are not watched directly; every syncer is requeued
//! after its `syncInterval`, which picks them up.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError};
use crate::controller::server::ServerState;
use crate::crd::ConfigMapSyncer;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube::ResourceExt;
use kube_runtime::controller::{Action, Config as ControllerRuntimeConfig};
use kube_runtime::{watcher, Controller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop
///
/// Restarts the controller stream if it ends, until a shutdown signal arrives.
/// On shutdown the server reports not-ready and in-flight passes stop writing.
pub async fn run_watch_loop(
    syncers: Api<ConfigMapSyncer>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: &ControllerConfig,
) -> Result<(), anyhow::Error> {
    let shutdown_server_state = Arc::clone(&server_state);
    let shutdown_reconciler = Arc::clone(&reconciler);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");

        shutdown_server_state.is_ready.store(false, Ordering::Relaxed);
        shutdown_reconciler.request_shutdown();
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if reconciler.is_shutting_down() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop"
        );

        info!("Starting controller watch loop...");
        Controller::new(syncers.clone(), watcher::Config::default().any_semantic())
            .with_config(
                ControllerRuntimeConfig::default()
                    .concurrency(config.max_concurrent_reconciliations),
            )
            .shutdown_on_signal()
            .run(
                reconcile_syncer,
                |obj, error, ctx| handle_reconciliation_error(obj, error, ctx),
                Arc::clone(&reconciler),
            )
            .for_each(|result| {
                match result {
                    Ok((object, _action)) => {
                        debug!(resource.name = object.name.as_str(), "watch.event.reconciled");
                    }
                    Err(e) => {
                        handle_watch_stream_error(&format!("{e:?}"));
                    }
                }
                futures::future::ready(())
            })
            .instrument(watch_span)
            .await;

        if reconciler.is_shutting_down() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay = config.watch_restart_delay();
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

async fn reconcile_syncer(
    obj: Arc<ConfigMapSyncer>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    reconcile(&namespace, &name, &ctx).await.map(Action::from)
}
