//! # ConfigMap Sync Controller
//!
//! A Kubernetes controller that keeps ConfigMaps in many namespaces in sync
//! with one master ConfigMap.
//!
//! Each `ConfigMapSyncer` names a master ConfigMap and a set of targets, either
//! an explicit namespace list or every namespace but the master's, optionally
//! narrowed by a label selector. Targets are created or updated on every pass
//! using the `Replace` or `Merge` strategy, then the pass is requeued after
//! `syncInterval` seconds.

use anyhow::Result;
use configmap_sync_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(
        init.syncers,
        init.reconciler,
        init.server_state,
        &init.config,
    )
    .await?;

    info!("Controller exited");
    Ok(())
}
