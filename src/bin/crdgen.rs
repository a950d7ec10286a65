//! # CRD Generator
//!
//! Prints the `ConfigMapSyncer` CustomResourceDefinition.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/configmapsyncer.yaml
//! cargo run --bin crdgen -- --format json | kubectl apply -f -
//! ```

use clap::{Parser, ValueEnum};
use configmap_sync_controller::crd::ConfigMapSyncer;
use kube::core::CustomResourceExt;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "crdgen", about = "Generate the ConfigMapSyncer CRD", version)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    format: Format,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let crd = ConfigMapSyncer::crd();

    let rendered = match cli.format {
        Format::Yaml => serde_yaml::to_string(&crd)?,
        Format::Json => serde_json::to_string_pretty(&crd)?,
    };
    println!("{rendered}");
    Ok(())
}
