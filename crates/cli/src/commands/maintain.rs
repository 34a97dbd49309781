//! Connectivity and maintenance commands.

use super::{print_json, require};
use clap::Args;
use vecgraph_core::{config::AppConfig, AppResult};
use vecgraph_store::{GraphVectorStore, MaintenanceReport};

/// Check that the backing store is reachable
#[derive(Args, Debug)]
pub struct HeartbeatCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HeartbeatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing heartbeat command");

        // No startup maintenance here; only liveness matters.
        let store = GraphVectorStore::from_config(config).await?;
        let heartbeat = store.heartbeat().await;

        if self.json {
            print_json(&heartbeat)?;
        } else if heartbeat.heartbeat {
            println!("Store is reachable");
        } else {
            println!("Store is not reachable");
        }
        store.disconnect().await
    }
}

/// Rebuild the vector index, projection and KNN edges
#[derive(Args, Debug)]
pub struct MaintainCommand {
    /// Namespace to maintain (omit for all namespaces)
    pub namespace: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl MaintainCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing maintain command");

        let store = GraphVectorStore::from_config(config).await?;
        let reports = match &self.namespace {
            Some(namespace) => vec![require(store.maintain_namespace(namespace).await)?],
            None => store.initialize().await?,
        };

        if self.json {
            return print_json(&reports);
        }
        if reports.is_empty() {
            println!("Nothing to maintain");
        }
        for report in &reports {
            print_report(report);
        }
        Ok(())
    }
}

fn print_report(report: &MaintenanceReport) {
    if report.is_noop() {
        println!("{}: no embedded chunks, nothing to do", report.namespace);
        return;
    }

    println!(
        "{}: dimension {}, {} nodes projected, {} edges written",
        report.namespace,
        report.dimension.map_or("-".to_string(), |d| d.to_string()),
        report.projected_nodes.map_or("-".to_string(), |n| n.to_string()),
        report.edges_written.map_or("-".to_string(), |n| n.to_string()),
    );
    for failure in &report.failures {
        println!("  ✗ {}: {}", failure.step, failure.error);
    }
}
