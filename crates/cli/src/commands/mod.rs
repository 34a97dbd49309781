//! Command handlers for the vecgraph CLI.
//!
//! Every command opens the store from the loaded configuration, runs one
//! adapter operation and prints the outcome.

pub mod add;
pub mod maintain;
pub mod namespace;
pub mod search;

// Re-export command types for convenience
pub use add::AddCommand;
pub use maintain::{HeartbeatCommand, MaintainCommand};
pub use namespace::{DeleteDocCommand, DeleteNamespaceCommand, ListCommand, ResetCommand, StatsCommand};
pub use search::SearchCommand;

use serde::Serialize;
use vecgraph_core::{config::AppConfig, AppError, AppResult};
use vecgraph_store::{GraphVectorStore, Outcome};

/// Build the adapter from configuration and run the startup maintenance pass.
pub(crate) async fn open_store(config: &AppConfig) -> AppResult<GraphVectorStore> {
    let store = GraphVectorStore::from_config(config).await?;
    let reports = store.initialize().await?;
    for report in reports.iter().filter(|r| !r.is_success()) {
        tracing::warn!(
            "Namespace '{}' has {} failed maintenance steps",
            report.namespace,
            report.failures.len()
        );
    }
    Ok(store)
}

/// Turn an adapter outcome back into an error for the process exit path.
pub(crate) fn require<T>(outcome: Outcome<T>) -> AppResult<T> {
    outcome.map_err(|e| AppError::Other(e.error))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
