//! Namespace inspection and deletion commands.

use super::{open_store, print_json, require};
use clap::Args;
use vecgraph_core::{config::AppConfig, AppError, AppResult};

/// Show statistics for a namespace
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Namespace to inspect
    pub namespace: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command for namespace '{}'", self.namespace);

        let store = open_store(config).await?;
        let stats = require(store.namespace_stats(&self.namespace).await)?;

        if self.json {
            return print_json(&stats);
        }

        println!("Namespace: {}", stats.namespace);
        println!("  Vectors:    {}", stats.vector_count);
        println!("  Documents:  {}", stats.document_count);
        match stats.dimension {
            Some(dimension) => println!("  Dimension:  {}", dimension),
            None => println!("  Dimension:  -"),
        }
        println!("  KNN edges:  {}", stats.edge_count);
        Ok(())
    }
}

/// List namespaces, or the documents of one namespace
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Namespace whose documents to list (omit to list namespaces)
    pub namespace: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = open_store(config).await?;

        let Some(namespace) = &self.namespace else {
            tracing::info!("Executing list command for all namespaces");
            let namespaces = require(store.list_namespaces().await)?;
            if self.json {
                return print_json(&namespaces);
            }
            if namespaces.is_empty() {
                println!("No namespaces");
            }
            for name in namespaces {
                println!("{}", name);
            }
            return Ok(());
        };

        tracing::info!("Executing list command for namespace '{}'", namespace);
        let documents = require(store.list_documents(namespace).await)?;
        if self.json {
            return print_json(&documents);
        }
        if documents.is_empty() {
            println!("Namespace '{}' has no documents", namespace);
        }
        for doc in documents {
            let title = doc
                .metadata
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("-")
                .to_string();
            println!("{}  {}  ({} chunks)", doc.doc_id, title, doc.chunk_count);
        }
        Ok(())
    }
}

/// Delete one document from a namespace
#[derive(Args, Debug)]
pub struct DeleteDocCommand {
    pub namespace: String,

    /// Document id, as shown by `list`
    pub doc_id: String,
}

impl DeleteDocCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(
            "Executing delete-doc command for '{}' in '{}'",
            self.doc_id,
            self.namespace
        );

        let store = open_store(config).await?;
        if require(
            store
                .delete_document_from_namespace(&self.namespace, &self.doc_id)
                .await,
        )? {
            println!("Deleted document {} from {}", self.doc_id, self.namespace);
        } else {
            println!("Document {} not found in {}", self.doc_id, self.namespace);
        }
        Ok(())
    }
}

/// Delete a namespace and everything in it
#[derive(Args, Debug)]
pub struct DeleteNamespaceCommand {
    pub namespace: String,

    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl DeleteNamespaceCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing delete-namespace command for '{}'", self.namespace);
        if !self.yes {
            return Err(AppError::Other(format!(
                "refusing to delete namespace '{}' without --yes",
                self.namespace
            )));
        }

        let store = open_store(config).await?;
        let outcome = require(store.delete_namespace(&self.namespace).await)?;
        println!("{}", outcome.message);
        Ok(())
    }
}

/// Delete every namespace in the store
#[derive(Args, Debug)]
pub struct ResetCommand {
    /// Skip confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl ResetCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing reset command");
        if !self.yes {
            return Err(AppError::Other(
                "refusing to reset the store without --yes".to_string(),
            ));
        }

        let store = open_store(config).await?;
        require(store.reset().await)?;
        println!("Store reset");
        Ok(())
    }
}
