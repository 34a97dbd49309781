//! Add command handler.
//!
//! Reads files (directories are walked recursively) and ingests each one
//! as a document.

use super::{open_store, print_json};
use clap::Args;
use std::path::{Path, PathBuf};
use vecgraph_core::{config::AppConfig, AppError, AppResult};
use vecgraph_store::{AddDocumentOutcome, DocumentInput};
use walkdir::WalkDir;

/// Add documents to a namespace
#[derive(Args, Debug)]
pub struct AddCommand {
    /// Target namespace
    pub namespace: String,

    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Publication date stored with every document
    #[arg(long)]
    pub published: Option<String>,

    /// Ignore cached chunks and embed again
    #[arg(long)]
    pub no_cache: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AddCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing add command for namespace '{}'", self.namespace);

        let files = collect_files(&self.paths)?;
        if files.is_empty() {
            return Err(AppError::Other("no files found to add".to_string()));
        }

        let store = open_store(config).await?;
        let mut results = Vec::with_capacity(files.len());

        for path in &files {
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let document = self.document_for(path, content);
            let cache_key = path.display().to_string();
            let outcome = store
                .add_document_to_namespace(
                    &self.namespace,
                    document,
                    if self.no_cache { None } else { Some(cache_key.as_str()) },
                )
                .await;

            if !self.json {
                print_outcome(path, &outcome);
            }
            results.push(serde_json::json!({
                "path": cache_key,
                "outcome": outcome,
            }));
        }

        if self.json {
            print_json(&results)?;
        }
        Ok(())
    }

    fn document_for(&self, path: &Path, content: String) -> DocumentInput {
        let title = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut document = DocumentInput::new(uuid::Uuid::new_v4().to_string(), content)
            .with_metadata("title", title)
            .with_metadata("source", path.display().to_string());
        if let Some(published) = &self.published {
            document = document.with_metadata("published", published.as_str());
        }
        document
    }
}

fn print_outcome(path: &Path, outcome: &AddDocumentOutcome) {
    match (&outcome.error, outcome.vectorized) {
        (Some(error), _) => println!("✗ {}: {}", path.display(), error),
        (None, true) => println!(
            "✓ {} ({} chunks{})",
            path.display(),
            outcome.chunk_count,
            if outcome.from_cache { ", cached" } else { "" }
        ),
        (None, false) => println!("- {} (empty, skipped)", path.display()),
    }
}

fn collect_files(paths: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(AppError::Other(format!("{} does not exist", path.display())));
        }
        for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| AppError::Other(e.to_string()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}
