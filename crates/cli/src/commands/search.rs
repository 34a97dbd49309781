//! Search command handler.

use super::{open_store, print_json};
use clap::Args;
use vecgraph_core::{config::AppConfig, AppError, AppResult};

/// Hybrid similarity search in a namespace
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Namespace to search
    pub namespace: String,

    /// Query text
    pub query: String,

    /// Minimum direct similarity (default from config)
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Maximum number of results (default from config)
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,

    /// Hops through the similarity graph; 0 ranks by cosine alone
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Document ids to leave out of the results
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command in namespace '{}'", self.namespace);

        let store = open_store(config).await?;
        let mut request = store
            .search_request(&self.namespace, &self.query)
            .exclude_documents(self.exclude.clone());
        if let Some(threshold) = self.threshold {
            request = request.threshold(threshold);
        }
        if let Some(top_n) = self.top_n {
            request = request.top_n(top_n);
        }
        if let Some(depth) = self.depth {
            request = request.knn_depth(depth);
        }

        let result = store.perform_similarity_search(&request).await;

        if self.json {
            print_json(&result)?;
        } else if let Some(message) = &result.message {
            println!("{}", message);
        } else {
            for (i, (source, text)) in result.sources.iter().zip(&result.context_texts).enumerate() {
                let title = source
                    .metadata
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&source.doc_id);
                println!(
                    "[{}] {} (score {:.3}, direct {:.3}, graph {:.3})",
                    i + 1,
                    title,
                    source.score,
                    source.direct_similarity,
                    source.graph_similarity
                );
                println!("    {}", text.replace('\n', "\n    "));
                println!();
            }
        }

        match result.error {
            Some(error) => Err(AppError::Query(error)),
            None => Ok(()),
        }
    }
}
