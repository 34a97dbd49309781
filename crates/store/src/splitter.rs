//! Text splitting for ingestion.

use serde_json::{Map, Value};
use text_splitter::ChunkConfig;
use vecgraph_core::config::SplitterConfig;
use vecgraph_core::{AppError, AppResult};

/// Parameters for one split call.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
    /// Document attributes repeated at the top of every chunk; empty means no header
    pub header_metadata: Map<String, Value>,
}

impl SplitConfig {
    pub fn new(max_chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            max_chunk_size,
            chunk_overlap,
            header_metadata: Map::new(),
        }
    }

    pub fn with_header_metadata(mut self, header_metadata: Map<String, Value>) -> Self {
        self.header_metadata = header_metadata;
        self
    }

    fn header(&self) -> Option<String> {
        let lines: Vec<String> = self
            .header_metadata
            .iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(s) if s.is_empty() => None,
                Value::String(s) => Some(format!("{}: {}", key, s)),
                other => Some(format!("{}: {}", key, other)),
            })
            .collect();

        if lines.is_empty() {
            return None;
        }
        Some(format!(
            "<document_metadata>\n{}\n</document_metadata>\n\n",
            lines.join("\n")
        ))
    }
}

impl From<&SplitterConfig> for SplitConfig {
    fn from(config: &SplitterConfig) -> Self {
        Self::new(config.max_chunk_size, config.chunk_overlap)
    }
}

/// Splits a document body into ordered chunks.
pub trait TextSplitter: Send + Sync + std::fmt::Debug {
    fn split(&self, text: &str, config: &SplitConfig) -> AppResult<Vec<String>>;
}

/// Splitter that breaks on the largest semantic unit (paragraph, sentence,
/// word) that still fits the capacity, using the `text-splitter` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SemanticSplitter;

impl TextSplitter for SemanticSplitter {
    fn split(&self, text: &str, config: &SplitConfig) -> AppResult<Vec<String>> {
        if config.max_chunk_size == 0 {
            return Err(AppError::Config(
                "splitter.maxChunkSize must be greater than zero".to_string(),
            ));
        }

        let chunk_config = ChunkConfig::new(config.max_chunk_size)
            .with_overlap(config.chunk_overlap)
            .map_err(|e| AppError::Config(format!("Invalid splitter settings: {}", e)))?;
        let splitter = text_splitter::TextSplitter::new(chunk_config);

        let header = config.header();
        let chunks: Vec<String> = splitter
            .chunks(text)
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| match &header {
                Some(header) => format!("{}{}", header, chunk),
                None => chunk.to_string(),
            })
            .collect();

        tracing::debug!(
            "[ingest] split {} bytes into {} chunks (size {}, overlap {})",
            text.len(),
            chunks.len(),
            config.max_chunk_size,
            config.chunk_overlap
        );

        Ok(chunks)
    }
}
