//! Embedding providers.
//!
//! Chunk text goes in, fixed-length vectors come out. The dimension is a
//! property of the provider and model; the store discovers it from the
//! vectors actually written rather than trusting configuration.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, embed_in_batches, EmbeddingProvider};
pub use vecgraph_core::config::EmbeddingConfig;
