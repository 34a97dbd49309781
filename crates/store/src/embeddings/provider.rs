//! Embedding provider trait and factory.

use super::providers::{mock::MockProvider, ollama::OllamaProvider};
use super::EmbeddingConfig;
use std::sync::Arc;
use vecgraph_core::{AppError, AppResult};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g. "mock", "ollama")
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    /// Length of the vectors this provider returns.
    fn dimensions(&self) -> usize;

    /// Embed several texts; the result has one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub async fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    if config.dimensions == 0 {
        return Err(AppError::Config(
            "embedding.dimensions must be greater than zero".to_string(),
        ));
    }

    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::with_model(
            config.model.clone(),
            config.dimensions,
        ))),

        "ollama" => Ok(Arc::new(OllamaProvider::new(config).await?)),

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, ollama",
            other
        ))),
    }
}

/// Embed `texts` in slices of at most `batch_size`, preserving order.
///
/// Fails if the provider returns a different number of vectors than it
/// was given for any slice.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let mut vectors = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size) {
        let embedded = provider.embed_batch(batch).await?;
        if embedded.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "{} returned {} vectors for {} texts",
                provider.provider_name(),
                embedded.len(),
                batch.len()
            )));
        }
        vectors.extend(embedded);
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_mock_provider() {
        let config = EmbeddingConfig {
            dimensions: 64,
            ..Default::default()
        };

        let provider = create_provider(&config).await.unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 64);
    }

    #[tokio::test]
    async fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "word2vec".to_string(),
            ..Default::default()
        };

        let err = create_provider(&config).await.unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_rejects_zero_dimensions() {
        let config = EmbeddingConfig {
            dimensions: 0,
            ..Default::default()
        };
        assert!(matches!(
            create_provider(&config).await,
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let provider = MockProvider::new(32);
        let texts: Vec<String> = (0..7).map(|i| format!("sentence number {}", i)).collect();

        let batched = embed_in_batches(&provider, &texts, 3).await.unwrap();
        let whole = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batched, whole);
    }

    #[derive(Debug)]
    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn provider_name(&self) -> &str {
            "short"
        }
        fn model_name(&self) -> &str {
            "short"
        }
        fn dimensions(&self) -> usize {
            2
        }
        async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(vec![vec![1.0, 0.0]])
        }
    }

    #[tokio::test]
    async fn test_embed_in_batches_detects_missing_vectors() {
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embed_in_batches(&ShortProvider, &texts, 10).await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
    }
}
