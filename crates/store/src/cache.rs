//! Content-addressed chunk cache.
//!
//! Stores the split and embedded chunks of a source file so re-ingesting the
//! same file skips splitting and embedding.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use vecgraph_core::{AppError, AppResult};

/// One previously embedded chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedChunk {
    pub text: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[async_trait::async_trait]
pub trait ChunkCache: Send + Sync + std::fmt::Debug {
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Cached chunks for `key`, or `None` when nothing is stored.
    async fn load(&self, key: &str) -> AppResult<Option<Vec<CachedChunk>>>;

    /// Replace whatever is stored for `key`.
    async fn store(&self, key: &str, chunks: &[CachedChunk]) -> AppResult<()>;
}

/// JSON files under a directory, one per key, named by the key's SHA-256.
#[derive(Debug, Clone)]
pub struct FileChunkCache {
    dir: PathBuf,
}

impl FileChunkCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }
}

#[async_trait::async_trait]
impl ChunkCache for FileChunkCache {
    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(tokio::fs::try_exists(self.entry_path(key)).await?)
    }

    async fn load(&self, key: &str) -> AppResult<Option<Vec<CachedChunk>>> {
        let path = self.entry_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let chunks: Vec<CachedChunk> = serde_json::from_slice(&raw).map_err(|e| {
            AppError::Serialization(format!("Corrupt cache entry {}: {}", path.display(), e))
        })?;
        Ok(Some(chunks))
    }

    async fn store(&self, key: &str, chunks: &[CachedChunk]) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(chunks)?).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!("[ingest] cached {} chunks at {}", chunks.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> Vec<CachedChunk> {
        vec![CachedChunk {
            text: "cached chunk".to_string(),
            vector: vec![0.5, 0.5],
            metadata: json!({ "title": "notes" }),
        }]
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let temp = TempDir::new().unwrap();
        let cache = FileChunkCache::new(temp.path().join("vector-cache"));

        assert!(!cache.exists("/docs/notes.md").await.unwrap());
        assert!(cache.load("/docs/notes.md").await.unwrap().is_none());

        cache.store("/docs/notes.md", &sample()).await.unwrap();
        assert!(cache.exists("/docs/notes.md").await.unwrap());
        assert_eq!(cache.load("/docs/notes.md").await.unwrap(), Some(sample()));
        assert!(!cache.exists("/docs/other.md").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_name_is_sha256() {
        let cache = FileChunkCache::new("/cache");
        let path = cache.entry_path("abc");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.json"
        );
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_error() {
        let temp = TempDir::new().unwrap();
        let cache = FileChunkCache::new(temp.path());
        std::fs::write(cache.entry_path("broken"), b"{not json").unwrap();

        assert!(matches!(
            cache.load("broken").await,
            Err(AppError::Serialization(_))
        ));
    }
}
