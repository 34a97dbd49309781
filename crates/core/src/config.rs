//! Configuration management for vecgraph.
//!
//! Configuration is layered, later sources winning:
//! - Built-in defaults
//! - Config file (`.vecgraph/config.yaml` in the workspace, or `VECGRAPH_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Configuration is read once at startup; the store section is validated
//! against the connector before any connection is attempted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".vecgraph";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .vecgraph/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Backing engine connection settings
    pub store: StoreConfig,

    /// Embedding provider settings
    pub embedding: EmbeddingConfig,

    /// Text splitter settings
    pub splitter: SplitterConfig,

    /// Default search parameters
    pub search: SearchDefaults,

    /// Index/graph maintenance settings
    pub maintenance: MaintenanceConfig,

    /// Chunk cache settings
    pub cache: CacheConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON
    pub json_logs: bool,
}

/// Connection settings for the backing graph/vector engine.
///
/// `Debug` is implemented by hand so the password never reaches a log line.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Backend discriminator; must match the connector identity
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Engine URI (e.g. `sqlite://path/graph.db`, `sqlite::memory:`)
    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl StoreConfig {
    /// Build a config for the given backend and URI without credentials.
    pub fn new(backend: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            uri: uri.into(),
            username: None,
            password: None,
        }
    }

    /// Attach credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Validate the settings for the adapter identified by `expected_backend`.
    ///
    /// Runs before any network or file I/O; every failure is a
    /// configuration error.
    pub fn validate(&self, expected_backend: &str) -> AppResult<()> {
        if self.backend != expected_backend {
            return Err(AppError::Config(format!(
                "Backend '{}' does not match this adapter ('{}')",
                self.backend, expected_backend
            )));
        }

        if self.uri.trim().is_empty() {
            return Err(AppError::Config("Store URI is empty".to_string()));
        }

        match (&self.username, &self.password) {
            (Some(_), None) => Err(AppError::Config(
                "Store username is set but the password is missing".to_string(),
            )),
            (None, Some(_)) => Err(AppError::Config(
                "Store password is set but the username is missing".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "mock", "ollama"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Model identifier (provider-specific)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Expected embedding dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Provider endpoint override (e.g. Ollama base URL)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Maximum texts per provider request
    #[serde(default = "default_batch_size", rename = "batchSize")]
    pub batch_size: usize,
}

fn default_embedding_provider() -> String {
    "mock".to_string()
}

fn default_embedding_model() -> String {
    "trigram-v1".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_batch_size() -> usize {
    100
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            endpoint: None,
            batch_size: default_batch_size(),
        }
    }
}

/// Text splitter configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitterConfig {
    /// Maximum chunk size in characters
    #[serde(default = "default_max_chunk_size", rename = "maxChunkSize")]
    pub max_chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap", rename = "chunkOverlap")]
    pub chunk_overlap: usize,
}

fn default_max_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    20
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Default parameters for similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchDefaults {
    #[serde(default = "default_threshold", rename = "similarityThreshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_top_n", rename = "topN")]
    pub top_n: usize,

    #[serde(default = "default_knn_depth", rename = "knnDepth")]
    pub knn_depth: usize,
}

fn default_threshold() -> f32 {
    0.25
}

fn default_top_n() -> usize {
    4
}

fn default_knn_depth() -> usize {
    2
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            similarity_threshold: default_threshold(),
            top_n: default_top_n(),
            knn_depth: default_knn_depth(),
        }
    }
}

/// Index/graph maintenance configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceConfig {
    /// Neighbors written per chunk by the KNN step
    #[serde(default = "default_knn_k", rename = "knnK")]
    pub knn_k: usize,
}

fn default_knn_k() -> usize {
    5
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            knn_k: default_knn_k(),
        }
    }
}

/// Chunk cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Cache directory (defaults to `.vecgraph/vector-cache`)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: None,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    store: Option<StoreConfig>,
    embedding: Option<EmbeddingConfig>,
    splitter: Option<SplitterConfig>,
    search: Option<SearchDefaults>,
    maintenance: Option<MaintenanceConfig>,
    cache: Option<CacheConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            store: StoreConfig::new(default_backend(), ""),
            embedding: EmbeddingConfig::default(),
            splitter: SplitterConfig::default(),
            search: SearchDefaults::default(),
            maintenance: MaintenanceConfig::default(),
            cache: CacheConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and the environment.
    ///
    /// Environment variables:
    /// - `VECGRAPH_WORKSPACE`: Override workspace path
    /// - `VECGRAPH_CONFIG`: Path to config file
    /// - `VECGRAPH_BACKEND`: Backend discriminator
    /// - `VECGRAPH_URI`: Store URI
    /// - `VECGRAPH_USERNAME` / `VECGRAPH_PASSWORD`: Store credentials
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("VECGRAPH_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("VECGRAPH_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.state_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(backend) = std::env::var("VECGRAPH_BACKEND") {
            config.store.backend = backend;
        }

        if let Ok(uri) = std::env::var("VECGRAPH_URI") {
            config.store.uri = uri;
        }

        if let Ok(username) = std::env::var("VECGRAPH_USERNAME") {
            config.store.username = Some(username);
        }

        if let Ok(password) = std::env::var("VECGRAPH_PASSWORD") {
            config.store.password = Some(password);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.json_logs = json;
            }
        }

        if let Some(store) = config_file.store {
            result.store = store;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(splitter) = config_file.splitter {
            result.splitter = splitter;
        }
        if let Some(search) = config_file.search {
            result.search = search;
        }
        if let Some(maintenance) = config_file.maintenance {
            result.maintenance = maintenance;
        }
        if let Some(cache) = config_file.cache {
            result.cache = cache;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        uri: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
        json_logs: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(uri) = uri {
            self.store.uri = uri;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        if json_logs {
            self.json_logs = true;
        }

        self
    }

    /// Get the path to the .vecgraph directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Ensure the .vecgraph directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let state_dir = self.state_dir();
        if !state_dir.exists() {
            std::fs::create_dir_all(&state_dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Store settings with the URI defaulted to the workspace database.
    pub fn store_config(&self) -> StoreConfig {
        let mut store = self.store.clone();
        if store.uri.trim().is_empty() {
            store.uri = format!("sqlite://{}", self.state_dir().join("graph.db").display());
        }
        store
    }

    /// Directory for the chunk cache, or `None` when caching is disabled.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        if !self.cache.enabled {
            return None;
        }
        Some(
            self.cache
                .dir
                .clone()
                .unwrap_or_else(|| self.state_dir().join("vector-cache")),
        )
    }
}
