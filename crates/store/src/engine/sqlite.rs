//! SQLite-backed graph engine.
//!
//! Chunk nodes, similarity edges and vector-index definitions live in
//! SQLite tables; graph projections are held in memory. All statements run
//! on the blocking pool against one shared connection, and namespaces and
//! document ids are always bound parameters.

use super::{
    Connector, GraphEngine, IndexStatus, KnnStats, NeighborPath, ProjectionInfo, ScoredChunk,
    SimilarityEdge, SimilarityMetric, VectorIndexDef,
};
use crate::namespace::Namespace;
use crate::types::{ChunkRecord, DocumentSummary, TEXT_METADATA_KEY};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use vecgraph_core::config::StoreConfig;
use vecgraph_core::{AppError, AppResult};

/// Backend discriminator served by this engine.
pub const SQLITE_BACKEND: &str = "sqlite";

const SCHEME_PREFIX: &str = "sqlite://";
const MEMORY_URIS: [&str; 2] = ["sqlite::memory:", ":memory:"];

/// Upper bound on paths collected from one start node. Strongest edges are
/// walked first, so a truncated walk keeps the heaviest paths.
pub const MAX_PATHS_PER_NODE: usize = 2_048;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    chunk_id TEXT PRIMARY KEY,
    namespace TEXT NOT NULL,
    doc_id TEXT NOT NULL,
    page_content TEXT NOT NULL,
    metadata TEXT NOT NULL,
    embedding BLOB,
    dimension INTEGER,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_namespace ON chunks(namespace);
CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(namespace, doc_id);

CREATE TABLE IF NOT EXISTS similarity_edges (
    namespace TEXT NOT NULL,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    similarity REAL NOT NULL,
    PRIMARY KEY (source_id, target_id)
);

CREATE INDEX IF NOT EXISTS idx_edges_namespace ON similarity_edges(namespace);
CREATE INDEX IF NOT EXISTS idx_edges_target ON similarity_edges(target_id);

CREATE TABLE IF NOT EXISTS vector_indexes (
    name TEXT PRIMARY KEY,
    namespace TEXT NOT NULL,
    property TEXT NOT NULL,
    dimension INTEGER NOT NULL,
    metric TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    Memory,
    File(PathBuf),
}

impl SqliteLocation {
    /// Parse `sqlite::memory:`, `sqlite://<path>` or a bare path.
    pub fn parse(uri: &str) -> AppResult<Self> {
        let uri = uri.trim();

        if uri.is_empty() {
            return Err(AppError::Config("Store URI is empty".to_string()));
        }

        if MEMORY_URIS.contains(&uri) {
            return Ok(Self::Memory);
        }

        if let Some(path) = uri.strip_prefix(SCHEME_PREFIX) {
            if path.is_empty() {
                return Err(AppError::Config(format!("URI '{}' has no database path", uri)));
            }
            return Ok(Self::File(PathBuf::from(path)));
        }

        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(AppError::Config(format!(
                "Unsupported URI scheme '{}' for the {} backend",
                scheme, SQLITE_BACKEND
            )));
        }

        Ok(Self::File(PathBuf::from(uri)))
    }
}

impl fmt::Display for SqliteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqliteLocation::Memory => f.write_str(":memory:"),
            SqliteLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Connector producing [`SqliteGraphEngine`] handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteConnector;

#[async_trait::async_trait]
impl Connector for SqliteConnector {
    fn backend(&self) -> &str {
        SQLITE_BACKEND
    }

    fn validate(&self, config: &StoreConfig) -> AppResult<()> {
        config.validate(SQLITE_BACKEND)?;
        SqliteLocation::parse(&config.uri).map(|_| ())
    }

    async fn connect(&self, config: &StoreConfig) -> AppResult<Arc<dyn GraphEngine>> {
        let location = SqliteLocation::parse(&config.uri)?;
        if config.username.is_some() {
            tracing::debug!("[connection] sqlite backend does not authenticate; credentials unused");
        }

        let engine = tokio::task::spawn_blocking(move || SqliteGraphEngine::open(location))
            .await
            .map_err(|e| AppError::Connection(format!("sqlite open join: {e}")))??;

        Ok(Arc::new(engine))
    }
}

/// In-memory graph view over a namespace's embedded chunks.
#[derive(Debug, Clone)]
struct Projection {
    namespace: Namespace,
    nodes: Vec<(String, Vec<f32>)>,
}

/// Graph engine over a single SQLite connection.
pub struct SqliteGraphEngine {
    location: SqliteLocation,
    conn: Arc<Mutex<Connection>>,
    projections: Arc<RwLock<HashMap<String, Projection>>>,
}

impl fmt::Debug for SqliteGraphEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteGraphEngine")
            .field("location", &self.location)
            .finish()
    }
}

impl SqliteGraphEngine {
    /// Open (or create) the database and its schema. Blocking.
    pub fn open(location: SqliteLocation) -> AppResult<Self> {
        let conn = match &location {
            SqliteLocation::Memory => Connection::open_in_memory(),
            SqliteLocation::File(path) => Connection::open(path),
        }
        .map_err(|e| {
            AppError::Connection(format!("Failed to open SQLite store at {}: {}", location, e))
        })?;

        conn.execute_batch(SCHEMA).map_err(|e| {
            AppError::Connection(format!("Failed to initialize schema at {}: {}", location, e))
        })?;

        tracing::debug!("[connection] opened SQLite graph store at {}", location);

        Ok(Self {
            location,
            conn: Arc::new(Mutex::new(conn)),
            projections: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::open(SqliteLocation::Memory)
    }

    /// Run `f` on the blocking pool with exclusive access to the connection.
    async fn with_conn<T, F>(&self, action: &'static str, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| AppError::Storage(format!("{action}: connection lock poisoned")))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| AppError::Storage(format!("{action} join: {e}")))?
    }

    fn projection(&self, name: &str) -> AppResult<Option<Projection>> {
        let projections = self
            .projections
            .read()
            .map_err(|_| AppError::Storage("projection registry poisoned".to_string()))?;
        Ok(projections.get(name).cloned())
    }

    fn remove_projections_for(&self, namespace: Option<&Namespace>) -> AppResult<()> {
        let mut projections = self
            .projections
            .write()
            .map_err(|_| AppError::Storage("projection registry poisoned".to_string()))?;
        match namespace {
            Some(ns) => projections.retain(|_, p| &p.namespace != ns),
            None => projections.clear(),
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl GraphEngine for SqliteGraphEngine {
    fn backend_name(&self) -> &str {
        SQLITE_BACKEND
    }

    async fn ping(&self) -> AppResult<()> {
        self.with_conn("ping", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map(|_| ())
                .map_err(|e| db_err("ping", e))
        })
        .await
    }

    async fn list_namespaces(&self) -> AppResult<Vec<Namespace>> {
        self.with_conn("list namespaces", |conn| {
            let mut stmt = conn
                .prepare("SELECT DISTINCT namespace FROM chunks ORDER BY namespace")
                .map_err(|e| db_err("prepare namespace listing", e))?;
            let raw = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| db_err("list namespaces", e))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| db_err("read namespace row", e))?;

            Ok(raw
                .into_iter()
                .filter_map(|name| match Namespace::parse(&name) {
                    Ok(ns) => Some(ns),
                    Err(e) => {
                        tracing::warn!("[namespace] skipping stored namespace: {}", e);
                        None
                    }
                })
                .collect())
        })
        .await
    }

    async fn count_chunks(&self, namespace: &Namespace) -> AppResult<u64> {
        let ns = namespace.to_string();
        self.with_conn("count chunks", move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM chunks WHERE namespace = ?1",
                params![ns],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| db_err("count chunks", e))
        })
        .await
    }

    async fn insert_chunks(&self, namespace: &Namespace, chunks: &[ChunkRecord]) -> AppResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let ns = namespace.to_string();
        let chunks = chunks.to_vec();
        self.with_conn("insert chunks", move |conn| {
            let now = Utc::now().to_rfc3339();
            let tx = conn
                .transaction()
                .map_err(|e| db_err("begin insert", e))?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO chunks
                         (chunk_id, namespace, doc_id, page_content, metadata, embedding, dimension, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    )
                    .map_err(|e| db_err("prepare insert", e))?;

                for chunk in &chunks {
                    let metadata = serde_json::to_string(&chunk.metadata)?;
                    let embedding = chunk.embedding.as_deref().map(embedding_to_bytes);
                    let dimension = chunk.embedding.as_ref().map(|e| e.len() as i64);

                    stmt.execute(params![
                        chunk.chunk_id,
                        ns,
                        chunk.doc_id,
                        chunk.page_content,
                        metadata,
                        embedding,
                        dimension,
                        now,
                    ])
                    .map_err(|e| db_err("insert chunk", e))?;
                }
            }
            tx.commit().map_err(|e| db_err("commit insert", e))
        })
        .await
    }

    async fn delete_document(&self, namespace: &Namespace, doc_id: &str) -> AppResult<u64> {
        let ns = namespace.to_string();
        let doc_id = doc_id.to_string();
        self.with_conn("delete document", move |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| db_err("begin document delete", e))?;
            tx.execute(
                "DELETE FROM similarity_edges
                 WHERE namespace = ?1
                   AND (source_id IN (SELECT chunk_id FROM chunks WHERE namespace = ?1 AND doc_id = ?2)
                     OR target_id IN (SELECT chunk_id FROM chunks WHERE namespace = ?1 AND doc_id = ?2))",
                params![ns, doc_id],
            )
            .map_err(|e| db_err("detach document edges", e))?;
            let deleted = tx
                .execute(
                    "DELETE FROM chunks WHERE namespace = ?1 AND doc_id = ?2",
                    params![ns, doc_id],
                )
                .map_err(|e| db_err("delete document chunks", e))?;
            tx.commit().map_err(|e| db_err("commit document delete", e))?;
            Ok(deleted as u64)
        })
        .await
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> AppResult<u64> {
        let ns = namespace.to_string();
        let deleted = self
            .with_conn("delete namespace", move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(|e| db_err("begin namespace delete", e))?;
                tx.execute("DELETE FROM similarity_edges WHERE namespace = ?1", params![ns])
                    .map_err(|e| db_err("delete namespace edges", e))?;
                let deleted = tx
                    .execute("DELETE FROM chunks WHERE namespace = ?1", params![ns])
                    .map_err(|e| db_err("delete namespace chunks", e))?;
                tx.execute("DELETE FROM vector_indexes WHERE namespace = ?1", params![ns])
                    .map_err(|e| db_err("delete namespace indexes", e))?;
                tx.commit().map_err(|e| db_err("commit namespace delete", e))?;
                Ok(deleted as u64)
            })
            .await?;

        self.remove_projections_for(Some(namespace))?;
        Ok(deleted)
    }

    async fn delete_all(&self) -> AppResult<()> {
        self.with_conn("delete all", |conn| {
            let tx = conn
                .transaction()
                .map_err(|e| db_err("begin delete all", e))?;
            tx.execute_batch(
                "DELETE FROM similarity_edges;
                 DELETE FROM chunks;
                 DELETE FROM vector_indexes;",
            )
            .map_err(|e| db_err("delete all", e))?;
            tx.commit().map_err(|e| db_err("commit delete all", e))
        })
        .await?;

        self.remove_projections_for(None)
    }

    async fn list_documents(&self, namespace: &Namespace) -> AppResult<Vec<DocumentSummary>> {
        let ns = namespace.to_string();
        self.with_conn("list documents", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT doc_id, COUNT(*), MIN(created_at), MIN(rowid)
                     FROM chunks WHERE namespace = ?1
                     GROUP BY doc_id ORDER BY MIN(rowid)",
                )
                .map_err(|e| db_err("prepare document listing", e))?;
            let rows = stmt
                .query_map(params![ns], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                })
                .map_err(|e| db_err("list documents", e))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| db_err("read document row", e))?;

            let mut documents = Vec::with_capacity(rows.len());
            for (doc_id, chunk_count, created_at, first_rowid) in rows {
                let raw: String = conn
                    .query_row(
                        "SELECT metadata FROM chunks WHERE rowid = ?1",
                        params![first_rowid],
                        |row| row.get(0),
                    )
                    .map_err(|e| db_err("read document metadata", e))?;
                let mut metadata: serde_json::Value = serde_json::from_str(&raw)?;
                if let Some(map) = metadata.as_object_mut() {
                    map.remove(TEXT_METADATA_KEY);
                }

                documents.push(DocumentSummary {
                    doc_id,
                    chunk_count: chunk_count as u64,
                    metadata,
                    first_ingested_at: DateTime::parse_from_rfc3339(&created_at)
                        .ok()
                        .map(|t| t.with_timezone(&Utc)),
                });
            }
            Ok(documents)
        })
        .await
    }

    async fn sample_dimension(&self, namespace: &Namespace) -> AppResult<Option<usize>> {
        let ns = namespace.to_string();
        self.with_conn("sample dimension", move |conn| {
            conn.query_row(
                "SELECT dimension FROM chunks
                 WHERE namespace = ?1 AND embedding IS NOT NULL LIMIT 1",
                params![ns],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map(|d| d.map(|d| d as usize))
            .map_err(|e| db_err("sample dimension", e))
        })
        .await
    }

    async fn describe_vector_index(&self, name: &str) -> AppResult<Option<VectorIndexDef>> {
        let name = name.to_string();
        self.with_conn("describe vector index", move |conn| read_index(conn, &name))
            .await
    }

    async fn create_vector_index(&self, def: &VectorIndexDef) -> AppResult<IndexStatus> {
        let def = def.clone();
        self.with_conn("create vector index", move |conn| {
            if let Some(existing) = read_index(conn, &def.name)? {
                return Ok(if existing == def {
                    IndexStatus::AlreadyPresent
                } else {
                    IndexStatus::Conflicting { existing }
                });
            }

            conn.execute(
                "INSERT INTO vector_indexes (name, namespace, property, dimension, metric, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    def.name,
                    def.namespace.as_str(),
                    def.property,
                    def.dimension as i64,
                    def.metric.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| db_err("create vector index", e))?;
            Ok(IndexStatus::Created)
        })
        .await
    }

    async fn drop_vector_index(&self, name: &str) -> AppResult<bool> {
        let name = name.to_string();
        self.with_conn("drop vector index", move |conn| {
            conn.execute("DELETE FROM vector_indexes WHERE name = ?1", params![name])
                .map(|n| n > 0)
                .map_err(|e| db_err("drop vector index", e))
        })
        .await
    }

    async fn projection_exists(&self, name: &str) -> AppResult<bool> {
        Ok(self.projection(name)?.is_some())
    }

    async fn drop_projection(&self, name: &str) -> AppResult<bool> {
        let mut projections = self
            .projections
            .write()
            .map_err(|_| AppError::Storage("projection registry poisoned".to_string()))?;
        Ok(projections.remove(name).is_some())
    }

    async fn project_graph(&self, name: &str, namespace: &Namespace) -> AppResult<ProjectionInfo> {
        if self.projection(name)?.is_some() {
            return Err(AppError::Storage(format!(
                "projection '{}' already exists",
                name
            )));
        }

        let ns = namespace.to_string();
        let nodes = self
            .with_conn("project graph", move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT chunk_id, embedding FROM chunks
                         WHERE namespace = ?1 AND embedding IS NOT NULL
                         ORDER BY chunk_id",
                    )
                    .map_err(|e| db_err("prepare projection", e))?;
                let rows = stmt
                    .query_map(params![ns], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                    })
                    .map_err(|e| db_err("project graph", e))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| db_err("read projection row", e))?;

                rows.into_iter()
                    .map(|(id, bytes)| Ok((id, bytes_to_embedding(&bytes)?)))
                    .collect::<AppResult<Vec<_>>>()
            })
            .await?;

        let node_count = nodes.len();
        let mut projections = self
            .projections
            .write()
            .map_err(|_| AppError::Storage("projection registry poisoned".to_string()))?;
        if projections.contains_key(name) {
            return Err(AppError::Storage(format!(
                "projection '{}' already exists",
                name
            )));
        }
        projections.insert(
            name.to_string(),
            Projection {
                namespace: namespace.clone(),
                nodes,
            },
        );

        Ok(ProjectionInfo {
            name: name.to_string(),
            namespace: namespace.clone(),
            node_count,
        })
    }

    async fn replace_knn_edges(&self, projection: &str, k: usize) -> AppResult<KnnStats> {
        let projection = self.projection(projection)?.ok_or_else(|| {
            AppError::Storage(format!("projection '{}' does not exist", projection))
        })?;

        self.with_conn("replace knn edges", move |conn| {
            let edges = knn_edges(&projection.nodes, k);
            let ns = projection.namespace.to_string();

            let tx = conn
                .transaction()
                .map_err(|e| db_err("begin knn write", e))?;
            tx.execute("DELETE FROM similarity_edges WHERE namespace = ?1", params![ns])
                .map_err(|e| db_err("clear similarity edges", e))?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT OR REPLACE INTO similarity_edges (namespace, source_id, target_id, similarity)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(|e| db_err("prepare edge insert", e))?;
                for edge in &edges {
                    stmt.execute(params![ns, edge.source_id, edge.target_id, edge.similarity as f64])
                        .map_err(|e| db_err("insert similarity edge", e))?;
                }
            }
            tx.commit().map_err(|e| db_err("commit knn write", e))?;

            Ok(KnnStats {
                nodes_compared: projection.nodes.len(),
                edges_written: edges.len(),
            })
        })
        .await
    }

    async fn edge_count(&self, namespace: &Namespace) -> AppResult<u64> {
        let ns = namespace.to_string();
        self.with_conn("count edges", move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM similarity_edges WHERE namespace = ?1",
                params![ns],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(|e| db_err("count edges", e))
        })
        .await
    }

    async fn similarity_edges(&self, namespace: &Namespace) -> AppResult<Vec<SimilarityEdge>> {
        let ns = namespace.to_string();
        self.with_conn("list edges", move |conn| load_edges(conn, &ns, f32::MIN))
            .await
    }

    async fn direct_similarity(
        &self,
        namespace: &Namespace,
        query: &[f32],
        exclude_doc_ids: &[String],
        threshold: f32,
    ) -> AppResult<Vec<ScoredChunk>> {
        let ns = namespace.to_string();
        let query = query.to_vec();
        let excluded: HashSet<String> = exclude_doc_ids.iter().cloned().collect();

        self.with_conn("direct similarity", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT chunk_id, doc_id, page_content, metadata, embedding FROM chunks
                     WHERE namespace = ?1 AND embedding IS NOT NULL
                     ORDER BY rowid",
                )
                .map_err(|e| db_err("prepare similarity query", e))?;
            let rows = stmt
                .query_map(params![ns], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Vec<u8>>(4)?,
                    ))
                })
                .map_err(|e| db_err("similarity query", e))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| db_err("read similarity row", e))?;

            let mut scored = Vec::new();
            for (chunk_id, doc_id, page_content, metadata, bytes) in rows {
                if excluded.contains(&doc_id) {
                    continue;
                }

                let embedding = bytes_to_embedding(&bytes)?;
                let similarity = cosine_similarity(&query, &embedding);
                if similarity < threshold {
                    continue;
                }

                scored.push(ScoredChunk {
                    chunk: ChunkRecord {
                        chunk_id,
                        doc_id,
                        page_content,
                        metadata: serde_json::from_str(&metadata)?,
                        embedding: None,
                    },
                    similarity,
                });
            }
            Ok(scored)
        })
        .await
    }

    async fn traverse_similarity(
        &self,
        namespace: &Namespace,
        start_ids: &[String],
        max_depth: usize,
        min_weight: f32,
    ) -> AppResult<HashMap<String, Vec<NeighborPath>>> {
        let ns = namespace.to_string();
        let start_ids = start_ids.to_vec();

        self.with_conn("traverse similarity", move |conn| {
            let edges = load_edges(conn, &ns, min_weight)?;
            let adjacency = build_adjacency(&edges);

            let mut result = HashMap::with_capacity(start_ids.len());
            for start in start_ids {
                let mut paths = Vec::new();
                if max_depth > 0 {
                    let mut visited = HashSet::from([start.clone()]);
                    let mut weights = Vec::with_capacity(max_depth);
                    walk_paths(&adjacency, &start, max_depth, &mut visited, &mut weights, &mut paths);
                    if paths.len() >= MAX_PATHS_PER_NODE {
                        tracing::debug!(
                            "[search] path walk from {} stopped at {} paths",
                            start,
                            MAX_PATHS_PER_NODE
                        );
                    }
                }
                result.insert(start, paths);
            }
            Ok(result)
        })
        .await
    }
}

fn db_err(action: &str, e: rusqlite::Error) -> AppError {
    AppError::Storage(format!("Failed to {}: {}", action, e))
}

fn read_index(conn: &Connection, name: &str) -> AppResult<Option<VectorIndexDef>> {
    let row = conn
        .query_row(
            "SELECT name, namespace, property, dimension, metric FROM vector_indexes WHERE name = ?1",
            params![name],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()
        .map_err(|e| db_err("read vector index", e))?;

    let Some((name, namespace, property, dimension, metric)) = row else {
        return Ok(None);
    };

    let metric = SimilarityMetric::parse(&metric)
        .ok_or_else(|| AppError::Storage(format!("index '{}' has unknown metric '{}'", name, metric)))?;

    Ok(Some(VectorIndexDef {
        name,
        namespace: Namespace::parse(&namespace)?,
        property,
        dimension: dimension as usize,
        metric,
    }))
}

fn load_edges(conn: &Connection, namespace: &str, min_weight: f32) -> AppResult<Vec<SimilarityEdge>> {
    let mut stmt = conn
        .prepare(
            "SELECT source_id, target_id, similarity FROM similarity_edges
             WHERE namespace = ?1 AND similarity >= ?2
             ORDER BY source_id, target_id",
        )
        .map_err(|e| db_err("prepare edge query", e))?;
    let edges = stmt
        .query_map(params![namespace, min_weight as f64], |row| {
            Ok(SimilarityEdge {
                source_id: row.get(0)?,
                target_id: row.get(1)?,
                similarity: row.get::<_, f64>(2)? as f32,
            })
        })
        .map_err(|e| db_err("load edges", e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| db_err("read edge row", e))?;
    Ok(edges)
}

/// Undirected adjacency; a pair linked in both directions keeps the larger
/// weight. Neighbors are ordered by weight (descending), then id.
fn build_adjacency(edges: &[SimilarityEdge]) -> HashMap<String, Vec<(String, f32)>> {
    let mut merged: HashMap<&str, HashMap<&str, f32>> = HashMap::new();
    for edge in edges {
        for (from, to) in [
            (edge.source_id.as_str(), edge.target_id.as_str()),
            (edge.target_id.as_str(), edge.source_id.as_str()),
        ] {
            let weight = merged.entry(from).or_default().entry(to).or_insert(edge.similarity);
            if edge.similarity > *weight {
                *weight = edge.similarity;
            }
        }
    }

    merged
        .into_iter()
        .map(|(node, neighbors)| {
            let mut neighbors: Vec<(String, f32)> = neighbors
                .into_iter()
                .map(|(id, w)| (id.to_string(), w))
                .collect();
            neighbors.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            (node.to_string(), neighbors)
        })
        .collect()
}

fn walk_paths(
    adjacency: &HashMap<String, Vec<(String, f32)>>,
    node: &str,
    max_depth: usize,
    visited: &mut HashSet<String>,
    weights: &mut Vec<f32>,
    out: &mut Vec<NeighborPath>,
) {
    if weights.len() >= max_depth || out.len() >= MAX_PATHS_PER_NODE {
        return;
    }
    let Some(neighbors) = adjacency.get(node) else {
        return;
    };

    for (next, weight) in neighbors {
        if out.len() >= MAX_PATHS_PER_NODE {
            return;
        }
        if visited.contains(next) {
            continue;
        }
        weights.push(*weight);
        out.push(NeighborPath {
            node_id: next.clone(),
            weights: weights.clone(),
        });
        visited.insert(next.clone());
        walk_paths(adjacency, next, max_depth, visited, weights, out);
        visited.remove(next);
        weights.pop();
    }
}

/// Exact top-`k` cosine neighbors for every node.
///
/// Only positive similarities become edges. Ties break on chunk id, so the
/// edge set is a pure function of the node set.
fn knn_edges(nodes: &[(String, Vec<f32>)], k: usize) -> Vec<SimilarityEdge> {
    let mut edges = Vec::new();
    if k == 0 {
        return edges;
    }

    for (i, (source, embedding)) in nodes.iter().enumerate() {
        let mut candidates: Vec<(&str, f32)> = nodes
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (id, other))| (id.as_str(), cosine_similarity(embedding, other)))
            .filter(|(_, sim)| *sim > 0.0)
            .collect();

        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        candidates.truncate(k);

        edges.extend(candidates.into_iter().map(|(target, sim)| SimilarityEdge {
            source_id: source.clone(),
            target_id: target.to_string(),
            similarity: sim.min(1.0),
        }));
    }

    edges
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Storage(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
