//! Index/graph maintenance.
//!
//! One pass over a namespace runs four ordered steps:
//! 1. discover the embedding dimension from stored chunks
//! 2. create the vector index (recreating it if the definition changed)
//! 3. drop and recreate the namespace's graph projection
//! 4. replace all similarity edges with fresh top-K neighbors
//!
//! Steps fail independently. A failure is logged and recorded in the
//! report; later steps that depend on it are skipped. Chunk writes are
//! never rolled back by a failed pass.

use crate::connection::ConnectionManager;
use crate::engine::{GraphEngine, IndexStatus, VectorIndexDef};
use crate::namespace::Namespace;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vecgraph_core::{AppError, AppResult};

/// Default number of neighbors per chunk in the KNN graph.
pub const DEFAULT_KNN_K: usize = 5;

/// What happened to the vector index during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexAction {
    Created,
    AlreadyPresent,
    /// A stale definition was dropped and replaced
    Recreated,
}

/// A maintenance step that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: String,
    pub error: String,
}

/// Summary of one maintenance pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub namespace: String,
    /// `None` when the namespace holds no embedded chunks
    pub dimension: Option<usize>,
    pub index: Option<IndexAction>,
    pub projected_nodes: Option<usize>,
    pub edges_written: Option<usize>,
    pub failures: Vec<StepFailure>,
}

impl MaintenanceReport {
    fn new(namespace: &Namespace) -> Self {
        Self {
            namespace: namespace.to_string(),
            dimension: None,
            index: None,
            projected_nodes: None,
            edges_written: None,
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, step: &str, err: AppError) {
        error!(
            "[maintenance] {} step failed for '{}': {}",
            step, self.namespace, err
        );
        self.failures.push(StepFailure {
            step: step.to_string(),
            error: err.to_string(),
        });
    }

    /// True when there was nothing to maintain.
    pub fn is_noop(&self) -> bool {
        self.dimension.is_none() && self.failures.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs maintenance passes against the shared connection.
#[derive(Debug, Clone)]
pub struct IndexMaintainer {
    connections: Arc<ConnectionManager>,
    knn_k: usize,
}

impl IndexMaintainer {
    pub fn new(connections: Arc<ConnectionManager>, knn_k: usize) -> Self {
        Self { connections, knn_k }
    }

    pub fn knn_k(&self) -> usize {
        self.knn_k
    }

    /// Run one full pass over `namespace`. Never returns an error; failures
    /// are in the report.
    pub async fn run(&self, namespace: &Namespace) -> MaintenanceReport {
        let mut report = MaintenanceReport::new(namespace);

        let session = match self.connections.session().await {
            Ok(session) => session,
            Err(e) => {
                report.fail("session", e);
                return report;
            }
        };
        let engine = session.engine();

        let dimension = match engine.sample_dimension(namespace).await {
            Ok(Some(dimension)) => dimension,
            Ok(None) => {
                debug!(
                    "[maintenance] '{}' has no embedded chunks; nothing to maintain",
                    namespace
                );
                // A projection left from earlier chunks would outlive them.
                if let Err(e) = engine.drop_projection(&namespace.projection_name()).await {
                    report.fail("projection", e);
                }
                return report;
            }
            Err(e) => {
                report.fail("dimension", e);
                return report;
            }
        };
        report.dimension = Some(dimension);

        match ensure_index(engine, &VectorIndexDef::cosine(namespace, dimension)).await {
            Ok(action) => report.index = Some(action),
            Err(e) => {
                report.fail("index", e);
                return report;
            }
        }

        let projection = namespace.projection_name();
        match rebuild_projection(engine, &projection, namespace).await {
            Ok(nodes) => report.projected_nodes = Some(nodes),
            Err(e) => {
                report.fail("projection", e);
                return report;
            }
        }

        match engine.replace_knn_edges(&projection, self.knn_k).await {
            Ok(stats) => report.edges_written = Some(stats.edges_written),
            Err(e) => {
                report.fail("knn", AppError::Maintenance(e.to_string()));
                return report;
            }
        }

        info!(
            "[maintenance] '{}' refreshed: dimension {}, {} nodes, {} edges (k={})",
            namespace,
            dimension,
            report.projected_nodes.unwrap_or(0),
            report.edges_written.unwrap_or(0),
            self.knn_k
        );
        report
    }

    /// Run a pass for every namespace currently in the store.
    pub async fn run_all(&self) -> AppResult<Vec<MaintenanceReport>> {
        let namespaces = {
            let session = self.connections.session().await?;
            session.engine().list_namespaces().await?
        };

        let mut reports = Vec::with_capacity(namespaces.len());
        for namespace in &namespaces {
            reports.push(self.run(namespace).await);
        }
        Ok(reports)
    }
}

async fn ensure_index(engine: &dyn GraphEngine, def: &VectorIndexDef) -> AppResult<IndexAction> {
    match engine.create_vector_index(def).await? {
        IndexStatus::Created => Ok(IndexAction::Created),
        IndexStatus::AlreadyPresent => Ok(IndexAction::AlreadyPresent),
        IndexStatus::Conflicting { existing } => {
            warn!(
                "[maintenance] index '{}' covers {} dimensions, data has {}; recreating",
                existing.name, existing.dimension, def.dimension
            );
            engine.drop_vector_index(&existing.name).await?;
            match engine.create_vector_index(def).await? {
                IndexStatus::Created | IndexStatus::AlreadyPresent => Ok(IndexAction::Recreated),
                IndexStatus::Conflicting { existing } => Err(AppError::Maintenance(format!(
                    "index '{}' still conflicts after drop",
                    existing.name
                ))),
            }
        }
    }
}

async fn rebuild_projection(
    engine: &dyn GraphEngine,
    name: &str,
    namespace: &Namespace,
) -> AppResult<usize> {
    if engine.projection_exists(name).await? {
        engine.drop_projection(name).await?;
        debug!("[maintenance] dropped projection '{}'", name);
    }
    let info = engine.project_graph(name, namespace).await?;
    Ok(info.node_count)
}
