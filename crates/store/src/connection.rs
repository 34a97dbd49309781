//! Lazily established, shared engine connection.

use crate::engine::{Connector, GraphEngine};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vecgraph_core::config::StoreConfig;
use vecgraph_core::AppResult;

/// Owns the engine handle for one adapter instance.
///
/// The handle is created on first use and shared by every session. A failed
/// connect leaves the manager disconnected so the next call retries.
#[derive(Debug)]
pub struct ConnectionManager {
    config: StoreConfig,
    connector: Arc<dyn Connector>,
    engine: Mutex<Option<Arc<dyn GraphEngine>>>,
    sessions: AtomicU64,
}

impl ConnectionManager {
    /// Validate settings and build a manager. No I/O happens here.
    pub fn new(config: StoreConfig, connector: Arc<dyn Connector>) -> AppResult<Self> {
        connector.validate(&config)?;

        Ok(Self {
            config,
            connector,
            engine: Mutex::new(None),
            sessions: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Return the live engine, connecting first if needed.
    pub async fn connect(&self) -> AppResult<Arc<dyn GraphEngine>> {
        let mut guard = self.engine.lock().await;
        if let Some(engine) = guard.as_ref() {
            return Ok(Arc::clone(engine));
        }

        info!(
            "[connection] connecting to {} store at {}",
            self.config.backend, self.config.uri
        );
        let engine = self.connector.connect(&self.config).await?;
        engine.ping().await?;
        *guard = Some(Arc::clone(&engine));
        Ok(engine)
    }

    /// Open a short-lived session on the shared engine.
    pub async fn session(&self) -> AppResult<Session> {
        let engine = self.connect().await?;
        let id = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("[connection] session {} opened", id);
        Ok(Session { id, engine })
    }

    pub async fn is_connected(&self) -> bool {
        self.engine.lock().await.is_some()
    }

    /// Close the engine and reset to the disconnected state. Idempotent.
    pub async fn disconnect(&self) -> AppResult<()> {
        let engine = self.engine.lock().await.take();
        let Some(engine) = engine else {
            return Ok(());
        };

        if let Err(e) = engine.close().await {
            warn!("[connection] error while closing store: {}", e);
            return Err(e);
        }
        info!("[connection] disconnected from {} store", self.config.backend);
        Ok(())
    }
}

/// A unit of work against the engine. Released on drop.
#[derive(Debug)]
pub struct Session {
    id: u64,
    engine: Arc<dyn GraphEngine>,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn engine(&self) -> &dyn GraphEngine {
        self.engine.as_ref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("[connection] session {} released", self.id);
    }
}
