// HTTP server
//
// Serves the embedded page, the run endpoint, the report download, and the
// SSE stream that carries live chunks to the page.

mod handlers;

pub use handlers::create_router;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::sync::broadcast;

use crate::config::GuiConfig;
use crate::engine::{ConsensusEngine, EngineConfig, EngineError, RemoteEngine};
use crate::models::{ConsensusResult, StreamChunk};

// Streamed chunks are small; a deep buffer only delays the page.
const STREAM_CHANNEL_CAPACITY: usize = 256;

/// Builds the engine for one run from its explicit configuration.
pub type EngineFactory =
    Arc<dyn Fn(EngineConfig) -> Result<Arc<dyn ConsensusEngine>, EngineError> + Send + Sync>;

/// The most recent completed run, kept for the report download.
///
/// Concurrent runs within one process are not supported; each run
/// overwrites this slot.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub result: ConsensusResult,
    pub prompt: String,
}

/// Shared server state.
pub struct AppState {
    pub config: GuiConfig,
    pub engine_factory: EngineFactory,
    pub last_run: Mutex<Option<CompletedRun>>,
    pub stream_tx: broadcast::Sender<StreamChunk>,
}

impl AppState {
    /// State wired to the real remote engine.
    pub fn new(config: GuiConfig) -> Self {
        let factory: EngineFactory = Arc::new(|engine_config| {
            RemoteEngine::new(engine_config)
                .map(|engine| Arc::new(engine) as Arc<dyn ConsensusEngine>)
        });
        Self::with_engine_factory(config, factory)
    }

    /// State with an injected engine factory (used by tests).
    pub fn with_engine_factory(config: GuiConfig, engine_factory: EngineFactory) -> Self {
        let (stream_tx, _) = broadcast::channel(STREAM_CHANNEL_CAPACITY);
        Self {
            config,
            engine_factory,
            last_run: Mutex::new(None),
            stream_tx,
        }
    }
}

/// Start the HTTP server.
pub async fn serve(state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = state.config.bind_address.parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("MAGI GUI listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
