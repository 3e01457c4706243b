// Consensus engine boundary
//
// The MAGI engine is an external collaborator; this crate only knows the
// call shape and the records it returns. The one shipped implementation
// talks to a running magi-core service over HTTP.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Attachment, ConsensusResult};
use crate::streaming::StreamingEmitter;

pub mod remote;

pub use remote::{EngineConfig, RemoteEngine};

/// Structured failures crossing the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Domain error reported by the engine, carrying its short code.
    #[error("{code}: {message}")]
    Engine { code: String, message: String },

    /// Configuration rejected before any engine call was made.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the engine service.
    #[error("engine request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The engine returned a payload this crate could not decode.
    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
}

/// Asynchronous entry point of the external consensus engine.
///
/// A run either returns the complete [`ConsensusResult`] or fails as one
/// [`EngineError`]; there is no partial result. When an emitter is passed,
/// the engine additionally streams [`crate::models::StreamChunk`]s into it
/// while the run is in flight.
#[async_trait]
pub trait ConsensusEngine: Send + Sync {
    async fn execute(
        &self,
        prompt: &str,
        attachments: Option<&[Attachment]>,
        emitter: Option<StreamingEmitter>,
    ) -> Result<ConsensusResult, EngineError>;

    /// Engine name for logging.
    fn name(&self) -> &str;
}
