// Run orchestration
//
// Validates the submitted form, builds the engine configuration, executes
// the engine on a spawned task, and hands the result to the renderer. A
// run either fully succeeds or fails with a single user-visible message;
// nothing partial is retained.

use std::sync::Arc;

use thiserror::Error;

use crate::config::{
    GeminiModel, GuiConfig, ACCEPTED_ATTACHMENT_TYPES, MAX_ATTACHMENT_BYTES, MAX_DEBATE_ROUNDS,
    MIN_DEBATE_ROUNDS,
};
use crate::engine::{ConsensusEngine, EngineConfig, EngineError};
use crate::models::{Attachment, ConsensusResult, StreamChunk};
use crate::streaming::StreamingAdapter;

/// One submitted run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub prompt: String,
    pub api_key: String,
    pub model: GeminiModel,
    pub debate_rounds: u32,
    pub streaming: bool,
    pub attachments: Vec<Attachment>,
}

/// Input rejected before any engine call. The message is shown to the
/// user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide a Gemini API key to continue.")]
    MissingApiKey,
    #[error("Please enter a prompt to run.")]
    EmptyPrompt,
    #[error("Debate rounds must be between 1 and 5.")]
    RoundsOutOfRange,
    #[error("File '{0}' exceeds 10MB limit.")]
    AttachmentTooLarge(String),
    #[error("File '{0}' has an unsupported type.")]
    UnsupportedAttachment(String),
}

/// Why a run produced no result.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl RunError {
    /// The user-visible message: structured engine errors verbatim as
    /// "<code>: <message>", validation messages as written, anything else
    /// behind a generic prefix.
    pub fn user_message(&self) -> String {
        match self {
            RunError::Validation(e) => e.to_string(),
            RunError::Engine(EngineError::Engine { code, message }) => {
                format!("{code}: {message}")
            }
            RunError::Engine(e) => format!("Magi error: {e}"),
            RunError::Internal(e) => format!("Unexpected error: {e}"),
        }
    }
}

/// A successful run, ready for rendering and export.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: ConsensusResult,
    pub prompt: String,
    /// Chunks the streaming bridge had to discard, if streaming was on.
    pub dropped_chunks: u64,
}

/// Reject invalid input before any engine call.
pub fn validate(request: &RunRequest) -> Result<(), ValidationError> {
    if request.api_key.trim().is_empty() {
        return Err(ValidationError::MissingApiKey);
    }
    if request.prompt.trim().is_empty() {
        return Err(ValidationError::EmptyPrompt);
    }
    if !(MIN_DEBATE_ROUNDS..=MAX_DEBATE_ROUNDS).contains(&request.debate_rounds) {
        return Err(ValidationError::RoundsOutOfRange);
    }
    for attachment in &request.attachments {
        if attachment.data.len() as u64 > MAX_ATTACHMENT_BYTES {
            return Err(ValidationError::AttachmentTooLarge(
                attachment.filename.clone(),
            ));
        }
        if !ACCEPTED_ATTACHMENT_TYPES.contains(&attachment.mime_type.as_str()) {
            return Err(ValidationError::UnsupportedAttachment(
                attachment.filename.clone(),
            ));
        }
    }
    Ok(())
}

/// Engine configuration for one run: the explicit object the engine
/// receives instead of process-wide environment state.
pub fn engine_config(config: &GuiConfig, request: &RunRequest) -> EngineConfig {
    EngineConfig {
        engine_url: config.engine_url.clone(),
        provider: "gemini".to_string(),
        api_key: request.api_key.clone(),
        model: request.model.as_str().to_string(),
        endpoint: config.gemini_endpoint.clone(),
        debate_rounds: request.debate_rounds,
    }
}

/// Execute one run to completion.
///
/// The engine call runs on its own task and is awaited through the join
/// handle. When streaming is requested, a bridge is wired as a
/// side-channel and `on_chunk` observes every delivered chunk; the bridge
/// is closed when the run finishes, success or failure.
pub async fn execute_run(
    engine: Arc<dyn ConsensusEngine>,
    request: RunRequest,
    on_chunk: impl Fn(&StreamChunk) + Send + Sync + 'static,
) -> Result<RunOutcome, RunError> {
    validate(&request)?;

    let mut adapter = if request.streaming {
        Some(StreamingAdapter::new(on_chunk))
    } else {
        None
    };
    let emitter = adapter.as_mut().map(|adapter| adapter.create_emitter());

    let prompt = request.prompt.clone();
    let attachments = request.attachments;
    let handle = tokio::spawn({
        let engine = Arc::clone(&engine);
        let prompt = prompt.clone();
        async move {
            let attachments = if attachments.is_empty() {
                None
            } else {
                Some(attachments.as_slice())
            };
            engine.execute(&prompt, attachments, emitter).await
        }
    });

    let run_result = handle.await;

    // The bridge is always closed before the outcome is reported.
    let mut dropped_chunks = 0;
    if let Some(adapter) = adapter.as_mut() {
        adapter.close().await;
        dropped_chunks = adapter.dropped();
        if dropped_chunks > 0 {
            tracing::warn!(dropped = dropped_chunks, "streaming bridge dropped chunks");
        }
    }

    let result = match run_result {
        Ok(engine_result) => engine_result?,
        Err(join_error) => return Err(RunError::Internal(join_error.to_string())),
    };

    tracing::info!(
        engine = engine.name(),
        decision = %result.final_decision,
        exit_code = result.exit_code,
        "consensus run finished"
    );

    Ok(RunOutcome {
        result,
        prompt,
        dropped_chunks,
    })
}
