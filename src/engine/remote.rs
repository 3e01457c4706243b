// HTTP client for the magi-core consensus service
//
// Non-streaming runs are a single JSON POST. Streaming runs consume the
// text/event-stream variant: each `data:` line carries either one chunk,
// which is fed into the emitter, or the terminating result event.

use std::time::Duration;

use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ConsensusEngine, EngineError};
use crate::models::{Attachment, ConsensusResult, StreamChunk};
use crate::streaming::StreamingEmitter;

// A full consensus run spans three LLM phases; allow it plenty of time.
const REQUEST_TIMEOUT_SECS: u64 = 600;

/// Explicit engine configuration, passed by value at construction.
///
/// Provider selection travels inside the request body; nothing writes the
/// process environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the magi-core service (e.g. "http://127.0.0.1:8700").
    pub engine_url: String,
    /// Provider the engine should run on (e.g. "gemini").
    pub provider: String,
    /// Provider credential.
    pub api_key: String,
    /// Provider model name.
    pub model: String,
    /// Provider endpoint override.
    pub endpoint: String,
    /// Number of debate rounds to run.
    pub debate_rounds: u32,
}

/// [`ConsensusEngine`] implementation backed by a magi-core HTTP service.
pub struct RemoteEngine {
    client: Client,
    config: EngineConfig,
}

impl RemoteEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn consensus_url(&self) -> String {
        format!("{}/v1/consensus", self.config.engine_url.trim_end_matches('/'))
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1/consensus/stream",
            self.config.engine_url.trim_end_matches('/')
        )
    }

    fn request_body<'a>(
        &'a self,
        prompt: &'a str,
        attachments: Option<&'a [Attachment]>,
    ) -> ConsensusRequest<'a> {
        ConsensusRequest {
            prompt,
            attachments,
            provider: &self.config.provider,
            model: &self.config.model,
            endpoint: &self.config.endpoint,
            debate_rounds: self.config.debate_rounds,
        }
    }

    /// Map a non-success response to the structured engine error if the
    /// body carries one, otherwise to a generic invalid-response error.
    async fn error_from_response(response: reqwest::Response) -> EngineError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&body) {
            return EngineError::Engine {
                code: envelope.error.code,
                message: envelope.error.message,
            };
        }
        EngineError::InvalidResponse(format!("status {status}: {body}"))
    }

    async fn execute_simple(
        &self,
        prompt: &str,
        attachments: Option<&[Attachment]>,
    ) -> Result<ConsensusResult, EngineError> {
        tracing::debug!(url = %self.consensus_url(), "sending consensus request");

        let response = self
            .client
            .post(self.consensus_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt, attachments))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let result = response.json::<ConsensusResult>().await?;
        tracing::debug!(decision = %result.final_decision, "consensus run completed");
        Ok(result)
    }

    async fn execute_streaming(
        &self,
        prompt: &str,
        attachments: Option<&[Attachment]>,
        emitter: StreamingEmitter,
    ) -> Result<ConsensusResult, EngineError> {
        tracing::debug!(url = %self.stream_url(), "sending streaming consensus request");

        let response = self
            .client
            .post(self.stream_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt, attachments))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut result: Option<ConsensusResult> = None;
        let mut done = false;

        while let Some(bytes) = stream.next().await {
            if done {
                break;
            }
            buffer.extend_from_slice(&bytes?);

            // SSE format: one "data: {...}\n" payload per event.
            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&line_bytes);

                let Some(payload) = line.strip_prefix("data: ") else {
                    continue;
                };
                let payload = payload.trim();

                if payload == "[DONE]" {
                    done = true;
                    break;
                }

                match serde_json::from_str::<StreamEvent>(payload) {
                    Ok(StreamEvent::Chunk(chunk)) => emitter.emit(chunk).await,
                    Ok(StreamEvent::Result(final_result)) => result = Some(*final_result),
                    Err(e) => {
                        tracing::warn!(error = %e, "unparseable stream event skipped");
                    }
                }
            }
        }

        result.ok_or_else(|| {
            EngineError::InvalidResponse("stream ended without a result event".to_string())
        })
    }
}

#[async_trait::async_trait]
impl ConsensusEngine for RemoteEngine {
    async fn execute(
        &self,
        prompt: &str,
        attachments: Option<&[Attachment]>,
        emitter: Option<StreamingEmitter>,
    ) -> Result<ConsensusResult, EngineError> {
        match emitter {
            Some(emitter) => self.execute_streaming(prompt, attachments, emitter).await,
            None => self.execute_simple(prompt, attachments).await,
        }
    }

    fn name(&self) -> &str {
        "magi-core"
    }
}

// Wire types for the magi-core service

#[derive(Debug, Serialize)]
struct ConsensusRequest<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachments: Option<&'a [Attachment]>,
    provider: &'a str,
    model: &'a str,
    endpoint: &'a str,
    debate_rounds: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StreamEvent {
    Chunk(StreamChunk),
    Result(Box<ConsensusResult>),
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let engine = RemoteEngine::new(EngineConfig {
            engine_url: "http://127.0.0.1:8700/".to_string(),
            provider: "gemini".to_string(),
            api_key: "key".to_string(),
            model: "gemini-1.5-pro".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            debate_rounds: 3,
        })
        .unwrap();
        assert_eq!(engine.consensus_url(), "http://127.0.0.1:8700/v1/consensus");
        assert_eq!(
            engine.stream_url(),
            "http://127.0.0.1:8700/v1/consensus/stream"
        );
    }

    #[test]
    fn test_stream_event_decoding() {
        let chunk: StreamEvent = serde_json::from_str(
            r#"{"chunk": {"persona": "melchior", "chunk": "text", "phase": "debate", "round_number": 1}}"#,
        )
        .unwrap();
        assert!(matches!(chunk, StreamEvent::Chunk(_)));

        let result: StreamEvent =
            serde_json::from_str(r#"{"result": {"final_decision": "approved"}}"#).unwrap();
        assert!(matches!(result, StreamEvent::Result(_)));
    }
}
