// Integration tests for the HTTP surface
//
// Runs are driven through the router with scripted engines; no network.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use magi_gui::config::GuiConfig;
use magi_gui::engine::{ConsensusEngine, EngineConfig, EngineError};
use magi_gui::models::{Attachment, ConsensusResult, StreamChunk};
use magi_gui::server::{create_router, AppState, EngineFactory};
use magi_gui::streaming::StreamingEmitter;

/// Engine scripted to return a fixed result, emitting chunks first when
/// streaming is wired.
struct ScriptedEngine {
    result: ConsensusResult,
    chunks: Vec<StreamChunk>,
}

#[async_trait]
impl ConsensusEngine for ScriptedEngine {
    async fn execute(
        &self,
        _prompt: &str,
        _attachments: Option<&[Attachment]>,
        emitter: Option<StreamingEmitter>,
    ) -> Result<ConsensusResult, EngineError> {
        if let Some(emitter) = emitter {
            for chunk in &self.chunks {
                emitter.emit(chunk.clone()).await;
            }
        }
        Ok(self.result.clone())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct FailingEngine;

#[async_trait]
impl ConsensusEngine for FailingEngine {
    async fn execute(
        &self,
        _prompt: &str,
        _attachments: Option<&[Attachment]>,
        _emitter: Option<StreamingEmitter>,
    ) -> Result<ConsensusResult, EngineError> {
        Err(EngineError::Engine {
            code: "MAGI_E999".to_string(),
            message: "engine exploded".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn scripted_state(result: ConsensusResult) -> Arc<AppState> {
    let factory: EngineFactory = Arc::new(move |_config| {
        Ok(Arc::new(ScriptedEngine {
            result: result.clone(),
            chunks: Vec::new(),
        }) as Arc<dyn ConsensusEngine>)
    });
    Arc::new(AppState::with_engine_factory(GuiConfig::default(), factory))
}

fn run_form(fields: &[(&str, &str)]) -> (String, String) {
    let boundary = "magi-test-boundary";
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    (format!("multipart/form-data; boundary={boundary}"), body)
}

async fn post_run(state: Arc<AppState>, fields: &[(&str, &str)]) -> (StatusCode, String) {
    let (content_type, body) = run_form(fields);
    let response = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/run")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_index_serves_the_form() {
    let state = scripted_state(common::consensus_result());
    let response = create_router(state)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("id='run-form'"));
    assert!(html.contains("MAGI SYSTEM"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let state = scripted_state(common::consensus_result());
    let response = create_router(state)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_successful_run_renders_the_full_result() {
    let state = scripted_state(common::consensus_result());
    let (status, html) = post_run(
        Arc::clone(&state),
        &[("prompt", "Should we approve X?"), ("api_key", "test-key")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Final Decision: APPROVED"));
    assert!(html.contains("MELCHIOR analysis of the proposal."));
    assert!(html.contains("Round 1"));
}

#[tokio::test]
async fn test_report_download_after_a_run() {
    let state = scripted_state(common::consensus_result());
    let (status, _) = post_run(
        Arc::clone(&state),
        &[("prompt", "Should we approve X?"), ("api_key", "test-key")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = create_router(state)
        .oneshot(Request::builder().uri("/report").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment; filename=\"magi-report-"));
    assert!(disposition.ends_with(".md\""));

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/markdown"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let markdown = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(markdown.contains("# MAGI System"));
    assert!(markdown.contains("Should we approve X?"));
}

#[tokio::test]
async fn test_report_before_any_run_is_not_found() {
    let state = scripted_state(common::consensus_result());
    let response = create_router(state)
        .oneshot(Request::builder().uri("/report").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_api_key_aborts_before_the_engine() {
    let state = scripted_state(common::consensus_result());
    let (status, html) = post_run(state, &[("prompt", "Should we approve X?")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("Please provide a Gemini API key to continue."));
    // A failed run renders only the error; no phase sections
    assert!(!html.contains("Final Decision"));
    assert!(!html.contains("Voting"));
}

#[tokio::test]
async fn test_empty_prompt_aborts_before_the_engine() {
    let state = scripted_state(common::consensus_result());
    let (status, html) = post_run(state, &[("prompt", "   "), ("api_key", "test-key")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("Please enter a prompt to run."));
}

#[tokio::test]
async fn test_unknown_model_is_rejected() {
    let state = scripted_state(common::consensus_result());
    let (status, html) = post_run(
        state,
        &[
            ("prompt", "Should we approve X?"),
            ("api_key", "test-key"),
            ("model", "gemini-9000-ultra"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(html.contains("Unknown model selection"));
}

#[tokio::test]
async fn test_engine_error_surfaces_code_and_message_only() {
    let factory: EngineFactory =
        Arc::new(|_config| Ok(Arc::new(FailingEngine) as Arc<dyn ConsensusEngine>));
    let state = Arc::new(AppState::with_engine_factory(GuiConfig::default(), factory));

    let (status, html) = post_run(
        state,
        &[("prompt", "Should we approve X?"), ("api_key", "test-key")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(html.contains("MAGI_E999: engine exploded"));
    assert!(!html.contains("Final Decision"));
}

#[tokio::test]
async fn test_engine_receives_the_explicit_run_configuration() {
    let seen: Arc<Mutex<Option<EngineConfig>>> = Arc::new(Mutex::new(None));
    let result = common::consensus_result();
    let factory: EngineFactory = {
        let seen = Arc::clone(&seen);
        Arc::new(move |config| {
            *seen.lock().unwrap() = Some(config);
            Ok(Arc::new(ScriptedEngine {
                result: result.clone(),
                chunks: Vec::new(),
            }) as Arc<dyn ConsensusEngine>)
        })
    };
    let state = Arc::new(AppState::with_engine_factory(GuiConfig::default(), factory));

    let (status, _) = post_run(
        state,
        &[
            ("prompt", "Should we approve X?"),
            ("api_key", "run-key"),
            ("model", "gemini-1.5-flash"),
            ("debate_rounds", "2"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let config = seen.lock().unwrap().clone().unwrap();
    assert_eq!(config.provider, "gemini");
    assert_eq!(config.api_key, "run-key");
    assert_eq!(config.model, "gemini-1.5-flash");
    assert_eq!(config.debate_rounds, 2);
}

#[tokio::test]
async fn test_streaming_run_wires_the_bridge() {
    let chunks = vec![
        StreamChunk::new("melchior", "thinking aloud", "debate", Some(1)),
        StreamChunk::new("casper", "counterpoint", "debate", Some(1)),
    ];
    let result = common::consensus_result();
    let factory: EngineFactory = {
        let chunks = chunks.clone();
        Arc::new(move |_config| {
            Ok(Arc::new(ScriptedEngine {
                result: result.clone(),
                chunks: chunks.clone(),
            }) as Arc<dyn ConsensusEngine>)
        })
    };
    let state = Arc::new(AppState::with_engine_factory(GuiConfig::default(), factory));

    // Subscribe before the run, as the page does.
    let mut rx = state.stream_tx.subscribe();

    let (status, html) = post_run(
        Arc::clone(&state),
        &[
            ("prompt", "Should we approve X?"),
            ("api_key", "test-key"),
            ("streaming", "on"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Final Decision: APPROVED"));

    let first = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();
    assert_eq!(first.chunk, "thinking aloud");
    assert_eq!(second.chunk, "counterpoint");
}
