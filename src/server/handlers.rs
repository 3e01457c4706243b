// Route handlers

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::{self, RunError, RunRequest};
use crate::config::GeminiModel;
use crate::models::Attachment;
use crate::render::page;
use crate::report;

use super::{AppState, CompletedRun};

// Multipart bodies carry up to a handful of 10 MB attachments.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/run", post(handle_run))
        .route("/report", get(handle_report))
        .route("/stream", get(handle_stream))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(page::index_page(&state.config))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Execute one consensus run from the submitted form.
///
/// The page either gets the fully rendered result or, on any validation,
/// configuration, or engine failure, a page containing only the error.
async fn handle_run(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let request = match parse_run_form(&state, multipart).await {
        Ok(request) => request,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Html(page::error_page(&message))).into_response();
        }
    };

    let engine = match (state.engine_factory)(app::engine_config(&state.config, &request)) {
        Ok(engine) => engine,
        Err(e) => {
            let message = RunError::from(e).user_message();
            tracing::error!(%message, "engine initialization failed");
            return (StatusCode::BAD_GATEWAY, Html(page::error_page(&message))).into_response();
        }
    };

    let stream_tx = state.stream_tx.clone();
    let on_chunk = move |chunk: &crate::models::StreamChunk| {
        // Nobody listening is fine; the page only subscribes in
        // streaming mode.
        let _ = stream_tx.send(chunk.clone());
    };

    match app::execute_run(engine, request, on_chunk).await {
        Ok(outcome) => {
            let html = page::result_page(&outcome.result);
            let mut last_run = state
                .last_run
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *last_run = Some(CompletedRun {
                result: outcome.result,
                prompt: outcome.prompt,
            });
            Html(html).into_response()
        }
        Err(error) => {
            let message = error.user_message();
            tracing::warn!(%message, "consensus run failed");
            let status = match error {
                RunError::Validation(_) => StatusCode::BAD_REQUEST,
                RunError::Engine(_) => StatusCode::BAD_GATEWAY,
                RunError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Html(page::error_page(&message))).into_response()
        }
    }
}

/// Serve the Markdown report for the most recent completed run.
async fn handle_report(State(state): State<Arc<AppState>>) -> Response {
    let last_run = state
        .last_run
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();

    match last_run {
        Some(run) => {
            let body = report::generate_report(&run.result, &run.prompt);
            let filename = report::report_filename_now();
            (
                [
                    (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                body,
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "No completed run available.").into_response(),
    }
}

/// SSE channel carrying live chunks to the page while a run streams.
async fn handle_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.stream_tx.subscribe();

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(chunk) => match Event::default().json_data(&chunk) {
                    Ok(event) => return Some((Ok(event), rx)),
                    Err(e) => {
                        tracing::warn!(error = %e, "unserializable stream chunk skipped");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "slow SSE subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Decode the multipart form into a run request.
///
/// Missing optional fields fall back to the process configuration;
/// anything undecodable is a direct user-facing message.
async fn parse_run_form(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<RunRequest, String> {
    let mut request = RunRequest {
        prompt: String::new(),
        api_key: state.config.api_key.clone(),
        model: state.config.model,
        debate_rounds: state.config.debate_rounds,
        streaming: false,
        attachments: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed form submission: {e}"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "prompt" => {
                request.prompt = field
                    .text()
                    .await
                    .map_err(|e| format!("Malformed form submission: {e}"))?;
            }
            "api_key" => {
                let api_key = field
                    .text()
                    .await
                    .map_err(|e| format!("Malformed form submission: {e}"))?;
                if !api_key.is_empty() {
                    request.api_key = api_key;
                }
            }
            "model" => {
                let model = field
                    .text()
                    .await
                    .map_err(|e| format!("Malformed form submission: {e}"))?;
                request.model = GeminiModel::parse(&model)
                    .ok_or_else(|| format!("Unknown model selection: {model}"))?;
            }
            "debate_rounds" => {
                let rounds = field
                    .text()
                    .await
                    .map_err(|e| format!("Malformed form submission: {e}"))?;
                request.debate_rounds = rounds
                    .trim()
                    .parse()
                    .map_err(|_| "Debate rounds must be a number.".to_string())?;
            }
            "streaming" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| format!("Malformed form submission: {e}"))?;
                request.streaming = value == "on" || value == "true";
            }
            "attachments" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read attachment: {e}"))?;
                // Browsers submit an empty file part when nothing is attached.
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                request.attachments.push(Attachment {
                    mime_type,
                    data: data.to_vec(),
                    filename,
                });
            }
            other => {
                tracing::debug!(field = %other, "ignoring unknown form field");
            }
        }
    }

    Ok(request)
}
