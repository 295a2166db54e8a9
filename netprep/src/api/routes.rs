//! API routes for the NetPrep tutor server

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;

use netprep_tutor::{Explanation, TutorError, TutorPipeline, TutorRequest, TutorStreamEvent};

/// Application state
pub struct AppState {
    pub pipeline: Arc<TutorPipeline>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error payload returned with non-success statuses
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Explain endpoint: generate a complete flashcard for a concept
pub async fn explain(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TutorRequest>,
) -> Result<Json<Explanation>, (StatusCode, Json<ErrorResponse>)> {
    let explanation = app_state
        .pipeline
        .explain(&payload)
        .await
        .map_err(error_response)?;

    Ok(Json(explanation))
}

/// Streaming explain endpoint: deltas and the final card as server-sent events
///
/// Emits `delta` events while text arrives, a single `card` event with the
/// normalized flashcard, and an `error` event if generation fails mid-stream.
pub async fn explain_stream(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<TutorRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ErrorResponse>)>
{
    let events = app_state
        .pipeline
        .explain_stream(&payload)
        .await
        .map_err(error_response)?;

    let sse = events.map(|item| {
        let event = match item {
            Ok(TutorStreamEvent::Delta(text)) => {
                Event::default().event("delta").data(sse_data(&text))
            }
            Ok(TutorStreamEvent::Card(card)) => match serde_json::to_string(&card) {
                Ok(json) => Event::default().event("card").data(json),
                Err(e) => Event::default().event("error").data(sse_data(&e.to_string())),
            },
            Err(e) => Event::default().event("error").data(sse_data(&e.to_string())),
        };
        Ok(event)
    });

    Ok(Sse::new(sse).keep_alive(KeepAlive::default()))
}

/// SSE field values must not contain carriage returns; flatten CRLF and
/// bare CR onto the newlines the event writer splits into `data:` lines.
fn sse_data(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Map a tutor error onto the status code it surfaces as
fn error_status(error: &TutorError) -> StatusCode {
    match error {
        TutorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        TutorError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        TutorError::GenerationFailed { .. } => StatusCode::BAD_GATEWAY,
        TutorError::TimeoutError { .. } => StatusCode::GATEWAY_TIMEOUT,
        TutorError::ConnectionError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: TutorError) -> (StatusCode, Json<ErrorResponse>) {
    let status = error_status(&error);
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}
