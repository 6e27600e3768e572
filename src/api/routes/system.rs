//! System handlers: health, events.

use crate::api::AppState;
use crate::types::Event;
use axum::{
    Json,
    extract::State,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /events - Server-sent events stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.runner.subscribe();
    let stream = BroadcastStream::new(receiver);

    let sse_stream = stream.filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json_data) => Some(Ok(SseEvent::default()
                .event(event_name(&event))
                .data(json_data))),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize event");
                None
            }
        },
        Err(e) => {
            // Receiver fell behind; skip the lost events
            tracing::warn!(error = %e, "event stream lagged");
            None
        }
    });

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

fn event_name(event: &Event) -> &'static str {
    match event {
        Event::JobQueued { .. } => "job_queued",
        Event::JobStarted { .. } => "job_started",
        Event::TracksAcquired { .. } => "tracks_acquired",
        Event::ClipSkipped { .. } => "clip_skipped",
        Event::JobCompleted { .. } => "job_completed",
        Event::JobFailed { .. } => "job_failed",
        Event::NotificationSent { .. } => "notification_sent",
        Event::NotificationDropped { .. } => "notification_dropped",
    }
}
