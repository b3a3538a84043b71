// Server-sent events streaming utilities
use crate::application::streaming_service::StreamEvent;
use axum::http::{HeaderName, header};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// Create an SSE response from a session's receiver. `guard` lives as long
/// as the response body, so a client disconnect cancels the session.
pub fn stream_from_receiver(
    mut rx: mpsc::Receiver<StreamEvent>,
    guard: DropGuard,
) -> impl IntoResponse {
    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            yield Ok::<Event, Infallible>(to_sse_event(&event));
        }
    };

    // Proxies must not buffer the stream.
    let headers = [
        (header::CACHE_CONTROL, "no-cache"),
        (HeaderName::from_static("x-accel-buffering"), "no"),
    ];

    (headers, Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &StreamEvent) -> Event {
    match event {
        StreamEvent::Connected { timestamp } => {
            json_event(&json!({"status": "connected", "timestamp": timestamp}))
        }
        StreamEvent::Snapshot(snapshot) => json_event(snapshot),
        StreamEvent::Error { message } => json_event(&json!({"error": message})),
        StreamEvent::Reconnect(after) => Event::default().retry(*after),
    }
}

fn json_event<T: Serialize>(data: &T) -> Event {
    Event::default().json_data(data).unwrap_or_else(|e| {
        tracing::error!("SSE serialization error: {}", e);
        Event::default().data(r#"{"error":"serialization failed"}"#)
    })
}
