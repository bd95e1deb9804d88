// Fleet notifications as Server-Sent Events
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::wrappers::ReceiverStream;

use crate::models::AppState;
use super::helpers::{store_for_request, ApiError};

pub async fn events_stream(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let store = store_for_request(&state, &headers)?;
    let mut events = store.subscribe();
    let user_id = store.user_id().to_string();

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(32);

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!(%user_id, "Event stream closed by client");
                    return;
                }
                received = events.recv() => received,
            };
            let event = match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%user_id, skipped, "Event subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => return,
            };
            let sse = Event::default()
                .event(event.name())
                .data(serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string()));
            if tx.send(Ok(sse)).await.is_err() {
                tracing::debug!(%user_id, "Event stream closed by client");
                return;
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("keepalive"),
    ))
}
