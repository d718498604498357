use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use agora_core::ValidationError;
use agora_core::session::{JoinedParticipant, SessionHandle, StateSnapshot};

/// Idle connections get a keep-alive `ping` carrying time-remaining and
/// viewer count on this interval.
const SSE_IDLE_PING: Duration = Duration::from_secs(25);

pub fn router(handle: SessionHandle) -> Router {
    Router::new()
        .route("/join", post(join))
        .route("/send", post(send))
        .route("/stream", get(stream))
        .route("/state", get(state))
        .with_state(handle)
}

#[derive(Debug, Deserialize)]
struct JoinRequest {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    msg_id: Option<String>,
}

type Rejection = (StatusCode, Json<Value>);

fn reject(err: &ValidationError) -> Rejection {
    let status = match err {
        ValidationError::NotJoined => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

async fn join(
    State(handle): State<SessionHandle>,
    Json(body): Json<JoinRequest>,
) -> Result<Json<JoinedParticipant>, Rejection> {
    handle
        .join(&body.name)
        .map(Json)
        .map_err(|e| reject(&e))
}

async fn send(
    State(handle): State<SessionHandle>,
    Json(body): Json<SendRequest>,
) -> Result<Json<Value>, Rejection> {
    handle
        .send(&body.id, &body.text, body.msg_id)
        .map(|()| Json(json!({ "ok": true })))
        .map_err(|e| reject(&e))
}

async fn state(State(handle): State<SessionHandle>) -> Json<StateSnapshot> {
    Json(handle.snapshot())
}

/// SSE egress: a `fullstate` snapshot first, then live bus frames in
/// publish order. A client that stops reading long enough to fill its
/// inbox is dropped by the bus and its stream simply ends.
async fn stream(
    State(handle): State<SessionHandle>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut listener = handle.subscribe();
    let snapshot = handle.snapshot();

    let stream = async_stream::stream! {
        match serde_json::to_string(&snapshot) {
            Ok(data) => yield Ok(Event::default().event("fullstate").data(data)),
            Err(e) => error!(error = %e, "failed to serialize fullstate"),
        }

        loop {
            match tokio::time::timeout(SSE_IDLE_PING, listener.recv()).await {
                Ok(Some(frame)) => {
                    yield Ok(Event::default().event(frame.event).data(frame.data.clone()));
                }
                // Removed from the bus (stalled or bus gone): end the stream
                // and let the client reconnect for a fresh fullstate.
                Ok(None) => break,
                Err(_) => {
                    if let Ok(data) = serde_json::to_string(&handle.ping()) {
                        yield Ok(Event::default().event("ping").data(data));
                    }
                }
            }
        }
    };

    Sse::new(stream)
}
