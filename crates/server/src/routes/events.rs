//! Client event stream.
//!
//! Each open UI subscribes here; the subscription is the client's
//! registration and ends when the connection closes.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tunecache_core::{ClientHandle, LifecycleState};

use crate::AppState;

/// Payload of the first event on every stream.
///
/// Activation usually happens before any UI connects, so this is how a late
/// joiner learns which cache version is live.
#[derive(Debug, Serialize)]
pub struct Connected {
    pub client: u64,
    pub version: String,
    pub lifecycle: LifecycleState,
}

/// `GET /events`: one `connected` event, then every message posted to this client.
pub async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let handle = state.worker.clients().register();
    let lifecycle = state.worker.lifecycle().state().await;
    // Clients opened after activation are controlled straight away.
    if lifecycle == LifecycleState::Active {
        state.worker.clients().claim();
    }
    let connected = Connected { client: handle.id(), version: state.worker.config().version.clone(), lifecycle };
    tracing::debug!(client = connected.client, %lifecycle, "event stream opened");

    let connected = stream::once(async move {
        let event = Event::default().event("connected");
        Ok::<_, Infallible>(match serde_json::to_string(&connected) {
            Ok(json) => event.data(json),
            Err(e) => Event::default().event("error").data(e.to_string()),
        })
    });
    let messages = stream::unfold(handle, |mut handle: ClientHandle| async move {
        let message = handle.recv().await?;
        let event = match serde_json::to_string(&message) {
            Ok(json) => Event::default().event("message").data(json),
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Some((Ok::<_, Infallible>(event), handle))
    });

    Sse::new(connected.chain(messages)).keep_alive(KeepAlive::default())
}
