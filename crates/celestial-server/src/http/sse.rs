//! Server-Sent Events stream of newly emitted events.
//!
//! Clients connect to `GET /subscribe` and first receive a `hello` frame,
//! then one `emit` frame per delivered event with the event JSON as data.
//! Deliveries are best-effort: a client that falls behind its queue misses
//! events rather than slowing down emitters. When the client goes away the
//! response stream is dropped, which cancels the subscription.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use celestial_core::Subscription;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use super::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
const HELLO: &str = r#"{"message":"subscribed"}"#;

/// `GET /subscribe`
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let subscription = state.store.subscribe();
    debug!(
        subscription = subscription.id(),
        live = state.store.subscriber_count(),
        "SSE client connected"
    );

    let hello = stream::once(async { Ok(SseEvent::default().event("hello").data(HELLO)) });
    Sse::new(hello.chain(emit_frames(subscription)))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

/// One `emit` frame per event the subscription receives. Ends when the
/// subscription is cancelled and drained.
fn emit_frames(subscription: Subscription) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        loop {
            let event = subscription.recv().await?;
            match SseEvent::default().event("emit").json_data(&event) {
                Ok(frame) => return Some((Ok(frame), subscription)),
                Err(err) => warn!(id = event.id, "failed to encode event for SSE: {err}"),
            }
        }
    })
}
