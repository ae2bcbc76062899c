//! SSE route streaming subscription notifications back to the connection
//! that registered them via `x-settingsd-connection-id`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::router::HEADER_CONNECTION_ID;
use crate::state::ApiState;

const KEEP_ALIVE_SECS: u64 = 20;

pub(crate) async fn stream_subscriptions(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let connection_id = headers
        .get(HEADER_CONNECTION_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let receiver = state.subscriptions.subscribe(&connection_id);
    let stream = BroadcastStream::new(receiver).filter_map(|item| match item {
        Ok(payload) => serde_json::to_string(&payload).ok().map(|body| Ok(Event::default().data(body))),
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECS)))
}
