//! Route table: `/bus` for the RPC surface, `/health` and `/metrics` for
//! operational probes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::bus;
use crate::metrics_layer::HttpMetricsLayer;
use crate::state::ApiState;
use crate::subscriptions::stream_subscriptions;

pub(crate) const HEADER_CONNECTION_ID: &str = "x-settingsd-connection-id";

/// Build the full router over `state`.
pub fn build(state: Arc<ApiState>) -> Router {
    let metrics_layer = HttpMetricsLayer::new(state.metrics.clone());
    Router::new()
        .route("/bus", post(handle_bus))
        .route("/subscriptions", get(stream_subscriptions))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(metrics_layer))
        .with_state(state)
}

async fn handle_bus(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let connection_id = headers
        .get(HEADER_CONNECTION_ID)
        .and_then(|value| value.to_str().ok());
    let response = bus::dispatch(state.as_ref(), connection_id, body).await;
    Json(serde_json::to_value(response).unwrap_or(Value::Null))
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_metrics(State(state): State<Arc<ApiState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}
