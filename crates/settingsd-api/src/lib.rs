#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Axum-based bus surface for the settings service.
//!
//! Layout: `state.rs` (shared `ApiState`), `bus.rs` (the thirteen named
//! method handlers behind `POST /bus`), `router.rs` (route table and
//! health/metrics probes), `metrics_layer.rs` (per-route HTTP metrics
//! middleware), `notify.rs` (broadcast-backed `Notifier`),
//! `subscriptions.rs` (the SSE route consuming it), `error.rs` (server
//! bootstrap failures).

pub mod bus;
pub mod error;
pub mod metrics_layer;
pub mod notify;
pub mod openapi;
pub mod router;
pub mod state;
pub mod subscriptions;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

pub use error::{ApiServerError, ApiServerResult};
pub use notify::BroadcastNotifier;
pub use state::ApiState;

/// Bound-but-not-yet-serving API server.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router over `state`, persisting the given `OpenAPI`
    /// document to `openapi_path` first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::OpenApiPersist`] if the document cannot be
    /// written.
    pub fn new(
        state: Arc<ApiState>,
        openapi_document: &Value,
        openapi_path: impl AsRef<Path>,
    ) -> ApiServerResult<Self> {
        let openapi_path = openapi_path.as_ref();
        settingsd_telemetry::persist_openapi(openapi_path, openapi_document).map_err(|source| {
            ApiServerError::OpenApiPersist { path: openapi_path.to_path_buf(), source }
        })?;
        Ok(Self { router: router::build(state) })
    }

    /// Serve the bound router until the process is told to stop.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Bind`] if the listener cannot be bound, or
    /// [`ApiServerError::Serve`] if serving terminates abnormally.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        info!(%addr, "starting settings-service API");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
