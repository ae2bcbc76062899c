//! Shared application state handed to every bus handler via axum's
//! `State` extractor.

use std::sync::Arc;

use settingsd_db::DocumentDb;
use settingsd_desc::DescriptionModel;
use settingsd_events::{Notifier, SubscriptionEngine};
use settingsd_resolver::VolatileMap;
use settingsd_task::{AppStateTracker, TaskEngine};
use settingsd_telemetry::Metrics;

use crate::notify::BroadcastNotifier;

/// Everything a bus handler needs: the document store, the description
/// model, the volatile-value cache, the readers-writer engine, the
/// subscription engine, the current-app tracker, the outbound notifier and
/// the metrics registry.
///
/// Every field is an `Arc`, so cloning just grows refcounts; `batch` relies
/// on this to hand each spawned sub-dispatch its own owned state.
#[derive(Clone)]
pub struct ApiState {
    /// Backing document store (sqlx/Postgres in production, in-memory in
    /// tests).
    pub db: Arc<dyn DocumentDb>,
    /// Loaded description model (layered defaults/overrides/mods).
    pub desc: Arc<DescriptionModel>,
    /// In-memory volatile-key cache.
    pub volatile: Arc<VolatileMap>,
    /// Readers-writer scheduling gate.
    pub task_engine: Arc<TaskEngine>,
    /// Subscription registry and notify-early/commit/notify-late protocol.
    pub events: Arc<SubscriptionEngine>,
    /// Current-app pointer and uninstall cleanup.
    pub app_state: Arc<AppStateTracker>,
    /// Outbound delivery sink for subscription notifications.
    pub notifier: Arc<dyn Notifier>,
    /// Per-connection broadcast channels backing the SSE subscription route.
    pub subscriptions: Arc<BroadcastNotifier>,
    /// Prometheus metrics registry.
    pub metrics: Metrics,
}

impl ApiState {
    /// Assemble state from its constituent parts.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<dyn DocumentDb>,
        desc: Arc<DescriptionModel>,
        volatile: Arc<VolatileMap>,
        task_engine: Arc<TaskEngine>,
        events: Arc<SubscriptionEngine>,
        app_state: Arc<AppStateTracker>,
        notifier: Arc<dyn Notifier>,
        subscriptions: Arc<BroadcastNotifier>,
        metrics: Metrics,
    ) -> Self {
        Self { db, desc, volatile, task_engine, events, app_state, notifier, subscriptions, metrics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use settingsd_db::{BatchOperation, BatchReply, DbResult, FindReply, Query, SettingsRecord};
    use settingsd_events::{ConnectionId, NotificationPayload, SubscriptionRegistry};

    struct NoopDb;

    #[async_trait]
    impl DocumentDb for NoopDb {
        async fn find(&self, _query: Query) -> DbResult<FindReply> {
            Ok(FindReply::default())
        }

        async fn batch(&self, _operations: Vec<BatchOperation>) -> DbResult<BatchReply> {
            Ok(BatchReply::default())
        }

        async fn merge(&self, _query: Query, _props: Value) -> DbResult<u64> {
            Ok(0)
        }

        async fn put(&self, _objects: Vec<SettingsRecord>) -> DbResult<()> {
            Ok(())
        }

        async fn del(&self, _query: Query, _ids: Vec<String>) -> DbResult<u64> {
            Ok(0)
        }
    }

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn send(&self, _connection_id: &ConnectionId, _payload: &NotificationPayload) {}
    }

    #[test]
    fn api_state_wires_every_dependency() {
        let state = ApiState::new(
            Arc::new(NoopDb),
            Arc::new(DescriptionModel::new()),
            Arc::new(VolatileMap::new()),
            Arc::new(TaskEngine::new()),
            Arc::new(SubscriptionEngine::new(SubscriptionRegistry::new())),
            Arc::new(AppStateTracker::new()),
            Arc::new(NoopNotifier),
            Arc::new(BroadcastNotifier::new()),
            Metrics::new().expect("metrics registry"),
        );
        assert_eq!(state.app_state.current_app(), "");
    }
}
