//! Subscription registry: canonical keys, dimension buckets, and
//! connection-scoped cancellation.

use crate::error::{EventsError, EventsResult};
use crate::payloads::DimensionCoord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Opaque identifier for a single registered subscription.
pub type SubscriptionId = u64;

/// Identifier for the bus connection that owns a subscription. Opaque to
/// this crate; the host assigns and recycles these.
pub type ConnectionId = String;

/// Whether a subscription watches a value key or a description key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// `VALUE|<key>|<appId>|<category-or-category-dim>`
    Value,
    /// `DESC|<key>|<appId>`
    Desc,
}

/// Canonical identity of a subscription, used both as the dedup/routing key
/// and to rebuild the wire-level subscription string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// Value vs. description subscription.
    pub kind: SubscriptionKind,
    /// Subscribed key.
    pub key: String,
    /// `None` means the global scope; `Some(app_id)` scopes to one app.
    pub app_id: Option<String>,
    /// Category, or `category$v1.v2...` when the subscriber pinned a
    /// dimension at subscribe time. Empty for `Desc` subscriptions, which
    /// have no category component in their canonical string.
    pub category_or_dim: String,
}

impl SubscriptionKey {
    /// Render the canonical wire-level subscription string form.
    #[must_use]
    pub fn canonical(&self) -> String {
        let app_id = self.app_id.as_deref().unwrap_or("");
        match self.kind {
            SubscriptionKind::Value => {
                format!("VALUE|{}|{}|{}", self.key, app_id, self.category_or_dim)
            }
            SubscriptionKind::Desc => format!("DESC|{}|{}", self.key, app_id),
        }
    }
}

struct Subscription {
    connection_id: ConnectionId,
    key: SubscriptionKey,
    /// Category this subscription belongs to, for dimension-dependent
    /// lookups regardless of whether the canonical string embeds a pinned
    /// dimension string.
    category: Option<String>,
    /// Dimension coordinate remembered at subscribe time, used by
    /// `notify_early` to snapshot the pre-write coordinate.
    requested_dimension: Option<DimensionCoord>,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
    by_canonical: Mutex<HashMap<String, Vec<SubscriptionId>>>,
    by_connection: Mutex<HashMap<ConnectionId, Vec<SubscriptionId>>>,
    by_category: Mutex<HashMap<String, Vec<SubscriptionId>>>,
}

/// Registry of live subscriptions, shared by clone across the task engine
/// and the resolver's write handlers.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    inner: std::sync::Arc<Inner>,
}

/// A subscriber's full registration, returned by lookup methods so callers
/// can compose a reply without re-entering the registry.
#[derive(Debug, Clone)]
pub struct SubscriberView {
    /// Id of the matched subscription.
    pub id: SubscriptionId,
    /// Connection that should receive the notification.
    pub connection_id: ConnectionId,
    /// Canonical key of the subscription.
    pub key: SubscriptionKey,
    /// Dimension coordinate pinned at subscribe time, if any.
    pub requested_dimension: Option<DimensionCoord>,
}

impl SubscriptionRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscription and return its id.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex has been poisoned by a prior panic.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        key: SubscriptionKey,
        category: Option<String>,
        requested_dimension: Option<DimensionCoord>,
    ) -> SubscriptionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let canonical = key.canonical();

        self.inner.subscriptions.lock().unwrap().insert(
            id,
            Subscription {
                connection_id: connection_id.clone(),
                key,
                category: category.clone(),
                requested_dimension,
            },
        );
        self.inner
            .by_canonical
            .lock()
            .unwrap()
            .entry(canonical)
            .or_default()
            .push(id);
        self.inner
            .by_connection
            .lock()
            .unwrap()
            .entry(connection_id)
            .or_default()
            .push(id);
        if let Some(category) = category {
            self.inner
                .by_category
                .lock()
                .unwrap()
                .entry(category)
                .or_default()
                .push(id);
        }
        id
    }

    /// Remove a single subscription by id (explicit client cancellation).
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex has been poisoned by a prior panic.
    pub fn unregister(&self, id: SubscriptionId) -> EventsResult<()> {
        let sub = self
            .inner
            .subscriptions
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or(EventsError::UnknownSubscription { id })?;
        self.drop_from_index(&self.inner.by_canonical, &sub.key.canonical(), id);
        self.drop_from_index(&self.inner.by_connection, &sub.connection_id, id);
        if let Some(category) = &sub.category {
            self.drop_from_index(&self.inner.by_category, category, id);
        }
        Ok(())
    }

    /// Remove every subscription owned by `connection_id` on bus disconnect.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex has been poisoned by a prior panic.
    pub fn remove_connection(&self, connection_id: &str) {
        let ids = self
            .inner
            .by_connection
            .lock()
            .unwrap()
            .remove(connection_id)
            .unwrap_or_default();
        for id in ids {
            if let Some(sub) = self.inner.subscriptions.lock().unwrap().remove(&id) {
                self.drop_from_index(&self.inner.by_canonical, &sub.key.canonical(), id);
                if let Some(category) = &sub.category {
                    self.drop_from_index(&self.inner.by_category, category, id);
                }
            }
        }
    }

    /// Return every subscriber registered under a given canonical key.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex has been poisoned by a prior panic.
    #[must_use]
    pub fn subscribers_for(&self, key: &SubscriptionKey) -> Vec<SubscriberView> {
        let canonical = key.canonical();
        self.collect(&self.inner.by_canonical, &canonical)
    }

    /// Look up a single subscriber by id, e.g. to re-resolve one pinned by
    /// an earlier [`crate::protocol::SubscriptionEngine::notify_early`]
    /// snapshot. Returns `None` if it has since been unregistered.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex has been poisoned by a prior panic.
    #[must_use]
    pub fn subscriber(&self, id: SubscriptionId) -> Option<SubscriberView> {
        self.inner.subscriptions.lock().unwrap().get(&id).map(|sub| SubscriberView {
            id,
            connection_id: sub.connection_id.clone(),
            key: sub.key.clone(),
            requested_dimension: sub.requested_dimension.clone(),
        })
    }

    /// Return every subscriber whose subscription belongs to `category`,
    /// regardless of key or pinned dimension. Used for dimension-dependent
    /// rebuild notifications.
    ///
    /// # Panics
    ///
    /// Panics if an internal mutex has been poisoned by a prior panic.
    #[must_use]
    pub fn subscribers_for_category(&self, category: &str) -> Vec<SubscriberView> {
        self.collect(&self.inner.by_category, category)
    }

    fn collect(
        &self,
        index: &Mutex<HashMap<String, Vec<SubscriptionId>>>,
        lookup: &str,
    ) -> Vec<SubscriberView> {
        let ids = index
            .lock()
            .unwrap()
            .get(lookup)
            .cloned()
            .unwrap_or_default();
        let subs = self.inner.subscriptions.lock().unwrap();
        ids.into_iter()
            .filter_map(|id| {
                subs.get(&id).map(|sub| SubscriberView {
                    id,
                    connection_id: sub.connection_id.clone(),
                    key: sub.key.clone(),
                    requested_dimension: sub.requested_dimension.clone(),
                })
            })
            .collect()
    }

    fn drop_from_index(
        &self,
        index: &Mutex<HashMap<String, Vec<SubscriptionId>>>,
        lookup: &str,
        id: SubscriptionId,
    ) {
        let mut index = index.lock().unwrap();
        if let Some(ids) = index.get_mut(lookup) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                index.remove(lookup);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_key(key: &str, app_id: Option<&str>, scope: &str) -> SubscriptionKey {
        SubscriptionKey {
            kind: SubscriptionKind::Value,
            key: key.to_string(),
            app_id: app_id.map(str::to_string),
            category_or_dim: scope.to_string(),
        }
    }

    #[test]
    fn canonical_string_matches_wire_grammar() {
        let key = value_key("brightness", None, "picture");
        assert_eq!(key.canonical(), "VALUE|brightness||picture");

        let desc_key = SubscriptionKey {
            kind: SubscriptionKind::Desc,
            key: "brightness".into(),
            app_id: Some("com.app".into()),
            category_or_dim: String::new(),
        };
        assert_eq!(desc_key.canonical(), "DESC|brightness|com.app");
    }

    #[test]
    fn register_and_lookup_round_trip() {
        let registry = SubscriptionRegistry::new();
        let key = value_key("brightness", None, "picture");
        let id = registry.register(
            "conn-1".into(),
            key.clone(),
            Some("picture".into()),
            None,
        );

        let subs = registry.subscribers_for(&key);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, id);
        assert_eq!(subs[0].connection_id, "conn-1");
    }

    #[test]
    fn connection_drop_removes_all_its_subscriptions() {
        let registry = SubscriptionRegistry::new();
        let key_a = value_key("brightness", None, "picture");
        let key_b = value_key("volume", None, "sound");
        registry.register("conn-1".into(), key_a.clone(), Some("picture".into()), None);
        registry.register("conn-1".into(), key_b.clone(), Some("sound".into()), None);

        registry.remove_connection("conn-1");

        assert!(registry.subscribers_for(&key_a).is_empty());
        assert!(registry.subscribers_for(&key_b).is_empty());
    }

    #[test]
    fn unregister_unknown_id_errors() {
        let registry = SubscriptionRegistry::new();
        assert!(matches!(
            registry.unregister(9999),
            Err(EventsError::UnknownSubscription { id: 9999 })
        ));
    }

    #[test]
    fn category_lookup_finds_subscribers_regardless_of_key() {
        let registry = SubscriptionRegistry::new();
        let key = value_key("brightness", None, "picture");
        registry.register("conn-1".into(), key, Some("picture".into()), None);

        let subs = registry.subscribers_for_category("picture");
        assert_eq!(subs.len(), 1);
    }
}
