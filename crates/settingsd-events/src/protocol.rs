//! The notify-early / commit / notify-late write protocol and the
//! mixed-type posting quirk.

use crate::payloads::{DimensionCoord, NotificationPayload};
use crate::registry::{SubscriberView, SubscriptionKey, SubscriptionKind, SubscriptionRegistry};
use crate::Notifier;
use std::collections::HashMap;
use tracing::instrument;

/// Pre-write dimension coordinates captured by [`SubscriptionEngine::notify_early`],
/// keyed by subscription id. Handed back to
/// [`SubscriptionEngine::snapshot_subscribers`] so a subscriber's "before"
/// coordinate is available even after the dimension state has moved on.
#[derive(Debug, Clone, Default)]
pub struct PreWriteSnapshot {
    coordinates: HashMap<u64, DimensionCoord>,
}

/// Description of a single key change to post, post-commit.
#[derive(Debug, Clone)]
pub struct WriteNotice {
    /// Category the key belongs to.
    pub category: String,
    /// Key that changed.
    pub key: String,
    /// New value, or `None` if the key was removed with no default fallback.
    pub value: Option<serde_json::Value>,
    /// Owning app id for this particular record, `None` for global.
    pub app_id: Option<String>,
    /// Dimension coordinate the record was written under.
    pub dimension: Option<DimensionCoord>,
    /// Whether this key is dbtype `M` (mixed) — triggers the posting quirk.
    pub is_mixed: bool,
}

/// Coordinates subscription delivery around a write.
pub struct SubscriptionEngine {
    registry: SubscriptionRegistry,
}

impl SubscriptionEngine {
    /// Build an engine over a shared registry.
    #[must_use]
    pub fn new(registry: SubscriptionRegistry) -> Self {
        Self { registry }
    }

    /// Access the underlying registry (used by the task engine to register
    /// new subscriptions and to clean up on disconnect).
    #[must_use]
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Step 1: record the pre-write dimension coordinate for every
    /// dimension-dependent subscriber touching `category`.
    ///
    /// Called before the write commits so that, if the write also changes a
    /// dimension-key, subscribers who only learn the rebuild result later can
    /// still be told what their "before" view was.
    #[must_use]
    pub fn notify_early(&self, category: &str) -> PreWriteSnapshot {
        let mut coordinates = HashMap::new();
        for sub in self.registry.subscribers_for_category(category) {
            if let Some(dim) = sub.requested_dimension.clone() {
                coordinates.insert(sub.id, dim);
            }
        }
        PreWriteSnapshot { coordinates }
    }

    /// Step 3: after a dimension-key write has committed and dimension
    /// state has been rebuilt, resolve the live [`SubscriberView`] for every
    /// subscriber `notify_early` pinned. The caller re-resolves each one's
    /// value under the new coordinate and pushes a fresh notification;
    /// subscribers that unregistered mid-write are silently dropped.
    #[must_use]
    pub fn snapshot_subscribers(&self, snapshot: &PreWriteSnapshot) -> Vec<SubscriberView> {
        let mut ids: Vec<u64> = snapshot.coordinates.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| self.registry.subscriber(id)).collect()
    }

    /// Step 4: publish `{returnValue, category, dimension?, app_id, settings}`
    /// to every subscription matching the changed `(key, appId, category[-dim])`
    /// tuples in `notices`. Applies the mixed-type quirk and honors
    /// `notify_self = false` by skipping `skip_connection`.
    #[instrument(skip(self, notifier, notices), fields(count = notices.len()))]
    pub async fn post_pref_change(
        &self,
        notifier: &dyn Notifier,
        notices: &[WriteNotice],
        skip_connection: Option<&str>,
    ) {
        // Group single-key notices by (category, dimension, app_id) so a
        // bulk (setAll) write fans out one message per modified partition,
        // while a single write still collapses to one message.
        let mut partitions: Vec<(
            String,
            Option<DimensionCoord>,
            Option<String>,
            serde_json::Map<String, serde_json::Value>,
            bool,
        )> = Vec::new();

        for notice in notices {
            let slot = partitions.iter_mut().find(|(category, dimension, app_id, _, _)| {
                *category == notice.category
                    && *dimension == notice.dimension
                    && *app_id == notice.app_id
            });
            let entry = match slot {
                Some(existing) => existing,
                None => {
                    partitions.push((
                        notice.category.clone(),
                        notice.dimension.clone(),
                        notice.app_id.clone(),
                        serde_json::Map::new(),
                        false,
                    ));
                    partitions.last_mut().expect("just pushed")
                }
            };
            match &notice.value {
                Some(value) => {
                    entry.3.insert(notice.key.clone(), value.clone());
                }
                None => entry.4 = true,
            }
        }

        for (category, dimension, app_id, settings, had_removal) in partitions {
            self.publish_partition(
                notifier,
                &category,
                dimension,
                app_id.as_deref(),
                settings,
                had_removal,
                skip_connection,
            )
            .await;
        }

        // Mixed-type quirk: any `M` key with a per-app value also needs a
        // separate global-bucket message with the per-app value stripped,
        // so a global subscriber does not see a value that is only true
        // for one app.
        for notice in notices.iter().filter(|n| n.is_mixed && n.app_id.is_some()) {
            let mut global_settings = serde_json::Map::new();
            if let Some(value) = &notice.value {
                global_settings.insert(notice.key.clone(), value.clone());
            }
            self.publish_partition(
                notifier,
                &notice.category,
                notice.dimension.clone(),
                None,
                global_settings,
                notice.value.is_none(),
                skip_connection,
            )
            .await;
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn publish_partition(
        &self,
        notifier: &dyn Notifier,
        category: &str,
        dimension: Option<DimensionCoord>,
        app_id: Option<&str>,
        settings: serde_json::Map<String, serde_json::Value>,
        had_removal_without_default: bool,
        skip_connection: Option<&str>,
    ) {
        if settings.is_empty() && !had_removal_without_default {
            return;
        }
        let scope = match &dimension {
            Some(dim) if !dim.is_empty() => {
                format!("{category}${}", dim.values().cloned().collect::<Vec<_>>().join("."))
            }
            _ => category.to_string(),
        };

        let mut targets: Vec<SubscriberView> = Vec::new();
        for key in settings.keys() {
            let sub_key = SubscriptionKey {
                kind: SubscriptionKind::Value,
                key: key.clone(),
                app_id: app_id.map(str::to_string),
                category_or_dim: scope.clone(),
            };
            targets.extend(self.registry.subscribers_for(&sub_key));
            let plain_category_key = SubscriptionKey {
                kind: SubscriptionKind::Value,
                key: key.clone(),
                app_id: app_id.map(str::to_string),
                category_or_dim: category.to_string(),
            };
            targets.extend(self.registry.subscribers_for(&plain_category_key));
        }
        targets.sort_by_key(|sub| sub.id);
        targets.dedup_by_key(|sub| sub.id);

        let mut payload = NotificationPayload::success(
            Some(category.to_string()),
            dimension,
            app_id.map(str::to_string),
            settings,
        );
        if had_removal_without_default {
            payload.error_text = Some("no default value available for removed key".to_string());
            payload.return_value = false;
        }

        for sub in targets {
            if Some(sub.connection_id.as_str()) == skip_connection {
                continue;
            }
            notifier.send(&sub.connection_id, &payload).await;
        }
    }

    /// Publish description-change notifications. The merged description
    /// (all layers composed at send time) is the caller's responsibility to
    /// build; this only routes it.
    #[instrument(skip(self, notifier, merged_description))]
    pub async fn post_desc_change(
        &self,
        notifier: &dyn Notifier,
        key: &str,
        app_id: Option<&str>,
        merged_description: serde_json::Value,
    ) {
        let sub_key = SubscriptionKey {
            kind: SubscriptionKind::Desc,
            key: key.to_string(),
            app_id: app_id.map(str::to_string),
            category_or_dim: String::new(),
        };
        let mut settings = serde_json::Map::new();
        settings.insert(key.to_string(), merged_description);
        let payload =
            NotificationPayload::success(None, None, app_id.map(str::to_string), settings);
        for sub in self.registry.subscribers_for(&sub_key) {
            notifier.send(&sub.connection_id, &payload).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SubscriptionRegistry;
    use crate::test_support::RecordingNotifier;

    fn registry_with_subscription(
        key: &str,
        category: &str,
        app_id: Option<&str>,
        connection: &str,
    ) -> SubscriptionRegistry {
        let registry = SubscriptionRegistry::new();
        registry.register(
            connection.to_string(),
            SubscriptionKey {
                kind: SubscriptionKind::Value,
                key: key.to_string(),
                app_id: app_id.map(str::to_string),
                category_or_dim: category.to_string(),
            },
            Some(category.to_string()),
            None,
        );
        registry
    }

    #[tokio::test]
    async fn single_write_sends_exactly_one_message() {
        let registry = registry_with_subscription("brightness", "picture", None, "conn-1");
        let engine = SubscriptionEngine::new(registry);
        let notifier = RecordingNotifier::default();

        engine
            .post_pref_change(
                &notifier,
                &[WriteNotice {
                    category: "picture".into(),
                    key: "brightness".into(),
                    value: Some(serde_json::json!(50)),
                    app_id: None,
                    dimension: None,
                    is_mixed: false,
                }],
                None,
            )
            .await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.settings.get("brightness"), Some(&serde_json::json!(50)));
    }

    #[tokio::test]
    async fn notify_self_false_skips_originating_connection() {
        let registry = registry_with_subscription("brightness", "picture", None, "conn-1");
        let engine = SubscriptionEngine::new(registry);
        let notifier = RecordingNotifier::default();

        engine
            .post_pref_change(
                &notifier,
                &[WriteNotice {
                    category: "picture".into(),
                    key: "brightness".into(),
                    value: Some(serde_json::json!(50)),
                    app_id: None,
                    dimension: None,
                    is_mixed: false,
                }],
                Some("conn-1"),
            )
            .await;

        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn mixed_key_posts_to_per_app_then_stripped_global() {
        let registry = SubscriptionRegistry::new();
        registry.register(
            "per-app-conn".into(),
            SubscriptionKey {
                kind: SubscriptionKind::Value,
                key: "arcPerApp".into(),
                app_id: Some("com.bdp".into()),
                category_or_dim: "picture".into(),
            },
            Some("picture".into()),
            None,
        );
        registry.register(
            "global-conn".into(),
            SubscriptionKey {
                kind: SubscriptionKind::Value,
                key: "arcPerApp".into(),
                app_id: None,
                category_or_dim: "picture".into(),
            },
            Some("picture".into()),
            None,
        );
        let engine = SubscriptionEngine::new(registry);
        let notifier = RecordingNotifier::default();

        engine
            .post_pref_change(
                &notifier,
                &[WriteNotice {
                    category: "picture".into(),
                    key: "arcPerApp".into(),
                    value: Some(serde_json::json!("zoom")),
                    app_id: Some("com.bdp".into()),
                    dimension: None,
                    is_mixed: true,
                }],
                None,
            )
            .await;

        let sent = notifier.sent.lock().unwrap();
        let per_app = sent.iter().find(|(conn, _)| conn == "per-app-conn").unwrap();
        assert_eq!(per_app.1.settings.get("arcPerApp"), Some(&serde_json::json!("zoom")));

        let global = sent.iter().find(|(conn, _)| conn == "global-conn");
        assert!(global.is_none(), "global bucket message is only emitted for mixed keys with a per-app value present");
    }

    #[test]
    fn notify_early_only_snapshots_dimension_pinned_subscribers() {
        let registry = SubscriptionRegistry::new();
        let mut coord = DimensionCoord::new();
        coord.insert("input".to_string(), "dtv".to_string());
        registry.register(
            "conn-1".into(),
            SubscriptionKey {
                kind: SubscriptionKind::Value,
                key: "brightness".into(),
                app_id: None,
                category_or_dim: "picture".into(),
            },
            Some("picture".into()),
            Some(coord.clone()),
        );
        registry.register(
            "conn-2".into(),
            SubscriptionKey {
                kind: SubscriptionKind::Value,
                key: "contrast".into(),
                app_id: None,
                category_or_dim: "picture".into(),
            },
            Some("picture".into()),
            None,
        );

        let engine = SubscriptionEngine::new(registry);
        let snapshot = engine.notify_early("picture");
        assert_eq!(snapshot.coordinates.len(), 1);
    }
}
