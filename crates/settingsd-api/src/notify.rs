//! Concrete [`Notifier`] that fans payloads out over per-connection
//! broadcast channels, consumed by the SSE subscription route.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use settingsd_events::{ConnectionId, NotificationPayload, Notifier};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast-backed notifier. Each connection gets its own channel,
/// created lazily on first subscribe.
#[derive(Default)]
pub struct BroadcastNotifier {
    channels: Mutex<HashMap<ConnectionId, broadcast::Sender<NotificationPayload>>>,
}

impl BroadcastNotifier {
    /// Construct an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `connection_id` to its notification stream, creating the
    /// channel if this is its first subscriber.
    pub fn subscribe(&self, connection_id: &str) -> broadcast::Receiver<NotificationPayload> {
        let mut channels = self.channels.lock().expect("notifier mutex poisoned");
        channels
            .entry(connection_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drop the channel for `connection_id`, e.g. on bus-connection
    /// disconnect. A no-op if no channel exists.
    pub fn remove_connection(&self, connection_id: &str) {
        self.channels.lock().expect("notifier mutex poisoned").remove(connection_id);
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn send(&self, connection_id: &ConnectionId, payload: &NotificationPayload) {
        let sender = {
            let channels = self.channels.lock().expect("notifier mutex poisoned");
            channels.get(connection_id).cloned()
        };
        if let Some(sender) = sender {
            let _ = sender.send(payload.clone());
        }
    }
}
