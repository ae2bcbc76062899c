#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Subscription registry and write-notification protocol for the settings
//! service.
//!
//! Subscriptions are keyed by a canonical string derived from
//! `(kind, key, appId, category-or-category-dim)`. Writers drive the
//! three-step `notify-early / commit / notify-late` protocol through
//! [`SubscriptionEngine`], which delegates delivery to an abstract
//! [`Notifier`] — the RPC bus itself is out of scope for this crate.

mod error;
mod payloads;
mod protocol;
mod registry;

pub use error::{EventsError, EventsResult};
pub use payloads::{DimensionCoord, NotificationPayload};
pub use protocol::{PreWriteSnapshot, SubscriptionEngine, WriteNotice};
pub use registry::{
    ConnectionId, SubscriptionId, SubscriptionKey, SubscriptionKind, SubscriptionRegistry,
};

use async_trait::async_trait;

/// Abstract sink for outgoing subscription payloads.
///
/// The settings service core never speaks the bus wire protocol directly; it
/// hands a fully composed [`NotificationPayload`] to whichever connection
/// owns a subscription and lets the host-provided implementation serialize
/// and deliver it. A `send` that targets a connection which has already
/// disconnected is expected to be a silent no-op.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `payload` to the bus connection identified by `connection_id`.
    async fn send(&self, connection_id: &ConnectionId, payload: &NotificationPayload);
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{ConnectionId, NotificationPayload, Notifier};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub(crate) sent: Mutex<Vec<(ConnectionId, NotificationPayload)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, connection_id: &ConnectionId, payload: &NotificationPayload) {
            self.sent
                .lock()
                .expect("notifier mutex poisoned")
                .push((connection_id.clone(), payload.clone()));
        }
    }
}
