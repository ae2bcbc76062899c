//! Error types for the subscription and notification engine.

use thiserror::Error;

/// Errors raised while registering or routing subscriptions.
#[derive(Debug, Error)]
pub enum EventsError {
    /// A subscription id was referenced that the registry does not know about.
    #[error("unknown subscription id {id}")]
    UnknownSubscription {
        /// The subscription id that was looked up.
        id: u64,
    },
    /// A connection id was referenced that has no registered subscriptions.
    #[error("unknown connection {connection_id}")]
    UnknownConnection {
        /// The connection id that was looked up.
        connection_id: String,
    },
}

/// Convenience alias for results in this crate.
pub type EventsResult<T> = Result<T, EventsError>;
