//! Notification payload shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A concrete dimension coordinate: dimension-key name to current value.
///
/// Ordered (`BTreeMap`) so two coordinates with the same entries always
/// compare and serialize identically, which the mixed-type posting quirk
/// and the dimension-bucket comparison both rely on.
pub type DimensionCoord = BTreeMap<String, String>;

/// Payload delivered to a subscriber after a value or description change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    /// Whether the underlying operation succeeded.
    pub return_value: bool,
    /// Category the changed keys belong to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Dimension coordinate the settings were resolved under, when the
    /// category is dimension-qualified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionCoord>,
    /// Owning app id, or `None` for the global scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Flat key/value settings map composing this notification.
    pub settings: serde_json::Map<String, serde_json::Value>,
    /// Populated when a removed key has no default value to fall back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

impl NotificationPayload {
    /// Construct a successful payload carrying `settings`.
    #[must_use]
    pub fn success(
        category: Option<String>,
        dimension: Option<DimensionCoord>,
        app_id: Option<String>,
        settings: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            return_value: true,
            category,
            dimension,
            app_id,
            settings,
            error_text: None,
        }
    }
}
