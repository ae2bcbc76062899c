//! Persisted record shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Storage class a [`SettingsRecord`] lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Read-only on-disk artifact.
    File,
    /// Country-variant factory defaults, stored in the document database.
    Default,
    /// User-modified values, stored in the document database.
    Main,
    /// In-memory only; never persisted.
    Volatile,
}

impl Kind {
    /// The document-database kind string used in `_kind`.
    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Default => "default",
            Self::Main => "main",
            Self::Volatile => "volatile",
        }
    }
}

/// A persisted row in one of the four storage kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    /// Storage kind this record was read from / will be written to.
    #[serde(rename = "_kind")]
    pub kind: Kind,
    /// Database-assigned row id, absent until the row has been persisted.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Category-Dim string (`category` or `category$v1.v2...vN`).
    pub category: String,
    /// Owning app id. Empty string is the global sentinel.
    #[serde(default)]
    pub app_id: String,
    /// Flat key/value payload for this partition.
    pub value: Map<String, Value>,
    /// Country code this record is scoped to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Present (and true) only for volatile rows surfaced through the
    /// document-db shape; volatile records never actually reach the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatile: Option<bool>,
    /// Opaque condition predicate scored by the description model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
}

impl SettingsRecord {
    /// Whether this record is scoped to the global app bucket.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.app_id.is_empty()
    }
}
