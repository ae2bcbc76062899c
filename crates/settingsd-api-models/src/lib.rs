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
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Wire DTOs for the settings-service bus protocol: one params struct per
//! method, a shared response envelope, and the transport-level
//! [`ProblemDetails`] problem document used when a request never reaches
//! a bus method (malformed JSON, unknown method, 404).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use settingsd_desc::DimensionCoord;

/// RFC9457-compatible problem document for transport-level failures that
/// never reach a bus method (malformed JSON body, unknown route, auth).
/// Bus-method failures use [`BusResponse`] instead, per the all-keys-
/// succeeded / `errorKey` / fatal `errorText` propagation policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
}

/// Envelope shared by every bus method reply. Optional fields are omitted
/// from the rendered JSON rather than sent as `null`, matching each
/// method's own "success payload" shape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BusResponse {
    /// Whether the call succeeded, under the all-keys-succeeded rule.
    #[serde(rename = "returnValue")]
    pub return_value: bool,
    /// Method name echoed back.
    pub method: String,
    /// Present only on requests that carried `subscribe: true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribed: Option<bool>,
    /// Resolved `{ key -> value }` mapping (get/getCurrentSettings).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    /// Category echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Dimension coordinate echoed back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<DimensionCoord>,
    #[serde(rename = "app_id", skip_serializing_if = "Option::is_none")]
    /// App id echoed back.
    pub app_id: Option<String>,
    /// `vtype` discriminator (getSystemSettingValues).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vtype: Option<Value>,
    /// Legal-values payload (getSystemSettingValues).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,
    /// Description rows (getSystemSettingDesc) or sub-replies (batch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Value>>,
    /// Keys that stored successfully in a partially-failed request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<Vec<String>>,
    #[serde(rename = "errorKey", skip_serializing_if = "Option::is_none")]
    /// Keys that failed in a partially-failed request.
    pub error_key: Option<Vec<String>>,
    #[serde(rename = "errorText", skip_serializing_if = "Option::is_none")]
    /// Fatal-failure detail; only set when `return_value` is `false` and
    /// nothing else in this envelope describes the failure.
    pub error_text: Option<String>,
}

impl BusResponse {
    /// Start a successful envelope for `method`.
    #[must_use]
    pub fn ok(method: impl Into<String>) -> Self {
        Self { return_value: true, method: method.into(), ..Self::default() }
    }

    /// Start a fatal-failure envelope for `method` (the "errorText only" case).
    #[must_use]
    pub fn fatal(method: impl Into<String>, error_text: impl Into<String>) -> Self {
        Self {
            return_value: false,
            method: method.into(),
            error_text: Some(error_text.into()),
            ..Self::default()
        }
    }
}

fn default_true() -> bool {
    true
}

/// Params shared by `getSystemSettings`, `getSystemSettingFactoryValue`, and
/// `getCurrentSettings`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetSettingsParams {
    /// Explicit key set to read.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    /// Single key shorthand for `keys`.
    #[serde(default)]
    pub key: Option<String>,
    /// Category (or Category-Dim) to read.
    #[serde(default)]
    pub category: Option<String>,
    /// Dimension coordinate to resolve the category under.
    #[serde(default)]
    pub dimension: Option<DimensionCoord>,
    /// Owning app, or absent/empty for a global read.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Use the device's current-app pointer instead of `app_id`.
    #[serde(default)]
    pub current_app: Option<bool>,
    /// Register a subscription for future changes to the resolved keys.
    #[serde(default)]
    pub subscribe: Option<bool>,
}

/// `setSystemSettings` params.
#[derive(Debug, Clone, Deserialize)]
pub struct SetSettingsParams {
    /// Key/value pairs to write.
    pub settings: Map<String, Value>,
    /// Category (or Category-Dim) to write into.
    #[serde(default)]
    pub category: Option<String>,
    /// Dimension coordinate to write under.
    #[serde(default)]
    pub dimension: Option<DimensionCoord>,
    /// Owning app, or absent/empty for a global write.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Use the device's current-app pointer instead of `app_id`.
    #[serde(default)]
    pub current_app: Option<bool>,
    /// Write every Category-Dim partition under `category` rather than one.
    #[serde(rename = "setAll", default)]
    pub set_all: Option<bool>,
    /// Emit subscription notifications for this write (default `true`).
    #[serde(default)]
    pub notify: Option<bool>,
    /// Persist to the document store (default `true`; `false` is
    /// notify-only).
    #[serde(default)]
    pub store: Option<bool>,
    /// Enforce value-check (default `true`).
    #[serde(rename = "valueCheck", default)]
    pub value_check: Option<bool>,
    /// Also notify the connection that issued this write (default `true`).
    #[serde(rename = "notifySelf", default)]
    pub notify_self: Option<bool>,
}

/// `setSystemSettingFactoryValue` params.
#[derive(Debug, Clone, Deserialize)]
pub struct SetFactoryValueParams {
    /// Key/value pairs to write into the `default` layer.
    pub settings: Map<String, Value>,
    /// Category (or Category-Dim) to write into.
    #[serde(default)]
    pub category: Option<String>,
    /// Dimension coordinate to write under.
    #[serde(default)]
    pub dimension: Option<DimensionCoord>,
    /// Owning app, or absent/empty for a global write.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Write every Category-Dim partition under `category` rather than one.
    #[serde(rename = "setAll", default)]
    pub set_all: Option<bool>,
    /// Country-variant scope for the written default row.
    #[serde(default)]
    pub country: Option<String>,
    /// Enforce value-check (default `true`).
    #[serde(rename = "valueCheck", default)]
    pub value_check: Option<bool>,
}

/// `getSystemSettingValues` params.
#[derive(Debug, Clone, Deserialize)]
pub struct GetValuesParams {
    /// Key whose legal-values list to read.
    pub key: String,
    /// Owning app, when the key is per-app.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Category, for keys not uniquely identified by `key` alone.
    #[serde(default)]
    pub category: Option<String>,
    /// Register a subscription for future values-list changes.
    #[serde(default)]
    pub subscribe: Option<bool>,
}

/// `setSystemSettingValues` params.
#[derive(Debug, Clone, Deserialize)]
pub struct SetValuesParams {
    /// Key whose legal-values list to mutate.
    pub key: String,
    /// `vtype` discriminator the mutation targets.
    pub vtype: String,
    /// One of `set`, `add`, `remove`, `update`.
    pub op: String,
    /// New items; shape depends on `vtype`.
    pub values: Value,
    /// Category, for keys not uniquely identified by `key` alone.
    #[serde(default)]
    pub category: Option<String>,
    /// Also notify the connection that issued this write (default `true`).
    #[serde(rename = "notifySelf", default)]
    pub notify_self: Option<bool>,
}

/// Params shared by `getSystemSettingDesc`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetDescParams {
    /// Explicit key set to describe.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    /// Single key shorthand for `keys`.
    #[serde(default)]
    pub key: Option<String>,
    /// Category to describe every key under.
    #[serde(default)]
    pub category: Option<String>,
    /// Owning app, for per-app descriptions.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Use the device's current-app pointer instead of `app_id`.
    #[serde(default)]
    pub current_app: Option<bool>,
    /// Register a subscription for future description changes.
    #[serde(default)]
    pub subscribe: Option<bool>,
}

/// Params shared by `setSystemSettingDesc` and `setSystemSettingFactoryDesc`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetDescParams {
    /// Key whose description to edit.
    pub key: String,
    /// Owning app, for a per-app description edit.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Category to (re)assign the key to.
    #[serde(default)]
    pub category: Option<String>,
    /// UI presentation hints to merge in.
    #[serde(default)]
    pub ui: Option<Value>,
    /// `vtype` discriminator to (re)assign.
    #[serde(default)]
    pub vtype: Option<Value>,
    /// Legal-values payload matching `vtype`.
    #[serde(default)]
    pub values: Option<Value>,
    /// Whether writes against the edited key should be value-checked.
    #[serde(rename = "valueCheck", default = "default_true")]
    pub value_check: bool,
    /// Also notify the connection that issued this edit (default `true`).
    #[serde(rename = "notifySelf", default)]
    pub notify_self: Option<bool>,
    /// Opaque extension fields carried through unchanged.
    #[serde(default)]
    pub ext: Option<Value>,
}

/// `deleteSystemSettings` params.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteParams {
    /// Keys to remove.
    pub keys: Vec<String>,
    /// Category (or Category-Dim) to remove from.
    #[serde(default)]
    pub category: Option<String>,
    /// Dimension coordinate identifying the partition.
    #[serde(default)]
    pub dimension: Option<DimensionCoord>,
    /// Owning app, or absent/empty for a global delete.
    #[serde(default)]
    pub app_id: Option<String>,
}

/// `resetSystemSettings` params.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetParams {
    /// Keys to reset; ignored when `reset_all` is set.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    /// Category (or Category-Dim) to reset.
    #[serde(default)]
    pub category: Option<String>,
    /// Dimension coordinate identifying the partition.
    #[serde(default)]
    pub dimension: Option<DimensionCoord>,
    /// Owning app, or absent/empty for a global reset.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Reset every Category-Dim partition under `category`.
    #[serde(rename = "resetAll", default)]
    pub reset_all: Option<bool>,
}

/// `resetSystemSettingDesc` params.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetDescParams {
    /// Keys whose `main`-layer description edit to drop.
    pub keys: Vec<String>,
    /// Category, informational only (the reset is keyed on key/app_id).
    #[serde(default)]
    pub category: Option<String>,
    /// App ids to reset; absent means the global bucket only.
    #[serde(default)]
    pub app_id: Option<String>,
}

/// `removeApp` params: notifies the service that an app was uninstalled so
/// its per-app settings and description buckets can be purged.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveAppParams {
    /// App id that was uninstalled.
    pub app_id: String,
}

/// A single sub-operation inside a `batch` request.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchOperationParams {
    /// Name of the bus method this sub-operation invokes.
    pub method: String,
    /// That method's own params, as a raw JSON value.
    pub params: Value,
}

/// `batch` params.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchParams {
    /// Sub-operations to run, in order.
    pub operations: Vec<BatchOperationParams>,
    /// Register a subscription across the whole batch.
    #[serde(default)]
    pub subscribe: Option<bool>,
}
