//! Description metadata types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Concrete dimension coordinate: dimension-key name → current value.
/// Ordered so two coordinates with identical entries compare equal and
/// serialize identically.
pub type DimensionCoord = BTreeMap<String, String>;

/// The literal wildcard value used in a dimension coordinate position.
pub const WILDCARD: &str = "x";

/// Shape of the legal-values constraint, keyed by `vtype`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "vtype")]
pub enum VType {
    /// A flat list of legal scalar values.
    Array {
        /// Legal values.
        array: Vec<Value>,
    },
    /// A list of `{value, active, visible, ...}` items.
    ArrayExt {
        /// Legal items, compared by their `value` subfield.
        items: Vec<ArrayExtItem>,
    },
    /// A numeric range with an interval step.
    Range {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
        /// Step the value must be a multiple of, relative to `min`.
        interval: f64,
    },
    /// An opaque date string; accepted without further validation.
    Date,
    /// Not writable through the value-check API.
    Callback,
    /// Not writable through the value-check API.
    File,
}

impl VType {
    /// Discriminator string matching the wire-level `vtype` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Array { .. } => "Array",
            Self::ArrayExt { .. } => "ArrayExt",
            Self::Range { .. } => "Range",
            Self::Date => "Date",
            Self::Callback => "Callback",
            Self::File => "File",
        }
    }
}

/// One legal item in an `ArrayExt` values list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayExtItem {
    /// The value this item represents; equality is on this field alone.
    pub value: Value,
    /// Whether the item is currently selectable.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Whether the item should be presented in a UI.
    #[serde(default = "default_true")]
    pub visible: bool,
}

const fn default_true() -> bool {
    true
}

/// Storage-class tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    /// Global only.
    G,
    /// Per-app / per-source.
    P,
    /// Mixed per-app-with-global-fallback.
    M,
    /// Exception-list gated per-app.
    E,
}

/// Sentinel used for the global app bucket throughout the description model
/// and resolver.
pub const GLOBAL_APP_ID: &str = "";

/// Metadata for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionItem {
    /// Key this description describes. Never overridden by a merge.
    pub key: String,
    /// Category the key belongs to.
    pub category: String,
    /// Value shape and constraint.
    pub vtype: VType,
    /// Ordered dimension-key names this key varies over.
    #[serde(default)]
    pub dimension: Vec<String>,
    /// Storage class.
    pub dbtype: DbType,
    /// If true, the value lives only in memory and is lost on restart.
    #[serde(default)]
    pub volatile: bool,
    /// If true, writes are rejected unless the value lies inside `values`.
    #[serde(default = "default_true")]
    pub value_check: bool,
    /// If true (alongside `value_check`), `ArrayExt` matches must also have
    /// `active` and `visible` both true.
    #[serde(default)]
    pub strict_value_check: bool,
    /// Opaque UI presentation hints.
    #[serde(default)]
    pub ui: Value,
    /// Owner when the description is per-app; empty for global.
    #[serde(default)]
    pub app_id: String,
    /// Country scoping: empty/`none`/`default`, or a country-code list.
    #[serde(default)]
    pub country: Option<String>,
    /// Score-based selection predicate.
    #[serde(default)]
    pub condition: Option<Value>,
}

impl DescriptionItem {
    /// Whether this item is scoped to the global app bucket.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.app_id.is_empty()
    }
}

/// Render the canonical Category-Dim string for `category` given a
/// dimension coordinate, in the category's declared dimension order.
///
/// Positions missing from `coord` are rendered as the wildcard (`x`).
/// Categories with an empty `dimension_order` render as the bare category.
#[must_use]
pub fn build_category_dim(
    category: &str,
    dimension_order: &[String],
    coord: &DimensionCoord,
) -> String {
    if dimension_order.is_empty() {
        return category.to_string();
    }
    let positions: Vec<&str> = dimension_order
        .iter()
        .map(|dim_key| coord.get(dim_key).map(String::as_str).unwrap_or(WILDCARD))
        .collect();
    format!("{category}${}", positions.join("."))
}

/// Split a Category-Dim string back into `(category, dimension values)`.
#[must_use]
pub fn split_category_dim(category_dim: &str) -> (&str, Vec<&str>) {
    match category_dim.split_once('$') {
        Some((category, dims)) => (category, dims.split('.').collect()),
        None => (category_dim, Vec::new()),
    }
}

/// Strip dimension-key entries from `coord` that `dimension_order` no
/// longer declares for this category.
pub fn remove_not_used_dimension(coord: &mut DimensionCoord, dimension_order: &[String]) {
    coord.retain(|dim_key, _| dimension_order.iter().any(|d| d == dim_key));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_category_dim_uses_wildcard_for_missing_positions() {
        let order = vec!["input".to_string(), "pictureMode".to_string()];
        let mut coord = DimensionCoord::new();
        coord.insert("input".to_string(), "dtv".to_string());
        assert_eq!(build_category_dim("picture", &order, &coord), "picture$dtv.x");
    }

    #[test]
    fn build_category_dim_without_dimensions_is_bare_category() {
        let coord = DimensionCoord::new();
        assert_eq!(build_category_dim("option", &[], &coord), "option");
    }

    #[test]
    fn split_category_dim_round_trips() {
        let (category, dims) = split_category_dim("picture$dtv.vivid.2d");
        assert_eq!(category, "picture");
        assert_eq!(dims, vec!["dtv", "vivid", "2d"]);

        let (category, dims) = split_category_dim("option");
        assert_eq!(category, "option");
        assert!(dims.is_empty());
    }

    #[test]
    fn remove_not_used_dimension_strips_stale_keys() {
        let mut coord = DimensionCoord::new();
        coord.insert("input".to_string(), "dtv".to_string());
        coord.insert("stale".to_string(), "whatever".to_string());
        remove_not_used_dimension(&mut coord, &["input".to_string()]);
        assert_eq!(coord.len(), 1);
        assert!(coord.contains_key("input"));
    }
}
