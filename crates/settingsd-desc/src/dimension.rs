//! Dimension key resolution.
//!
//! Dimension keys come in two flavors, both declared by the `dimensionInfo`
//! category: independent keys (`type: d0`) whose value is read straight off
//! device state, and dependent keys (`type: d1`) whose legal values are
//! partitioned by an independent key's current value (e.g. `pictureMode`
//! only makes sense once `input` is known).

use crate::model::{remove_not_used_dimension, DimensionCoord};
use std::collections::BTreeMap;

/// Declaration of one dimension key, as read from `dimensionInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionKind {
    /// Resolved directly from device state, no partitioning.
    Independent,
    /// Only meaningful once `parent` has a value; its own current value is
    /// scoped to that parent's value.
    Dependent {
        /// Name of the independent dimension key this one is partitioned by.
        parent: String,
    },
}

/// One declared dimension key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionKeyInfo {
    /// Dimension key name (e.g. `input`, `pictureMode`).
    pub name: String,
    /// Independent or dependent-on-parent.
    pub kind: DimensionKind,
}

/// Live registry of declared dimension keys and their current values.
///
/// Owned by the description model; updated as the device's current
/// dimension state changes (input switched, picture mode changed, etc.).
#[derive(Debug, Default)]
pub struct DimensionRegistry {
    declarations: Vec<DimensionKeyInfo>,
    current: BTreeMap<String, String>,
}

impl DimensionRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension key. Declaration order is preserved and used as
    /// the fallback Category-Dim ordering for categories that don't specify
    /// their own.
    pub fn declare(&mut self, info: DimensionKeyInfo) {
        self.declarations.push(info);
    }

    /// All declared dimension key names, in declaration order.
    #[must_use]
    pub fn declared_names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    /// Look up how a dimension key was declared.
    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<&DimensionKind> {
        self.declarations.iter().find(|d| d.name == name).map(|d| &d.kind)
    }

    /// Record the device's current value for a dimension key.
    ///
    /// Setting an independent key's value clears any dependent key whose
    /// partition no longer applies, since a stale dependent value would
    /// otherwise resolve against the wrong parent.
    pub fn set_current(&mut self, name: &str, value: impl Into<String>) {
        self.current.insert(name.to_string(), value.into());
        let stale: Vec<String> = self
            .declarations
            .iter()
            .filter(|d| matches!(&d.kind, DimensionKind::Dependent { parent } if parent == name))
            .map(|d| d.name.clone())
            .collect();
        for dependent in stale {
            self.current.remove(&dependent);
        }
    }

    /// The device's current value for a dimension key, if known.
    #[must_use]
    pub fn current_value(&self, name: &str) -> Option<&str> {
        self.current.get(name).map(String::as_str)
    }

    /// Build the current [`DimensionCoord`] restricted to `dimension_order`,
    /// dropping any stale entries `dimension_order` no longer declares.
    #[must_use]
    pub fn current_coord(&self, dimension_order: &[String]) -> DimensionCoord {
        let mut coord: DimensionCoord = dimension_order
            .iter()
            .filter_map(|name| self.current.get(name).map(|v| (name.clone(), v.clone())))
            .collect();
        remove_not_used_dimension(&mut coord, dimension_order);
        coord
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> DimensionRegistry {
        let mut registry = DimensionRegistry::new();
        registry.declare(DimensionKeyInfo { name: "input".into(), kind: DimensionKind::Independent });
        registry.declare(DimensionKeyInfo {
            name: "pictureMode".into(),
            kind: DimensionKind::Dependent { parent: "input".into() },
        });
        registry
    }

    #[test]
    fn changing_independent_key_clears_dependent_value() {
        let mut registry = sample_registry();
        registry.set_current("input", "dtv");
        registry.set_current("pictureMode", "vivid");
        assert_eq!(registry.current_value("pictureMode"), Some("vivid"));

        registry.set_current("input", "hdmi1");
        assert_eq!(registry.current_value("pictureMode"), None);
        assert_eq!(registry.current_value("input"), Some("hdmi1"));
    }

    #[test]
    fn current_coord_only_includes_declared_order_positions() {
        let mut registry = sample_registry();
        registry.set_current("input", "dtv");
        registry.set_current("pictureMode", "vivid");

        let coord = registry.current_coord(&["input".to_string()]);
        assert_eq!(coord.len(), 1);
        assert_eq!(coord.get("input"), Some(&"dtv".to_string()));
    }

    #[test]
    fn declared_names_preserve_declaration_order() {
        let registry = sample_registry();
        assert_eq!(registry.declared_names(), vec!["input", "pictureMode"]);
    }
}
