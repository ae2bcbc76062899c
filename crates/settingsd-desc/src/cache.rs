//! Layered description cache and per-app filtering rules.
//!
//! A key's final, effective description is assembled from up to five
//! layers, applied in ascending precedence: the compiled-in `base`
//! description, a `file-country` variant, an on-disk `default` override, a
//! runtime `override` edit, and a `main` edit written through the live API.
//! Scalar fields are replaced wholesale by the highest layer present;
//! `ArrayExt` value lists are merged item-by-item (matched by their `value`
//! field) so a higher layer can flip one item's `active`/`visible` flags
//! without discarding the rest of the list.

use crate::model::{ArrayExtItem, DbType, DescriptionItem, VType};
use std::collections::{BTreeMap, HashSet};

/// Precedence-ordered description layer. `Base` is lowest, `Main` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    /// Compiled-in / packaged description.
    Base,
    /// Country-specific file variant.
    FileCountry,
    /// On-disk default override.
    Default,
    /// Runtime override edit.
    Override,
    /// Live edit via the description-write API.
    Main,
}

/// A single key's description, assembled from whichever layers have been
/// set for it.
#[derive(Debug, Default)]
pub struct LayeredDescription {
    layers: BTreeMap<Layer, DescriptionItem>,
}

impl LayeredDescription {
    /// Start a new stack from the mandatory base layer.
    #[must_use]
    pub fn new(base: DescriptionItem) -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(Layer::Base, base);
        Self { layers }
    }

    /// Set (or replace) a non-base layer.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is [`Layer::Base`]; the base layer is fixed at
    /// construction.
    pub fn set_layer(&mut self, layer: Layer, item: DescriptionItem) {
        assert!(layer != Layer::Base, "base layer is set at construction, not patched");
        self.layers.insert(layer, item);
    }

    /// Clear a previously set non-base layer, reverting to whatever the
    /// next layer down provides.
    pub fn clear_layer(&mut self, layer: Layer) {
        if layer != Layer::Base {
            self.layers.remove(&layer);
        }
    }

    /// Merge all present layers, in ascending precedence, into the
    /// effective description.
    #[must_use]
    pub fn resolve(&self) -> DescriptionItem {
        let mut layers = self.layers.iter();
        let (_, base) = layers.next().expect("base layer always present");
        let mut effective = base.clone();
        for (_, patch) in layers {
            merge_into(&mut effective, patch);
        }
        effective
    }
}

fn merge_into(effective: &mut DescriptionItem, patch: &DescriptionItem) {
    effective.vtype = merge_vtype(&effective.vtype, &patch.vtype);
    effective.volatile = patch.volatile;
    effective.value_check = patch.value_check;
    effective.strict_value_check = patch.strict_value_check;
    effective.ui = patch.ui.clone();
    if patch.country.is_some() {
        effective.country = patch.country.clone();
    }
    if patch.condition.is_some() {
        effective.condition = patch.condition.clone();
    }
}

fn merge_vtype(base: &VType, patch: &VType) -> VType {
    if let (VType::ArrayExt { items: base_items }, VType::ArrayExt { items: patch_items }) =
        (base, patch)
    {
        return VType::ArrayExt { items: merge_array_ext(base_items, patch_items) };
    }
    patch.clone()
}

fn merge_array_ext(base: &[ArrayExtItem], patch: &[ArrayExtItem]) -> Vec<ArrayExtItem> {
    let mut merged = base.to_vec();
    for patched in patch {
        match merged.iter_mut().find(|item| item.value == patched.value) {
            Some(existing) => *existing = patched.clone(),
            None => merged.push(patched.clone()),
        }
    }
    merged
}

/// Whether `item` should be visible to a request made on behalf of
/// `requesting_app`, per the per-app filtering rules table.
///
/// `exception_apps` is the on-disk exception list consulted for
/// [`DbType::E`] items.
#[must_use]
pub fn is_visible_to_app(
    item: &DescriptionItem,
    requesting_app: &str,
    exception_apps: &HashSet<String>,
) -> bool {
    match item.dbtype {
        DbType::G => true,
        DbType::P => item.app_id == requesting_app,
        DbType::M => item.is_global() || item.app_id == requesting_app,
        DbType::E => {
            exception_apps.contains(requesting_app) && (item.is_global() || item.app_id == requesting_app)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_item(vtype: VType) -> DescriptionItem {
        DescriptionItem {
            key: "brightness".into(),
            category: "picture".into(),
            vtype,
            dimension: Vec::new(),
            dbtype: DbType::G,
            volatile: false,
            value_check: true,
            strict_value_check: false,
            ui: json!({}),
            app_id: String::new(),
            country: None,
            condition: None,
        }
    }

    #[test]
    fn later_layer_replaces_scalar_fields() {
        let mut stack = LayeredDescription::new(base_item(VType::Range { min: 0.0, max: 100.0, interval: 1.0 }));
        let mut patch = base_item(VType::Range { min: 0.0, max: 100.0, interval: 1.0 });
        patch.volatile = true;
        stack.set_layer(Layer::Override, patch);

        let effective = stack.resolve();
        assert!(effective.volatile);
    }

    #[test]
    fn array_ext_merges_by_value_preserving_unpatched_items() {
        let base = base_item(VType::ArrayExt {
            items: vec![
                ArrayExtItem { value: json!("vivid"), active: true, visible: true },
                ArrayExtItem { value: json!("cinema"), active: true, visible: true },
            ],
        });
        let mut stack = LayeredDescription::new(base);
        let patch = base_item(VType::ArrayExt {
            items: vec![ArrayExtItem { value: json!("vivid"), active: false, visible: true }],
        });
        stack.set_layer(Layer::Main, patch);

        let effective = stack.resolve();
        let VType::ArrayExt { items } = effective.vtype else { panic!("expected ArrayExt") };
        assert_eq!(items.len(), 2);
        let vivid = items.iter().find(|i| i.value == json!("vivid")).unwrap();
        assert!(!vivid.active);
        let cinema = items.iter().find(|i| i.value == json!("cinema")).unwrap();
        assert!(cinema.active);
    }

    #[test]
    fn clear_layer_reverts_to_layer_below() {
        let mut stack = LayeredDescription::new(base_item(VType::Date));
        let mut patch = base_item(VType::Date);
        patch.volatile = true;
        stack.set_layer(Layer::Override, patch);
        stack.clear_layer(Layer::Override);

        assert!(!stack.resolve().volatile);
    }

    #[test]
    fn per_app_visibility_rules() {
        let mut exceptions = HashSet::new();
        exceptions.insert("com.example.allowed".to_string());

        let mut global = base_item(VType::Date);
        global.dbtype = DbType::G;
        assert!(is_visible_to_app(&global, "anything", &exceptions));

        let mut per_app = base_item(VType::Date);
        per_app.dbtype = DbType::P;
        per_app.app_id = "com.example.owner".into();
        assert!(is_visible_to_app(&per_app, "com.example.owner", &exceptions));
        assert!(!is_visible_to_app(&per_app, "com.example.other", &exceptions));

        let mut mixed = base_item(VType::Date);
        mixed.dbtype = DbType::M;
        assert!(is_visible_to_app(&mixed, "com.example.owner", &exceptions));

        let mut gated = base_item(VType::Date);
        gated.dbtype = DbType::E;
        assert!(is_visible_to_app(&gated, "com.example.allowed", &exceptions));
        assert!(!is_visible_to_app(&gated, "com.example.other", &exceptions));
    }
}
