//! The description model's query and write-through API.
//!
//! [`DescriptionModel`] is the process-wide, thread-safe cache the resolver
//! and task engine consult for everything about a key except its value:
//! category, dimension list, storage class, volatility, and legal-value
//! constraints. It also accepts the write-through edits issued by the
//! description-write handlers (`setSystemSettingDesc` and friends).

use crate::cache::{is_visible_to_app, Layer, LayeredDescription};
use crate::country::select_country_variant;
use crate::dimension::DimensionRegistry;
use crate::error::{DescError, DescResult};
use crate::model::{build_category_dim, DbType, DescriptionItem, DimensionCoord, VType, GLOBAL_APP_ID, WILDCARD};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// key -> app id ("" for the global bucket) -> layered description.
    items: HashMap<String, HashMap<String, LayeredDescription>>,
    /// category -> declared dimension order, taken from its first-seen key.
    category_dimension_order: HashMap<String, Vec<String>>,
    dimensions: DimensionRegistry,
    exception_apps: HashSet<String>,
}

/// Thread-safe cache of every key's description metadata.
pub struct DescriptionModel {
    inner: RwLock<Inner>,
}

impl Default for DescriptionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptionModel {
    /// Construct an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    /// Seed the base layer for a batch of descriptions loaded at startup,
    /// with no country variant selected. Equivalent to
    /// [`Self::load_base_for_country`] with a code that matches only
    /// unscoped or `default`-tagged entries.
    pub fn load_base(&self, items: Vec<DescriptionItem>) {
        self.load_base_for_country(items, "");
    }

    /// Seed the base layer for a batch of descriptions loaded at startup,
    /// selecting `country_code`'s [`Layer::FileCountry`] variant per key
    /// where one is declared.
    ///
    /// Items are grouped by `(key, app_id)` before insertion: a base
    /// artifact commonly carries an unscoped entry for a key alongside one
    /// or more country-scoped variants, and inserting them one at a time
    /// would let the later variant silently clobber the earlier one
    /// instead of layering on top of it.
    pub fn load_base_for_country(&self, items: Vec<DescriptionItem>, country_code: &str) {
        let mut groups: HashMap<(String, String), Vec<DescriptionItem>> = HashMap::new();
        for item in items {
            groups.entry((item.key.clone(), item.app_id.clone())).or_default().push(item);
        }

        let mut inner = self.inner.write().expect("description model lock poisoned");
        for ((key, app_id), mut variants) in groups {
            let base_index = variants.iter().position(|item| item.country.is_none()).unwrap_or(0);
            let base = variants.remove(base_index);

            inner
                .category_dimension_order
                .entry(base.category.clone())
                .or_insert_with(|| base.dimension.clone());

            let mut layered = LayeredDescription::new(base);
            if let Some(winner) =
                select_country_variant(&variants, country_code, |item| item.country.as_deref())
            {
                layered.set_layer(Layer::FileCountry, winner.clone());
            }
            inner.items.entry(key).or_default().insert(app_id, layered);
        }
    }

    /// Apply an on-disk default-override artifact as [`Layer::Default`],
    /// layered on top of whatever base entry a key already has rather than
    /// replacing it. Selects `country_code`'s variant per key the same way
    /// [`Self::load_base_for_country`] does.
    pub fn apply_default_overrides(&self, items: Vec<DescriptionItem>, country_code: &str) {
        let mut groups: HashMap<(String, String), Vec<DescriptionItem>> = HashMap::new();
        for item in items {
            groups.entry((item.key.clone(), item.app_id.clone())).or_default().push(item);
        }

        let mut inner = self.inner.write().expect("description model lock poisoned");
        for ((key, app_id), variants) in groups {
            let Some(winner) =
                select_country_variant(&variants, country_code, |item| item.country.as_deref())
            else {
                continue;
            };
            let winner = winner.clone();

            inner
                .category_dimension_order
                .entry(winner.category.clone())
                .or_insert_with(|| winner.dimension.clone());

            inner
                .items
                .entry(key)
                .or_default()
                .entry(app_id)
                .and_modify(|layered| layered.set_layer(Layer::Default, winner.clone()))
                .or_insert_with(|| LayeredDescription::new(winner));
        }
    }

    /// Replace the exception app list (`DbType::E`).
    pub fn set_exception_apps(&self, apps: HashSet<String>) {
        self.inner.write().expect("description model lock poisoned").exception_apps = apps;
    }

    /// Declare a dimension key.
    pub fn declare_dimension(&self, info: crate::dimension::DimensionKeyInfo) {
        self.inner.write().expect("description model lock poisoned").dimensions.declare(info);
    }

    /// Record the device's current value for a dimension key.
    pub fn set_current_dimension_value(&self, name: &str, value: impl Into<String>) {
        self.inner
            .write()
            .expect("description model lock poisoned")
            .dimensions
            .set_current(name, value);
    }

    fn resolve_locked(inner: &Inner, key: &str, app_id: &str) -> Option<DescriptionItem> {
        let by_app = inner.items.get(key)?;
        by_app
            .get(app_id)
            .or_else(|| by_app.get(GLOBAL_APP_ID))
            .map(LayeredDescription::resolve)
    }

    /// Resolve `key`'s effective description for `app_id`, applying per-app
    /// visibility filtering. Falls back to the global bucket when the
    /// app-specific pick exists but is filtered out — this is the `E`-type
    /// case where a per-app bucket for `app_id` exists but `app_id` is not
    /// on the exception list, so the global default should still answer.
    /// Returns `None` if the key is unknown or not visible to this app even
    /// after the fallback.
    #[must_use]
    pub fn describe(&self, key: &str, app_id: &str) -> Option<DescriptionItem> {
        let inner = self.inner.read().expect("description model lock poisoned");
        let item = Self::resolve_locked(&inner, key, app_id)?;
        if is_visible_to_app(&item, app_id, &inner.exception_apps) {
            return Some(item);
        }
        if item.app_id != GLOBAL_APP_ID {
            let by_app = inner.items.get(key)?;
            let global = by_app.get(GLOBAL_APP_ID).map(LayeredDescription::resolve)?;
            return is_visible_to_app(&global, app_id, &inner.exception_apps).then_some(global);
        }
        None
    }

    /// The category a key belongs to.
    #[must_use]
    pub fn category_of(&self, key: &str, app_id: &str) -> Option<String> {
        self.describe(key, app_id).map(|item| item.category)
    }

    /// The ordered dimension keys a key varies over.
    #[must_use]
    pub fn dimensions_of(&self, key: &str, app_id: &str) -> Option<Vec<String>> {
        self.describe(key, app_id).map(|item| item.dimension)
    }

    /// Whether `key` is itself a declared dimension key (e.g. `input`,
    /// `pictureMode`), as opposed to a key that merely varies over one.
    /// Writers use this to decide whether a commit must rebuild dimension
    /// state and re-notify dimension-pinned subscribers.
    #[must_use]
    pub fn is_dimension_key(&self, key: &str) -> bool {
        let inner = self.inner.read().expect("description model lock poisoned");
        inner.dimensions.kind_of(key).is_some()
    }

    /// The storage class (`G`/`P`/`M`/`E`) a key was declared with.
    #[must_use]
    pub fn db_type_of(&self, key: &str, app_id: &str) -> Option<DbType> {
        self.describe(key, app_id).map(|item| item.dbtype)
    }

    /// Whether a key is volatile (in-memory only).
    #[must_use]
    pub fn is_volatile(&self, key: &str, app_id: &str) -> Option<bool> {
        self.describe(key, app_id).map(|item| item.volatile)
    }

    /// Whether `key` has no description at all for `app_id` (a write to it
    /// would be introducing a brand new key, which some write handlers
    /// reject outright).
    #[must_use]
    pub fn is_new_key(&self, key: &str, app_id: &str) -> bool {
        self.describe(key, app_id).is_none()
    }

    /// The device's current dimension coordinate, restricted to the
    /// dimension keys `category` actually declares.
    #[must_use]
    pub fn current_dimension(&self, category: &str) -> DimensionCoord {
        let inner = self.inner.read().expect("description model lock poisoned");
        let order = inner.category_dimension_order.get(category).cloned().unwrap_or_default();
        inner.dimensions.current_coord(&order)
    }

    /// Render the canonical Category-Dim string for `category` given an
    /// explicit dimension coordinate.
    #[must_use]
    pub fn build_category_dim(&self, category: &str, coord: &DimensionCoord) -> String {
        let inner = self.inner.read().expect("description model lock poisoned");
        let order = inner.category_dimension_order.get(category).cloned().unwrap_or_default();
        build_category_dim(category, &order, coord)
    }

    /// Split a Category-Dim string into its bare category and a dimension
    /// coordinate, keyed by `category`'s declared dimension order. Wildcard
    /// (`x`) positions are omitted from the returned coordinate.
    #[must_use]
    pub fn split_category_dim(&self, category_dim: &str) -> (String, DimensionCoord) {
        let (category, values) = crate::model::split_category_dim(category_dim);
        let inner = self.inner.read().expect("description model lock poisoned");
        let order = inner.category_dimension_order.get(category).cloned().unwrap_or_default();
        let mut coord = DimensionCoord::new();
        for (name, value) in order.iter().zip(values.iter()) {
            if *value != WILDCARD {
                coord.insert(name.clone(), (*value).to_string());
            }
        }
        (category.to_string(), coord)
    }

    /// All keys declared under `category` that are visible to `app_id`.
    #[must_use]
    pub fn category_key_list(&self, category: &str, app_id: &str) -> Vec<String> {
        let inner = self.inner.read().expect("description model lock poisoned");
        inner
            .items
            .iter()
            .filter_map(|(key, by_app)| {
                let item = Self::resolve_locked(&inner, key, app_id)?;
                (item.category == category && is_visible_to_app(&item, app_id, &inner.exception_apps))
                    .then(|| {
                        let _ = by_app;
                        key.clone()
                    })
            })
            .collect()
    }

    /// All keys declared under `category`, ignoring per-app visibility —
    /// used by administrative tooling that needs the full picture.
    #[must_use]
    pub fn category_key_list_all(&self, category: &str) -> Vec<String> {
        let inner = self.inner.read().expect("description model lock poisoned");
        inner
            .items
            .iter()
            .filter(|(_, by_app)| by_app.values().any(|layered| layered.resolve().category == category))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Keys declared under `category` (ignoring per-app visibility), scoped
    /// to `keys` when non-empty.
    fn keys_under_category_locked(inner: &Inner, category: &str, keys: &[String]) -> HashSet<String> {
        let matches = |key: &str| {
            inner
                .items
                .get(key)
                .is_some_and(|by_app| by_app.values().any(|layered| layered.resolve().category == category))
        };
        if keys.is_empty() {
            inner.items.keys().filter(|key| matches(key)).cloned().collect()
        } else {
            keys.iter().filter(|key| matches(key.as_str())).cloned().collect()
        }
    }

    /// Legal values a dimension key can take, used to enumerate Category-Dim
    /// partitions. Prefers the key's own declared `Array` legal-values list,
    /// falling back to its single current device value, then the wildcard.
    fn dimension_value_domain_locked(inner: &Inner, dim_key: &str) -> Vec<String> {
        if let Some(item) = Self::resolve_locked(inner, dim_key, GLOBAL_APP_ID) {
            if let VType::Array { array } = &item.vtype {
                let values: Vec<String> =
                    array.iter().filter_map(|value| value.as_str().map(str::to_string)).collect();
                if !values.is_empty() {
                    return values;
                }
            }
        }
        match inner.dimensions.current_value(dim_key) {
            Some(value) => vec![value.to_string()],
            None => vec![WILDCARD.to_string()],
        }
    }

    /// The single Category-Dim partition `dimension` resolves to under
    /// `category`, mapped to the subset of `keys` (or every key under
    /// `category` when `keys` is empty) declared there. Missing coordinate
    /// positions render as the wildcard, same as [`Self::build_category_dim`].
    #[must_use]
    pub fn category_key_list_map(
        &self,
        category: &str,
        dimension: &DimensionCoord,
        keys: &[String],
    ) -> BTreeMap<String, HashSet<String>> {
        let inner = self.inner.read().expect("description model lock poisoned");
        let order = inner.category_dimension_order.get(category).cloned().unwrap_or_default();
        let category_keys = Self::keys_under_category_locked(&inner, category, keys);
        let mut map = BTreeMap::new();
        if !category_keys.is_empty() {
            map.insert(build_category_dim(category, &order, dimension), category_keys);
        }
        map
    }

    /// Every Category-Dim partition under `category`, enumerated by the
    /// cross-product of each declared dimension key's legal value list, each
    /// mapped to the subset of `keys` (or every key under `category` when
    /// `keys` is empty) declared there. `setAll` expansion is built on top
    /// of this.
    #[must_use]
    pub fn category_key_list_map_all(&self, category: &str, keys: &[String]) -> BTreeMap<String, HashSet<String>> {
        let inner = self.inner.read().expect("description model lock poisoned");
        let order = inner.category_dimension_order.get(category).cloned().unwrap_or_default();
        let category_keys = Self::keys_under_category_locked(&inner, category, keys);
        if category_keys.is_empty() {
            return BTreeMap::new();
        }
        if order.is_empty() {
            let mut map = BTreeMap::new();
            map.insert(category.to_string(), category_keys);
            return map;
        }

        let mut coords: Vec<DimensionCoord> = vec![DimensionCoord::new()];
        for dim_key in &order {
            let values = Self::dimension_value_domain_locked(&inner, dim_key);
            let mut next = Vec::with_capacity(coords.len() * values.len());
            for coord in &coords {
                for value in &values {
                    let mut extended = coord.clone();
                    extended.insert(dim_key.clone(), value.clone());
                    next.push(extended);
                }
            }
            coords = next;
        }

        coords
            .into_iter()
            .map(|coord| (build_category_dim(category, &order, &coord), category_keys.clone()))
            .collect()
    }

    /// Partition `keys` into the ones backed by a global ([`DbType::G`])
    /// description and the ones backed by a per-app one, for `app_id`.
    #[must_use]
    pub fn split_keys_into_global_or_per_app(
        &self,
        keys: &[String],
        app_id: &str,
    ) -> (Vec<String>, Vec<String>) {
        let inner = self.inner.read().expect("description model lock poisoned");
        let mut global = Vec::new();
        let mut per_app = Vec::new();
        for key in keys {
            match Self::resolve_locked(&inner, key, app_id) {
                Some(item) if item.dbtype == DbType::G => global.push(key.clone()),
                Some(_) => per_app.push(key.clone()),
                None => per_app.push(key.clone()),
            }
        }
        (global, per_app)
    }

    /// Write-through a runtime description edit (`setSystemSettingDesc`).
    ///
    /// # Errors
    ///
    /// Returns [`DescError::UnknownKey`] if no base description exists for
    /// `key`/`app_id` to layer the edit onto.
    pub fn add_key_desc(&self, key: &str, app_id: &str, patch: DescriptionItem) -> DescResult<()> {
        let mut inner = self.inner.write().expect("description model lock poisoned");
        let by_app =
            inner.items.get_mut(key).ok_or_else(|| DescError::UnknownKey {
                key: key.to_string(),
                app_id: app_id.to_string(),
            })?;
        let layered = by_app.get_mut(app_id).ok_or_else(|| DescError::UnknownKey {
            key: key.to_string(),
            app_id: app_id.to_string(),
        })?;
        layered.set_layer(Layer::Main, patch);
        Ok(())
    }

    /// Write-through a factory-level description edit
    /// (`setSystemSettingFactoryDesc`), landing in the `Override` layer
    /// rather than `Main` so a later `resetSystemSettingDesc` still exposes
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`DescError::UnknownKey`] if no base description exists.
    pub fn set_factory_desc(&self, key: &str, app_id: &str, patch: DescriptionItem) -> DescResult<()> {
        let mut inner = self.inner.write().expect("description model lock poisoned");
        let by_app =
            inner.items.get_mut(key).ok_or_else(|| DescError::UnknownKey {
                key: key.to_string(),
                app_id: app_id.to_string(),
            })?;
        let layered = by_app.get_mut(app_id).ok_or_else(|| DescError::UnknownKey {
            key: key.to_string(),
            app_id: app_id.to_string(),
        })?;
        layered.set_layer(Layer::Override, patch);
        Ok(())
    }

    /// Remove a key's description entirely (all app buckets).
    pub fn del_key_desc(&self, key: &str) {
        self.inner.write().expect("description model lock poisoned").items.remove(key);
    }

    /// Remove every per-app description bucket belonging to `app_id`,
    /// across all keys (app-uninstall cleanup). Global buckets are
    /// untouched.
    pub fn purge_app(&self, app_id: &str) {
        let mut inner = self.inner.write().expect("description model lock poisoned");
        for by_app in inner.items.values_mut() {
            by_app.remove(app_id);
        }
    }

    /// Drop the `Main` layer edit for a key, reverting to whatever
    /// `Override`/`Default`/`FileCountry`/`Base` provides
    /// (`resetSystemSettingDesc`).
    ///
    /// # Errors
    ///
    /// Returns [`DescError::UnknownKey`] if no base description exists.
    pub fn reset_key_desc(&self, key: &str, app_id: &str) -> DescResult<()> {
        let mut inner = self.inner.write().expect("description model lock poisoned");
        let by_app =
            inner.items.get_mut(key).ok_or_else(|| DescError::UnknownKey {
                key: key.to_string(),
                app_id: app_id.to_string(),
            })?;
        let layered = by_app.get_mut(app_id).ok_or_else(|| DescError::UnknownKey {
            key: key.to_string(),
            app_id: app_id.to_string(),
        })?;
        layered.clear_layer(Layer::Main);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VType;
    use serde_json::json;

    fn sample_item(key: &str, category: &str, app_id: &str, dbtype: DbType) -> DescriptionItem {
        DescriptionItem {
            key: key.to_string(),
            category: category.to_string(),
            vtype: VType::Range { min: 0.0, max: 100.0, interval: 1.0 },
            dimension: Vec::new(),
            dbtype,
            volatile: false,
            value_check: true,
            strict_value_check: false,
            ui: json!({}),
            app_id: app_id.to_string(),
            country: None,
            condition: None,
        }
    }

    #[test]
    fn describe_returns_none_for_unknown_key() {
        let model = DescriptionModel::new();
        assert!(model.describe("missing", "").is_none());
    }

    #[test]
    fn global_key_visible_to_any_app() {
        let model = DescriptionModel::new();
        model.load_base(vec![sample_item("brightness", "picture", "", DbType::G)]);
        assert!(model.describe("brightness", "com.example.any").is_some());
    }

    #[test]
    fn per_app_key_hidden_from_other_apps() {
        let model = DescriptionModel::new();
        model.load_base(vec![sample_item("launchPoint", "system", "com.example.owner", DbType::P)]);
        assert!(model.describe("launchPoint", "com.example.owner").is_some());
        assert!(model.describe("launchPoint", "com.example.other").is_none());
    }

    #[test]
    fn add_key_desc_layers_on_top_of_base() {
        let model = DescriptionModel::new();
        model.load_base(vec![sample_item("brightness", "picture", "", DbType::G)]);

        let mut patch = sample_item("brightness", "picture", "", DbType::G);
        patch.volatile = true;
        model.add_key_desc("brightness", "", patch).unwrap();

        assert_eq!(model.is_volatile("brightness", ""), Some(true));
    }

    #[test]
    fn reset_key_desc_reverts_main_layer() {
        let model = DescriptionModel::new();
        model.load_base(vec![sample_item("brightness", "picture", "", DbType::G)]);
        let mut patch = sample_item("brightness", "picture", "", DbType::G);
        patch.volatile = true;
        model.add_key_desc("brightness", "", patch).unwrap();
        model.reset_key_desc("brightness", "").unwrap();

        assert_eq!(model.is_volatile("brightness", ""), Some(false));
    }

    #[test]
    fn purge_app_removes_only_that_apps_bucket() {
        let model = DescriptionModel::new();
        model.load_base(vec![
            sample_item("launchPoint", "system", "com.example.owner", DbType::P),
            sample_item("brightness", "picture", "", DbType::G),
        ]);
        model.purge_app("com.example.owner");

        assert!(model.describe("launchPoint", "com.example.owner").is_none());
        assert!(model.describe("brightness", "com.example.any").is_some());
    }

    #[test]
    fn e_type_per_app_bucket_falls_back_to_global_when_not_on_exception_list() {
        let model = DescriptionModel::new();
        model.load_base(vec![
            sample_item("arcPerApp", "picture", "", DbType::E),
            sample_item("arcPerApp", "picture", "com.bdp", DbType::E),
        ]);
        model.set_exception_apps(HashSet::from(["com.bdp".to_string()]));

        assert!(model.describe("arcPerApp", "com.bdp").is_some());
        let fallback = model.describe("arcPerApp", "com.other").expect("falls back to global");
        assert!(fallback.is_global());
    }

    #[test]
    fn split_category_dim_drops_wildcard_positions() {
        let model = DescriptionModel::new();
        let mut brightness = sample_item("brightness", "picture", "", DbType::G);
        brightness.dimension = vec!["input".to_string(), "pictureMode".to_string()];
        model.load_base(vec![brightness]);

        let (category, coord) = model.split_category_dim("picture$hdmi1.x");
        assert_eq!(category, "picture");
        assert_eq!(coord.len(), 1);
        assert_eq!(coord.get("input"), Some(&"hdmi1".to_string()));
    }

    #[test]
    fn category_key_list_map_resolves_a_single_partition() {
        let model = DescriptionModel::new();
        let mut brightness = sample_item("brightness", "picture", "", DbType::G);
        brightness.dimension = vec!["input".to_string()];
        model.load_base(vec![brightness]);

        let mut coord = DimensionCoord::new();
        coord.insert("input".to_string(), "hdmi1".to_string());
        let map = model.category_key_list_map("picture", &coord, &[]);

        assert_eq!(map.len(), 1);
        assert!(map.contains_key("picture$hdmi1"));
        assert!(map["picture$hdmi1"].contains("brightness"));
    }

    #[test]
    fn category_key_list_map_all_enumerates_declared_dimension_values() {
        let model = DescriptionModel::new();
        let mut brightness = sample_item("brightness", "picture", "", DbType::G);
        brightness.dimension = vec!["input".to_string()];
        let input_dim = DescriptionItem {
            vtype: VType::Array { array: vec![json!("dtv"), json!("hdmi1")] },
            ..sample_item("input", "dimensionInfo", "", DbType::G)
        };
        model.load_base(vec![brightness, input_dim]);

        let map = model.category_key_list_map_all("picture", &[]);

        assert_eq!(map.len(), 2);
        assert!(map.contains_key("picture$dtv"));
        assert!(map.contains_key("picture$hdmi1"));
        assert!(map["picture$dtv"].contains("brightness"));
    }

    #[test]
    fn split_keys_into_global_or_per_app_partitions_correctly() {
        let model = DescriptionModel::new();
        model.load_base(vec![
            sample_item("brightness", "picture", "", DbType::G),
            sample_item("launchPoint", "system", "com.example.owner", DbType::P),
        ]);

        let (global, per_app) = model.split_keys_into_global_or_per_app(
            &["brightness".to_string(), "launchPoint".to_string()],
            "com.example.owner",
        );
        assert_eq!(global, vec!["brightness".to_string()]);
        assert_eq!(per_app, vec!["launchPoint".to_string()]);
    }

    #[test]
    fn load_base_for_country_layers_matching_variant_over_unscoped_base() {
        let model = DescriptionModel::new();
        let mut unscoped = sample_item("clockFormat", "locale", "", DbType::G);
        unscoped.ui = json!({"value": "12h"});
        let mut fr_variant = sample_item("clockFormat", "locale", "", DbType::G);
        fr_variant.country = Some("FR,BE".to_string());
        fr_variant.ui = json!({"value": "24h"});

        model.load_base_for_country(vec![unscoped, fr_variant], "FR");

        assert_eq!(model.describe("clockFormat", "").unwrap().ui, json!({"value": "24h"}));
    }

    #[test]
    fn load_base_for_country_ignores_non_matching_variant() {
        let model = DescriptionModel::new();
        let mut unscoped = sample_item("clockFormat", "locale", "", DbType::G);
        unscoped.ui = json!({"value": "12h"});
        let mut fr_variant = sample_item("clockFormat", "locale", "", DbType::G);
        fr_variant.country = Some("FR,BE".to_string());
        fr_variant.ui = json!({"value": "24h"});

        model.load_base_for_country(vec![unscoped, fr_variant], "US");

        assert_eq!(model.describe("clockFormat", "").unwrap().ui, json!({"value": "12h"}));
    }

    #[test]
    fn load_base_for_country_does_not_clobber_duplicate_key_entries() {
        // Regression test: before grouping by (key, app_id), a country
        // variant sharing a key with its unscoped sibling would silently
        // replace it instead of layering on top.
        let model = DescriptionModel::new();
        let first = sample_item("clockFormat", "locale", "", DbType::G);
        let duplicate = sample_item("clockFormat", "locale", "", DbType::G);
        model.load_base_for_country(vec![first, duplicate], "none");

        assert!(model.describe("clockFormat", "").is_some());
    }

    #[test]
    fn apply_default_overrides_layers_on_top_of_base_without_replacing_it() {
        let model = DescriptionModel::new();
        model.load_base(vec![sample_item("brightness", "picture", "", DbType::G)]);

        let mut patch = sample_item("brightness", "picture", "", DbType::G);
        patch.volatile = true;
        model.apply_default_overrides(vec![patch], "none");

        assert_eq!(model.is_volatile("brightness", ""), Some(true));
        // Category info from the base load survives the override.
        assert_eq!(model.category_of("brightness", ""), Some("picture".to_string()));
    }
}
