//! Layered settings-record merge for the read path.

use serde_json::{Map, Value};
use settingsd_db::{Kind, SettingsRecord};
use settingsd_desc::{DbType, DescriptionModel};

/// Rank records by kind for merge precedence: `file` and `default` sit at
/// the same base precedence (a `default`-kind record is the country-variant
/// override of the read-only `file` default), `main` wins over both as the
/// user's own edit, and `volatile` always wins as the most current
/// in-memory state.
fn kind_rank(kind: Kind) -> u8 {
    match kind {
        Kind::File | Kind::Default => 0,
        Kind::Main => 1,
        Kind::Volatile => 2,
    }
}

/// Inputs to [`merge_layered_records`].
pub struct MergeInputs<'a> {
    /// Records drawn from one or more kinds and partitions, in any order.
    pub records: Vec<SettingsRecord>,
    /// The app on whose behalf this merge is being computed.
    pub app_id: &'a str,
    /// When set, drop `M` keys whose per-app value is identical to the
    /// global one, so subscription messages about a global change don't
    /// also fire a redundant per-app notification.
    pub filter_mixed: bool,
    /// When set, the caller's requested Category-Dim partition string;
    /// per-app records whose `category` differs are discarded.
    pub requested_category_dim: Option<&'a str>,
}

/// Compose the effective `{ key -> value }` mapping from layered settings
/// records, applying dbtype-specific per-app/global selection rules.
#[must_use]
pub fn merge_layered_records(desc: &DescriptionModel, inputs: MergeInputs<'_>) -> Map<String, Value> {
    let MergeInputs { mut records, app_id, filter_mixed, requested_category_dim } = inputs;

    if let Some(requested) = requested_category_dim {
        records.retain(|record| record.is_global() || record.category == requested);
    }

    records.sort_by_key(|record| kind_rank(record.kind));

    // key -> (global value, per-app value), each overwritten in ascending
    // kind precedence as we walk the sorted records.
    let mut global: Map<String, Value> = Map::new();
    let mut per_app: Map<String, Value> = Map::new();

    for record in &records {
        let target = if record.is_global() { &mut global } else { &mut per_app };
        for (key, value) in &record.value {
            target.insert(key.clone(), value.clone());
        }
    }

    let mut effective = Map::new();
    let mut keys: Vec<&String> = global.keys().chain(per_app.keys()).collect();
    keys.sort_unstable();
    keys.dedup();

    for key in keys {
        let dbtype = desc.db_type_of(key, app_id);
        let global_value = global.get(key);
        let per_app_value = per_app.get(key);

        let resolved = match dbtype {
            Some(DbType::G) => global_value.cloned(),
            Some(DbType::P) => per_app_value.or(global_value).cloned(),
            Some(DbType::M) => {
                if filter_mixed && per_app_value.is_some() && per_app_value == global_value {
                    None
                } else {
                    per_app_value.or(global_value).cloned()
                }
            }
            Some(DbType::E) => per_app_value.or(global_value).cloned(),
            None => per_app_value.or(global_value).cloned(),
        };

        if let Some(value) = resolved {
            effective.insert(key.clone(), value);
        }
    }

    effective
}
