//! Set handler.
//!
//! Covers a single Category-Dim partition per call. A `setAll` request is
//! expanded by the caller into one [`handle_set`] call per partition
//! produced by `getCategoryKeyListMapAll`; the task engine owns that
//! fan-out so this handler stays oblivious to dimension enumeration.

use crate::value_check::check_value;
use serde_json::{Map, Value};
use settingsd_db::{DocumentDb, Kind, Query, SettingsRecord};
use settingsd_desc::{DbType, DescriptionModel};
use settingsd_db::DbResult;
use std::collections::HashMap;

/// A `setSystemSettings`/`setSystemSettingFactoryValue`-style request.
pub struct SetRequest<'a> {
    /// Category-Dim partition to write into.
    pub category: &'a str,
    /// The requesting app, or the empty string for a global write.
    pub app_id: &'a str,
    /// The key/value pairs to write.
    pub values: Map<String, Value>,
    /// `main` for `setSystemSettings`, `default` for
    /// `setSystemSettingFactoryValue`.
    pub target_kind: Kind,
}

/// Reply to a set request.
#[derive(Debug, Default)]
pub struct SetReply {
    /// `true` iff every requested key was written without error.
    pub return_value: bool,
    /// Category echoed back.
    pub category: String,
    /// App id echoed back.
    pub app_id: String,
    /// Per-key failure reasons; keys that succeeded are absent.
    pub errors: HashMap<String, String>,
    /// Keys whose write succeeded (volatile or not) and that subscribers
    /// should be notified about.
    pub to_be_notified: Vec<String>,
}

/// Classify and write `request.values`, merging into existing rows first
/// and falling back to `put` for partitions that don't exist yet.
///
/// # Errors
///
/// Propagates [`settingsd_db::DbError`] from the underlying store; per-key
/// validation failures are reported in [`SetReply::errors`] instead of as
/// an `Err`.
pub async fn handle_set(
    db: &dyn DocumentDb,
    desc: &DescriptionModel,
    volatile: &crate::volatile::VolatileMap,
    request: SetRequest<'_>,
) -> DbResult<SetReply> {
    let mut errors = HashMap::new();
    let mut non_volatile = Map::new();
    let mut volatile_success = Map::new();

    for (key, value) in request.values {
        let Some(item) = desc.describe(&key, request.app_id) else {
            errors.insert(key, "unknown key".to_string());
            continue;
        };
        if matches!(item.dbtype, DbType::P | DbType::E) && request.app_id.is_empty() {
            errors.insert(key, "per-app key requires an app id".to_string());
            continue;
        }
        if !check_value(&item, &value) {
            errors.insert(key, "value failed value-check".to_string());
            continue;
        }
        if item.volatile {
            volatile_success.insert(key, value);
        } else {
            non_volatile.insert(key, value);
        }
    }

    let mut to_be_notified = Vec::new();

    if !non_volatile.is_empty() {
        let query = Query {
            kind: Some(request.target_kind),
            category: Some(request.category.to_string()),
            app_id: Some(request.app_id.to_string()),
            ..Query::default()
        };
        let merged = db.merge(query, Value::Object(non_volatile.clone())).await?;
        if merged == 0 {
            db.put(vec![SettingsRecord {
                kind: request.target_kind,
                id: None,
                category: request.category.to_string(),
                app_id: request.app_id.to_string(),
                value: non_volatile.clone(),
                country: None,
                volatile: None,
                condition: None,
            }])
            .await?;
        }
        to_be_notified.extend(non_volatile.keys().cloned());
    }

    if !volatile_success.is_empty() {
        volatile.write(request.category, request.app_id, &volatile_success);
        to_be_notified.extend(volatile_success.keys().cloned());
    }

    Ok(SetReply {
        return_value: errors.is_empty(),
        category: request.category.to_string(),
        app_id: request.app_id.to_string(),
        errors,
        to_be_notified,
    })
}
