//! Delete and reset handlers.

use crate::error::{ResolverError, ResolverResult};
use crate::volatile::VolatileMap;
use settingsd_db::find_chain::collect_all;
use settingsd_db::{DocumentDb, Kind, Query};

/// Remove `keys` from every row in `kind`/`category`/`app_id`, preserving
/// sibling keys stored in the same row: the row is found, the requested
/// keys are stripped from its value map, and the remainder is put back (or
/// the row is deleted outright once its value map is empty).
///
/// Returns the number of keys actually removed across all matching rows.
async fn remove_keys_preserving_siblings(
    db: &dyn DocumentDb,
    kind: Kind,
    category: &str,
    app_id: &str,
    keys: &[String],
) -> ResolverResult<u64> {
    let reply = db
        .find(Query {
            kind: Some(kind),
            category: Some(category.to_string()),
            app_id: Some(app_id.to_string()),
            ..Query::default()
        })
        .await?;

    let mut removed = 0u64;
    let mut to_delete = Vec::new();
    let mut to_put = Vec::new();
    for mut record in reply.results {
        let mut touched = false;
        for key in keys {
            if record.value.remove(key).is_some() {
                removed += 1;
                touched = true;
            }
        }
        if !touched {
            continue;
        }
        if record.value.is_empty() {
            if let Some(id) = record.id.clone() {
                to_delete.push(id);
            }
        } else {
            to_put.push(record);
        }
    }

    if !to_put.is_empty() {
        db.put(to_put).await?;
    }
    if !to_delete.is_empty() {
        db.del(Query::default(), to_delete).await?;
    }
    Ok(removed)
}

/// A `deleteSystemSettings` request.
pub struct DeleteRequest<'a> {
    /// Category-Dim partition to delete from.
    pub category: &'a str,
    /// App id, or the empty string for a global delete.
    pub app_id: &'a str,
    /// Keys to remove.
    pub keys: Vec<String>,
    /// Whether to also purge the `default` kind, not just `main`.
    pub also_default: bool,
}

/// Remove `request.keys` from `main` (and optionally `default`) plus any
/// matching volatile entries.
///
/// # Errors
///
/// Returns [`ResolverError::NothingFound`] if none of the requested keys
/// existed in any targeted kind.
pub async fn handle_delete(db: &dyn DocumentDb, volatile: &VolatileMap, request: DeleteRequest<'_>) -> ResolverResult<u64> {
    let mut removed =
        remove_keys_preserving_siblings(db, Kind::Main, request.category, request.app_id, &request.keys).await?;

    if request.also_default {
        removed +=
            remove_keys_preserving_siblings(db, Kind::Default, request.category, request.app_id, &request.keys)
                .await?;
    }

    volatile.purge_keys(request.category, request.app_id, &request.keys);

    if removed == 0 {
        return Err(ResolverError::NothingFound);
    }
    Ok(removed)
}

/// A `resetSystemSettings` request.
pub struct ResetRequest<'a> {
    /// Category-Dim partition, or a bare category prefix when `reset_all`.
    pub category: &'a str,
    /// App id, or the empty string for a global reset.
    pub app_id: &'a str,
    /// Keys to reset; ignored when `reset_all` is set.
    pub keys: Vec<String>,
    /// When set, reset every Category-Dim partition under `category`
    /// rather than a single partition.
    pub reset_all: bool,
}

/// Outcome of a reset: the (category, app_id) partitions that were reset,
/// so the caller can re-notify with each partition's fresh default values.
#[derive(Debug, Clone)]
pub struct ResetOutcome {
    /// Category-Dim string of the reset partition.
    pub category: String,
    /// App id the partition belonged to.
    pub app_id: String,
}

/// Remove keys from `main` so subsequent reads fall back to `default`,
/// purging matching volatile entries.
///
/// # Errors
///
/// Propagates [`settingsd_db::DbError`] from the underlying store.
pub async fn handle_reset(db: &dyn DocumentDb, volatile: &VolatileMap, request: ResetRequest<'_>) -> ResolverResult<Vec<ResetOutcome>> {
    if request.reset_all {
        let records = collect_all(
            db,
            Query {
                kind: Some(Kind::Main),
                category_prefix: Some(request.category.to_string()),
                ..Query::default()
            },
        )
        .await?;

        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            db.del(
                Query {
                    kind: Some(Kind::Main),
                    category: Some(record.category.clone()),
                    app_id: Some(record.app_id.clone()),
                    ..Query::default()
                },
                Vec::new(),
            )
            .await?;
            volatile.purge_partition(&record.category, &record.app_id);
            outcomes.push(ResetOutcome { category: record.category, app_id: record.app_id });
        }
        Ok(outcomes)
    } else {
        remove_keys_preserving_siblings(db, Kind::Main, request.category, request.app_id, &request.keys).await?;
        volatile.purge_keys(request.category, request.app_id, &request.keys);
        Ok(vec![ResetOutcome { category: request.category.to_string(), app_id: request.app_id.to_string() }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use settingsd_db::SettingsRecord;
    use settingsd_test_support::InMemoryDb;

    fn record(category: &str, app_id: &str) -> SettingsRecord {
        SettingsRecord {
            kind: Kind::Main,
            id: None,
            category: category.to_string(),
            app_id: app_id.to_string(),
            value: Map::from_iter([("brightness".to_string(), json!(50))]),
            country: None,
            volatile: None,
            condition: None,
        }
    }

    #[tokio::test]
    async fn delete_reports_nothing_found_when_no_rows_matched() {
        let db = InMemoryDb::new();
        let volatile = VolatileMap::new();
        let err = handle_delete(
            &db,
            &volatile,
            DeleteRequest { category: "picture", app_id: "", keys: vec!["brightness".to_string()], also_default: false },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolverError::NothingFound));
    }

    #[tokio::test]
    async fn delete_removes_matching_rows_and_volatile_entries() {
        let db = InMemoryDb::with_records(vec![record("picture", "")]);
        let volatile = VolatileMap::new();
        volatile.write("picture", "", &Map::from_iter([("brightness".to_string(), json!(1))]));

        let removed = handle_delete(
            &db,
            &volatile,
            DeleteRequest { category: "picture", app_id: "", keys: vec!["brightness".to_string()], also_default: false },
        )
        .await
        .unwrap();
        assert_eq!(removed, 1);
        assert!(volatile.read("picture", "").is_empty());
    }

    #[tokio::test]
    async fn delete_preserves_sibling_keys_in_the_same_row() {
        let mut row = record("picture", "");
        row.value.insert("contrast".to_string(), json!(60));
        let db = InMemoryDb::with_records(vec![row]);
        let volatile = VolatileMap::new();

        let removed = handle_delete(
            &db,
            &volatile,
            DeleteRequest { category: "picture", app_id: "", keys: vec!["brightness".to_string()], also_default: false },
        )
        .await
        .unwrap();
        assert_eq!(removed, 1);

        let remaining = db
            .find(Query { kind: Some(Kind::Main), category: Some("picture".into()), ..Query::default() })
            .await
            .unwrap();
        assert_eq!(remaining.results.len(), 1);
        assert_eq!(remaining.results[0].value.get("brightness"), None);
        assert_eq!(remaining.results[0].value.get("contrast"), Some(&json!(60)));
    }

    #[tokio::test]
    async fn reset_all_clears_every_partition_under_the_category() {
        let db = InMemoryDb::with_records(vec![
            record("picture$dtv", ""),
            record("picture$hdmi1", ""),
        ]);
        let volatile = VolatileMap::new();

        let outcomes = handle_reset(
            &db,
            &volatile,
            ResetRequest { category: "picture", app_id: "", keys: Vec::new(), reset_all: true },
        )
        .await
        .unwrap();
        assert_eq!(outcomes.len(), 2);

        let remaining = db
            .find(Query { kind: Some(Kind::Main), category: None, ..Query::default() })
            .await
            .unwrap();
        assert!(remaining.results.is_empty());
    }
}
