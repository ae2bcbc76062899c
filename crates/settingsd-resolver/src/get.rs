//! Get handler.

use crate::merge::{merge_layered_records, MergeInputs};
use crate::volatile::VolatileMap;
use crate::ResolverResult;
use serde_json::{Map, Value};
use settingsd_db::{BatchOperation, DocumentDb, Kind, Query};
use settingsd_desc::DescriptionModel;

/// A `getSystemSettings`-style request.
pub struct GetRequest<'a> {
    /// Category-Dim string (or bare category for non-dimensioned keys) to
    /// read.
    pub category: &'a str,
    /// Explicit key set to read, or `None` to read the whole category.
    pub keys: Option<Vec<String>>,
    /// The requesting app, or the empty string for a global request.
    pub app_id: &'a str,
}

/// Reply to a get request.
#[derive(Debug, Default)]
pub struct GetReply {
    /// Whether the read succeeded.
    pub return_value: bool,
    /// Category echoed back.
    pub category: String,
    /// App id echoed back.
    pub app_id: String,
    /// The resolved `{ key -> value }` mapping.
    pub settings: Map<String, Value>,
}

/// Resolve a get request by querying `main` and `default` (global and,
/// when per-app, per-app) and overlaying volatile values.
///
/// # Errors
///
/// Propagates any [`settingsd_db::DbError`] the store returns.
pub async fn handle_get(
    db: &dyn DocumentDb,
    desc: &DescriptionModel,
    volatile: &VolatileMap,
    request: GetRequest<'_>,
) -> ResolverResult<GetReply> {
    let keys = request
        .keys
        .clone()
        .unwrap_or_else(|| desc.category_key_list_all(request.category));

    let mut operations = vec![BatchOperation::Find(Query {
        kind: Some(Kind::Main),
        category: Some(request.category.to_string()),
        app_id: Some(String::new()),
        keys: Some(keys.clone()),
        ..Query::default()
    })];
    operations.push(BatchOperation::Find(Query {
        kind: Some(Kind::Default),
        category: Some(request.category.to_string()),
        app_id: Some(String::new()),
        keys: Some(keys.clone()),
        ..Query::default()
    }));
    if !request.app_id.is_empty() {
        operations.push(BatchOperation::Find(Query {
            kind: Some(Kind::Main),
            category: Some(request.category.to_string()),
            app_id: Some(request.app_id.to_string()),
            keys: Some(keys.clone()),
            ..Query::default()
        }));
        operations.push(BatchOperation::Find(Query {
            kind: Some(Kind::Default),
            category: Some(request.category.to_string()),
            app_id: Some(request.app_id.to_string()),
            keys: Some(keys.clone()),
            ..Query::default()
        }));
    }

    let batch_reply = db.batch(operations).await?;
    let records = batch_reply
        .responses
        .into_iter()
        .filter_map(|response| response.results)
        .flatten()
        .collect();

    let mut settings = merge_layered_records(
        desc,
        MergeInputs {
            records,
            app_id: request.app_id,
            filter_mixed: false,
            requested_category_dim: Some(request.category),
        },
    );

    for (key, value) in volatile.read(request.category, request.app_id) {
        settings.insert(key, value);
    }

    Ok(GetReply {
        return_value: true,
        category: request.category.to_string(),
        app_id: request.app_id.to_string(),
        settings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use settingsd_db::SettingsRecord;
    use settingsd_desc::{ArrayExtItem, DbType, DescriptionItem, VType};
    use settingsd_test_support::InMemoryDb;

    fn seed_desc() -> DescriptionModel {
        let desc = DescriptionModel::new();
        desc.load_base(vec![DescriptionItem {
            key: "brightness".into(),
            category: "picture".into(),
            vtype: VType::ArrayExt { items: vec![ArrayExtItem { value: json!(70), active: true, visible: true }] },
            dimension: Vec::new(),
            dbtype: DbType::G,
            volatile: false,
            value_check: true,
            strict_value_check: false,
            ui: json!({}),
            app_id: String::new(),
            country: None,
            condition: None,
        }]);
        desc
    }

    #[tokio::test]
    async fn get_merges_main_over_default_and_overlays_volatile() {
        let db = InMemoryDb::with_records(vec![
            SettingsRecord {
                kind: Kind::Default,
                id: None,
                category: "picture".into(),
                app_id: String::new(),
                value: Map::from_iter([("brightness".to_string(), json!(50))]),
                country: None,
                volatile: None,
                condition: None,
            },
            SettingsRecord {
                kind: Kind::Main,
                id: None,
                category: "picture".into(),
                app_id: String::new(),
                value: Map::from_iter([("brightness".to_string(), json!(80))]),
                country: None,
                volatile: None,
                condition: None,
            },
        ]);
        let desc = seed_desc();
        let volatile = VolatileMap::new();
        volatile.write("picture", "", &Map::from_iter([("nightMode".to_string(), json!(true))]));

        let reply = handle_get(
            &db,
            &desc,
            &volatile,
            GetRequest { category: "picture", keys: None, app_id: "" },
        )
        .await
        .unwrap();

        assert_eq!(reply.settings.get("brightness"), Some(&json!(80)));
        assert_eq!(reply.settings.get("nightMode"), Some(&json!(true)));
    }
}
