//! A `Mutex<Vec<SettingsRecord>>`-backed [`DocumentDb`] double.

use async_trait::async_trait;
use serde_json::Value;
use settingsd_db::{
    BatchOperation, BatchOperationReply, BatchReply, DbError, DbResult, DocumentDb, FindReply,
    Kind, Query, SettingsRecord,
};
use std::sync::Mutex;

/// In-memory document store used by unit and integration tests.
#[derive(Default)]
pub struct InMemoryDb {
    records: Mutex<Vec<SettingsRecord>>,
}

impl InMemoryDb {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with pre-built records (e.g. default-kind fixtures).
    #[must_use]
    pub fn with_records(records: Vec<SettingsRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    fn matches(record: &SettingsRecord, query: &Query) -> bool {
        if let Some(kind) = query.kind {
            if record.kind != kind {
                return false;
            }
        }
        if let Some(prefix) = &query.category_prefix {
            let matches_prefix =
                &record.category == prefix || record.category.starts_with(&format!("{prefix}$"));
            if !matches_prefix {
                return false;
            }
        } else if let Some(category) = &query.category {
            if &record.category != category {
                return false;
            }
        }
        if let Some(app_id) = &query.app_id {
            if &record.app_id != app_id {
                return false;
            }
        }
        if let Some(keys) = &query.keys {
            if !keys.iter().any(|k| record.value.contains_key(k)) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl DocumentDb for InMemoryDb {
    async fn find(&self, query: Query) -> DbResult<FindReply> {
        let records = self.records.lock().expect("in-memory db mutex poisoned");
        let matched: Vec<SettingsRecord> = records
            .iter()
            .filter(|record| Self::matches(record, &query))
            .cloned()
            .collect();
        Ok(FindReply {
            return_value: true,
            count: Some(matched.len() as u64),
            results: matched,
            next: None,
        })
    }

    async fn batch(&self, operations: Vec<BatchOperation>) -> DbResult<BatchReply> {
        let mut responses = Vec::with_capacity(operations.len());
        for op in operations {
            let response = match op {
                BatchOperation::Find(query) => {
                    let reply = self.find(query).await?;
                    BatchOperationReply {
                        return_value: reply.return_value,
                        results: Some(reply.results),
                        count: reply.count,
                    }
                }
                BatchOperation::Merge { query, props } => {
                    let count = self.merge(query, props).await?;
                    BatchOperationReply {
                        return_value: true,
                        results: None,
                        count: Some(count),
                    }
                }
                BatchOperation::Put(objects) => {
                    self.put(objects).await?;
                    BatchOperationReply {
                        return_value: true,
                        results: None,
                        count: None,
                    }
                }
                BatchOperation::Del { query, ids } => {
                    let count = self.del(query, ids).await?;
                    BatchOperationReply {
                        return_value: true,
                        results: None,
                        count: Some(count),
                    }
                }
            };
            responses.push(response);
        }
        Ok(BatchReply {
            return_value: true,
            responses,
        })
    }

    async fn merge(&self, query: Query, props: Value) -> DbResult<u64> {
        let Value::Object(patch) = props else {
            return Err(DbError::ParseError {
                operation: "merge",
                detail: "props must be a JSON object".to_string(),
            });
        };
        let mut records = self.records.lock().expect("in-memory db mutex poisoned");
        let mut updated = 0u64;
        for record in records.iter_mut() {
            if Self::matches(record, &query) {
                for (k, v) in &patch {
                    record.value.insert(k.clone(), v.clone());
                }
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn put(&self, objects: Vec<SettingsRecord>) -> DbResult<()> {
        let mut records = self.records.lock().expect("in-memory db mutex poisoned");
        for mut object in objects {
            let existing = records.iter_mut().find(|r| {
                r.kind == object.kind && r.category == object.category && r.app_id == object.app_id
            });
            match existing {
                Some(slot) => {
                    slot.value = object.value;
                    slot.country = object.country;
                    slot.condition = object.condition;
                }
                None => {
                    object.id.get_or_insert_with(|| format!("mem-{}", records.len()));
                    records.push(object);
                }
            }
        }
        Ok(())
    }

    async fn del(&self, query: Query, ids: Vec<String>) -> DbResult<u64> {
        let mut records = self.records.lock().expect("in-memory db mutex poisoned");
        let before = records.len();
        if ids.is_empty() {
            records.retain(|record| !Self::matches(record, &query));
        } else {
            records.retain(|record| !record.id.as_ref().is_some_and(|id| ids.contains(id)));
        }
        Ok((before - records.len()) as u64)
    }
}

/// Build a simple `main`-kind record for `category` with the given values.
#[must_use]
pub fn main_record(category: &str, app_id: &str, pairs: &[(&str, Value)]) -> SettingsRecord {
    let mut value = serde_json::Map::new();
    for (k, v) in pairs {
        value.insert((*k).to_string(), v.clone());
    }
    SettingsRecord {
        kind: Kind::Main,
        id: None,
        category: category.to_string(),
        app_id: app_id.to_string(),
        value,
        country: None,
        volatile: None,
        condition: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_find_round_trips() {
        let db = InMemoryDb::new();
        db.put(vec![main_record("picture$dtv.vivid", "", &[("brightness", Value::from(70))])])
            .await
            .unwrap();

        let reply = db
            .find(Query {
                kind: Some(Kind::Main),
                category: Some("picture$dtv.vivid".into()),
                ..Query::default()
            })
            .await
            .unwrap();
        assert_eq!(reply.results.len(), 1);
        assert_eq!(reply.results[0].value.get("brightness"), Some(&Value::from(70)));
    }

    #[tokio::test]
    async fn merge_against_missing_row_reports_zero() {
        let db = InMemoryDb::new();
        let count = db
            .merge(
                Query {
                    kind: Some(Kind::Main),
                    category: Some("picture$dtv.vivid".into()),
                    app_id: Some(String::new()),
                    ..Query::default()
                },
                serde_json::json!({"brightness": 10}),
            )
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
