//! The document-database contract the core consumes.
//!
//! The database itself — its query language, replication, and storage
//! engine — is out of scope. This crate only pins down the shape of the
//! five operations the resolver and task engine issue against it.

use crate::error::DbResult;
use crate::model::SettingsRecord;
use async_trait::async_trait;
use serde_json::Value;

/// A query against one storage kind/partition. Opaque beyond what the core
/// needs to express: the kind, an optional category-dim filter, and an
/// optional app-id filter.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// `_kind` to search.
    pub kind: Option<crate::model::Kind>,
    /// Exact category-dim match, when present.
    pub category: Option<String>,
    /// Match every category-dim partition whose category component equals
    /// this bare category (e.g. `"picture"` matches `picture$dtv.vivid`
    /// and `picture$hdmi1.cinema`), when present. Takes precedence over
    /// `category` when both are set.
    pub category_prefix: Option<String>,
    /// Exact app id match, when present. Empty string means "global only".
    pub app_id: Option<String>,
    /// Explicit key set to restrict the match to, when present.
    pub keys: Option<Vec<String>>,
    /// Maximum rows per page; the store caps this at 500 regardless of what
    /// is requested.
    pub limit: Option<u32>,
    /// Opaque pagination cursor from a prior `find` reply.
    pub page: Option<String>,
}

/// Reply envelope for `find`.
#[derive(Debug, Clone, Default)]
pub struct FindReply {
    /// Whether the underlying call succeeded.
    pub return_value: bool,
    /// Matched records for this page.
    pub results: Vec<SettingsRecord>,
    /// Opaque cursor for the next page, present while more rows remain.
    pub next: Option<String>,
    /// Total matched row count, when the store reports one.
    pub count: Option<u64>,
}

/// A single operation inside a `batch` call.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// `find({query})`
    Find(Query),
    /// `merge({query, props})`
    Merge { query: Query, props: Value },
    /// `put({objects})`
    Put(Vec<SettingsRecord>),
    /// `del({query, purge: true})` or `del({ids, purge: true})`
    Del { query: Query, ids: Vec<String> },
}

/// Reply to a single operation inside a `batch` call.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationReply {
    /// Whether this individual operation succeeded.
    pub return_value: bool,
    /// Rows, for `find` operations.
    pub results: Option<Vec<SettingsRecord>>,
    /// Affected row count, for `merge`/`del` operations. `0` on `merge`
    /// means "no row matched".
    pub count: Option<u64>,
}

/// Reply envelope for `batch`.
#[derive(Debug, Clone, Default)]
pub struct BatchReply {
    /// Whether the overall batch call completed.
    pub return_value: bool,
    /// Per-operation replies, in the same order the operations were issued.
    pub responses: Vec<BatchOperationReply>,
}

/// Abstraction over the external document database.
///
/// Implementations must preserve operation order within a `batch` call and
/// must treat `merge` against a non-existent row as `count: 0` rather than
/// an error, so the resolver's merge-then-put fallback works.
#[async_trait]
pub trait DocumentDb: Send + Sync {
    /// `find({query})` → one page of results plus an optional cursor.
    async fn find(&self, query: Query) -> DbResult<FindReply>;

    /// `batch({operations})`, atomic per operation order.
    async fn batch(&self, operations: Vec<BatchOperation>) -> DbResult<BatchReply>;

    /// `merge({query, props})` → `count` rows updated; `0` means no match.
    async fn merge(&self, query: Query, props: Value) -> DbResult<u64>;

    /// `put({objects})`, atomic across the whole list.
    async fn put(&self, objects: Vec<SettingsRecord>) -> DbResult<()>;

    /// `del({query|ids, purge: true})` → rows removed.
    async fn del(&self, query: Query, ids: Vec<String>) -> DbResult<u64>;

    /// `mergePut({query, props})` — merge if a row matches, else create.
    async fn merge_put(&self, query: Query, props: Value) -> DbResult<()> {
        let updated = self.merge(query.clone(), props.clone()).await?;
        if updated == 0 {
            let Value::Object(map) = props else {
                return Err(crate::error::DbError::ParseError {
                    operation: "mergePut",
                    detail: "props must be a JSON object".to_string(),
                });
            };
            let record = SettingsRecord {
                kind: query.kind.unwrap_or(crate::model::Kind::Main),
                id: None,
                category: query.category.clone().unwrap_or_default(),
                app_id: query.app_id.clone().unwrap_or_default(),
                value: map,
                country: None,
                volatile: None,
                condition: None,
            };
            self.put(vec![record]).await?;
        }
        Ok(())
    }
}
