//! Postgres-backed implementation of [`DocumentDb`].
//!
//! A single `records` table holds every kind/category/app-id partition as a
//! JSONB blob, and queries are built as parameterized SQL rather than
//! through a query DSL. Pagination cursors are plain offsets encoded as
//! decimal strings; this is an internal implementation detail the core
//! never inspects.

use crate::contract::{
    BatchOperation, BatchOperationReply, BatchReply, DocumentDb, FindReply, Query,
};
use crate::error::{DbError, DbResult};
use crate::find_chain::DEFAULT_PAGE_SIZE;
use crate::model::{Kind, SettingsRecord};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row, types::Json};
use tracing::instrument;

/// Document-store adapter backed by a `PostgreSQL` connection pool.
#[derive(Clone)]
pub struct PostgresDb {
    pool: PgPool,
}

impl PostgresDb {
    /// Wrap an existing pool. Callers are expected to have already applied
    /// migrations (the `settingsd_records` table and its indices).
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool, e.g. to run migrations at startup.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn kind_str(kind: Kind) -> &'static str {
        kind.as_db_str()
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> DbResult<SettingsRecord> {
    let kind_str: String = row.try_get("kind").map_err(sql_err("row_to_record"))?;
    let kind = match kind_str.as_str() {
        "file" => Kind::File,
        "default" => Kind::Default,
        "main" => Kind::Main,
        "volatile" => Kind::Volatile,
        other => {
            return Err(DbError::ParseError {
                operation: "row_to_record",
                detail: format!("unknown stored kind {other}"),
            });
        }
    };
    let id: uuid::Uuid = row.try_get("id").map_err(sql_err("row_to_record"))?;
    let category: String = row.try_get("category").map_err(sql_err("row_to_record"))?;
    let app_id: String = row.try_get("app_id").map_err(sql_err("row_to_record"))?;
    let value: Json<Value> = row.try_get("value").map_err(sql_err("row_to_record"))?;
    let country: Option<String> = row.try_get("country").map_err(sql_err("row_to_record"))?;
    let condition: Option<Json<Value>> =
        row.try_get("condition").map_err(sql_err("row_to_record"))?;

    let Value::Object(map) = value.0 else {
        return Err(DbError::ParseError {
            operation: "row_to_record",
            detail: "value column was not a JSON object".to_string(),
        });
    };

    Ok(SettingsRecord {
        kind,
        id: Some(id.to_string()),
        category,
        app_id,
        value: map,
        country,
        volatile: None,
        condition: condition.map(|c| c.0),
    })
}

fn sql_err(operation: &'static str) -> impl Fn(sqlx::Error) -> DbError {
    move |source| DbError::OperationFailed {
        operation,
        source: Some(source),
    }
}

#[async_trait]
impl DocumentDb for PostgresDb {
    #[instrument(skip(self))]
    async fn find(&self, query: Query) -> DbResult<FindReply> {
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(DEFAULT_PAGE_SIZE);
        let offset: i64 = match &query.page {
            Some(token) => token
                .parse()
                .map_err(|_| DbError::CursorExpired)?,
            None => 0,
        };

        let kind_str = query.kind.map(Self::kind_str);
        let category = query.category_prefix.is_none().then(|| query.category.clone()).flatten();
        let rows = sqlx::query(
            r"
            SELECT id, kind, category, app_id, value, country, condition
            FROM settingsd_records
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::text IS NULL OR category = $2)
              AND ($3::text IS NULL OR app_id = $3)
              AND ($6::text IS NULL OR category = $6 OR category LIKE $6 || '$%')
            ORDER BY id
            LIMIT $4 OFFSET $5
            ",
        )
        .bind(kind_str)
        .bind(&category)
        .bind(&query.app_id)
        .bind(i64::from(limit) + 1)
        .bind(offset)
        .bind(&query.category_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(sql_err("find"))?;

        let has_more = rows.len() > limit as usize;
        let mut results = Vec::with_capacity(limit as usize);
        for row in rows.iter().take(limit as usize) {
            results.push(row_to_record(row)?);
        }
        if let Some(keys) = &query.keys {
            results.retain(|record| keys.iter().any(|k| record.value.contains_key(k)));
        }

        let next = has_more.then(|| (offset + i64::from(limit)).to_string());
        let count = Some(results.len() as u64);
        Ok(FindReply {
            return_value: true,
            results,
            next,
            count,
        })
    }

    #[instrument(skip(self, operations))]
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

    #[instrument(skip(self, props))]
    async fn merge(&self, query: Query, props: Value) -> DbResult<u64> {
        let kind_str = query
            .kind
            .map(Self::kind_str)
            .ok_or(DbError::ParseError {
                operation: "merge",
                detail: "merge requires a kind".to_string(),
            })?;
        let category = query.category.ok_or(DbError::ParseError {
            operation: "merge",
            detail: "merge requires a category".to_string(),
        })?;
        let app_id = query.app_id.unwrap_or_default();

        let result = sqlx::query(
            r"
            UPDATE settingsd_records
            SET value = value || $1::jsonb, updated_at = now()
            WHERE kind = $2 AND category = $3 AND app_id = $4
            ",
        )
        .bind(Json(props))
        .bind(kind_str)
        .bind(&category)
        .bind(&app_id)
        .execute(&self.pool)
        .await
        .map_err(sql_err("merge"))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, objects))]
    async fn put(&self, objects: Vec<SettingsRecord>) -> DbResult<()> {
        let mut tx = self.pool.begin().await.map_err(sql_err("put"))?;
        for record in objects {
            let kind_str = Self::kind_str(record.kind);
            sqlx::query(
                r"
                INSERT INTO settingsd_records (kind, category, app_id, value, country, condition, created_at, updated_at)
                VALUES ($1, $2, $3, $4::jsonb, $5, $6::jsonb, now(), now())
                ON CONFLICT (kind, category, app_id)
                DO UPDATE SET value = EXCLUDED.value, country = EXCLUDED.country,
                    condition = EXCLUDED.condition, updated_at = now()
                ",
            )
            .bind(kind_str)
            .bind(&record.category)
            .bind(&record.app_id)
            .bind(Json(Value::Object(record.value)))
            .bind(&record.country)
            .bind(record.condition.map(Json))
            .execute(&mut *tx)
            .await
            .map_err(sql_err("put"))?;
        }
        tx.commit().await.map_err(sql_err("put"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn del(&self, query: Query, ids: Vec<String>) -> DbResult<u64> {
        let result = if ids.is_empty() {
            let kind_str = query.kind.map(Self::kind_str);
            let category = query.category_prefix.is_none().then(|| query.category.clone()).flatten();
            sqlx::query(
                r"
                DELETE FROM settingsd_records
                WHERE ($1::text IS NULL OR kind = $1)
                  AND ($2::text IS NULL OR category = $2)
                  AND ($3::text IS NULL OR app_id = $3)
                  AND ($4::text IS NULL OR category = $4 OR category LIKE $4 || '$%')
                ",
            )
            .bind(kind_str)
            .bind(&category)
            .bind(&query.app_id)
            .bind(&query.category_prefix)
            .execute(&self.pool)
            .await
            .map_err(sql_err("del"))?
        } else {
            let uuids: Vec<uuid::Uuid> = ids
                .iter()
                .map(|id| {
                    id.parse().map_err(|_| DbError::ParseError {
                        operation: "del",
                        detail: format!("invalid row id {id}"),
                    })
                })
                .collect::<DbResult<_>>()?;
            sqlx::query("DELETE FROM settingsd_records WHERE id = ANY($1)")
                .bind(&uuids)
                .execute(&self.pool)
                .await
                .map_err(sql_err("del"))?
        };
        Ok(result.rows_affected())
    }
}
