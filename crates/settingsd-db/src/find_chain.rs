//! `FindChain`: auto-paginating wrapper over [`DocumentDb::find`].
//!
//! The store caps result counts at 500 per call. `FindChain` issues the
//! initial `find`, inspects the reply for a `next` cursor, and keeps
//! reissuing with successive page tokens until the cursor is exhausted,
//! accumulating every page before handing the caller one aggregated list.

use crate::contract::{DocumentDb, Query};
use crate::error::DbResult;
use crate::model::SettingsRecord;
use tracing::debug;

/// Default page size requested per `find`, matching the store's cap.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Drive `query` through as many pages as `db` reports, returning every
/// matched record.
///
/// # Errors
///
/// Returns an error as soon as any page's `find` call fails; partial pages
/// already collected are discarded, matching the "no local retry" error
/// policy.
pub async fn collect_all(db: &dyn DocumentDb, mut query: Query) -> DbResult<Vec<SettingsRecord>> {
    query.limit.get_or_insert(DEFAULT_PAGE_SIZE);
    let mut collected = Vec::new();
    let mut page = query.page.take();
    let mut pages_fetched = 0u32;

    loop {
        let mut this_query = query.clone();
        this_query.page = page.take();
        let reply = db.find(this_query).await?;
        pages_fetched += 1;
        collected.extend(reply.results);

        match reply.next {
            Some(next) => page = Some(next),
            None => break,
        }
    }

    debug!(pages = pages_fetched, rows = collected.len(), "find chain exhausted");
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{BatchOperation, BatchReply, FindReply};
    use crate::model::Kind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct PagedDb {
        pages: Mutex<Vec<FindReply>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocumentDb for PagedDb {
        async fn find(&self, _query: Query) -> DbResult<FindReply> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut pages = self.pages.lock().unwrap();
            Ok(if pages.is_empty() {
                FindReply::default()
            } else {
                pages.remove(0)
            })
        }

        async fn batch(&self, _operations: Vec<BatchOperation>) -> DbResult<BatchReply> {
            unimplemented!("not exercised by find_chain tests")
        }

        async fn merge(&self, _query: Query, _props: serde_json::Value) -> DbResult<u64> {
            unimplemented!("not exercised by find_chain tests")
        }

        async fn put(&self, _objects: Vec<SettingsRecord>) -> DbResult<()> {
            unimplemented!("not exercised by find_chain tests")
        }

        async fn del(&self, _query: Query, _ids: Vec<String>) -> DbResult<u64> {
            unimplemented!("not exercised by find_chain tests")
        }
    }

    fn record(app_id: &str) -> SettingsRecord {
        SettingsRecord {
            kind: Kind::Main,
            id: None,
            category: "picture".into(),
            app_id: app_id.into(),
            value: serde_json::Map::new(),
            country: None,
            volatile: None,
            condition: None,
        }
    }

    #[tokio::test]
    async fn reissues_until_cursor_exhausted() {
        let db = PagedDb {
            pages: Mutex::new(vec![
                FindReply {
                    return_value: true,
                    results: vec![record("a")],
                    next: Some("cursor-1".into()),
                    count: Some(3),
                },
                FindReply {
                    return_value: true,
                    results: vec![record("b")],
                    next: Some("cursor-2".into()),
                    count: Some(3),
                },
                FindReply {
                    return_value: true,
                    results: vec![record("c")],
                    next: None,
                    count: Some(3),
                },
            ]),
            calls: AtomicUsize::new(0),
        };

        let all = collect_all(&db, Query::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(db.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_page_makes_one_call() {
        let db = PagedDb {
            pages: Mutex::new(vec![FindReply {
                return_value: true,
                results: vec![record("a")],
                next: None,
                count: Some(1),
            }]),
            calls: AtomicUsize::new(0),
        };

        let all = collect_all(&db, Query::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(db.calls.load(Ordering::SeqCst), 1);
    }
}
