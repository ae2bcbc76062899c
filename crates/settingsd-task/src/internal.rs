//! Internal pseudo-methods.

use settingsd_db::DocumentDb;
use settingsd_desc::DescriptionModel;
use settingsd_resolver::{handle_get, GetReply, GetRequest, ResolverResult, VolatileMap};
use std::sync::RwLock;

/// One `(category, app_id, keys)` tuple the notification path wants fresh
/// values for.
pub struct RequestGetSystemSettingsTuple {
    /// Category-Dim partition to read.
    pub category: String,
    /// App id, or the empty string for a global read.
    pub app_id: String,
    /// Keys to read, or `None` for the whole category.
    pub keys: Option<Vec<String>>,
}

/// `request-get-system-settings`: fetch current values for each tuple,
/// invoking `on_reply` with the merged result per tuple, in order.
///
/// # Errors
///
/// Propagates the first [`settingsd_resolver::ResolverError`] any tuple's
/// read raises.
pub async fn request_get_system_settings(
    db: &dyn DocumentDb,
    desc: &DescriptionModel,
    volatile: &VolatileMap,
    tuples: Vec<RequestGetSystemSettingsTuple>,
    mut on_reply: impl FnMut(&RequestGetSystemSettingsTuple, &GetReply),
) -> ResolverResult<()> {
    for tuple in &tuples {
        let reply = handle_get(
            db,
            desc,
            volatile,
            GetRequest { category: &tuple.category, keys: tuple.keys.clone(), app_id: &tuple.app_id },
        )
        .await?;
        on_reply(tuple, &reply);
    }
    Ok(())
}

/// Tracks the device's "current app" pointer and dispatches app-uninstall
/// cleanup.
#[derive(Default)]
pub struct AppStateTracker {
    current_app: RwLock<String>,
}

impl AppStateTracker {
    /// Construct a tracker with no current app.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the current-app pointer.
    pub fn set_current_app(&self, app_id: impl Into<String>) {
        *self.current_app.write().expect("app state lock poisoned") = app_id.into();
    }

    /// The current-app pointer.
    #[must_use]
    pub fn current_app(&self) -> String {
        self.current_app.read().expect("app state lock poisoned").clone()
    }

    /// Purge every per-app settings row and description bucket belonging
    /// to `app_id` following an uninstall.
    ///
    /// # Errors
    ///
    /// Propagates [`settingsd_db::DbError`] from the underlying store.
    pub async fn handle_app_uninstalled(
        &self,
        db: &dyn DocumentDb,
        desc: &DescriptionModel,
        app_id: &str,
    ) -> settingsd_db::DbResult<()> {
        db.del(
            settingsd_db::Query { app_id: Some(app_id.to_string()), ..settingsd_db::Query::default() },
            Vec::new(),
        )
        .await?;
        desc.purge_app(app_id);
        if self.current_app() == app_id {
            self.set_current_app(String::new());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use settingsd_db::{Kind, Query, SettingsRecord};
    use settingsd_desc::{ArrayExtItem, DbType, DescriptionItem, VType};
    use settingsd_test_support::InMemoryDb;

    #[tokio::test]
    async fn request_get_system_settings_invokes_callback_per_tuple() {
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
        let db = InMemoryDb::with_records(vec![SettingsRecord {
            kind: Kind::Main,
            id: None,
            category: "picture".into(),
            app_id: String::new(),
            value: Map::from_iter([("brightness".to_string(), json!(70))]),
            country: None,
            volatile: None,
            condition: None,
        }]);
        let volatile = VolatileMap::new();

        let mut seen = Vec::new();
        request_get_system_settings(
            &db,
            &desc,
            &volatile,
            vec![RequestGetSystemSettingsTuple { category: "picture".into(), app_id: String::new(), keys: None }],
            |tuple, reply| seen.push((tuple.category.clone(), reply.settings.get("brightness").cloned())),
        )
        .await
        .unwrap();

        assert_eq!(seen, vec![("picture".to_string(), Some(json!(70)))]);
    }

    #[tokio::test]
    async fn app_uninstall_purges_per_app_rows_and_description() {
        let desc = DescriptionModel::new();
        desc.load_base(vec![DescriptionItem {
            key: "launchPoint".into(),
            category: "system".into(),
            vtype: VType::ArrayExt { items: vec![ArrayExtItem { value: json!("home"), active: true, visible: true }] },
            dimension: Vec::new(),
            dbtype: DbType::P,
            volatile: false,
            value_check: true,
            strict_value_check: false,
            ui: json!({}),
            app_id: "com.example.owner".into(),
            country: None,
            condition: None,
        }]);
        let db = InMemoryDb::with_records(vec![SettingsRecord {
            kind: Kind::Main,
            id: None,
            category: "system".into(),
            app_id: "com.example.owner".into(),
            value: Map::from_iter([("launchPoint".to_string(), json!("home"))]),
            country: None,
            volatile: None,
            condition: None,
        }]);

        let tracker = AppStateTracker::new();
        tracker.set_current_app("com.example.owner");
        tracker.handle_app_uninstalled(&db, &desc, "com.example.owner").await.unwrap();

        assert!(desc.describe("launchPoint", "com.example.owner").is_none());
        assert_eq!(tracker.current_app(), "");

        let remaining = db
            .find(Query { kind: Some(Kind::Main), category: Some("system".into()), ..Query::default() })
            .await
            .unwrap();
        assert!(remaining.results.is_empty());
    }
}
