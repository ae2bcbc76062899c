//! Service construction and startup: load configuration, connect the
//! document store, load description artifacts, wire the bus API, and serve.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use settingsd_api::{ApiServer, ApiState, BroadcastNotifier};
use settingsd_db::{migrations, DbError, PostgresDb};
use settingsd_desc::{
    load_description_file, load_dimension_format, load_exception_app_list, DescriptionModel,
};
use settingsd_events::{SubscriptionEngine, SubscriptionRegistry};
use settingsd_resolver::VolatileMap;
use settingsd_task::{AppStateTracker, TaskEngine};
use settingsd_telemetry::{init_logging, LoggingConfig, Metrics};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{AppError, AppResult};

const DEFAULT_CONFIG_PATH: &str = "settingsd.yaml";
const DB_CONNECT_OPERATION: &str = "connect";

/// Load configuration from the path named by `SETTINGSD_CONFIG` (or
/// [`DEFAULT_CONFIG_PATH`]) and run the service until it is told to stop.
///
/// # Errors
///
/// Returns an error if configuration loading, telemetry setup, database
/// connection, description loading, or the API server itself fails.
pub async fn run_app() -> anyhow::Result<()> {
    let config_path =
        std::env::var("SETTINGSD_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = ServiceConfig::load(Path::new(&config_path))
        .map_err(|source| AppError::config("load", source))?;
    run_app_with(config).await.map_err(anyhow::Error::from)
}

/// Build every service and serve the bus until the process is terminated.
///
/// # Errors
///
/// Returns an error if the database connection, migrations, description
/// artifacts, or the API server fail.
pub async fn run_app_with(config: ServiceConfig) -> AppResult<()> {
    init_logging(&LoggingConfig::default())
        .map_err(|source| AppError::telemetry("init_logging", source))?;

    let pool = PgPoolOptions::new().connect(&config.database_url).await.map_err(|source| {
        AppError::db(
            "connect",
            DbError::OperationFailed { operation: DB_CONNECT_OPERATION, source: Some(source) },
        )
    })?;
    migrations::run_migrations(&pool).await.map_err(|source| AppError::db("migrate", source))?;
    let db: Arc<dyn settingsd_db::DocumentDb> = Arc::new(PostgresDb::new(pool));

    let desc = Arc::new(build_description_model(&config)?);
    enforce_first_use_sentinel(&config, &desc);

    let volatile = Arc::new(VolatileMap::new());
    let task_engine = Arc::new(TaskEngine::new());
    let events = Arc::new(SubscriptionEngine::new(SubscriptionRegistry::new()));
    let app_state = Arc::new(AppStateTracker::new());
    let broadcast_notifier = Arc::new(BroadcastNotifier::new());
    let metrics = Metrics::new().map_err(|source| AppError::telemetry("metrics_init", source))?;

    let state = Arc::new(ApiState::new(
        db,
        desc,
        volatile,
        task_engine,
        events,
        app_state,
        broadcast_notifier.clone(),
        broadcast_notifier,
        metrics,
    ));

    let server =
        ApiServer::new(state, &settingsd_api::openapi::openapi_document(), &config.openapi_path)
            .map_err(|source| AppError::api_server("build", source))?;

    let addr = SocketAddr::new(config.bind_addr, config.port);
    info!(%addr, "settings service ready");
    server.serve(addr).await.map_err(|source| AppError::api_server("serve", source))
}

fn build_description_model(config: &ServiceConfig) -> AppResult<DescriptionModel> {
    let model = DescriptionModel::new();

    let base = load_description_file(&config.description_path)
        .map_err(|source| AppError::desc("load_description", source))?;
    model.load_base_for_country(base, &config.country);

    if config.override_path.exists() {
        let overrides = load_description_file(&config.override_path)
            .map_err(|source| AppError::desc("load_override", source))?;
        model.apply_default_overrides(overrides, &config.country);
    }

    let exception_apps: HashSet<String> =
        load_exception_app_list(&config.exception_app_list_path)
            .map_err(|source| AppError::desc("load_exception_app_list", source))?;
    model.set_exception_apps(exception_apps);

    let dimensions = load_dimension_format(&config.dimension_format_path)
        .map_err(|source| AppError::desc("load_dimension_format", source))?;
    for dimension in dimensions {
        model.declare_dimension(dimension);
    }

    Ok(model)
}

/// On a device's very first boot (no `ran-firstuse` sentinel on disk),
/// write the sentinel so later restarts don't re-run first-use handling.
fn enforce_first_use_sentinel(config: &ServiceConfig, _desc: &DescriptionModel) {
    if config.first_use_sentinel_path.exists() {
        return;
    }
    warn!(
        sentinel = %config.first_use_sentinel_path.display(),
        "first-use sentinel missing; this is the device's first boot"
    );
    if let Err(source) = std::fs::write(&config.first_use_sentinel_path, b"") {
        warn!(error = %source, "failed to write first-use sentinel");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use settingsd_desc::DbType;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_json(path: &Path, contents: &str) {
        let mut file = std::fs::File::create(path).expect("create fixture file");
        file.write_all(contents.as_bytes()).expect("write fixture file");
    }

    fn fixture_config(dir: &Path) -> ServiceConfig {
        ServiceConfig {
            database_url: "postgres://unused".into(),
            bind_addr: "127.0.0.1".parse().unwrap(),
            port: 8080,
            description_path: dir.join("description.json"),
            override_path: dir.join("override.json"),
            exception_app_list_path: dir.join("exceptionAppList.json"),
            dimension_format_path: dir.join("dimensionFormat.json"),
            first_use_sentinel_path: dir.join("ran-firstuse"),
            openapi_path: dir.join("openapi.json"),
            country: "none".into(),
        }
    }

    #[test]
    fn build_description_model_loads_base_and_overrides() {
        let dir = tempdir().expect("tempdir");
        let config = fixture_config(dir.path());

        write_json(
            &config.description_path,
            r#"[{"key":"brightness","category":"display","vtype":{"vtype":"Date"},"dbtype":"G"}]"#,
        );
        write_json(&config.override_path, "[]");
        write_json(&config.exception_app_list_path, r#"["com.example.trusted"]"#);
        write_json(&config.dimension_format_path, "[]");

        let model = build_description_model(&config).expect("description model builds");
        let item = model.describe("brightness", "").expect("brightness described");
        assert_eq!(item.category, "display");
        assert_eq!(item.dbtype, DbType::G);
    }

    #[test]
    fn first_use_sentinel_is_written_when_absent() {
        let dir = tempdir().expect("tempdir");
        let config = fixture_config(dir.path());
        let desc = DescriptionModel::new();
        enforce_first_use_sentinel(&config, &desc);
        assert!(config.first_use_sentinel_path.exists());
    }

    #[test]
    fn first_use_sentinel_left_untouched_when_present() {
        let dir = tempdir().expect("tempdir");
        let config = fixture_config(dir.path());
        std::fs::write(&config.first_use_sentinel_path, b"marker").expect("seed sentinel");
        let desc = DescriptionModel::new();
        enforce_first_use_sentinel(&config, &desc);
        let contents = std::fs::read(&config.first_use_sentinel_path).expect("read sentinel");
        assert_eq!(contents, b"marker");
    }
}
