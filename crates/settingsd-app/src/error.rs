//! # Design
//!
//! - Centralize application-level errors for bootstrap and startup.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Environment or file configuration was missing or unreadable.
    #[error("configuration error")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        #[source]
        source: crate::config::ConfigError,
    },
    /// Description artifact loading failed.
    #[error("description artifact load failed")]
    Desc {
        /// Operation identifier.
        operation: &'static str,
        /// Source description-model error.
        #[source]
        source: settingsd_desc::DescError,
    },
    /// Connecting to or migrating the document store failed.
    #[error("database operation failed")]
    Db {
        /// Operation identifier.
        operation: &'static str,
        /// Source database error.
        #[source]
        source: settingsd_db::DbError,
    },
    /// Telemetry initialization failed.
    #[error("telemetry initialization failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        #[source]
        source: anyhow::Error,
    },
    /// API server bootstrap or serve failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        #[source]
        source: settingsd_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: crate::config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn desc(operation: &'static str, source: settingsd_desc::DescError) -> Self {
        Self::Desc { operation, source }
    }

    pub(crate) const fn db(operation: &'static str, source: settingsd_db::DbError) -> Self {
        Self::Db { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: settingsd_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            crate::config::ConfigError::MissingField { field: "bind_addr" },
        );
        assert!(matches!(config, AppError::Config { .. }));

        let api = AppError::api_server(
            "serve",
            settingsd_api::ApiServerError::Serve { source: std::io::Error::other("io") },
        );
        assert!(matches!(api, AppError::ApiServer { .. }));
    }
}
