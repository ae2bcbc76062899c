//! Process configuration: a YAML file on disk, overridable by environment
//! variables, validated once at startup.
//!
//! # Design
//! - A missing or malformed config file is a startup error, never a panic.
//! - Every field has a narrow, explicit type; nothing defers validation to
//!   first use.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating [`ServiceConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file did not parse as valid YAML matching the expected shape.
    #[error("failed to parse config file {path}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
    /// A required field was absent from both the file and its environment override.
    #[error("missing required configuration field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field's value failed validation.
    #[error("invalid value for configuration field '{field}': {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },
}

/// Convenience alias for fallible configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    database_url: Option<String>,
    bind_addr: Option<String>,
    port: Option<u16>,
    description_path: Option<PathBuf>,
    override_path: Option<PathBuf>,
    exception_app_list_path: Option<PathBuf>,
    dimension_format_path: Option<PathBuf>,
    first_use_sentinel_path: Option<PathBuf>,
    openapi_path: Option<PathBuf>,
    country: Option<String>,
}

/// Fully resolved, validated process configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Postgres connection string for the document store.
    pub database_url: String,
    /// Address the bus HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// Port the bus HTTP listener binds to.
    pub port: u16,
    /// Base description artifact (`description.json`).
    pub description_path: PathBuf,
    /// Override description artifact layered on top of `description_path`.
    pub override_path: PathBuf,
    /// Exception app allowlist for `DbType::E` keys.
    pub exception_app_list_path: PathBuf,
    /// Ordered dimension key declarations.
    pub dimension_format_path: PathBuf,
    /// Sentinel file whose absence marks the very first boot.
    pub first_use_sentinel_path: PathBuf,
    /// Destination path for the persisted `OpenAPI` document.
    pub openapi_path: PathBuf,
    /// Active country code, consulted by country-variant selection.
    pub country: String,
}

const ENV_DATABASE_URL: &str = "SETTINGSD_DATABASE_URL";
const ENV_BIND_ADDR: &str = "SETTINGSD_BIND_ADDR";
const ENV_PORT: &str = "SETTINGSD_PORT";
const ENV_COUNTRY: &str = "SETTINGSD_COUNTRY";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_COUNTRY: &str = "none";

impl ServiceConfig {
    /// Load and validate configuration from `path`, applying `SETTINGSD_*`
    /// environment overrides on top of the file's values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// merged result fails validation.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let raw = Self::read_raw(path)?;
        Self::from_raw(raw)
    }

    fn read_raw(path: &Path) -> ConfigResult<RawConfig> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn from_raw(raw: RawConfig) -> ConfigResult<Self> {
        let database_url = env_override(ENV_DATABASE_URL).or(raw.database_url).ok_or(
            ConfigError::MissingField { field: "database_url" },
        )?;

        let bind_addr_raw = env_override(ENV_BIND_ADDR)
            .or(raw.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw.parse::<IpAddr>().map_err(|source| ConfigError::Invalid {
            field: "bind_addr",
            reason: source.to_string(),
        })?;

        let port = match env_override(ENV_PORT) {
            Some(raw_port) => raw_port.parse::<u16>().map_err(|source| ConfigError::Invalid {
                field: "port",
                reason: source.to_string(),
            })?,
            None => raw.port.unwrap_or(DEFAULT_PORT),
        };
        if port == 0 {
            return Err(ConfigError::Invalid { field: "port", reason: "must be nonzero".into() });
        }

        let country =
            env_override(ENV_COUNTRY).or(raw.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        Ok(Self {
            database_url,
            bind_addr,
            port,
            description_path: raw.description_path.unwrap_or_else(|| "description.json".into()),
            override_path: raw.override_path.unwrap_or_else(|| "override.json".into()),
            exception_app_list_path: raw
                .exception_app_list_path
                .unwrap_or_else(|| "exceptionAppList.json".into()),
            dimension_format_path: raw
                .dimension_format_path
                .unwrap_or_else(|| "dimensionFormat.json".into()),
            first_use_sentinel_path: raw
                .first_use_sentinel_path
                .unwrap_or_else(|| "ran-firstuse".into()),
            openapi_path: raw.openapi_path.unwrap_or_else(|| "openapi.json".into()),
            country,
        })
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
