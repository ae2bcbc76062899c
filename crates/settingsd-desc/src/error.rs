//! Error type for the description and dimension model.

use thiserror::Error;

/// Errors raised while loading, querying, or mutating description metadata.
#[derive(Debug, Error)]
pub enum DescError {
    /// No description exists for the given key/app combination.
    #[error("no description for key '{key}' (app '{app_id}')")]
    UnknownKey {
        /// The key that was looked up.
        key: String,
        /// The app bucket that was searched.
        app_id: String,
    },

    /// A description references a dimension key that `dimensionInfo` never
    /// declared.
    #[error("dimension key '{dimension_key}' referenced by '{key}' is not declared")]
    UnknownDimensionKey {
        /// Offending key.
        key: String,
        /// Undeclared dimension key name.
        dimension_key: String,
    },

    /// Failed to parse an on-disk description artifact.
    #[error("failed to parse {artifact}: {detail}")]
    MalformedArtifact {
        /// Human-readable artifact name (e.g. `description.json`).
        artifact: String,
        /// Parse failure detail.
        detail: String,
    },

    /// I/O failure while loading an on-disk artifact.
    #[error("failed to read {path}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The underlying document store returned an error.
    #[error("document store operation failed")]
    Db(#[from] settingsd_db::DbError),
}

/// Convenience alias for fallible description-model operations.
pub type DescResult<T> = Result<T, DescError>;
