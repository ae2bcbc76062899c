//! Error type for the resolver and request handlers.

use thiserror::Error;

/// Errors raised while resolving or writing settings.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A requested key has no description.
    #[error("unknown key '{key}'")]
    UnknownKey {
        /// The key that was looked up.
        key: String,
    },

    /// A write's value failed the key's value-check constraint.
    #[error("value for key '{key}' failed value-check")]
    ValueCheckFailed {
        /// The offending key.
        key: String,
    },

    /// A write targeted a key with a storage class that forbids the
    /// requested scope (e.g. a global-only key written with a per-app
    /// `appId`).
    #[error("key '{key}' does not permit {attempted} access")]
    ScopeViolation {
        /// The offending key.
        key: String,
        /// What the caller attempted (`"per-app"` or `"global"`).
        attempted: &'static str,
    },

    /// A write attempted to change an already-referenced key's `category`
    /// or `dimension` list.
    #[error("key '{key}' cannot change category or dimension after first use")]
    ImmutableShape {
        /// The offending key.
        key: String,
    },

    /// None of the keys requested by a delete/reset existed.
    #[error("none of the requested keys were found")]
    NothingFound,

    /// The underlying description model returned an error.
    #[error("description model operation failed")]
    Desc(#[from] settingsd_desc::DescError),

    /// The underlying document store returned an error.
    #[error("document store operation failed")]
    Db(#[from] settingsd_db::DbError),
}

/// Convenience alias for fallible resolver operations.
pub type ResolverResult<T> = Result<T, ResolverError>;
