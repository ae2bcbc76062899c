#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Settings-service application bootstrap wiring.
//!
//! Layout: `config.rs` (process configuration), `bootstrap.rs` (service
//! construction and startup), `error.rs` (application-level failures).

/// Process configuration loading and validation.
pub mod config;

/// Application bootstrap and startup.
pub mod bootstrap;

/// Application-level error type.
pub mod error;

pub use bootstrap::run_app;
