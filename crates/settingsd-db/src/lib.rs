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
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Document-database contract and `FindChain` pagination adapter consumed by
//! the settings service core. The database's query language,
//! replication, and storage engine are out of scope; this crate only pins
//! down the five operations (`find`, `batch`, `merge`, `put`, `del`) the
//! resolver and task engine issue, plus a concrete `PostgreSQL`-backed
//! implementation.

pub mod contract;
pub mod error;
pub mod find_chain;
pub mod migrations;
pub mod model;
pub mod postgres;

pub use contract::{BatchOperation, BatchOperationReply, BatchReply, DocumentDb, FindReply, Query};
pub use error::{DbError, DbResult};
pub use model::{Kind, SettingsRecord};
pub use postgres::PostgresDb;
