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
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Test-only fixtures shared across the settings service crates: an
//! in-memory [`DocumentDb`](settingsd_db::DocumentDb) double used so the
//! description model, resolver, and task engine can be exercised without a
//! live `PostgreSQL` instance.

mod memory_db;

pub use memory_db::InMemoryDb;
