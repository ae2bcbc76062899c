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

//! Per-request task engine: a readers-writer scheduling discipline over
//! the resolver, a batch fan-out/fan-in accumulator, and the
//! internal pseudo-methods the notification path and app lifecycle use.

mod batch;
mod engine;
mod error;
mod internal;

pub use batch::BatchAccumulator;
pub use engine::TaskEngine;
pub use error::{TaskError, TaskResult};
pub use internal::{request_get_system_settings, AppStateTracker, RequestGetSystemSettingsTuple};
