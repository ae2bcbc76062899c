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

//! Multi-layer settings-record merge, the get/set/values/description/
//! delete/reset request handlers, and the in-memory volatile map. Each
//! handler is a plain async function over a [`settingsd_db::DocumentDb`]
//! and a [`settingsd_desc::DescriptionModel`]; the per-request task engine
//! owns scheduling, batching, and notification fan-out around these calls.

mod delete_reset;
mod desc_ops;
mod error;
mod get;
mod merge;
mod set;
mod value_check;
mod values;
mod volatile;

pub use delete_reset::{handle_delete, handle_reset, DeleteRequest, ResetOutcome, ResetRequest};
pub use desc_ops::{handle_get_desc, handle_reset_desc, handle_set_desc, handle_set_factory_desc};
pub use error::{ResolverError, ResolverResult};
pub use get::{handle_get, GetReply, GetRequest};
pub use merge::{merge_layered_records, MergeInputs};
pub use set::{handle_set, SetReply, SetRequest};
pub use value_check::check_value;
pub use values::{apply_values_op, ValuesOp};
pub use volatile::VolatileMap;
