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

//! Description and dimension model for the settings service: the
//! authoritative, thread-safe metadata cache that tells the resolver a
//! key's category, legal values, storage class, dimensionality, and
//! volatility, layered across base/country/default/override/main edits.

mod cache;
mod condition;
mod country;
mod dimension;
mod error;
mod loader;
mod model;
mod service;

pub use cache::{is_visible_to_app, Layer, LayeredDescription};
pub use condition::{select_best, ConditionExpr, FactTable};
pub use country::{apply_conservative_country_change, select_country_variant, CONSERVATIVE_KEYS, DEFAULT_COUNTRY};
pub use dimension::{DimensionKeyInfo, DimensionKind, DimensionRegistry};
pub use error::{DescError, DescResult};
pub use loader::{load_description_file, load_dimension_format, load_exception_app_list};
pub use model::{
    build_category_dim, remove_not_used_dimension, split_category_dim, ArrayExtItem, DbType,
    DescriptionItem, DimensionCoord, VType, GLOBAL_APP_ID, WILDCARD,
};
pub use service::DescriptionModel;
