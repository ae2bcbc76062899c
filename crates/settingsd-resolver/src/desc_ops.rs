//! Get-desc / set-desc / reset-desc handlers.

use crate::error::{ResolverError, ResolverResult};
use settingsd_desc::{DescriptionItem, DescriptionModel};

/// Resolve the effective description for `key`/`app_id`.
///
/// # Errors
///
/// Returns [`ResolverError::UnknownKey`] if no description exists.
pub fn handle_get_desc(desc: &DescriptionModel, key: &str, app_id: &str) -> ResolverResult<DescriptionItem> {
    desc.describe(key, app_id).ok_or_else(|| ResolverError::UnknownKey { key: key.to_string() })
}

/// `setSystemSettingDesc`: write through a live edit onto the `main`
/// description layer.
///
/// # Errors
///
/// Returns [`ResolverError::UnknownKey`] if no base description exists.
pub fn handle_set_desc(
    desc: &DescriptionModel,
    key: &str,
    app_id: &str,
    patch: DescriptionItem,
) -> ResolverResult<()> {
    desc.add_key_desc(key, app_id, patch).map_err(Into::into)
}

/// `setSystemSettingFactoryDesc`: write through an edit onto the `default`
/// (override) description layer.
///
/// # Errors
///
/// Returns [`ResolverError::UnknownKey`] if no base description exists.
pub fn handle_set_factory_desc(
    desc: &DescriptionModel,
    key: &str,
    app_id: &str,
    patch: DescriptionItem,
) -> ResolverResult<()> {
    desc.set_factory_desc(key, app_id, patch).map_err(Into::into)
}

/// `resetSystemSettingDesc`: drop the `main`-layer edit for each
/// `(key, app_id)` pair that `keys`/`app_ids` name. Best-effort: an id that
/// never had a `main`-layer edit is silently skipped rather than treated as
/// an error, since a bulk reset naturally covers ids with nothing to
/// revert.
pub fn handle_reset_desc(desc: &DescriptionModel, keys: &[String], app_ids: &[String]) {
    for key in keys {
        for app_id in app_ids {
            let _ = desc.reset_key_desc(key, app_id);
        }
    }
}
