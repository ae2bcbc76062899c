//! Get-values / set-values handler.

use crate::error::{ResolverError, ResolverResult};
use serde_json::Value;
use settingsd_desc::{ArrayExtItem, VType};

/// The mutation a `setSystemSettingValues`-style call applies to a vtype's
/// legal-values list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuesOp {
    /// Insert items absent from the existing list.
    Add,
    /// Delete matching items.
    Remove,
    /// Replace items matched by key (`value` for `ArrayExt`, the element
    /// itself for `Array`).
    Update,
    /// Replace the list wholesale.
    Set,
}

/// Apply `op` with `items` to `current`'s values. `Range`, `Date`,
/// `Callback`, and `File` vtypes only accept [`ValuesOp::Set`] and replace
/// their scalar fields wholesale via `replacement`.
///
/// # Errors
///
/// Returns [`ResolverError::ScopeViolation`] if a non-`Set` op is applied
/// to a non-array vtype.
pub fn apply_values_op(
    current: &VType,
    op: ValuesOp,
    array_items: &[Value],
    array_ext_items: &[ArrayExtItem],
    replacement: Option<&VType>,
) -> ResolverResult<VType> {
    match current {
        VType::Array { array } => Ok(VType::Array { array: apply_array_op(array, op, array_items) }),
        VType::ArrayExt { items } => {
            Ok(VType::ArrayExt { items: apply_array_ext_op(items, op, array_ext_items) })
        }
        VType::Range { .. } | VType::Date | VType::Callback | VType::File => {
            if op != ValuesOp::Set {
                return Err(ResolverError::ScopeViolation {
                    key: String::new(),
                    attempted: "non-set values mutation",
                });
            }
            Ok(replacement.cloned().unwrap_or_else(|| current.clone()))
        }
    }
}

fn apply_array_op(existing: &[Value], op: ValuesOp, items: &[Value]) -> Vec<Value> {
    match op {
        ValuesOp::Set => items.to_vec(),
        ValuesOp::Add => {
            let mut merged = existing.to_vec();
            for item in items {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
            merged
        }
        ValuesOp::Remove => existing.iter().filter(|v| !items.contains(v)).cloned().collect(),
        ValuesOp::Update => {
            let mut merged = existing.to_vec();
            for item in items {
                if let Some(slot) = merged.iter_mut().find(|v| *v == item) {
                    *slot = item.clone();
                }
            }
            merged
        }
    }
}

fn apply_array_ext_op(existing: &[ArrayExtItem], op: ValuesOp, items: &[ArrayExtItem]) -> Vec<ArrayExtItem> {
    match op {
        ValuesOp::Set => items.to_vec(),
        ValuesOp::Add => {
            let mut merged = existing.to_vec();
            for item in items {
                if !merged.iter().any(|existing_item| existing_item.value == item.value) {
                    merged.push(item.clone());
                }
            }
            merged
        }
        ValuesOp::Remove => {
            existing.iter().filter(|e| !items.iter().any(|i| i.value == e.value)).cloned().collect()
        }
        ValuesOp::Update => {
            let mut merged = existing.to_vec();
            for item in items {
                if let Some(slot) = merged.iter_mut().find(|e| e.value == item.value) {
                    *slot = item.clone();
                }
            }
            merged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn array_add_skips_duplicates() {
        let current = VType::Array { array: vec![json!("a")] };
        let result = apply_values_op(&current, ValuesOp::Add, &[json!("a"), json!("b")], &[], None).unwrap();
        let VType::Array { array } = result else { panic!() };
        assert_eq!(array, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn array_ext_update_replaces_matched_item_by_value() {
        let current = VType::ArrayExt {
            items: vec![ArrayExtItem { value: json!("vivid"), active: true, visible: true }],
        };
        let patch = vec![ArrayExtItem { value: json!("vivid"), active: false, visible: true }];
        let result = apply_values_op(&current, ValuesOp::Update, &[], &patch, None).unwrap();
        let VType::ArrayExt { items } = result else { panic!() };
        assert_eq!(items.len(), 1);
        assert!(!items[0].active);
    }

    #[test]
    fn array_ext_remove_drops_matching_items() {
        let current = VType::ArrayExt {
            items: vec![
                ArrayExtItem { value: json!("vivid"), active: true, visible: true },
                ArrayExtItem { value: json!("cinema"), active: true, visible: true },
            ],
        };
        let doomed = vec![ArrayExtItem { value: json!("vivid"), active: true, visible: true }];
        let result = apply_values_op(&current, ValuesOp::Remove, &[], &doomed, None).unwrap();
        let VType::ArrayExt { items } = result else { panic!() };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, json!("cinema"));
    }

    #[test]
    fn range_rejects_non_set_mutation() {
        let current = VType::Range { min: 0.0, max: 10.0, interval: 1.0 };
        let err = apply_values_op(&current, ValuesOp::Add, &[], &[], None).unwrap_err();
        assert!(matches!(err, ResolverError::ScopeViolation { .. }));
    }

    #[test]
    fn range_set_replaces_wholesale() {
        let current = VType::Range { min: 0.0, max: 10.0, interval: 1.0 };
        let replacement = VType::Range { min: 0.0, max: 20.0, interval: 2.0 };
        let result = apply_values_op(&current, ValuesOp::Set, &[], &[], Some(&replacement)).unwrap();
        assert_eq!(result, replacement);
    }
}
