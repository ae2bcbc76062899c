//! Write-time value-check rules.

use serde_json::Value;
use settingsd_desc::{DescriptionItem, VType};

/// Whether `value` satisfies `item`'s `vtype` constraint.
///
/// Returns `true` unconditionally when `item.value_check` is `false`.
/// `Callback` and `File` vtypes are never writable through this check and
/// always fail, independent of `value_check`.
#[must_use]
pub fn check_value(item: &DescriptionItem, value: &Value) -> bool {
    match &item.vtype {
        VType::Callback | VType::File => false,
        _ if !item.value_check => true,
        VType::Array { array } => array.contains(value),
        VType::ArrayExt { items } => items.iter().any(|candidate| {
            candidate.value == *value
                && (!item.strict_value_check || (candidate.active && candidate.visible))
        }),
        VType::Range { min, max, interval } => {
            let Some(number) = value.as_f64() else { return false };
            if number < *min || number > *max {
                return false;
            }
            if *interval <= 0.0 {
                return true;
            }
            let steps = (number - min) / interval;
            (steps - steps.round()).abs() < f64::EPSILON * 1e3
        }
        VType::Date => value.is_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use settingsd_desc::{ArrayExtItem, DbType};

    fn item_with(vtype: VType, value_check: bool, strict: bool) -> DescriptionItem {
        DescriptionItem {
            key: "k".into(),
            category: "c".into(),
            vtype,
            dimension: Vec::new(),
            dbtype: DbType::G,
            volatile: false,
            value_check,
            strict_value_check: strict,
            ui: json!({}),
            app_id: String::new(),
            country: None,
            condition: None,
        }
    }

    #[test]
    fn array_rejects_values_outside_the_list() {
        let item = item_with(VType::Array { array: vec![json!("a"), json!("b")] }, true, false);
        assert!(check_value(&item, &json!("a")));
        assert!(!check_value(&item, &json!("z")));
    }

    #[test]
    fn array_ext_strict_requires_active_and_visible() {
        let item = item_with(
            VType::ArrayExt {
                items: vec![ArrayExtItem { value: json!("vivid"), active: false, visible: true }],
            },
            true,
            true,
        );
        assert!(!check_value(&item, &json!("vivid")));
    }

    #[test]
    fn array_ext_non_strict_ignores_active_visible() {
        let item = item_with(
            VType::ArrayExt {
                items: vec![ArrayExtItem { value: json!("vivid"), active: false, visible: true }],
            },
            true,
            false,
        );
        assert!(check_value(&item, &json!("vivid")));
    }

    #[test]
    fn range_rejects_values_not_on_the_interval() {
        let item = item_with(VType::Range { min: 0.0, max: 100.0, interval: 5.0 }, true, false);
        assert!(check_value(&item, &json!(15)));
        assert!(!check_value(&item, &json!(17)));
        assert!(!check_value(&item, &json!(150)));
    }

    #[test]
    fn value_check_disabled_accepts_anything_except_callback_and_file() {
        let item = item_with(VType::Array { array: vec![] }, false, false);
        assert!(check_value(&item, &json!("anything")));

        let callback = item_with(VType::Callback, false, false);
        assert!(!check_value(&callback, &json!("x")));
    }

    #[test]
    fn date_requires_a_string() {
        let item = item_with(VType::Date, true, false);
        assert!(check_value(&item, &json!("2026-07-27")));
        assert!(!check_value(&item, &json!(20_260_727)));
    }
}
