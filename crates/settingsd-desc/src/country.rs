//! Country-variant selection and country-change modification preservation.

use serde_json::{Map, Value};

/// Literal country tag meaning "use this variant when no country-specific
/// one is declared".
pub const DEFAULT_COUNTRY: &str = "default";

/// Keys that survive a country change even when the new country's default
/// differs from the old one, because a user is more likely to have tuned
/// them by hand than to want them silently reset. Conservative on purpose:
/// only nested locale/keyboard properties that are cheap to re-apply and
/// rarely travel with the country default.
pub const CONSERVATIVE_KEYS: &[&str] = &[
    "keyboard.layout",
    "keyboard.imeId",
    "locale.timezone",
    "locale.clockFormat",
];

/// Whether `candidate_country` (a comma-separated country-code list, the
/// literal `default`, or `None`) applies to `country_code`.
fn country_matches(candidate_country: Option<&str>, country_code: &str) -> CountryMatch {
    match candidate_country {
        None => CountryMatch::Unscoped,
        Some(value) if value.eq_ignore_ascii_case(DEFAULT_COUNTRY) => CountryMatch::Default,
        Some(list) if list.split(',').any(|code| code.trim().eq_ignore_ascii_case(country_code)) => {
            CountryMatch::Exact
        }
        Some(_) => CountryMatch::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CountryMatch {
    None,
    Default,
    Unscoped,
    Exact,
}

/// Pick the best country variant among `items` for `country_code`.
///
/// Preference order: an exact country-code match, then the `default`
/// variant, then an unscoped item. An item scoped to a country that does
/// not include `country_code` and is not `default` is never selected.
pub fn select_country_variant<'a, T>(
    items: &'a [T],
    country_code: &str,
    country_of: impl Fn(&T) -> Option<&str>,
) -> Option<&'a T> {
    items
        .iter()
        .map(|item| (item, country_matches(country_of(item), country_code)))
        .filter(|(_, rank)| *rank != CountryMatch::None)
        .max_by_key(|(_, rank)| *rank)
        .map(|(item, _)| item)
}

/// Re-derive a `main`-kind settings object after the device's country
/// changes, preserving values in [`CONSERVATIVE_KEYS`] that the user had
/// modified away from the outgoing country's default.
///
/// `previous_default` is the default-kind snapshot for the outgoing
/// country, `current_main` is the live (possibly user-edited) record, and
/// `new_default` is the default-kind snapshot for the incoming country.
#[must_use]
pub fn apply_conservative_country_change(
    previous_default: &Map<String, Value>,
    current_main: &Map<String, Value>,
    new_default: &Map<String, Value>,
) -> Map<String, Value> {
    let mut result = new_default.clone();
    for key in CONSERVATIVE_KEYS {
        let Some(current_value) = current_main.get(*key) else {
            continue;
        };
        let user_modified = previous_default.get(*key) != Some(current_value);
        if user_modified {
            result.insert((*key).to_string(), current_value.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Candidate {
        country: Option<&'static str>,
    }

    #[test]
    fn exact_match_beats_default_and_unscoped() {
        let items = vec![
            Candidate { country: None },
            Candidate { country: Some("default") },
            Candidate { country: Some("US,CA") },
        ];
        let winner = select_country_variant(&items, "US", |c| c.country);
        assert_eq!(winner.unwrap().country, Some("US,CA"));
    }

    #[test]
    fn falls_back_to_default_when_no_exact_match() {
        let items = vec![Candidate { country: Some("default") }, Candidate { country: Some("FR") }];
        let winner = select_country_variant(&items, "US", |c| c.country);
        assert_eq!(winner.unwrap().country, Some("default"));
    }

    #[test]
    fn non_matching_scoped_country_is_excluded() {
        let items = vec![Candidate { country: Some("FR") }];
        assert!(select_country_variant(&items, "US", |c| c.country).is_none());
    }

    #[test]
    fn conservative_change_keeps_user_edited_keyboard_layout() {
        let mut previous = Map::new();
        previous.insert("keyboard.layout".to_string(), json!("qwerty-us"));
        let mut current = Map::new();
        current.insert("keyboard.layout".to_string(), json!("dvorak"));
        let mut next_default = Map::new();
        next_default.insert("keyboard.layout".to_string(), json!("azerty-fr"));

        let merged = apply_conservative_country_change(&previous, &current, &next_default);
        assert_eq!(merged.get("keyboard.layout"), Some(&json!("dvorak")));
    }

    #[test]
    fn conservative_change_resets_untouched_key_to_new_default() {
        let mut previous = Map::new();
        previous.insert("keyboard.layout".to_string(), json!("qwerty-us"));
        let current = previous.clone();
        let mut next_default = Map::new();
        next_default.insert("keyboard.layout".to_string(), json!("azerty-fr"));

        let merged = apply_conservative_country_change(&previous, &current, &next_default);
        assert_eq!(merged.get("keyboard.layout"), Some(&json!("azerty-fr")));
    }
}
