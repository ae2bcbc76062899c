//! Condition scoring for description variant selection.
//!
//! Each description item may carry a `condition` predicate tested against a
//! flat table of device facts (e.g. `modelName`, `sconRev`, `country`).
//! Several items can share the same key/category/dimension slot; the one
//! whose condition scores highest against the current facts wins. An item
//! with no condition always scores zero and is used only when nothing more
//! specific matches.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Device fact table the condition predicate is evaluated against.
pub type FactTable = BTreeMap<String, String>;

/// Fixed per-clause weight. Equality clauses outweigh inequality clauses so
/// that a positive match is always preferred to ruling out an alternative.
const EQ_WEIGHT: u32 = 10;
const NEQ_WEIGHT: u32 = 1;

/// A condition predicate, parsed from a description item's opaque
/// `condition` JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionExpr {
    /// `facts[key] == value`.
    Eq {
        /// Fact name.
        key: String,
        /// Expected value.
        value: String,
    },
    /// `facts[key] != value`.
    Neq {
        /// Fact name.
        key: String,
        /// Disallowed value.
        value: String,
    },
    /// All sub-expressions must match; fails (does not merely score zero)
    /// if any clause mismatches.
    All(Vec<ConditionExpr>),
    /// At least one sub-expression must match.
    Any(Vec<ConditionExpr>),
    /// Negates a sub-expression's pass/fail verdict; contributes no score
    /// of its own.
    Not(Box<ConditionExpr>),
}

impl ConditionExpr {
    /// Parse a condition from the item's raw JSON `condition` field.
    ///
    /// # Errors
    ///
    /// Returns a human-readable detail string if `value` is not a
    /// recognized condition shape.
    pub fn parse(value: &Value) -> Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())
    }

    /// Score this predicate against `facts`. Returns `None` if the
    /// predicate fails outright (an `All`/bare `Eq`/`Neq` clause
    /// mismatched), or `Some(score)` — always `> 0` — on a pass.
    #[must_use]
    pub fn score(&self, facts: &FactTable) -> Option<u32> {
        match self {
            Self::Eq { key, value } => {
                (facts.get(key).map(String::as_str) == Some(value.as_str())).then_some(EQ_WEIGHT)
            }
            Self::Neq { key, value } => {
                (facts.get(key).map(String::as_str) != Some(value.as_str())).then_some(NEQ_WEIGHT)
            }
            Self::All(clauses) => {
                let mut total = 0u32;
                for clause in clauses {
                    total = total.checked_add(clause.score(facts)?)?;
                }
                Some(total.max(1))
            }
            Self::Any(clauses) => clauses.iter().filter_map(|c| c.score(facts)).max(),
            Self::Not(inner) => match inner.score(facts) {
                Some(_) => None,
                None => Some(1),
            },
        }
    }
}

/// Pick the highest-scoring candidate out of `items`, where `condition`
/// extracts each candidate's optional predicate. Candidates with no
/// condition score zero and are returned only if no scoring candidate
/// exists. Ties keep the earlier candidate (stable).
pub fn select_best<'a, T>(
    items: &'a [T],
    facts: &FactTable,
    condition: impl Fn(&T) -> Option<&ConditionExpr>,
) -> Option<&'a T> {
    let mut best: Option<(&T, u32)> = None;
    let mut fallback: Option<&T> = None;
    for item in items {
        match condition(item) {
            Some(expr) => {
                if let Some(score) = expr.score(facts) {
                    if best.is_none_or(|(_, best_score)| score > best_score) {
                        best = Some((item, score));
                    }
                }
            }
            None => {
                if fallback.is_none() {
                    fallback = Some(item);
                }
            }
        }
    }
    best.map(|(item, _)| item).or(fallback)
}
