//! Condition evaluation.
//!
//! Evaluation is total: a missing field, a non-numeric operand for `gt`/`lt`
//! or a malformed condition makes that condition false, never an error.

use super::request::RequestContext;
use crate::model::{ConditionGroup, ConditionOp, GroupType, RuleCondition};
use serde_json::Value;

/// `AND` requires every condition, `OR` at least one; an empty group matches.
pub fn group_matches(group: &ConditionGroup, ctx: &RequestContext) -> bool {
    if group.conditions.is_empty() {
        return true;
    }
    match group.group_type {
        GroupType::And => group.conditions.iter().all(|c| condition_matches(c, ctx)),
        GroupType::Or => group.conditions.iter().any(|c| condition_matches(c, ctx)),
    }
}

pub fn condition_matches(condition: &RuleCondition, ctx: &RequestContext) -> bool {
    let actual = match ctx.lookup(&condition.field) {
        Some(Value::Null) | None => return false,
        Some(value) => value,
    };

    match &condition.op {
        ConditionOp::Equals(expected) => loose_eq(&actual, expected),
        ConditionOp::Contains(expected) => {
            let needle = coerce_string(expected);
            match &actual {
                Value::Array(items) => items
                    .iter()
                    .any(|item| coerce_string(item).contains(needle.as_str())),
                _ => coerce_string(&actual).contains(needle.as_str()),
            }
        }
        ConditionOp::Gt(expected) => compare(&actual, expected, |a, b| a > b),
        ConditionOp::Lt(expected) => compare(&actual, expected, |a, b| a < b),
        ConditionOp::Between { low, high } => {
            match (as_number(&actual), as_number(low), as_number(high)) {
                (Some(n), Some(lo), Some(hi)) => lo <= n && n <= hi,
                _ => false,
            }
        }
        ConditionOp::In(options) => options.iter().any(|option| loose_eq(&actual, option)),
        ConditionOp::Invalid { .. } => false,
    }
}

fn compare(actual: &Value, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

/// Numbers, and strings that parse as numbers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        _ => None,
    }
}

/// String form used by `equals`/`contains`: strings as-is, `null` as empty,
/// everything else as compact JSON.
pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric comparison when one side is a number and the other is numeric;
/// string comparison otherwise.
pub fn loose_eq(actual: &Value, expected: &Value) -> bool {
    if actual.is_number() || expected.is_number() {
        if let (Some(a), Some(b)) = (as_number(actual), as_number(expected)) {
            return a == b;
        }
    }
    coerce_string(actual) == coerce_string(expected)
}
