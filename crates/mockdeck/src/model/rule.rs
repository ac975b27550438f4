//! Conditional response rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupType {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// A rule's condition tree. An empty list matches every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    #[serde(rename = "type", default)]
    pub group_type: GroupType,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

impl ConditionGroup {
    pub fn all(conditions: Vec<RuleCondition>) -> Self {
        Self {
            group_type: GroupType::And,
            conditions,
        }
    }

    pub fn any(conditions: Vec<RuleCondition>) -> Self {
        Self {
            group_type: GroupType::Or,
            conditions,
        }
    }
}

/// One test against a request field, e.g. `body.amount between [10, 20]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RuleConditionRaw", into = "RuleConditionRaw")]
pub struct RuleCondition {
    /// Dotted path; the first segment picks the bucket (`query`, `body`, `header`, `param`).
    pub field: String,
    pub op: ConditionOp,
}

/// Operator with its operand, already shape-checked.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOp {
    Equals(Value),
    Contains(Value),
    Gt(Value),
    Lt(Value),
    /// Inclusive on both ends.
    Between { low: Value, high: Value },
    In(Vec<Value>),
    /// Unknown operator or malformed operand; never matches.
    Invalid { operator: String, value: Value },
}

impl ConditionOp {
    pub fn name(&self) -> &str {
        match self {
            ConditionOp::Equals(_) => "equals",
            ConditionOp::Contains(_) => "contains",
            ConditionOp::Gt(_) => "gt",
            ConditionOp::Lt(_) => "lt",
            ConditionOp::Between { .. } => "between",
            ConditionOp::In(_) => "in",
            ConditionOp::Invalid { operator, .. } => operator,
        }
    }
}

impl RuleCondition {
    pub fn new(field: impl Into<String>, op: ConditionOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }
}

/// Stored form: `{ field, operator, value }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RuleConditionRaw {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

fn is_scalar(value: &Value) -> bool {
    !(value.is_array() || value.is_object())
}

impl From<RuleConditionRaw> for RuleCondition {
    fn from(raw: RuleConditionRaw) -> Self {
        let RuleConditionRaw {
            field,
            operator,
            value,
        } = raw;

        let op = match (operator.trim().to_lowercase().as_str(), value) {
            ("equals", v) => ConditionOp::Equals(v),
            ("contains", v) if is_scalar(&v) => ConditionOp::Contains(v),
            ("gt", v) if is_scalar(&v) => ConditionOp::Gt(v),
            ("lt", v) if is_scalar(&v) => ConditionOp::Lt(v),
            ("between", Value::Array(mut bounds)) if bounds.len() == 2 => {
                let high = bounds.pop().unwrap_or_default();
                let low = bounds.pop().unwrap_or_default();
                ConditionOp::Between { low, high }
            }
            ("in", Value::Array(options)) => ConditionOp::In(options),
            (_, value) => ConditionOp::Invalid { operator, value },
        };

        RuleCondition { field, op }
    }
}

impl From<RuleCondition> for RuleConditionRaw {
    fn from(condition: RuleCondition) -> Self {
        let (operator, value) = match condition.op {
            ConditionOp::Equals(v) => ("equals".to_string(), v),
            ConditionOp::Contains(v) => ("contains".to_string(), v),
            ConditionOp::Gt(v) => ("gt".to_string(), v),
            ConditionOp::Lt(v) => ("lt".to_string(), v),
            ConditionOp::Between { low, high } => {
                ("between".to_string(), Value::Array(vec![low, high]))
            }
            ConditionOp::In(options) => ("in".to_string(), Value::Array(options)),
            ConditionOp::Invalid { operator, value } => (operator, value),
        };
        RuleConditionRaw {
            field: condition.field,
            operator,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRule {
    pub id: String,
    pub api_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Ascending: lower values are evaluated first.
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub conditions: ConditionGroup,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

fn default_enabled() -> bool {
    true
}
