//! Branch rule representation and evaluation.
//!
//! A branch rule is a predicate tree over declared response values. When
//! the predicate holds after an item is answered, navigation jumps to the
//! rule's target item instead of the next item in document order.
//! Evaluation is pure: it reads the response store (falling back to
//! in-flight navigation parameters) and never mutates anything.

use serde::{Deserialize, Serialize};

use crate::error::BranchRuleError;
use crate::responses::{response_key, NavigationParams, ResponseStore};

/// A response-dependent navigation override attached to an item reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchRule {
    /// The item to jump to when the expression holds.
    pub target: String,
    /// The predicate tree.
    pub expression: Expression,
}

/// A node of the branch rule predicate tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Expression {
    /// True when both operands evaluate to the same value set.
    Match {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    And {
        #[serde(default)]
        operands: Vec<Expression>,
    },
    Or {
        #[serde(default)]
        operands: Vec<Expression>,
    },
    Not { operand: Box<Expression> },
    /// The responses given for a variable. Unqualified identifiers are
    /// scoped to the item the rule is attached to.
    Variable { identifier: String },
    /// The responses considered correct for a variable.
    Correct { identifier: String },
    /// A literal value.
    BaseValue { value: String },
}

/// What to do when a malformed branch rule fails to evaluate.
///
/// The historical engines disagreed on this, so it is a per-session choice
/// rather than a hard-coded behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchRulePolicy {
    /// Log the failure and continue in default document order.
    #[default]
    FallThrough,
    /// Abort the in-flight navigation operation.
    Abort,
}

enum ExprValue {
    Bool(bool),
    Set(Vec<String>),
}

/// Evaluate a branch rule for the item it is attached to.
///
/// Returns the target item identifier when the predicate holds, `None` to
/// fall through to default linear order. Variable lookups consult the
/// response store first and fall back to the in-flight `params` for
/// responses that have not been stored yet.
pub fn evaluate(
    rule: &BranchRule,
    current_item: &str,
    params: &NavigationParams,
    store: &ResponseStore,
) -> Result<Option<String>, BranchRuleError> {
    match eval_expression(&rule.expression, current_item, params, store)? {
        ExprValue::Bool(true) => Ok(Some(rule.target.clone())),
        ExprValue::Bool(false) => Ok(None),
        ExprValue::Set(_) => Err(BranchRuleError::NonBooleanRoot),
    }
}

fn eval_expression(
    expression: &Expression,
    current_item: &str,
    params: &NavigationParams,
    store: &ResponseStore,
) -> Result<ExprValue, BranchRuleError> {
    match expression {
        Expression::Match { left, right } => {
            let left = eval_expression(left, current_item, params, store)?;
            let right = eval_expression(right, current_item, params, store)?;
            Ok(ExprValue::Bool(values_match(&left, &right)))
        }
        Expression::And { operands } => {
            if operands.is_empty() {
                return Err(BranchRuleError::MissingOperands("and"));
            }
            let mut result = true;
            for operand in operands {
                result &= expect_bool(
                    eval_expression(operand, current_item, params, store)?,
                    "and",
                )?;
            }
            Ok(ExprValue::Bool(result))
        }
        Expression::Or { operands } => {
            if operands.is_empty() {
                return Err(BranchRuleError::MissingOperands("or"));
            }
            let mut result = false;
            for operand in operands {
                result |= expect_bool(
                    eval_expression(operand, current_item, params, store)?,
                    "or",
                )?;
            }
            Ok(ExprValue::Bool(result))
        }
        Expression::Not { operand } => {
            let value = expect_bool(
                eval_expression(operand, current_item, params, store)?,
                "not",
            )?;
            Ok(ExprValue::Bool(!value))
        }
        Expression::Variable { identifier } => {
            let key = qualify(identifier, current_item);
            let stored = store.responses(&key);
            if !stored.is_empty() {
                return Ok(ExprValue::Set(stored.to_vec()));
            }
            Ok(ExprValue::Set(in_flight_responses(&key, params)))
        }
        Expression::Correct { identifier } => {
            let key = qualify(identifier, current_item);
            Ok(ExprValue::Set(store.correct_responses(&key).to_vec()))
        }
        Expression::BaseValue { value } => Ok(ExprValue::Set(vec![value.clone()])),
    }
}

fn expect_bool(value: ExprValue, operator: &'static str) -> Result<bool, BranchRuleError> {
    match value {
        ExprValue::Bool(b) => Ok(b),
        ExprValue::Set(_) => Err(BranchRuleError::ExpectedBoolean(operator)),
    }
}

/// Set comparison is order-insensitive; an empty set never matches.
fn values_match(left: &ExprValue, right: &ExprValue) -> bool {
    match (left, right) {
        (ExprValue::Bool(a), ExprValue::Bool(b)) => a == b,
        (ExprValue::Set(a), ExprValue::Set(b)) => {
            if a.is_empty() || b.is_empty() {
                return false;
            }
            let mut a = a.clone();
            let mut b = b.clone();
            a.sort();
            b.sort();
            a == b
        }
        _ => false,
    }
}

/// Scope an unqualified response identifier to the current item.
fn qualify(identifier: &str, current_item: &str) -> String {
    if identifier.contains('.') {
        identifier.to_string()
    } else {
        response_key(current_item, identifier)
    }
}

/// Look a composite key up in the not-yet-stored navigation parameters.
fn in_flight_responses(key: &str, params: &NavigationParams) -> Vec<String> {
    let Some((item, response)) = key.split_once('.') else {
        return Vec::new();
    };
    if params.item.as_deref() != Some(item) {
        return Vec::new();
    }
    params
        .responses
        .get(response)
        .cloned()
        .unwrap_or_default()
}
