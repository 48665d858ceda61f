//! Shared error types for value coercion and branch rule evaluation.
//!
//! Defined in `qtiforge-core` so both the compiler and the delivery runtime
//! can match on concrete failure kinds without string matching. Compilation
//! errors live in `qtiforge-compiler`, sequencing errors in
//! `qtiforge-runner`; both wrap these where a coercion or rule failure is
//! the underlying cause.

use thiserror::Error;

use crate::model::BaseType;

/// Errors that can occur when coercing a single client value.
#[derive(Debug, Error)]
pub enum CoercionError {
    /// The base type token is not one of the nine recognized kinds.
    #[error("unsupported base type '{0}'")]
    UnsupportedBaseType(String),

    /// A point/pair/directedPair value needs exactly two components.
    #[error("{base_type} value expects a 2-element input, got {got} element(s)")]
    ExpectedPair { base_type: BaseType, got: usize },

    /// A scalar base type received an array input.
    #[error("{base_type} value expects a scalar input")]
    ExpectedScalar { base_type: BaseType },

    /// The client submitted no value at all.
    #[error("no value provided")]
    EmptyInput,
}

/// Errors that can occur when filling a declared variable.
#[derive(Debug, Error)]
pub enum FillError {
    /// The identifier is in neither the response nor the outcome
    /// declarations of the item.
    #[error("no variable declaration '{identifier}' found in '{item}'")]
    VariableNotDeclared { identifier: String, item: String },

    /// An element of the client value failed coercion; the partially built
    /// variable is discarded.
    #[error("failed to fill variable '{identifier}' from the client value")]
    ValueCoercionFailed {
        identifier: String,
        #[source]
        source: CoercionError,
    },
}

/// Errors raised by a malformed branch rule.
///
/// Whether these abort navigation or fall through to the default linear
/// order is decided by the session's [`crate::branch::BranchRulePolicy`].
#[derive(Debug, Error)]
pub enum BranchRuleError {
    /// An `and`/`or` expression with no operands.
    #[error("branch rule '{0}' expression has no operands")]
    MissingOperands(&'static str),

    /// A logical operator was given a non-boolean operand.
    #[error("branch rule '{0}' expression expects boolean operands")]
    ExpectedBoolean(&'static str),

    /// The rule root did not evaluate to a boolean.
    #[error("branch rule expression must evaluate to a boolean")]
    NonBooleanRoot,

    /// The rule redirects to an item that does not exist in the test.
    #[error("branch rule target '{0}' does not exist in the test")]
    UnknownTarget(String),
}
