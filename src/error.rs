//! Errors raised while building, inverting or serializing operands.

use thiserror::Error;

use crate::operator::Operator;

/// Construction and serialization failures of the operand algebra.
///
/// All of these are local failures: nothing is retried and every error
/// propagates synchronously to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// A value has the wrong shape for the requested rewrite, e.g. an empty
    /// collection passed to `equals` or a `BETWEEN` operand without a range.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("cannot invert an operand with no operator set (property `{property}`)")]
    InvalidState { property: String },

    /// The operator has no inverse, or is not a logical operator where one
    /// is required.
    #[error("the '{0}' operator is not valid here")]
    InvalidOperator(Operator),

    /// Every child of a complex operand was null.
    #[error("complex {0} expression has no operands left to serialize")]
    EmptyExpression(Operator),

    #[error("unsupported operand: {0}")]
    UnsupportedOperand(String),
}

impl FilterError {
    pub(crate) fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperand(message.into())
    }
}
