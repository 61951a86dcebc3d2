//! Operators understood by the remote search API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FilterError;

/// The closed set of operators, serialized as the API's operator codes.
///
/// The comparison family is attached to leaf operands as `SimpleOperator`,
/// the logical family (`AND`, `OR`) to internal nodes as `LogicalOperator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // Comparison
    #[serde(rename = "equals")]
    Eq,
    #[serde(rename = "notEquals")]
    Ne,
    #[serde(rename = "greaterThan")]
    Gt,
    #[serde(rename = "greaterThanOrEqual")]
    Ge,
    #[serde(rename = "lessThan")]
    Lt,
    #[serde(rename = "lessThanOrEqual")]
    Le,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "isNull")]
    IsNull,
    #[serde(rename = "isNotNull")]
    IsNotNull,

    // Logical
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Operator {
    /// The operator code as it appears on the wire.
    pub const fn code(self) -> &'static str {
        match self {
            Operator::Eq => "equals",
            Operator::Ne => "notEquals",
            Operator::Gt => "greaterThan",
            Operator::Ge => "greaterThanOrEqual",
            Operator::Lt => "lessThan",
            Operator::Le => "lessThanOrEqual",
            Operator::In => "IN",
            Operator::Like => "like",
            Operator::Between => "between",
            Operator::IsNull => "isNull",
            Operator::IsNotNull => "isNotNull",
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }

    /// `GT` / `GE`: the operand holds a lower bound.
    pub const fn is_lower_bound(self) -> bool {
        matches!(self, Operator::Gt | Operator::Ge)
    }

    /// `LT` / `LE`: the operand holds an upper bound.
    pub const fn is_upper_bound(self) -> bool {
        matches!(self, Operator::Lt | Operator::Le)
    }

    /// Looks up the negation of a comparison operator.
    ///
    /// `IN`, `LIKE`, `BETWEEN` and the logical operators have no table entry;
    /// negating `IN` and `BETWEEN` is handled by rewriting the operand instead.
    pub fn invert(self) -> Result<Operator, FilterError> {
        let inverse = match self {
            Operator::IsNull => Operator::IsNotNull,
            Operator::IsNotNull => Operator::IsNull,
            Operator::Eq => Operator::Ne,
            Operator::Ne => Operator::Eq,
            Operator::Lt => Operator::Ge,
            Operator::Ge => Operator::Lt,
            Operator::Le => Operator::Gt,
            Operator::Gt => Operator::Le,
            _ => return Err(FilterError::InvalidOperator(self)),
        };
        Ok(inverse)
    }

    /// Flips `AND` and `OR`; comparison operators are returned as-is.
    pub(crate) const fn dual(self) -> Operator {
        match self {
            Operator::And => Operator::Or,
            Operator::Or => Operator::And,
            other => other,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
