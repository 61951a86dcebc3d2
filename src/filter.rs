//! The nested filter object consumed by the remote search API.
//!
//! ```text
//! SimpleFilter  = { Property, SimpleOperator, Value }
//! ComplexFilter = { LeftOperand, LogicalOperator, RightOperand, AdditionalOperands? }
//! ```
//!
//! Field names and operator codes are consumed verbatim by the API.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::operand::{ComplexOperand, Operand, SimpleOperand};
use crate::operator::Operator;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Complex(ComplexFilter),
    Simple(SimpleFilter),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimpleFilter {
    pub property: String,
    pub simple_operator: Option<Operator>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComplexFilter {
    pub left_operand: Box<Filter>,
    pub logical_operator: Operator,
    pub right_operand: Box<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_operands: Vec<Filter>,
}

impl SimpleOperand {
    /// The leaf as it goes on the wire. `BETWEEN` and `IN` values are
    /// checked for shape and non-finite floats are rejected; everything else
    /// is passed through verbatim.
    pub fn to_filter(&self) -> Result<SimpleFilter, FilterError> {
        self.value().check_finite()?;
        match (self.operator(), self.value()) {
            (Some(Operator::Between), Value::Range(..)) => {}
            (Some(Operator::In), Value::List(items)) if !items.is_empty() => {}
            (Some(op @ (Operator::Between | Operator::In)), other) => {
                return Err(FilterError::invalid_value(format!(
                    "`{}` has malformed {op} value {other}",
                    self.property()
                )));
            }
            _ => {}
        }

        Ok(SimpleFilter {
            property: self.property().to_string(),
            simple_operator: self.operator(),
            value: self.value().clone(),
        })
    }
}

impl ComplexOperand {
    /// Serializes the present children in order. One survivor is returned
    /// as-is; two or more fill `LeftOperand`, `RightOperand` and then
    /// `AdditionalOperands`.
    pub fn to_filter(&self) -> Result<Filter, FilterError> {
        // Children are flat from construction.
        let mut children = self
            .present()
            .map(Operand::to_filter)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();

        let Some(left) = children.next() else {
            return Err(FilterError::EmptyExpression(self.operator()));
        };
        let Some(right) = children.next() else {
            debug!("collapsing single-operand {} expression", self.operator());
            return Ok(left);
        };

        Ok(Filter::Complex(ComplexFilter {
            left_operand: Box::new(left),
            logical_operator: self.operator(),
            right_operand: Box::new(right),
            additional_operands: children.collect(),
        }))
    }
}

impl Operand {
    pub fn to_filter(&self) -> Result<Filter, FilterError> {
        match self {
            Operand::Simple(simple) => simple.to_filter().map(Filter::Simple),
            Operand::Complex(complex) => complex.to_filter(),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, FilterError> {
        let filter = self.to_filter()?;
        serde_json::to_value(filter).map_err(|e| FilterError::invalid_value(e.to_string()))
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String, FilterError> {
        let filter = self.to_filter()?;
        let rendered = if pretty {
            serde_json::to_string_pretty(&filter)
        } else {
            serde_json::to_string(&filter)
        };
        rendered.map_err(|e| FilterError::invalid_value(e.to_string()))
    }
}

impl From<SimpleFilter> for SimpleOperand {
    fn from(filter: SimpleFilter) -> Self {
        // A decoded `between` pair arrives as a list when both bounds are set.
        let value = match (filter.simple_operator, filter.value) {
            (Some(Operator::Between), Value::List(mut bounds)) if bounds.len() == 2 => {
                let upper = bounds.pop();
                let lower = bounds.pop();
                Value::Range(lower, upper)
            }
            (_, value) => value,
        };
        SimpleOperand::with(filter.property, filter.simple_operator, value)
    }
}

impl From<Filter> for Operand {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Simple(simple) => SimpleOperand::from(simple).into(),
            Filter::Complex(complex) => {
                let children = [*complex.left_operand, *complex.right_operand]
                    .into_iter()
                    .chain(complex.additional_operands)
                    .map(|child| Some(Operand::from(child)));
                ComplexOperand::flat(complex.logical_operator, children).into()
            }
        }
    }
}
