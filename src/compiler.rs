//! Compiler that turns the filter DSL AST into operand trees.

use crate::ast::{Query, FieldFilter, Condition, CompOp, Literal};
use crate::config::FilterConfig;
use crate::error::FilterError;
use crate::operand::{ComplexOperand, Operand, SimpleOperand};
use crate::operator::Operator;
use crate::value::{Scalar, Value};
use log::debug;
use std::collections::HashMap;
use thiserror::Error;

/// Configuration for rewrites applied during compilation
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Minimum number of OR'ed equality conditions before collapsing them into IN
    pub max_or_conditions_for_in: usize,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_or_conditions_for_in: 3,
        }
    }
}

/// Compiler from DSL queries to operands
pub struct FilterCompiler {
    config: RewriteConfig,
    /// Maps DSL field names to API property names
    property_aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("field `{field}`: {source}")]
    Field {
        field: String,
        #[source]
        source: FilterError,
    },
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Represents a rewrite applied during compilation
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// A lower and an upper bound on the same property merged into `between`
    RangeMerged { field: String },
    /// An OR chain of equality conditions collapsed into `IN`
    OrToIn { field: String, value_count: usize },
}

/// Result of compilation with the rewrites that were applied
#[derive(Debug)]
pub struct CompileResult {
    pub operand: Operand,
    pub rewrites: Vec<Rewrite>,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self {
            config: RewriteConfig::default(),
            property_aliases: HashMap::new(),
        }
    }

    pub fn with_config(config: RewriteConfig) -> Self {
        Self {
            config,
            property_aliases: HashMap::new(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            config: RewriteConfig {
                max_or_conditions_for_in: config.max_or_conditions_for_in,
            },
            property_aliases: config.property_aliases.clone(),
        }
    }

    /// Set property aliases for field names
    pub fn set_property_aliases(&mut self, aliases: HashMap<String, String>) {
        self.property_aliases = aliases;
    }

    /// Get the API property name for a field
    fn get_property_name(&self, field: &str) -> String {
        self.property_aliases
            .get(field)
            .cloned()
            .unwrap_or_else(|| field.to_string())
    }

    /// Compile a Query AST into a single operand; field filters are AND'ed
    pub fn compile(&self, query: &Query) -> Result<CompileResult, CompileError> {
        let mut rewrites = Vec::new();
        let mut operands = Vec::new();

        for filter in &query.filters {
            let (operand, mut filter_rewrites) = self.compile_field_filter(filter)?;
            rewrites.append(&mut filter_rewrites);
            operands.push(operand);
        }

        let operand = match operands.len() {
            0 => return Err(FilterError::EmptyExpression(Operator::And).into()),
            1 => operands.remove(0),
            _ => ComplexOperand::new(Operator::And, operands)?.into(),
        };

        Ok(CompileResult { operand, rewrites })
    }

    fn compile_field_filter(&self, filter: &FieldFilter) -> Result<(Operand, Vec<Rewrite>), CompileError> {
        let field = &filter.field.0;
        let base = SimpleOperand::new(self.get_property_name(field));

        self.compile_condition(field, &base, &filter.condition)
            .map_err(|source| CompileError::Field {
                field: field.clone(),
                source,
            })
    }

    /// Compile a single condition against `base`, the bare operand of its field
    fn compile_condition(
        &self,
        field: &str,
        base: &SimpleOperand,
        condition: &Condition,
    ) -> Result<(Operand, Vec<Rewrite>), FilterError> {
        let mut rewrites = Vec::new();

        let operand = match condition {
            Condition::Comparison { op, value } => {
                self.compile_comparison(base, *op, value)?
            }
            Condition::And(left, right) => {
                let (left_operand, mut left_rewrites) = self.compile_condition(field, base, left)?;
                let (right_operand, mut right_rewrites) = self.compile_condition(field, base, right)?;
                rewrites.append(&mut left_rewrites);
                rewrites.append(&mut right_rewrites);

                if let Some(range) = self.try_merge_range(&left_operand, &right_operand)? {
                    debug!("{field}: merged bounds into {:?}", range.operator());
                    rewrites.push(Rewrite::RangeMerged { field: field.to_string() });
                    range.into()
                } else {
                    left_operand.and(right_operand)?
                }
            }
            Condition::Or(left, right) => {
                if let Some((in_operand, rewrite)) = self.try_collapse_or_to_in(field, base, condition)? {
                    rewrites.push(rewrite);
                    in_operand
                } else {
                    let (left_operand, mut left_rewrites) = self.compile_condition(field, base, left)?;
                    let (right_operand, mut right_rewrites) = self.compile_condition(field, base, right)?;
                    rewrites.append(&mut left_rewrites);
                    rewrites.append(&mut right_rewrites);
                    left_operand.or(right_operand)?
                }
            }
            Condition::Not(inner) => {
                let (inner_operand, mut inner_rewrites) = self.compile_condition(field, base, inner)?;
                rewrites.append(&mut inner_rewrites);
                inner_operand.invert()?
            }
            Condition::Grouped(inner) => {
                let (inner_operand, mut inner_rewrites) = self.compile_condition(field, base, inner)?;
                rewrites.append(&mut inner_rewrites);
                inner_operand
            }
            Condition::In(values) => {
                let scalars = values
                    .iter()
                    .map(literal_to_scalar)
                    .collect::<Result<Vec<_>, _>>()?;
                base.equals(scalars)?.into()
            }
            Condition::Like(pattern) => base.like(literal_to_value(pattern)).into(),
            Condition::IsNull => base.is_null().into(),
            Condition::IsNotNull => base.is_not_null().into(),
        };

        Ok((operand, rewrites))
    }

    /// Chain a lower and an upper bound on the same property into one range.
    /// Returns `None` when the two sides are not a matching pair of bounds.
    fn try_merge_range(&self, left: &Operand, right: &Operand) -> Result<Option<SimpleOperand>, FilterError> {
        let (Some(left), Some(right)) = (left.as_simple(), right.as_simple()) else {
            return Ok(None);
        };
        if left.property() != right.property() {
            return Ok(None);
        }
        let (Some(left_op), Some(right_op)) = (left.operator(), right.operator()) else {
            return Ok(None);
        };

        let bound = right.value().clone();
        let merged = match right_op {
            Operator::Lt if left_op.is_lower_bound() => left.less_than(bound)?,
            Operator::Le if left_op.is_lower_bound() => left.less_or_equal(bound)?,
            Operator::Gt if left_op.is_upper_bound() => left.greater_than(bound)?,
            Operator::Ge if left_op.is_upper_bound() => left.greater_or_equal(bound)?,
            _ => return Ok(None),
        };

        Ok(Some(merged))
    }

    /// Try to collapse an OR chain of equality conditions into IN
    fn try_collapse_or_to_in(
        &self,
        field: &str,
        base: &SimpleOperand,
        condition: &Condition,
    ) -> Result<Option<(Operand, Rewrite)>, FilterError> {
        let mut values = Vec::new();
        if !collect_equality_values(condition, &mut values) {
            return Ok(None);
        }

        if values.len() < self.config.max_or_conditions_for_in {
            return Ok(None);
        }

        let scalars = values
            .iter()
            .copied()
            .map(literal_to_scalar)
            .collect::<Result<Vec<_>, _>>()?;
        let value_count = scalars.len();
        debug!("{field}: collapsing {value_count} OR'ed equalities into IN");

        let operand = base.equals(scalars)?.into();
        let rewrite = Rewrite::OrToIn {
            field: field.to_string(),
            value_count,
        };
        Ok(Some((operand, rewrite)))
    }

    fn compile_comparison(&self, base: &SimpleOperand, op: CompOp, literal: &Literal) -> Result<Operand, FilterError> {
        let value = literal_to_value(literal);

        if value.is_null() && !matches!(op, CompOp::Eq | CompOp::NotEq) {
            return Err(FilterError::invalid_value(format!(
                "{op:?} comparison needs a non-null value"
            )));
        }

        let operand = match op {
            CompOp::Eq => base.equals(value)?.into(),
            CompOp::NotEq => base.not_equals(value)?,
            CompOp::Gt => base.greater_than(value)?.into(),
            CompOp::Lt => base.less_than(value)?.into(),
            CompOp::Gte => base.greater_or_equal(value)?.into(),
            CompOp::Lte => base.less_or_equal(value)?.into(),
        };

        Ok(operand)
    }
}

/// Recursively collect equality values from an OR chain. Returns false as
/// soon as anything other than an equality with a non-null value shows up.
fn collect_equality_values<'a>(condition: &'a Condition, values: &mut Vec<&'a Literal>) -> bool {
    match condition {
        Condition::Comparison { op: CompOp::Eq, value } if *value != Literal::Null => {
            values.push(value);
            true
        }
        Condition::Or(left, right) => {
            collect_equality_values(left, values) && collect_equality_values(right, values)
        }
        Condition::Grouped(inner) => collect_equality_values(inner, values),
        _ => false,
    }
}

/// Convert AST Literal to operand Value
fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::from(s.as_str()),
        Literal::Number(n) => Value::from(*n),
        Literal::Float(x) => Value::from(*x),
        Literal::Boolean(b) => Value::from(*b),
        Literal::Null => Value::Null,
    }
}

fn literal_to_scalar(literal: &Literal) -> Result<Scalar, FilterError> {
    literal_to_value(literal)
        .into_bound()?
        .ok_or_else(|| FilterError::invalid_value("null cannot be a member of a value list"))
}
