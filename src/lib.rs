//! Builder for search filter expressions.
//!
//! Filters are assembled from [`SimpleOperand`] leaves and combined into
//! [`ComplexOperand`] trees, then serialized into the nested
//! `LeftOperand / LogicalOperator / RightOperand` object the search API
//! consumes. A small textual DSL (`Filter: Age[>=18 AND <65]`) compiles into
//! the same operands.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod error;
pub mod filter;
pub mod lexer;
pub mod operand;
pub mod operator;
pub mod parser;
pub mod token;
pub mod value;

pub use error::FilterError;
pub use filter::{ComplexFilter, Filter, SimpleFilter};
pub use operand::{combine, ComplexOperand, Operand, OperandInput, SimpleOperand, NULL_SENTINEL};
pub use operator::Operator;
pub use value::{Scalar, Value};
