//! The operand algebra.
//!
//! A filter expression is a tree of [`Operand`]s: leaves are
//! [`SimpleOperand`]s (property, comparison operator, value) and internal
//! nodes are [`ComplexOperand`]s (`AND` / `OR` over an ordered list of
//! children). Every operation here is a pure rewrite: it returns a new
//! operand and leaves its receiver untouched, so the same operand can be
//! reused in several expressions.
//!
//! ```text
//! SimpleOperand::new("Age")
//!   .greater_than(18)   -> { greaterThan, 18 }
//!   .less_than(65)      -> { between, [18, 65] }
//!   .invert()           -> OR({ lessThan, 18 }, { greaterThan, 65 })
//! ```

use log::trace;
use std::collections::BTreeMap;
use std::ops::{BitAnd, BitOr};

use crate::error::FilterError;
use crate::operator::Operator;
use crate::value::{Scalar, Value};

/// The API represents "null" as the empty string; `isNull` / `isNotNull`
/// conditions always carry it as their value.
pub const NULL_SENTINEL: &str = "";

/// A node of the filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Simple(SimpleOperand),
    Complex(ComplexOperand),
}

/// A leaf condition on a single property.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleOperand {
    property: String,
    operator: Option<Operator>,
    value: Value,
}

/// An `AND` / `OR` node.
///
/// Direct children never include a complex operand with the same logical
/// operator: such children are spliced in at construction. A `None` child is
/// a condition that was absorbed (for example the open side of a range) and
/// is skipped when serializing.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexOperand {
    operator: Operator,
    operands: Vec<Option<Operand>>,
}

/// Anything that can take part in an `AND` / `OR` combination.
#[derive(Debug, Clone, PartialEq)]
pub enum OperandInput {
    Operand(Operand),
    /// Property → value pairs, each read as an equality condition.
    Mapping(BTreeMap<String, Value>),
}

impl SimpleOperand {
    /// An operand on `property` with no condition yet.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            operator: None,
            value: Value::Null,
        }
    }

    /// Builds a leaf in an arbitrary state. No shape checks are made here;
    /// malformed values surface when the operand is inverted or serialized.
    pub fn with(property: impl Into<String>, operator: Option<Operator>, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn operator(&self) -> Option<Operator> {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn replace(&self, operator: Operator, value: Value) -> Self {
        Self {
            property: self.property.clone(),
            operator: Some(operator),
            value,
        }
    }

    /// Same property, no condition.
    fn fresh(&self) -> Self {
        Self::new(self.property.clone())
    }

    /// Equality against a scalar, or set membership against a list.
    ///
    /// `null` turns into [`is_null`](Self::is_null), a one-element list
    /// collapses to plain equality and longer lists become `IN`.
    pub fn equals(&self, value: impl Into<Value>) -> Result<Self, FilterError> {
        match value.into() {
            Value::Null => Ok(self.is_null()),
            Value::List(mut items) => {
                if items.len() > 1 {
                    return Ok(self.replace(Operator::In, Value::List(items)));
                }
                match items.pop() {
                    Some(sole) => self.equals(sole),
                    None => Err(FilterError::invalid_value(
                        "collection length must be greater than or equal to 1",
                    )),
                }
            }
            Value::Range(..) => Err(FilterError::invalid_value(
                "a range cannot be used as an equality value",
            )),
            scalar @ Value::Scalar(_) => Ok(self.replace(Operator::Eq, scalar)),
        }
    }

    /// The negation of [`equals`](Self::equals). Negating a list yields an
    /// `AND` of `notEquals` conditions.
    pub fn not_equals(&self, value: impl Into<Value>) -> Result<Operand, FilterError> {
        self.equals(value)?.invert()
    }

    pub fn is_not_null(&self) -> Self {
        self.replace(Operator::IsNotNull, Value::from(NULL_SENTINEL))
    }

    /// Same as inverting [`is_not_null`](Self::is_not_null).
    pub fn is_null(&self) -> Self {
        self.replace(Operator::IsNull, Value::from(NULL_SENTINEL))
    }

    pub fn like(&self, pattern: impl Into<Value>) -> Self {
        self.replace(Operator::Like, pattern.into())
    }

    pub fn less_than(&self, value: impl Into<Value>) -> Result<Self, FilterError> {
        self.chain_upper(Operator::Lt, value.into())
    }

    pub fn less_or_equal(&self, value: impl Into<Value>) -> Result<Self, FilterError> {
        self.chain_upper(Operator::Le, value.into())
    }

    pub fn greater_than(&self, value: impl Into<Value>) -> Result<Self, FilterError> {
        self.chain_lower(Operator::Gt, value.into())
    }

    pub fn greater_or_equal(&self, value: impl Into<Value>) -> Result<Self, FilterError> {
        self.chain_lower(Operator::Ge, value.into())
    }

    /// Applies an upper bound (`LT` / `LE`).
    ///
    /// An existing range is first reduced to its lower bound, so the new
    /// value replaces the old upper bound; a `null` value then deletes it.
    /// An existing lower bound combines with the new value into `BETWEEN`.
    fn chain_upper(&self, op: Operator, value: Value) -> Result<Self, FilterError> {
        if self.operator == Some(Operator::Between) {
            let (lower, _) = self.range()?;
            let reduced = self.replace(op.invert()?, lower.into());
            trace!("{}: reduced range to {:?} before {}", self.property, reduced.value, op);
            return reduced.chain_upper(op, value);
        }

        if value.is_null() {
            return Ok(self.clone());
        }

        match self.operator {
            Some(current) if current.is_lower_bound() => {
                let lower = self.value.clone().into_bound()?;
                let upper = value.into_bound()?;
                trace!("{}: {} + {} -> between", self.property, current, op);
                Ok(self.replace(Operator::Between, Value::Range(lower, upper)))
            }
            _ => Ok(self.replace(op, value)),
        }
    }

    /// Mirror of [`chain_upper`](Self::chain_upper) for `GT` / `GE`.
    fn chain_lower(&self, op: Operator, value: Value) -> Result<Self, FilterError> {
        if self.operator == Some(Operator::Between) {
            let (_, upper) = self.range()?;
            let reduced = self.replace(op.invert()?, upper.into());
            trace!("{}: reduced range to {:?} before {}", self.property, reduced.value, op);
            return reduced.chain_lower(op, value);
        }

        if value.is_null() {
            return Ok(self.clone());
        }

        match self.operator {
            Some(current) if current.is_upper_bound() => {
                let lower = value.into_bound()?;
                let upper = self.value.clone().into_bound()?;
                trace!("{}: {} + {} -> between", self.property, current, op);
                Ok(self.replace(Operator::Between, Value::Range(lower, upper)))
            }
            _ => Ok(self.replace(op, value)),
        }
    }

    fn range(&self) -> Result<(Option<Scalar>, Option<Scalar>), FilterError> {
        match &self.value {
            Value::Range(lower, upper) => Ok((lower.clone(), upper.clone())),
            other => Err(FilterError::invalid_value(format!(
                "`{}` between value must be a [lower, upper] pair, found {other}",
                self.property
            ))),
        }
    }

    /// Negates this condition.
    ///
    /// - `between [a, b]` becomes `lessThan a OR greaterThan b`; an open
    ///   bound leaves a `None` child in its place.
    /// - `IN [v1..vn]` becomes `notEquals v1 AND .. AND notEquals vn`.
    /// - everything else swaps its operator through the inversion table.
    pub fn invert(&self) -> Result<Operand, FilterError> {
        let Some(operator) = self.operator else {
            return Err(FilterError::InvalidState {
                property: self.property.clone(),
            });
        };

        match operator {
            Operator::Between => {
                let (lower, upper) = self.range()?;
                let fresh = self.fresh();
                let below = lower.map(|v| fresh.less_than(v)).transpose()?;
                let above = upper.map(|v| fresh.greater_than(v)).transpose()?;
                trace!("{}: inverting range into OR", self.property);
                Ok(ComplexOperand::flat(
                    Operator::Or,
                    vec![below.map(Operand::from), above.map(Operand::from)],
                )
                .into())
            }
            Operator::In => {
                let items = match &self.value {
                    Value::List(items) if !items.is_empty() => items,
                    other => {
                        return Err(FilterError::invalid_value(format!(
                            "`{}` IN value must be a non-empty list, found {other}",
                            self.property
                        )))
                    }
                };
                let negated = items
                    .iter()
                    .map(|item| self.not_equals(item.clone()).map(Some))
                    .collect::<Result<Vec<_>, _>>()?;
                trace!("{}: inverting IN into AND of {} conditions", self.property, negated.len());
                Ok(ComplexOperand::flat(Operator::And, negated).into())
            }
            _ => Ok(self.replace(operator.invert()?, self.value.clone()).into()),
        }
    }

    pub fn and(&self, other: impl Into<OperandInput>) -> Result<Operand, FilterError> {
        combine(Operator::And, self.clone(), other)
    }

    pub fn or(&self, other: impl Into<OperandInput>) -> Result<Operand, FilterError> {
        combine(Operator::Or, self.clone(), other)
    }
}

impl ComplexOperand {
    /// Combines `operands` under `operator`, which must be `AND` or `OR`.
    pub fn new<I, T>(operator: Operator, operands: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Option<Operand>>,
    {
        if !operator.is_logical() {
            return Err(FilterError::InvalidOperator(operator));
        }
        Ok(Self::flat(operator, operands.into_iter().map(Into::into)))
    }

    pub(crate) fn flat(operator: Operator, operands: impl IntoIterator<Item = Option<Operand>>) -> Self {
        Self {
            operator,
            operands: Self::flatten(operator, operands),
        }
    }

    /// Splices the children of every same-operator complex operand into one
    /// ordered list, recursively.
    pub fn flatten(operator: Operator, operands: impl IntoIterator<Item = Option<Operand>>) -> Vec<Option<Operand>> {
        let mut flat = Vec::new();
        flatten_into(operator, operands, &mut flat);
        flat
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operands(&self) -> &[Option<Operand>] {
        &self.operands
    }

    /// Children that were not absorbed.
    pub fn present(&self) -> impl Iterator<Item = &Operand> {
        self.operands.iter().flatten()
    }

    /// De Morgan: flip the logical operator and negate every child.
    fn invert(&self) -> Result<Self, FilterError> {
        let negated = self
            .operands
            .iter()
            .map(|operand| operand.as_ref().map(Operand::invert).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::flat(self.operator.dual(), negated))
    }
}

fn flatten_into(operator: Operator, operands: impl IntoIterator<Item = Option<Operand>>, flat: &mut Vec<Option<Operand>>) {
    for operand in operands {
        match operand {
            Some(Operand::Complex(complex)) if complex.operator == operator => {
                flatten_into(operator, complex.operands, flat);
            }
            other => flat.push(other),
        }
    }
}

impl Operand {
    pub fn invert(&self) -> Result<Operand, FilterError> {
        match self {
            Operand::Simple(simple) => simple.invert(),
            Operand::Complex(complex) => complex.invert().map(Operand::Complex),
        }
    }

    pub fn and(&self, other: impl Into<OperandInput>) -> Result<Operand, FilterError> {
        combine(Operator::And, self.clone(), other)
    }

    pub fn or(&self, other: impl Into<OperandInput>) -> Result<Operand, FilterError> {
        combine(Operator::Or, self.clone(), other)
    }

    pub fn as_simple(&self) -> Option<&SimpleOperand> {
        match self {
            Operand::Simple(simple) => Some(simple),
            Operand::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ComplexOperand> {
        match self {
            Operand::Complex(complex) => Some(complex),
            Operand::Simple(_) => None,
        }
    }
}

/// Combines two operands under a logical operator, coercing property
/// mappings into equality conditions first.
pub fn combine(
    operator: Operator,
    left: impl Into<OperandInput>,
    right: impl Into<OperandInput>,
) -> Result<Operand, FilterError> {
    let left = left.into().into_operand()?;
    let right = right.into().into_operand()?;
    Ok(ComplexOperand::new(operator, [left, right])?.into())
}

impl OperandInput {
    pub fn into_operand(self) -> Result<Operand, FilterError> {
        match self {
            OperandInput::Operand(operand) => Ok(operand),
            OperandInput::Mapping(mapping) => {
                let mut leaves = mapping
                    .into_iter()
                    .map(|(property, value)| SimpleOperand::new(property).equals(value).map(Operand::from))
                    .collect::<Result<Vec<_>, _>>()?;
                match leaves.len() {
                    0 => Err(FilterError::unsupported("empty property mapping")),
                    1 => Ok(leaves.remove(0)),
                    _ => Ok(ComplexOperand::flat(Operator::And, leaves.into_iter().map(Some)).into()),
                }
            }
        }
    }
}

impl From<Operand> for OperandInput {
    fn from(operand: Operand) -> Self {
        OperandInput::Operand(operand)
    }
}

impl From<SimpleOperand> for OperandInput {
    fn from(operand: SimpleOperand) -> Self {
        OperandInput::Operand(operand.into())
    }
}

impl From<ComplexOperand> for OperandInput {
    fn from(operand: ComplexOperand) -> Self {
        OperandInput::Operand(operand.into())
    }
}

impl From<BTreeMap<String, Value>> for OperandInput {
    fn from(mapping: BTreeMap<String, Value>) -> Self {
        OperandInput::Mapping(mapping)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for OperandInput {
    fn from(pairs: [(K, V); N]) -> Self {
        OperandInput::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl TryFrom<serde_json::Value> for OperandInput {
    type Error = FilterError;

    /// Accepts a JSON object of property → value pairs.
    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(object) = json else {
            return Err(FilterError::unsupported(format!(
                "expected an operand or a property mapping, found `{json}`"
            )));
        };

        let mut mapping = BTreeMap::new();
        for (property, value) in object {
            let value: Value = serde_json::from_value(value)
                .map_err(|e| FilterError::unsupported(format!("property `{property}`: {e}")))?;
            mapping.insert(property, value);
        }
        Ok(OperandInput::Mapping(mapping))
    }
}

impl From<SimpleOperand> for Operand {
    fn from(operand: SimpleOperand) -> Self {
        Operand::Simple(operand)
    }
}

impl From<ComplexOperand> for Operand {
    fn from(operand: ComplexOperand) -> Self {
        Operand::Complex(operand)
    }
}

impl BitAnd for Operand {
    type Output = Operand;

    fn bitand(self, rhs: Self) -> Self::Output {
        ComplexOperand::flat(Operator::And, [Some(self), Some(rhs)]).into()
    }
}

impl BitOr for Operand {
    type Output = Operand;

    fn bitor(self, rhs: Self) -> Self::Output {
        ComplexOperand::flat(Operator::Or, [Some(self), Some(rhs)]).into()
    }
}

impl BitAnd for &Operand {
    type Output = Operand;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.clone() & rhs.clone()
    }
}

impl BitOr for &Operand {
    type Output = Operand;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.clone() | rhs.clone()
    }
}

impl BitAnd for SimpleOperand {
    type Output = Operand;

    fn bitand(self, rhs: Self) -> Self::Output {
        Operand::from(self) & Operand::from(rhs)
    }
}

impl BitOr for SimpleOperand {
    type Output = Operand;

    fn bitor(self, rhs: Self) -> Self::Output {
        Operand::from(self) | Operand::from(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn age() -> SimpleOperand {
        SimpleOperand::new("Age")
    }

    fn leaf(property: &str, operator: Operator, value: impl Into<Value>) -> Operand {
        SimpleOperand::with(property, Some(operator), value).into()
    }

    fn int_range(lower: i64, upper: i64) -> Value {
        Value::Range(Some(Scalar::Integer(lower)), Some(Scalar::Integer(upper)))
    }

    #[test]
    fn test_equals_scalar() {
        let status = SimpleOperand::new("Status").equals("Open").unwrap();
        assert_eq!(status.operator(), Some(Operator::Eq));
        assert_eq!(status.value(), &Value::from("Open"));
        assert_eq!(status.property(), "Status");
    }

    #[test]
    fn test_equals_null_is_null() {
        let status = SimpleOperand::new("Status").equals(None::<i64>).unwrap();
        assert_eq!(status.operator(), Some(Operator::IsNull));
        assert_eq!(status.value(), &Value::from(NULL_SENTINEL));
    }

    #[test]
    fn test_equals_collections() {
        let empty: Vec<i64> = vec![];
        assert!(matches!(age().equals(empty), Err(FilterError::InvalidValue(_))));

        assert_eq!(age().equals(vec![30]).unwrap(), age().equals(30).unwrap());

        let pair = age().equals([30, 40]).unwrap();
        assert_eq!(pair.operator(), Some(Operator::In));
        assert_eq!(pair.value(), &Value::from(vec![30, 40]));
    }

    #[test]
    fn test_equals_rejects_range() {
        assert!(matches!(age().equals(int_range(1, 2)), Err(FilterError::InvalidValue(_))));
    }

    #[test]
    fn test_is_null_matches_inverted_is_not_null() {
        let inverted = age().is_not_null().invert().unwrap();
        assert_eq!(inverted, Operand::from(age().is_null()));
    }

    #[test]
    fn test_not_equals() {
        assert_eq!(age().not_equals(30).unwrap(), leaf("Age", Operator::Ne, 30));
        assert_eq!(age().not_equals(None::<i64>).unwrap(), Operand::from(age().is_not_null()));
    }

    #[test]
    fn test_like_overwrites_state() {
        let name = SimpleOperand::new("Name").equals("x").unwrap().like("%smith%");
        assert_eq!(name.operator(), Some(Operator::Like));
        assert_eq!(name.value(), &Value::from("%smith%"));
    }

    #[test]
    fn test_range_from_two_comparisons() {
        let range = age().greater_than(18).unwrap().less_than(65).unwrap();
        assert_eq!(range.operator(), Some(Operator::Between));
        assert_eq!(range.value(), &int_range(18, 65));
    }

    #[test]
    fn test_range_is_order_independent() {
        let a = age().greater_or_equal(18).unwrap().less_or_equal(65).unwrap();
        let b = age().less_or_equal(65).unwrap().greater_or_equal(18).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.value(), &int_range(18, 65));
    }

    #[test]
    fn test_same_direction_replaces_bound() {
        let lt = age().less_than(65).unwrap().less_or_equal(70).unwrap();
        assert_eq!(lt.operator(), Some(Operator::Le));
        assert_eq!(lt.value(), &Value::from(70));
    }

    #[test]
    fn test_chaining_on_range_updates_one_bound() {
        let range = age().greater_than(18).unwrap().less_than(65).unwrap();

        let upper = range.less_than(30).unwrap();
        assert_eq!(upper.operator(), Some(Operator::Between));
        assert_eq!(upper.value(), &int_range(18, 30));

        let lower = range.greater_than(21).unwrap();
        assert_eq!(lower.operator(), Some(Operator::Between));
        assert_eq!(lower.value(), &int_range(21, 65));
    }

    // Deleting a bound only works by calling the comparator for the side
    // being removed with `null`; the result is keyed to the surviving side.
    #[test]
    fn test_null_argument_deletes_one_range_bound() {
        let range = age().greater_than(18).unwrap().less_than(65).unwrap();

        let without_upper = range.less_than(None::<i64>).unwrap();
        assert_eq!(without_upper.operator(), Some(Operator::Ge));
        assert_eq!(without_upper.value(), &Value::from(18));

        let without_lower = range.greater_than(None::<i64>).unwrap();
        assert_eq!(without_lower.operator(), Some(Operator::Le));
        assert_eq!(without_lower.value(), &Value::from(65));
    }

    // The inclusive comparators reduce through their inverse, so the
    // surviving bound comes back strict.
    #[test]
    fn test_inclusive_null_argument_leaves_strict_bound() {
        let range = age().greater_or_equal(18).unwrap().less_or_equal(65).unwrap();

        let without_upper = range.less_or_equal(None::<i64>).unwrap();
        assert_eq!(without_upper.operator(), Some(Operator::Gt));
        assert_eq!(without_upper.value(), &Value::from(18));

        let without_lower = range.greater_or_equal(None::<i64>).unwrap();
        assert_eq!(without_lower.operator(), Some(Operator::Lt));
        assert_eq!(without_lower.value(), &Value::from(65));

        let narrowed = range.less_or_equal(30).unwrap();
        assert_eq!(narrowed.operator(), Some(Operator::Between));
        assert_eq!(narrowed.value(), &int_range(18, 30));
    }

    #[test]
    fn test_null_argument_without_range_is_noop() {
        let eq = age().equals(30).unwrap();
        assert_eq!(eq.less_than(None::<i64>).unwrap(), eq);
        assert_eq!(age().greater_than(None::<i64>).unwrap(), age());
    }

    #[test]
    fn test_malformed_between_is_invalid_value() {
        let broken = SimpleOperand::with("Age", Some(Operator::Between), 5);
        assert!(matches!(broken.less_than(3), Err(FilterError::InvalidValue(_))));
        assert!(matches!(broken.invert(), Err(FilterError::InvalidValue(_))));
    }

    #[test]
    fn test_rewrites_leave_receiver_untouched() {
        let base = age().greater_than(18).unwrap();
        let teen = base.less_than(20).unwrap();
        let adult = base.less_than(65).unwrap();
        assert_eq!(base.operator(), Some(Operator::Gt));
        assert_eq!(teen.value(), &int_range(18, 20));
        assert_eq!(adult.value(), &int_range(18, 65));
    }

    #[test]
    fn test_invert_between() {
        let range = age().greater_than(18).unwrap().less_than(65).unwrap();
        let inverted = range.invert().unwrap();
        let complex = inverted.as_complex().unwrap();
        assert_eq!(complex.operator(), Operator::Or);
        assert_eq!(
            complex.operands(),
            &[Some(leaf("Age", Operator::Lt, 18)), Some(leaf("Age", Operator::Gt, 65))]
        );
    }

    #[test]
    fn test_invert_open_range_leaves_null_child() {
        let open = SimpleOperand::with("Age", Some(Operator::Between), Value::Range(None, Some(Scalar::Integer(65))));
        let inverted = open.invert().unwrap();
        let complex = inverted.as_complex().unwrap();
        assert_eq!(complex.operands(), &[None, Some(leaf("Age", Operator::Gt, 65))]);
    }

    #[test]
    fn test_invert_in() {
        let inverted = age().equals([1, 2, 3]).unwrap().invert().unwrap();
        let complex = inverted.as_complex().unwrap();
        assert_eq!(complex.operator(), Operator::And);
        let expected: Vec<_> = [1, 2, 3].into_iter().map(|v| Some(leaf("Age", Operator::Ne, v))).collect();
        assert_eq!(complex.operands(), expected.as_slice());
    }

    #[test]
    fn test_not_equals_list() {
        let ne = SimpleOperand::new("Status").not_equals(["Open", "Closed"]).unwrap();
        assert_eq!(ne.as_complex().map(ComplexOperand::operator), Some(Operator::And));
    }

    #[test]
    fn test_invert_errors() {
        assert_eq!(
            age().invert(),
            Err(FilterError::InvalidState { property: "Age".to_string() })
        );
        assert_eq!(
            SimpleOperand::new("Name").like("a%").invert(),
            Err(FilterError::InvalidOperator(Operator::Like))
        );
    }

    #[test]
    fn test_flatten_same_operator() {
        let [a, b, c, d] = ["A", "B", "C", "D"].map(|p| leaf(p, Operator::Eq, 1));
        let left = a.and(b).unwrap();
        let right = c.and(d).unwrap();
        let all = left.and(right).unwrap();

        let complex = all.as_complex().unwrap();
        assert_eq!(complex.operands().len(), 4);
        assert!(complex.present().all(|child| child.as_simple().is_some()));
    }

    #[test]
    fn test_different_operator_is_kept_nested() {
        let [a, b, c] = ["A", "B", "C"].map(|p| leaf(p, Operator::Eq, 1));
        let either = a | b;
        let all = either.and(c).unwrap();
        let complex = all.as_complex().unwrap();
        assert_eq!(complex.operator(), Operator::And);
        assert_eq!(complex.operands().len(), 2);
        assert_eq!(complex.operands()[0].as_ref().and_then(Operand::as_complex).map(ComplexOperand::operator), Some(Operator::Or));
    }

    #[test]
    fn test_complex_new_requires_logical_operator() {
        let a = leaf("A", Operator::Eq, 1);
        assert_eq!(
            ComplexOperand::new(Operator::Eq, [a]),
            Err(FilterError::InvalidOperator(Operator::Eq))
        );
    }

    #[test]
    fn test_null_children_survive_combination() {
        let a = leaf("A", Operator::Eq, 1);
        let complex = ComplexOperand::new(Operator::Or, [Some(a.clone()), None]).unwrap();
        assert_eq!(complex.operands(), &[Some(a), None]);
        assert_eq!(complex.present().count(), 1);
    }

    #[test]
    fn test_mapping_coercion() {
        let status = SimpleOperand::new("Status").equals("Open").unwrap();
        let combined = status.and([("Priority", 3)]).unwrap();
        assert_eq!(
            combined.as_complex().unwrap().operands(),
            &[Some(Operand::from(status)), Some(leaf("Priority", Operator::Eq, 3))]
        );
    }

    #[test]
    fn test_multi_field_mapping_becomes_and() {
        let input = OperandInput::try_from(json!({"A": 1, "B": [2, 3]})).unwrap();
        let operand = input.into_operand().unwrap();
        let complex = operand.as_complex().unwrap();
        assert_eq!(complex.operator(), Operator::And);
        assert_eq!(complex.operands()[1], Some(leaf("B", Operator::In, vec![2, 3])));
    }

    #[test]
    fn test_unsupported_inputs() {
        assert!(matches!(
            OperandInput::try_from(json!([1, 2])),
            Err(FilterError::UnsupportedOperand(_))
        ));
        assert!(matches!(
            OperandInput::Mapping(BTreeMap::new()).into_operand(),
            Err(FilterError::UnsupportedOperand(_))
        ));
    }

    #[test]
    fn test_complex_invert_applies_de_morgan() {
        let a = age().greater_than(18).unwrap();
        let b = SimpleOperand::new("Status").equals("Open").unwrap();
        let inverted = (a | b).invert().unwrap();
        let complex = inverted.as_complex().unwrap();
        assert_eq!(complex.operator(), Operator::And);
        assert_eq!(
            complex.operands(),
            &[Some(leaf("Age", Operator::Le, 18)), Some(leaf("Status", Operator::Ne, "Open"))]
        );
    }

    #[test]
    fn test_complex_invert_flattens_negated_in() {
        let statuses = SimpleOperand::new("Status").equals(["A", "B"]).unwrap();
        let adult = age().greater_or_equal(18).unwrap();
        // NOT(Status IN [A, B] OR Age >= 18) == Status != A AND Status != B AND Age < 18
        let inverted = (statuses | adult).invert().unwrap();
        let complex = inverted.as_complex().unwrap();
        assert_eq!(complex.operator(), Operator::And);
        assert_eq!(complex.operands().len(), 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_scalar() -> impl Strategy<Value = Scalar> {
            prop_oneof![
                any::<i64>().prop_map(Scalar::Integer),
                any::<bool>().prop_map(Scalar::Bool),
                "[a-zA-Z0-9_]{0,8}".prop_map(Scalar::String),
            ]
        }

        proptest! {
            #[test]
            fn double_inversion_is_identity(v in arb_scalar()) {
                let eq = age().equals(v).unwrap();
                let twice = eq.invert().unwrap().invert().unwrap();
                prop_assert_eq!(twice, Operand::from(eq));
            }

            #[test]
            fn range_synthesis_is_order_independent(a in -1000i64..1000, span in 1i64..1000) {
                let b = a + span;
                let up = age().greater_or_equal(a).unwrap().less_or_equal(b).unwrap();
                let down = age().less_or_equal(b).unwrap().greater_or_equal(a).unwrap();
                prop_assert_eq!(up.operator(), Some(Operator::Between));
                prop_assert_eq!(up.value(), &int_range(a, b));
                prop_assert_eq!(up, down);
            }

            #[test]
            fn singleton_collection_collapses(v in arb_scalar()) {
                prop_assert_eq!(age().equals(vec![v.clone()]).unwrap(), age().equals(v).unwrap());
            }
        }
    }
}
