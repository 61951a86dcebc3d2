//! Values carried by leaf operands.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FilterError;

/// A single comparable value.
///
/// Timestamps travel as RFC 3339 strings; on decode any string that parses
/// as one is read back as [`Scalar::DateTime`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    String(String),
}

impl Scalar {
    fn check_finite(&self) -> Result<(), FilterError> {
        match self {
            Scalar::Float(x) if !x.is_finite() => Err(FilterError::invalid_value(format!(
                "{x} has no JSON representation"
            ))),
            _ => Ok(()),
        }
    }
}

/// The value slot of a leaf operand.
///
/// `Range` only appears under `BETWEEN`; either bound may be open.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Scalar(Scalar),
    List(Vec<Scalar>),
    Range(Option<Scalar>, Option<Scalar>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Fails on NaN or infinite floats anywhere in the value, which JSON
    /// would otherwise write as `null`.
    pub(crate) fn check_finite(&self) -> Result<(), FilterError> {
        match self {
            Value::Null => Ok(()),
            Value::Scalar(scalar) => scalar.check_finite(),
            Value::List(items) => items.iter().try_for_each(Scalar::check_finite),
            Value::Range(lower, upper) => lower.iter().chain(upper).try_for_each(Scalar::check_finite),
        }
    }

    /// Reads this value as one side of a range.
    pub(crate) fn into_bound(self) -> Result<Option<Scalar>, FilterError> {
        match self {
            Value::Null => Ok(None),
            Value::Scalar(scalar) => Ok(Some(scalar)),
            other => Err(FilterError::invalid_value(format!(
                "range bounds must be scalars, found {other}"
            ))),
        }
    }
}

impl From<Option<Scalar>> for Value {
    fn from(value: Option<Scalar>) -> Self {
        value.map_or(Value::Null, Value::Scalar)
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl<T: Into<Scalar>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for Value {
    fn from(values: [T; N]) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(value.into())
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Scalar(value.into())
                }
            }

            impl From<Option<$ty>> for Value {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(Value::Null, |v| Value::Scalar(v.into()))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i8 => Integer,
    i16 => Integer,
    i32 => Integer,
    i64 => Integer,
    u8 => Integer,
    u16 => Integer,
    u32 => Integer,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    DateTime<Utc> => DateTime,
}

// Naive timestamps are taken as UTC.
impl From<NaiveDateTime> for Scalar {
    fn from(value: NaiveDateTime) -> Self {
        Scalar::DateTime(value.and_utc())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Scalar(value.into())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Integer(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::DateTime(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Scalar::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bound(f: &mut fmt::Formatter<'_>, b: &Option<Scalar>) -> fmt::Result {
            match b {
                Some(s) => write!(f, "{s}"),
                None => f.write_str("null"),
            }
        }

        match self {
            Value::Null => f.write_str("null"),
            Value::Scalar(s) => write!(f, "{s}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Range(lower, upper) => {
                f.write_str("[")?;
                bound(f, lower)?;
                f.write_str(", ")?;
                bound(f, upper)?;
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(18), Value::Scalar(Scalar::Integer(18)));
        assert_eq!(Value::from("Open"), Value::Scalar(Scalar::String("Open".to_string())));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::List(vec![Scalar::Integer(1), Scalar::Integer(2)])
        );
    }

    #[test]
    fn test_range_serializes_as_pair_with_open_bounds() {
        let range = Value::Range(Some(Scalar::Integer(18)), None);
        assert_eq!(serde_json::to_value(&range).unwrap(), json!([18, null]));
        assert_eq!(serde_json::to_value(Value::Null).unwrap(), json!(null));
    }

    #[test]
    fn test_untagged_decoding() {
        let v: Value = serde_json::from_value(json!(2.5)).unwrap();
        assert_eq!(v, Value::Scalar(Scalar::Float(2.5)));

        let v: Value = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(v, Value::from(vec!["a", "b"]));

        // A null bound cannot be a list element, so this decodes as a range.
        let v: Value = serde_json::from_value(json!([null, 65])).unwrap();
        assert_eq!(v, Value::Range(None, Some(Scalar::Integer(65))));
    }

    fn timestamp(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_datetime_round_trip() {
        let value = Value::from(timestamp(2024, 3, 1));
        let encoded = serde_json::to_value(&value).unwrap();
        assert_eq!(encoded, json!("2024-03-01T00:00:00Z"));
        assert_eq!(serde_json::from_value::<Value>(encoded).unwrap(), value);

        // 非时间字符串仍然是字符串
        let v: Value = serde_json::from_value(json!("2024-03-01 or later")).unwrap();
        assert_eq!(v, Value::from("2024-03-01 or later"));
    }

    #[test]
    fn test_naive_datetime_is_utc() {
        let naive = timestamp(2024, 3, 1).naive_utc();
        assert_eq!(Value::from(naive), Value::from(timestamp(2024, 3, 1)));
        assert_eq!(Value::from(naive).to_string(), "2024-03-01T00:00:00Z");
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        for value in [
            Value::from(f64::NAN),
            Value::from(vec![1.0, f64::INFINITY]),
            Value::Range(Some(Scalar::Float(0.0)), Some(Scalar::Float(f64::NEG_INFINITY))),
        ] {
            assert!(matches!(value.check_finite(), Err(FilterError::InvalidValue(_))));
        }
        assert_eq!(Value::Range(Some(Scalar::Float(0.5)), None).check_finite(), Ok(()));
    }

    #[test]
    fn test_into_bound_rejects_lists() {
        assert_eq!(Value::Null.into_bound(), Ok(None));
        assert!(matches!(
            Value::from(vec![1, 2]).into_bound(),
            Err(FilterError::InvalidValue(_))
        ));
    }
}
