//! Runtime values of resolved variables

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};
use std::fmt;

/// A resolved variable or predicate result.
///
/// The derived ordering (variant first, then payload) is only used to sort
/// measure groups; predicate comparisons go through [`crate::compare`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    Str(String),
    Date(NaiveDate),
}

impl Value {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Truth value in a logical context; `None` for null.
    ///
    /// Numbers are true when non-zero, strings when non-empty, dates always.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(*b),
            Self::Integer(i) => Some(*i != 0),
            Self::Decimal(d) => Some(!d.is_zero()),
            Self::Str(s) => Some(!s.is_empty()),
            Self::Date(_) => Some(true),
        }
    }

    pub const fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Str(_) => "string",
            Self::Date(_) => "date",
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Self::Decimal(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<Option<NaiveDate>> for Value {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(Self::Null, Self::Date)
    }
}

/// Plain JSON: decimals as numbers, dates as ISO strings
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Decimal(d) => match d.to_f64() {
                Some(f) => serializer.serialize_f64(f),
                None => serializer.serialize_str(&d.to_string()),
            },
            Self::Str(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", u8::from(*b)),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Str(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert_eq!(Value::Null.truthiness(), None);
        assert_eq!(Value::Integer(0).truthiness(), Some(false));
        assert_eq!(Value::str("").truthiness(), Some(false));
        assert_eq!(Value::str("E54000005").truthiness(), Some(true));
        assert_eq!(Value::Decimal(Decimal::new(0, 1)).truthiness(), Some(false));
        assert_eq!(Value::Date(NaiveDate::MIN).truthiness(), Some(true));
    }

    #[test]
    fn test_json_shape() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Integer(3),
            Value::Decimal(Decimal::new(253, 1)),
            Value::Date(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap()),
        ];
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            r#"[null,true,3,25.3,"2021-06-01"]"#
        );
    }
}
