use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::Deserialize;
use serde::Deserializer;
use std::fmt::Display;
use std::str::FromStr;

/// A scalar cell value.
///
/// Variants are ordered `Null < Bool < Number < Text < Date`; values of the
/// same variant compare naturally. This total order is what `sum_by` sorts
/// its groups with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// Absent cell
    #[default]
    Null,
    Bool(bool),
    /// Exact decimal number
    Number(Decimal),
    Text(String),
    /// Date or date/time value
    Date(NaiveDateTime),
}

impl Value {
    /// Parses the textual form of a number, accepting scientific notation (`1.5E-3`).
    pub fn parse_number(raw: &str) -> Result<Decimal, rust_decimal::Error> {
        let raw = raw.trim();
        Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `Null` or text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    /// False for `Null`, `false`, zero and the empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(value) => *value,
            Value::Number(value) => !value.is_zero(),
            Value::Text(text) => !text.is_empty(),
            Value::Date(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as an addend: numbers as themselves, `Null` as zero,
    /// anything else is not summable.
    pub fn summand(&self) -> Option<Decimal> {
        match self {
            Value::Null => Some(Decimal::ZERO),
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Number(value) => write!(f, "{}", value.normalize()),
            Value::Text(text) => write!(f, "{}", text),
            Value::Date(value) if value.time() == NaiveTime::MIN => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Decimal::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Scalar shapes accepted in configuration files (filter sentinels).
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Option::<Scalar>::deserialize(deserializer)? {
            None => Value::Null,
            Some(Scalar::Bool(value)) => Value::Bool(value),
            Some(Scalar::Integer(value)) => Value::from(value),
            // Shortest round-trip text keeps 66.47 as 66.47
            Some(Scalar::Float(value)) => Value::parse_number(&value.to_string())
                .map(Value::Number)
                .map_err(D::Error::custom)?,
            Some(Scalar::Text(value)) => Value::Text(value),
        };
        Ok(value)
    }
}
