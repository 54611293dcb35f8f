//! Property value types shared by entries, predicates and result rows.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A property value.
///
/// Covers the scalar property types a content repository exposes: strings,
/// integers, decimals, booleans and date-times (milliseconds since the Unix
/// epoch).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null / not set.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Decimal(f64),
    /// UTF-8 string (also used for ids and URIs).
    String(String),
    /// Date-time as milliseconds since Unix epoch.
    DateTime(i64),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) | Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as f64, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and decimals compare numerically with each other. Returns
    /// `None` for incompatible types or when either side is null.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(_) | Value::Decimal(_), Value::Integer(_) | Value::Decimal(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ => None,
        }
    }

    /// Total order used when sorting rows.
    ///
    /// Agrees with [`Value::compare`] wherever that is defined, except that
    /// integers and decimals compare exactly. NaN sorts after every other
    /// number. Values of different types order by type: null, boolean,
    /// number, string, date-time.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => cmp_decimal(*a, *b),
            (Value::Integer(a), Value::Decimal(b)) => cmp_integer_decimal(*a, *b),
            (Value::Decimal(a), Value::Integer(b)) => cmp_integer_decimal(*b, *a).reverse(),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) | Value::Decimal(_) => 2,
            Value::String(_) => 3,
            Value::DateTime(_) => 4,
        }
    }
}

/// Decimal order with every NaN equal and last; `-0.0 == 0.0`.
fn cmp_decimal(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a decimal.
fn cmp_integer_decimal(i: i64, d: f64) -> Ordering {
    // i64 covers [-2^63, 2^63)
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if d.is_nan() || d >= LIMIT {
        return Ordering::Less;
    }
    if d < -LIMIT {
        return Ordering::Greater;
    }
    let whole = d.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if d > whole => Ordering::Less,
        Ordering::Equal if d < whole => Ordering::Greater,
        ord => ord,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::DateTime(ms) => write!(f, "TIMESTAMP {ms}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}
