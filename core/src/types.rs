//! Value model for converted command arguments.
//!
//! Tokens arrive as plain strings. Each schema field names a [`ValueType`]
//! that drives the natural cast, and every successful cast produces a
//! [`Value`]. Values serialize with [`serde`] so parsed arguments can be
//! echoed back as JSON.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use serde::Serialize;

/// Semantic type of an argument field.
///
/// The tag documents intent and selects the natural cast used when a field
/// has no custom cast function.
///
/// # Examples
///
/// ```
/// use chain_command_core::{Value, ValueType};
///
/// assert_eq!(ValueType::default(), ValueType::String);
/// assert_eq!(ValueType::Integer.cast("42").unwrap(), Value::Int(42));
///
/// let ids = ValueType::List(Box::new(ValueType::Integer));
/// assert_eq!(
///     ids.cast("1,2,3").unwrap(),
///     Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub enum ValueType {
    /// Plain text (the default).
    #[default]
    String,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit float.
    Float,
    /// `true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`.
    Bool,
    /// Local date and time.
    DateTime,
    /// Comma-separated list of the inner type.
    List(Box<ValueType>),
    /// Anything; kept as text.
    Any,
}

impl ValueType {
    /// Casts raw token text into a [`Value`] of this type.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when `raw` is malformed for the type.
    pub fn cast(&self, raw: &str) -> Result<Value, String> {
        match self {
            ValueType::String | ValueType::Any => Ok(Value::Str(raw.to_string())),
            ValueType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| format!("invalid integer `{raw}`: {e}")),
            ValueType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| format!("invalid number `{raw}`: {e}")),
            ValueType::Bool => parse_bool(raw).map(Value::Bool),
            ValueType::DateTime => parse_datetime(raw).map(Value::DateTime),
            ValueType::List(inner) => raw
                .split(',')
                .map(str::trim)
                .map(|part| {
                    if part.is_empty() {
                        Err(format!("empty item in list `{raw}`"))
                    } else {
                        inner.cast(part)
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => f.write_str("string"),
            ValueType::Integer => f.write_str("integer"),
            ValueType::Float => f.write_str("float"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::DateTime => f.write_str("datetime"),
            ValueType::List(inner) => write!(f, "list<{inner}>"),
            ValueType::Any => f.write_str("any"),
        }
    }
}

/// A converted argument value.
///
/// `None` stands for an absent optional argument whose default is "no
/// value". Serializes untagged, so `Value::Int(3)` becomes `3` in JSON and
/// `Value::None` becomes `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    None,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Local timestamp.
    DateTime(DateTime<Local>),
    /// Text.
    Str(String),
    /// Ordered list.
    List(Vec<Value>),
}

impl Value {
    /// Returns `true` for [`Value::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Local>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Collects a list of integers, or `None` if this is not an all-integer list.
    ///
    /// # Examples
    ///
    /// ```
    /// use chain_command_core::Value;
    ///
    /// let days = Value::from(vec![3i64, 4, 5]);
    /// assert_eq!(days.to_int_vec(), Some(vec![3, 4, 5]));
    /// assert_eq!(Value::from("x").to_int_vec(), None);
    /// ```
    pub fn to_int_vec(&self) -> Option<Vec<i64>> {
        self.as_list()?.iter().map(Value::as_int).collect()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Local>> for Value {
    fn from(dt: DateTime<Local>) -> Self {
        Value::DateTime(dt)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("invalid boolean `{raw}`")),
    }
}

/// Parses a local timestamp.
///
/// Accepted forms, tried in order: `YYYY-MM-DD HH:MM[:SS]`,
/// `YYYY-MM-DDTHH:MM[:SS]`, `YYYY-MM-DD` (midnight) and `HH:MM` (today).
///
/// # Errors
///
/// Returns a reason when no form matches or the local time is ambiguous.
pub fn parse_datetime(raw: &str) -> Result<DateTime<Local>, String> {
    let raw = raw.trim();
    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            NaiveTime::parse_from_str(raw, "%H:%M")
                .ok()
                .map(|t| Local::now().date_naive().and_time(t))
        })
        .ok_or_else(|| format!("invalid datetime `{raw}`"))?;

    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| format!("ambiguous local time `{raw}`"))
}
