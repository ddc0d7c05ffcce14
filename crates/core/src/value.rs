//! Typed view of record attributes used by lookups and ordering.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::SemanticType;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

/// A resolved attribute or filter operand.
///
/// UUIDs never appear as their own variant: they are folded into their
/// canonical hyphenated `Str` form on conversion so that identifiers compare
/// equal to their string spelling. JSON `null` resolves to `Missing`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Map(BTreeMap<String, FieldValue>),
    List(Vec<FieldValue>),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Read a JSON value as `ty`. Strings that do not parse as `ty` keep their raw form.
    pub fn typed(v: &serde_json::Value, ty: SemanticType) -> FieldValue {
        use serde_json::Value;
        let raw = || FieldValue::from(v);
        match (ty, v) {
            (SemanticType::Timestamp, Value::String(s)) => parse_ts(s).map(FieldValue::from).unwrap_or_else(raw),
            (SemanticType::Integer, Value::String(s)) => s.trim().parse::<i64>().map(FieldValue::from).unwrap_or_else(|_| raw()),
            (SemanticType::Float, Value::String(s)) => s.trim().parse::<f64>().map(FieldValue::from).unwrap_or_else(|_| raw()),
            (SemanticType::Float, Value::Number(n)) => n.as_f64().map(FieldValue::from).unwrap_or_else(raw),
            (SemanticType::Bool, Value::String(s)) => match s.as_str() {
                "true" => FieldValue::from(true),
                "false" => FieldValue::from(false),
                _ => raw(),
            },
            _ => raw(),
        }
    }

    /// Step one path segment into a map key or a list index.
    pub fn child(&self, segment: &str) -> Option<&FieldValue> {
        match self {
            FieldValue::Map(m) => m.get(segment),
            FieldValue::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// String form used by substring and prefix lookups.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Scalar(Scalar::Str(s)) => s.clone(),
            FieldValue::Scalar(Scalar::Int(n)) => n.to_string(),
            FieldValue::Scalar(Scalar::Float(x)) => x.to_string(),
            FieldValue::Scalar(Scalar::Bool(b)) => b.to_string(),
            FieldValue::Scalar(Scalar::Timestamp(ts)) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            FieldValue::Map(_) | FieldValue::List(_) => self.to_json().to_string(),
            FieldValue::Missing => String::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            FieldValue::Scalar(Scalar::Str(s)) => Value::String(s.clone()),
            FieldValue::Scalar(Scalar::Int(n)) => Value::from(*n),
            FieldValue::Scalar(Scalar::Float(x)) => Value::from(*x),
            FieldValue::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            FieldValue::Scalar(Scalar::Timestamp(ts)) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            FieldValue::Map(m) => Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()),
            FieldValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            FieldValue::Missing => Value::Null,
        }
    }

    /// Natural ordering between two values of comparable types.
    ///
    /// Integers and floats compare numerically; timestamps compare against
    /// RFC 3339 strings; lists compare element-wise. Anything else is
    /// incomparable and yields `None`.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        use FieldValue::{List, Scalar as S};
        match (self, other) {
            (S(a), S(b)) => compare_scalars(a, b),
            (List(a), List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Equality with cross-type numeric and timestamp coercion.
    pub fn loose_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Missing, FieldValue::Missing) => true,
            (FieldValue::Map(a), FieldValue::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k).map(|w| v.loose_eq(w)).unwrap_or(false))
            }
            (FieldValue::List(a), FieldValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
            }
            (FieldValue::Scalar(_), FieldValue::Scalar(_)) => self.compare(other) == Some(Ordering::Equal),
            _ => false,
        }
    }
}

fn compare_scalars(a: &Scalar, b: &Scalar) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Str(x), Scalar::Str(y)) => Some(x.cmp(y)),
        (Scalar::Int(x), Scalar::Int(y)) => Some(x.cmp(y)),
        (Scalar::Int(x), Scalar::Float(y)) => (*x as f64).partial_cmp(y),
        (Scalar::Float(x), Scalar::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Scalar::Float(x), Scalar::Float(y)) => x.partial_cmp(y),
        (Scalar::Bool(x), Scalar::Bool(y)) => Some(x.cmp(y)),
        (Scalar::Timestamp(x), Scalar::Timestamp(y)) => Some(x.cmp(y)),
        (Scalar::Timestamp(x), Scalar::Str(y)) => parse_ts(y).map(|y| x.cmp(&y)),
        (Scalar::Str(x), Scalar::Timestamp(y)) => parse_ts(x).map(|x| x.cmp(y)),
        _ => None,
    }
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Scalar(Scalar::Str(s.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Scalar(Scalar::Str(s))
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::Scalar(Scalar::Str(s.clone()))
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Scalar(Scalar::Int(n))
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Scalar(Scalar::Int(n as i64))
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Scalar(Scalar::Int(n as i64))
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Scalar(Scalar::Float(x))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Scalar(Scalar::Bool(b))
    }
}

impl From<Uuid> for FieldValue {
    fn from(u: Uuid) -> Self {
        FieldValue::Scalar(Scalar::Str(u.hyphenated().to_string()))
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(ts: DateTime<Utc>) -> Self {
        FieldValue::Scalar(Scalar::Timestamp(ts))
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Missing)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<&BTreeMap<String, String>> for FieldValue {
    fn from(m: &BTreeMap<String, String>) -> Self {
        FieldValue::Map(m.iter().map(|(k, v)| (k.clone(), FieldValue::from(v.as_str()))).collect())
    }
}

impl<V: Into<FieldValue>> From<BTreeMap<String, V>> for FieldValue {
    fn from(m: BTreeMap<String, V>) -> Self {
        FieldValue::Map(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<&serde_json::Value> for FieldValue {
    fn from(v: &serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::Null => FieldValue::Missing,
            Value::Bool(b) => FieldValue::from(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::from(i),
                None => FieldValue::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::from(s.as_str()),
            Value::Array(items) => FieldValue::List(items.iter().map(FieldValue::from).collect()),
            Value::Object(m) => FieldValue::Map(m.iter().map(|(k, v)| (k.clone(), FieldValue::from(v))).collect()),
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::from(&v)
    }
}
