// Value: the closed set of runtime values every builtin consumes and produces

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::evaluator::EvalError;

/// A dynamically typed value produced by evaluating a sub-expression.
///
/// `Error` and `Absent` are deliberately part of the same enum: a failed
/// operand handed to an absorbing predicate arrives as `Error`, an identifier
/// that the context does not know arrives as `Absent`. They are never the
/// same thing and must not be conflated.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Number(f64),
    String(String),
    StringList(Vec<String>),
    /// Heterogeneous list (array literals with non-string members, JSON arrays)
    Slice(Vec<Value>),
    Time(DateTime<FixedOffset>),
    ByteSlice(Vec<u8>),
    Map(IndexMap<String, Value>),
    /// Map-shaped source data kept in its raw JSON form
    GenericMap(serde_json::Map<String, serde_json::Value>),
    /// Failure marker; only observable inside absorbing functions
    Error(String),
    Absent,
}

/// Variant tag reported by [`Value::value_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Number,
    String,
    StringList,
    Slice,
    Time,
    ByteSlice,
    Map,
    GenericMap,
    Error,
    Absent,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::StringList => "strings",
            ValueType::Slice => "slice",
            ValueType::Time => "time",
            ValueType::ByteSlice => "bytes",
            ValueType::Map => "map",
            ValueType::GenericMap => "generic map",
            ValueType::Error => "error",
            ValueType::Absent => "absent",
        };
        f.write_str(name)
    }
}

// ── Type checks ──────────────────────────────────────────────────────────────

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::StringList(_) => ValueType::StringList,
            Value::Slice(_) => ValueType::Slice,
            Value::Time(_) => ValueType::Time,
            Value::ByteSlice(_) => ValueType::ByteSlice,
            Value::Map(_) => ValueType::Map,
            Value::GenericMap(_) => ValueType::GenericMap,
            Value::Error(_) => ValueType::Error,
            Value::Absent => ValueType::Absent,
        }
    }

    /// True only for the failure marker, never for `Absent`.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Neither absent nor a failure.
    #[inline]
    pub fn is_present(&self) -> bool {
        !matches!(self, Value::Absent | Value::Error(_))
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Number(_))
    }

    /// Empty string, list, map or byte sequence.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::StringList(l) => l.is_empty(),
            Value::Slice(l) => l.is_empty(),
            Value::ByteSlice(b) => b.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::GenericMap(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Truthiness used by `any`, `all`, `not` and the logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Time(_) => true,
            Value::Error(_) | Value::Absent => false,
            other => !other.is_empty_value(),
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Number`; strings are not parsed here.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_time(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    #[inline]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Like [`Value::as_str`] but reports a `TypeMismatch`.
    pub fn require_str(&self) -> Result<&str, EvalError> {
        self.as_str().ok_or_else(|| self.mismatch("string"))
    }

    pub fn require_bool(&self) -> Result<bool, EvalError> {
        self.as_bool().ok_or_else(|| self.mismatch("bool"))
    }

    pub fn require_time(&self) -> Result<&DateTime<FixedOffset>, EvalError> {
        self.as_time().ok_or_else(|| self.mismatch("time"))
    }

    pub fn require_map(&self) -> Result<&IndexMap<String, Value>, EvalError> {
        self.as_map().ok_or_else(|| self.mismatch("map"))
    }

    /// Error describing why this value cannot be used where `expected` was required.
    pub fn mismatch(&self, expected: &'static str) -> EvalError {
        match self {
            Value::Error(msg) => EvalError::Failed(msg.clone()),
            _ => EvalError::TypeMismatch {
                expected,
                actual: self.value_type(),
            },
        }
    }

    /// Textual form of scalar values and string lists.
    ///
    /// Maps and heterogeneous slices have no canonical text and return `None`,
    /// as do `Absent` and `Error`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Number(n) => Some(number_text(*n)),
            Value::String(s) => Some(s.clone()),
            Value::StringList(l) => Some(l.join(",")),
            Value::Time(t) => Some(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::ByteSlice(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Value::Slice(_)
            | Value::Map(_)
            | Value::GenericMap(_)
            | Value::Error(_)
            | Value::Absent => None,
        }
    }

    /// Scalar text only: like [`Value::to_text`] but lists are rejected too.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Value::StringList(_) => None,
            other => other.to_text(),
        }
    }
}

// ── Comparison ───────────────────────────────────────────────────────────────

impl Value {
    /// Rank of a variant in the cross-type ordering, `None` when unordered.
    fn rank(&self) -> Option<u8> {
        match self {
            Value::Bool(_) => Some(0),
            Value::Int(_) | Value::Number(_) => Some(1),
            Value::String(_) => Some(2),
            Value::Time(_) => Some(3),
            _ => None,
        }
    }

    /// Language ordering: Bool < Int/Number < String < Time.
    ///
    /// `Ok(None)` means the pair is not comparable, which is always the case
    /// when either side is `Absent`. Any `Error` operand propagates.
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>, EvalError> {
        if let Value::Error(msg) = self {
            return Err(EvalError::Failed(msg.clone()));
        }
        if let Value::Error(msg) = other {
            return Err(EvalError::Failed(msg.clone()));
        }
        let ordering = match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Time(a), Value::Time(b)) => a.partial_cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.partial_cmp(&y)
            }
            (a, b) => match (a.rank(), b.rank()) {
                (Some(ra), Some(rb)) if ra != rb => Some(ra.cmp(&rb)),
                _ => None,
            },
        };
        Ok(ordering)
    }

    /// Loose equality used by `eq`, `ne`, `==` and `IN`.
    ///
    /// Numbers compare numerically, strings by exact text, booleans directly,
    /// everything else by its text form. `Absent` equals nothing.
    pub fn equals(&self, other: &Value) -> Result<bool, EvalError> {
        if let Value::Error(msg) = self {
            return Err(EvalError::Failed(msg.clone()));
        }
        if let Value::Error(msg) = other {
            return Err(EvalError::Failed(msg.clone()));
        }
        let eq = match (self, other) {
            (Value::Absent, _) | (_, Value::Absent) => false,
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_f64() == b.as_f64(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (a, b) => match (a.to_text(), b.to_text()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        };
        Ok(eq)
    }
}

// ── Constructors ─────────────────────────────────────────────────────────────

impl Value {
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::StringList(items.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn error(msg: impl Into<String>) -> Self {
        Value::Error(msg.into())
    }

    /// Build a list value: all-string members collapse into a `StringList`.
    pub fn list(items: Vec<Value>) -> Self {
        if items.iter().all(|v| matches!(v, Value::String(_))) {
            let strings = items
                .into_iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            Value::StringList(strings)
        } else {
            Value::Slice(items)
        }
    }

    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ── From impls ───────────────────────────────────────────────────────────────

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<String>> for Value {
    #[inline]
    fn from(v: Vec<String>) -> Self {
        Value::StringList(v)
    }
}

impl From<Vec<u8>> for Value {
    #[inline]
    fn from(v: Vec<u8>) -> Self {
        Value::ByteSlice(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    #[inline]
    fn from(t: DateTime<FixedOffset>) -> Self {
        Value::Time(t)
    }
}

impl From<DateTime<Utc>> for Value {
    #[inline]
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t.fixed_offset())
    }
}

impl From<IndexMap<String, Value>> for Value {
    #[inline]
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Absent)
    }
}

// ── PartialEq ────────────────────────────────────────────────────────────────

/// Structural equality (same variant, same payload). Language-level equality
/// lives in [`Value::equals`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::StringList(a), Value::StringList(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::ByteSlice(a), Value::ByteSlice(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::GenericMap(a), Value::GenericMap(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Absent, Value::Absent) => true,
            _ => false,
        }
    }
}

// ── Display ──────────────────────────────────────────────────────────────────

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Slice(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}:{}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::GenericMap(map) => write!(f, "{}", serde_json::Value::Object(map.clone())),
            Value::Error(msg) => write!(f, "<error: {}>", msg),
            Value::Absent => write!(f, "<absent>"),
            other => write!(f, "{}", other.to_text().unwrap_or_default()),
        }
    }
}

fn number_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ── Serialization ────────────────────────────────────────────────────────────

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Absent | Value::Error(_) => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Number(n) => {
                if n.is_finite() {
                    serializer.serialize_f64(*n)
                } else {
                    serializer.serialize_none()
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::StringList(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for s in items {
                    seq.serialize_element(s)?;
                }
                seq.end()
            }
            Value::Slice(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for v in items {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Time(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::ByteSlice(b) => match std::str::from_utf8(b) {
                Ok(s) => serializer.serialize_str(s),
                Err(_) => serializer.serialize_bytes(b),
            },
            Value::Map(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
            Value::GenericMap(map) => {
                let mut m = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    m.serialize_entry(k, v)?;
                }
                m.end()
            }
        }
    }
}

// ── Conversion from serde_json::Value ────────────────────────────────────────

/// JSON has a single number type, so every JSON number becomes `Number`.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Absent,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::list(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::GenericMap(map),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
