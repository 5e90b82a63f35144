// Collection builtins: map construction, key filtering and list indexing

use std::ops::Range;

use indexmap::IndexMap;

use crate::coerce;
use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::time::value_to_time;
use crate::functions::{arg, text_arg};
use crate::registry::{FunctionCategory::Collections, FunctionDef};
use crate::signature::Signature;
use crate::utils::{PlainMatch, Patterns};
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("map", Collections, Signature::exact(2), map),
    FunctionDef::new("maptime", Collections, Signature::range(1, 2), maptime),
    FunctionDef::new("filter", Collections, Signature::exact(2), filter),
    FunctionDef::new("filtermatch", Collections, Signature::exact(2), filtermatch),
    FunctionDef::new("match", Collections, Signature::at_least(1), match_prefix),
    FunctionDef::new("mapkeys", Collections, Signature::exact(1), mapkeys),
    FunctionDef::new("mapvalues", Collections, Signature::exact(1), mapvalues),
    FunctionDef::new("mapinvert", Collections, Signature::exact(1), mapinvert),
    FunctionDef::new("array.index", Collections, Signature::exact(2), array_index),
    FunctionDef::new("array.slice", Collections, Signature::range(2, 3), array_slice),
];

fn map(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let key = text_arg(args, 0)?;
    match arg(args, 1) {
        Value::Absent => Err(EvalError::Missing),
        Value::Error(msg) => Err(EvalError::Failed(msg.clone())),
        value => Ok(Value::map([(key, value.clone())])),
    }
}

/// Single-entry map of a time; defaults to the row's reference time.
fn maptime(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let key = text_arg(args, 0)?;
    let t = match args.get(1) {
        None => ctx.reference_time(),
        Some(value) => value_to_time(value, ctx.now())?,
    };
    Ok(Value::map([(key, Value::Time(t))]))
}

/// Keep the elements (or keys) whose match result equals `keep`.
fn filter_by(args: &[Value], keep: bool) -> Result<Value, EvalError> {
    let source = arg(args, 0);
    if source.is_absent() {
        return Ok(Value::Absent);
    }
    let patterns = Patterns::from_value(arg(args, 1), PlainMatch::Prefix)?;
    let filtered = match source {
        Value::String(s) => {
            if patterns.matches(s) == keep {
                Value::strings([s.as_str()])
            } else {
                Value::StringList(Vec::new())
            }
        }
        Value::StringList(items) => Value::StringList(
            items
                .iter()
                .filter(|s| patterns.matches(s) == keep)
                .cloned()
                .collect(),
        ),
        Value::Slice(items) => Value::Slice(
            items
                .iter()
                .filter(|v| {
                    v.scalar_text()
                        .is_some_and(|text| patterns.matches(&text) == keep)
                })
                .cloned()
                .collect(),
        ),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .filter(|(k, _)| patterns.matches(k) == keep)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        Value::GenericMap(entries) => Value::GenericMap(
            entries
                .iter()
                .filter(|(k, _)| patterns.matches(k) == keep)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => return Err(other.mismatch("list or map")),
    };
    Ok(filtered)
}

/// Drop matching elements.
fn filter(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    filter_by(args, false)
}

/// Keep only matching elements.
fn filtermatch(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    filter_by(args, true)
}

/// Every row field whose name starts with one of the prefixes, prefix removed.
fn match_prefix(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let prefixes = args
        .iter()
        .enumerate()
        .map(|(i, _)| text_arg(args, i))
        .collect::<Result<Vec<_>, _>>()?;

    let mut found = IndexMap::new();
    for (name, value) in ctx.row() {
        if let Some(rest) = prefixes.iter().find_map(|p| name.strip_prefix(p.as_str())) {
            found.insert(rest.to_string(), value);
        }
    }
    if found.is_empty() {
        return Err(EvalError::InvalidInput(format!(
            "no fields match {}",
            prefixes.join(", ")
        )));
    }
    Ok(Value::Map(found))
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn value_text(value: &Value) -> String {
    value.to_text().unwrap_or_else(|| value.to_string())
}

fn mapkeys(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Map(m) => Ok(Value::StringList(m.keys().cloned().collect())),
        Value::GenericMap(m) => Ok(Value::StringList(m.keys().cloned().collect())),
        Value::Absent => Ok(Value::StringList(Vec::new())),
        other => Err(other.mismatch("map")),
    }
}

fn mapvalues(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Map(m) => Ok(Value::StringList(m.values().map(value_text).collect())),
        Value::GenericMap(m) => Ok(Value::StringList(m.values().map(json_text).collect())),
        Value::Absent => Ok(Value::StringList(Vec::new())),
        other => Err(other.mismatch("map")),
    }
}

/// value text → key
fn mapinvert(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let inverted: IndexMap<String, Value> = match arg(args, 0) {
        Value::Map(m) => m
            .iter()
            .map(|(k, v)| (value_text(v), Value::string(k.as_str())))
            .collect(),
        Value::GenericMap(m) => m
            .iter()
            .map(|(k, v)| (json_text(v), Value::string(k.as_str())))
            .collect(),
        Value::Absent => IndexMap::new(),
        other => return Err(other.mismatch("map")),
    };
    Ok(Value::Map(inverted))
}

/// Negative positions count back from `len`.
fn normalize(index: i64, len: usize) -> i64 {
    if index < 0 {
        index + len as i64
    } else {
        index
    }
}

fn pick<T>(items: &[T], index: i64) -> Result<&T, EvalError> {
    let position = normalize(index, items.len());
    usize::try_from(position)
        .ok()
        .and_then(|p| items.get(p))
        .ok_or(EvalError::OutOfBounds {
            index,
            len: items.len(),
        })
}

/// Normalized `start..end`; both bounds must land within `0..=len`.
fn bounds(len: usize, start_raw: i64, end_raw: Option<i64>) -> Result<Range<usize>, EvalError> {
    let end_raw = end_raw.unwrap_or(len as i64);
    let check = |raw: i64| {
        let n = normalize(raw, len);
        if (0..=len as i64).contains(&n) {
            Ok(n as usize)
        } else {
            Err(EvalError::OutOfBounds { index: raw, len })
        }
    };
    let (start, end) = (check(start_raw)?, check(end_raw)?);
    if start > end {
        return Err(EvalError::InvalidInput(format!(
            "slice start {} is after end {}",
            start_raw, end_raw
        )));
    }
    Ok(start..end)
}

fn array_index(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let list = arg(args, 0);
    if list.is_absent() {
        return Err(EvalError::Missing);
    }
    let index = coerce::to_i64(arg(args, 1))?;
    match list {
        Value::StringList(items) => pick(items, index).map(|s| Value::string(s.as_str())),
        Value::Slice(items) => pick(items, index).cloned(),
        other => Err(other.mismatch("list")),
    }
}

fn array_slice(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let list = arg(args, 0);
    if list.is_absent() {
        return Err(EvalError::Missing);
    }
    let start = coerce::to_i64(arg(args, 1))?;
    let end = args.get(2).map(coerce::to_i64).transpose()?;
    match list {
        Value::StringList(items) => Ok(Value::StringList(items[bounds(items.len(), start, end)?].to_vec())),
        Value::Slice(items) => Ok(Value::Slice(items[bounds(items.len(), start, end)?].to_vec())),
        other => Err(other.mismatch("list")),
    }
}
