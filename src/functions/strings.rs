// String builtins

use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::{arg, text_arg};
use crate::registry::{FunctionCategory::Strings, FunctionDef};
use crate::signature::Signature;
use crate::utils::flatten;
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("split", Strings, Signature::exact(2), split),
    FunctionDef::new("join", Strings, Signature::at_least(2), join),
    FunctionDef::new("strip", Strings, Signature::exact(1), strip),
    FunctionDef::new("tolower", Strings, Signature::exact(1), tolower),
    FunctionDef::new("toupper", Strings, Signature::exact(1), toupper),
    FunctionDef::new("replace", Strings, Signature::range(2, 3), replace),
    FunctionDef::new("len", Strings, Signature::exact(1), len).aliases(&["char_length"]),
];

fn non_empty(args: &[Value], i: usize, what: &'static str) -> Result<String, EvalError> {
    let text = text_arg(args, i)?;
    if text.is_empty() {
        return Err(EvalError::EmptyArgument(what));
    }
    Ok(text)
}

fn split(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = non_empty(args, 0, "split input")?;
    let sep = non_empty(args, 1, "separator")?;
    Ok(Value::StringList(text.split(sep.as_str()).map(String::from).collect()))
}

/// `join(items..., sep)`: the separator is always the last argument.
fn join(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let Some((sep, items)) = args.split_last() else {
        return Err(EvalError::Missing);
    };
    let sep = match sep {
        Value::Absent => return Err(EvalError::Missing),
        other => other.scalar_text().ok_or_else(|| other.mismatch("string"))?,
    };

    let mut parts = Vec::new();
    for item in flatten(items) {
        match item {
            Value::String(s) if s.is_empty() => {}
            Value::String(s) => parts.push(s),
            Value::Absent => {}
            other => return Err(other.mismatch("string")),
        }
    }
    if parts.is_empty() {
        return Err(EvalError::EmptyArgument("join items"));
    }
    Ok(Value::String(parts.join(&sep)))
}

/// Apply `f` to a string or to every element of a string list.
fn map_text(value: &Value, f: impl Fn(&str) -> String) -> Result<Value, EvalError> {
    match value {
        Value::String(s) => Ok(Value::String(f(s))),
        Value::StringList(items) => Ok(Value::StringList(items.iter().map(|s| f(s)).collect())),
        Value::Absent => Err(EvalError::Missing),
        other => Err(other.mismatch("string")),
    }
}

fn strip(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    map_text(arg(args, 0), |s| s.trim().to_string())
}

fn tolower(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    map_text(arg(args, 0), str::to_lowercase)
}

fn toupper(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    map_text(arg(args, 0), str::to_uppercase)
}

/// `replace(s, old[, new])`; without `new` the matches are removed.
fn replace(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = text_arg(args, 0)?;
    let from = non_empty(args, 1, "replace pattern")?;
    let to = match args.get(2) {
        Some(_) => text_arg(args, 2)?,
        None => String::new(),
    };
    Ok(Value::String(text.replace(&from, &to)))
}

/// Characters of a string, elements of a list, entries of a map.
fn len(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let n = match arg(args, 0) {
        Value::String(s) => s.chars().count(),
        Value::StringList(items) => items.len(),
        Value::Slice(items) => items.len(),
        Value::Map(m) => m.len(),
        Value::GenericMap(m) => m.len(),
        Value::ByteSlice(b) => b.len(),
        Value::Absent => return Ok(Value::Absent),
        other => return Err(other.mismatch("string, list or map")),
    };
    Ok(Value::Int(n as i64))
}
