// Builtin function catalog
// Each module exports a static table of definitions the registry loads once

pub mod cast;
pub mod collections;
pub mod hash;
pub mod json;
pub mod logical;
pub mod math;
pub mod strings;
pub mod time;
pub mod web;

use crate::evaluator::EvalError;
use crate::registry::FunctionDef;
use crate::value::Value;

static ABSENT: Value = Value::Absent;

/// Every builtin definition, in catalog order.
pub fn all() -> impl Iterator<Item = &'static FunctionDef> {
    [
        logical::FUNCTIONS,
        collections::FUNCTIONS,
        strings::FUNCTIONS,
        cast::FUNCTIONS,
        math::FUNCTIONS,
        time::FUNCTIONS,
        hash::FUNCTIONS,
        web::FUNCTIONS,
        json::FUNCTIONS,
    ]
    .into_iter()
    .flatten()
}

/// Argument `i`, or Absent when the caller supplied fewer.
pub(crate) fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&ABSENT)
}

/// Argument `i` as a string; numbers and booleans are rendered as text.
pub(crate) fn text_arg(args: &[Value], i: usize) -> Result<String, EvalError> {
    let value = arg(args, i);
    match value {
        Value::Absent => Err(EvalError::Missing),
        other => other.scalar_text().ok_or_else(|| other.mismatch("string")),
    }
}
