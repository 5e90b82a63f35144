// Math and aggregate builtins

use crate::coerce;
use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::arg;
use crate::registry::{FunctionCategory::Math, FunctionDef};
use crate::signature::Signature;
use crate::utils::flatten;
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("pow", Math, Signature::exact(2), pow),
    FunctionDef::new("sqrt", Math, Signature::exact(1), sqrt),
    FunctionDef::new("sum", Math, Signature::at_least(1), sum),
    FunctionDef::new("avg", Math, Signature::at_least(1), avg),
    FunctionDef::new("count", Math, Signature::exact(1), count),
];

fn finite(n: f64) -> Result<Value, EvalError> {
    if n.is_nan() {
        return Err(EvalError::InvalidNumber("NaN".to_string()));
    }
    Ok(Value::Number(n))
}

fn pow(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let base = coerce::to_f64(arg(args, 0))?;
    let exp = coerce::to_f64(arg(args, 1))?;
    finite(base.powf(exp))
}

fn sqrt(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    finite(coerce::to_f64(arg(args, 0))?.sqrt())
}

/// Every argument flattened one level and coerced; one bad element fails all.
fn numbers(args: &[Value]) -> Result<Vec<f64>, EvalError> {
    flatten(args).iter().map(coerce::to_f64).collect()
}

fn sum(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    finite(numbers(args)?.iter().sum())
}

fn avg(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let values = numbers(args)?;
    if values.is_empty() {
        return Err(EvalError::EmptyArgument("avg input"));
    }
    finite(values.iter().sum::<f64>() / values.len() as f64)
}

/// 1 for a present value.
fn count(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::Absent => Err(EvalError::Missing),
        _ => Ok(Value::Int(1)),
    }
}
