// Cast and coercion builtins
//
// `cast(x AS int)` is rewritten by the parser into `cast(x, "int")`; the
// target name is checked when the call is bound.

use crate::ast::Expr;
use crate::coerce;
use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::arg;
use crate::functions::time::value_to_time;
use crate::registry::{FunctionCategory::Cast, FunctionDef};
use crate::signature::{ArgRule, Signature};
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new(
        "cast",
        Cast,
        Signature::exact(2)
            .with_rules(&[ArgRule::Any, ArgRule::StringLiteral])
            .with_check(check_target),
        cast,
    ),
    FunctionDef::new("toint", Cast, Signature::exact(1), toint),
    FunctionDef::new("tonumber", Cast, Signature::exact(1), tonumber),
    FunctionDef::new("tobool", Cast, Signature::exact(1), tobool),
];

/// What a cast converts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Int,
    Number,
    Text,
    Bytes,
    Bool,
    Time,
}

impl Target {
    fn from_name(name: &str) -> Option<Self> {
        let target = match name.to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" | "long" => Target::Int,
            "number" | "float" | "double" | "decimal" => Target::Number,
            "string" | "text" | "varchar" => Target::Text,
            "char" | "bytes" | "binary" => Target::Bytes,
            "bool" | "boolean" => Target::Bool,
            "time" | "date" | "datetime" | "timestamp" => Target::Time,
            _ => return None,
        };
        Some(target)
    }
}

fn check_target(args: &[Expr]) -> Result<(), String> {
    match args.get(1).and_then(Expr::as_string_literal) {
        Some(name) if Target::from_name(name).is_some() => Ok(()),
        Some(name) => Err(format!("unknown cast type {:?}", name)),
        None => Err("cast type must be a type name".to_string()),
    }
}

fn text_of(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Absent => Err(EvalError::Missing),
        other => other.to_text().ok_or_else(|| other.mismatch("scalar")),
    }
}

fn cast(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let value = arg(args, 0);
    let name = arg(args, 1).require_str()?;
    let target = Target::from_name(name)
        .ok_or_else(|| EvalError::InvalidInput(format!("unknown cast type {:?}", name)))?;

    match target {
        Target::Int => coerce::to_i64(value).map(Value::Int),
        Target::Number => coerce::to_f64(value).map(Value::Number),
        Target::Text => text_of(value).map(Value::String),
        Target::Bytes => match value {
            Value::ByteSlice(b) => Ok(Value::ByteSlice(b.clone())),
            other => text_of(other).map(|s| Value::ByteSlice(s.into_bytes())),
        },
        Target::Bool => coerce::to_bool(value).map(Value::Bool),
        Target::Time => value_to_time(value, ctx.now()).map(Value::Time),
    }
}

fn toint(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    coerce::to_i64(arg(args, 0)).map(Value::Int)
}

fn tonumber(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    coerce::to_f64(arg(args, 0)).map(Value::Number)
}

fn tobool(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    coerce::to_bool(arg(args, 0)).map(Value::Bool)
}
