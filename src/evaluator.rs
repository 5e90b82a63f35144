// Expression evaluator
// Walks a bound expression bottom-up against one row

use std::cmp::Ordering;

use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{BinaryOp, BoundFn, Expr, UnaryOp};
use crate::coerce;
use crate::context::ContextReader;
use crate::datetime::{self, DateTimeError};
use crate::parser::DEFAULT_MAX_DEPTH;
use crate::value::{Value, ValueType};

/// Per-row evaluation failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: ValueType,
    },

    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds { index: i64, len: usize },

    #[error("{0} must not be empty")]
    EmptyArgument(&'static str),

    #[error("missing value")]
    Missing,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Failed(String),
}

impl From<DateTimeError> for EvalError {
    fn from(e: DateTimeError) -> Self {
        EvalError::InvalidDate(e.to_string())
    }
}

/// Evaluator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Deepest expression nesting evaluated before failing
    pub max_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Stateless tree-walking evaluator; one instance can serve many rows and threads
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator::default()
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Evaluator { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Evaluate an expression against one row.
    ///
    /// `Ok(Value::Absent)` is a legitimate result (e.g. `len(missing)`);
    /// `Err` means the expression failed for this row.
    pub fn eval(&self, ctx: &dyn ContextReader, expr: &Expr) -> Result<Value, EvalError> {
        self.eval_at(ctx, expr, 0)
    }

    /// Like [`Evaluator::eval`] but collapses failures and Absent into `None`.
    pub fn eval_ok(&self, ctx: &dyn ContextReader, expr: &Expr) -> Option<Value> {
        match self.eval(ctx, expr) {
            Ok(value) if value.is_present() => Some(value),
            Ok(_) => None,
            Err(e) => {
                trace!("evaluation of {} failed: {}", expr, e);
                None
            }
        }
    }

    fn eval_at(&self, ctx: &dyn ContextReader, expr: &Expr, depth: usize) -> Result<Value, EvalError> {
        if depth >= self.config.max_depth {
            return Err(EvalError::Failed(format!(
                "expression nested deeper than {} levels",
                self.config.max_depth
            )));
        }

        match expr {
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Absent),
            Expr::Identifier(name) => Ok(ctx.get(name).unwrap_or(Value::Absent)),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval_at(ctx, item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
            Expr::Call { func, args } => self.eval_call(ctx, *func, args, depth),
            Expr::Binary { op, lhs, rhs } => self.eval_binary(ctx, *op, lhs, rhs, depth),
            Expr::Unary { op, operand } => {
                let value = self.eval_at(ctx, operand, depth + 1)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                    UnaryOp::Negate => negate(&value),
                }
            }
            Expr::In {
                needle,
                list,
                negated,
            } => self.eval_in(ctx, needle, list, *negated, depth),
        }
    }

    fn eval_call(
        &self,
        ctx: &dyn ContextReader,
        func: BoundFn,
        args: &[Expr],
        depth: usize,
    ) -> Result<Value, EvalError> {
        let def = func.def();
        let mut values = Vec::with_capacity(args.len());

        for arg in args {
            match self.eval_at(ctx, arg, depth + 1) {
                Ok(value) => values.push(value),
                Err(e) if def.absorbing => {
                    trace!("{} absorbed failed operand {}: {}", def.name, arg, e);
                    values.push(Value::Error(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        def.call(ctx, &values).inspect_err(|e| {
            trace!("{} failed: {}", def.name, e);
        })
    }

    fn eval_binary(
        &self,
        ctx: &dyn ContextReader,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match op {
            // A truthy side wins even when the other side failed
            BinaryOp::Or => {
                let left = self.eval_at(ctx, lhs, depth + 1);
                if matches!(&left, Ok(v) if v.is_truthy()) {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval_at(ctx, rhs, depth + 1);
                if matches!(&right, Ok(v) if v.is_truthy()) {
                    return Ok(Value::Bool(true));
                }
                left?;
                right?;
                Ok(Value::Bool(false))
            }
            BinaryOp::And => {
                let left = self.eval_at(ctx, lhs, depth + 1)?;
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval_at(ctx, rhs, depth + 1)?;
                Ok(Value::Bool(right.is_truthy()))
            }
            _ => {
                let left = self.eval_at(ctx, lhs, depth + 1)?;
                let right = self.eval_at(ctx, rhs, depth + 1)?;
                match op {
                    BinaryOp::Add
                    | BinaryOp::Subtract
                    | BinaryOp::Multiply
                    | BinaryOp::Divide
                    | BinaryOp::Modulo => arithmetic(op, &left, &right),
                    _ => compare(ctx, op, &left, &right).map(Value::Bool),
                }
            }
        }
    }

    fn eval_in(
        &self,
        ctx: &dyn ContextReader,
        needle: &Expr,
        list: &[Expr],
        negated: bool,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let needle = self.eval_at(ctx, needle, depth + 1)?;
        if needle.is_absent() {
            return Ok(Value::Bool(negated));
        }

        let mut found = false;
        for item in list {
            let candidate = self.eval_at(ctx, item, depth + 1)?;
            found = match &candidate {
                Value::StringList(items) => match needle.to_text() {
                    Some(text) => items.iter().any(|s| *s == text),
                    None => false,
                },
                Value::Slice(items) => {
                    let mut hit = false;
                    for v in items {
                        if needle.equals(v)? {
                            hit = true;
                            break;
                        }
                    }
                    hit
                }
                other => needle.equals(other)?,
            };
            if found {
                break;
            }
        }

        Ok(Value::Bool(found != negated))
    }
}

fn negate(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Int(n) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| EvalError::InvalidNumber(n.to_string())),
        Value::Number(n) => Ok(Value::Number(-n)),
        Value::Absent => Err(EvalError::Missing),
        other => coerce::to_f64(other).map(|n| Value::Number(-n)),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        let (a, b) = (*a, *b);
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Subtract => a.checked_sub(b),
            BinaryOp::Multiply => a.checked_mul(b),
            BinaryOp::Modulo if b == 0 => {
                return Err(EvalError::InvalidInput("modulo by zero".to_string()))
            }
            BinaryOp::Modulo => a.checked_rem(b),
            _ => None,
        };
        if let Some(n) = result {
            return Ok(Value::Int(n));
        }
        if op != BinaryOp::Divide {
            return Err(EvalError::InvalidNumber(format!("{} {} {} overflows", a, op.symbol(), b)));
        }
    }

    let a = coerce::to_f64(left)?;
    let b = coerce::to_f64(right)?;
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide | BinaryOp::Modulo if b == 0.0 => {
            return Err(EvalError::InvalidInput("division by zero".to_string()))
        }
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => {
            return Err(EvalError::InvalidInput(format!(
                "{} is not an arithmetic operator",
                op.symbol()
            )))
        }
    };
    Ok(Value::Number(result))
}

/// Comparison operators. Absent on either side never matches.
fn compare(
    ctx: &dyn ContextReader,
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<bool, EvalError> {
    if left.is_absent() || right.is_absent() {
        return Ok(false);
    }

    if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) {
        let eq = left.equals(right)?;
        return Ok(if op == BinaryOp::Equal { eq } else { !eq });
    }

    let (left, right) = align_for_ordering(ctx, left, right);
    let ordering = left.compare(&right)?.ok_or_else(|| {
        EvalError::InvalidInput(format!(
            "cannot order {} against {}",
            left.value_type(),
            right.value_type()
        ))
    })?;

    match op {
        BinaryOp::LessThan => Ok(ordering == Ordering::Less),
        BinaryOp::LessThanOrEqual => Ok(ordering != Ordering::Greater),
        BinaryOp::GreaterThan => Ok(ordering == Ordering::Greater),
        BinaryOp::GreaterThanOrEqual => Ok(ordering != Ordering::Less),
        _ => Err(EvalError::InvalidInput(format!(
            "{} is not a comparison operator",
            op.symbol()
        ))),
    }
}

/// Numeric text against a number compares numerically; date text against a
/// time compares chronologically.
fn align_for_ordering(ctx: &dyn ContextReader, left: &Value, right: &Value) -> (Value, Value) {
    let align = |text: &Value, other: &Value| -> Option<Value> {
        let s = text.as_str()?;
        if other.is_numeric() {
            coerce::parse_number(s).ok().map(Value::Number)
        } else if other.as_time().is_some() {
            datetime::parse(s, ctx.now()).ok().map(Value::Time)
        } else {
            None
        }
    };
    match (align(left, right), align(right, left)) {
        (Some(l), _) => (l, right.clone()),
        (_, Some(r)) => (left.clone(), r),
        _ => (left.clone(), right.clone()),
    }
}
