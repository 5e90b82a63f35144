// rowexpr - Builtin function layer for a row-oriented expression language
// Copyright (c) 2025 rowexpr contributors
// Licensed under the MIT License

//! # rowexpr
//!
//! Builtin functions for an embeddable expression language that evaluates
//! against one row of named values at a time.
//!
//! Every builtin declares a signature that is checked when the expression is
//! parsed, then runs once per row over already-evaluated argument values.
//! Missing fields and failed sub-expressions flow through composition with
//! explicit rules, so `not(eq(5, len(not_a_field)))` still yields a boolean.
//!
//! ## Architecture
//!
//! - `value` - The closed set of runtime values
//! - `coerce` - Numeric and boolean coercion
//! - `context` - Row readers that resolve identifiers
//! - `signature` - Arity and literal-argument validation
//! - `registry` - Name to function definition lookup
//! - `ast` - Bound expression tree
//! - `parser` - Lexer and Pratt parser that binds calls as it parses
//! - `evaluator` - Bottom-up tree walker with three-state results
//! - `datetime` - Date parsing and formatting
//! - `functions` - The builtin catalog
//! - `utils` - Glob and list helpers
//!
//! ## Example
//!
//! ```
//! use rowexpr::{Expression, MapContext, Value};
//!
//! let expr = Expression::compile(r#"eq(tolower(event), "hello")"#).unwrap();
//! let row = MapContext::new().with("event", "HELLO");
//! assert_eq!(expr.evaluate(&row).unwrap(), Value::Bool(true));
//! ```

use thiserror::Error;

pub mod ast;
pub mod coerce;
pub mod context;
pub mod datetime;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod registry;
pub mod signature;
pub mod utils;
pub mod value;

pub use ast::Expr;
pub use context::{ContextReader, MapContext, NestedContext};
pub use evaluator::{EvalError, Evaluator, EvaluatorConfig};
pub use parser::{parse_expression, Parser, ParserError};
pub use registry::{builtins, FunctionCategory, FunctionDef, Registry};
pub use signature::{ArgRule, BindError, Signature};
pub use value::{Value, ValueType};

/// Errors from compiling or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParserError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("invalid row: {0}")]
    Row(String),
}

/// A parsed and bound expression that can be evaluated against many rows.
///
/// # Examples
///
/// ```
/// use rowexpr::{Expression, MapContext, Value};
///
/// let expr = Expression::compile("toint(price) * 2").unwrap();
/// let row = MapContext::new().with("price", "$5.50");
/// assert_eq!(expr.evaluate(&row).unwrap(), Value::Int(10));
/// ```
#[derive(Debug, Clone)]
pub struct Expression {
    ast: Expr,
    evaluator: Evaluator,
}

impl Expression {
    /// Parse `text` and bind every call against the builtin registry.
    pub fn compile(text: &str) -> Result<Self, Error> {
        Ok(Expression {
            ast: parse_expression(text)?,
            evaluator: Evaluator::new(),
        })
    }

    /// Like [`Expression::compile`] with custom evaluator settings.
    pub fn compile_with_config(text: &str, config: EvaluatorConfig) -> Result<Self, Error> {
        let ast = Parser::new(text)?.with_max_depth(config.max_depth).parse()?;
        Ok(Expression {
            ast,
            evaluator: Evaluator::with_config(config),
        })
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against one row; an Absent result is returned as-is.
    pub fn evaluate(&self, ctx: &dyn ContextReader) -> Result<Value, Error> {
        Ok(self.evaluator.eval(ctx, &self.ast)?)
    }

    /// Evaluate collapsing failure and Absent into `None`.
    pub fn evaluate_ok(&self, ctx: &dyn ContextReader) -> Option<Value> {
        self.evaluator.eval_ok(ctx, &self.ast)
    }

    /// Evaluate against a row given as a JSON object and return JSON text.
    ///
    /// An Absent result serializes as `null`.
    pub fn evaluate_json(&self, json_str: &str) -> Result<String, Error> {
        let row: serde_json::Value =
            serde_json::from_str(json_str).map_err(|e| Error::Row(format!("invalid JSON: {}", e)))?;
        if !row.is_object() {
            return Err(Error::Row("row must be a JSON object".to_string()));
        }
        let ctx = MapContext::from_json(row, datetime::now());
        let result = self.evaluate(&ctx)?;
        serde_json::to_string(&result)
            .map_err(|e| Error::Row(format!("failed to serialize result: {}", e)))
    }
}

/// Compile and evaluate in one step.
pub fn evaluate(expression: &str, ctx: &dyn ContextReader) -> Result<Value, Error> {
    Expression::compile(expression)?.evaluate(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_errors() {
        assert!(matches!(Expression::compile("sqrt(1, 2)"), Err(Error::Parse(_))));
        assert!(matches!(Expression::compile("nosuchfn(1)"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_evaluate_json() {
        let expr = Expression::compile("len(tags)").unwrap();
        assert_eq!(expr.evaluate_json(r#"{"tags": ["a", "b"]}"#).unwrap(), "2");
        assert_eq!(expr.evaluate_json(r#"{}"#).unwrap(), "null");
        assert!(expr.evaluate_json("[1]").is_err());
        assert!(expr.evaluate_json("{").is_err());
    }

    #[test]
    fn test_evaluate_one_shot() {
        let ctx = MapContext::new().with("n", 4);
        assert_eq!(evaluate("sqrt(n)", &ctx).unwrap(), Value::Number(2.0));
        assert!(matches!(evaluate("toint(\"x\")", &ctx), Err(Error::Eval(_))));
    }
}
