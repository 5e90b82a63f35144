// Function signatures and bind-time validation of call sites

use std::fmt;

use thiserror::Error;

use crate::ast::Expr;

/// Bind-time errors: the expression is rejected before any row is seen
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{name} expects {expected}, got {actual}")]
    ArgumentCount {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("{name} argument {position} must be a string literal")]
    LiteralRequired { name: String, position: usize },

    #[error("{name}: {reason}")]
    InvalidArgument { name: String, reason: String },
}

/// Per-position argument constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgRule {
    /// Any expression
    Any,
    /// Must be a quoted string in the expression text
    StringLiteral,
}

/// Function-specific check run after arity and literal rules pass
pub type BindCheck = fn(&[Expr]) -> Result<(), String>;

/// Arity and argument contract of a builtin
#[derive(Clone, Copy)]
pub struct Signature {
    pub min_args: usize,
    /// `None` means unbounded
    pub max_args: Option<usize>,
    /// Rules by position; positions past the end accept anything
    pub rules: &'static [ArgRule],
    pub check: Option<BindCheck>,
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("rules", &self.rules)
            .field("check", &self.check.is_some())
            .finish()
    }
}

impl Signature {
    pub const fn exact(n: usize) -> Self {
        Signature {
            min_args: n,
            max_args: Some(n),
            rules: &[],
            check: None,
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Signature {
            min_args: min,
            max_args: Some(max),
            rules: &[],
            check: None,
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Signature {
            min_args: min,
            max_args: None,
            rules: &[],
            check: None,
        }
    }

    pub const fn with_rules(mut self, rules: &'static [ArgRule]) -> Self {
        self.rules = rules;
        self
    }

    pub const fn with_check(mut self, check: BindCheck) -> Self {
        self.check = Some(check);
        self
    }

    /// Whether `n` arguments are within bounds.
    pub fn accepts(&self, n: usize) -> bool {
        n >= self.min_args && self.max_args.map_or(true, |max| n <= max)
    }

    fn describe_arity(&self) -> String {
        let plural = |n: usize| if n == 1 { "arg" } else { "args" };
        match self.max_args {
            Some(max) if max == self.min_args => format!("{} {}", max, plural(max)),
            Some(max) => format!("{} to {} args", self.min_args, max),
            None => format!("at least {} {}", self.min_args, plural(self.min_args)),
        }
    }

    /// Validate one call site: arity, then literal positions, then the
    /// function's own check.
    pub fn validate(&self, name: &str, args: &[Expr]) -> Result<(), BindError> {
        if !self.accepts(args.len()) {
            return Err(BindError::ArgumentCount {
                name: name.to_string(),
                expected: self.describe_arity(),
                actual: args.len(),
            });
        }

        for (position, (rule, arg)) in self.rules.iter().zip(args).enumerate() {
            if *rule == ArgRule::StringLiteral && arg.as_string_literal().is_none() {
                return Err(BindError::LiteralRequired {
                    name: name.to_string(),
                    position: position + 1,
                });
            }
        }

        if let Some(check) = self.check {
            check(args).map_err(|reason| BindError::InvalidArgument {
                name: name.to_string(),
                reason,
            })?;
        }

        Ok(())
    }
}
