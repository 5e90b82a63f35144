// Utility functions and helpers shared by the builtin catalog

use globset::{Glob, GlobMatcher};

use crate::evaluator::EvalError;
use crate::value::Value;

/// Flatten one level of list nesting: list arguments contribute their
/// elements, everything else contributes itself.
pub fn flatten(values: &[Value]) -> Vec<Value> {
    let mut result = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Value::StringList(items) => result.extend(items.iter().cloned().map(Value::String)),
            Value::Slice(items) => result.extend(items.iter().cloned()),
            other => result.push(other.clone()),
        }
    }
    result
}

/// Text of a scalar, or of the first element of a string list.
pub fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::StringList(items) => items.first().cloned(),
        other => other.scalar_text(),
    }
}

/// How a pattern without `*` is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlainMatch {
    Prefix,
    Exact,
}

#[derive(Debug, Clone)]
enum Pattern {
    Glob(GlobMatcher),
    Plain(String),
}

/// A set of patterns; a pattern containing `*` is a glob
#[derive(Debug, Clone)]
pub struct Patterns {
    patterns: Vec<Pattern>,
    plain: PlainMatch,
}

impl Patterns {
    pub fn new<I, S>(patterns: I, plain: PlainMatch) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                if p.contains('*') {
                    Glob::new(p)
                        .map(|g| Pattern::Glob(g.compile_matcher()))
                        .map_err(|e| EvalError::InvalidInput(format!("bad pattern {:?}: {}", p, e)))
                } else {
                    Ok(Pattern::Plain(p.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Patterns { patterns, plain })
    }

    /// Patterns from a string or a string list argument.
    pub fn from_value(value: &Value, plain: PlainMatch) -> Result<Self, EvalError> {
        match value {
            Value::String(s) => Patterns::new([s], plain),
            Value::StringList(items) => Patterns::new(items, plain),
            Value::Absent => Err(EvalError::Missing),
            other => Err(other.mismatch("string or string list")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|pattern| match pattern {
            Pattern::Glob(glob) => glob.is_match(candidate),
            Pattern::Plain(p) => match self.plain {
                PlainMatch::Prefix => candidate.starts_with(p.as_str()),
                PlainMatch::Exact => candidate == p,
            },
        })
    }
}
