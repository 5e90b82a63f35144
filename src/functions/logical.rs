// Logical and predicate builtins
//
// Everything here except the ordering family absorbs failures: a failed
// operand arrives as Value::Error and simply does not match.

use std::cmp::Ordering;

use crate::coerce;
use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::arg;
use crate::registry::{FunctionCategory::Logical, FunctionDef};
use crate::signature::Signature;
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("eq", Logical, Signature::exact(2), eq).absorbing(),
    FunctionDef::new("ne", Logical, Signature::exact(2), ne).absorbing(),
    FunctionDef::new("not", Logical, Signature::exact(1), not).absorbing(),
    FunctionDef::new("ge", Logical, Signature::exact(2), ge),
    FunctionDef::new("le", Logical, Signature::exact(2), le),
    FunctionDef::new("gt", Logical, Signature::exact(2), gt),
    FunctionDef::new("lt", Logical, Signature::exact(2), lt),
    FunctionDef::new("exists", Logical, Signature::exact(1), exists).absorbing(),
    FunctionDef::new("any", Logical, Signature::at_least(1), any).absorbing(),
    FunctionDef::new("all", Logical, Signature::at_least(1), all).absorbing(),
    FunctionDef::new("oneof", Logical, Signature::at_least(1), oneof).absorbing(),
    FunctionDef::new("contains", Logical, Signature::exact(2), contains).absorbing(),
    FunctionDef::new("hasprefix", Logical, Signature::exact(2), hasprefix).absorbing(),
    FunctionDef::new("hassuffix", Logical, Signature::exact(2), hassuffix).absorbing(),
];

/// Equality that never fails: any missing or failed operand is unequal.
fn loose_eq(a: &Value, b: &Value) -> bool {
    a.is_present() && b.is_present() && a.equals(b).unwrap_or(false)
}

fn eq(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(loose_eq(arg(args, 0), arg(args, 1))))
}

fn ne(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!loose_eq(arg(args, 0), arg(args, 1))))
}

fn not(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!arg(args, 0).is_truthy()))
}

/// Strict ordering: times compare chronologically, everything else must
/// coerce to a number.
fn ordering(args: &[Value]) -> Result<Ordering, EvalError> {
    let (a, b) = (arg(args, 0), arg(args, 1));
    if let (Value::Time(x), Value::Time(y)) = (a, b) {
        return Ok(x.cmp(y));
    }
    let x = coerce::to_f64(a)?;
    let y = coerce::to_f64(b)?;
    x.partial_cmp(&y)
        .ok_or_else(|| EvalError::InvalidNumber(format!("cannot order {} and {}", x, y)))
}

fn ge(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(ordering(args)? != Ordering::Less))
}

fn le(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(ordering(args)? != Ordering::Greater))
}

fn gt(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(ordering(args)? == Ordering::Greater))
}

fn lt(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(ordering(args)? == Ordering::Less))
}

fn exists(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(arg(args, 0).is_present()))
}

fn any(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args.iter().any(Value::is_truthy)))
}

fn all(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(!args.is_empty() && args.iter().all(Value::is_truthy)))
}

/// First argument that is present and non-empty.
fn oneof(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    Ok(args
        .iter()
        .find(|v| v.is_present() && !v.is_empty_value())
        .cloned()
        .unwrap_or(Value::Absent))
}

/// Needle text; empty is an error, anything without scalar text never matches.
fn needle(value: &Value) -> Result<Option<String>, EvalError> {
    match value.scalar_text() {
        Some(text) if text.is_empty() => Err(EvalError::EmptyArgument("search value")),
        other => Ok(other),
    }
}

fn search(args: &[Value], test: fn(&str, &str) -> bool, keys: bool) -> Result<Value, EvalError> {
    let Some(needle) = needle(arg(args, 1))? else {
        return Ok(Value::Bool(false));
    };
    let found = match arg(args, 0) {
        Value::StringList(items) => items.iter().any(|s| test(s, &needle)),
        Value::Slice(items) => items
            .iter()
            .filter_map(Value::scalar_text)
            .any(|s| test(&s, &needle)),
        Value::Map(map) if keys => map.contains_key(&needle),
        Value::GenericMap(map) if keys => map.contains_key(&needle),
        other => other
            .scalar_text()
            .is_some_and(|haystack| test(&haystack, &needle)),
    };
    Ok(Value::Bool(found))
}

/// Substring of a string, member of a list, or key of a map.
fn contains(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    match arg(args, 0) {
        Value::StringList(_) | Value::Slice(_) => search(args, |item, needle| item == needle, true),
        _ => search(args, |haystack, needle| haystack.contains(needle), true),
    }
}

fn hasprefix(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    search(args, |s, p| s.starts_with(p), false)
}

fn hassuffix(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    search(args, |s, p| s.ends_with(p), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::call;

    fn b(v: bool) -> Result<Value, EvalError> {
        Ok(Value::Bool(v))
    }

    #[test]
    fn test_eq_ne_complementary() {
        let pairs = [
            (Value::Int(5), Value::Int(5)),
            (Value::Number(5.5), Value::Int(6)),
            (Value::string("hello"), Value::string("hello")),
            (Value::Absent, Value::Int(5)),
            (Value::error("boom"), Value::error("boom")),
            (Value::Bool(true), Value::Bool(true)),
        ];
        for (a, c) in pairs {
            let eq = call("eq", vec![a.clone(), c.clone()]).unwrap();
            let ne = call("ne", vec![a, c]).unwrap();
            assert_eq!(eq.as_bool().map(|x| !x), ne.as_bool());
        }
        assert_eq!(call("eq", vec![Value::Absent, Value::Absent]), b(false));
        assert_eq!(call("ne", vec![Value::string("hello"), Value::Absent]), b(true));
    }

    #[test]
    fn test_ordering_is_strict() {
        assert_eq!(call("ge", vec![Value::Int(5), Value::string("3")]), b(true));
        assert_eq!(call("lt", vec![Value::Int(5), Value::Int(5)]), b(false));
        assert_eq!(call("le", vec![Value::Number(2.5), Value::Int(3)]), b(true));
        assert_eq!(
            call("gt", vec![Value::Absent, Value::Int(0)]),
            Err(EvalError::Missing)
        );
        assert!(call("gt", vec![Value::string("x"), Value::Int(0)]).is_err());
        assert!(call("gt", vec![Value::error("bad"), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_truthiness_family() {
        assert_eq!(call("exists", vec![Value::Int(-1)]), b(true));
        assert_eq!(call("exists", vec![Value::Absent]), b(false));
        assert_eq!(call("exists", vec![Value::error("x")]), b(false));
        assert_eq!(call("not", vec![Value::error("x")]), b(true));
        assert_eq!(call("any", vec![Value::Absent, Value::Int(5)]), b(true));
        assert_eq!(call("any", vec![Value::Absent]), b(false));
        assert_eq!(
            call("all", vec![Value::string("Linux"), Value::string("")]),
            b(false)
        );
        assert_eq!(
            call("all", vec![Value::string("Apple"), Value::Bool(true)]),
            b(true)
        );
    }

    #[test]
    fn test_oneof() {
        assert_eq!(
            call("oneof", vec![Value::Absent, Value::error("x"), Value::string(""), Value::string("yes")]),
            Ok(Value::string("yes"))
        );
        assert_eq!(call("oneof", vec![Value::Absent]), Ok(Value::Absent));
    }

    #[test]
    fn test_contains() {
        assert_eq!(call("contains", vec![Value::string("5tem"), Value::Int(5)]), b(true));
        assert_eq!(
            call("contains", vec![Value::strings(["a", "b"]), Value::string("b")]),
            b(true)
        );
        assert_eq!(
            call("contains", vec![Value::strings(["ab"]), Value::string("b")]),
            b(false)
        );
        assert_eq!(
            call("contains", vec![Value::map([("k", Value::Int(1))]), Value::string("k")]),
            b(true)
        );
        assert_eq!(call("contains", vec![Value::Absent, Value::string("nope")]), b(false));
        assert_eq!(
            call("contains", vec![Value::strings(["a"]), Value::map([("k", Value::Int(1))])]),
            b(false)
        );
        assert_eq!(
            call("contains", vec![Value::strings(["a"]), Value::string("")]),
            Err(EvalError::EmptyArgument("search value"))
        );
    }

    #[test]
    fn test_prefix_suffix() {
        assert_eq!(call("hasprefix", vec![Value::string("hello"), Value::string("he")]), b(true));
        assert_eq!(call("hasprefix", vec![Value::string(""), Value::string("5y")]), b(false));
        assert_eq!(
            call("hasprefix", vec![Value::strings(["xa", "ya"]), Value::string("y")]),
            b(true)
        );
        assert_eq!(call("hassuffix", vec![Value::string("tem"), Value::string("m")]), b(true));
        assert_eq!(call("hassuffix", vec![Value::Absent, Value::string("m")]), b(false));
        assert!(call("hassuffix", vec![Value::string("hello"), Value::string("")]).is_err());
    }
}
