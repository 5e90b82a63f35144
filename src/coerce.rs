// Numeric and boolean coercion shared by the cast, math and comparison builtins

use crate::evaluator::EvalError;
use crate::value::Value;

/// Currency symbols stripped before numeric parsing.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩', '₽', '¢'];

/// Parse human-formatted numeric text such as `"$ 5.22"`, `"5,555.00"` or
/// `"€ 1.234,5"`.
///
/// Whitespace and currency symbols are removed first. When both `.` and `,`
/// appear, the right-most of the two is the decimal separator. A lone `,` is
/// a thousands separator when it repeats or is followed by exactly three
/// digits; otherwise it is the decimal separator.
pub fn parse_number(text: &str) -> Result<f64, EvalError> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    if cleaned.is_empty()
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '+' | '-' | 'e' | 'E'))
    {
        return Err(EvalError::InvalidNumber(text.to_string()));
    }

    normalize_separators(&cleaned)
        .parse::<f64>()
        .map_err(|_| EvalError::InvalidNumber(text.to_string()))
}

fn normalize_separators(s: &str) -> String {
    match (s.rfind('.'), s.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => s.replace(',', ""),
        (Some(_), Some(_)) => s.replace('.', "").replace(',', "."),
        (None, Some(comma)) => {
            let tail = &s[comma + 1..];
            let grouped = tail.len() == 3 && tail.chars().all(|c| c.is_ascii_digit());
            if s.matches(',').count() > 1 || grouped {
                s.replace(',', "")
            } else {
                s.replace(',', ".")
            }
        }
        (Some(_), None) if s.matches('.').count() > 1 => s.replace('.', ""),
        _ => s.to_string(),
    }
}

/// Coerce a value to a float.
///
/// Accepts `Int`, `Number` and numeric text. `Absent` becomes
/// [`EvalError::Missing`] and an upstream failure stays a failure.
pub fn to_f64(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Number(n) => Ok(*n),
        Value::String(s) => parse_number(s),
        Value::Absent => Err(EvalError::Missing),
        other => Err(other.mismatch("number")),
    }
}

/// Coerce a value to an integer, truncating any fraction.
pub fn to_i64(value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => {
            let f = to_f64(other)?;
            if !f.is_finite() || f.abs() >= i64::MAX as f64 {
                return Err(EvalError::InvalidNumber(f.to_string()));
            }
            Ok(f.trunc() as i64)
        }
    }
}

/// Coerce a value to a boolean: `true/t/1` and `false/f/0`, any case.
pub fn to_bool(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(n) => Ok(*n != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(EvalError::InvalidInput(format!("not a boolean: {:?}", s))),
        },
        Value::Absent => Err(EvalError::Missing),
        other => Err(other.mismatch("bool")),
    }
}
