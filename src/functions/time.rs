// Date and time builtins
//
// Zero-argument projections read the row's reference time, so the same row
// always yields the same answer. Relative strings (`now-3m`) count from the
// wall clock.

use chrono::{DateTime, Datelike, FixedOffset, Timelike};

use crate::ast::Expr;
use crate::context::ContextReader;
use crate::datetime;
use crate::evaluator::EvalError;
use crate::functions::{arg, text_arg};
use crate::registry::{FunctionCategory::Time, FunctionDef};
use crate::signature::{ArgRule, Signature};
use crate::utils::first_text;
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("todate", Time, Signature::range(1, 2), todate),
    FunctionDef::new(
        "todatein",
        Time,
        Signature::exact(2)
            .with_rules(&[ArgRule::Any, ArgRule::StringLiteral])
            .with_check(check_zone),
        todatein,
    ),
    FunctionDef::new("extract", Time, Signature::exact(2), extract),
    FunctionDef::new("unixtrunc", Time, Signature::range(1, 2), unixtrunc),
    FunctionDef::new("seconds", Time, Signature::exact(1), seconds),
    FunctionDef::new("yy", Time, Signature::range(0, 1), yy),
    FunctionDef::new("mm", Time, Signature::range(0, 1), mm),
    FunctionDef::new("yymm", Time, Signature::range(0, 1), yymm),
    FunctionDef::new("hourofday", Time, Signature::range(0, 1), hourofday),
    FunctionDef::new("hourofweek", Time, Signature::range(0, 1), hourofweek),
    FunctionDef::new("totimestamp", Time, Signature::range(0, 1), totimestamp),
];

/// Interpret a value as an instant.
///
/// Strings go through the date parser, string lists use their first element.
/// Integers read like their digit text: eight digits are `YYYYMMDD`, other
/// lengths are epochs sized by the digit count.
pub(crate) fn value_to_time(
    value: &Value,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, EvalError> {
    match value {
        Value::Time(t) => Ok(*t),
        Value::String(_) | Value::StringList(_) => {
            let text = first_text(value).ok_or(EvalError::Missing)?;
            Ok(datetime::parse(&text, now)?)
        }
        Value::Int(n) => Ok(datetime::from_digits(&n.to_string())?),
        Value::Number(n) if n.is_finite() => {
            Ok(datetime::from_digits(&(n.trunc() as i64).to_string())?)
        }
        Value::Absent => Err(EvalError::Missing),
        other => Err(other.mismatch("time")),
    }
}

/// The optional first argument as a time, else the reference time.
fn time_or_now(ctx: &dyn ContextReader, args: &[Value]) -> Result<DateTime<FixedOffset>, EvalError> {
    match args.first() {
        Some(value) => value_to_time(value, ctx.now()),
        None => Ok(ctx.reference_time()),
    }
}

fn check_zone(args: &[Expr]) -> Result<(), String> {
    let zone = args
        .get(1)
        .and_then(Expr::as_string_literal)
        .ok_or_else(|| "time zone must be a string literal".to_string())?;
    datetime::parse_timezone(zone)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// `todate(s)` or `todate(layout, s)`; the layout is strftime (`%d/%m/%Y`)
/// or a reference date (`02/01/2006`).
fn todate(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() == 2 {
        let hint = text_arg(args, 0)?;
        let text = text_arg(args, 1)?;
        return Ok(Value::Time(datetime::parse_with_hint(&hint, &text, ctx.now())?));
    }
    value_to_time(arg(args, 0), ctx.now()).map(Value::Time)
}

/// Parse with naive values read as local time in the named zone.
fn todatein(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let tz = datetime::parse_timezone(arg(args, 1).require_str()?)?;
    let now = ctx.now();
    match arg(args, 0) {
        value @ (Value::String(_) | Value::StringList(_)) => {
            let text = first_text(value).ok_or(EvalError::Missing)?;
            Ok(Value::Time(datetime::parse_in(&text, &tz, now)?))
        }
        other => value_to_time(other, now).map(Value::Time),
    }
}

fn extract(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = value_to_time(arg(args, 0), ctx.now())?;
    let layout = text_arg(args, 1)?;
    Ok(Value::String(datetime::format(&t, &layout)?))
}

/// Epoch text truncated to whole seconds, seconds with millis, or millis.
fn unixtrunc(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = value_to_time(arg(args, 0), ctx.now())?;
    let unit = match args.get(1) {
        Some(_) => Some(text_arg(args, 1)?.to_ascii_lowercase()),
        None => None,
    };
    let text = match unit.as_deref() {
        None => t.timestamp().to_string(),
        Some("seconds") => {
            let millis = format!("{:03}", t.timestamp_subsec_millis());
            let fraction = millis.trim_end_matches('0');
            let fraction = if fraction.is_empty() { "0" } else { fraction };
            format!("{}.{}", t.timestamp(), fraction)
        }
        Some("ms" | "milliseconds") => t.timestamp_millis().to_string(),
        Some(other) => {
            return Err(EvalError::InvalidInput(format!("unknown unit {:?}", other)));
        }
    };
    Ok(Value::String(text))
}

/// `[M]mm:ss` or `hh:mm:ss` as a number of seconds.
fn clock_seconds(text: &str) -> Option<f64> {
    let body = text.strip_prefix(['M', 'm']).unwrap_or(text);
    if !body.contains(':') {
        return None;
    }
    let parts = body
        .split(':')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [m, s] => Some(m * 60.0 + s),
        [h, m, s] => Some(h * 3600.0 + m * 60.0 + s),
        _ => None,
    }
}

/// Durations, bare numbers, or a date as epoch seconds.
fn seconds(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let value = arg(args, 0);
    let secs = match value {
        Value::Int(n) => *n as f64,
        Value::Number(n) => *n,
        Value::Time(t) => t.timestamp() as f64,
        Value::String(s) => {
            let s = s.trim();
            if let Some(secs) = clock_seconds(s) {
                secs
            } else if let Ok(n) = s.parse::<f64>() {
                n
            } else {
                datetime::parse(s, ctx.now())?.timestamp() as f64
            }
        }
        Value::Absent => return Err(EvalError::Missing),
        other => return Err(other.mismatch("duration or time")),
    };
    if !secs.is_finite() {
        return Err(EvalError::InvalidNumber(value.to_string()));
    }
    Ok(Value::Number(secs))
}

fn yy(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = time_or_now(ctx, args)?;
    Ok(Value::Int(i64::from(t.year() % 100)))
}

fn mm(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = time_or_now(ctx, args)?;
    Ok(Value::Int(i64::from(t.month())))
}

fn yymm(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = time_or_now(ctx, args)?;
    Ok(Value::String(t.format("%y%m").to_string()))
}

fn hourofday(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = time_or_now(ctx, args)?;
    Ok(Value::Int(i64::from(t.hour())))
}

/// Hours since Sunday midnight.
fn hourofweek(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = time_or_now(ctx, args)?;
    let days = t.weekday().num_days_from_sunday();
    Ok(Value::Int(i64::from(days * 24 + t.hour())))
}

fn totimestamp(ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let t = time_or_now(ctx, args)?;
    Ok(Value::Int(t.timestamp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::call;
    use chrono::{TimeZone, Utc};

    fn s(text: &str) -> Value {
        Value::string(text)
    }

    fn epoch(v: Result<Value, EvalError>) -> i64 {
        v.unwrap().as_time().unwrap().timestamp()
    }

    #[test]
    fn test_todate() {
        assert_eq!(epoch(call("todate", vec![s("10/13/2014")])), 1413158400);
        assert_eq!(epoch(call("todate", vec![s("1438445529707")])), 1438445529);
        assert_eq!(
            epoch(call("todate", vec![s("%d/%m/%Y"), s("07/04/2014")])),
            Utc.with_ymd_and_hms(2014, 4, 7, 0, 0, 0).unwrap().timestamp()
        );
        assert_eq!(
            epoch(call("todate", vec![s("02/01/2006"), s("07/04/2014")])),
            Utc.with_ymd_and_hms(2014, 4, 7, 0, 0, 0).unwrap().timestamp()
        );
        assert!(call("todate", vec![s("02/01/2006"), s("2014-04-07")]).is_err());
        assert!(call("todate", vec![s("not a date")]).is_err());
        assert_eq!(call("todate", vec![Value::Absent]), Err(EvalError::Missing));
    }

    #[test]
    fn test_relative_dates_follow_wall_clock() {
        let before = Utc::now().timestamp();
        let t = epoch(call("todate", vec![s("now-3m")]));
        assert!(t >= before - 180 - 1);
        assert!(t > 1396889935);
        // zero-argument projections still read the row's own time
        assert_eq!(call("yy", vec![]), Ok(Value::Int(14)));
    }

    #[test]
    fn test_eight_digit_int_matches_string() {
        let from_int = call("todate", vec![Value::Int(20150704)]);
        let from_text = call("todate", vec![s("20150704")]);
        assert_eq!(from_int, from_text);
        assert_eq!(
            epoch(from_int),
            Utc.with_ymd_and_hms(2015, 7, 4, 0, 0, 0).unwrap().timestamp()
        );
        // other lengths stay epochs
        assert_eq!(epoch(call("todate", vec![Value::Int(1257894000)])), 1257894000);
        assert_eq!(epoch(call("todate", vec![Value::Number(20150704.9)])), epoch(from_text.clone()));
    }

    #[test]
    fn test_todatein() {
        let t = call(
            "todatein",
            vec![s("2009-05-08 17:57:51"), s("America/Los_Angeles")],
        );
        assert_eq!(
            epoch(t),
            Utc.with_ymd_and_hms(2009, 5, 9, 0, 57, 51).unwrap().timestamp()
        );
    }

    #[test]
    fn test_check_zone() {
        assert!(check_zone(&[Expr::ident("x"), Expr::string("America/Denver")]).is_ok());
        assert!(check_zone(&[Expr::ident("x"), Expr::string("PDT")]).is_err());
        assert!(check_zone(&[Expr::ident("x"), Expr::ident("zone")]).is_err());
    }

    #[test]
    fn test_projections_default_to_reference() {
        assert_eq!(call("yy", vec![]), Ok(Value::Int(14)));
        assert_eq!(call("mm", vec![]), Ok(Value::Int(4)));
        assert_eq!(call("yymm", vec![]), Ok(s("1404")));
        assert_eq!(call("hourofday", vec![]), Ok(Value::Int(16)));
        // 2014-04-07 is a Monday
        assert_eq!(call("hourofweek", vec![]), Ok(Value::Int(40)));
        assert_eq!(call("totimestamp", vec![]), Ok(Value::Int(1396889935)));
        assert_eq!(call("yy", vec![s("10/13/2009")]), Ok(Value::Int(9)));
    }

    #[test]
    fn test_extract() {
        assert_eq!(call("extract", vec![s("10/13/2014"), s("%B")]), Ok(s("October")));
        assert_eq!(call("extract", vec![s("10/13/2014"), s("%Y-%m-%d")]), Ok(s("2014-10-13")));
        assert!(call("extract", vec![s("10/13/2014"), s("%Q")]).is_err());
    }

    #[test]
    fn test_unixtrunc() {
        let ms = s("1438445529707");
        assert_eq!(call("unixtrunc", vec![ms.clone()]), Ok(s("1438445529")));
        assert_eq!(
            call("unixtrunc", vec![ms.clone(), s("seconds")]),
            Ok(s("1438445529.707"))
        );
        assert_eq!(call("unixtrunc", vec![ms.clone(), s("ms")]), Ok(s("1438445529707")));
        assert_eq!(
            call("unixtrunc", vec![s("1438445529"), s("seconds")]),
            Ok(s("1438445529.0"))
        );
        assert!(call("unixtrunc", vec![ms, s("fortnights")]).is_err());
    }

    #[test]
    fn test_seconds() {
        assert_eq!(call("seconds", vec![s("M10:30")]), Ok(Value::Number(630.0)));
        assert_eq!(call("seconds", vec![s("M100:30")]), Ok(Value::Number(6030.0)));
        assert_eq!(call("seconds", vec![s("1:01:01")]), Ok(Value::Number(3661.0)));
        assert_eq!(call("seconds", vec![s("45")]), Ok(Value::Number(45.0)));
        assert_eq!(call("seconds", vec![s("2015/07/01")]), Ok(Value::Number(1435708800.0)));
        assert!(call("seconds", vec![s("nope")]).is_err());
        assert!(call("seconds", vec![s("nan")]).is_err());
        assert!(call("seconds", vec![s("inf")]).is_err());
        assert!(call("seconds", vec![s("-infinity")]).is_err());
        assert!(call("seconds", vec![Value::Number(f64::NAN)]).is_err());
    }
}
