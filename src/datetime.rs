// Date and time parsing and formatting
// Epoch digits, relative "now" forms, RFC 3339/2822 and an ordered list of layouts

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{
    DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use thiserror::Error;

/// DateTime errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateTimeError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Format error: {0}")]
    FormatError(String),
}

/// Layouts carrying their own offset
const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%a %b %e %H:%M:%S %z %Y",
];

/// Date-and-time layouts without an offset, tried in order
const DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%b %d, %Y %I:%M:%S %p",
    "%B %d, %Y %I:%M:%S %p",
    "%b %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M:%S",
    "%d %b %Y %H:%M:%S",
    "%a %b %e %H:%M:%S %Y",
];

/// Date-only layouts. Month-first forms come before year-first ones and
/// two-digit years before four-digit ones, since `%Y` also accepts "14".
const DATE_LAYOUTS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
];

/// Outcome of layout matching before a zone is applied
enum Parsed {
    Instant(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

/// Parse a date string; values without an offset are taken as UTC.
///
/// `now` is the wall-clock instant that `now`, `now-3m`, `now+1d` count from.
pub fn parse(text: &str, now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, DateTimeError> {
    match parse_any(text, now)? {
        Parsed::Instant(t) => Ok(t),
        Parsed::Naive(naive) => Ok(naive.and_utc().fixed_offset()),
    }
}

/// Parse a date string, reading values without an offset as local time in `tz`.
pub fn parse_in(
    text: &str,
    tz: &Tz,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, DateTimeError> {
    match parse_any(text, now)? {
        Parsed::Instant(t) => Ok(t),
        Parsed::Naive(naive) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|t| t.fixed_offset())
            .ok_or_else(|| {
                DateTimeError::ParseError(format!("{} does not exist in {}", naive, tz.name()))
            }),
    }
}

/// Parse `text` with an explicit layout.
///
/// The hint is either a strftime layout (`%d/%m/%Y`) or a reference-date
/// layout (`02/01/2006`, `Jan 2, 2006 3:04:05 PM`). A hint with no layout
/// tokens at all falls back to [`parse`]; otherwise a mismatch is an error.
pub fn parse_with_hint(
    hint: &str,
    text: &str,
    now: DateTime<FixedOffset>,
) -> Result<DateTime<FixedOffset>, DateTimeError> {
    let text = text.trim();
    let Some(layout) = hint_layout(hint) else {
        return parse(text, now);
    };
    if let Ok(t) = DateTime::parse_from_str(text, &layout) {
        return Ok(t);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, &layout) {
        return Ok(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(text, &layout)
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset())
        .map_err(|e| {
            DateTimeError::ParseError(format!("{:?} does not match layout {:?}: {}", text, hint, e))
        })
}

/// Reference-date tokens and their strftime equivalents, longest first
/// within each leading character.
const REFERENCE_TOKENS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Jan", "%b"),
    ("Monday", "%A"),
    ("Mon", "%a"),
    ("2006", "%Y"),
    ("-07:00", "%:z"),
    ("-0700", "%z"),
    ("Z07:00", "%:z"),
    ("Z0700", "%z"),
    ("002", "%j"),
    ("_2", "%e"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("15", "%H"),
    ("PM", "%p"),
    ("pm", "%p"),
    ("1", "%m"),
    ("2", "%d"),
    ("3", "%I"),
    ("4", "%M"),
    ("5", "%S"),
];

/// The strftime layout for a hint, or `None` when it holds no layout tokens.
fn hint_layout(hint: &str) -> Option<String> {
    if hint.contains('%') {
        let has_tokens = StrftimeItems::new(hint)
            .any(|item| !matches!(item, Item::Literal(_) | Item::Space(_)));
        return has_tokens.then(|| hint.to_string());
    }
    let layout = reference_to_strftime(hint);
    (layout != hint).then_some(layout)
}

/// Rewrite a reference-date layout (Mon Jan 2 15:04:05 -0700 2006) as strftime.
fn reference_to_strftime(hint: &str) -> String {
    let mut out = String::with_capacity(hint.len() * 2);
    let mut rest = hint;
    'scan: while let Some(c) = rest.chars().next() {
        // fractional seconds: ".000" or ".999"
        if c == '.' || c == ',' {
            let digits = rest[1..]
                .bytes()
                .take_while(|b| *b == b'0' || *b == b'9')
                .count();
            let next_is_digit = rest[1 + digits..].starts_with(|d: char| d.is_ascii_digit());
            if digits > 0 && !next_is_digit {
                out.push_str("%.f");
                rest = &rest[1 + digits..];
                continue;
            }
        }
        for (token, item) in REFERENCE_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(item);
                rest = after;
                continue 'scan;
            }
        }
        if c == '%' {
            out.push('%');
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Resolve an IANA zone name such as `America/Los_Angeles`.
pub fn parse_timezone(name: &str) -> Result<Tz, DateTimeError> {
    name.parse::<Tz>()
        .map_err(|_| DateTimeError::ParseError(format!("unknown time zone: {:?}", name)))
}

/// Interpret a run of digits as a Unix epoch; the digit count selects the unit.
///
/// Up to 10 digits are seconds, 13 milliseconds, 16 microseconds, anything
/// longer nanoseconds.
pub fn from_epoch_digits(digits: &str) -> Result<DateTime<FixedOffset>, DateTimeError> {
    let n: i64 = digits
        .parse()
        .map_err(|_| DateTimeError::ParseError(format!("epoch out of range: {}", digits)))?;
    let len = digits.trim_start_matches('-').len();
    let t = match len {
        0..=10 => DateTime::from_timestamp(n, 0),
        11..=13 => DateTime::from_timestamp_millis(n),
        14..=16 => DateTime::from_timestamp_micros(n),
        _ => Some(DateTime::from_timestamp_nanos(n)),
    };
    t.map(|t| t.fixed_offset())
        .ok_or_else(|| DateTimeError::ParseError(format!("epoch out of range: {}", digits)))
}

/// A bare digit run: eight digits that form a valid `YYYYMMDD` date are that
/// date at midnight UTC, anything else is an epoch per [`from_epoch_digits`].
pub fn from_digits(digits: &str) -> Result<DateTime<FixedOffset>, DateTimeError> {
    if digits.len() == 8 && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(digits, "%Y%m%d") {
            return Ok(date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset());
        }
    }
    from_epoch_digits(digits)
}

/// Format with strftime tokens, rejecting unknown specifiers.
pub fn format(t: &DateTime<FixedOffset>, layout: &str) -> Result<String, DateTimeError> {
    let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(DateTimeError::FormatError(format!("invalid layout: {:?}", layout)));
    }
    let mut out = String::new();
    write!(out, "{}", t.format_with_items(items.iter()))
        .map_err(|_| DateTimeError::FormatError(format!("cannot format with {:?}", layout)))?;
    Ok(out)
}

fn parse_any(text: &str, now: DateTime<FixedOffset>) -> Result<Parsed, DateTimeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DateTimeError::ParseError("empty date".to_string()));
    }

    if text.chars().all(|c| c.is_ascii_digit()) {
        return from_digits(text).map(Parsed::Instant);
    }

    if text.get(..3).is_some_and(|head| head.eq_ignore_ascii_case("now")) {
        return relative(&text[3..], now).map(Parsed::Instant);
    }

    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(Parsed::Instant(t));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(text) {
        return Ok(Parsed::Instant(t));
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(t) = DateTime::parse_from_str(text, layout) {
            return Ok(Parsed::Instant(t));
        }
    }
    for layout in DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Ok(Parsed::Naive(naive));
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(text, layout) {
            return Ok(Parsed::Naive(date.and_time(chrono::NaiveTime::MIN)));
        }
    }

    Err(DateTimeError::ParseError(format!("unrecognized date: {:?}", text)))
}

/// `""`, `-3m`, `+1d`: offsets from the current time.
/// Units: s, m (minutes), h, d, w, M (months), y.
fn relative(rest: &str, now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, DateTimeError> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(now);
    }

    let bad = || DateTimeError::ParseError(format!("invalid relative date: now{}", rest));
    let (negative, body) = match rest.as_bytes()[0] {
        b'-' => (true, &rest[1..]),
        b'+' => (false, &rest[1..]),
        _ => return Err(bad()),
    };
    let unit = body.chars().last().ok_or_else(bad)?;
    let amount: u32 = body[..body.len() - unit.len_utf8()]
        .trim()
        .parse()
        .map_err(|_| bad())?;

    let shifted = match unit {
        'M' | 'y' => {
            let months = if unit == 'y' {
                amount.checked_mul(12).ok_or_else(bad)?
            } else {
                amount
            };
            let months = Months::new(months);
            if negative {
                now.checked_sub_months(months)
            } else {
                now.checked_add_months(months)
            }
        }
        _ => {
            let amount = i64::from(amount);
            let delta = match unit {
                's' => Duration::seconds(amount),
                'm' => Duration::minutes(amount),
                'h' => Duration::hours(amount),
                'd' => Duration::days(amount),
                'w' => Duration::weeks(amount),
                _ => return Err(bad()),
            };
            if negative {
                now.checked_sub_signed(delta)
            } else {
                now.checked_add_signed(delta)
            }
        }
    };
    shifted.ok_or_else(bad)
}

/// Current wall-clock time with a zero offset.
pub fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}
