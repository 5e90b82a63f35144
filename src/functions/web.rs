// Email, URL and user-agent builtins

use percent_encoding::percent_decode_str;
use url::Url;

use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::arg;
use crate::registry::{FunctionCategory::Web, FunctionDef};
use crate::signature::Signature;
use crate::utils::{first_text, flatten, PlainMatch, Patterns};
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("email", Web, Signature::exact(1), email),
    FunctionDef::new("emailname", Web, Signature::exact(1), emailname),
    FunctionDef::new("emaildomain", Web, Signature::exact(1), emaildomain),
    FunctionDef::new("host", Web, Signature::exact(1), host),
    FunctionDef::new("hosts", Web, Signature::at_least(1), hosts),
    FunctionDef::new("domain", Web, Signature::exact(1), domain),
    FunctionDef::new("domains", Web, Signature::at_least(1), domains),
    FunctionDef::new("path", Web, Signature::exact(1), path),
    FunctionDef::new("qs", Web, Signature::exact(2), qs),
    FunctionDef::new("urldecode", Web, Signature::exact(1), urldecode),
    FunctionDef::new("url.matchqs", Web, Signature::at_least(1), url_matchqs),
    FunctionDef::new("urlminusqs", Web, Signature::at_least(2), urlminusqs),
    FunctionDef::new("urlmain", Web, Signature::exact(1), urlmain),
    FunctionDef::new("useragent", Web, Signature::exact(2), useragent),
];

fn input(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Absent => Err(EvalError::Missing),
        other => first_text(other).ok_or_else(|| other.mismatch("string")),
    }
}

// ── Email ────────────────────────────────────────────────────────────────────

/// `Name <addr>` or a bare address; the address comes back lowercased.
fn parse_email(text: &str) -> Result<(String, String), EvalError> {
    let text = text.trim();
    let (name, addr) = match (text.find('<'), text.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            (text[..open].trim(), text[open + 1..close].trim())
        }
        _ => ("", text),
    };
    let valid = match addr.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !addr.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(EvalError::InvalidInput(format!("not an email address: {:?}", text)));
    }
    Ok((name.trim_matches('"').to_string(), addr.to_lowercase()))
}

fn email(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let (_, addr) = parse_email(&input(arg(args, 0))?)?;
    Ok(Value::String(addr))
}

fn emailname(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let (name, _) = parse_email(&input(arg(args, 0))?)?;
    if name.is_empty() {
        return Err(EvalError::EmptyArgument("email display name"));
    }
    Ok(Value::String(name))
}

fn emaildomain(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let (_, addr) = parse_email(&input(arg(args, 0))?)?;
    let domain = addr.rsplit('@').next().unwrap_or_default();
    Ok(Value::string(domain))
}

// ── URL ──────────────────────────────────────────────────────────────────────

/// Parse a URL, assuming `http://` when the text has no scheme.
fn parse_url(text: &str) -> Result<Url, EvalError> {
    let text = text.trim();
    let invalid = |e: url::ParseError| EvalError::InvalidInput(format!("invalid url {:?}: {}", text, e));
    match Url::parse(text) {
        Ok(url) if url.has_host() => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("http://{}", text)).map_err(invalid)
        }
        Err(e) => Err(invalid(e)),
    }
}

fn host_of(text: &str) -> Result<String, EvalError> {
    let url = parse_url(text)?;
    url.host_str()
        .map(str::to_lowercase)
        .ok_or_else(|| EvalError::InvalidInput(format!("url has no host: {:?}", text)))
}

fn domain_of(text: &str) -> Result<String, EvalError> {
    let host = host_of(text)?;
    Ok(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Apply `f` to every string argument, flattening lists.
fn each_url(args: &[Value], f: fn(&str) -> Result<String, EvalError>) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    for value in flatten(args) {
        match value {
            Value::Absent => {}
            other => out.push(f(&input(&other)?)?),
        }
    }
    Ok(Value::StringList(out))
}

fn host(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    host_of(&input(arg(args, 0))?).map(Value::String)
}

fn hosts(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    each_url(args, host_of)
}

/// Host without a leading `www.`.
fn domain(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    domain_of(&input(arg(args, 0))?).map(Value::String)
}

fn domains(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    each_url(args, domain_of)
}

/// Path component. A one-letter scheme is a drive letter, so everything
/// after it (`c://Windows/x` gives `//windows/x`) is the path.
fn path(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(arg(args, 0))?;
    let text = text.trim();
    if text.starts_with('/') {
        let end = text.find(['?', '#']).unwrap_or(text.len());
        return Ok(Value::string(&text[..end]));
    }
    let url = parse_url(text)?;
    if url.scheme().len() == 1 {
        let host = url.host_str().unwrap_or_default().to_lowercase();
        return Ok(Value::String(format!("//{}{}", host, url.path())));
    }
    Ok(Value::string(url.path()))
}

/// One query parameter; a missing key is Absent.
fn qs(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let url = parse_url(&input(arg(args, 0))?)?;
    let key = input(arg(args, 1))?;
    Ok(url
        .query_pairs()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| Value::String(v.into_owned()))
        .unwrap_or(Value::Absent))
}

fn urldecode(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(arg(args, 0))?.replace('+', " ");
    percent_decode_str(&text)
        .decode_utf8()
        .map(|s| Value::String(s.into_owned()))
        .map_err(|e| EvalError::InvalidInput(format!("urldecode: {}", e)))
}

/// Query keys from the trailing arguments; globs allowed, plain names exact.
fn key_patterns(args: &[Value]) -> Result<Patterns, EvalError> {
    let keys = flatten(args.get(1..).unwrap_or_default())
        .iter()
        .map(input)
        .collect::<Result<Vec<_>, _>>()?;
    Patterns::new(keys, PlainMatch::Exact)
}

/// Raw `key=value` pairs whose key matches, in their original order.
fn kept_params<'a>(query: &'a str, patterns: &Patterns, keep: bool) -> Vec<&'a str> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            patterns.matches(key) == keep
        })
        .collect()
}

/// Host and path plus only the listed query parameters.
fn url_matchqs(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let url = parse_url(&input(arg(args, 0))?)?;
    let patterns = key_patterns(args)?;
    let host = url.host_str().unwrap_or_default().to_lowercase();

    let mut out = format!("{}{}", host, url.path());
    let kept = kept_params(url.query().unwrap_or_default(), &patterns, true);
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    Ok(Value::String(out))
}

/// The original text with the listed query parameters removed.
fn urlminusqs(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(arg(args, 0))?;
    parse_url(&text)?;
    let patterns = key_patterns(args)?;

    let (rest, fragment) = match text.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (text.as_str(), None),
    };
    let Some((base, query)) = rest.split_once('?') else {
        return Ok(Value::String(text.clone()));
    };

    let mut out = base.to_string();
    let kept = kept_params(query, &patterns, false);
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(Value::String(out))
}

/// Host and path exactly as written, without scheme or query.
fn urlmain(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(arg(args, 0))?;
    let text = text.trim();
    parse_url(text)?;
    let without_scheme = text.split_once("://").map_or(text, |(_, rest)| rest);
    let end = without_scheme.find(['?', '#']).unwrap_or(without_scheme.len());
    Ok(Value::string(&without_scheme[..end]))
}

// ── User agent ───────────────────────────────────────────────────────────────

/// Fields recognised in a user-agent string
#[derive(Debug, Default, PartialEq)]
struct UserAgent {
    platform: Option<String>,
    os: Option<String>,
    browser: Option<String>,
    browser_version: Option<String>,
    engine: Option<String>,
    mobile: bool,
    bot: bool,
}

/// Comment tokens that wrap the real operating system name
const OS_WRAPPERS: &[&str] = &["X11", "Macintosh", "iPhone", "iPad", "iPod", "Linux", "compatible"];

/// Browser products in detection order: name in the string, reported name
const BROWSERS: &[(&str, &str)] = &[
    ("Edg", "Edge"),
    ("Edge", "Edge"),
    ("OPR", "Opera"),
    ("Opera", "Opera"),
    ("Firefox", "Firefox"),
    ("CriOS", "Chrome"),
    ("Chrome", "Chrome"),
    ("Safari", "Safari"),
];

const ENGINES: &[&str] = &["AppleWebKit", "Gecko", "Trident", "Presto"];

impl UserAgent {
    fn parse(ua: &str) -> Self {
        let mut agent = UserAgent::default();

        if let Some(comment) = first_comment(ua) {
            let tokens: Vec<&str> = comment
                .split(';')
                .map(str::trim)
                // single letters are encryption-strength markers
                .filter(|t| t.len() > 1)
                .collect();
            if let Some(first) = tokens.first() {
                agent.platform = Some(first.to_string());
                agent.os = if OS_WRAPPERS.contains(first) {
                    tokens.get(1).map(|t| t.to_string())
                } else {
                    Some(first.to_string())
                };
            }
            if let Some(msie) = tokens.iter().find_map(|t| t.strip_prefix("MSIE ")) {
                agent.browser = Some("Internet Explorer".to_string());
                agent.browser_version = Some(msie.to_string());
            }
        }

        let products = products(ua);
        let version_of = |name: &str| {
            products
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.to_string())
        };
        if agent.browser.is_none() {
            if let Some((token, name)) = BROWSERS
                .iter()
                .find(|(token, _)| products.iter().any(|(n, _)| n.as_str() == *token))
            {
                agent.browser = Some(name.to_string());
                agent.browser_version = if *name == "Safari" {
                    version_of("Version").or_else(|| version_of(token))
                } else {
                    version_of(token)
                };
            }
        }
        agent.engine = ENGINES
            .iter()
            .find(|e| ua.contains(**e))
            .map(|e| e.to_string());

        agent.mobile = ["Mobile", "Android", "iPhone", "iPad"]
            .iter()
            .any(|m| ua.contains(*m));
        let lower = ua.to_ascii_lowercase();
        agent.bot = ["bot", "crawler", "spider"].iter().any(|b| lower.contains(*b));
        agent
    }
}

/// Text inside the first parenthesised group.
fn first_comment(ua: &str) -> Option<&str> {
    let open = ua.find('(')?;
    let close = ua[open..].find(')')? + open;
    Some(&ua[open + 1..close])
}

/// `name/version` tokens outside any parentheses.
fn products(ua: &str) -> Vec<(String, String)> {
    let mut outside = String::with_capacity(ua.len());
    let mut depth = 0usize;
    for c in ua.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => outside.push(c),
            _ => {}
        }
    }
    outside
        .split_whitespace()
        .filter_map(|token| token.split_once('/'))
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect()
}

fn useragent(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let ua = input(arg(args, 0))?;
    let field = input(arg(args, 1))?.to_ascii_lowercase();
    let agent = UserAgent::parse(&ua);
    let value = match field.as_str() {
        "os" => agent.os.into(),
        "platform" => agent.platform.into(),
        "browser" => agent.browser.into(),
        "browser_version" => agent.browser_version.into(),
        "engine" => agent.engine.into(),
        "mobile" => Value::Bool(agent.mobile),
        "bot" => Value::Bool(agent.bot),
        other => {
            return Err(EvalError::InvalidInput(format!("unknown useragent field {:?}", other)));
        }
    };
    Ok(value)
}
