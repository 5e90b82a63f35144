// JMESPath queries over JSON held in a row

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jmespath::Expression;
use log::trace;

use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::arg;
use crate::registry::{FunctionCategory::Json, FunctionDef};
use crate::signature::{ArgRule, Signature};
use crate::utils::first_text;
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[FunctionDef::new(
    "json.jmespath",
    Json,
    Signature::exact(2).with_rules(&[ArgRule::Any, ArgRule::StringLiteral]),
    jmespath_search,
)];

/// Run `expr` against the document; a bad document, a bad expression or a
/// null result all come back as Absent rather than an error.
fn jmespath_search(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let expr = arg(args, 1).require_str()?;
    Ok(search(arg(args, 0), expr).unwrap_or(Value::Absent))
}

fn document(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::String(_) | Value::StringList(_) => {
            let text = first_text(value)?;
            serde_json::from_str(&text)
                .inspect_err(|e| trace!("json.jmespath: malformed document: {}", e))
                .ok()
        }
        Value::GenericMap(map) => Some(serde_json::Value::Object(map.clone())),
        Value::Absent | Value::Error(_) => None,
        other => serde_json::to_value(other).ok(),
    }
}

const MAX_COMPILED_PATHS: usize = 100;

thread_local! {
    // Compiled paths by source text; `None` marks a path that failed to compile.
    static COMPILED: RefCell<HashMap<String, Option<Rc<Expression<'static>>>>> =
        RefCell::new(HashMap::new());
}

/// Compile `expr` once per thread and reuse it for every later row.
fn compiled(expr: &str) -> Option<Rc<Expression<'static>>> {
    COMPILED.with(|cache| {
        if let Some(hit) = cache.borrow().get(expr) {
            return hit.clone();
        }
        let compiled = jmespath::compile(expr)
            .inspect_err(|e| trace!("json.jmespath: bad expression {:?}: {}", expr, e))
            .ok()
            .map(Rc::new);

        let mut cache = cache.borrow_mut();
        if cache.len() >= MAX_COMPILED_PATHS {
            let stale: Vec<String> = cache.keys().take(MAX_COMPILED_PATHS / 2).cloned().collect();
            for key in stale {
                cache.remove(&key);
            }
        }
        cache.insert(expr.to_string(), compiled.clone());
        compiled
    })
}

fn search(doc: &Value, expr: &str) -> Option<Value> {
    let data = document(doc)?;
    let compiled = compiled(expr)?;
    let result = compiled.search(data).ok()?;
    let json = serde_json::to_value(&*result).ok()?;
    Some(Value::from(json))
}
