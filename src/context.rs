// Row contexts: how identifiers resolve to values during evaluation

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;

use crate::datetime;
use crate::value::Value;

/// Read-only view of one row.
///
/// `get` returns `None` when the identifier is unknown; the evaluator turns
/// that into [`Value::Absent`].
pub trait ContextReader: Send + Sync {
    fn get(&self, name: &str) -> Option<Value>;

    /// Every field in the row, used by prefix-matching builtins.
    fn row(&self) -> IndexMap<String, Value>;

    /// The row's own timestamp; zero-argument time builtins project it.
    fn reference_time(&self) -> DateTime<FixedOffset>;

    /// The wall clock that relative strings such as `now-3m` count from.
    fn now(&self) -> DateTime<FixedOffset> {
        datetime::now()
    }
}

/// A single map-backed row.
#[derive(Debug, Clone)]
pub struct MapContext {
    fields: IndexMap<String, Value>,
    ts: DateTime<FixedOffset>,
}

impl MapContext {
    /// Empty row whose reference time is the wall clock at construction.
    pub fn new() -> Self {
        MapContext {
            fields: IndexMap::new(),
            ts: datetime::now(),
        }
    }

    pub fn with_time(ts: DateTime<FixedOffset>) -> Self {
        MapContext {
            fields: IndexMap::new(),
            ts,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Builder form of [`MapContext::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Build a row from a JSON object; non-object input yields an empty row.
    pub fn from_json(json: serde_json::Value, ts: DateTime<FixedOffset>) -> Self {
        let mut ctx = MapContext::with_time(ts);
        if let serde_json::Value::Object(map) = json {
            for (k, v) in map {
                ctx.fields.insert(k, Value::from(v));
            }
        }
        ctx
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for MapContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextReader for MapContext {
    fn get(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn row(&self) -> IndexMap<String, Value> {
        self.fields.clone()
    }

    fn reference_time(&self) -> DateTime<FixedOffset> {
        self.ts
    }
}

/// Several readers layered together; the first reader that knows a name wins.
pub struct NestedContext {
    readers: Vec<Box<dyn ContextReader>>,
    ts: DateTime<FixedOffset>,
}

impl NestedContext {
    pub fn new(readers: Vec<Box<dyn ContextReader>>, ts: DateTime<FixedOffset>) -> Self {
        NestedContext { readers, ts }
    }

    /// Append a reader at the lowest priority.
    pub fn push(&mut self, reader: Box<dyn ContextReader>) {
        self.readers.push(reader);
    }
}

impl ContextReader for NestedContext {
    fn get(&self, name: &str) -> Option<Value> {
        self.readers.iter().find_map(|r| r.get(name))
    }

    fn row(&self) -> IndexMap<String, Value> {
        let mut merged = IndexMap::new();
        for reader in &self.readers {
            for (k, v) in reader.row() {
                merged.entry(k).or_insert(v);
            }
        }
        merged
    }

    fn reference_time(&self) -> DateTime<FixedOffset> {
        self.ts
    }
}
