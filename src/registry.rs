// Function registry: name → definition, built once and read-only afterwards

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::ast::Expr;
use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions;
use crate::signature::{BindError, Signature};
use crate::value::Value;

/// Runtime body of a builtin: already-evaluated arguments in, one value out
pub type EvalFn = fn(&dyn ContextReader, &[Value]) -> Result<Value, EvalError>;

/// Grouping used for listing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCategory {
    /// eq, ne, exists, any, contains, ...
    Logical,
    /// map, filter, match, array.index, ...
    Collections,
    /// split, join, tolower, len, ...
    Strings,
    /// cast, toint, tobool, tonumber
    Cast,
    /// pow, sqrt, sum, avg, count
    Math,
    /// todate, extract, unixtrunc, ...
    Time,
    /// hash.* and encoding.*
    Hash,
    /// email, url and user-agent helpers
    Web,
    /// json.jmespath
    Json,
}

/// A builtin function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Canonical lowercase name; dotted names are plain keys
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub category: FunctionCategory,
    pub signature: Signature,
    /// Failed operands are passed in as `Value::Error` instead of aborting
    pub absorbing: bool,
    pub eval: EvalFn,
}

impl FunctionDef {
    pub const fn new(
        name: &'static str,
        category: FunctionCategory,
        signature: Signature,
        eval: EvalFn,
    ) -> Self {
        FunctionDef {
            name,
            aliases: &[],
            category,
            signature,
            absorbing: false,
            eval,
        }
    }

    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub const fn absorbing(mut self) -> Self {
        self.absorbing = true;
        self
    }

    pub fn validate(&self, args: &[Expr]) -> Result<(), BindError> {
        self.signature.validate(self.name, args)
    }

    pub fn call(&self, ctx: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
        (self.eval)(ctx, args)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("signature", &self.signature)
            .field("absorbing", &self.absorbing)
            .finish()
    }
}

/// Case-insensitive lookup table of function definitions
#[derive(Debug, Default, Clone)]
pub struct Registry {
    functions: HashMap<String, &'static FunctionDef>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Registry {
            functions: HashMap::new(),
        }
    }

    /// A registry holding every builtin.
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        for def in functions::all() {
            registry.register(def);
        }
        registry
    }

    /// Register a definition under its name and aliases; later
    /// registrations replace earlier ones.
    pub fn register(&mut self, def: &'static FunctionDef) {
        self.functions.insert(def.name.to_ascii_lowercase(), def);
        for alias in def.aliases {
            self.functions.insert(alias.to_ascii_lowercase(), def);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&'static FunctionDef> {
        self.functions.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Number of registered names, aliases included.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Canonical definitions in one category, sorted by name.
    pub fn in_category(&self, category: FunctionCategory) -> Vec<&'static FunctionDef> {
        let mut defs: Vec<_> = self
            .functions
            .iter()
            .filter(|(key, def)| def.category == category && key.as_str() == def.name)
            .map(|(_, def)| *def)
            .collect();
        defs.sort_by_key(|d| d.name);
        defs
    }
}

static BUILTINS: LazyLock<Registry> = LazyLock::new(Registry::with_builtins);

/// The process-wide builtin registry.
pub fn builtins() -> &'static Registry {
    &BUILTINS
}
