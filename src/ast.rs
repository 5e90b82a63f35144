// Expression tree produced by the parser and walked by the evaluator

use std::fmt;

use serde::{Serialize, Serializer};

use crate::registry::FunctionDef;

/// A call target resolved against a registry at parse time
#[derive(Clone, Copy)]
pub struct BoundFn(pub &'static FunctionDef);

impl BoundFn {
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn def(&self) -> &'static FunctionDef {
        self.0
    }
}

impl PartialEq for BoundFn {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl fmt::Debug for BoundFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundFn({})", self.0.name)
    }
}

impl Serialize for BoundFn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.name)
    }
}

/// Expression nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Quoted string literal
    String(String),

    /// Integer literal
    Int(i64),

    /// Literal with a fraction or exponent
    Number(f64),

    Bool(bool),

    /// `null`; evaluates to Absent
    Null,

    /// Field reference resolved through the row context (may contain dots)
    Identifier(String),

    /// Array literal `[a, b, ...]`
    Array(Vec<Expr>),

    /// Builtin call, validated when bound
    Call { func: BoundFn, args: Vec<Expr> },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Unary { op: UnaryOp, operand: Box<Expr> },

    /// `x IN (a, b)` / `x NOT IN (a, b)`
    In {
        needle: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    /// Negation (-)
    Negate,

    /// Logical NOT
    Not,
}

impl Expr {
    pub fn string(s: impl Into<String>) -> Self {
        Expr::String(s.into())
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(name.into())
    }

    pub fn call(def: &'static FunctionDef, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: BoundFn(def),
            args,
        }
    }

    /// The text of a quoted string literal, `None` for anything else.
    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Expr::String(s) => Some(s),
            _ => None,
        }
    }

    /// Literal node (no identifier or call beneath it).
    pub fn is_literal(&self) -> bool {
        match self {
            Expr::String(_) | Expr::Int(_) | Expr::Number(_) | Expr::Bool(_) | Expr::Null => true,
            Expr::Array(items) => items.iter().all(Expr::is_literal),
            Expr::Unary { operand, .. } => operand.is_literal(),
            _ => false,
        }
    }

    /// Nesting depth of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        let children = match self {
            Expr::Array(items) | Expr::Call { args: items, .. } => {
                items.iter().map(Expr::depth).max().unwrap_or(0)
            }
            Expr::Binary { lhs, rhs, .. } => lhs.depth().max(rhs.depth()),
            Expr::Unary { operand, .. } => operand.depth(),
            Expr::In { needle, list, .. } => list
                .iter()
                .map(Expr::depth)
                .max()
                .unwrap_or(0)
                .max(needle.depth()),
            _ => 0,
        };
        children + 1
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Renders the expression back to parseable text.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::String(s) => write!(f, "{:?}", s),
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Number(n) => write!(f, "{:?}", n),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Null => write!(f, "null"),
            Expr::Identifier(name) => {
                if name
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
                {
                    write!(f, "{}", name)
                } else {
                    write!(f, "`{}`", name)
                }
            }
            Expr::Array(items) => {
                write!(f, "[")?;
                write_list(f, items)?;
                write!(f, "]")
            }
            Expr::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op.symbol(), rhs),
            Expr::Unary {
                op: UnaryOp::Negate,
                operand,
            } => write!(f, "-{}", operand),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "NOT {}", operand),
            Expr::In {
                needle,
                list,
                negated,
            } => {
                write!(f, "{} {}IN (", needle, if *negated { "NOT " } else { "" })?;
                write_list(f, list)?;
                write!(f, ")")
            }
        }
    }
}
