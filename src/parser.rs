// Expression parser: lexer, Pratt parser and call-site binding

use log::debug;
use thiserror::Error;

use crate::ast::{BinaryOp, BoundFn, Expr, UnaryOp};
use crate::registry::{builtins, Registry};
use crate::signature::BindError;

/// Default nesting limit for parsed expressions
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unclosed string literal")]
    UnclosedString,

    #[error("Invalid escape sequence: {0}")]
    InvalidEscape(String),

    #[error("Unclosed comment")]
    UnclosedComment,

    #[error("Unclosed backtick name")]
    UnclosedBacktick,

    #[error("Expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Token types for the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    String(String),
    Int(i64),
    Number(f64),
    True,
    False,
    Null,

    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Not,
    In,
    NotIn,
    As,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,

    // Special
    Eof,
}

/// Lexer for tokenizing expressions
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParserError> {
        self.advance(); // '/'
        self.advance(); // '*'
        loop {
            match self.current() {
                None => return Err(ParserError::UnclosedComment),
                Some('*') if self.peek(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn read_string(&mut self, quote_char: char) -> Result<String, ParserError> {
        let mut result = String::new();
        self.advance(); // skip opening quote

        loop {
            match self.current() {
                None => return Err(ParserError::UnclosedString),
                Some(ch) if ch == quote_char => {
                    self.advance();
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        None => return Err(ParserError::UnclosedString),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some('/') => result.push('/'),
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some('u') => {
                            self.advance();
                            result.push(self.read_unicode_escape()?);
                            continue;
                        }
                        Some(ch) => return Err(ParserError::InvalidEscape(format!("\\{}", ch))),
                    }
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Four hex digits following `\u`
    fn read_unicode_escape(&mut self) -> Result<char, ParserError> {
        let mut hex = String::new();
        for _ in 0..4 {
            match self.current() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(h);
                    self.advance();
                }
                _ => return Err(ParserError::InvalidEscape(format!("\\u{}", hex))),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| ParserError::InvalidEscape(format!("\\u{}", hex)))
    }

    fn read_number(&mut self) -> Result<Token, ParserError> {
        let start = self.position;
        let mut is_float = false;

        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.current() == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.current(), Some('e') | Some('E')) {
            is_float = true;
            self.advance();
            if matches!(self.current(), Some('+') | Some('-')) {
                self.advance();
            }
            if !self.current().is_some_and(|c| c.is_ascii_digit()) {
                return Err(ParserError::InvalidNumber(
                    "Expected digit in exponent".to_string(),
                ));
            }
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str: String = self.input[start..self.position].iter().collect();
        if !is_float {
            if let Ok(n) = num_str.parse::<i64>() {
                return Ok(Token::Int(n));
            }
        }
        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ParserError::InvalidNumber(num_str))
    }

    /// Identifiers may contain dots: `array.index`, `user.name`.
    fn read_identifier(&mut self) -> String {
        let start = self.position;

        while let Some(ch) = self.current() {
            let dotted = ch == '.' && self.peek(1).is_some_and(|c| c.is_alphanumeric() || c == '_');
            if ch.is_alphanumeric() || ch == '_' || dotted {
                self.advance();
            } else {
                break;
            }
        }

        self.input[start..self.position].iter().collect()
    }

    fn read_backtick_name(&mut self) -> Result<String, ParserError> {
        self.advance(); // skip opening backtick
        let start = self.position;

        while let Some(ch) = self.current() {
            if ch == '`' {
                let name: String = self.input[start..self.position].iter().collect();
                self.advance();
                return Ok(name);
            }
            self.advance();
        }

        Err(ParserError::UnclosedBacktick)
    }

    /// After `NOT`, check whether the next word is `IN`.
    fn followed_by_in(&mut self) -> bool {
        let saved = self.position;
        self.skip_whitespace();
        if self.current().is_some_and(|c| c.is_alphabetic()) {
            let word = self.read_identifier();
            if word.eq_ignore_ascii_case("in") {
                return true;
            }
        }
        self.position = saved;
        false
    }

    fn single(&mut self, token: Token) -> Result<Token, ParserError> {
        self.advance();
        Ok(token)
    }

    fn double(&mut self, token: Token) -> Result<Token, ParserError> {
        self.advance();
        self.advance();
        Ok(token)
    }

    pub fn next_token(&mut self) -> Result<Token, ParserError> {
        loop {
            self.skip_whitespace();

            return match self.current() {
                None => Ok(Token::Eof),

                Some('/') if self.peek(1) == Some('*') => {
                    self.skip_comment()?;
                    continue;
                }

                Some('"') => Ok(Token::String(self.read_string('"')?)),
                Some('\'') => Ok(Token::String(self.read_string('\'')?)),
                Some('`') => Ok(Token::Identifier(self.read_backtick_name()?)),

                Some(ch) if ch.is_ascii_digit() => self.read_number(),

                // Two-character operators
                Some('=') if self.peek(1) == Some('=') => self.double(Token::Equal),
                Some('!') if self.peek(1) == Some('=') => self.double(Token::NotEqual),
                Some('<') if self.peek(1) == Some('>') => self.double(Token::NotEqual),
                Some('<') if self.peek(1) == Some('=') => self.double(Token::LessThanOrEqual),
                Some('>') if self.peek(1) == Some('=') => self.double(Token::GreaterThanOrEqual),
                Some('&') if self.peek(1) == Some('&') => self.double(Token::And),
                Some('|') if self.peek(1) == Some('|') => self.double(Token::Or),

                // Single-character operators and delimiters
                Some('(') => self.single(Token::LeftParen),
                Some(')') => self.single(Token::RightParen),
                Some('[') => self.single(Token::LeftBracket),
                Some(']') => self.single(Token::RightBracket),
                Some(',') => self.single(Token::Comma),
                Some('+') => self.single(Token::Plus),
                Some('-') => self.single(Token::Minus),
                Some('*') => self.single(Token::Star),
                Some('/') => self.single(Token::Slash),
                Some('%') => self.single(Token::Percent),
                Some('=') => self.single(Token::Equal),
                Some('<') => self.single(Token::LessThan),
                Some('>') => self.single(Token::GreaterThan),
                Some('!') => self.single(Token::Not),

                // Identifiers and keywords
                Some(ch) if ch.is_alphabetic() || ch == '_' => {
                    let ident = self.read_identifier();
                    Ok(match ident.to_ascii_lowercase().as_str() {
                        "true" => Token::True,
                        "false" => Token::False,
                        "null" => Token::Null,
                        "and" => Token::And,
                        "or" => Token::Or,
                        "in" => Token::In,
                        "as" => Token::As,
                        "not" if self.followed_by_in() => Token::NotIn,
                        "not" => Token::Not,
                        _ => Token::Identifier(ident),
                    })
                }

                Some(ch) => Err(ParserError::UnexpectedToken(ch.to_string())),
            };
        }
    }
}

/// Pratt parser that binds calls against a registry as it goes
pub struct Parser<'r> {
    lexer: Lexer,
    current_token: Token,
    registry: &'r Registry,
    depth: usize,
    max_depth: usize,
}

impl Parser<'static> {
    /// Parser bound to the builtin registry.
    pub fn new(input: &str) -> Result<Self, ParserError> {
        Parser::with_registry(input, builtins())
    }
}

impl<'r> Parser<'r> {
    pub fn with_registry(input: &str, registry: &'r Registry) -> Result<Self, ParserError> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            registry,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn advance(&mut self) -> Result<(), ParserError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        if self.current_token == expected {
            self.advance()
        } else if self.current_token == Token::Eof {
            Err(ParserError::UnexpectedEnd)
        } else {
            Err(ParserError::Expected {
                expected: format!("{:?}", expected),
                found: format!("{:?}", self.current_token),
            })
        }
    }

    /// (left_bp, right_bp) for infix tokens; higher binds tighter
    fn binding_power(token: &Token) -> Option<(u8, u8)> {
        match token {
            Token::Or => Some((10, 11)),
            Token::And => Some((20, 21)),
            Token::Equal
            | Token::NotEqual
            | Token::LessThan
            | Token::LessThanOrEqual
            | Token::GreaterThan
            | Token::GreaterThanOrEqual
            | Token::In
            | Token::NotIn => Some((40, 41)),
            Token::Plus | Token::Minus => Some((50, 51)),
            Token::Star | Token::Slash | Token::Percent => Some((60, 61)),
            _ => None,
        }
    }

    fn binary_op(token: &Token) -> Option<BinaryOp> {
        Some(match token {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Subtract,
            Token::Star => BinaryOp::Multiply,
            Token::Slash => BinaryOp::Divide,
            Token::Percent => BinaryOp::Modulo,
            Token::Equal => BinaryOp::Equal,
            Token::NotEqual => BinaryOp::NotEqual,
            Token::LessThan => BinaryOp::LessThan,
            Token::LessThanOrEqual => BinaryOp::LessThanOrEqual,
            Token::GreaterThan => BinaryOp::GreaterThan,
            Token::GreaterThanOrEqual => BinaryOp::GreaterThanOrEqual,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Parse a primary expression (literals, identifiers, calls, grouping)
    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        match self.current_token.clone() {
            Token::String(s) => {
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Int(n) => {
                self.advance()?;
                Ok(Expr::Int(n))
            }
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::True => {
                self.advance()?;
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expr::Bool(false))
            }
            Token::Null => {
                self.advance()?;
                Ok(Expr::Null)
            }
            Token::Identifier(name) => {
                self.advance()?;
                if self.current_token == Token::LeftParen {
                    self.parse_call(name)
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            Token::LeftParen => {
                self.advance()?;
                let inner = self.parse_expression(0)?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::LeftBracket => {
                self.advance()?;
                let items = self.parse_list(Token::RightBracket)?;
                Ok(Expr::Array(items))
            }
            Token::Minus => {
                self.advance()?;
                // Fold negative numeric literals
                match self.current_token {
                    Token::Int(n) => {
                        self.advance()?;
                        Ok(Expr::Int(-n))
                    }
                    Token::Number(n) => {
                        self.advance()?;
                        Ok(Expr::Number(-n))
                    }
                    _ => {
                        let operand = self.parse_expression(70)?;
                        Ok(Expr::Unary {
                            op: UnaryOp::Negate,
                            operand: Box::new(operand),
                        })
                    }
                }
            }
            Token::Not => {
                self.advance()?;
                let operand = self.parse_expression(30)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            Token::Eof => Err(ParserError::UnexpectedEnd),
            other => Err(ParserError::UnexpectedToken(format!("{:?}", other))),
        }
    }

    /// Comma-separated expressions up to and including `close`
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>, ParserError> {
        let mut items = Vec::new();
        if self.current_token != close {
            loop {
                items.push(self.parse_expression(0)?);
                if self.current_token != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    /// `name(args...)`, including the `cast(x AS type)` form
    fn parse_call(&mut self, name: String) -> Result<Expr, ParserError> {
        let def = self.registry.lookup(&name).ok_or_else(|| {
            debug!("unknown function {:?}", name);
            BindError::UnknownFunction(name.clone())
        })?;
        self.advance()?; // skip '('

        let mut args = Vec::new();
        if self.current_token != Token::RightParen {
            loop {
                args.push(self.parse_expression(0)?);
                if self.current_token == Token::As {
                    self.advance()?;
                    match self.current_token.clone() {
                        Token::Identifier(type_name) => {
                            args.push(Expr::String(type_name.to_ascii_lowercase()));
                            self.advance()?;
                        }
                        other => {
                            return Err(ParserError::Expected {
                                expected: "type name".to_string(),
                                found: format!("{:?}", other),
                            })
                        }
                    }
                }
                if self.current_token != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }
        self.expect(Token::RightParen)?;

        if let Err(e) = def.validate(&args) {
            debug!("bind failed for {}: {}", def.name, e);
            return Err(e.into());
        }

        Ok(Expr::Call {
            func: BoundFn(def),
            args,
        })
    }

    /// Parse an expression with Pratt parsing
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParserError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParserError::TooDeep(self.max_depth));
        }
        let result = self.parse_expression_inner(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min_bp: u8) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_primary()?;

        loop {
            let (left_bp, right_bp) = match Self::binding_power(&self.current_token) {
                Some(bp) => bp,
                None => break,
            };

            if left_bp < min_bp {
                break;
            }

            match self.current_token {
                Token::In | Token::NotIn => {
                    let negated = self.current_token == Token::NotIn;
                    self.advance()?;
                    let list = match self.current_token {
                        Token::LeftParen => {
                            self.advance()?;
                            self.parse_list(Token::RightParen)?
                        }
                        Token::LeftBracket => {
                            self.advance()?;
                            self.parse_list(Token::RightBracket)?
                        }
                        _ => vec![self.parse_expression(right_bp)?],
                    };
                    lhs = Expr::In {
                        needle: Box::new(lhs),
                        list,
                        negated,
                    };
                }
                _ => {
                    let op = Self::binary_op(&self.current_token).ok_or_else(|| {
                        ParserError::UnexpectedToken(format!("{:?}", self.current_token))
                    })?;
                    self.advance()?;
                    let rhs = self.parse_expression(right_bp)?;
                    lhs = Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
            }
        }

        Ok(lhs)
    }

    pub fn parse(&mut self) -> Result<Expr, ParserError> {
        let expr = self.parse_expression(0)?;

        if self.current_token != Token::Eof {
            return Err(ParserError::Expected {
                expected: "end of expression".to_string(),
                found: format!("{:?}", self.current_token),
            });
        }

        Ok(expr)
    }
}

/// Parse and bind an expression against the builtin registry.
pub fn parse_expression(text: &str) -> Result<Expr, ParserError> {
    Parser::new(text)?.parse()
}
