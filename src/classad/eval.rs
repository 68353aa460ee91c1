//! Evaluation of attribute expressions in the scope of their own ad.
//!
//! Covers the subset of the ClassAd language that shows up in daemon ads:
//! literals, attribute references (bare, `MY.` or `TARGET.`), unary and binary
//! arithmetic, comparisons, the meta-equality operators, `&&`/`||`/`!` and the
//! `?:` conditional. Function calls, lists and records inside expressions, and
//! anything that evaluates to `error` are not computable; callers then keep
//! the expression text.

use std::cmp::Ordering;

use super::parse::parse_string;
use super::value::Value;
use super::ClassAd;

/// Attribute references followed before giving up.
const MAX_DEPTH: usize = 32;

/// Evaluate `expr` against `ad`. Returns [`Value::Expr`] when the expression
/// cannot be computed.
pub fn evaluate(ad: &ClassAd, expr: &str) -> Value {
    Evaluator::new(ad).expr_text(expr).unwrap_or(Value::Expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(Value),
    Ident(String),
    Op(&'static str),
}

const OPERATORS: [&str; 20] = [
    "=?=", "=!=", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!",
    "(", ")", "?", ":",
];

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        let c = rest.chars().next()?;
        if c == '"' {
            let (s, after) = parse_string(rest)?;
            tokens.push(Token::Literal(Value::String(s)));
            rest = after;
        } else if c.is_ascii_digit()
            || (c == '.' && rest[1..].starts_with(|d: char| d.is_ascii_digit()))
        {
            let (number, after) = lex_number(rest)?;
            tokens.push(Token::Literal(number));
            rest = after;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..end].to_string()));
            rest = &rest[end..];
        } else {
            let op: &'static str = *OPERATORS.iter().find(|op| rest.starts_with(**op))?;
            tokens.push(Token::Op(op));
            rest = &rest[op.len()..];
        }
        rest = rest.trim_start();
    }
    Some(tokens)
}

fn lex_number(text: &str) -> Option<(Value, &str)> {
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut real = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !real => {
                real = true;
                end += 1;
            }
            b'e' | b'E' => {
                real = true;
                end += 1;
                if matches!(bytes.get(end), Some(b'+' | b'-')) {
                    end += 1;
                }
            }
            _ => break,
        }
    }
    let (number, rest) = text.split_at(end);
    let value = if real {
        Value::Real(number.parse().ok()?)
    } else {
        Value::Integer(number.parse().ok()?)
    };
    Some((value, rest))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    My,
    Target,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Literal(Value),
    Error,
    Attr(Scope, String),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(&'static str, Box<Node>, Box<Node>),
    Cond(Box<Node>, Box<Node>, Box<Node>),
}

/// Recursive-descent parser, lowest precedence first.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse(text: &str) -> Option<Node> {
        let mut parser = Parser {
            tokens: tokenize(text)?,
            pos: 0,
        };
        let node = parser.conditional()?;
        (parser.pos == parser.tokens.len()).then_some(node)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn eat_keyword(&mut self) -> Option<&'static str> {
        let Some(Token::Ident(word)) = self.peek() else {
            return None;
        };
        let op = if word.eq_ignore_ascii_case("is") {
            "=?="
        } else if word.eq_ignore_ascii_case("isnt") {
            "=!="
        } else {
            return None;
        };
        self.pos += 1;
        Some(op)
    }

    fn conditional(&mut self) -> Option<Node> {
        let cond = self.binary(0)?;
        if self.eat_op(&["?"]).is_none() {
            return Some(cond);
        }
        let then = self.conditional()?;
        self.eat_op(&[":"])?;
        let otherwise = self.conditional()?;
        Some(Node::Cond(
            Box::new(cond),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    const LEVELS: [&'static [&'static str]; 5] = [
        &["||"],
        &["&&"],
        &["==", "!=", "=?=", "=!="],
        &["<", "<=", ">", ">="],
        &["+", "-"],
    ];

    fn binary(&mut self, level: usize) -> Option<Node> {
        if level == Self::LEVELS.len() {
            return self.product();
        }
        let mut lhs = self.binary(level + 1)?;
        loop {
            let op = match self.eat_op(Self::LEVELS[level]) {
                Some(op) => op,
                None if level == 2 => match self.eat_keyword() {
                    Some(op) => op,
                    None => break,
                },
                None => break,
            };
            let rhs = self.binary(level + 1)?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Some(lhs)
    }

    fn product(&mut self) -> Option<Node> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&["*", "/", "%"]) {
            let rhs = self.unary()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<Node> {
        match self.eat_op(&["-", "+", "!"]) {
            Some("-") => Some(Node::Neg(Box::new(self.unary()?))),
            Some("!") => Some(Node::Not(Box::new(self.unary()?))),
            Some(_) => self.unary(),
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Option<Node> {
        let token = self.tokens.get(self.pos)?.clone();
        self.pos += 1;
        match token {
            Token::Literal(value) => Some(Node::Literal(value)),
            Token::Op("(") => {
                let inner = self.conditional()?;
                self.eat_op(&[")"])?;
                Some(inner)
            }
            Token::Op(_) => None,
            Token::Ident(word) => {
                // function calls are not supported
                if matches!(self.peek(), Some(Token::Op("("))) {
                    return None;
                }
                ident(&word)
            }
        }
    }
}

fn ident(word: &str) -> Option<Node> {
    let keyword = |k: &str| word.eq_ignore_ascii_case(k);
    if keyword("true") {
        return Some(Node::Literal(Value::Boolean(true)));
    }
    if keyword("false") {
        return Some(Node::Literal(Value::Boolean(false)));
    }
    if keyword("undefined") {
        return Some(Node::Literal(Value::Undefined));
    }
    if keyword("error") {
        return Some(Node::Error);
    }
    match word.split_once('.') {
        None => Some(Node::Attr(Scope::My, word.to_string())),
        Some((scope, name)) if !name.is_empty() && !name.contains('.') => {
            if scope.eq_ignore_ascii_case("my") {
                Some(Node::Attr(Scope::My, name.to_string()))
            } else if scope.eq_ignore_ascii_case("target") {
                Some(Node::Attr(Scope::Target, name.to_string()))
            } else {
                None
            }
        }
        Some(_) => None,
    }
}

/// Evaluates nodes against one ad. `None` means the result is `error` or
/// outside what this evaluator computes.
struct Evaluator<'a> {
    ad: &'a ClassAd,
    active: Vec<String>,
}

impl<'a> Evaluator<'a> {
    fn new(ad: &'a ClassAd) -> Self {
        Self {
            ad,
            active: Vec::new(),
        }
    }

    fn expr_text(&mut self, text: &str) -> Option<Value> {
        let literal = super::parse_expr(text);
        if literal != Value::Expr {
            return Some(literal);
        }
        let node = Parser::parse(text)?;
        self.eval(&node)
    }

    fn attribute(&mut self, name: &str) -> Option<Value> {
        let Some(attr) = self.ad.attribute(name) else {
            return Some(Value::Undefined);
        };
        if attr.value != Value::Expr {
            return Some(attr.value.clone());
        }
        let key = attr.name.to_ascii_lowercase();
        if self.active.contains(&key) || self.active.len() >= MAX_DEPTH {
            return None;
        }
        self.active.push(key);
        let result = self.expr_text(&attr.expr);
        self.active.pop();
        result
    }

    fn eval(&mut self, node: &Node) -> Option<Value> {
        match node {
            Node::Literal(value) => Some(value.clone()),
            Node::Error => None,
            Node::Attr(Scope::My, name) => self.attribute(name),
            // no match candidate is in scope
            Node::Attr(Scope::Target, _) => Some(Value::Undefined),
            Node::Neg(inner) => match self.eval(inner)? {
                Value::Integer(i) => i.checked_neg().map(Value::Integer),
                Value::Real(r) => Some(Value::Real(-r)),
                Value::Undefined => Some(Value::Undefined),
                _ => None,
            },
            Node::Not(inner) => match truth(&self.eval(inner)?)? {
                Some(b) => Some(Value::Boolean(!b)),
                None => Some(Value::Undefined),
            },
            Node::Cond(cond, then, otherwise) => match truth(&self.eval(cond)?)? {
                Some(true) => self.eval(then),
                Some(false) => self.eval(otherwise),
                None => Some(Value::Undefined),
            },
            Node::Binary("&&", lhs, rhs) => {
                let left = truth(&self.eval(lhs)?)?;
                if left == Some(false) {
                    return Some(Value::Boolean(false));
                }
                let right = truth(&self.eval(rhs)?)?;
                Some(match (left, right) {
                    (_, Some(false)) => Value::Boolean(false),
                    (Some(true), Some(true)) => Value::Boolean(true),
                    _ => Value::Undefined,
                })
            }
            Node::Binary("||", lhs, rhs) => {
                let left = truth(&self.eval(lhs)?)?;
                if left == Some(true) {
                    return Some(Value::Boolean(true));
                }
                let right = truth(&self.eval(rhs)?)?;
                Some(match (left, right) {
                    (_, Some(true)) => Value::Boolean(true),
                    (Some(false), Some(false)) => Value::Boolean(false),
                    _ => Value::Undefined,
                })
            }
            Node::Binary(op, lhs, rhs) => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                binary(op, left, right)
            }
        }
    }
}

/// Boolean reading of a value: `Some(None)` for undefined, `None` for types
/// that have no truth value.
fn truth(value: &Value) -> Option<Option<bool>> {
    match value {
        Value::Boolean(b) => Some(Some(*b)),
        Value::Integer(i) => Some(Some(*i != 0)),
        Value::Real(r) => Some(Some(*r != 0.0)),
        Value::Undefined => Some(None),
        _ => None,
    }
}

fn binary(op: &str, left: Value, right: Value) -> Option<Value> {
    match op {
        "=?=" => return Some(Value::Boolean(left == right)),
        "=!=" => return Some(Value::Boolean(left != right)),
        _ => {}
    }
    if left == Value::Undefined || right == Value::Undefined {
        return Some(Value::Undefined);
    }
    match op {
        "+" | "-" | "*" | "/" | "%" => arithmetic(op, &left, &right),
        _ => {
            let ordering = compare(&left, &right)?;
            let result = match op {
                "==" => ordering == Ordering::Equal,
                "!=" => ordering != Ordering::Equal,
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                ">" => ordering == Ordering::Greater,
                ">=" => ordering != Ordering::Less,
                _ => return None,
            };
            Some(Value::Boolean(result))
        }
    }
}

fn arithmetic(op: &str, left: &Value, right: &Value) -> Option<Value> {
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        let (a, b) = (*a, *b);
        let result = match op {
            "+" => a.checked_add(b),
            "-" => a.checked_sub(b),
            "*" => a.checked_mul(b),
            "/" => a.checked_div(b),
            _ => a.checked_rem(b),
        };
        return result.map(Value::Integer);
    }
    let (a, b) = (number(left)?, number(right)?);
    let result = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b != 0.0 => a / b,
        "%" if b != 0.0 => a % b,
        _ => return None,
    };
    Some(Value::Real(result))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Real(r) => Some(*r),
        _ => None,
    }
}

/// Ordering for `==`, `<` and friends. Strings compare case-insensitively;
/// booleans only to booleans.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => {
            Some(a.to_lowercase().cmp(&b.to_lowercase()))
        }
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        _ => number(left)?.partial_cmp(&number(right)?),
    }
}
