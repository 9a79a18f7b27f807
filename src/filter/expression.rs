//! Filter expression parsing and evaluation.
//!
//! Expressions are compiled once into a small boolean AST by recursive
//! descent and then evaluated against each candidate field map. There is no
//! general-purpose evaluator behind this: only the operators below exist.
//!
//! ```text
//! expr    := and ( ("or" | "||") and )*
//! and     := unary ( ("and" | "&&") unary )*
//! unary   := ("not" | "!") unary | primary
//! primary := "(" expr ")" | "true" | "false" | field op [value]
//! ```
//!
//! Parentheses and negations together may nest at most `MAX_DEPTH` deep.

use super::operator::Operator;
use super::token::{tokenize, Token};
use crate::error::{Error, Result};
use crate::value::{FieldMap, Value};
use regex::Regex;
use std::collections::BTreeSet;

/// Maximum nesting of parentheses and negations.
pub const MAX_DEPTH: usize = 64;

/// FilterExpression is a compiled gathered-filter query.
#[derive(Debug, Clone)]
pub struct FilterExpression {
    source: String,
    root: Node,
}

#[derive(Debug, Clone)]
enum Node {
    Literal(bool),
    Not(Box<Node>),
    All(Vec<Node>),
    Any(Vec<Node>),
    Predicate(Predicate),
}

#[derive(Debug, Clone)]
struct Predicate {
    field: String,
    op: Operator,
    operand: Operand,
}

#[derive(Debug, Clone)]
enum Operand {
    None,
    Text(String),
    Number(f64),
    Pattern(Regex),
}

impl FilterExpression {
    /// Compiles an expression. `*` matches every object.
    pub fn parse(expression: &str) -> Result<FilterExpression> {
        let source = expression.trim().to_string();
        if source == "*" {
            return Ok(FilterExpression {
                source,
                root: Node::Literal(true),
            });
        }

        let tokens = tokenize(&source)?;
        if tokens.is_empty() {
            return Err(Error::filter_syntax("empty expression"));
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };
        let root = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            return Err(match tok {
                Token::Close => Error::filter_syntax("unbalanced parentheses: unexpected ')'"),
                other => Error::filter_syntax(format!("unexpected token {}", describe_token(other))),
            });
        }
        Ok(FilterExpression { source, root })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of every field the expression references.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        collect_fields(&self.root, &mut out);
        out
    }

    /// Fails if the expression references a field not in `known`.
    pub fn check_fields<S: AsRef<str>>(&self, known: &[S]) -> Result<()> {
        for field in self.fields() {
            if !known.iter().any(|k| k.as_ref() == field) {
                return Err(Error::filter_syntax(format!("no field named {}", field)));
            }
        }
        Ok(())
    }

    /// Evaluates the expression against one candidate.
    pub fn matches(&self, candidate: &FieldMap) -> Result<bool> {
        for field in self.fields() {
            if !candidate.has(field) {
                return Err(Error::filter_syntax(format!("no field named {}", field)));
            }
        }
        Ok(self.root.eval(candidate))
    }
}

/// Compiles `expression` and evaluates it against a single candidate.
pub fn evaluate(expression: &str, candidate: &FieldMap) -> Result<bool> {
    FilterExpression::parse(expression)?.matches(candidate)
}

fn collect_fields<'a>(node: &'a Node, out: &mut BTreeSet<&'a str>) {
    match node {
        Node::Literal(_) => {}
        Node::Not(inner) => collect_fields(inner, out),
        Node::All(terms) | Node::Any(terms) => {
            for term in terms {
                collect_fields(term, out);
            }
        }
        Node::Predicate(p) => {
            out.insert(p.field.as_str());
        }
    }
}

fn describe_token(tok: &Token) -> String {
    match tok {
        Token::Open => "'('".to_string(),
        Token::Close => "')'".to_string(),
        Token::Word { text, .. } => format!("'{}'", text),
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek_keyword(&self, keywords: &[&str]) -> bool {
        self.peek()
            .and_then(Token::bare)
            .is_some_and(|w| keywords.iter().any(|k| k.eq_ignore_ascii_case(w)))
    }

    /// Enters one nesting level, failing past `MAX_DEPTH`.
    fn descend(&mut self) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::filter_syntax("expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Node> {
        let mut terms = vec![self.parse_and()?];
        while self.peek_keyword(&["or", "||"]) {
            self.next();
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Node::Any(terms) })
    }

    fn parse_and(&mut self) -> Result<Node> {
        let mut terms = vec![self.parse_unary()?];
        while self.peek_keyword(&["and", "&&"]) {
            self.next();
            terms.push(self.parse_unary()?);
        }
        Ok(if terms.len() == 1 { terms.remove(0) } else { Node::All(terms) })
    }

    fn parse_unary(&mut self) -> Result<Node> {
        if self.peek_keyword(&["not", "!"]) {
            self.next();
            self.descend()?;
            let inner = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.next() {
            None => Err(Error::filter_syntax("unexpected end of expression")),
            Some(Token::Open) => {
                self.descend()?;
                let node = self.parse_or()?;
                match self.next() {
                    Some(Token::Close) => {
                        self.depth -= 1;
                        Ok(node)
                    }
                    _ => Err(Error::filter_syntax("unbalanced parentheses: missing ')'")),
                }
            }
            Some(Token::Close) => Err(Error::filter_syntax("unbalanced parentheses: unexpected ')'")),
            Some(Token::Word { quoted: true, text }) => {
                Err(Error::filter_syntax(format!("expected a field name, got quoted '{}'", text)))
            }
            Some(Token::Word { text, quoted: false }) => {
                if text.eq_ignore_ascii_case("true") {
                    return Ok(Node::Literal(true));
                }
                if text.eq_ignore_ascii_case("false") {
                    return Ok(Node::Literal(false));
                }
                if ["and", "&&", "or", "||"].iter().any(|k| k.eq_ignore_ascii_case(text)) {
                    return Err(Error::filter_syntax(format!("unexpected '{}'", text)));
                }
                self.parse_predicate(text)
            }
        }
    }

    fn parse_predicate(&mut self, field: &str) -> Result<Node> {
        let op_text = match self.next() {
            Some(Token::Word { text, .. }) => text,
            _ => {
                return Err(Error::filter_syntax(format!(
                    "missing operator after field {}",
                    field
                )))
            }
        };
        let op = Operator::parse(op_text)
            .ok_or_else(|| Error::filter_syntax(format!("unknown operator {}", op_text)))?;

        let operand = if op.is_unary() {
            Operand::None
        } else {
            let value = match self.next() {
                Some(Token::Word { text, .. }) => text,
                _ => {
                    return Err(Error::filter_syntax(format!(
                        "missing value for {} {}",
                        field, op
                    )))
                }
            };
            compile_operand(op, value)?
        };

        Ok(Node::Predicate(Predicate {
            field: field.to_string(),
            op,
            operand,
        }))
    }
}

fn compile_operand(op: Operator, value: &str) -> Result<Operand> {
    if op.is_numeric() {
        let n: f64 = value.trim().parse().map_err(|_| {
            Error::filter_syntax(format!("value '{}' for {} is not a number", value, op))
        })?;
        return Ok(Operand::Number(n));
    }
    if op.is_regex() {
        // matches-regex anchors at the start of the value only.
        let anchored = match op.positive().unwrap_or(op) {
            Operator::MatchesRegex => format!("^(?:{})", value),
            _ => value.to_string(),
        };
        let re = Regex::new(&anchored)
            .map_err(|e| Error::filter_syntax(format!("invalid regex '{}': {}", value, e)))?;
        return Ok(Operand::Pattern(re));
    }
    Ok(Operand::Text(value.to_string()))
}

impl Node {
    fn eval(&self, candidate: &FieldMap) -> bool {
        match self {
            Node::Literal(b) => *b,
            Node::Not(inner) => !inner.eval(candidate),
            Node::All(terms) => terms.iter().all(|t| t.eval(candidate)),
            Node::Any(terms) => terms.iter().any(|t| t.eval(candidate)),
            Node::Predicate(p) => p.eval(candidate.get(&p.field).unwrap_or(&Value::Null)),
        }
    }
}

impl Predicate {
    fn eval(&self, value: &Value) -> bool {
        match self.op {
            Operator::IsNone => value.is_null(),
            Operator::IsNotNone => !value.is_null(),
            Operator::IsTrue => value.as_bool() == Some(true),
            Operator::IsFalse => matches!(value, Value::Bool(false) | Value::Null),
            op => match op.positive() {
                // Negated operators are true when no element satisfies the positive one.
                Some(positive) => !self.any_element(positive, value),
                None => self.any_element(op, value),
            },
        }
    }

    /// Scalars are tested whole; lists are true if any element passes.
    fn any_element(&self, op: Operator, value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::List(items) => items.iter().any(|v| self.test_scalar(op, v)),
            scalar => self.test_scalar(op, scalar),
        }
    }

    fn test_scalar(&self, op: Operator, value: &Value) -> bool {
        match (&self.operand, op) {
            (Operand::Number(n), _) => match value.as_f64() {
                Some(x) => match op {
                    Operator::Lt => x < *n,
                    Operator::Le => x <= *n,
                    Operator::Gt => x > *n,
                    Operator::Ge => x >= *n,
                    _ => false,
                },
                None => false,
            },
            (Operand::Pattern(re), _) => re.is_match(&value.to_string()),
            (Operand::Text(text), Operator::Eq) => scalar_equals(value, text),
            (Operand::Text(text), Operator::Contains) => value.to_string().contains(text.as_str()),
            (Operand::Text(text), Operator::StartsWith) => value.to_string().starts_with(text.as_str()),
            (Operand::Text(text), Operator::EndsWith) => value.to_string().ends_with(text.as_str()),
            _ => false,
        }
    }
}

/// Whole-value equality between a field value and expression text. Booleans
/// compare case-insensitively; numbers compare numerically when the text is
/// a number.
fn scalar_equals(value: &Value, text: &str) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => text.eq_ignore_ascii_case(if *b { "true" } else { "false" }),
        Value::Int(_) | Value::Float(_) => match (value.as_f64(), text.trim().parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => value.to_string() == text,
        },
        other => other.to_string() == text,
    }
}
