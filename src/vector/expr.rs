//! Restricted WHERE clauses, as accepted by attribute filters and by the
//! `WHERE` part of the SQL subset.
//!
//! Supported: comparisons (`=`, `<>`, `!=`, `<`, `<=`, `>`, `>=`), `AND`,
//! `OR`, `NOT`, `IS [NOT] NULL`, `[NOT] LIKE` (case-insensitive, `%` and `_`
//! wildcards), `[NOT] IN (...)`, `[NOT] BETWEEN ... AND ...` and the `FID`
//! pseudo-field. Comparisons involving a null or unset field are never true.

use std::cmp::Ordering;

use crate::vector::{Defn, Feature, FieldContent, FieldValue};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    QuotedIdent(String),
    Str(String),
    Integer(i64),
    Real(f64),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Star,
}

impl Token {
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }
}

/// A token together with its byte range in the source text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

pub(crate) fn tokenize(text: &str) -> Result<Vec<Spanned>, String> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                pos += 1;
                continue;
            }
            b'\'' | b'"' => {
                let (content, next) = quoted(text, pos, c)?;
                pos = next;
                if c == b'\'' {
                    Token::Str(content)
                } else {
                    Token::QuotedIdent(content)
                }
            }
            b'0'..=b'9' | b'.' if c != b'.' || bytes.get(pos + 1).is_some_and(u8::is_ascii_digit) => {
                let (token, next) = number(text, pos)?;
                pos = next;
                token
            }
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b',' => {
                pos += 1;
                Token::Comma
            }
            b'*' => {
                pos += 1;
                Token::Star
            }
            b'=' | b'<' | b'>' | b'!' | b'-' | b'+' => {
                let two = text.get(pos..pos + 2).unwrap_or("");
                let op = match two {
                    "<=" => "<=",
                    ">=" => ">=",
                    "<>" => "<>",
                    "!=" => "<>",
                    "==" => "=",
                    _ => "",
                };
                if op.is_empty() {
                    pos += 1;
                    match c {
                        b'=' => Token::Op("="),
                        b'<' => Token::Op("<"),
                        b'>' => Token::Op(">"),
                        b'-' => Token::Op("-"),
                        b'+' => Token::Op("+"),
                        _ => return Err(format!("Unexpected character '!' at offset {start}")),
                    }
                } else {
                    pos += 2;
                    Token::Op(op)
                }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_' || bytes[pos] == b'.')
                {
                    pos += 1;
                }
                Token::Ident(text[start..pos].to_string())
            }
            _ => {
                let ch = text[start..].chars().next().unwrap_or('?');
                return Err(format!("Unexpected character '{ch}' at offset {start}"));
            }
        };
        tokens.push(Spanned {
            token,
            start,
            end: pos,
        });
    }
    Ok(tokens)
}

fn quoted(text: &str, start: usize, quote: u8) -> Result<(String, usize), String> {
    let bytes = text.as_bytes();
    let mut content = Vec::new();
    let mut pos = start + 1;
    loop {
        match bytes.get(pos) {
            None => return Err(format!("Unterminated string starting at offset {start}")),
            Some(&b) if b == quote => {
                if bytes.get(pos + 1) == Some(&quote) {
                    content.push(quote);
                    pos += 2;
                } else {
                    pos += 1;
                    break;
                }
            }
            Some(&b) => {
                content.push(b);
                pos += 1;
            }
        }
    }
    let content = String::from_utf8(content).map_err(|e| e.to_string())?;
    Ok((content, pos))
}

fn number(text: &str, start: usize) -> Result<(Token, usize), String> {
    let bytes = text.as_bytes();
    let mut pos = start;
    let mut real = false;
    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            b'.' if !real => {
                real = true;
                pos += 1;
            }
            b'e' | b'E' => {
                real = true;
                pos += 1;
                if matches!(bytes.get(pos), Some(b'+' | b'-')) {
                    pos += 1;
                }
            }
            _ => break,
        }
    }
    let literal = &text[start..pos];
    let token = if real {
        Token::Real(
            literal
                .parse()
                .map_err(|_| format!("Invalid number '{literal}'"))?,
        )
    } else {
        match literal.parse() {
            Ok(value) => Token::Integer(value),
            Err(_) => Token::Real(
                literal
                    .parse()
                    .map_err(|_| format!("Invalid number '{literal}'"))?,
            ),
        }
    };
    Ok((token, pos))
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Null,
    Integer(i64),
    Real(f64),
    String(String),
    Boolean(bool),
}

impl Value {
    fn from_content(content: &FieldContent, defn: &Defn, index: usize) -> Value {
        match content {
            FieldContent::Unset | FieldContent::Null => Value::Null,
            FieldContent::Value(value) => match value {
                FieldValue::IntegerValue(v) => Value::Integer(*v as i64),
                FieldValue::Integer64Value(v) => Value::Integer(*v),
                FieldValue::RealValue(v) => Value::Real(*v),
                FieldValue::StringValue(v) => Value::String(v.clone()),
                other => match defn.field(index) {
                    Some(field) => Value::String(other.to_display_string(field)),
                    None => Value::Null,
                },
            },
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn from_op(op: &str) -> Option<CmpOp> {
        match op {
            "=" => Some(CmpOp::Eq),
            "<>" => Some(CmpOp::Ne),
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Le),
            ">" => Some(CmpOp::Gt),
            ">=" => Some(CmpOp::Ge),
            _ => None,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Field(usize),
    Fid,
    Literal(Value),
    Compare(Box<Node>, CmpOp, Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    IsNull(Box<Node>, bool),
    Like(Box<Node>, Box<Node>, bool),
    In(Box<Node>, Vec<Node>, bool),
    Between(Box<Node>, Box<Node>, Box<Node>, bool),
}

/// A compiled WHERE clause, bound to the schema it was parsed against.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Expression {
    root: Node,
    defn: Defn,
}

impl Expression {
    /// Parses `text` and resolves its field references against `defn`.
    pub(crate) fn parse(text: &str, defn: &Defn) -> Result<Expression, String> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err("Empty expression".to_string());
        }
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            defn,
        };
        let root = parser.or_expr()?;
        if let Some(extra) = parser.peek() {
            return Err(format!(
                "Unexpected token '{}' at offset {}",
                &text[extra.start..extra.end],
                extra.start
            ));
        }
        if !is_boolean(&root) {
            return Err("Expression does not evaluate to a boolean".to_string());
        }
        Ok(Expression {
            root,
            defn: defn.clone(),
        })
    }

    /// Whether `feature` passes the clause.
    pub(crate) fn evaluate(&self, feature: &Feature) -> bool {
        matches!(self.eval(&self.root, feature), Value::Boolean(true))
    }

    fn eval(&self, node: &Node, feature: &Feature) -> Value {
        match node {
            Node::Field(index) => feature
                .field(*index)
                .map_or(Value::Null, |content| {
                    Value::from_content(content, &self.defn, *index)
                }),
            Node::Fid => feature.fid().map_or(Value::Null, Value::Integer),
            Node::Literal(value) => value.clone(),
            Node::Compare(left, op, right) => {
                let left = self.eval(left, feature);
                let right = self.eval(right, feature);
                match left.compare(&right) {
                    Some(ordering) => Value::Boolean(op.holds(ordering)),
                    None => Value::Null,
                }
            }
            Node::And(left, right) => {
                match (self.eval(left, feature), self.eval(right, feature)) {
                    (Value::Boolean(false), _) | (_, Value::Boolean(false)) => {
                        Value::Boolean(false)
                    }
                    (Value::Boolean(true), Value::Boolean(true)) => Value::Boolean(true),
                    _ => Value::Null,
                }
            }
            Node::Or(left, right) => match (self.eval(left, feature), self.eval(right, feature)) {
                (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
                (Value::Boolean(false), Value::Boolean(false)) => Value::Boolean(false),
                _ => Value::Null,
            },
            Node::Not(inner) => match self.eval(inner, feature) {
                Value::Boolean(b) => Value::Boolean(!b),
                _ => Value::Null,
            },
            Node::IsNull(inner, negated) => {
                let is_null = self.eval(inner, feature) == Value::Null;
                Value::Boolean(is_null != *negated)
            }
            Node::Like(inner, pattern, negated) => {
                match (self.eval(inner, feature), self.eval(pattern, feature)) {
                    (Value::Null, _) | (_, Value::Null) => Value::Null,
                    (value, Value::String(pattern)) => {
                        let text = match value {
                            Value::String(s) => s,
                            Value::Integer(i) => i.to_string(),
                            Value::Real(r) => r.to_string(),
                            _ => return Value::Null,
                        };
                        Value::Boolean(like(&text, &pattern) != *negated)
                    }
                    _ => Value::Null,
                }
            }
            Node::In(inner, list, negated) => {
                let value = self.eval(inner, feature);
                if value == Value::Null {
                    return Value::Null;
                }
                let found = list.iter().any(|item| {
                    value.compare(&self.eval(item, feature)) == Some(Ordering::Equal)
                });
                Value::Boolean(found != *negated)
            }
            Node::Between(inner, low, high, negated) => {
                let value = self.eval(inner, feature);
                let low = value.compare(&self.eval(low, feature));
                let high = value.compare(&self.eval(high, feature));
                match (low, high) {
                    (Some(low), Some(high)) => Value::Boolean(
                        (low != Ordering::Less && high != Ordering::Greater) != *negated,
                    ),
                    _ => Value::Null,
                }
            }
        }
    }
}

fn is_boolean(node: &Node) -> bool {
    !matches!(node, Node::Field(_) | Node::Fid | Node::Literal(_))
        || matches!(node, Node::Literal(Value::Boolean(_)))
}

/// Case-insensitive SQL `LIKE` with `%` and `_` wildcards.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    // matches[j]: pattern[..i] matches text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matches[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matches = next;
    }
    matches[text.len()]
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    defn: &'a Defn,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn next_token(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|s| &s.token);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_token().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), String> {
        match self.next_token() {
            Some(token) if *token == expected => Ok(()),
            Some(token) => Err(format!("Expected {what}, got {token:?}")),
            None => Err(format!("Expected {what} at end of expression")),
        }
    }

    fn or_expr(&mut self) -> Result<Node, String> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("OR") {
            let right = self.and_expr()?;
            left = Node::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Node, String> {
        let mut left = self.not_expr()?;
        while self.eat_keyword("AND") {
            let right = self.not_expr()?;
            left = Node::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Node, String> {
        if self.eat_keyword("NOT") {
            let inner = self.not_expr()?;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.predicate()
    }

    fn predicate(&mut self) -> Result<Node, String> {
        let left = self.operand()?;
        if let Some(Token::Op(op)) = self.peek_token() {
            if let Some(cmp) = CmpOp::from_op(op) {
                self.pos += 1;
                let right = self.operand()?;
                check_comparable(self.defn, &left, &right)?;
                return Ok(Node::Compare(Box::new(left), cmp, Box::new(right)));
            }
        }
        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            if !self.eat_keyword("NULL") {
                return Err("Expected NULL after IS".to_string());
            }
            return Ok(Node::IsNull(Box::new(left), negated));
        }
        let negated = self.eat_keyword("NOT");
        if self.eat_keyword("LIKE") {
            let pattern = self.operand()?;
            return Ok(Node::Like(Box::new(left), Box::new(pattern), negated));
        }
        if self.eat_keyword("IN") {
            self.expect(Token::LParen, "'('")?;
            let mut list = vec![self.operand()?];
            loop {
                match self.next_token() {
                    Some(Token::Comma) => list.push(self.operand()?),
                    Some(Token::RParen) => break,
                    _ => return Err("Expected ',' or ')' in IN list".to_string()),
                }
            }
            return Ok(Node::In(Box::new(left), list, negated));
        }
        if self.eat_keyword("BETWEEN") {
            let low = self.operand()?;
            if !self.eat_keyword("AND") {
                return Err("Expected AND in BETWEEN".to_string());
            }
            let high = self.operand()?;
            return Ok(Node::Between(
                Box::new(left),
                Box::new(low),
                Box::new(high),
                negated,
            ));
        }
        if negated {
            return Err("Expected LIKE, IN or BETWEEN after NOT".to_string());
        }
        Ok(left)
    }

    fn operand(&mut self) -> Result<Node, String> {
        let defn = self.defn;
        let token = self
            .next_token()
            .cloned()
            .ok_or_else(|| "Unexpected end of expression".to_string())?;
        match token {
            Token::LParen => {
                let inner = self.or_expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Str(s) => Ok(Node::Literal(Value::String(s))),
            Token::Integer(i) => Ok(Node::Literal(Value::Integer(i))),
            Token::Real(r) => Ok(Node::Literal(Value::Real(r))),
            Token::Op("-") => match self.next_token() {
                Some(Token::Integer(i)) => Ok(Node::Literal(Value::Integer(-i))),
                Some(Token::Real(r)) => Ok(Node::Literal(Value::Real(-r))),
                _ => Err("Expected a number after '-'".to_string()),
            },
            Token::Ident(name) if name.eq_ignore_ascii_case("NULL") => {
                Ok(Node::Literal(Value::Null))
            }
            Token::Ident(name)
                if name.eq_ignore_ascii_case("TRUE") || name.eq_ignore_ascii_case("FALSE") =>
            {
                Ok(Node::Literal(Value::Boolean(
                    name.eq_ignore_ascii_case("TRUE"),
                )))
            }
            Token::Ident(name) | Token::QuotedIdent(name) => resolve_field(defn, &name),
            other => Err(format!("Unexpected token {other:?}")),
        }
    }
}

fn resolve_field(defn: &Defn, name: &str) -> Result<Node, String> {
    match defn.field_index(name) {
        Ok(index) => Ok(Node::Field(index)),
        Err(_) if name.eq_ignore_ascii_case("FID") => Ok(Node::Fid),
        Err(_) => Err(format!("\"{name}\" not recognised as an available field.")),
    }
}

fn check_comparable(defn: &Defn, left: &Node, right: &Node) -> Result<(), String> {
    let (index, literal) = match (left, right) {
        (Node::Field(i), Node::Literal(v)) | (Node::Literal(v), Node::Field(i)) => (*i, v),
        _ => return Ok(()),
    };
    let Some(field) = defn.field(index) else {
        return Ok(());
    };
    match literal {
        Value::String(s) if field.field_type().is_numeric() && s.trim().parse::<f64>().is_err() => {
            Err(format!(
                "Type mismatch on field '{}': numeric field compared to string '{s}'",
                field.name()
            ))
        }
        _ => Ok(()),
    }
}
