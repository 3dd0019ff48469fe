//! Sandboxed `{expression}` evaluation over an immutable JSON snapshot.
//!
//! Templates reference run data through a handful of named roots (`mod`,
//! `config`, `format`, ...). Expressions support dotted and indexed property
//! access, string/number literals, `+`, `==`/`!=`, `&&`/`||`, `!`, the ternary
//! operator and parentheses. Nothing can reach process state or mutate the
//! snapshot.

use crate::error::{ReleaseError, Result};
use regex::{Captures, Regex};
use serde_json::{Map, Number, Value};

/// The named values an expression may read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    roots: Map<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a root value.
    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.roots.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.roots.get(name)
    }
}

type Failure = String;
type Eval<T> = std::result::Result<T, Failure>;

/// Replace every `{expression}` in `template` with its evaluated text.
///
/// The first failing expression fails the whole template.
pub fn fill(template: &str, snapshot: &Snapshot) -> Result<String> {
    let token = Regex::new(r"\{(.*?)\}").map_err(|e| ReleaseError::render(e.to_string()))?;

    let mut failure = None;
    let filled = token.replace_all(template, |caps: &Captures| {
        if failure.is_some() {
            return String::new();
        }
        match evaluate(&caps[1], snapshot).and_then(|value| display(&value)) {
            Ok(text) => text,
            Err(e) => {
                failure = Some(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(filled.into_owned()),
    }
}

/// Evaluate a single expression.
pub fn evaluate(source: &str, snapshot: &Snapshot) -> Result<Value> {
    eval_source(source, snapshot)
        .map_err(|e| ReleaseError::expression(format!("{{{}}}: {}", source, e)))
}

/// Text form of a value as it appears in rendered output.
pub fn display(value: &Value) -> Result<String> {
    text_of(value).map_err(ReleaseError::expression)
}

fn eval_source(source: &str, snapshot: &Snapshot) -> Eval<Value> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(Failure::from("empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        snapshot,
    };
    let value = parser.ternary()?;
    match parser.peek() {
        None => Ok(value),
        Some(token) => Err(format!("unexpected {}", token.describe())),
    }
}

fn text_of(value: &Value) -> Eval<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Array(items) => {
            let parts = items.iter().map(text_of).collect::<Eval<Vec<_>>>()?;
            Ok(parts.join(", "))
        }
        Value::Object(_) => Err(Failure::from("an object cannot be rendered as text")),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string '{}'", s),
            Token::Ident(name) => format!("name '{}'", name),
            Token::Punct(p) => format!("'{}'", p),
        }
    }
}

const PUNCTUATION: [&str; 16] = [
    "===", "!==", "==", "!=", "&&", "||", "?", ":", "!", "+", ".", "[", "]", "(", ")", ",",
];

fn tokenize(source: &str) -> Eval<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| format!("bad number '{}'", text))?;
            tokens.push(Token::Number(number));
        } else if c == '"' || c == '\'' {
            let (text, next) = read_string(&chars, i)?;
            tokens.push(Token::Str(text));
            i = next;
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let rest: String = chars[i..].iter().take(3).collect();
            let punct = PUNCTUATION
                .iter()
                .find(|p| rest.starts_with(**p))
                .ok_or_else(|| format!("unexpected character '{}'", c))?;
            tokens.push(Token::Punct(*punct));
            i += punct.chars().count();
        }
    }

    Ok(tokens)
}

fn read_string(chars: &[char], start: usize) -> Eval<(String, usize)> {
    let quote = chars[start];
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                text.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => return Ok((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(Failure::from("unterminated string literal"))
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    snapshot: &'a Snapshot,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Eval<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(format!("expected '{}'", punct))
        }
    }

    fn ternary(&mut self) -> Eval<Value> {
        let condition = self.or()?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let when_true = self.ternary()?;
        self.expect(":")?;
        let when_false = self.ternary()?;
        Ok(if truthy(&condition) { when_true } else { when_false })
    }

    fn or(&mut self) -> Eval<Value> {
        let mut left = self.and()?;
        while self.eat("||") {
            let right = self.and()?;
            if !truthy(&left) {
                left = right;
            }
        }
        Ok(left)
    }

    fn and(&mut self) -> Eval<Value> {
        let mut left = self.equality()?;
        while self.eat("&&") {
            let right = self.equality()?;
            if truthy(&left) {
                left = right;
            }
        }
        Ok(left)
    }

    fn equality(&mut self) -> Eval<Value> {
        let mut left = self.additive()?;
        loop {
            let negate = if self.eat("==") || self.eat("===") {
                false
            } else if self.eat("!=") || self.eat("!==") {
                true
            } else {
                return Ok(left);
            };
            let right = self.additive()?;
            left = Value::Bool(loosely_equal(&left, &right) != negate);
        }
    }

    fn additive(&mut self) -> Eval<Value> {
        let mut left = self.unary()?;
        while self.eat("+") {
            let right = self.unary()?;
            left = match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => number(a + b),
                _ => Value::String(text_of(&left)? + &text_of(&right)?),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Eval<Value> {
        if self.eat("!") {
            let value = self.unary()?;
            return Ok(Value::Bool(!truthy(&value)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Eval<Value> {
        let mut value = self.primary()?;
        loop {
            if self.eat(".") {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    _ => return Err(Failure::from("expected a property name after '.'")),
                };
                value = property(&value, &name)?;
            } else if self.eat("[") {
                let key = self.ternary()?;
                self.expect("]")?;
                value = match key {
                    Value::Number(n) => index(&value, &n)?,
                    other => property(&value, &text_of(&other)?)?,
                };
            } else {
                return Ok(value);
            }
        }
    }

    fn primary(&mut self) -> Eval<Value> {
        match self.next() {
            Some(Token::Number(n)) => Ok(number(n)),
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                "null" | "undefined" => Ok(Value::Null),
                _ => self
                    .snapshot
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| format!("'{}' is not defined", name)),
            },
            Some(Token::Punct("(")) => {
                let value = self.ternary()?;
                self.expect(")")?;
                Ok(value)
            }
            Some(token) => Err(format!(
                "unexpected {}",
                token.describe()
            )),
            None => Err(Failure::from("unexpected end of expression")),
        }
    }
}

fn property(value: &Value, name: &str) -> Eval<Value> {
    match value {
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::String(s) if name == "length" => Ok(number(s.chars().count() as f64)),
        Value::Array(items) if name == "length" => Ok(number(items.len() as f64)),
        Value::Null => Err(format!("cannot read property '{}' of nothing", name)),
        other => Err(format!("cannot read property '{}' of {}", name, other)),
    }
}

fn index(value: &Value, n: &Number) -> Eval<Value> {
    let position = n
        .as_u64()
        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
        .ok_or_else(|| format!("invalid index {}", n))?;
    match value {
        Value::Array(items) => Ok(items.get(position as usize).cloned().unwrap_or(Value::Null)),
        Value::String(s) => Ok(s
            .chars()
            .nth(position as usize)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null)),
        other => property(other, &n.to_string()),
    }
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => left == right,
    }
}
