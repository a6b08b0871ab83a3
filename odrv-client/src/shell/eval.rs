//! Parsing and evaluation of single shell lines.
//!
//! The language is deliberately small: literals, names, attribute access on
//! devices, helper calls, and assignment of session-local names.

use std::collections::BTreeMap;

use super::InteractiveVariables;
use super::error::ShellError;
use super::value::Value;
use crate::discovery::registry::DeviceRegistry;

/// Calls handled by the shell itself rather than by an injected helper.
pub const BUILTINS: &[&str] = &["help", "quit", "exit", "dir", "devices"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Assign,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Attribute { base: Box<Expr>, attribute: String },
    Call { callee: Box<Expr>, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Empty,
    Expr(Expr),
    /// `target = value`, where target is a dotted path.
    Assign { target: Vec<String>, value: Expr },
}

/// What the host should do after a line was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Nothing,
    Value(Value),
    Text(String),
    Help,
    Quit,
}

fn tokenize(line: &str) -> Result<Vec<Token>, ShellError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '#' => break,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Assign);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '"' | '\'' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&x| x == c)
                    .map(|p| start + p)
                    .ok_or_else(|| ShellError::Syntax("unterminated string".to_string()))?;
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let (token, next) = number(&chars, i)?;
                tokens.push(token);
                i = next;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(ShellError::Syntax(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

fn number(chars: &[char], start: usize) -> Result<(Token, usize), ShellError> {
    let digits_from = |mut i: usize, radix: u32| {
        while i < chars.len() && chars[i].is_digit(radix) {
            i += 1;
        }
        i
    };

    if chars[start] == '0' && matches!(chars.get(start + 1), Some('x' | 'X')) {
        let end = digits_from(start + 2, 16);
        let text: String = chars[start + 2..end].iter().collect();
        let value = i64::from_str_radix(&text, 16)
            .map_err(|_| ShellError::Syntax(format!("invalid hex literal '0x{text}'")))?;
        return Ok((Token::Int(value), end));
    }

    let mut end = digits_from(start, 10);
    let mut is_float = false;
    if chars.get(end) == Some(&'.') && chars.get(end + 1).is_some_and(|c| c.is_ascii_digit()) {
        is_float = true;
        end = digits_from(end + 1, 10);
    }
    if matches!(chars.get(end), Some('e' | 'E')) {
        let mut exp = end + 1;
        if matches!(chars.get(exp), Some('+' | '-')) {
            exp += 1;
        }
        if chars.get(exp).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            end = digits_from(exp, 10);
        }
    }

    let text: String = chars[start..end].iter().collect();
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| ShellError::Syntax(format!("invalid number '{text}'")))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| ShellError::Syntax(format!("integer '{text}' out of range")))?,
        )
    };
    Ok((token, end))
}

/// Deepest nesting of calls and attribute accesses a line may contain.
const MAX_NESTING: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Result<String, ShellError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(unexpected(other.as_ref())),
        }
    }

    /// `ident (. ident)* =` if present, without consuming anything otherwise.
    fn assignment_target(&mut self) -> Option<Vec<String>> {
        let start = self.pos;
        let mut path = Vec::new();
        loop {
            match self.next() {
                Some(Token::Ident(name)) => path.push(name),
                _ => break,
            }
            match self.next() {
                Some(Token::Dot) => continue,
                Some(Token::Assign) => return Some(path),
                _ => break,
            }
        }
        self.pos = start;
        None
    }

    fn statement(&mut self) -> Result<Statement, ShellError> {
        if self.tokens.is_empty() {
            return Ok(Statement::Empty);
        }
        let statement = match self.assignment_target() {
            Some(target) => Statement::Assign {
                target,
                value: self.expr(0)?,
            },
            None => Statement::Expr(self.expr(0)?),
        };
        match self.peek() {
            None => Ok(statement),
            Some(token) => Err(unexpected(Some(token))),
        }
    }

    /// `depth` counts the calls and attribute accesses enclosing this
    /// expression; evaluation recurses as deep as the tree, so it is capped.
    fn expr(&mut self, mut depth: usize) -> Result<Expr, ShellError> {
        let mut expr = match self.next() {
            Some(Token::Minus) => match self.next() {
                Some(Token::Int(v)) => Expr::Literal(Value::Int(-v)),
                Some(Token::Float(v)) => Expr::Literal(Value::Float(-v)),
                other => return Err(unexpected(other.as_ref())),
            },
            Some(Token::Int(v)) => Expr::Literal(Value::Int(v)),
            Some(Token::Float(v)) => Expr::Literal(Value::Float(v)),
            Some(Token::Str(s)) => Expr::Literal(Value::Str(s)),
            Some(Token::Ident(name)) => match name.as_str() {
                "True" | "true" => Expr::Literal(Value::Bool(true)),
                "False" | "false" => Expr::Literal(Value::Bool(false)),
                "None" => Expr::Literal(Value::None),
                _ => Expr::Name(name),
            },
            other => return Err(unexpected(other.as_ref())),
        };

        loop {
            if matches!(self.peek(), Some(Token::Dot | Token::LParen)) {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(ShellError::Syntax("expression nested too deeply".to_string()));
                }
            }
            if self.eat(&Token::Dot) {
                expr = Expr::Attribute {
                    base: Box::new(expr),
                    attribute: self.ident()?,
                };
            } else if self.eat(&Token::LParen) {
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.expr(depth)?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        if !self.eat(&Token::Comma) {
                            return Err(unexpected(self.peek()));
                        }
                    }
                }
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }
}

fn unexpected(token: Option<&Token>) -> ShellError {
    match token {
        None => ShellError::Syntax("unexpected end of line".to_string()),
        Some(token) => ShellError::Syntax(format!("unexpected {token:?}")),
    }
}

pub fn parse_line(line: &str) -> Result<Statement, ShellError> {
    let tokens = tokenize(line)?;
    Parser { tokens, pos: 0 }.statement()
}

/// Dotted source form of a name/attribute chain, for error messages.
fn dotted(expr: &Expr) -> String {
    match expr {
        Expr::Name(name) => name.clone(),
        Expr::Attribute { base, attribute } => format!("{}.{attribute}", dotted(base)),
        Expr::Call { callee, .. } => format!("{}()", dotted(callee)),
        Expr::Literal(v) => v.to_string(),
    }
}

/// Evaluates lines against the session's names.
///
/// Resolution order for a bare name: connected devices, then names assigned
/// during the session, then the injected interactive variables.
pub struct Evaluator<'a> {
    variables: &'a InteractiveVariables,
    devices: &'a DeviceRegistry,
    locals: &'a mut BTreeMap<String, Value>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        variables: &'a InteractiveVariables,
        devices: &'a DeviceRegistry,
        locals: &'a mut BTreeMap<String, Value>,
    ) -> Self {
        Self {
            variables,
            devices,
            locals,
        }
    }

    pub fn eval_line(&mut self, line: &str) -> Result<Outcome, ShellError> {
        match parse_line(line)? {
            Statement::Empty => Ok(Outcome::Nothing),
            Statement::Assign { target, value } => {
                let value = self.eval(&value)?;
                self.assign(&target, value)?;
                Ok(Outcome::Nothing)
            }
            Statement::Expr(expr) => {
                if let Some(outcome) = self.builtin(&expr) {
                    return Ok(outcome);
                }
                match self.eval(&expr)? {
                    Value::None => Ok(Outcome::Nothing),
                    value => Ok(Outcome::Value(value)),
                }
            }
        }
    }

    fn assign(&mut self, target: &[String], value: Value) -> Result<(), ShellError> {
        match target {
            [name] => {
                if self.devices.is_device_name(name) {
                    return Err(ShellError::ReadOnlyName(name.clone()));
                }
                self.locals.insert(name.clone(), value);
                Ok(())
            }
            [root, ..] if self.devices.is_device_name(root) => {
                Err(ShellError::RemotePropertyUnavailable(target.join(".")))
            }
            [root, rest @ ..] => {
                self.lookup(root)?;
                Err(ShellError::NoAttribute {
                    target: root.clone(),
                    attribute: rest.join("."),
                })
            }
            [] => Err(ShellError::Syntax("missing assignment target".to_string())),
        }
    }

    /// Top-level builtin calls such as `help()`, unless the name is shadowed.
    fn builtin(&self, expr: &Expr) -> Option<Outcome> {
        let name = match expr {
            Expr::Call { callee, args } if args.is_empty() => match callee.as_ref() {
                Expr::Name(name) => name.as_str(),
                _ => return None,
            },
            // bare `quit` / `exit` as in most interactive shells
            Expr::Name(name) if name == "quit" || name == "exit" => name.as_str(),
            _ => return None,
        };
        if self.is_defined(name) {
            return None;
        }
        match name {
            "help" => Some(Outcome::Help),
            "quit" | "exit" => Some(Outcome::Quit),
            "dir" => Some(Outcome::Text(self.dir())),
            "devices" => Some(Outcome::Text(self.device_listing())),
            _ => None,
        }
    }

    fn is_defined(&self, name: &str) -> bool {
        self.devices.get(name).is_some()
            || self.locals.contains_key(name)
            || self.variables.contains(name)
    }

    fn lookup(&self, name: &str) -> Result<Value, ShellError> {
        if let Some(device) = self.devices.get(name) {
            return Ok(Value::Device(device));
        }
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        self.variables
            .get(name)
            .cloned()
            .ok_or_else(|| ShellError::UndefinedName(name.to_string()))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, ShellError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self.lookup(name),
            Expr::Attribute { base, attribute } => match self.eval(base)? {
                Value::Device(device) => device
                    .attribute(attribute)
                    .ok_or_else(|| ShellError::RemotePropertyUnavailable(dotted(expr))),
                _ => Err(ShellError::NoAttribute {
                    target: dotted(base),
                    attribute: attribute.clone(),
                }),
            },
            Expr::Call { callee, args } => match self.eval(callee)? {
                Value::Helper(helper) => {
                    let args = args
                        .iter()
                        .map(|a| self.eval(a))
                        .collect::<Result<Vec<_>, _>>()?;
                    helper.call(&args)
                }
                _ => Err(ShellError::NotCallable(dotted(callee))),
            },
        }
    }

    fn dir(&self) -> String {
        let mut names: Vec<String> = self.devices.names();
        names.extend(self.locals.keys().cloned());
        names.extend(self.variables.names().map(str::to_string));
        names.sort();
        names.dedup();
        wrap_words(&names, 100)
    }

    fn device_listing(&self) -> String {
        let devices = self.devices.connected();
        if devices.is_empty() {
            return "No devices connected".to_string();
        }
        devices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn wrap_words(words: &[String], width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for word in words {
        if line_len > 0 && line_len + 2 + word.len() > width {
            out.push('\n');
            line_len = 0;
        }
        if line_len > 0 {
            out.push_str("  ");
            line_len += 2;
        }
        out.push_str(word);
        line_len += word.len();
    }
    out
}
