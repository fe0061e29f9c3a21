//! Arithmetic and condition evaluation.
//!
//! Both grammars run on text that has already been through variable
//! substitution, so by the time a line gets here every known name has become
//! a number.  Any identifier that is left over is an undefined name.
//!
//! **Arithmetic** (the default statement form) is deliberately tiny: the
//! innermost parenthesized group is reduced first and must be exactly
//! `number op number` with `op` one of `+ - * /`.  There is no precedence
//! and no unary operator; `-3` is a single number token.
//!
//! **Conditions** (`?(..)`, `if ?(..)`) use a small recursive-descent parser:
//!
//! ```text
//! cond := and (('||' | '|') and)*
//! and  := cmp (('&&' | '&') cmp)*
//! cmp  := sum (relop sum)*         chained: a < b < c  ==  a < b && b < c
//! sum  := atom (arith-op atom)?    one operator per level
//! atom := number | '(' cond ')'
//! ```

use std::fmt;

use super::error::ScriptError;
use super::value::format_number;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn apply(self, a: f64, b: f64) -> Result<f64, ScriptError> {
        Ok(match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div if b == 0.0 => {
                return Err(ScriptError::Arithmetic(format!(
                    "division by zero in ({} / {})",
                    format_number(a),
                    format_number(b)
                )))
            }
            ArithOp::Div => a / b,
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl RelOp {
    fn test(self, a: f64, b: f64) -> bool {
        match self {
            RelOp::Lt => a < b,
            RelOp::Le => a <= b,
            RelOp::Gt => a > b,
            RelOp::Ge => a >= b,
            RelOp::Eq => a == b,
            RelOp::Ne => a != b,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Arith(ArithOp),
    Rel(RelOp),
    And,
    Or,
    LParen,
    RParen,
    /// Any other punctuation; never valid in either grammar.
    Other(String),
}

impl Token {
    /// Tokens after which a `+`/`-` is a sign rather than an operator.
    fn expects_operand_after(prev: Option<&Token>) -> bool {
        !matches!(
            prev,
            Some(Token::Number(_) | Token::Ident(_) | Token::RParen)
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(x) => f.write_str(&format_number(*x)),
            Token::Ident(name) => f.write_str(name),
            Token::Arith(op) => f.write_str(op.symbol()),
            Token::Rel(op) => f.write_str(op.symbol()),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Other(s) => f.write_str(s),
        }
    }
}

fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    text: &'a str,
    src: &'a [u8],
    pos: usize,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b >= 0x80
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Lexer {
            text,
            src: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn eat(&mut self, ch: u8) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn starts_number(&self, offset: usize) -> bool {
        match self.peek_at(offset) {
            Some(b'0'..=b'9') => true,
            Some(b'.') => matches!(self.peek_at(offset + 1), Some(b'0'..=b'9')),
            _ => false,
        }
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }

    /// Read a number starting at `pos` (which may hold a sign).  Digits
    /// running straight into letters make the whole run an identifier.
    fn read_number(&mut self) -> Token {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        self.skip_digits();
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.pos += 1;
            self.skip_digits();
        }
        if matches!(self.peek(), Some(b) if is_ident_byte(b)) {
            while matches!(self.peek(), Some(b) if is_ident_byte(b)) {
                self.pos += 1;
            }
            return Token::Ident(self.text[start..self.pos].to_owned());
        }
        let text = &self.text[start..self.pos];
        text.parse()
            .map_or_else(|_| Token::Other(text.to_owned()), Token::Number)
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_ident_byte(b)) {
            self.pos += 1;
        }
        Token::Ident(self.text[start..self.pos].to_owned())
    }

    fn next_token(&mut self, prev: Option<&Token>) -> Option<Token> {
        self.skip_ws();
        let b = self.peek()?;

        if self.starts_number(0) {
            return Some(self.read_number());
        }
        if matches!(b, b'+' | b'-') && Token::expects_operand_after(prev) && self.starts_number(1) {
            return Some(self.read_number());
        }
        if is_ident_byte(b) {
            return Some(self.read_ident());
        }

        self.pos += 1;
        let tok = match b {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'+' => Token::Arith(ArithOp::Add),
            b'-' => Token::Arith(ArithOp::Sub),
            b'*' => Token::Arith(ArithOp::Mul),
            b'/' => Token::Arith(ArithOp::Div),
            b'<' if self.eat(b'=') => Token::Rel(RelOp::Le),
            b'<' => Token::Rel(RelOp::Lt),
            b'>' if self.eat(b'=') => Token::Rel(RelOp::Ge),
            b'>' => Token::Rel(RelOp::Gt),
            b'=' if self.eat(b'=') => Token::Rel(RelOp::Eq),
            b'!' if self.eat(b'=') => Token::Rel(RelOp::Ne),
            b'&' => {
                self.eat(b'&');
                Token::And
            }
            b'|' => {
                self.eat(b'|');
                Token::Or
            }
            other => Token::Other((other as char).to_string()),
        };
        Some(tok)
    }

    fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token(tokens.last()) {
            tokens.push(tok);
        }
        tokens
    }
}

/// Split substituted text into tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).tokenize()
}

/// The first identifier in `tokens`, reported as an undefined name.
fn reject_identifiers(tokens: &[Token]) -> Result<(), ScriptError> {
    match tokens.iter().find_map(|t| match t {
        Token::Ident(name) => Some(name),
        _ => None,
    }) {
        Some(name) => Err(ScriptError::Undefined(name.clone())),
        None => Ok(()),
    }
}

// ── Arithmetic ────────────────────────────────────────────────────────────────

/// Evaluate a substituted arithmetic line.
///
/// Groups are reduced innermost first until no parentheses remain; what is
/// left must be a single number.
pub fn eval_arith(text: &str) -> Result<f64, ScriptError> {
    let mut tokens = tokenize(text);
    reject_identifiers(&tokens)?;

    loop {
        let close = tokens.iter().position(|t| *t == Token::RParen);
        let open = tokens[..close.unwrap_or(tokens.len())]
            .iter()
            .rposition(|t| *t == Token::LParen);
        match (open, close) {
            (None, None) => break,
            (Some(open), Some(close)) => {
                let value = reduce_group(&tokens[open + 1..close])?;
                tokens.drain(open + 1..=close);
                tokens[open] = Token::Number(value);
            }
            _ => {
                return Err(ScriptError::Arithmetic(format!(
                    "unbalanced parentheses in `{}`",
                    text.trim()
                )))
            }
        }
    }

    match tokens.as_slice() {
        [Token::Number(x)] => Ok(*x),
        [] => Err(ScriptError::Arithmetic("empty expression".into())),
        rest => Err(ScriptError::NotNumeric(render(rest))),
    }
}

fn reduce_group(group: &[Token]) -> Result<f64, ScriptError> {
    match group {
        [Token::Number(a), Token::Arith(op), Token::Number(b)] => op.apply(*a, *b),
        [Token::Number(_), op @ (Token::Rel(_) | Token::And | Token::Or | Token::Other(_)), Token::Number(_)] => {
            Err(ScriptError::UnsupportedOperator(op.to_string()))
        }
        _ => Err(ScriptError::Arithmetic(format!("({})", render(group)))),
    }
}

// ── Conditions ────────────────────────────────────────────────────────────────

/// Evaluate a substituted condition.  Non-zero is true.
pub fn eval_condition(text: &str) -> Result<bool, ScriptError> {
    let tokens = tokenize(text);
    reject_identifiers(&tokens)?;

    let mut parser = CondParser {
        tokens: &tokens,
        pos: 0,
    };
    let value = parser.parse_or()?;
    match parser.peek() {
        None => Ok(truthy(value)),
        Some(tok) => Err(unexpected(tok)),
    }
}

fn truthy(x: f64) -> bool {
    x != 0.0 && !x.is_nan()
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn unexpected(tok: &Token) -> ScriptError {
    match tok {
        Token::Other(op) => ScriptError::UnsupportedOperator(op.clone()),
        tok => ScriptError::Syntax(format!("unexpected '{tok}' in condition")),
    }
}

struct CondParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> CondParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<f64, ScriptError> {
        let first = self.parse_and()?;
        if self.peek() != Some(&Token::Or) {
            return Ok(first);
        }
        let mut acc = truthy(first);
        while self.eat(&Token::Or) {
            let rhs = truthy(self.parse_and()?);
            acc = acc || rhs;
        }
        Ok(flag(acc))
    }

    fn parse_and(&mut self) -> Result<f64, ScriptError> {
        let first = self.parse_cmp()?;
        if self.peek() != Some(&Token::And) {
            return Ok(first);
        }
        let mut acc = truthy(first);
        while self.eat(&Token::And) {
            let rhs = truthy(self.parse_cmp()?);
            acc = acc && rhs;
        }
        Ok(flag(acc))
    }

    fn parse_cmp(&mut self) -> Result<f64, ScriptError> {
        let mut lhs = self.parse_sum()?;
        let mut result: Option<bool> = None;
        while let Some(&Token::Rel(op)) = self.peek() {
            self.pos += 1;
            let rhs = self.parse_sum()?;
            let holds = op.test(lhs, rhs);
            result = Some(result.unwrap_or(true) && holds);
            lhs = rhs;
        }
        Ok(match result {
            Some(b) => flag(b),
            None => lhs,
        })
    }

    fn parse_sum(&mut self) -> Result<f64, ScriptError> {
        let lhs = self.parse_atom()?;
        let Some(&Token::Arith(op)) = self.peek() else {
            return Ok(lhs);
        };
        self.pos += 1;
        let rhs = self.parse_atom()?;
        if let Some(Token::Arith(next)) = self.peek() {
            return Err(ScriptError::Syntax(format!(
                "use parentheses to combine '{}' and '{}'",
                op.symbol(),
                next.symbol()
            )));
        }
        op.apply(lhs, rhs)
    }

    fn parse_atom(&mut self) -> Result<f64, ScriptError> {
        match self.advance() {
            Some(Token::Number(x)) => Ok(*x),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(ScriptError::Syntax("missing ')' in condition".into()))
                }
            }
            Some(tok) => Err(unexpected(tok)),
            None => Err(ScriptError::Syntax("unexpected end of condition".into())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
