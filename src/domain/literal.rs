//! Relaxed object-literal parser.
//!
//! Recursive descent parser that reads a data literal written in object
//! construction syntax rather than strict JSON: unquoted identifier keys,
//! single-quoted strings, `//` and `/* */` comments, trailing commas, hex
//! integers and `undefined`. The literal is treated strictly as data; nothing
//! in it is evaluated.
//!
//! `NaN` and `Infinity` have no JSON counterpart, so either one anywhere in
//! the literal fails the whole parse. The error names the top-level record it
//! was found in; the offending value has to be fixed in the artifact before
//! any instrument can be processed.

use crate::domain::error::ParseError;
use serde_json::{Map, Number, Value};

const MAX_DEPTH: usize = 256;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    /// Key of the top-level entry being parsed.
    record: Option<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
            record: None,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn error<T>(&self, message: impl Into<String>, position: usize) -> Result<T, ParseError> {
        Err(ParseError {
            message: message.into(),
            position,
        })
    }

    fn not_representable<T>(&self, word: &str, position: usize) -> Result<T, ParseError> {
        let message = match &self.record {
            Some(record) => format!("{} is not representable (in record '{}')", word, record),
            None => format!("{} is not representable", word),
        };
        self.error(message, position)
    }

    fn describe_next(&self) -> String {
        self.peek()
            .map(|c| format!("'{}'", c))
            .unwrap_or_else(|| "end of input".to_string())
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.remaining();
            if rest.starts_with("//") {
                let len = rest.find('\n').unwrap_or(rest.len());
                self.pos += len;
            } else if rest.starts_with("/*") {
                let start = self.pos;
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => return self.error("unterminated block comment", start),
                }
            } else {
                match self.peek() {
                    Some(ch) if ch.is_whitespace() => {
                        self.advance();
                    }
                    _ => return Ok(()),
                }
            }
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_trivia()?;
        if self.consume_char(expected) {
            Ok(())
        } else {
            self.error(
                format!("expected '{}', found {}", expected, self.describe_next()),
                self.pos,
            )
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return self.error(
                format!("nesting deeper than {} levels", MAX_DEPTH),
                self.pos,
            );
        }
        Ok(())
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        self.skip_trivia()?;
        match self.peek() {
            Some('{') => self.parse_object(),
            Some('[') => self.parse_array(),
            Some(quote @ ('"' | '\'')) => self.parse_string(quote).map(Value::String),
            Some(ch) if ch == '-' || ch == '+' || ch == '.' || ch.is_ascii_digit() => {
                self.parse_number()
            }
            Some(ch) if is_ident_start(ch) => self.parse_keyword(),
            _ => self.error(
                format!("expected value, found {}", self.describe_next()),
                self.pos,
            ),
        }
    }

    fn parse_object(&mut self) -> Result<Value, ParseError> {
        self.enter()?;
        self.expect_char('{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            if self.consume_char('}') {
                break;
            }
            let key = self.parse_key()?;
            self.expect_char(':')?;
            if self.depth == 1 {
                self.record = Some(key.clone());
            }
            let value = self.parse_value()?;
            map.insert(key, value);

            self.skip_trivia()?;
            if self.consume_char(',') {
                continue;
            }
            if self.consume_char('}') {
                break;
            }
            return self.error(
                format!("expected ',' or '}}', found {}", self.describe_next()),
                self.pos,
            );
        }
        self.depth -= 1;
        Ok(Value::Object(map))
    }

    fn parse_array(&mut self) -> Result<Value, ParseError> {
        self.enter()?;
        self.expect_char('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.consume_char(']') {
                break;
            }
            items.push(self.parse_value()?);

            self.skip_trivia()?;
            if self.consume_char(',') {
                continue;
            }
            if self.consume_char(']') {
                break;
            }
            return self.error(
                format!("expected ',' or ']', found {}", self.describe_next()),
                self.pos,
            );
        }
        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn parse_key(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_string(quote),
            Some(ch) if is_ident_start(ch) => Ok(self.take_while(is_ident_continue).to_string()),
            Some(ch) if ch.is_ascii_digit() => {
                Ok(self.take_while(|c| c.is_ascii_digit()).to_string())
            }
            _ => self.error(
                format!("expected key, found {}", self.describe_next()),
                self.pos,
            ),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if pred(ch) {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.pos]
    }

    fn parse_keyword(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        let word = self.take_while(is_ident_continue);
        match word {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" | "undefined" => Ok(Value::Null),
            "NaN" | "Infinity" => self.not_representable(word, start),
            _ => self.error(format!("unexpected identifier '{}'", word), start),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.advance();
        let mut out = String::new();
        loop {
            let ch = match self.advance() {
                Some(ch) => ch,
                None => return self.error("unterminated string", start),
            };
            match ch {
                c if c == quote => return Ok(out),
                '\n' | '\r' => return self.error("unterminated string", start),
                '\\' => self.parse_escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), ParseError> {
        let at = self.pos - 1;
        let ch = match self.advance() {
            Some(ch) => ch,
            None => return self.error("unterminated escape sequence", at),
        };
        match ch {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'v' => out.push('\u{000B}'),
            '0' => out.push('\0'),
            'u' => {
                let first = self.parse_hex4(at)?;
                let code = if (0xD800..0xDC00).contains(&first) {
                    if !self.remaining().starts_with("\\u") {
                        return self.error("unpaired surrogate in escape", at);
                    }
                    self.pos += 2;
                    let second = self.parse_hex4(at)?;
                    if !(0xDC00..0xE000).contains(&second) {
                        return self.error("invalid low surrogate in escape", at);
                    }
                    0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00)
                } else {
                    first
                };
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => return self.error("invalid unicode escape", at),
                }
            }
            // line continuation
            '\n' => {}
            '\r' => {
                self.consume_char('\n');
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn parse_hex4(&mut self, at: usize) -> Result<u32, ParseError> {
        let digits = self.remaining().get(..4).unwrap_or("");
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return self.error("invalid unicode escape", at);
        }
        self.pos += 4;
        u32::from_str_radix(digits, 16).or_else(|_| self.error("invalid unicode escape", at))
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.advance();
                true
            }
            Some('+') => {
                self.advance();
                false
            }
            _ => false,
        };

        let rest = self.remaining();
        if rest.starts_with("0x") || rest.starts_with("0X") {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            let magnitude = match i64::from_str_radix(digits, 16) {
                Ok(n) => n,
                Err(_) => return self.error("invalid hexadecimal number", start),
            };
            let n = if negative { -magnitude } else { magnitude };
            return Ok(Value::Number(Number::from(n)));
        }
        if rest.starts_with("Infinity") {
            return self.not_representable("Infinity", start);
        }

        let int_digits = self.take_while(|c| c.is_ascii_digit()).len();
        let mut is_float = false;
        let mut frac_digits = 0;
        if self.consume_char('.') {
            is_float = true;
            frac_digits = self.take_while(|c| c.is_ascii_digit()).len();
        }
        if int_digits == 0 && frac_digits == 0 {
            return self.error("expected number", start);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.advance();
            if !self.consume_char('-') {
                self.consume_char('+');
            }
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                return self.error("expected exponent digits", self.pos);
            }
        }

        let text = &self.input[start..self.pos];
        let text = text.strip_prefix('+').unwrap_or(text);
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Number(Number::from(n)));
            }
            if let Ok(n) = text.parse::<u64>() {
                return Ok(Value::Number(Number::from(n)));
            }
        }
        let parsed = text.parse::<f64>().ok().and_then(Number::from_f64);
        match parsed {
            Some(n) => Ok(Value::Number(n)),
            None => self.error(format!("invalid number: {}", text), start),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Parse a complete literal. Anything other than trivia after the literal is an error.
pub fn parse(input: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(input);
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.pos < input.len() {
        return parser.error(
            format!("unexpected trailing {}", parser.describe_next()),
            parser.pos,
        );
    }
    Ok(value)
}
