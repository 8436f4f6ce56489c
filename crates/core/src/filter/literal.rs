//! Tokenizer and recursive-descent parser for filter literals.
//!
//! Accepts the JSON subset plus the Python spellings report authors tend to
//! write: single-quoted strings, `True`/`False`/`None` and trailing commas.
//! Numbers may carry an exponent and strings accept `\uXXXX` escapes.
//! The result is a plain [`serde_json::Value`]; nothing is ever evaluated.

use std::iter::Peekable;
use std::str::CharIndices;

use serde_json::{Map, Number, Value};

use super::error::FilterError;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Str(String),
    Number(String),
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

struct Lexer<'a> {
    input: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            input: source.char_indices().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, FilterError> {
        let mut tokens = Vec::new();

        while let Some(&(offset, ch)) = self.input.peek() {
            let kind = match ch {
                c if c.is_whitespace() => {
                    self.input.next();
                    continue;
                }
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                ',' => self.single(TokenKind::Comma),
                ':' => self.single(TokenKind::Colon),
                '"' | '\'' => self.string(offset, ch)?,
                '-' | '+' | '0'..='9' => self.number(offset)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.word(),
                other => {
                    return Err(FilterError::syntax(
                        offset,
                        format!("unexpected character '{other}'"),
                    ));
                }
            };
            tokens.push(Token { kind, offset });
        }

        Ok(tokens)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.input.next();
        kind
    }

    fn string(&mut self, start: usize, quote: char) -> Result<TokenKind, FilterError> {
        self.input.next();
        let mut buf = String::new();

        loop {
            match self.input.next() {
                Some((_, c)) if c == quote => return Ok(TokenKind::Str(buf)),
                Some((pos, '\\')) => match self.input.next() {
                    Some((_, 'n')) => buf.push('\n'),
                    Some((_, 't')) => buf.push('\t'),
                    Some((_, 'r')) => buf.push('\r'),
                    Some((_, c @ ('\\' | '"' | '\'' | '/'))) => buf.push(c),
                    Some((_, 'b')) => buf.push('\u{8}'),
                    Some((_, 'f')) => buf.push('\u{c}'),
                    Some((_, 'u')) => buf.push(self.unicode_escape(pos)?),
                    Some((_, other)) => {
                        return Err(FilterError::syntax(
                            pos,
                            format!("unknown escape '\\{other}'"),
                        ));
                    }
                    None => break,
                },
                Some((_, c)) => buf.push(c),
                None => break,
            }
        }

        Err(FilterError::syntax(start, "unterminated string"))
    }

    /// Reads the hex digits of a `\\u` escape, joining surrogate pairs.
    fn unicode_escape(&mut self, pos: usize) -> Result<char, FilterError> {
        let high = self.hex4(pos)?;
        let code = if (0xD800..0xDC00).contains(&high) {
            let low = match (self.input.next(), self.input.next()) {
                (Some((_, '\\')), Some((_, 'u'))) => self.hex4(pos)?,
                _ => return Err(FilterError::syntax(pos, "unpaired surrogate in escape")),
            };
            if !(0xDC00..0xE000).contains(&low) {
                return Err(FilterError::syntax(pos, "unpaired surrogate in escape"));
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code).ok_or_else(|| FilterError::syntax(pos, "invalid unicode escape"))
    }

    fn hex4(&mut self, pos: usize) -> Result<u32, FilterError> {
        let mut code = 0;
        for _ in 0..4 {
            let digit = self
                .input
                .next()
                .and_then(|(_, c)| c.to_digit(16))
                .ok_or_else(|| FilterError::syntax(pos, "malformed unicode escape"))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, FilterError> {
        let mut buf = String::new();
        if let Some(&(_, sign @ ('-' | '+'))) = self.input.peek() {
            self.input.next();
            if sign == '-' {
                buf.push(sign);
            }
        }

        let mut seen_digit = false;
        let mut seen_dot = false;
        while let Some(&(_, c)) = self.input.peek() {
            match c {
                '0'..='9' => seen_digit = true,
                '.' if !seen_dot => seen_dot = true,
                _ => break,
            }
            buf.push(c);
            self.input.next();
        }

        if !seen_digit || buf.ends_with('.') {
            return Err(FilterError::syntax(start, "malformed number"));
        }

        if let Some(&(_, e @ ('e' | 'E'))) = self.input.peek() {
            buf.push(e);
            self.input.next();
            if let Some(&(_, sign @ ('-' | '+'))) = self.input.peek() {
                buf.push(sign);
                self.input.next();
            }
            let mut exponent_digit = false;
            while let Some(&(_, c @ '0'..='9')) = self.input.peek() {
                exponent_digit = true;
                buf.push(c);
                self.input.next();
            }
            if !exponent_digit {
                return Err(FilterError::syntax(start, "malformed number"));
            }
        }
        Ok(TokenKind::Number(buf))
    }

    fn word(&mut self) -> TokenKind {
        let mut buf = String::new();
        while let Some(&(_, c)) = self.input.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                buf.push(c);
                self.input.next();
            } else {
                break;
            }
        }
        TokenKind::Word(buf)
    }
}

/// Deepest list/map nesting accepted, matching `serde_json`'s limit.
const MAX_DEPTH: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |t| t.offset)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<(), FilterError> {
        if self.peek() == Some(kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FilterError::syntax(self.offset(), format!("expected {what}")))
        }
    }

    fn value(&mut self) -> Result<Value, FilterError> {
        let offset = self.offset();
        match self.advance() {
            Some(TokenKind::LBracket) => self.nested(offset, Self::list),
            Some(TokenKind::LBrace) => self.nested(offset, Self::map),
            Some(TokenKind::Str(s)) => Ok(Value::String(s)),
            Some(TokenKind::Number(n)) => n
                .parse::<Number>()
                .map(Value::Number)
                .map_err(|_| FilterError::syntax(offset, "malformed number")),
            Some(TokenKind::Word(word)) => match word.as_str() {
                "true" | "True" => Ok(Value::Bool(true)),
                "false" | "False" => Ok(Value::Bool(false)),
                "null" | "None" => Ok(Value::Null),
                other => Err(FilterError::syntax(
                    offset,
                    format!("unexpected identifier '{other}'"),
                )),
            },
            Some(_) => Err(FilterError::syntax(offset, "expected a value")),
            None => Err(FilterError::syntax(offset, "unexpected end of input")),
        }
    }

    fn nested(
        &mut self,
        offset: usize,
        parse: fn(&mut Self) -> Result<Value, FilterError>,
    ) -> Result<Value, FilterError> {
        if self.depth == MAX_DEPTH {
            return Err(FilterError::syntax(offset, "nesting too deep"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn list(&mut self) -> Result<Value, FilterError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(&TokenKind::RBracket) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            match self.peek() {
                Some(TokenKind::Comma) => self.pos += 1,
                Some(TokenKind::RBracket) => {}
                _ => {
                    return Err(FilterError::syntax(self.offset(), "expected ',' or ']'"));
                }
            }
        }
    }

    fn map(&mut self) -> Result<Value, FilterError> {
        let mut entries = Map::new();
        loop {
            let offset = self.offset();
            match self.advance() {
                Some(TokenKind::RBrace) => return Ok(Value::Object(entries)),
                Some(TokenKind::Str(key)) => {
                    self.expect(&TokenKind::Colon, "':'")?;
                    let value = self.value()?;
                    entries.insert(key, value);
                }
                _ => return Err(FilterError::syntax(offset, "expected a string key")),
            }
            match self.peek() {
                Some(TokenKind::Comma) => self.pos += 1,
                Some(TokenKind::RBrace) => {}
                _ => {
                    return Err(FilterError::syntax(self.offset(), "expected ',' or '}'"));
                }
            }
        }
    }
}

/// Parses a filter literal into a JSON value.
///
/// # Errors
///
/// Returns [`FilterError::Syntax`] if the text is not exactly one literal
/// or nests lists and maps more than 128 deep.
pub fn parse_literal(source: &str) -> Result<Value, FilterError> {
    let tokens = Lexer::new(source).tokenize()?;
    let end = source.len();
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
        depth: 0,
    };

    let value = parser.value()?;
    if parser.pos != parser.tokens.len() {
        return Err(FilterError::syntax(parser.offset(), "trailing input"));
    }
    Ok(value)
}
