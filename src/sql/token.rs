//! # Query Tokens
//!
//! Tokens borrow from the query text. Words are not classified into
//! keywords here: the grammar is contextual, so `timestamp` or `order` may
//! be a clause keyword in one place and a column name in another. The
//! parser compares words case-insensitively where a keyword is expected.
//!
//! | Token | Examples |
//! |-------|----------|
//! | `Ident` | `price`, `sum`, `x$1` |
//! | `Str` | `'abc'`, `'it''s'`, `"quoted"` (quotes kept) |
//! | `Integer` | `10`, `0`, `15m` (unit suffixes are kept) |
//! | `Float` | `1.5`, `2e10`, `.5` |
//! | `Op` | `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`, `~`, `+`, `-`, `*`, `/`, `%` |
//! | punctuation | `(`, `)`, `,`, `;`, `.` |

use std::fmt;

/// Byte range of a token in the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Ident(&'a str),
    /// Quoted text including its delimiters.
    Str(&'a str),
    Integer(&'a str),
    Float(&'a str),
    Op(&'a str),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    Error(&'static str),
    Eof,
}

impl<'a> Token<'a> {
    /// Source text of the token; empty at end of input.
    pub fn text(&self) -> &'a str {
        match *self {
            Token::Ident(s) | Token::Str(s) | Token::Integer(s) | Token::Float(s) | Token::Op(s) => s,
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Dot => ".",
            Token::Error(_) | Token::Eof => "",
        }
    }

    /// True for a word equal to `word` ignoring ASCII case.
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(word))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, Token::Eof)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Error(msg) => f.write_str(msg),
            Token::Eof => f.write_str("end of input"),
            other => f.write_str(other.text()),
        }
    }
}
