//! # Query Lexer
//!
//! Single-pass, zero-copy tokenizer. Every token borrows its text from the
//! input; [`Lexer::span`] reports where the last token started so the parser
//! can tag errors with a byte offset.
//!
//! ```text
//! "select a from t where a>=1.5"
//!  Ident Ident Ident Ident Ident Ident Op Float
//! ```
//!
//! Invalid input produces [`Token::Error`]; the parser turns it into a
//! positioned error.

use super::token::{Span, Token};

pub struct Lexer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            token_start: 0,
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Span of the token most recently returned by [`next_token`](Self::next_token).
    pub fn span(&self) -> Span {
        Span::new(self.token_start, self.pos - self.token_start)
    }

    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        self.token_start = self.pos;

        let Some(ch) = self.current() else {
            return Token::Eof;
        };

        if ch.is_ascii_alphabetic() || ch == b'_' {
            return self.scan_ident();
        }
        if ch.is_ascii_digit() {
            return self.scan_number();
        }

        match ch {
            b'\'' | b'"' => self.scan_string(ch),
            b'.' => {
                if self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) {
                    self.scan_number()
                } else {
                    self.pos += 1;
                    Token::Dot
                }
            }
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'<' => match self.peek_byte(1) {
                Some(b'=') | Some(b'>') => self.op(2),
                _ => self.op(1),
            },
            b'>' => match self.peek_byte(1) {
                Some(b'=') => self.op(2),
                _ => self.op(1),
            },
            b'!' => match self.peek_byte(1) {
                Some(b'=') => self.op(2),
                _ => {
                    self.pos += 1;
                    Token::Error("Unexpected character")
                }
            },
            b'=' | b'~' | b'+' | b'-' | b'*' | b'/' | b'%' => self.op(1),
            _ => {
                self.pos += self.input[self.pos..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                Token::Error("Unexpected character")
            }
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Token<'a> {
        let (pos, start) = (self.pos, self.token_start);
        let token = self.next_token();
        self.pos = pos;
        self.token_start = start;
        token
    }

    fn current(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn single(&mut self, token: Token<'a>) -> Token<'a> {
        self.pos += 1;
        token
    }

    fn op(&mut self, len: usize) -> Token<'a> {
        self.pos += len;
        Token::Op(&self.input[self.token_start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn scan_ident(&mut self) -> Token<'a> {
        while self
            .current()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
        {
            self.pos += 1;
        }
        Token::Ident(&self.input[self.token_start..self.pos])
    }

    fn scan_digits(&mut self) -> bool {
        let start = self.pos;
        while self.current().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn scan_number(&mut self) -> Token<'a> {
        let mut float = false;
        self.scan_digits();

        if self.current() == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) {
            float = true;
            self.pos += 1;
            self.scan_digits();
        }

        if matches!(self.current(), Some(b'e') | Some(b'E')) {
            let sign = matches!(self.peek_byte(1), Some(b'+') | Some(b'-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_byte(digit_at).is_some_and(|b| b.is_ascii_digit()) {
                float = true;
                self.pos += digit_at;
                self.scan_digits();
            }
        }

        // unit suffix, as in `sample by 15m`
        while self.current().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }

        let text = &self.input[self.token_start..self.pos];
        if float {
            Token::Float(text)
        } else {
            Token::Integer(text)
        }
    }

    /// A doubled delimiter inside the quotes stands for one delimiter.
    fn scan_string(&mut self, quote: u8) -> Token<'a> {
        self.pos += 1;
        loop {
            match self.current() {
                None => return Token::Error("Unterminated string"),
                Some(b) if b == quote => {
                    if self.peek_byte(1) == Some(quote) {
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Token::Str(&self.input[self.token_start..self.pos]);
                    }
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.is_eof() {
                return out;
            }
            out.push(token);
        }
    }

    #[test]
    fn words_operators_and_numbers() {
        assert_eq!(
            tokens("select a,b from t where a>=1.5 and b<>2"),
            vec![
                Token::Ident("select"),
                Token::Ident("a"),
                Token::Comma,
                Token::Ident("b"),
                Token::Ident("from"),
                Token::Ident("t"),
                Token::Ident("where"),
                Token::Ident("a"),
                Token::Op(">="),
                Token::Float("1.5"),
                Token::Ident("and"),
                Token::Ident("b"),
                Token::Op("<>"),
                Token::Integer("2"),
            ]
        );
    }

    #[test]
    fn dotted_names_are_separate_tokens() {
        assert_eq!(
            tokens("a.price"),
            vec![Token::Ident("a"), Token::Dot, Token::Ident("price")]
        );
    }

    #[test]
    fn strings_keep_quotes_and_doubled_delimiters() {
        assert_eq!(tokens("'it''s'"), vec![Token::Str("'it''s'")]);
        assert_eq!(tokens("\"x y\""), vec![Token::Str("\"x y\"")]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(tokens("'abc"), vec![Token::Error("Unterminated string")]);
    }

    #[test]
    fn exponent_and_leading_dot_floats() {
        assert_eq!(
            tokens("2e10 .5 1E-3"),
            vec![Token::Float("2e10"), Token::Float(".5"), Token::Float("1E-3")]
        );
    }

    #[test]
    fn numbers_keep_unit_suffix() {
        assert_eq!(tokens("1h 15m"), vec![Token::Integer("1h"), Token::Integer("15m")]);
    }

    #[test]
    fn span_tracks_last_token() {
        let mut lexer = Lexer::new("  abc  <=");
        lexer.next_token();
        assert_eq!(lexer.span(), Span::new(2, 3));
        assert_eq!(lexer.peek(), Token::Op("<="));
        assert_eq!(lexer.span(), Span::new(2, 3));
        lexer.next_token();
        assert_eq!(lexer.span(), Span::new(7, 2));
    }
}
