//! The scanner: byte buffer in, tokens out.
//!
//! Each call to [`Scanner::next_token`] skips whitespace, records the start
//! position, and dispatches on the next byte: letters open an identifier or
//! keyword, digits an integer literal, and everything else is resolved by a
//! one- to three-byte operator switch. End of input (or an embedded NUL)
//! yields the EOF token; any byte outside the alphabet is a fatal error.

use tracing::trace;

use gobc_util::Span;

use crate::cursor::Cursor;
use crate::error::LexError;
use crate::token::{Token, TokenKind};

fn is_letter(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Scanner for Gob source code.
pub struct Scanner<'a> {
    /// Byte cursor over the source.
    cursor: Cursor<'a>,

    /// Starting byte offset of the current token.
    token_start: usize,

    /// Line where the current token starts (1-based).
    token_line: u32,

    /// Column where the current token starts (1-based).
    token_column: u32,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner over the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            token_start: 0,
            token_line: 1,
            token_column: 1,
        }
    }

    /// Returns the next token from the source.
    ///
    /// Identifiers and integer literals carry their source text as the
    /// lexeme; operators, delimiters and keywords carry an empty lexeme.
    /// Hitting the end of input inside an identifier or number is benign:
    /// the token is returned and the next call yields EOF.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        self.token_start = self.cursor.position();
        self.token_line = self.cursor.line();
        self.token_column = self.cursor.column();

        let b = self.cursor.current_byte();

        let token = if is_letter(b) {
            self.scan_identifier()
        } else if b.is_ascii_digit() {
            self.scan_number()
        } else {
            self.cursor.advance();
            let kind = match b {
                0 => TokenKind::Eof,
                b'(' => TokenKind::Lparen,
                b')' => TokenKind::Rparen,
                b'{' => TokenKind::Lbrace,
                b'}' => TokenKind::Rbrace,
                b',' => TokenKind::Comma,
                b'.' => TokenKind::Period,
                b';' => TokenKind::Semicolon,
                b'*' => TokenKind::Mul,
                b'+' => TokenKind::Add,
                b'-' => TokenKind::Sub,
                b'/' => TokenKind::Quo,
                b'%' => TokenKind::Rem,
                b'^' => TokenKind::Xor,
                b'~' => TokenKind::BitNot,
                b'=' => self.switch2(TokenKind::Assign, TokenKind::Eql),
                b'!' => self.switch2(TokenKind::Not, TokenKind::Neq),
                b'<' => self.switch4(
                    TokenKind::Lss,
                    TokenKind::Leq,
                    b'<',
                    TokenKind::Shl,
                    TokenKind::ShlAssign,
                ),
                b'>' => self.switch4(
                    TokenKind::Gtr,
                    TokenKind::Geq,
                    b'>',
                    TokenKind::Shr,
                    TokenKind::ShrAssign,
                ),
                b'&' => self.switch3(TokenKind::And, TokenKind::AndAssign, b'&', TokenKind::Land),
                b'|' => self.switch3(TokenKind::Or, TokenKind::OrAssign, b'|', TokenKind::Lor),
                _ => {
                    return Err(LexError::IllegalChar {
                        ch: b as char,
                        line: self.token_line,
                        column: self.token_column,
                    });
                }
            };
            self.token(kind, "")
        };

        trace!(
            kind = %token.kind,
            lexeme = %token.lexeme,
            line = token.span.line,
            column = token.span.column,
            "scanned token"
        );
        Ok(token)
    }

    /// Scans `[A-Za-z_][A-Za-z_0-9]*` and resolves it against the keyword
    /// table.
    fn scan_identifier(&mut self) -> Token {
        while is_letter(self.cursor.current_byte()) || self.cursor.current_byte().is_ascii_digit() {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(self.token_start);
        match TokenKind::lookup_keyword(text) {
            Some(kind) => self.token(kind, ""),
            None => self.token(TokenKind::Ident, text),
        }
    }

    /// Scans `[0-9]+` as an integer literal.
    ///
    /// Floats, imaginaries, chars and strings are declared in the token
    /// table but not scanned.
    fn scan_number(&mut self) -> Token {
        while self.cursor.current_byte().is_ascii_digit() {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(self.token_start);
        self.token(TokenKind::Int, text)
    }

    /// `X` or `X=`.
    fn switch2(&mut self, tok0: TokenKind, tok1: TokenKind) -> TokenKind {
        if self.cursor.match_byte(b'=') {
            tok1
        } else {
            tok0
        }
    }

    /// `X`, `X=`, or `XY`.
    fn switch3(&mut self, tok0: TokenKind, tok1: TokenKind, b2: u8, tok2: TokenKind) -> TokenKind {
        if self.cursor.match_byte(b'=') {
            tok1
        } else if self.cursor.match_byte(b2) {
            tok2
        } else {
            tok0
        }
    }

    /// `X`, `X=`, `XY`, or `XY=`.
    fn switch4(
        &mut self,
        tok0: TokenKind,
        tok1: TokenKind,
        b2: u8,
        tok2: TokenKind,
        tok3: TokenKind,
    ) -> TokenKind {
        if self.cursor.match_byte(b'=') {
            tok1
        } else if self.cursor.match_byte(b2) {
            if self.cursor.match_byte(b'=') {
                tok3
            } else {
                tok2
            }
        } else {
            tok0
        }
    }

    /// Skips ASCII whitespace: space, tab, CR, LF.
    fn skip_whitespace(&mut self) {
        // TODO: Go-style automatic semicolon insertion on newline.
        loop {
            match self.cursor.current_byte() {
                b' ' | b'\t' | b'\r' | b'\n' => self.cursor.advance(),
                _ => break,
            }
        }
    }

    fn token(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token::new(
            kind,
            lexeme,
            Span::new(
                self.token_start,
                self.cursor.position(),
                self.token_line,
                self.token_column,
            ),
        )
    }
}

/// Iterate tokens until (and excluding) EOF. A lexical error ends the
/// iteration after yielding it.
impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => None,
            other => Some(other),
        }
    }
}
