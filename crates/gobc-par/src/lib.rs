//! gobc-par - Recursive-descent parser for the Gob language.
//!
//! The parser pulls tokens from [`gobc_lex::Scanner`] with a single token of
//! lookahead and builds the uniform [`Node`] tree defined in [`ast`].
//! Expressions use precedence climbing over the token table's precedence
//! levels and produce left-associative trees (`1 - 2 - 3` parses as
//! `(1 - 2) - 3`); the stance is pinned by tests in [`expr`].
//!
//! Grammar (see the statement/declaration modules for the productions):
//!
//! ```text
//! file       := decl* EOF
//! decl       := func_decl | type_decl | var_decl
//! func_decl  := 'func' ident ('.' ident)? params ident (block | ';')
//! params     := '(' (field (',' field)*)? ')'
//! field      := ident type_expr
//! type_decl  := 'type' ident type_expr ';'
//! type_expr  := ident | struct_type
//! struct_type:= 'struct' '{' decl* '}'
//! var_decl   := 'var' ident ident ('=' expr)? ';'
//! stmt       := decl_stmt | return_stmt | branch_stmt | if_stmt
//!             | for_stmt | block | simple_stmt ';' | ';'
//! simple_stmt:= expr ('=' expr)?
//! expr       := precedence climbing over unary/primary
//! unary      := ('!'|'+'|'-'|'~') unary | primary
//! primary    := operand ('(' call_args ')')?
//! operand    := ident | INT | '(' expr ')'
//! ```

pub mod ast;
pub mod error;
mod expr;
mod items;
mod stmt;

pub use ast::{File, Node, NodeId, NodeKind};
pub use error::ParseError;

use tracing::trace;

use gobc_lex::{Scanner, Token, TokenKind};
use gobc_util::{SourceFile, Span};

/// Parse a whole source file into its declaration list.
///
/// This is the crate's entry point; the first error aborts.
pub fn parse_file(source: &SourceFile) -> Result<File, ParseError> {
    let mut parser = Parser::new(source)?;
    parser.parse_file()
}

/// Recursive-descent parser with single-token lookahead.
pub struct Parser<'a> {
    file_name: &'a str,
    scanner: Scanner<'a>,
    /// Current lookahead token.
    token: Token,
    next_id: NodeId,
}

impl<'a> Parser<'a> {
    /// Create a parser primed with the first token of `source`.
    pub fn new(source: &'a SourceFile) -> Result<Self, ParseError> {
        let mut scanner = Scanner::new(&source.content);
        let token = scanner.next_token().map_err(|e| ParseError::Lex {
            file: source.name.clone(),
            source: e,
        })?;
        Ok(Self {
            file_name: &source.name,
            scanner,
            token,
            next_id: 0,
        })
    }

    /// file := decl* EOF
    pub fn parse_file(&mut self) -> Result<File, ParseError> {
        let mut decls = Vec::new();
        while self.token.kind != TokenKind::Eof {
            decls.push(self.parse_decl()?);
        }
        Ok(File { decls })
    }

    /// Advance to the next token.
    fn bump(&mut self) -> Result<(), ParseError> {
        self.token = self.scanner.next_token().map_err(|e| ParseError::Lex {
            file: self.file_name.to_owned(),
            source: e,
        })?;
        trace!(
            kind = %self.token.kind,
            lexeme = %self.token.lexeme,
            line = self.token.span.line,
            column = self.token.span.column,
            "token"
        );
        Ok(())
    }

    /// True if the lookahead has the given kind.
    fn at(&self, kind: TokenKind) -> bool {
        self.token.kind == kind
    }

    /// If the lookahead matches, consume it and return true.
    fn accept(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.at(kind) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consume a token of the given kind or fail with `expected X, got Y`.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if !self.at(kind) {
            return Err(self.error_expected(&format!("`{kind}`")));
        }
        let token = self.token.clone();
        self.bump()?;
        Ok(token)
    }

    /// Build the fail-fast mismatch error at the lookahead's position.
    fn error_expected(&self, expected: &str) -> ParseError {
        ParseError::Expected {
            file: self.file_name.to_owned(),
            line: self.token.span.line,
            column: self.token.span.column,
            expected: expected.to_owned(),
            found: self.token.text(),
        }
    }

    /// Allocate a node, assigning the next id.
    fn node(&mut self, span: Span, kind: NodeKind) -> Node {
        let id = self.next_id;
        self.next_id += 1;
        Node { id, span, kind }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Parse a full source string, panicking on error.
    pub fn parse_source(src: &str) -> File {
        let file = SourceFile::new("test.gob", src);
        parse_file(&file).expect("parse failed")
    }

    /// Parse a source string, returning the error.
    pub fn parse_err(src: &str) -> ParseError {
        let file = SourceFile::new("test.gob", src);
        parse_file(&file).expect_err("parse unexpectedly succeeded")
    }
}
