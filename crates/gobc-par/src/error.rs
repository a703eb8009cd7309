//! Parse error type.
//!
//! One policy: fail fast. The first mismatch aborts with a
//! `file:line:col: expected X, got Y` message; there is no recovery and no
//! multi-error reporting.

use gobc_lex::LexError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Token mismatch or an unexpected token where a construct was required.
    #[error("{file}:{line}:{column}: expected {expected}, got {found}")]
    Expected {
        file: String,
        line: u32,
        column: u32,
        expected: String,
        found: String,
    },

    /// Lexical error surfaced through the parser's token pull.
    #[error("{file}:{source}")]
    Lex {
        file: String,
        #[source]
        source: LexError,
    },
}
