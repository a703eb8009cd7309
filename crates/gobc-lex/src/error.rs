//! Lexical error type.

use thiserror::Error;

/// Error raised by the scanner. One policy: fail fast, the first bad byte
/// aborts the pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A byte outside the language's alphabet.
    #[error("{line}:{column}: illegal character `{ch}`")]
    IllegalChar { ch: char, line: u32, column: u32 },
}
