//! gobc-util - Shared infrastructure for the Gob compiler.
//!
//! This crate carries the pieces every phase needs: source location spans
//! and source-file bookkeeping. It deliberately has no dependencies of its
//! own so the phase crates can pull it in freely.

pub mod source;
pub mod span;

pub use source::SourceFile;
pub use span::Span;
