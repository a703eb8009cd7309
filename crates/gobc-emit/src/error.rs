//! Emitter error type.
//!
//! Everything here is an internal error in the fail-fast sense: the parser
//! accepted a program this emitter cannot lower, or the program names a
//! binding that was never declared. The first one aborts the emission.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    /// The object emitters accept only function declarations at the top
    /// level.
    #[error("only func declarations are supported at the top level, got {got}")]
    UnsupportedTopLevel { got: &'static str },

    /// A node kind reached a context this emitter has no lowering for.
    #[error("internal error: {what} not supported by the {emitter} emitter")]
    UnsupportedNode {
        emitter: &'static str,
        what: &'static str,
    },

    /// Identifier used where no binding is live.
    #[error("unbound identifier `{name}`")]
    UnboundIdent { name: String },

    /// `break` or `continue` with no enclosing loop.
    #[error("`{keyword}` outside of a loop")]
    BranchOutsideLoop { keyword: &'static str },

    /// Assignment target that is not a plain identifier.
    #[error("assignment target must be an identifier")]
    BadAssignTarget,

    /// Formatting into the output buffer failed.
    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
}
