//! gobc-emit - Back-ends for the Gob compiler.
//!
//! Three tree walkers over the parsed [`gobc_par::File`]:
//!
//! - [`emit_c`] prints the tree back as C source.
//! - [`emit_obfc`] lowers to "obfuscated C": a stack machine over two global
//!   pseudo-registers and an explicit memory-resident operand stack.
//! - [`emit_x86`] lowers to 32-bit x86 assembly in AT&T syntax.
//!
//! The object emitters do the real compilation work: lexical scope
//! tracking, stack slot assignment relative to a base pointer, control-flow
//! lowering to labels and jumps, and call-site stack management. Both share
//! the [`scope::ScopeChain`], which doubles as name table and frame map.
//!
//! The AST is read-only during emission; each emitter carries its walk
//! state (innermost loop, current function, scope chain, indent) in its own
//! struct rather than in ambient statics, and save-restores it around
//! nested constructs on every exit path.

pub mod c;
pub mod error;
pub mod obfc;
pub mod scope;
pub mod x86;

pub use c::emit_c;
pub use error::EmitError;
pub use obfc::emit_obfc;
pub use scope::{Scope, ScopeChain};
pub use x86::{emit_x86, Target};
