//! gobc-lex - Lexical analyzer for the Gob language.
//!
//! The scanner turns a byte buffer into a stream of typed tokens with
//! position information. Gob sources are ASCII; the scanner works directly
//! on bytes and treats both the end of the buffer and an embedded NUL as
//! end of input.
//!
//! Pipeline position:
//!
//! ```text
//! bytes ─► Scanner ─► Token stream ─► Parser ─► AST ─► Emitter ─► text
//! ```
//!
//! The token table declares more kinds than the scanner produces: float,
//! imaginary, char and string literals are reserved but unscanned, and most
//! keywords exist only so identifiers cannot shadow them. There is no
//! automatic semicolon insertion; sources must carry explicit semicolons
//! where the grammar requires them.

pub mod cursor;
pub mod error;
pub mod scanner;
pub mod token;

pub use cursor::Cursor;
pub use error::LexError;
pub use scanner::Scanner;
pub use token::{Token, TokenKind, LOWEST_PREC, UNARY_PREC};
