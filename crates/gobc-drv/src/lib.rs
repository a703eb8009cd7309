//! gobc-drv - Compiler driver.
//!
//! Reads each input file, runs the scan → parse → emit pipeline, and writes
//! the chosen back-end's output to stdout.
//!
//! ```text
//! gobc [--emit-c|--emit-obfc|--emit-x64|--emit-tokens|--emit-ast] <file>...
//! ```
//!
//! An emitter flag is sticky: it applies to every following file until the
//! next flag. Files are compiled sequentially in argument order. The token
//! and AST emitters are debugging surfaces on the same pipeline.
//!
//! Exit codes: 0 success, 1 no input files or a compile error (reported on
//! stderr), 2 cannot open an input file.

use std::fs;
use std::io::{self, Write};

use anyhow::Context;
use tracing::info;

use gobc_emit::{emit_c, emit_obfc, emit_x86, Target};
use gobc_lex::{Scanner, TokenKind};
use gobc_par::parse_file;
use gobc_util::SourceFile;

/// Which output the pipeline produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emitter {
    /// Pretty-printed C (the default).
    C,
    /// Obfuscated C: the stack-machine lowering.
    ObfC,
    /// 32-bit x86 assembly for the host platform.
    X86,
    /// Token stream dump.
    Tokens,
    /// Parsed tree dump.
    Ast,
}

impl Emitter {
    /// Resolve a command line flag, if it is one.
    fn from_flag(arg: &str) -> Option<Emitter> {
        match arg {
            "--emit-c" => Some(Emitter::C),
            "--emit-obfc" => Some(Emitter::ObfC),
            "--emit-x64" => Some(Emitter::X86),
            "--emit-tokens" => Some(Emitter::Tokens),
            "--emit-ast" => Some(Emitter::Ast),
            _ => None,
        }
    }
}

/// Run the driver over the command line arguments (program name excluded).
///
/// Returns the process exit code.
pub fn run(args: impl Iterator<Item = String>) -> i32 {
    let mut emitter = Emitter::C;
    let mut compiled_any = false;

    for arg in args {
        if let Some(selected) = Emitter::from_flag(&arg) {
            emitter = selected;
            continue;
        }

        compiled_any = true;
        let content = match fs::read_to_string(&arg) {
            Ok(content) => content,
            Err(_) => return 2,
        };
        let source = SourceFile::new(&arg, content);
        info!(file = %arg, emitter = ?emitter, "compiling");

        let stdout = io::stdout();
        if let Err(e) = compile(&source, emitter, &mut stdout.lock()) {
            eprintln!("error: {e:#}");
            return 1;
        }
    }

    if !compiled_any {
        eprintln!("usage: gobc [--emit-c|--emit-obfc|--emit-x64|--emit-tokens|--emit-ast] <file>...");
        return 1;
    }
    0
}

/// Compile one source file with the selected emitter, writing to `out`.
pub fn compile(
    source: &SourceFile,
    emitter: Emitter,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if emitter == Emitter::Tokens {
        return dump_tokens(source, out);
    }

    let file = parse_file(source)?;

    match emitter {
        Emitter::C => {
            let text = emit_c(&file)?;
            out.write_all(text.as_bytes())?;
        }
        Emitter::ObfC => {
            let text = emit_obfc(&file)?;
            out.write_all(text.as_bytes())?;
        }
        Emitter::X86 => {
            let text = emit_x86(&file, Target::host())?;
            out.write_all(text.as_bytes())?;
        }
        Emitter::Ast => {
            writeln!(out, "{file:#?}")?;
        }
        Emitter::Tokens => unreachable!("handled above"),
    }
    Ok(())
}

/// Dump the token stream: one `offset kind lexeme` line per token.
fn dump_tokens(source: &SourceFile, out: &mut impl Write) -> anyhow::Result<()> {
    let mut scanner = Scanner::new(&source.content);
    loop {
        let token = scanner
            .next_token()
            .with_context(|| source.name.clone())?;
        if token.kind == TokenKind::Eof {
            break;
        }
        writeln!(out, "{}\t{}\t{}", token.span.start, token.kind, token.lexeme)?;
    }
    Ok(())
}
