//! x86 emitter: 32-bit assembly in AT&T syntax.
//!
//! Structurally the same lowering as the obfuscated-C back-end, but onto
//! real registers and the machine stack: `%eax` holds every expression
//! result, `%ecx` the second operand, `%edx` the idiv remainder, and
//! `%esp`/`%ebp` the frame. Identifiers live at `4*(slot-1)(%esp)` where
//! `slot` comes from the scope chain.
//!
//! The only optimization is a local peephole: a bare constant or identifier
//! subexpression becomes an immediate or memory operand instead of a round
//! trip through `%eax`. Division keeps the general path (`idivl` takes no
//! immediate), and so do the logical operators.
//!
//! `&&` and `||` evaluate both operands; short-circuiting is a known
//! limitation of this back-end.

use std::fmt::Write;

use tracing::debug;

use gobc_lex::TokenKind;
use gobc_par::{File, Node, NodeId, NodeKind};

use crate::error::EmitError;
use crate::scope::ScopeChain;

/// Object-format flavor of the emitted assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Mach-O: underscore-prefixed symbols, 16-byte call alignment.
    MachO,
    /// ELF: unprefixed symbols, no call-site padding.
    Elf,
}

impl Target {
    /// The target matching the host platform.
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            Target::MachO
        } else {
            Target::Elf
        }
    }

    /// Symbol name prefix for this object format.
    fn prefix(self) -> &'static str {
        match self {
            Target::MachO => "_",
            Target::Elf => "",
        }
    }
}

/// Lower `file` to 32-bit x86 assembly. Only function declarations are
/// permitted at the top level; prototypes emit nothing.
pub fn emit_x86(file: &File, target: Target) -> Result<String, EmitError> {
    let mut emitter = X86Emitter {
        out: String::new(),
        scopes: ScopeChain::new(),
        loop_id: None,
        func_id: None,
        target,
    };
    for decl in &file.decls {
        match &decl.kind {
            NodeKind::FuncDecl { .. } => emitter.emit_node(decl)?,
            NodeKind::VarDecl { .. } => {
                return Err(EmitError::UnsupportedTopLevel {
                    got: "var declaration",
                })
            }
            NodeKind::TypeDecl { .. } => {
                return Err(EmitError::UnsupportedTopLevel {
                    got: "type declaration",
                })
            }
            _ => {
                return Err(EmitError::UnsupportedTopLevel {
                    got: "non-declaration node",
                })
            }
        }
    }
    Ok(emitter.out)
}

struct X86Emitter {
    out: String,
    /// Name table and frame map; every live stack slot has an entry.
    scopes: ScopeChain,
    /// Innermost enclosing loop, target of break/continue.
    loop_id: Option<NodeId>,
    /// Function being emitted, target of return's jump.
    func_id: Option<NodeId>,
    target: Target,
}

impl X86Emitter {
    /// Push `%eax`, recording the slot as an anonymous scope entry.
    fn push_eax(&mut self) {
        self.out.push_str("\tpushl %eax\n");
        self.scopes.push_anon();
    }

    /// Pop into `%ecx`, releasing the most recent slot.
    fn pop_ecx(&mut self) {
        self.out.push_str("\tpopl %ecx\n");
        self.scopes.pop_slot();
    }

    /// Byte offset of a bound name from `%esp`.
    fn slot_offset(&self, name: &str) -> Result<usize, EmitError> {
        let slot = self
            .scopes
            .lookup(name)
            .ok_or_else(|| EmitError::UnboundIdent {
                name: name.to_owned(),
            })?;
        Ok(4 * (slot - 1))
    }

    /// True if the peephole can fold this subexpression into an operand.
    fn is_simple(n: &Node) -> bool {
        match &n.kind {
            NodeKind::Basic { .. } | NodeKind::Ident { .. } => true,
            NodeKind::Paren { x } => Self::is_simple(x),
            _ => false,
        }
    }

    /// Operand text for a simple subexpression: `$42` or `k(%esp)`.
    ///
    /// Must be rendered at the instruction that uses it, after any stack
    /// pushes, so the slot offset reflects the live frame.
    fn operand(&self, n: &Node) -> Result<String, EmitError> {
        match &n.kind {
            NodeKind::Basic { value, .. } => Ok(format!("${value}")),
            NodeKind::Ident { name } => Ok(format!("{}(%esp)", self.slot_offset(name)?)),
            NodeKind::Paren { x } => self.operand(x),
            _ => Err(EmitError::UnsupportedNode {
                emitter: "x86",
                what: "non-simple operand",
            }),
        }
    }

    /// setcc mnemonic for a comparison operator.
    fn set_cc(op: TokenKind) -> &'static str {
        match op {
            TokenKind::Eql => "sete",
            TokenKind::Neq => "setne",
            TokenKind::Lss => "setl",
            TokenKind::Leq => "setle",
            TokenKind::Gtr => "setg",
            TokenKind::Geq => "setge",
            _ => unreachable!("not a comparison operator"),
        }
    }

    fn is_comparison(op: TokenKind) -> bool {
        matches!(
            op,
            TokenKind::Eql
                | TokenKind::Neq
                | TokenKind::Lss
                | TokenKind::Leq
                | TokenKind::Gtr
                | TokenKind::Geq
        )
    }

    fn emit_node(&mut self, n: &Node) -> Result<(), EmitError> {
        match &n.kind {
            NodeKind::FuncDecl {
                recv: _,
                name,
                params,
                body,
                ..
            } => {
                // Prototypes emit nothing.
                let Some(body) = body else { return Ok(()) };

                let fname = name.ident_name().ok_or(EmitError::UnsupportedNode {
                    emitter: "x86",
                    what: "non-identifier function name",
                })?;
                debug!(name = fname, "lowering function");
                let prefix = self.target.prefix();
                writeln!(self.out, ".globl {prefix}{fname}")?;
                writeln!(self.out, "{prefix}{fname}:")?;

                // Caller layout below the return address: arguments pushed
                // left to right, then the call's return address, then the
                // saved %ebp we push now.
                self.scopes.enter();
                for param in params {
                    if let NodeKind::Field { name, .. } = &param.kind {
                        let pname = name.ident_name().unwrap_or_default().to_owned();
                        self.scopes.bind(&pname);
                    }
                }
                self.scopes.bind(""); // return address
                self.push_reg("%ebp");
                self.out.push_str("\tmovl %esp, %ebp\n");

                let saved = self.func_id.replace(n.id);
                let result = self.emit_node(body);
                self.func_id = saved;
                result?;

                // Fallthrough without an explicit return yields 0.
                self.out.push_str("\tmovl $0, %eax\n");
                writeln!(self.out, "ret_{}:", n.id)?;
                self.out.push_str("\tmovl %ebp, %esp\n");
                self.out.push_str("\tpopl %ebp\n");
                self.scopes.pop_slot();
                self.out.push_str("\tret\n");
                self.scopes.exit();
                Ok(())
            }

            NodeKind::TypeDecl { .. } => Err(EmitError::UnsupportedNode {
                emitter: "x86",
                what: "type declaration",
            }),

            NodeKind::VarDecl { name, value, .. } => {
                if let Some(value) = value {
                    self.emit_node(value)?;
                }
                // Uninitialized variables capture whatever %eax holds.
                self.out.push_str("\tpushl %eax\n");
                let vname = name.ident_name().unwrap_or_default().to_owned();
                self.scopes.bind(&vname);
                Ok(())
            }

            NodeKind::Basic { value, .. } => {
                writeln!(self.out, "\tmovl ${value}, %eax")?;
                Ok(())
            }

            NodeKind::Binary { op, x, y } => self.emit_binary(*op, x, y),

            NodeKind::Unary { op, x } => {
                self.emit_node(x)?;
                match op {
                    TokenKind::Sub => self.out.push_str("\tneg %eax\n"),
                    TokenKind::BitNot => self.out.push_str("\tnot %eax\n"),
                    TokenKind::Not => {
                        self.out.push_str("\tcmpl $0, %eax\n");
                        self.out.push_str("\tmovl $0, %eax\n");
                        self.out.push_str("\tsete %al\n");
                    }
                    // Unary plus is the identity.
                    _ => {}
                }
                Ok(())
            }

            NodeKind::Paren { x } => self.emit_node(x),

            NodeKind::Ident { name } => {
                let offset = self.slot_offset(name)?;
                writeln!(self.out, "\tmovl {offset}(%esp), %eax # {name}")?;
                Ok(())
            }

            NodeKind::Call { func, args } => {
                let fname = func
                    .ident_name()
                    .ok_or(EmitError::UnsupportedNode {
                        emitter: "x86",
                        what: "non-identifier call target",
                    })?
                    .to_owned();

                // Temporary scope covering padding and pushed arguments.
                self.scopes.enter();
                if self.target == Target::MachO {
                    let pad = (4 - args.len() % 4) % 4;
                    if pad > 0 {
                        writeln!(self.out, "\tsubl ${}, %esp", 4 * pad)?;
                        for _ in 0..pad {
                            self.scopes.push_anon();
                        }
                    }
                }
                for arg in args {
                    if Self::is_simple(arg) {
                        let operand = self.operand(arg)?;
                        writeln!(self.out, "\tpushl {operand}")?;
                        self.scopes.push_anon();
                    } else {
                        self.emit_node(arg)?;
                        self.push_eax();
                    }
                }
                writeln!(self.out, "\tcall {}{fname}", self.target.prefix())?;
                let words = self.scopes.innermost_len();
                writeln!(self.out, "\taddl ${}, %esp", 4 * words)?;
                self.scopes.exit();
                Ok(())
            }

            NodeKind::Field { .. } => Err(EmitError::UnsupportedNode {
                emitter: "x86",
                what: "field in expression position",
            }),

            // Struct types carry no code.
            NodeKind::StructType { .. } => Ok(()),

            NodeKind::Empty => Ok(()),

            NodeKind::Block { stmts } => {
                self.scopes.enter();
                for stmt in stmts {
                    self.emit_node(stmt)?;
                }
                let slots = self.scopes.exit();
                writeln!(self.out, "\taddl ${}, %esp", 4 * slots)?;
                Ok(())
            }

            NodeKind::ExprStmt { x } => self.emit_node(x),

            NodeKind::Assign { lhs, rhs, .. } => {
                self.emit_node(rhs)?;
                let name = lhs.ident_name().ok_or(EmitError::BadAssignTarget)?;
                let offset = self.slot_offset(name)?;
                writeln!(self.out, "\tmovl %eax, {offset}(%esp)")?;
                Ok(())
            }

            NodeKind::If { cond, body, else_ } => {
                let id = n.id;
                self.emit_node(cond)?;
                self.out.push_str("\tcmpl $0, %eax\n");
                writeln!(self.out, "\tje if_else_{id}")?;
                writeln!(self.out, "if_true_{id}:")?;
                self.emit_node(body)?;
                writeln!(self.out, "\tjmp if_end_{id}")?;
                writeln!(self.out, "if_else_{id}:")?;
                if let Some(else_) = else_ {
                    self.emit_node(else_)?;
                }
                writeln!(self.out, "if_end_{id}:")?;
                Ok(())
            }

            NodeKind::For {
                init,
                cond,
                post,
                body,
            } => {
                let id = n.id;
                self.scopes.enter();
                if let Some(init) = init {
                    self.emit_node(init)?;
                }
                writeln!(self.out, "loop_START_{id}:")?;
                if let Some(cond) = cond {
                    self.emit_node(cond)?;
                    self.out.push_str("\tcmpl $0, %eax\n");
                    writeln!(self.out, "\tje loop_END_{id}")?;
                }
                let saved = self.loop_id.replace(id);
                let result = self.emit_node(body);
                self.loop_id = saved;
                result?;
                writeln!(self.out, "loop_POST_{id}:")?;
                if let Some(post) = post {
                    self.emit_node(post)?;
                }
                writeln!(self.out, "\tjmp loop_START_{id}")?;
                writeln!(self.out, "loop_END_{id}:")?;
                let slots = self.scopes.exit();
                writeln!(self.out, "\taddl ${}, %esp", 4 * slots)?;
                Ok(())
            }

            NodeKind::Branch { tok } => {
                let keyword = if *tok == TokenKind::Break {
                    "break"
                } else {
                    "continue"
                };
                let id = self
                    .loop_id
                    .ok_or(EmitError::BranchOutsideLoop { keyword })?;
                if *tok == TokenKind::Break {
                    writeln!(self.out, "\tjmp loop_END_{id}")?;
                } else {
                    writeln!(self.out, "\tjmp loop_POST_{id}")?;
                }
                Ok(())
            }

            NodeKind::Return { expr } => {
                if let Some(expr) = expr {
                    self.emit_node(expr)?;
                }
                let id = self.func_id.ok_or(EmitError::UnsupportedNode {
                    emitter: "x86",
                    what: "return outside a function",
                })?;
                writeln!(self.out, "\tjmp ret_{id}")?;
                Ok(())
            }

            NodeKind::DeclStmt { decl } => self.emit_node(decl),
        }
    }

    /// Binary operation: evaluate y, stash it, evaluate x into `%eax`,
    /// recover y into `%ecx`, operate. The peephole skips the stash when y
    /// folds into a direct operand.
    fn emit_binary(&mut self, op: TokenKind, x: &Node, y: &Node) -> Result<(), EmitError> {
        let peephole = matches!(op, TokenKind::Add | TokenKind::Sub | TokenKind::Mul)
            || Self::is_comparison(op);
        if peephole && Self::is_simple(y) {
            self.emit_node(x)?;
            let rhs = self.operand(y)?;
            if Self::is_comparison(op) {
                writeln!(self.out, "\tcmpl {rhs}, %eax")?;
                self.out.push_str("\tmovl $0, %eax\n");
                writeln!(self.out, "\t{} %al", Self::set_cc(op))?;
            } else {
                let mnemonic = match op {
                    TokenKind::Add => "addl",
                    TokenKind::Sub => "subl",
                    TokenKind::Mul => "imul",
                    _ => unreachable!(),
                };
                writeln!(self.out, "\t{mnemonic} {rhs}, %eax")?;
            }
            return Ok(());
        }

        self.emit_node(y)?;
        self.push_eax();
        self.emit_node(x)?;
        self.pop_ecx();

        if Self::is_comparison(op) {
            self.out.push_str("\tcmpl %ecx, %eax\n");
            self.out.push_str("\tmovl $0, %eax\n");
            writeln!(self.out, "\t{} %al", Self::set_cc(op))?;
            return Ok(());
        }

        match op {
            TokenKind::Add => self.out.push_str("\taddl %ecx, %eax\n"),
            TokenKind::Sub => self.out.push_str("\tsubl %ecx, %eax\n"),
            TokenKind::Mul => self.out.push_str("\timul %ecx, %eax\n"),
            TokenKind::Quo | TokenKind::Rem => {
                self.out.push_str("\tmovl $0, %edx\n");
                self.out.push_str("\tidivl %ecx\n");
                if op == TokenKind::Rem {
                    self.out.push_str("\tmovl %edx, %eax\n");
                }
            }
            TokenKind::Land => {
                // Both operands are evaluated; no short circuit.
                self.out.push_str("\tcmpl $0, %ecx\n");
                self.out.push_str("\tsetne %cl\n");
                self.out.push_str("\tcmpl $0, %eax\n");
                self.out.push_str("\tmovl $0, %eax\n");
                self.out.push_str("\tsetne %al\n");
                self.out.push_str("\tandb %cl, %al\n");
            }
            TokenKind::Lor => {
                self.out.push_str("\torl %ecx, %eax\n");
                self.out.push_str("\tmovl $0, %eax\n");
                self.out.push_str("\tsetne %al\n");
            }
            _ => {
                writeln!(self.out, "\t# error: unknown binary op: `{op}`")?;
            }
        }
        Ok(())
    }

    /// Push a named register, recording the anonymous slot.
    fn push_reg(&mut self, reg: &str) {
        self.out.push('\t');
        self.out.push_str("pushl ");
        self.out.push_str(reg);
        self.out.push('\n');
        self.scopes.push_anon();
    }
}
