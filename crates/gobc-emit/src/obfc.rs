//! Obfuscated-C emitter: lowering to a stack machine in C clothing.
//!
//! Every expression is evaluated through two global pseudo-registers and an
//! explicit operand stack `mem[]` indexed by `sp`, with `bp` marking the
//! current frame. Every intermediate value visits the stack even where a
//! real machine would not need it.
//!
//! Evaluation protocol: after the code emitted for any expression runs, the
//! expression's value is in `r0` and `sp` is unchanged. Control flow is
//! lowered to labels and gotos; label names carry the node id of the
//! construct that owns them, so nested loops never capture each other's
//! break targets. Labels use a `__` prefix (the original's `$` is a
//! compiler extension).

use std::fmt::Write;

use tracing::debug;

use gobc_lex::TokenKind;
use gobc_par::{File, Node, NodeId, NodeKind};

use crate::error::EmitError;
use crate::scope::ScopeChain;

/// Operand stack slots: 8 MiB worth of ints.
const STACK_SIZE: usize = 8 * 1024 * 1024 / std::mem::size_of::<std::os::raw::c_int>();

/// Lower `file` to obfuscated C. Only function declarations are accepted at
/// the top level.
pub fn emit_obfc(file: &File) -> Result<String, EmitError> {
    let mut emitter = ObfcEmitter {
        out: String::new(),
        indent: 0,
        scopes: ScopeChain::new(),
        loop_id: None,
    };

    writeln!(emitter.out, "static int r0;")?;
    writeln!(emitter.out, "static int r1;")?;
    writeln!(emitter.out, "static int sp;")?;
    writeln!(emitter.out, "static int bp;")?;
    writeln!(emitter.out, "static int mem[{STACK_SIZE}];")?;

    for decl in &file.decls {
        match &decl.kind {
            // Prototypes emit nothing.
            NodeKind::FuncDecl { body: None, .. } => {}
            NodeKind::FuncDecl { .. } => {
                emitter.emit_node(decl)?;
                emitter.out.push_str(";\n");
            }
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

struct ObfcEmitter {
    out: String,
    indent: usize,
    /// Name table and frame map in one: named slots for variables and
    /// parameters, anonymous slots for pushed temporaries.
    scopes: ScopeChain,
    /// Innermost enclosing loop, target of break/continue.
    loop_id: Option<NodeId>,
}

impl ObfcEmitter {
    fn tabs(&mut self) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn line(&mut self, text: &str) {
        self.tabs();
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Push `r0` onto the operand stack as an anonymous slot.
    fn push_r0(&mut self) {
        self.line("mem[sp] = r0; sp += 1;");
        self.scopes.push_anon();
    }

    /// Pop the operand stack into `r1`.
    fn pop_r1(&mut self) {
        self.line("r1 = mem[sp -= 1];");
        self.scopes.pop_slot();
    }

    /// Print a bare identifier (declaration positions, call targets).
    fn print_ident(&mut self, n: &Node) -> Result<(), EmitError> {
        match n.ident_name() {
            Some(name) => {
                self.out.push_str(name);
                Ok(())
            }
            None => Err(EmitError::UnsupportedNode {
                emitter: "obfuscated-C",
                what: "non-identifier name",
            }),
        }
    }

    /// Print a type expression: a type name or an inline struct.
    fn print_type(&mut self, n: &Node) -> Result<(), EmitError> {
        match &n.kind {
            NodeKind::Ident { name } => {
                self.out.push_str(name);
                Ok(())
            }
            NodeKind::StructType { fields } => {
                self.out.push_str("struct {\n");
                for field in fields {
                    if let NodeKind::VarDecl { name, ty, .. } = &field.kind {
                        self.print_type(ty)?;
                        self.out.push(' ');
                        self.print_ident(name)?;
                        self.out.push_str(";\n");
                    } else {
                        return Err(EmitError::UnsupportedNode {
                            emitter: "obfuscated-C",
                            what: "non-var struct field",
                        });
                    }
                }
                self.out.push('}');
                Ok(())
            }
            _ => Err(EmitError::UnsupportedNode {
                emitter: "obfuscated-C",
                what: "type expression",
            }),
        }
    }

    fn emit_node(&mut self, n: &Node) -> Result<(), EmitError> {
        match &n.kind {
            NodeKind::FuncDecl {
                recv: _,
                name,
                params,
                ret,
                body,
            } => {
                // Prototypes are skipped at the top level.
                let Some(body) = body else { return Ok(()) };

                debug!(name = name.ident_name(), "lowering function");
                self.print_type(ret)?;
                self.out.push(' ');
                self.print_ident(name)?;
                self.out.push('(');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_node(param)?;
                }
                self.out.push_str(") {\n");

                // Frame entry: save bp, then copy the C parameters into
                // frame slots so lookup is uniform for params and locals.
                self.scopes.enter();
                self.indent += 1;
                self.line("mem[sp] = bp; sp += 1;");
                self.line("bp = sp;");
                self.scopes.bind("");
                for param in params {
                    if let NodeKind::Field { name, .. } = &param.kind {
                        let pname = name.ident_name().unwrap_or_default().to_owned();
                        self.tabs();
                        writeln!(self.out, "mem[sp] = {pname}; sp += 1;")?;
                        self.scopes.bind(&pname);
                    }
                }

                self.emit_node(body)?;

                self.out.push_str("__ret:\n");
                self.line("sp = bp;");
                self.line("bp = mem[sp -= 1];");
                self.line("return r0;");
                self.indent -= 1;
                self.scopes.exit();
                self.out.push('}');
                Ok(())
            }

            NodeKind::TypeDecl { name, ty } => {
                self.tabs();
                self.out.push_str("typedef ");
                self.print_type(ty)?;
                self.out.push(' ');
                self.print_ident(name)?;
                self.out.push_str(";\n");
                Ok(())
            }

            NodeKind::VarDecl { name, value, .. } => {
                if let Some(value) = value {
                    self.emit_node(value)?;
                }
                // Uninitialized variables capture whatever r0 holds.
                self.line("mem[sp] = r0; sp += 1;");
                let vname = name.ident_name().unwrap_or_default().to_owned();
                self.scopes.bind(&vname);
                Ok(())
            }

            NodeKind::Basic { value, .. } => {
                self.tabs();
                writeln!(self.out, "r0 = {value};")?;
                Ok(())
            }

            NodeKind::Binary { op, x, y } => {
                self.emit_node(x)?;
                self.push_r0();
                self.emit_node(y)?;
                self.pop_r1();
                self.tabs();
                writeln!(self.out, "r0 = r1 {op} r0;")?;
                Ok(())
            }

            NodeKind::Unary { op, x } => {
                self.emit_node(x)?;
                self.tabs();
                writeln!(self.out, "r0 = {op} r0;")?;
                Ok(())
            }

            NodeKind::Paren { x } => self.emit_node(x),

            NodeKind::Ident { name } => {
                let slot = self
                    .scopes
                    .lookup(name)
                    .ok_or_else(|| EmitError::UnboundIdent { name: name.clone() })?;
                self.tabs();
                writeln!(self.out, "r0 = mem[sp - {slot}];")?;
                Ok(())
            }

            NodeKind::Call { func, args } => {
                let n_args = args.len();
                for arg in args {
                    self.emit_node(arg)?;
                    self.push_r0();
                }
                self.tabs();
                self.out.push_str("r0 = ");
                self.print_ident(func)?;
                self.out.push('(');
                for i in 0..n_args {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    write!(self.out, "mem[sp - {}]", n_args - i)?;
                }
                self.out.push_str(");\n");
                self.tabs();
                writeln!(self.out, "sp -= {n_args};")?;
                for _ in 0..n_args {
                    self.scopes.pop_slot();
                }
                Ok(())
            }

            NodeKind::Field { name, ty } => {
                self.print_type(ty)?;
                self.out.push(' ');
                self.print_ident(name)
            }

            NodeKind::StructType { .. } => Err(EmitError::UnsupportedNode {
                emitter: "obfuscated-C",
                what: "struct literal in expression position",
            }),

            NodeKind::Empty => Ok(()),

            NodeKind::Block { stmts } => {
                self.line("{");
                self.indent += 1;
                self.scopes.enter();
                for stmt in stmts {
                    self.emit_node(stmt)?;
                }
                let slots = self.scopes.exit();
                self.tabs();
                writeln!(self.out, "sp -= {slots};")?;
                self.indent -= 1;
                self.line("}");
                Ok(())
            }

            NodeKind::ExprStmt { x } => self.emit_node(x),

            NodeKind::Assign { lhs, rhs, .. } => {
                self.emit_node(rhs)?;
                let name = lhs.ident_name().ok_or(EmitError::BadAssignTarget)?;
                let slot = self
                    .scopes
                    .lookup(name)
                    .ok_or_else(|| EmitError::UnboundIdent {
                        name: name.to_owned(),
                    })?;
                self.tabs();
                writeln!(self.out, "mem[sp - {slot}] = r0;")?;
                Ok(())
            }

            NodeKind::If { cond, body, else_ } => {
                let id = n.id;
                self.emit_node(cond)?;
                self.tabs();
                writeln!(self.out, "if (r0) goto __if_true_{id};")?;
                self.tabs();
                writeln!(self.out, "goto __if_else_{id};")?;
                writeln!(self.out, "__if_true_{id}:")?;
                self.emit_node(body)?;
                self.tabs();
                writeln!(self.out, "goto __if_end_{id};")?;
                writeln!(self.out, "__if_else_{id}:")?;
                if let Some(else_) = else_ {
                    self.emit_node(else_)?;
                }
                writeln!(self.out, "__if_end_{id}: /* NOOP */;")?;
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
                writeln!(self.out, "__loop_START_{id}:")?;
                if let Some(cond) = cond {
                    self.emit_node(cond)?;
                    self.tabs();
                    writeln!(self.out, "if (!r0) goto __loop_END_{id};")?;
                }
                let saved = self.loop_id.replace(id);
                let result = self.emit_node(body);
                self.loop_id = saved;
                result?;
                writeln!(self.out, "__loop_POST_{id}:")?;
                if let Some(post) = post {
                    self.emit_node(post)?;
                }
                self.tabs();
                writeln!(self.out, "goto __loop_START_{id};")?;
                writeln!(self.out, "__loop_END_{id}: /* NOOP */;")?;
                let slots = self.scopes.exit();
                self.tabs();
                writeln!(self.out, "sp -= {slots};")?;
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
                self.tabs();
                if *tok == TokenKind::Break {
                    writeln!(self.out, "goto __loop_END_{id};")?;
                } else {
                    writeln!(self.out, "goto __loop_POST_{id};")?;
                }
                Ok(())
            }

            NodeKind::Return { expr } => {
                if let Some(expr) = expr {
                    self.emit_node(expr)?;
                }
                self.line("goto __ret;");
                Ok(())
            }

            NodeKind::DeclStmt { decl } => self.emit_node(decl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gobc_par::parse_file;
    use gobc_util::SourceFile;

    fn emit(src: &str) -> String {
        let file = parse_file(&SourceFile::new("test.gob", src)).expect("parse failed");
        emit_obfc(&file).expect("emit failed")
    }

    fn emit_err(src: &str) -> EmitError {
        let file = parse_file(&SourceFile::new("test.gob", src)).expect("parse failed");
        emit_obfc(&file).expect_err("emit unexpectedly succeeded")
    }

    /// Grab the numeric suffix of the first label with the given prefix.
    fn label_id(out: &str, prefix: &str) -> String {
        let at = out.find(prefix).expect("label prefix not found");
        out[at + prefix.len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect()
    }

    #[test]
    fn test_prelude() {
        let out = emit("func main() int { return 0; }");
        assert!(out.contains("static int r0;"));
        assert!(out.contains("static int r1;"));
        assert!(out.contains("static int sp;"));
        assert!(out.contains("static int bp;"));
        assert!(out.contains("static int mem[2097152];"));
    }

    #[test]
    fn test_frame_entry_and_exit() {
        let out = emit("func main() int { return 0; }");
        assert!(out.contains("mem[sp] = bp; sp += 1;"));
        assert!(out.contains("bp = sp;"));
        assert!(out.contains("__ret:"));
        assert!(out.contains("sp = bp;"));
        assert!(out.contains("bp = mem[sp -= 1];"));
        assert!(out.contains("return r0;"));
    }

    #[test]
    fn test_return_goes_through_ret_label() {
        let out = emit("func main() int { return 0; }");
        assert!(out.contains("r0 = 0;"));
        assert!(out.contains("goto __ret;"));
        // One __ret label per function.
        assert_eq!(out.matches("__ret:").count(), 1);
    }

    #[test]
    fn test_params_copied_into_frame() {
        let out = emit("func add(a int, b int) int { return a + b; }");
        assert!(out.contains("int add(int a, int b) {"));
        assert!(out.contains("mem[sp] = a; sp += 1;"));
        assert!(out.contains("mem[sp] = b; sp += 1;"));
    }

    #[test]
    fn test_binary_uses_stack() {
        let out = emit("func f() int { return 1 + 2; }");
        assert!(out.contains("r0 = 1;"));
        assert!(out.contains("mem[sp] = r0; sp += 1;"));
        assert!(out.contains("r0 = 2;"));
        assert!(out.contains("r1 = mem[sp -= 1];"));
        assert!(out.contains("r0 = r1 + r0;"));
    }

    #[test]
    fn test_var_and_ident_slots() {
        let out = emit("func f() int { var x int = 10; return x; }");
        // The declaration pushes r0; the read resolves to slot 1.
        assert!(out.contains("r0 = 10;"));
        assert!(out.contains("r0 = mem[sp - 1];"));
    }

    #[test]
    fn test_assignment_targets_slot() {
        let out = emit("func f() int { var x int = 10; x = x + 5; return x; }");
        assert!(out.contains("mem[sp - 1] = r0;"));
    }

    #[test]
    fn test_param_slot_accounts_for_temporaries() {
        // Reading a sees [b, a, saved-bp] from the stack pointer, so slot 2.
        // By the time b is read, a's pushed value sits on top as an
        // anonymous temporary, so b also resolves to slot 2.
        let out = emit("func add(a int, b int) int { return a + b; }");
        assert_eq!(out.matches("r0 = mem[sp - 2];").count(), 2);
        assert!(!out.contains("r0 = mem[sp - 1];"));
    }

    #[test]
    fn test_unary() {
        let out = emit("func f() int { return -5; }");
        assert!(out.contains("r0 = - r0;"));
    }

    #[test]
    fn test_if_labels_are_distinct_and_id_suffixed() {
        let out = emit("func f() int { if 1 { return 1; } else { return 0; } return 2; }");
        let id = label_id(&out, "__if_true_");
        assert!(out.contains(&format!("if (r0) goto __if_true_{id};")));
        assert!(out.contains(&format!("goto __if_else_{id};")));
        assert!(out.contains(&format!("__if_else_{id}:")));
        assert!(out.contains(&format!("goto __if_end_{id};")));
        assert!(out.contains(&format!("__if_end_{id}: /* NOOP */;")));
    }

    #[test]
    fn test_loop_lowering() {
        let out = emit(
            "func f() int { var i int = 0; for ; i < 10 ; i = i + 1 { if i == 5 { break; } } return i; }",
        );
        let id = label_id(&out, "__loop_START_");
        assert!(out.contains(&format!("if (!r0) goto __loop_END_{id};")));
        assert!(out.contains(&format!("__loop_POST_{id}:")));
        assert!(out.contains(&format!("goto __loop_START_{id};")));
        // break inside the nested if jumps to the enclosing loop's END.
        assert!(out.contains(&format!("goto __loop_END_{id};")));
    }

    #[test]
    fn test_nested_loops_break_to_nearest() {
        let out = emit(
            "func f() int { for ;; { for ;; { break; } break; } return 0; }",
        );
        let outer = label_id(&out, "__loop_START_");
        let rest = &out[out.find("__loop_START_").unwrap() + 1..];
        let inner = label_id(rest, "__loop_START_");
        assert_ne!(outer, inner);
        let inner_break = out.find(&format!("goto __loop_END_{inner};")).unwrap();
        let outer_break = out.find(&format!("goto __loop_END_{outer};")).unwrap();
        // The inner break is emitted before the outer one.
        assert!(inner_break < outer_break);
    }

    #[test]
    fn test_call_protocol() {
        let out = emit(
            "func add(a int, b int) int { return a + b; } \
             func main() int { return add(2, 3); }",
        );
        assert!(out.contains("r0 = add(mem[sp - 2], mem[sp - 1]);"));
        assert!(out.contains("sp -= 2;"));
    }

    #[test]
    fn test_block_releases_slots() {
        let out = emit("func f() int { { var x int = 1; } return 0; }");
        assert!(out.contains("sp -= 1;"));
    }

    #[test]
    fn test_prototype_emits_nothing() {
        let out = emit("func putchar(c int) int; func main() int { return 0; }");
        assert!(!out.contains("putchar"));
        // Exactly one frame prologue, for main.
        assert_eq!(out.matches("bp = sp;").count(), 1);
    }

    #[test]
    fn test_top_level_var_rejected() {
        let err = emit_err("var x int = 1;");
        assert!(matches!(err, EmitError::UnsupportedTopLevel { .. }));
    }

    #[test]
    fn test_unbound_ident_rejected() {
        let err = emit_err("func f() int { return y; }");
        assert!(matches!(err, EmitError::UnboundIdent { .. }));
    }

    #[test]
    fn test_branch_outside_loop_rejected() {
        let err = emit_err("func f() int { break; return 0; }");
        assert!(matches!(err, EmitError::BranchOutsideLoop { .. }));
    }

    #[test]
    fn test_push_pop_balance() {
        // Every operand-stack push in straight-line code is matched by a
        // pop or an sp decrement; count the textual pairs.
        let out = emit("func f() int { return 1 + 2 * 3 + 4; }");
        let pushes = out.matches("mem[sp] = r0; sp += 1;").count();
        let pops = out.matches("r1 = mem[sp -= 1];").count();
        assert_eq!(pushes, pops);
    }
}
