//! Pretty C emitter: structural print of the AST as C source.
//!
//! Declared types are propagated textually, so `int` in Gob is `int` in the
//! output. Binary expressions are parenthesized to keep the printed text
//! faithful to the tree shape. Top-level declarations are followed by
//! `;\n`; function prototypes print no brace block.

use std::fmt::Write;

use gobc_par::{File, Node, NodeKind};

use crate::error::EmitError;

/// Print `file` as a C translation unit.
pub fn emit_c(file: &File) -> Result<String, EmitError> {
    let mut emitter = CEmitter {
        out: String::new(),
        indent: 0,
    };
    for decl in &file.decls {
        emitter.emit_node(decl)?;
        emitter.out.push_str(";\n");
    }
    Ok(emitter.out)
}

struct CEmitter {
    out: String,
    /// Block nesting depth, one tab per level.
    indent: usize,
}

impl CEmitter {
    fn tabs(&mut self) {
        for _ in 0..self.indent {
            self.out.push('\t');
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
                self.emit_node(ret)?;
                self.out.push(' ');
                self.emit_node(name)?;
                self.out.push('(');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_node(param)?;
                }
                self.out.push_str(") ");
                if let Some(body) = body {
                    self.emit_node(body)?;
                }
                Ok(())
            }

            NodeKind::TypeDecl { name, ty } => {
                self.out.push_str("typedef ");
                self.emit_node(ty)?;
                self.out.push(' ');
                self.emit_node(name)
            }

            NodeKind::VarDecl { name, ty, value } => {
                self.emit_node(ty)?;
                self.out.push(' ');
                self.emit_node(name)?;
                if let Some(value) = value {
                    self.out.push_str(" = ");
                    self.emit_node(value)?;
                }
                Ok(())
            }

            NodeKind::Basic { value, .. } => {
                self.out.push_str(value);
                Ok(())
            }

            NodeKind::Binary { op, x, y } => {
                self.out.push('(');
                self.emit_node(x)?;
                write!(self.out, " {op} ")?;
                self.emit_node(y)?;
                self.out.push(')');
                Ok(())
            }

            NodeKind::Unary { op, x } => {
                write!(self.out, "{op}")?;
                self.emit_node(x)
            }

            NodeKind::Paren { x } => {
                self.out.push('(');
                self.emit_node(x)?;
                self.out.push(')');
                Ok(())
            }

            NodeKind::Ident { name } => {
                self.out.push_str(name);
                Ok(())
            }

            NodeKind::Call { func, args } => {
                self.emit_node(func)?;
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.emit_node(arg)?;
                }
                self.out.push(')');
                Ok(())
            }

            NodeKind::Field { name, ty } => {
                self.emit_node(ty)?;
                self.out.push(' ');
                self.emit_node(name)
            }

            NodeKind::StructType { fields } => {
                self.out.push_str("struct {\n");
                for field in fields {
                    self.emit_node(field)?;
                    self.out.push_str(";\n");
                }
                self.out.push('}');
                Ok(())
            }

            NodeKind::Empty => Ok(()),

            NodeKind::Block { stmts } => {
                self.out.push_str("{\n");
                self.indent += 1;
                for stmt in stmts {
                    self.tabs();
                    self.emit_node(stmt)?;
                    self.out.push_str(";\n");
                }
                self.indent -= 1;
                self.tabs();
                self.out.push('}');
                Ok(())
            }

            NodeKind::ExprStmt { x } => self.emit_node(x),

            NodeKind::Assign { lhs, op, rhs } => {
                self.emit_node(lhs)?;
                write!(self.out, " {op} ")?;
                self.emit_node(rhs)
            }

            NodeKind::If { cond, body, else_ } => {
                self.out.push_str("if (");
                self.emit_node(cond)?;
                self.out.push_str(") ");
                self.emit_node(body)?;
                if let Some(else_) = else_ {
                    self.out.push_str(" else ");
                    self.emit_node(else_)?;
                }
                Ok(())
            }

            NodeKind::For {
                init,
                cond,
                post,
                body,
            } => {
                self.out.push_str("for (");
                if let Some(init) = init {
                    self.emit_node(init)?;
                }
                self.out.push_str("; ");
                if let Some(cond) = cond {
                    self.emit_node(cond)?;
                }
                self.out.push_str("; ");
                if let Some(post) = post {
                    self.emit_node(post)?;
                }
                self.out.push_str(") ");
                self.emit_node(body)
            }

            NodeKind::Branch { tok } => {
                write!(self.out, "{tok}")?;
                Ok(())
            }

            NodeKind::Return { expr } => {
                self.out.push_str("return");
                if let Some(expr) = expr {
                    self.out.push(' ');
                    self.emit_node(expr)?;
                }
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
        emit_c(&file).expect("emit failed")
    }

    #[test]
    fn test_empty_function() {
        let out = emit("func main() int { return 0; }");
        assert!(out.contains("int main()"));
        assert!(out.contains("return 0;"));
        assert!(out.ends_with(";\n"));
    }

    #[test]
    fn test_parameters() {
        let out = emit("func add(a int, b int) int { return a + b; }");
        assert!(out.contains("int add(int a, int b)"));
        assert!(out.contains("return (a + b);"));
    }

    #[test]
    fn test_prototype_has_no_body() {
        let out = emit("func putchar(c int) int;");
        assert!(out.contains("int putchar(int c)"));
        assert!(!out.contains('{'));
    }

    #[test]
    fn test_binary_parenthesization() {
        // 1 + 2 * 3 must print so that re-parsing preserves the value 7.
        let out = emit("func f() int { return 1 + 2 * 3; }");
        assert!(out.contains("(1 + (2 * 3))"));
    }

    #[test]
    fn test_var_decl_and_assignment() {
        let out = emit("func f() int { var x int = 10; x = x + 5; return x; }");
        assert!(out.contains("int x = 10;"));
        assert!(out.contains("x = (x + 5);"));
        assert!(out.contains("return x;"));
    }

    #[test]
    fn test_if_else() {
        let out = emit("func f() int { if x { return 1; } else { return 0; } return -1; }");
        assert!(out.contains("if (x) {"));
        assert!(out.contains("} else {"));
        assert!(out.contains("return -1;"));
    }

    #[test]
    fn test_for_loop() {
        let out = emit("func f() int { for ; i < 10 ; i = i + 1 { break; } return i; }");
        assert!(out.contains("for (; (i < 10); i = (i + 1)) {"));
        assert!(out.contains("break;"));
    }

    #[test]
    fn test_call() {
        let out = emit("func main() int { return add(2, 3); }");
        assert!(out.contains("return add(2, 3);"));
    }

    #[test]
    fn test_typedef() {
        let out = emit("type word int;");
        assert_eq!(out, "typedef int word;\n");
    }

    #[test]
    fn test_struct_type() {
        let out = emit("type pair struct { var x int; var y int; };");
        assert!(out.contains("typedef struct {\n"));
        assert!(out.contains("int x;\n"));
        assert!(out.contains("int y;\n"));
        assert!(out.contains("} pair;\n"));
    }

    #[test]
    fn test_top_level_var() {
        let out = emit("var limit int = 100;");
        assert_eq!(out, "int limit = 100;\n");
    }

    #[test]
    fn test_indentation() {
        let out = emit("func f() int { if x { return 1; } return 0; }");
        assert!(out.contains("\tif (x)"));
        assert!(out.contains("\t\treturn 1;"));
    }

    #[test]
    fn test_emitted_c_is_reparseable_shape() {
        // The emitted subset round-trips syntactically: braces balance and
        // every statement line is terminated.
        let out = emit(
            "func add(a int, b int) int { return a + b; } \
             func main() int { var r int = add(2, 3); return r; }",
        );
        let opens = out.matches('{').count();
        let closes = out.matches('}').count();
        assert_eq!(opens, closes);
    }
}
