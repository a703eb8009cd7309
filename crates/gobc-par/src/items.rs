//! Declaration parsing: functions, types, variables, struct types.

use gobc_lex::TokenKind;

use crate::ast::{Node, NodeKind};
use crate::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// decl := func_decl | type_decl | var_decl
    pub(crate) fn parse_decl(&mut self) -> Result<Node, ParseError> {
        match self.token.kind {
            TokenKind::Func => self.parse_func_decl(),
            TokenKind::Type => self.parse_type_decl(),
            TokenKind::Var => self.parse_var_decl(),
            _ => Err(self.error_expected("declaration")),
        }
    }

    /// func_decl := 'func' ident ('.' ident)? params ident (block | ';')
    ///
    /// If a `.` follows the first identifier it was a method receiver and
    /// the real function name comes next. A `;` in place of the body makes
    /// the declaration a prototype.
    fn parse_func_decl(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(TokenKind::Func)?;
        let mut name = self.parse_ident()?;
        let mut recv = None;
        if self.accept(TokenKind::Period)? {
            recv = Some(Box::new(name));
            name = self.parse_ident()?;
        }
        let params = self.parse_params()?;
        let ret = self.parse_ident()?;
        let body = if self.accept(TokenKind::Semicolon)? {
            None
        } else {
            Some(Box::new(self.parse_block_stmt()?))
        };
        Ok(self.node(
            kw.span,
            NodeKind::FuncDecl {
                recv,
                name: Box::new(name),
                params,
                ret: Box::new(ret),
                body,
            },
        ))
    }

    /// params := '(' (field (',' field)*)? ')'
    fn parse_params(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::Lparen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::Rparen) {
            params.push(self.parse_field()?);
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::Rparen)?;
        Ok(params)
    }

    /// field := ident type_expr
    fn parse_field(&mut self) -> Result<Node, ParseError> {
        let name = self.parse_ident()?;
        let span = name.span;
        let ty = self.parse_type_expr()?;
        Ok(self.node(
            span,
            NodeKind::Field {
                name: Box::new(name),
                ty: Box::new(ty),
            },
        ))
    }

    /// type_decl := 'type' ident type_expr ';'
    fn parse_type_decl(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(TokenKind::Type)?;
        let name = self.parse_ident()?;
        let ty = self.parse_type_expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(self.node(
            kw.span,
            NodeKind::TypeDecl {
                name: Box::new(name),
                ty: Box::new(ty),
            },
        ))
    }

    /// type_expr := ident | struct_type
    fn parse_type_expr(&mut self) -> Result<Node, ParseError> {
        match self.token.kind {
            TokenKind::Ident => self.parse_ident(),
            TokenKind::Struct => self.parse_struct_type(),
            _ => Err(self.error_expected("type expression")),
        }
    }

    /// struct_type := 'struct' '{' decl* '}'
    fn parse_struct_type(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(TokenKind::Struct)?;
        self.expect(TokenKind::Lbrace)?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::Rbrace) && !self.at(TokenKind::Eof) {
            fields.push(self.parse_decl()?);
        }
        self.expect(TokenKind::Rbrace)?;
        Ok(self.node(kw.span, NodeKind::StructType { fields }))
    }

    /// var_decl := 'var' ident ident ('=' expr)? ';'
    fn parse_var_decl(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(TokenKind::Var)?;
        let name = self.parse_ident()?;
        let ty = self.parse_ident()?;
        let value = if self.accept(TokenKind::Assign)? {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(self.node(
            kw.span,
            NodeKind::VarDecl {
                name: Box::new(name),
                ty: Box::new(ty),
                value,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::{parse_err, parse_source};
    use crate::NodeKind;

    #[test]
    fn test_func_decl() {
        let file = parse_source("func main() int { return 0; }");
        assert_eq!(file.decls.len(), 1);
        let NodeKind::FuncDecl {
            recv,
            name,
            params,
            ret,
            body,
        } = &file.decls[0].kind
        else {
            panic!("expected func decl");
        };
        assert!(recv.is_none());
        assert_eq!(name.ident_name(), Some("main"));
        assert!(params.is_empty());
        assert_eq!(ret.ident_name(), Some("int"));
        assert!(body.is_some());
    }

    #[test]
    fn test_func_params() {
        let file = parse_source("func add(a int, b int) int { return a + b; }");
        let NodeKind::FuncDecl { params, .. } = &file.decls[0].kind else {
            panic!("expected func decl");
        };
        assert_eq!(params.len(), 2);
        let NodeKind::Field { name, ty } = &params[0].kind else {
            panic!("expected field");
        };
        assert_eq!(name.ident_name(), Some("a"));
        assert_eq!(ty.ident_name(), Some("int"));
    }

    #[test]
    fn test_func_prototype() {
        let file = parse_source("func putchar(c int) int;");
        let NodeKind::FuncDecl { body, .. } = &file.decls[0].kind else {
            panic!("expected func decl");
        };
        assert!(body.is_none());
    }

    #[test]
    fn test_method_receiver() {
        let file = parse_source("func counter.bump() int { return 1; }");
        let NodeKind::FuncDecl { recv, name, .. } = &file.decls[0].kind else {
            panic!("expected func decl");
        };
        assert_eq!(recv.as_ref().unwrap().ident_name(), Some("counter"));
        assert_eq!(name.ident_name(), Some("bump"));
    }

    #[test]
    fn test_type_decl_ident() {
        let file = parse_source("type word int;");
        let NodeKind::TypeDecl { name, ty } = &file.decls[0].kind else {
            panic!("expected type decl");
        };
        assert_eq!(name.ident_name(), Some("word"));
        assert_eq!(ty.ident_name(), Some("int"));
    }

    #[test]
    fn test_type_decl_struct() {
        let file = parse_source("type pair struct { var x int; var y int; };");
        let NodeKind::TypeDecl { ty, .. } = &file.decls[0].kind else {
            panic!("expected type decl");
        };
        let NodeKind::StructType { fields } = &ty.kind else {
            panic!("expected struct type");
        };
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[0].kind, NodeKind::VarDecl { .. }));
    }

    #[test]
    fn test_top_level_var() {
        let file = parse_source("var limit int = 100;");
        let NodeKind::VarDecl { name, ty, value } = &file.decls[0].kind else {
            panic!("expected var decl");
        };
        assert_eq!(name.ident_name(), Some("limit"));
        assert_eq!(ty.ident_name(), Some("int"));
        assert!(value.is_some());
    }

    #[test]
    fn test_var_without_value() {
        let file = parse_source("var x int;");
        let NodeKind::VarDecl { value, .. } = &file.decls[0].kind else {
            panic!("expected var decl");
        };
        assert!(value.is_none());
    }

    #[test]
    fn test_multiple_decls() {
        let file = parse_source(
            "func add(a int, b int) int { return a + b; } func main() int { return add(2, 3); }",
        );
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn test_decl_positions() {
        let file = parse_source("var x int;\nfunc f() int { return 0; }");
        assert_eq!(file.decls[0].span.start, 0);
        assert_eq!(file.decls[1].span.start, 11);
        assert_eq!(file.decls[1].span.line, 2);
    }

    #[test]
    fn test_bad_top_level() {
        let err = parse_err("return 0;");
        assert!(err.to_string().contains("expected declaration"));
        assert!(err.to_string().contains("return"));
    }

    #[test]
    fn test_missing_param_type() {
        let err = parse_err("func f(a) int { return 0; }");
        assert!(err.to_string().contains("expected type expression"));
    }
}
