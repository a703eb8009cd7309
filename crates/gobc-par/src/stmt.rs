//! Statement parsing.

use gobc_lex::TokenKind;

use crate::ast::{Node, NodeKind};
use crate::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// stmt := decl_stmt | return_stmt | branch_stmt | if_stmt | for_stmt
    ///       | block | simple_stmt ';' | ';'
    pub(crate) fn parse_stmt(&mut self) -> Result<Node, ParseError> {
        match self.token.kind {
            TokenKind::Var | TokenKind::Type => {
                let span = self.token.span;
                let decl = self.parse_decl()?;
                Ok(self.node(
                    span,
                    NodeKind::DeclStmt {
                        decl: Box::new(decl),
                    },
                ))
            }
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break | TokenKind::Continue => self.parse_branch_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Lbrace => self.parse_block_stmt(),
            TokenKind::Semicolon => {
                let span = self.token.span;
                self.bump()?;
                Ok(self.node(span, NodeKind::Empty))
            }
            _ => {
                let stmt = self.parse_simple_stmt()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(stmt)
            }
        }
    }

    /// simple_stmt := expr ('=' expr)?
    ///
    /// An assignment if `=` follows the first expression, otherwise an
    /// expression statement. The trailing `;` belongs to the caller: the
    /// post clause of a `for` head uses this production without one.
    pub(crate) fn parse_simple_stmt(&mut self) -> Result<Node, ParseError> {
        let lhs = self.parse_expr()?;
        let span = lhs.span;
        if self.accept(TokenKind::Assign)? {
            let rhs = self.parse_expr()?;
            return Ok(self.node(
                span,
                NodeKind::Assign {
                    lhs: Box::new(lhs),
                    op: TokenKind::Assign,
                    rhs: Box::new(rhs),
                },
            ));
        }
        Ok(self.node(span, NodeKind::ExprStmt { x: Box::new(lhs) }))
    }

    /// block := '{' stmt* '}'
    pub(crate) fn parse_block_stmt(&mut self) -> Result<Node, ParseError> {
        let open = self.expect(TokenKind::Lbrace)?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Rbrace) && !self.at(TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::Rbrace)?;
        Ok(self.node(open.span, NodeKind::Block { stmts }))
    }

    /// return_stmt := 'return' expr? ';'
    fn parse_return_stmt(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(TokenKind::Return)?;
        let expr = if self.at(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(self.node(kw.span, NodeKind::Return { expr }))
    }

    /// branch_stmt := ('break' | 'continue') ';'
    fn parse_branch_stmt(&mut self) -> Result<Node, ParseError> {
        let tok = self.token.kind;
        let span = self.token.span;
        self.bump()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(self.node(span, NodeKind::Branch { tok }))
    }

    /// if_stmt := 'if' expr block ('else' (if_stmt | block))?
    fn parse_if_stmt(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block_stmt()?;
        let else_ = if self.accept(TokenKind::Else)? {
            let node = if self.at(TokenKind::If) {
                self.parse_if_stmt()?
            } else {
                self.parse_block_stmt()?
            };
            Some(Box::new(node))
        } else {
            None
        };
        Ok(self.node(
            kw.span,
            NodeKind::If {
                cond: Box::new(cond),
                body: Box::new(body),
                else_,
            },
        ))
    }

    /// for_stmt := 'for' init? ';' cond? ';' post? block
    ///
    /// The init clause reuses the statement grammar, so a var declaration is
    /// allowed there; both forms own the `;` that closes the clause.
    fn parse_for_stmt(&mut self) -> Result<Node, ParseError> {
        let kw = self.expect(TokenKind::For)?;

        let init = if self.accept(TokenKind::Semicolon)? {
            None
        } else if self.at(TokenKind::Var) {
            let span = self.token.span;
            let decl = self.parse_decl()?;
            let stmt = self.node(
                span,
                NodeKind::DeclStmt {
                    decl: Box::new(decl),
                },
            );
            Some(Box::new(stmt))
        } else {
            let stmt = self.parse_simple_stmt()?;
            self.expect(TokenKind::Semicolon)?;
            Some(Box::new(stmt))
        };

        let cond = if self.accept(TokenKind::Semicolon)? {
            None
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenKind::Semicolon)?;
            Some(Box::new(expr))
        };

        let post = if self.at(TokenKind::Lbrace) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt()?))
        };

        let body = self.parse_block_stmt()?;
        Ok(self.node(
            kw.span,
            NodeKind::For {
                init,
                cond,
                post,
                body: Box::new(body),
            },
        ))
    }
}
