//! Expression parsing.
//!
//! Binary expressions use precedence climbing over
//! [`TokenKind::precedence`]: any lookahead whose precedence is at or above
//! the current floor is consumed as an infix operator, and its right operand
//! is parsed with a floor one higher, which makes every level
//! left-associative. `1 + 2 * 3` is `1 + (2 * 3)`; `1 - 2 - 3` is
//! `(1 - 2) - 3`.

use gobc_lex::TokenKind;

use crate::ast::{Node, NodeKind};
use crate::{ParseError, Parser};

impl<'a> Parser<'a> {
    /// expr := precedence climbing from the lowest binary level
    pub(crate) fn parse_expr(&mut self) -> Result<Node, ParseError> {
        self.parse_binary_expr(1)
    }

    /// Parse operators whose precedence is >= `min_prec`.
    fn parse_binary_expr(&mut self, min_prec: u8) -> Result<Node, ParseError> {
        let mut x = self.parse_unary()?;
        loop {
            let op = self.token.kind;
            let prec = op.precedence();
            if prec < min_prec {
                return Ok(x);
            }
            self.bump()?;
            let y = self.parse_binary_expr(prec + 1)?;
            let span = x.span;
            x = self.node(
                span,
                NodeKind::Binary {
                    op,
                    x: Box::new(x),
                    y: Box::new(y),
                },
            );
        }
    }

    /// unary := ('!'|'+'|'-'|'~') unary | primary
    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        match self.token.kind {
            TokenKind::Not | TokenKind::Add | TokenKind::Sub | TokenKind::BitNot => {
                let op = self.token.kind;
                let span = self.token.span;
                self.bump()?;
                let x = self.parse_unary()?;
                Ok(self.node(span, NodeKind::Unary { op, x: Box::new(x) }))
            }
            _ => self.parse_primary(),
        }
    }

    /// primary := operand ('(' call_args ')')?
    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        let operand = self.parse_operand()?;
        if self.at(TokenKind::Lparen) {
            let span = operand.span;
            let args = self.parse_call_args()?;
            return Ok(self.node(
                span,
                NodeKind::Call {
                    func: Box::new(operand),
                    args,
                },
            ));
        }
        Ok(operand)
    }

    /// operand := ident | INT | '(' expr ')'
    fn parse_operand(&mut self) -> Result<Node, ParseError> {
        match self.token.kind {
            TokenKind::Ident => self.parse_ident(),
            TokenKind::Int => {
                let span = self.token.span;
                let value = self.token.lexeme.clone();
                self.bump()?;
                Ok(self.node(
                    span,
                    NodeKind::Basic {
                        kind: TokenKind::Int,
                        value,
                    },
                ))
            }
            TokenKind::Lparen => {
                let span = self.token.span;
                self.bump()?;
                let x = self.parse_expr()?;
                self.expect(TokenKind::Rparen)?;
                Ok(self.node(span, NodeKind::Paren { x: Box::new(x) }))
            }
            _ => Err(self.error_expected("expression")),
        }
    }

    /// call_args := '(' (expr (',' expr)*)? ')'
    fn parse_call_args(&mut self) -> Result<Vec<Node>, ParseError> {
        self.expect(TokenKind::Lparen)?;
        let mut args = Vec::new();
        while !self.at(TokenKind::Rparen) {
            args.push(self.parse_expr()?);
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::Rparen)?;
        Ok(args)
    }

    /// A required identifier.
    pub(crate) fn parse_ident(&mut self) -> Result<Node, ParseError> {
        let token = self.expect(TokenKind::Ident)?;
        Ok(self.node(
            token.span,
            NodeKind::Ident {
                name: token.lexeme,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::parse_source;
    use crate::{Node, NodeKind};
    use gobc_lex::TokenKind;

    /// Parse `src` as the sole expression of a return statement.
    fn parse_expr_source(src: &str) -> Node {
        let file = parse_source(&format!("func f() int {{ return {src}; }}"));
        let NodeKind::FuncDecl { body, .. } = &file.decls[0].kind else {
            panic!("expected func decl");
        };
        let NodeKind::Block { stmts } = &body.as_ref().unwrap().kind else {
            panic!("expected block");
        };
        let NodeKind::Return { expr: Some(expr) } = &stmts[0].kind else {
            panic!("expected return with a value");
        };
        (**expr).clone()
    }

    fn binary_parts(node: &Node) -> (TokenKind, &Node, &Node) {
        match &node.kind {
            NodeKind::Binary { op, x, y } => (*op, x, y),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    fn assert_int(node: &Node, expected: &str) {
        match &node.kind {
            NodeKind::Basic { kind, value } => {
                assert_eq!(*kind, TokenKind::Int);
                assert_eq!(value, expected);
            }
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn test_int_literal() {
        assert_int(&parse_expr_source("42"), "42");
    }

    #[test]
    fn test_ident() {
        let node = parse_expr_source("x");
        assert_eq!(node.ident_name(), Some("x"));
    }

    #[test]
    fn test_precedence_mul_over_add() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let node = parse_expr_source("1 + 2 * 3");
        let (op, x, y) = binary_parts(&node);
        assert_eq!(op, TokenKind::Add);
        assert_int(x, "1");
        let (op2, x2, y2) = binary_parts(y);
        assert_eq!(op2, TokenKind::Mul);
        assert_int(x2, "2");
        assert_int(y2, "3");
    }

    #[test]
    fn test_left_associativity() {
        // 1 - 2 - 3 parses as (1 - 2) - 3
        let node = parse_expr_source("1 - 2 - 3");
        let (op, x, y) = binary_parts(&node);
        assert_eq!(op, TokenKind::Sub);
        assert_int(y, "3");
        let (op2, x2, y2) = binary_parts(x);
        assert_eq!(op2, TokenKind::Sub);
        assert_int(x2, "1");
        assert_int(y2, "2");
    }

    #[test]
    fn test_comparison_below_arithmetic() {
        // a + 1 < b parses as (a + 1) < b
        let node = parse_expr_source("a + 1 < b");
        let (op, x, _) = binary_parts(&node);
        assert_eq!(op, TokenKind::Lss);
        let (op2, _, _) = binary_parts(x);
        assert_eq!(op2, TokenKind::Add);
    }

    #[test]
    fn test_logical_levels() {
        // a && b || c parses as (a && b) || c
        let node = parse_expr_source("a && b || c");
        let (op, x, _) = binary_parts(&node);
        assert_eq!(op, TokenKind::Lor);
        let (op2, _, _) = binary_parts(x);
        assert_eq!(op2, TokenKind::Land);
    }

    #[test]
    fn test_paren_overrides_precedence() {
        // (1 + 2) * 3
        let node = parse_expr_source("(1 + 2) * 3");
        let (op, x, y) = binary_parts(&node);
        assert_eq!(op, TokenKind::Mul);
        assert_int(y, "3");
        let NodeKind::Paren { x: inner } = &x.kind else {
            panic!("expected paren");
        };
        let (op2, _, _) = binary_parts(inner);
        assert_eq!(op2, TokenKind::Add);
    }

    #[test]
    fn test_unary() {
        let node = parse_expr_source("-x");
        let NodeKind::Unary { op, x } = &node.kind else {
            panic!("expected unary");
        };
        assert_eq!(*op, TokenKind::Sub);
        assert_eq!(x.ident_name(), Some("x"));
    }

    #[test]
    fn test_unary_binds_tighter_than_binary() {
        // -x + y parses as (-x) + y
        let node = parse_expr_source("-x + y");
        let (op, x, _) = binary_parts(&node);
        assert_eq!(op, TokenKind::Add);
        assert!(matches!(x.kind, NodeKind::Unary { .. }));
    }

    #[test]
    fn test_nested_unary() {
        let node = parse_expr_source("!!x");
        let NodeKind::Unary { op, x } = &node.kind else {
            panic!("expected unary");
        };
        assert_eq!(*op, TokenKind::Not);
        assert!(matches!(x.kind, NodeKind::Unary { .. }));
    }

    #[test]
    fn test_call_no_args() {
        let node = parse_expr_source("f()");
        let NodeKind::Call { func, args } = &node.kind else {
            panic!("expected call");
        };
        assert_eq!(func.ident_name(), Some("f"));
        assert!(args.is_empty());
    }

    #[test]
    fn test_call_with_args() {
        let node = parse_expr_source("add(2, 3 + 4)");
        let NodeKind::Call { func, args } = &node.kind else {
            panic!("expected call");
        };
        assert_eq!(func.ident_name(), Some("add"));
        assert_eq!(args.len(), 2);
        assert_int(&args[0], "2");
        assert!(matches!(args[1].kind, NodeKind::Binary { .. }));
    }

    #[test]
    fn test_call_in_expression() {
        let node = parse_expr_source("f() + 1");
        let (op, x, _) = binary_parts(&node);
        assert_eq!(op, TokenKind::Add);
        assert!(matches!(x.kind, NodeKind::Call { .. }));
    }

    #[test]
    fn test_expr_positions() {
        // Offsets inside "func f() int { return <expr>; }": the expression
        // starts at byte 22.
        let node = parse_expr_source("x + 1");
        assert_eq!(node.span.start, 22);
        let (_, x, y) = binary_parts(&node);
        assert_eq!(x.span.start, 22);
        assert_eq!(y.span.start, 26);
    }
}
