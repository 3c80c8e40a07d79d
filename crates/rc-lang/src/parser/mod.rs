//! Hand-written recursive descent parser for RC.
//!
//! - `stream` — [`TokenStream`] wrapper with lookahead over lexed tokens
//! - `error` — [`ParseError`] values (the parser never panics)
//! - `expr` — precedence-climbing expression parser
//! - `stmt` — statement and block parsers
//! - `decl` — declaration and type-spec parsers (keyword dispatched)
//!
//! The parser produces the untyped AST of [`crate::ast`]; all name and type
//! questions are deferred to the semantic passes.

mod decl;
mod error;
mod expr;
mod stmt;
mod stream;

pub use error::{ParseError, ParseErrorKind};
pub use stream::TokenStream;

use crate::ast::Program;
use crate::lexer::Token;
use logos::Logos;
use std::ops::Range;

/// One token with its source byte range and starting line.
#[derive(Debug, Clone)]
pub struct Lexeme {
    pub token: Token,
    pub range: Range<usize>,
    pub line: u32,
}

/// Lex a source file into spanned tokens.
///
/// Invalid tokens are reported as parse errors; the valid prefix semantics
/// are not kept (a file with lex errors is rejected as a whole).
pub fn lex(source: &str, file_id: u16) -> Result<Vec<Lexeme>, Vec<ParseError>> {
    let mut lexer = Token::lexer(source);
    let mut lexemes = Vec::new();
    let mut errors = Vec::new();
    let mut line = 1u32;
    let mut line_scan_pos = 0usize;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        // Advance the line counter over the text skipped since the last token.
        line += source[line_scan_pos..range.start]
            .bytes()
            .filter(|&b| b == b'\n')
            .count() as u32;
        line_scan_pos = range.start;

        match result {
            Ok(token) => lexemes.push(Lexeme {
                token,
                range: range.clone(),
                line,
            }),
            Err(()) => errors.push(ParseError::invalid_token(crate::foundation::Span::new(
                file_id,
                range.start as u32,
                range.end as u32,
                line,
            ))),
        }
    }

    if errors.is_empty() {
        Ok(lexemes)
    } else {
        Err(errors)
    }
}

/// Parse a lexed file into a [`Program`].
pub fn parse_program(tokens: &[Lexeme], file_id: u16) -> Result<Program, Vec<ParseError>> {
    let mut stream = TokenStream::new(tokens, file_id);
    let decls = decl::parse_program(&mut stream)?;
    Ok(Program { decls })
}

/// Lex and parse source text in one step.
pub fn parse_source(source: &str, file_id: u16) -> Result<Program, Vec<ParseError>> {
    let tokens = lex(source, file_id)?;
    parse_program(&tokens, file_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Decl, Expr, ExprKind, Stmt, TypeSpec};

    fn parse(source: &str) -> Program {
        parse_source(source, 0).expect("parse failed")
    }

    fn parse_one_expr(source: &str) -> Expr {
        let program = parse(&format!("func f() {{ return {} }}", source));
        match &program.decls[0] {
            Decl::Function(f) => match &f.body[0] {
                Stmt::Return { value: Some(e), .. } => e.clone(),
                other => panic!("expected return, got {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn type_declaration_forms() {
        let program = parse(
            "type A int\n\
             type B *A\n\
             type C [4]uint8\n\
             type D []string\n\
             type E heap A\n\
             type F map[string]int",
        );
        assert_eq!(program.decls.len(), 6);
        match &program.decls[4] {
            Decl::Type(t) => assert!(matches!(t.spec, TypeSpec::Heap(_, _))),
            _ => panic!("expected type declaration"),
        }
    }

    #[test]
    fn component_with_ports() {
        let program = parse(
            "type Counter component {\n\
                 count uint;\n\
                 request push(n int);\n\
                 query pull() uint;\n\
                 fan [3]push(n int)\n\
             }",
        );
        match &program.decls[0] {
            Decl::Type(t) => match &t.spec {
                TypeSpec::Component(fields, _) => {
                    assert_eq!(fields.len(), 4);
                    assert!(matches!(fields[1].spec, TypeSpec::Push(_, _)));
                    assert!(matches!(fields[2].spec, TypeSpec::Pull(_, _, _)));
                    assert!(matches!(fields[3].spec, TypeSpec::Array(_, _, _)));
                }
                other => panic!("expected component, got {:?}", other),
            },
            _ => panic!("expected type declaration"),
        }
    }

    #[test]
    fn precedence_mul_binds_tighter_than_add() {
        let e = parse_one_expr("1 + 2 * 3");
        match e.kind {
            ExprKind::Binary { op: BinaryOp::Add, right, .. } => match right.kind {
                ExprKind::Binary { op: BinaryOp::Mul, .. } => {}
                other => panic!("expected mul on the right, got {:?}", other),
            },
            other => panic!("expected add at the root, got {:?}", other),
        }
    }

    #[test]
    fn logical_operators_bind_loosest() {
        let e = parse_one_expr("a < b && c < d || e");
        match e.kind {
            ExprKind::Binary { op: BinaryOp::LogicOr, left, .. } => match left.kind {
                ExprKind::Binary { op: BinaryOp::LogicAnd, .. } => {}
                other => panic!("expected and under or, got {:?}", other),
            },
            other => panic!("expected or at the root, got {:?}", other),
        }
    }

    #[test]
    fn postfix_chains() {
        let e = parse_one_expr("a.b[1].c(2, 3)");
        match e.kind {
            ExprKind::Call { callee, args } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(callee.kind, ExprKind::Select { .. }));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn slice_expressions() {
        assert!(matches!(
            parse_one_expr("a[1:2]").kind,
            ExprKind::SliceExpr { max: None, .. }
        ));
        assert!(matches!(
            parse_one_expr("a[1:2:3]").kind,
            ExprKind::SliceExpr { max: Some(_), .. }
        ));
        assert!(matches!(parse_one_expr("a[1]").kind, ExprKind::Index { .. }));
    }

    #[test]
    fn address_of_and_deref() {
        assert!(matches!(parse_one_expr("&x").kind, ExprKind::AddressOf(_)));
        assert!(matches!(parse_one_expr("*p").kind, ExprKind::Deref(_)));
    }

    #[test]
    fn action_with_dimension_and_activate() {
        let program = parse(
            "action [3] (c *Counter) (c.count < 10) {\n\
                 activate request(1), fan[2](0) {\n\
                     c.count = c.count + 1\n\
                 }\n\
             }",
        );
        match &program.decls[0] {
            Decl::Action(a) => {
                assert!(a.dimension.is_some());
                assert_eq!(a.receiver.name, "c");
                match &a.body[0] {
                    Stmt::Activate { calls, body, .. } => {
                        assert_eq!(calls.len(), 2);
                        assert!(calls[1].index.is_some());
                        assert_eq!(body.len(), 1);
                    }
                    other => panic!("expected activate, got {:?}", other),
                }
            }
            _ => panic!("expected action"),
        }
    }

    #[test]
    fn bind_statements() {
        let program = parse(
            "bind (s *Sys) {\n\
                 s.src.out -> s.snk.tick\n\
                 s.src.out2 -> s.snk.multi[1]\n\
                 s.query <- s.store.current\n\
             }",
        );
        match &program.decls[0] {
            Decl::Bind(b) => {
                assert!(matches!(b.body[0], Stmt::BindPush { index: None, .. }));
                assert!(matches!(b.body[1], Stmt::BindPush { index: Some(_), .. }));
                assert!(matches!(b.body[2], Stmt::BindPull { .. }));
            }
            _ => panic!("expected bind"),
        }
    }

    #[test]
    fn instance_declaration() {
        let program = parse("instance main Counter start(3)");
        match &program.decls[0] {
            Decl::Instance(i) => {
                assert_eq!(i.name, "main");
                assert_eq!(i.type_name, "Counter");
                assert_eq!(i.initializer, "start");
                assert_eq!(i.args.len(), 1);
            }
            _ => panic!("expected instance"),
        }
    }

    #[test]
    fn statements_roundtrip() {
        let program = parse(
            "func f(x int) int {\n\
                 var y, z int = 1, 2\n\
                 const k = 7\n\
                 y += k\n\
                 if y < z { y = z } else { z = y }\n\
                 while y < 10 { y = y + 1 }\n\
                 for i := range 4 { z = z + i }\n\
                 change r = e { ; }\n\
                 return y\n\
             }",
        );
        match &program.decls[0] {
            Decl::Function(f) => assert_eq!(f.body.len(), 8),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn parse_error_reports_location() {
        let errors = parse_source("type = int", 0).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors[0].message.contains("type declaration"));
    }

    #[test]
    fn lex_error_surfaces_as_parse_error() {
        let errors = parse_source("func f() { @ }", 0).unwrap_err();
        assert_eq!(errors[0].kind, ParseErrorKind::InvalidToken);
    }
}
