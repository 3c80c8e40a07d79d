//! Statement and block parsers.

use super::expr::{parse_call_args, parse_expr};
use super::{ParseError, TokenStream};
use crate::ast::{ConstDecl, Expr, ExprKind, PortCall, Stmt};
use crate::lexer::Token;

/// Parse `{ stmt* }`.
pub fn parse_block(stream: &mut TokenStream) -> Result<Vec<Stmt>, ParseError> {
    stream.expect(Token::LBrace)?;
    let mut stmts = Vec::new();
    while !stream.check(&Token::RBrace) {
        if stream.at_end() {
            return Err(ParseError::unexpected_token(
                None,
                "inside block",
                stream.current_span(),
            ));
        }
        stmts.push(parse_stmt(stream)?);
    }
    stream.expect(Token::RBrace)?;
    Ok(stmts)
}

/// Parse one statement.
pub fn parse_stmt(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.mark();
    match stream.peek() {
        Some(Token::Semicolon) => {
            stream.advance();
            Ok(Stmt::Empty(stream.span_from(start)))
        }
        Some(Token::LBrace) => {
            let body = parse_block(stream)?;
            Ok(Stmt::Block(body, stream.span_from(start)))
        }
        Some(Token::Var) => parse_var(stream),
        Some(Token::Const) => {
            let decl = parse_const(stream)?;
            Ok(Stmt::Const(decl))
        }
        Some(Token::If) => parse_if(stream),
        Some(Token::While) => {
            stream.advance();
            let cond = parse_expr(stream)?;
            let body = parse_block(stream)?;
            Ok(Stmt::While {
                cond,
                body,
                span: stream.span_from(start),
            })
        }
        Some(Token::For) => parse_for_range(stream),
        Some(Token::Return) => {
            stream.advance();
            let value = if stream.check(&Token::RBrace) || stream.check(&Token::Semicolon) {
                None
            } else {
                Some(parse_expr(stream)?)
            };
            stream.eat(&Token::Semicolon);
            Ok(Stmt::Return {
                value,
                span: stream.span_from(start),
            })
        }
        Some(Token::Change) => parse_change(stream),
        Some(Token::Activate) => parse_activate(stream),
        _ => parse_simple(stream),
    }
}

/// `var a, b [const|foreign] [T] [= e1, e2]`
fn parse_var(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Var)?;

    let mut names = Vec::new();
    loop {
        let (name, span) = stream.expect_identifier("in var statement")?;
        names.push((name, span));
        if !stream.eat(&Token::Comma) {
            break;
        }
    }

    let modifier = super::decl::parse_modifier(stream);
    let spec = if stream.check(&Token::Eq)
        || stream.check(&Token::Semicolon)
        || stream.check(&Token::RBrace)
    {
        None
    } else {
        Some(super::decl::parse_type_spec(stream)?)
    };

    let mut inits = Vec::new();
    if stream.eat(&Token::Eq) {
        loop {
            inits.push(parse_expr(stream)?);
            if !stream.eat(&Token::Comma) {
                break;
            }
        }
    }
    stream.eat(&Token::Semicolon);

    Ok(Stmt::Var {
        names,
        modifier,
        spec,
        inits,
        span: stream.span_from(start),
    })
}

/// `const name [T] = expr`
pub(super) fn parse_const(stream: &mut TokenStream) -> Result<ConstDecl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Const)?;
    let (name, _) = stream.expect_identifier("in const declaration")?;
    let spec = if stream.check(&Token::Eq) {
        None
    } else {
        Some(super::decl::parse_type_spec(stream)?)
    };
    stream.expect(Token::Eq)?;
    let value = parse_expr(stream)?;
    stream.eat(&Token::Semicolon);
    Ok(ConstDecl {
        name,
        spec,
        value,
        span: stream.span_from(start),
    })
}

fn parse_if(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.mark();
    stream.expect(Token::If)?;
    let cond = parse_expr(stream)?;
    let then_block = parse_block(stream)?;
    let else_block = if stream.eat(&Token::Else) {
        if stream.check(&Token::If) {
            vec![parse_if(stream)?]
        } else {
            parse_block(stream)?
        }
    } else {
        Vec::new()
    };
    Ok(Stmt::If {
        cond,
        then_block,
        else_block,
        span: stream.span_from(start),
    })
}

/// `for i := range N { ... }`
fn parse_for_range(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.mark();
    stream.expect(Token::For)?;
    let (var, _) = stream.expect_identifier("in for statement")?;
    stream.expect(Token::ColonEq)?;
    stream.expect(Token::Range)?;
    let limit = parse_expr(stream)?;
    let body = parse_block(stream)?;
    Ok(Stmt::ForRange {
        var,
        limit,
        body,
        span: stream.span_from(start),
    })
}

/// `change x = e { ... }`
fn parse_change(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Change)?;
    let (var, _) = stream.expect_identifier("in change statement")?;
    stream.expect(Token::Eq)?;
    let expr = parse_expr(stream)?;
    let body = parse_block(stream)?;
    Ok(Stmt::Change {
        var,
        expr,
        body,
        span: stream.span_from(start),
    })
}

/// `activate p(args), q[i](args) { ... }` — the port list may be empty for
/// a pure mutable-phase transaction.
fn parse_activate(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Activate)?;

    let mut calls = Vec::new();
    while !stream.check(&Token::LBrace) {
        let call_start = stream.mark();
        let (name, name_span) = stream.expect_identifier("in activate statement")?;
        let port = Expr::new(ExprKind::Identifier(name), name_span);
        let index = if stream.eat(&Token::LBracket) {
            let idx = parse_expr(stream)?;
            stream.expect(Token::RBracket)?;
            Some(idx)
        } else {
            None
        };
        let args = parse_call_args(stream)?;
        calls.push(PortCall {
            port,
            index,
            args,
            span: stream.span_from(call_start),
        });
        if !stream.eat(&Token::Comma) {
            break;
        }
    }

    let body = parse_block(stream)?;
    Ok(Stmt::Activate {
        calls,
        body,
        span: stream.span_from(start),
    })
}

/// Expression-led statements: assignment, compound assignment, bind arrows,
/// or a bare expression.
fn parse_simple(stream: &mut TokenStream) -> Result<Stmt, ParseError> {
    let start = stream.mark();
    let expr = parse_expr(stream)?;

    let stmt = match stream.peek() {
        Some(Token::Eq) => {
            stream.advance();
            let value = parse_expr(stream)?;
            Stmt::Assign {
                target: expr,
                value,
                span: stream.span_from(start),
            }
        }
        Some(Token::PlusEq) => {
            stream.advance();
            let value = parse_expr(stream)?;
            Stmt::AddAssign {
                target: expr,
                value,
                span: stream.span_from(start),
            }
        }
        Some(Token::MinusEq) => {
            stream.advance();
            let value = parse_expr(stream)?;
            Stmt::SubAssign {
                target: expr,
                value,
                span: stream.span_from(start),
            }
        }
        Some(Token::RightArrow) => {
            stream.advance();
            let right = parse_expr(stream)?;
            // `port -> r.name[idx]` parses the index onto the target.
            let (target, index) = match right {
                Expr {
                    kind: ExprKind::Index { base, index },
                    ..
                } => (*base, Some(*index)),
                other => (other, None),
            };
            Stmt::BindPush {
                port: expr,
                target,
                index,
                span: stream.span_from(start),
            }
        }
        Some(Token::LeftArrow) => {
            stream.advance();
            let target = parse_expr(stream)?;
            Stmt::BindPull {
                port: expr,
                target,
                span: stream.span_from(start),
            }
        }
        _ => Stmt::Expression(expr),
    };

    stream.eat(&Token::Semicolon);
    Ok(stmt)
}
