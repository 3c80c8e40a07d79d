//! Expression parser: precedence climbing over the token stream.

use super::{ParseError, TokenStream};
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::lexer::Token;

/// Binary operator metadata: precedence (higher binds tighter).
///
/// All RC binary operators are left associative.
fn binary_op_info(token: &Token) -> Option<(u8, BinaryOp)> {
    match token {
        Token::PipePipe => Some((1, BinaryOp::LogicOr)),
        Token::AmpAmp => Some((2, BinaryOp::LogicAnd)),
        Token::EqEq => Some((3, BinaryOp::Eq)),
        Token::BangEq => Some((3, BinaryOp::Ne)),
        Token::Lt => Some((3, BinaryOp::Lt)),
        Token::LtEq => Some((3, BinaryOp::Le)),
        Token::Gt => Some((3, BinaryOp::Gt)),
        Token::GtEq => Some((3, BinaryOp::Ge)),
        Token::Plus => Some((4, BinaryOp::Add)),
        Token::Minus => Some((4, BinaryOp::Sub)),
        Token::Pipe => Some((4, BinaryOp::BitOr)),
        Token::Caret => Some((4, BinaryOp::BitXor)),
        Token::Star => Some((5, BinaryOp::Mul)),
        Token::Slash => Some((5, BinaryOp::Div)),
        Token::Percent => Some((5, BinaryOp::Rem)),
        Token::Shl => Some((5, BinaryOp::Shl)),
        Token::Shr => Some((5, BinaryOp::Shr)),
        Token::Amp => Some((5, BinaryOp::BitAnd)),
        Token::AmpCaret => Some((5, BinaryOp::AndNot)),
        _ => None,
    }
}

/// Parse a full expression.
pub fn parse_expr(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    parse_binary(stream, 1)
}

fn parse_binary(stream: &mut TokenStream, min_prec: u8) -> Result<Expr, ParseError> {
    let start = stream.mark();
    let mut left = parse_unary(stream)?;

    while let Some(token) = stream.peek() {
        let Some((prec, op)) = binary_op_info(token) else {
            break;
        };
        if prec < min_prec {
            break;
        }
        stream.advance();
        let right = parse_binary(stream, prec + 1)?;
        let span = stream.span_from(start);
        left = Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        );
    }

    Ok(left)
}

fn parse_unary(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.mark();
    let op = match stream.peek() {
        Some(Token::Plus) => Some(UnaryOp::Pos),
        Some(Token::Minus) => Some(UnaryOp::Neg),
        Some(Token::Bang) => Some(UnaryOp::Not),
        Some(Token::Caret) => Some(UnaryOp::Complement),
        Some(Token::Amp) => {
            stream.advance();
            let operand = parse_unary(stream)?;
            return Ok(Expr::new(
                ExprKind::AddressOf(Box::new(operand)),
                stream.span_from(start),
            ));
        }
        Some(Token::Star) => {
            stream.advance();
            let operand = parse_unary(stream)?;
            return Ok(Expr::new(
                ExprKind::Deref(Box::new(operand)),
                stream.span_from(start),
            ));
        }
        _ => None,
    };

    if let Some(op) = op {
        stream.advance();
        let operand = parse_unary(stream)?;
        return Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            stream.span_from(start),
        ));
    }

    parse_postfix(stream)
}

fn parse_postfix(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let start = stream.mark();
    let mut expr = parse_atom(stream)?;

    loop {
        match stream.peek() {
            Some(Token::Dot) => {
                stream.advance();
                let (name, _) = stream.expect_identifier("after '.'")?;
                expr = Expr::new(
                    ExprKind::Select {
                        base: Box::new(expr),
                        name,
                    },
                    stream.span_from(start),
                );
            }
            Some(Token::LParen) => {
                let args = parse_call_args(stream)?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    stream.span_from(start),
                );
            }
            Some(Token::LBracket) => {
                expr = parse_index_or_slice(stream, expr, start)?;
            }
            _ => break,
        }
    }

    Ok(expr)
}

/// `base[i]`, `base[lo:hi]`, or `base[lo:hi:max]`.
fn parse_index_or_slice(
    stream: &mut TokenStream,
    base: Expr,
    start: usize,
) -> Result<Expr, ParseError> {
    stream.expect(Token::LBracket)?;

    let lo = if stream.check(&Token::Colon) {
        None
    } else {
        Some(Box::new(parse_expr(stream)?))
    };

    if stream.eat(&Token::RBracket) {
        let index = lo.ok_or_else(|| {
            ParseError::unexpected_token(Some(&Token::RBracket), "in index expression", stream.current_span())
        })?;
        return Ok(Expr::new(
            ExprKind::Index {
                base: Box::new(base),
                index,
            },
            stream.span_from(start),
        ));
    }

    stream.expect(Token::Colon)?;
    let hi = if stream.check(&Token::RBracket) || stream.check(&Token::Colon) {
        None
    } else {
        Some(Box::new(parse_expr(stream)?))
    };

    let max = if stream.eat(&Token::Colon) {
        Some(Box::new(parse_expr(stream)?))
    } else {
        None
    };

    stream.expect(Token::RBracket)?;
    Ok(Expr::new(
        ExprKind::SliceExpr {
            base: Box::new(base),
            lo,
            hi,
            max,
        },
        stream.span_from(start),
    ))
}

pub(super) fn parse_call_args(stream: &mut TokenStream) -> Result<Vec<Expr>, ParseError> {
    stream.expect(Token::LParen)?;
    let mut args = Vec::new();
    while !stream.check(&Token::RParen) {
        args.push(parse_expr(stream)?);
        if !stream.eat(&Token::Comma) {
            break;
        }
    }
    stream.expect(Token::RParen)?;
    Ok(args)
}

fn parse_atom(stream: &mut TokenStream) -> Result<Expr, ParseError> {
    let span = stream.current_span();
    match stream.peek().cloned() {
        Some(Token::Integer(n)) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Integer(n), span))
        }
        Some(Token::Float(x)) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Float(x), span))
        }
        Some(Token::Rune(r)) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Rune(r), span))
        }
        Some(Token::Str(s)) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Str(s), span))
        }
        // `true`, `false`, and `nil` are predeclared constants, not literal
        // forms; they reach the checker as identifiers.
        Some(Token::True) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Identifier("true".to_string()), span))
        }
        Some(Token::False) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Identifier("false".to_string()), span))
        }
        Some(Token::Nil) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Identifier("nil".to_string()), span))
        }
        Some(Token::Ident(name)) => {
            stream.advance();
            Ok(Expr::new(ExprKind::Identifier(name), span))
        }
        Some(Token::LParen) => {
            stream.advance();
            let inner = parse_expr(stream)?;
            stream.expect(Token::RParen)?;
            Ok(inner)
        }
        // Composite type specs in expression position (`new(heap int)`,
        // `[]uint8(s)`). Only type syntax can start with these tokens.
        Some(Token::Heap | Token::Map | Token::LBracket | Token::Struct | Token::Component) => {
            let start = stream.mark();
            let spec = super::decl::parse_type_spec(stream)?;
            Ok(Expr::new(
                ExprKind::TypeLiteral(Box::new(spec)),
                stream.span_from(start),
            ))
        }
        other => Err(ParseError::unexpected_token(
            other.as_ref(),
            "in expression",
            span,
        )),
    }
}
