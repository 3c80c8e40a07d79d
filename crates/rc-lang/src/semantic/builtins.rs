//! Built-in polymorphic templates: `new`, `move`, `merge`, `copy`, `len`,
//! `append`, `println`.
//!
//! Templates are installed in the predeclared block and checked per call
//! site; each template validates its argument count and types and produces
//! the result type directly.

use super::expressions::{check_expr, implicit_convert};
use super::Checker;
use crate::ast;
use crate::ast::typed::{Builtin, Callee, ExpressionKind, ExpressionValue, TypedExpr, TypedExprKind};
use crate::error::{CompileError, ErrorCode};
use crate::foundation::{Mutability, ReceiverAccess, Span};
use crate::symbol::TemplateKind;
use crate::types::{TypeId, TypeKind};
use crate::value::Value;

pub fn check_template(
    ck: &mut Checker,
    kind: TemplateKind,
    args: &[ast::Expr],
    span: Span,
) -> TypedExpr {
    match kind {
        TemplateKind::New => check_new(ck, args, span),
        TemplateKind::Move => check_heap_op(ck, "move", Builtin::Move, args, span),
        TemplateKind::Merge => check_heap_op(ck, "merge", Builtin::Merge, args, span),
        TemplateKind::Copy => check_copy(ck, args, span),
        TemplateKind::Len => check_len(ck, args, span),
        TemplateKind::Append => check_append(ck, args, span),
        TemplateKind::Println => check_println(ck, args, span),
    }
}

fn expect_count(ck: &mut Checker, name: &str, expect: usize, given: usize, span: Span) -> bool {
    if given != expect {
        ck.reporter.report(CompileError::new(
            ErrorCode::FuncExpectsCount,
            span,
            format!("'{}' expects {} arguments, given {}", name, expect, given),
        ));
        return false;
    }
    true
}

fn check_one_value(ck: &mut Checker, name: &str, args: &[ast::Expr], span: Span) -> Option<TypedExpr> {
    if !expect_count(ck, name, 1, args.len(), span) {
        return None;
    }
    let arg = check_expr(ck, &args[0]);
    if arg.is_error() {
        return None;
    }
    if !arg.eval.is_value_or_variable() {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            arg.span,
            format!("'{}' requires a value", name),
        ));
        return None;
    }
    Some(arg)
}

/// `new(T)` allocates a zero-valued `T` and yields `*T`.
fn check_new(ck: &mut Checker, args: &[ast::Expr], span: Span) -> TypedExpr {
    if !expect_count(ck, "new", 1, args.len(), span) {
        return TypedExpr::error(span);
    }
    let arg = check_expr(ck, &args[0]);
    if arg.is_error() {
        return TypedExpr::error(span);
    }
    if arg.eval.kind != ExpressionKind::Type {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresType,
            arg.span,
            "'new' requires a type".to_string(),
        ));
        return TypedExpr::error(span);
    }
    let target = arg.eval.ty;
    let ty = ck.ctx.types.pointer_to(target);
    TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Builtin(Builtin::New(target)),
            args: vec![],
        },
        ExpressionValue {
            kind: ExpressionKind::Value,
            ty,
            value: None,
            intrinsic: Mutability::Immutable,
            indirection: Mutability::Mutable,
            receiver_access: ReceiverAccess::None,
        },
        span,
    )
}

/// `move(p)` and `merge(p)` re-parent a heap: `*heap T -> *T`.
fn check_heap_op(
    ck: &mut Checker,
    name: &str,
    builtin: Builtin,
    args: &[ast::Expr],
    span: Span,
) -> TypedExpr {
    let Some(arg) = check_one_value(ck, name, args, span) else {
        return TypedExpr::error(span);
    };
    let Some(result) = ck.ctx.types.move_type(arg.eval.ty) else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'{}' cannot be applied to {}",
                name,
                ck.ctx.types.type_string(arg.eval.ty)
            ),
        ));
        return TypedExpr::error(span);
    };
    let access = arg.eval.receiver_access;
    TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Builtin(builtin),
            args: vec![arg],
        },
        ExpressionValue {
            kind: ExpressionKind::Value,
            ty: result,
            value: None,
            intrinsic: Mutability::Immutable,
            indirection: Mutability::Mutable,
            receiver_access: access,
        },
        span,
    )
}

/// `copy(x)` duplicates a slice or string value.
fn check_copy(ck: &mut Checker, args: &[ast::Expr], span: Span) -> TypedExpr {
    let Some(arg) = check_one_value(ck, "copy", args, span) else {
        return TypedExpr::error(span);
    };
    let ty = arg.eval.ty;
    let legal = ck.ctx.types.is_string_type(ty)
        || matches!(ck.ctx.types.underlying_kind(ty), TypeKind::Slice { .. });
    if !legal {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'copy' cannot be applied to {}",
                ck.ctx.types.type_string(ty)
            ),
        ));
        return TypedExpr::error(span);
    }
    let access = arg.eval.receiver_access;
    TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Builtin(Builtin::Copy),
            args: vec![arg],
        },
        ExpressionValue {
            kind: ExpressionKind::Value,
            ty,
            value: None,
            intrinsic: Mutability::Immutable,
            // The copy owns fresh storage.
            indirection: Mutability::Mutable,
            receiver_access: access,
        },
        span,
    )
}

/// `len(x)` for arrays, slices, and strings; folds for constants.
fn check_len(ck: &mut Checker, args: &[ast::Expr], span: Span) -> TypedExpr {
    let Some(arg) = check_one_value(ck, "len", args, span) else {
        return TypedExpr::error(span);
    };
    let ty = arg.eval.ty;
    let folded = match ck.ctx.types.underlying_kind(ty) {
        TypeKind::Array { dimension, .. } => Some(Value::Int(*dimension)),
        TypeKind::Slice { .. } => None,
        TypeKind::String | TypeKind::UntypedString => arg
            .eval
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .map(|s| Value::Int(s.len() as i64)),
        _ => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!(
                    "'len' cannot be applied to {}",
                    ck.ctx.types.type_string(ty)
                ),
            ));
            return TypedExpr::error(span);
        }
    };
    let access = arg.eval.receiver_access;
    TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Builtin(Builtin::Len),
            args: vec![arg],
        },
        ExpressionValue::value(TypeId::INT, folded).with_access(access),
        span,
    )
}

/// `append(s, v...)` appends values to a slice.
fn check_append(ck: &mut Checker, args: &[ast::Expr], span: Span) -> TypedExpr {
    if args.is_empty() {
        ck.reporter.report(CompileError::new(
            ErrorCode::FuncExpectsCount,
            span,
            "'append' expects at least 1 argument".to_string(),
        ));
        return TypedExpr::error(span);
    }
    let slice = check_expr(ck, &args[0]);
    if slice.is_error() {
        return TypedExpr::error(span);
    }
    let TypeKind::Slice { base } = ck.ctx.types.underlying_kind(slice.eval.ty) else {
        ck.reporter.report(CompileError::new(
            ErrorCode::FuncExpectsArg,
            slice.span,
            format!(
                "'append' expects a slice, given {}",
                ck.ctx.types.type_string(slice.eval.ty)
            ),
        ));
        return TypedExpr::error(span);
    };
    let element = *base;
    let result_ty = slice.eval.ty;

    let mut access = slice.eval.receiver_access;
    let mut typed_args = vec![slice];
    for arg in &args[1..] {
        let a = check_expr(ck, arg);
        if a.is_error() {
            return TypedExpr::error(span);
        }
        let a = implicit_convert(ck, a, element, ErrorCode::FuncExpectsArg);
        if a.is_error() {
            return TypedExpr::error(span);
        }
        access = access.lub(a.eval.receiver_access);
        typed_args.push(a);
    }

    TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Builtin(Builtin::Append),
            args: typed_args,
        },
        ExpressionValue {
            kind: ExpressionKind::Value,
            ty: result_ty,
            value: None,
            intrinsic: Mutability::Immutable,
            indirection: Mutability::Mutable,
            receiver_access: access,
        },
        span,
    )
}

/// `println(args...)` prints any values.
fn check_println(ck: &mut Checker, args: &[ast::Expr], span: Span) -> TypedExpr {
    let mut typed_args = Vec::with_capacity(args.len());
    let mut access = ReceiverAccess::None;
    for arg in args {
        let a = check_expr(ck, arg);
        if a.is_error() {
            return TypedExpr::error(span);
        }
        if !a.eval.is_value_or_variable() {
            ck.reporter.report(CompileError::new(
                ErrorCode::RequiresValueOrVariable,
                a.span,
                "'println' requires values".to_string(),
            ));
            return TypedExpr::error(span);
        }
        access = access.lub(a.eval.receiver_access);
        typed_args.push(a);
    }
    TypedExpr::new(
        TypedExprKind::Call {
            callee: Callee::Builtin(Builtin::Println),
            args: typed_args,
        },
        ExpressionValue::value(TypeId::VOID, None).with_access(access),
        span,
    )
}
