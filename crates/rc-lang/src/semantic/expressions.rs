//! Expression checking, constant folding, and implicit conversion.
//!
//! [`check_expr`] transforms an untyped expression into a [`TypedExpr`]
//! whose [`ExpressionValue`] records kind, type, folded value, the two
//! mutability axes, and receiver access. On any error the node's kind is
//! `Error` and enclosing checks short-circuit without re-reporting.

use super::builtins;
use super::{CallableKind, Checker};
use crate::ast::typed::{Callee, ExpressionKind, ExpressionValue, TypedExpr, TypedExprKind};
use crate::ast::{self, BinaryOp, UnaryOp};
use crate::error::{CompileError, ErrorCode};
use crate::foundation::{Mutability, ReceiverAccess, Span};
use crate::symbol::{ParameterKind, SymbolKind};
use crate::types::{FunctionKind, Member, Parameter, TypeId, TypeKind};
use crate::value::{self, ArithOp, Value};

/// Check one expression.
pub fn check_expr(ck: &mut Checker, expr: &ast::Expr) -> TypedExpr {
    let span = expr.span;
    match &expr.kind {
        ast::ExprKind::Integer(n) => literal(TypeId::UNTYPED_INTEGER, Value::Integer(*n), span),
        ast::ExprKind::Float(x) => literal(TypeId::UNTYPED_FLOAT, Value::Float(*x), span),
        ast::ExprKind::Rune(r) => literal(TypeId::UNTYPED_RUNE, Value::Rune(*r), span),
        ast::ExprKind::Str(s) => literal(TypeId::UNTYPED_STRING, Value::String(s.clone()), span),
        ast::ExprKind::Identifier(name) => check_identifier(ck, name, span),
        ast::ExprKind::TypeLiteral(spec) => {
            let ty = super::statements::resolve_spec(ck, spec);
            TypedExpr::new(TypedExprKind::TypeRef(ty), ExpressionValue::type_ref(ty), span)
        }
        ast::ExprKind::Select { base, name } => check_select(ck, base, name, span),
        ast::ExprKind::Index { base, index } => check_index(ck, base, index, span),
        ast::ExprKind::SliceExpr { base, lo, hi, max } => {
            check_slice(ck, base, lo.as_deref(), hi.as_deref(), max.as_deref(), span)
        }
        ast::ExprKind::Call { callee, args } => check_call(ck, callee, args, span),
        ast::ExprKind::AddressOf(operand) => check_address_of(ck, operand, span),
        ast::ExprKind::Deref(operand) => check_deref(ck, operand, span),
        ast::ExprKind::Unary { op, operand } => check_unary(ck, *op, operand, span),
        ast::ExprKind::Binary { op, left, right } => check_binary(ck, *op, left, right, span),
    }
}

fn literal(ty: TypeId, value: Value, span: Span) -> TypedExpr {
    TypedExpr::new(TypedExprKind::Literal, ExpressionValue::value(ty, Some(value)), span)
}

fn error_expr(span: Span) -> TypedExpr {
    TypedExpr::error(span)
}

fn check_identifier(ck: &mut Checker, name: &str, span: Span) -> TypedExpr {
    let Some(sym) = ck.scopes.find(name) else {
        ck.reporter.report(CompileError::new(
            ErrorCode::Undefined,
            span,
            format!("'{}' is not defined", name),
        ));
        return error_expr(span);
    };
    match ck.ctx.symbols.get(sym).kind.clone() {
        SymbolKind::Constant { ty, value } => TypedExpr::new(
            TypedExprKind::Literal,
            ExpressionValue::value(ty, Some(value)),
            span,
        ),
        SymbolKind::Variable {
            ty,
            intrinsic,
            indirection,
        } => TypedExpr::new(
            TypedExprKind::Variable(sym),
            ExpressionValue::variable(ty, intrinsic, indirection),
            span,
        ),
        SymbolKind::Parameter {
            kind,
            ty,
            intrinsic,
            indirection,
        } => {
            let access = if matches!(
                kind,
                ParameterKind::Receiver | ParameterKind::ReceiverDuplicate
            ) {
                ReceiverAccess::Read
            } else {
                ReceiverAccess::None
            };
            TypedExpr::new(
                TypedExprKind::Variable(sym),
                ExpressionValue::variable(ty, intrinsic, indirection).with_access(access),
                span,
            )
        }
        SymbolKind::Type(ty) => {
            TypedExpr::new(TypedExprKind::TypeRef(ty), ExpressionValue::type_ref(ty), span)
        }
        SymbolKind::Hidden => {
            ck.reporter.report(CompileError::new(
                ErrorCode::Hidden,
                span,
                format!("'{}' is hidden in this context", name),
            ));
            error_expr(span)
        }
        SymbolKind::Function(_) | SymbolKind::Template(_) => {
            // Functions and templates are resolved by the call checker; as
            // bare values they denote nothing.
            ck.reporter.report(CompileError::new(
                ErrorCode::RequiresValueOrVariable,
                span,
                format!("'{}' must be called", name),
            ));
            error_expr(span)
        }
        SymbolKind::Instance(_) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::RequiresValueOrVariable,
                span,
                format!("instance '{}' cannot be used in an expression", name),
            ));
            error_expr(span)
        }
        SymbolKind::Undefined(_) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::Undefined,
                span,
                format!("'{}' is not defined", name),
            ));
            error_expr(span)
        }
    }
}

fn check_select(ck: &mut Checker, base: &ast::Expr, name: &str, span: Span) -> TypedExpr {
    let b = check_expr(ck, base);
    if b.is_error() {
        return error_expr(span);
    }
    if b.eval.kind == ExpressionKind::Type {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            "cannot select on a type".to_string(),
        ));
        return error_expr(span);
    }
    match ck.ctx.types.select_member(b.eval.ty, name) {
        Some(Member::Field { offset, ty, .. }) => Some(field_select(ck, b, name, offset, ty, span)),
        Some(_) => {
            // Member callables are meaningful only as callees; the call
            // checker intercepts them before this point.
            ck.reporter.report(CompileError::new(
                ErrorCode::RequiresValueOrVariable,
                span,
                format!("'{}' must be called", name),
            ));
            None
        }
        None => {
            ck.reporter.report(CompileError::new(
                ErrorCode::Undefined,
                span,
                format!(
                    "{} has no field or method '{}'",
                    ck.ctx.types.type_string(b.eval.ty),
                    name
                ),
            ));
            None
        }
    }
    .unwrap_or_else(|| error_expr(span))
}

fn field_select(
    ck: &mut Checker,
    base: TypedExpr,
    name: &str,
    offset: usize,
    ty: TypeId,
    span: Span,
) -> TypedExpr {
    let through_pointer = matches!(
        ck.ctx.types.underlying_kind(base.eval.ty),
        TypeKind::Pointer { .. }
    );
    let intrinsic = if through_pointer {
        base.eval.indirection
    } else {
        base.eval.intrinsic
    };
    let kind = if through_pointer || base.eval.kind == ExpressionKind::Variable {
        ExpressionKind::Variable
    } else {
        ExpressionKind::Value
    };
    let eval = ExpressionValue {
        kind,
        ty,
        value: None,
        intrinsic,
        indirection: base.eval.indirection,
        receiver_access: base.eval.receiver_access,
    };
    TypedExpr::new(
        TypedExprKind::FieldSelect {
            base: Box::new(base),
            offset,
            name: name.to_string(),
        },
        eval,
        span,
    )
}

fn check_index(ck: &mut Checker, base: &ast::Expr, index: &ast::Expr, span: Span) -> TypedExpr {
    let base_checked = check_expr(ck, base);
    let b = auto_deref_array(ck, base_checked);
    let idx = check_expr(ck, index);
    if b.is_error() || idx.is_error() {
        return error_expr(span);
    }

    let (element, dimension, behind_pointer) = match ck.ctx.types.underlying_kind(b.eval.ty) {
        TypeKind::Array { dimension, base } => (*base, Some(*dimension), false),
        TypeKind::Slice { base } => (*base, None, true),
        _ => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!("cannot index {}", ck.ctx.types.type_string(b.eval.ty)),
            ));
            return error_expr(span);
        }
    };

    let Some(idx) = index_operand(ck, idx) else {
        return error_expr(span);
    };
    if let Some(value) = idx.eval.value.as_ref().and_then(|v| v.as_i128()) {
        let out_of_range = value < 0 || dimension.is_some_and(|d| value >= d as i128);
        if out_of_range {
            ck.reporter.report(CompileError::new(
                ErrorCode::IndexOutOfRange,
                span,
                format!("index {} is out of range", value),
            ));
            return error_expr(span);
        }
    }

    let intrinsic = if behind_pointer {
        b.eval.indirection
    } else {
        b.eval.intrinsic
    };
    let kind = if behind_pointer || b.eval.kind == ExpressionKind::Variable {
        ExpressionKind::Variable
    } else {
        ExpressionKind::Value
    };
    let eval = ExpressionValue {
        kind,
        ty: element,
        value: None,
        intrinsic,
        indirection: b.eval.indirection,
        receiver_access: b.eval.receiver_access.lub(idx.eval.receiver_access),
    };
    TypedExpr::new(
        TypedExprKind::Index {
            base: Box::new(b),
            index: Box::new(idx),
        },
        eval,
        span,
    )
}

/// Insert an implicit dereference when indexing or slicing through a
/// pointer to an array.
fn auto_deref_array(ck: &mut Checker, base: TypedExpr) -> TypedExpr {
    if base.is_error() {
        return base;
    }
    if let TypeKind::Pointer { base: pointee } = ck.ctx.types.underlying_kind(base.eval.ty) {
        if matches!(ck.ctx.types.underlying_kind(*pointee), TypeKind::Array { .. }) {
            let span = base.span;
            let eval = ExpressionValue {
                kind: ExpressionKind::Variable,
                ty: *pointee,
                value: None,
                intrinsic: base.eval.indirection,
                indirection: base.eval.indirection,
                receiver_access: base.eval.receiver_access,
            };
            return TypedExpr::new(TypedExprKind::Dereference(Box::new(base)), eval, span);
        }
    }
    base
}

/// An index operand must be an integer; untyped constants convert to `int`.
fn index_operand(ck: &mut Checker, idx: TypedExpr) -> Option<TypedExpr> {
    if !idx.eval.is_value_or_variable() {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            idx.span,
            "index must be a value".to_string(),
        ));
        return None;
    }
    if !ck.ctx.types.is_integral(idx.eval.ty) {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            idx.span,
            format!(
                "cannot use {} as an index",
                ck.ctx.types.type_string(idx.eval.ty)
            ),
        ));
        return None;
    }
    if ck.ctx.types.is_untyped(idx.eval.ty) {
        return Some(implicit_convert(
            ck,
            idx,
            TypeId::INT,
            ErrorCode::NotRepresentable,
        ));
    }
    Some(idx)
}

fn check_slice(
    ck: &mut Checker,
    base: &ast::Expr,
    lo: Option<&ast::Expr>,
    hi: Option<&ast::Expr>,
    max: Option<&ast::Expr>,
    span: Span,
) -> TypedExpr {
    let base_checked = check_expr(ck, base);
    let b = auto_deref_array(ck, base_checked);
    if b.is_error() {
        return error_expr(span);
    }
    let (element, capacity) = match ck.ctx.types.underlying_kind(b.eval.ty) {
        TypeKind::Array { dimension, base } => {
            if b.eval.kind != ExpressionKind::Variable {
                ck.reporter.report(CompileError::new(
                    ErrorCode::RequiresValueOrVariable,
                    span,
                    "sliced array must be addressable".to_string(),
                ));
                return error_expr(span);
            }
            (*base, Some(*dimension))
        }
        TypeKind::Slice { base } => (*base, None),
        _ => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!("cannot slice {}", ck.ctx.types.type_string(b.eval.ty)),
            ));
            return error_expr(span);
        }
    };

    let mut bounds = Vec::new();
    let mut operands = Vec::new();
    for bound in [lo, hi, max] {
        match bound {
            Some(expr) => {
                let typed = check_expr(ck, expr);
                if typed.is_error() {
                    return error_expr(span);
                }
                let Some(typed) = index_operand(ck, typed) else {
                    return error_expr(span);
                };
                bounds.push(typed.eval.value.as_ref().and_then(|v| v.as_i128()));
                operands.push(Some(typed));
            }
            None => {
                bounds.push(None);
                operands.push(None);
            }
        }
    }

    // Constant bound checking: 0 <= lo <= hi <= max <= cap.
    let lo_b = bounds[0].or(Some(0));
    let hi_b = bounds[1].or(capacity.map(|c| c as i128));
    let max_b = bounds[2].or(capacity.map(|c| c as i128));
    let cap_b = capacity.map(|c| c as i128);
    let ordered = [lo_b, hi_b, max_b, cap_b];
    let mut violation = ordered.iter().flatten().any(|&b| b < 0);
    for i in 0..3 {
        if let (Some(a), Some(b)) = (ordered[i], ordered[i + 1]) {
            if a > b {
                violation = true;
            }
        }
    }
    if violation {
        ck.reporter.report(CompileError::new(
            ErrorCode::SliceOutOfRange,
            span,
            "slice bounds out of range".to_string(),
        ));
        return error_expr(span);
    }

    let mut access = b.eval.receiver_access;
    for op in operands.iter().flatten() {
        access = access.lub(op.eval.receiver_access);
    }
    let slice_ty = ck.ctx.types.slice_of(element);
    let eval = ExpressionValue {
        kind: ExpressionKind::Value,
        ty: slice_ty,
        value: None,
        intrinsic: Mutability::Immutable,
        indirection: b.eval.indirection,
        receiver_access: access,
    };
    let mut it = operands.into_iter();
    TypedExpr::new(
        TypedExprKind::SliceExpr {
            base: Box::new(b),
            lo: it.next().flatten().map(Box::new),
            hi: it.next().flatten().map(Box::new),
            max: it.next().flatten().map(Box::new),
        },
        eval,
        span,
    )
}

fn check_address_of(ck: &mut Checker, operand: &ast::Expr, span: Span) -> TypedExpr {
    let o = check_expr(ck, operand);
    if o.is_error() {
        return error_expr(span);
    }
    if o.eval.kind != ExpressionKind::Variable {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            "cannot take the address of this expression".to_string(),
        ));
        return error_expr(span);
    }
    let ty = ck.ctx.types.pointer_to(o.eval.ty);
    let eval = ExpressionValue {
        kind: ExpressionKind::Value,
        ty,
        value: None,
        intrinsic: Mutability::Immutable,
        // Taking an address promotes the indirection to the target's
        // intrinsic mutability.
        indirection: o.eval.intrinsic,
        receiver_access: o.eval.receiver_access,
    };
    TypedExpr::new(TypedExprKind::AddressOf(Box::new(o)), eval, span)
}

fn check_deref(ck: &mut Checker, operand: &ast::Expr, span: Span) -> TypedExpr {
    let o = check_expr(ck, operand);
    if o.is_error() {
        return error_expr(span);
    }
    let TypeKind::Pointer { base } = ck.ctx.types.underlying_kind(o.eval.ty) else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'*' cannot be applied to {}",
                ck.ctx.types.type_string(o.eval.ty)
            ),
        ));
        return error_expr(span);
    };
    let eval = ExpressionValue {
        kind: ExpressionKind::Variable,
        ty: *base,
        value: None,
        intrinsic: o.eval.indirection,
        indirection: o.eval.indirection,
        receiver_access: o.eval.receiver_access,
    };
    TypedExpr::new(TypedExprKind::Dereference(Box::new(o)), eval, span)
}

fn check_unary(ck: &mut Checker, op: UnaryOp, operand: &ast::Expr, span: Span) -> TypedExpr {
    let o = check_expr(ck, operand);
    if o.is_error() {
        return error_expr(span);
    }
    if !o.eval.is_value_or_variable() {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            format!("'{}' requires a value", op.symbol()),
        ));
        return error_expr(span);
    }

    let ty = o.eval.ty;
    let legal = match op {
        UnaryOp::Not => ck.ctx.types.is_logical(ty),
        UnaryOp::Complement => ck.ctx.types.is_integral(ty),
        UnaryOp::Neg | UnaryOp::Pos => ck.ctx.types.is_numeric(ty),
    };
    if !legal {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'{}' cannot be applied to {}",
                op.symbol(),
                ck.ctx.types.type_string(ty)
            ),
        ));
        return error_expr(span);
    }

    let value = o.eval.value.as_ref().and_then(|v| match op {
        UnaryOp::Not => v.as_bool().map(|b| {
            if ck.ctx.types.is_untyped(ty) {
                Value::Boolean(!b)
            } else {
                Value::Bool(!b)
            }
        }),
        UnaryOp::Complement => value::complement(&ck.ctx.types, ty, v),
        UnaryOp::Neg => value::negate(&ck.ctx.types, ty, v),
        UnaryOp::Pos => Some(v.clone()),
    });

    let eval = ExpressionValue {
        kind: ExpressionKind::Value,
        ty,
        value,
        intrinsic: Mutability::Immutable,
        indirection: Mutability::Immutable,
        receiver_access: o.eval.receiver_access,
    };
    TypedExpr::new(
        TypedExprKind::Unary {
            op,
            operand: Box::new(o),
        },
        eval,
        span,
    )
}

/// Outcome of merging two operand types.
enum Merge {
    Ok(TypeId, TypedExpr, TypedExpr),
    Fail(TypedExpr, TypedExpr),
    FailReported,
}

/// Merge two operand types: identical types merge to themselves; an untyped
/// operand converts to the other side's typed type when its value is
/// representable; two untyped operands widen to the larger kind.
fn merge_operands(ck: &mut Checker, left: TypedExpr, right: TypedExpr) -> Merge {
    let t1 = left.eval.ty;
    let t2 = right.eval.ty;
    if ck.ctx.types.identical(t1, t2) {
        return Merge::Ok(t1, left, right);
    }
    let u1 = ck.ctx.types.is_untyped(t1);
    let u2 = ck.ctx.types.is_untyped(t2);
    match (u1, u2) {
        (true, true) => {
            let (Some(r1), Some(r2)) = (
                value::untyped_rank(&ck.ctx.types, t1),
                value::untyped_rank(&ck.ctx.types, t2),
            ) else {
                return Merge::Fail(left, right);
            };
            // Numeric kinds widen among themselves; booleans and strings
            // merge only with their own kind (handled by `identical`).
            let numeric = (1..=4).contains(&r1) && (1..=4).contains(&r2);
            if !numeric {
                return Merge::Fail(left, right);
            }
            let wide = if r1 >= r2 { t1 } else { t2 };
            match (
                retype_untyped(ck, left, wide),
                retype_untyped(ck, right, wide),
            ) {
                (Some(l), Some(r)) => Merge::Ok(wide, l, r),
                _ => Merge::FailReported,
            }
        }
        (true, false) => match convert_untyped_to(ck, left, t2) {
            Some(l) => Merge::Ok(t2, l, right),
            None => Merge::FailReported,
        },
        (false, true) => match convert_untyped_to(ck, right, t1) {
            Some(r) => Merge::Ok(t1, left, r),
            None => Merge::FailReported,
        },
        (false, false) => Merge::Fail(left, right),
    }
}

/// Widen an untyped constant to a wider untyped kind.
fn retype_untyped(ck: &mut Checker, mut expr: TypedExpr, wide: TypeId) -> Option<TypedExpr> {
    let Some(v) = expr.eval.value.as_ref() else {
        return Some(expr);
    };
    match value::convert(&ck.ctx.types, v, wide) {
        Some(converted) => {
            expr.eval.ty = wide;
            expr.eval.value = Some(converted);
            Some(expr)
        }
        None => {
            ck.reporter.report(CompileError::new(
                ErrorCode::NotRepresentable,
                expr.span,
                "constant is not representable in the merged type".to_string(),
            ));
            None
        }
    }
}

/// Convert an untyped operand to a typed type, reporting when the constant
/// value is not representable.
fn convert_untyped_to(ck: &mut Checker, mut expr: TypedExpr, target: TypeId) -> Option<TypedExpr> {
    let Some(v) = expr.eval.value.clone() else {
        ck.reporter.report(CompileError::new(
            ErrorCode::NotRepresentable,
            expr.span,
            "untyped operand has no constant value".to_string(),
        ));
        return None;
    };
    match value::convert(&ck.ctx.types, &v, target) {
        Some(converted) => {
            expr.eval.ty = target;
            expr.eval.value = Some(converted);
            Some(expr)
        }
        None => {
            ck.reporter.report(CompileError::new(
                ErrorCode::NotRepresentable,
                expr.span,
                format!(
                    "constant is not representable as {}",
                    ck.ctx.types.type_string(target)
                ),
            ));
            None
        }
    }
}

fn check_binary(
    ck: &mut Checker,
    op: BinaryOp,
    left: &ast::Expr,
    right: &ast::Expr,
    span: Span,
) -> TypedExpr {
    let l = check_expr(ck, left);
    let r = check_expr(ck, right);
    if l.is_error() || r.is_error() {
        return error_expr(span);
    }
    if !l.eval.is_value_or_variable() || !r.eval.is_value_or_variable() {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            format!("'{}' requires values", op.symbol()),
        ));
        return error_expr(span);
    }

    if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
        return check_shift(ck, op, l, r, span);
    }

    let (ty, l, r) = match merge_operands(ck, l, r) {
        Merge::Ok(ty, l, r) => (ty, l, r),
        Merge::Fail(l, r) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!(
                    "'{}' cannot be applied to {} and {}",
                    op.symbol(),
                    ck.ctx.types.type_string(l.eval.ty),
                    ck.ctx.types.type_string(r.eval.ty)
                ),
            ));
            return error_expr(span);
        }
        Merge::FailReported => return error_expr(span),
    };

    let types = &ck.ctx.types;
    let legal = match op {
        BinaryOp::Add => types.is_numeric(ty) || types.is_string_type(ty),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => types.is_numeric(ty),
        BinaryOp::Rem
        | BinaryOp::BitAnd
        | BinaryOp::BitOr
        | BinaryOp::BitXor
        | BinaryOp::AndNot => types.is_integral(ty),
        BinaryOp::Eq | BinaryOp::Ne => types.is_comparable(ty),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => types.is_orderable(ty),
        BinaryOp::LogicAnd | BinaryOp::LogicOr => types.is_logical(ty),
        BinaryOp::Shl | BinaryOp::Shr => unreachable!("shifts handled above"),
    };
    if !legal {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'{}' cannot be applied to {}",
                op.symbol(),
                ck.ctx.types.type_string(ty)
            ),
        ));
        return error_expr(span);
    }

    // Constant division by zero can never be folded or executed.
    if matches!(op, BinaryOp::Div | BinaryOp::Rem)
        && r.eval.value.as_ref().is_some_and(|v| v.is_zero())
    {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            "division by zero".to_string(),
        ));
        return error_expr(span);
    }

    let result_ty = match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => {
            if ck.ctx.types.is_untyped(ty) {
                TypeId::UNTYPED_BOOLEAN
            } else {
                TypeId::BOOL
            }
        }
        _ => ty,
    };

    let value = fold_binary(ck, op, ty, result_ty, &l, &r);
    let access = l.eval.receiver_access.lub(r.eval.receiver_access);
    let eval = ExpressionValue {
        kind: ExpressionKind::Value,
        ty: result_ty,
        value,
        intrinsic: Mutability::Immutable,
        indirection: Mutability::Immutable,
        receiver_access: access,
    };
    TypedExpr::new(
        TypedExprKind::Binary {
            op,
            left: Box::new(l),
            right: Box::new(r),
        },
        eval,
        span,
    )
}

fn fold_binary(
    ck: &Checker,
    op: BinaryOp,
    ty: TypeId,
    result_ty: TypeId,
    l: &TypedExpr,
    r: &TypedExpr,
) -> Option<Value> {
    let bool_value = |b: bool| {
        if result_ty == TypeId::UNTYPED_BOOLEAN {
            Value::Boolean(b)
        } else {
            Value::Bool(b)
        }
    };

    // Short-circuit folding for the logical operators.
    if matches!(op, BinaryOp::LogicAnd | BinaryOp::LogicOr) {
        let lv = l.eval.value.as_ref()?.as_bool()?;
        let short = match op {
            BinaryOp::LogicAnd => !lv,
            _ => lv,
        };
        if short {
            return Some(bool_value(lv));
        }
        let rv = r.eval.value.as_ref()?.as_bool()?;
        return Some(bool_value(rv));
    }

    let a = l.eval.value.as_ref()?;
    let b = r.eval.value.as_ref()?;
    match op {
        BinaryOp::Eq => value::values_equal(a, b).map(bool_value),
        BinaryOp::Ne => value::values_equal(a, b).map(|v| bool_value(!v)),
        BinaryOp::Lt => value::values_less(a, b).map(bool_value),
        BinaryOp::Ge => value::values_less(a, b).map(|v| bool_value(!v)),
        BinaryOp::Gt => value::values_less(b, a).map(bool_value),
        BinaryOp::Le => value::values_less(b, a).map(|v| bool_value(!v)),
        BinaryOp::Add => value::arith(&ck.ctx.types, ArithOp::Add, ty, a, b),
        BinaryOp::Sub => value::arith(&ck.ctx.types, ArithOp::Sub, ty, a, b),
        BinaryOp::Mul => value::arith(&ck.ctx.types, ArithOp::Mul, ty, a, b),
        BinaryOp::Div => value::arith(&ck.ctx.types, ArithOp::Div, ty, a, b),
        BinaryOp::Rem => value::arith(&ck.ctx.types, ArithOp::Rem, ty, a, b),
        BinaryOp::BitAnd => value::arith(&ck.ctx.types, ArithOp::BitAnd, ty, a, b),
        BinaryOp::BitOr => value::arith(&ck.ctx.types, ArithOp::BitOr, ty, a, b),
        BinaryOp::BitXor => value::arith(&ck.ctx.types, ArithOp::BitXor, ty, a, b),
        BinaryOp::AndNot => value::arith(&ck.ctx.types, ArithOp::AndNot, ty, a, b),
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::LogicAnd | BinaryOp::LogicOr => None,
    }
}

/// `<<` and `>>`: integral left operand, unsigned right operand; the result
/// has the left operand's type.
fn check_shift(
    ck: &mut Checker,
    op: BinaryOp,
    l: TypedExpr,
    r: TypedExpr,
    span: Span,
) -> TypedExpr {
    if !ck.ctx.types.is_integral(l.eval.ty) {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'{}' cannot be applied to {}",
                op.symbol(),
                ck.ctx.types.type_string(l.eval.ty)
            ),
        ));
        return error_expr(span);
    }

    if !ck.ctx.types.is_integral(r.eval.ty) {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "shift count cannot be {}",
                ck.ctx.types.type_string(r.eval.ty)
            ),
        ));
        return error_expr(span);
    }

    let shift_count = match r.eval.value.as_ref() {
        Some(v) => match v.as_i128() {
            Some(n) if (0..=u32::MAX as i128).contains(&n) => Some(n as u32),
            _ => {
                // A negative (or enormous) constant shift count can never be
                // represented as an unsigned count.
                ck.reporter.report(CompileError::new(
                    ErrorCode::NotRepresentable,
                    r.span,
                    "shift count is not representable as an unsigned integer".to_string(),
                ));
                return error_expr(span);
            }
        },
        None => {
            if !ck.ctx.types.is_unsigned(r.eval.ty) {
                ck.reporter.report(CompileError::new(
                    ErrorCode::CannotBeApplied,
                    span,
                    "shift count must be unsigned".to_string(),
                ));
                return error_expr(span);
            }
            None
        }
    };

    // An untyped left operand shifted by a non-constant count takes its
    // default type; the result can no longer be a constant.
    let l = if shift_count.is_none() && ck.ctx.types.is_untyped(l.eval.ty) {
        let default = ck.ctx.types.default_type(l.eval.ty);
        match convert_untyped_to(ck, l, default) {
            Some(l) => l,
            None => return error_expr(span),
        }
    } else {
        l
    };

    let ty = l.eval.ty;
    let value = match (l.eval.value.as_ref(), shift_count) {
        (Some(v), Some(count)) => value::shift(&ck.ctx.types, op == BinaryOp::Shl, ty, v, count),
        _ => None,
    };
    let access = l.eval.receiver_access.lub(r.eval.receiver_access);
    let eval = ExpressionValue {
        kind: ExpressionKind::Value,
        ty,
        value,
        intrinsic: Mutability::Immutable,
        indirection: Mutability::Immutable,
        receiver_access: access,
    };
    TypedExpr::new(
        TypedExprKind::Binary {
            op,
            left: Box::new(l),
            right: Box::new(r),
        },
        eval,
        span,
    )
}

/// Implicitly convert `expr` to `target`, reporting with `code` on failure.
pub fn implicit_convert(
    ck: &mut Checker,
    expr: TypedExpr,
    target: TypeId,
    code: ErrorCode,
) -> TypedExpr {
    if expr.is_error() {
        return expr;
    }
    let span = expr.span;
    if !expr.eval.is_value_or_variable() {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            "a value is required here".to_string(),
        ));
        return error_expr(span);
    }
    if ck.ctx.types.identical(expr.eval.ty, target) {
        return expr;
    }
    if ck.ctx.types.is_untyped(expr.eval.ty) {
        return match convert_untyped_to(ck, expr, target) {
            Some(e) => e,
            None => error_expr(span),
        };
    }
    if ck.ctx.types.assignable(target, expr.eval.ty) {
        let value = expr
            .eval
            .value
            .as_ref()
            .and_then(|v| value::convert_wrapping(&ck.ctx.types, v, target));
        let eval = ExpressionValue {
            kind: ExpressionKind::Value,
            ty: target,
            value,
            intrinsic: Mutability::Immutable,
            indirection: expr.eval.indirection,
            receiver_access: expr.eval.receiver_access,
        };
        return TypedExpr::new(TypedExprKind::Conversion(Box::new(expr)), eval, span);
    }
    ck.reporter.report(CompileError::new(
        code,
        span,
        format!(
            "cannot use {} as {}",
            ck.ctx.types.type_string(expr.eval.ty),
            ck.ctx.types.type_string(target)
        ),
    ));
    error_expr(span)
}

/// Explicit conversion `T(x)`.
fn check_conversion(
    ck: &mut Checker,
    target: TypeId,
    args: &[ast::Expr],
    span: Span,
) -> TypedExpr {
    if args.len() != 1 {
        ck.reporter.report(CompileError::new(
            ErrorCode::FuncExpectsCount,
            span,
            format!("conversion expects 1 argument, given {}", args.len()),
        ));
        return error_expr(span);
    }
    let arg = check_expr(ck, &args[0]);
    if arg.is_error() {
        return error_expr(span);
    }
    if !arg.eval.is_value_or_variable() {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            "conversion requires a value".to_string(),
        ));
        return error_expr(span);
    }

    if ck.ctx.types.is_untyped(arg.eval.ty) {
        return match convert_untyped_to(ck, arg, target) {
            Some(mut e) => {
                e.eval.kind = ExpressionKind::Value;
                e
            }
            None => error_expr(span),
        };
    }

    if !ck.ctx.types.convertible(target, arg.eval.ty) {
        ck.reporter.report(CompileError::new(
            ErrorCode::NotConvertible,
            span,
            format!(
                "cannot convert {} to {}",
                ck.ctx.types.type_string(arg.eval.ty),
                ck.ctx.types.type_string(target)
            ),
        ));
        return error_expr(span);
    }
    let value = arg
        .eval
        .value
        .as_ref()
        .and_then(|v| value::convert_wrapping(&ck.ctx.types, v, target));
    let access = arg.eval.receiver_access;
    let eval = ExpressionValue {
        kind: ExpressionKind::Value,
        ty: target,
        value,
        intrinsic: Mutability::Immutable,
        indirection: arg.eval.indirection,
        receiver_access: access,
    };
    TypedExpr::new(TypedExprKind::Conversion(Box::new(arg)), eval, span)
}

/// Check the argument list of a call against a parameter list.
///
/// Applies implicit conversions and the pointer-leak rules. Returns `None`
/// when any argument failed (errors already reported).
pub fn check_arguments(
    ck: &mut Checker,
    callee_name: &str,
    params: &[Parameter],
    args: &[ast::Expr],
    span: Span,
) -> Option<Vec<TypedExpr>> {
    let typed: Vec<TypedExpr> = args.iter().map(|a| check_expr(ck, a)).collect();
    if typed.iter().any(|t| t.is_error()) {
        return None;
    }
    if typed.len() != params.len() {
        ck.reporter.report(CompileError::new(
            ErrorCode::FuncExpectsCount,
            span,
            format!(
                "'{}' expects {} arguments, given {}",
                callee_name,
                params.len(),
                typed.len()
            ),
        ));
        return None;
    }

    let mut out = Vec::with_capacity(typed.len());
    let mut ok = true;
    for (arg, param) in typed.into_iter().zip(params) {
        if !arg.eval.is_value_or_variable() {
            ck.reporter.report(CompileError::new(
                ErrorCode::RequiresValueOrVariable,
                arg.span,
                "argument must be a value".to_string(),
            ));
            ok = false;
            continue;
        }
        let arg_span = arg.span;
        let arg_indirection = arg.eval.indirection;
        let arg_access = arg.eval.receiver_access;
        let converted = implicit_convert(ck, arg, param.ty, ErrorCode::FuncExpectsArg);
        if converted.is_error() {
            ok = false;
            continue;
        }
        if ck.ctx.types.contains_pointer(param.ty) {
            // No mutable pointer may be acquired through a less-mutable
            // argument, and component state may not escape mutably.
            let leaks = param.indirection > arg_indirection
                || (arg_access != ReceiverAccess::None && param.indirection == Mutability::Mutable);
            if leaks {
                ck.reporter.report(CompileError::new(
                    ErrorCode::LeaksPointers,
                    arg_span,
                    format!("argument to '{}' leaks mutable pointers", callee_name),
                ));
                ok = false;
                continue;
            }
        }
        out.push(converted);
    }
    ok.then_some(out)
}

/// Adjust a receiver expression to the pointer the callable expects: a
/// variable of the named type gets an implicit address-of; a pointer is used
/// as is.
fn adjust_receiver(
    ck: &mut Checker,
    base: TypedExpr,
    require_mutable: bool,
    span: Span,
) -> Option<TypedExpr> {
    let is_pointer = matches!(
        ck.ctx.types.underlying_kind(base.eval.ty),
        TypeKind::Pointer { .. }
    );
    if is_pointer {
        if require_mutable && base.eval.indirection != Mutability::Mutable {
            ck.reporter.report(CompileError::new(
                ErrorCode::TargetNotMutable,
                span,
                "receiver is not mutable".to_string(),
            ));
            return None;
        }
        return Some(base);
    }
    if base.eval.kind != ExpressionKind::Variable {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            "receiver must be addressable".to_string(),
        ));
        return None;
    }
    if require_mutable && base.eval.intrinsic != Mutability::Mutable {
        ck.reporter.report(CompileError::new(
            ErrorCode::TargetNotMutable,
            span,
            "receiver is not mutable".to_string(),
        ));
        return None;
    }
    let ty = ck.ctx.types.pointer_to(base.eval.ty);
    let eval = ExpressionValue {
        kind: ExpressionKind::Value,
        ty,
        value: None,
        intrinsic: Mutability::Immutable,
        indirection: base.eval.intrinsic,
        receiver_access: base.eval.receiver_access,
    };
    let span = base.span;
    Some(TypedExpr::new(
        TypedExprKind::AddressOf(Box::new(base)),
        eval,
        span,
    ))
}

fn check_call(
    ck: &mut Checker,
    callee: &ast::Expr,
    args: &[ast::Expr],
    span: Span,
) -> TypedExpr {
    // Identifier callees may denote templates, functions, or types.
    if let ast::ExprKind::Identifier(name) = &callee.kind {
        if let Some(sym) = ck.scopes.find(name) {
            match ck.ctx.symbols.get(sym).kind.clone() {
                SymbolKind::Template(kind) => {
                    return builtins::check_template(ck, kind, args, span);
                }
                SymbolKind::Function(fid) => {
                    let (params, ret) = {
                        let f = ck.ctx.decls.function(fid);
                        match ck.ctx.types.kind(f.ty) {
                            TypeKind::Function(ft) => {
                                (ft.parameters.clone(), ft.return_type)
                            }
                            _ => return error_expr(span),
                        }
                    };
                    let Some(typed_args) = check_arguments(ck, name, &params, args, span) else {
                        return error_expr(span);
                    };
                    let access = args_access(&typed_args);
                    return TypedExpr::new(
                        TypedExprKind::Call {
                            callee: Callee::Function(fid),
                            args: typed_args,
                        },
                        ExpressionValue::value(ret, None).with_access(access),
                        span,
                    );
                }
                SymbolKind::Type(ty) => {
                    return check_conversion(ck, ty, args, span);
                }
                _ => {}
            }
        }
    }

    // Selector callees may denote member callables or port fields.
    if let ast::ExprKind::Select { base, name } = &callee.kind {
        return check_member_call(ck, base, name, args, span);
    }

    // Anything else must evaluate to a type (conversion).
    let c = check_expr(ck, callee);
    if c.is_error() {
        return error_expr(span);
    }
    if c.eval.kind == ExpressionKind::Type {
        return check_conversion(ck, c.eval.ty, args, span);
    }
    ck.reporter.report(CompileError::new(
        ErrorCode::NotCallable,
        span,
        "expression is not callable".to_string(),
    ));
    error_expr(span)
}

fn args_access(args: &[TypedExpr]) -> ReceiverAccess {
    args.iter()
        .fold(ReceiverAccess::None, |acc, a| acc.lub(a.eval.receiver_access))
}

fn check_member_call(
    ck: &mut Checker,
    base: &ast::Expr,
    name: &str,
    args: &[ast::Expr],
    span: Span,
) -> TypedExpr {
    let b = check_expr(ck, base);
    if b.is_error() {
        return error_expr(span);
    }
    if b.eval.kind == ExpressionKind::Type {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            "cannot select on a type".to_string(),
        ));
        return error_expr(span);
    }

    match ck.ctx.types.select_member(b.eval.ty, name) {
        Some(Member::Method(mid)) => {
            let (params, ret) = {
                let m = ck.ctx.decls.method(mid);
                match ck.ctx.types.kind(m.ty) {
                    TypeKind::Method(mt) => (mt.parameters.clone(), mt.return_type),
                    _ => return error_expr(span),
                }
            };
            let Some(receiver) = adjust_receiver(ck, b, true, span) else {
                return error_expr(span);
            };
            let Some(typed_args) = check_arguments(ck, name, &params, args, span) else {
                return error_expr(span);
            };
            let access = args_access(&typed_args).lub(receiver.eval.receiver_access);
            TypedExpr::new(
                TypedExprKind::Call {
                    callee: Callee::Method {
                        id: mid,
                        receiver: Box::new(receiver),
                    },
                    args: typed_args,
                },
                ExpressionValue::value(ret, None).with_access(access),
                span,
            )
        }
        Some(Member::Initializer(iid)) => {
            if ck.callable.kind != CallableKind::Initializer {
                ck.reporter.report(CompileError::new(
                    ErrorCode::InitializerNotInInitializer,
                    span,
                    "initializers may only be called from initializers".to_string(),
                ));
                return error_expr(span);
            }
            let params = {
                let i = ck.ctx.decls.initializer(iid);
                match ck.ctx.types.kind(i.ty) {
                    TypeKind::Method(mt) => mt.parameters.clone(),
                    _ => return error_expr(span),
                }
            };
            let Some(receiver) = adjust_receiver(ck, b, true, span) else {
                return error_expr(span);
            };
            let Some(typed_args) = check_arguments(ck, name, &params, args, span) else {
                return error_expr(span);
            };
            let access = args_access(&typed_args).lub(receiver.eval.receiver_access);
            TypedExpr::new(
                TypedExprKind::Call {
                    callee: Callee::Initializer {
                        id: iid,
                        receiver: Box::new(receiver),
                    },
                    args: typed_args,
                },
                ExpressionValue::value(TypeId::VOID, None).with_access(access),
                span,
            )
        }
        Some(Member::Getter(gid)) => {
            let legal_context = ck.callable.is_read_context()
                || ck.callable.kind == CallableKind::Initializer;
            if !legal_context {
                ck.reporter.report(CompileError::new(
                    ErrorCode::GetterNotInReadContext,
                    span,
                    "getters may only be called from a getter, an action, a reaction, or an initializer"
                        .to_string(),
                ));
                return error_expr(span);
            }
            if ck.callable.in_mutable_phase {
                ck.reporter.report(CompileError::new(
                    ErrorCode::CallInMutableSection,
                    span,
                    "cannot call a getter in the mutable phase of an activation".to_string(),
                ));
                return error_expr(span);
            }
            let (params, ret) = {
                let g = ck.ctx.decls.getter(gid);
                match ck.ctx.types.kind(g.ty) {
                    TypeKind::Method(mt) => (mt.parameters.clone(), mt.return_type),
                    _ => return error_expr(span),
                }
            };
            let Some(receiver) = adjust_receiver(ck, b, false, span) else {
                return error_expr(span);
            };
            let Some(typed_args) = check_arguments(ck, name, &params, args, span) else {
                return error_expr(span);
            };
            let access = args_access(&typed_args)
                .lub(receiver.eval.receiver_access)
                .lub(ReceiverAccess::None);
            TypedExpr::new(
                TypedExprKind::Call {
                    callee: Callee::Getter {
                        id: gid,
                        receiver: Box::new(receiver),
                    },
                    args: typed_args,
                },
                ExpressionValue::value(ret, None).with_access(access),
                span,
            )
        }
        Some(Member::Reaction(_)) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::NotCallable,
                span,
                "reactions cannot be called directly".to_string(),
            ));
            error_expr(span)
        }
        Some(Member::Field { offset, ty, .. }) => {
            match ck.ctx.types.underlying_kind(ty).clone() {
                TypeKind::Function(ft) => match ft.kind {
                    FunctionKind::PushPort => {
                        ck.reporter.report(CompileError::new(
                            ErrorCode::CannotCallPushPort,
                            span,
                            "push ports cannot be called; they are activated".to_string(),
                        ));
                        error_expr(span)
                    }
                    FunctionKind::PullPort => {
                        if !ck.callable.is_read_context() {
                            ck.reporter.report(CompileError::new(
                                ErrorCode::PullPortNotInReadContext,
                                span,
                                "pull ports may only be called from a getter, an action, or a reaction"
                                    .to_string(),
                            ));
                            return error_expr(span);
                        }
                        if ck.callable.in_mutable_phase {
                            ck.reporter.report(CompileError::new(
                                ErrorCode::CallInMutableSection,
                                span,
                                "cannot call a pull port in the mutable phase of an activation"
                                    .to_string(),
                            ));
                            return error_expr(span);
                        }
                        let port = field_select(ck, b, name, offset, ty, span);
                        let Some(typed_args) =
                            check_arguments(ck, name, &ft.parameters, args, span)
                        else {
                            return error_expr(span);
                        };
                        let access = args_access(&typed_args)
                            .lub(port.eval.receiver_access);
                        TypedExpr::new(
                            TypedExprKind::Call {
                                callee: Callee::PullPort {
                                    port: Box::new(port),
                                },
                                args: typed_args,
                            },
                            ExpressionValue::value(ft.return_type, None).with_access(access),
                            span,
                        )
                    }
                    FunctionKind::Function => {
                        ck.reporter.report(CompileError::new(
                            ErrorCode::NotCallable,
                            span,
                            "function-typed fields cannot be called".to_string(),
                        ));
                        error_expr(span)
                    }
                },
                _ => {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::NotCallable,
                        span,
                        format!("'{}' is not callable", name),
                    ));
                    error_expr(span)
                }
            }
        }
        None => {
            ck.reporter.report(CompileError::new(
                ErrorCode::Undefined,
                span,
                format!(
                    "{} has no field or method '{}'",
                    ck.ctx.types.type_string(b.eval.ty),
                    name
                ),
            ));
            error_expr(span)
        }
    }
}
