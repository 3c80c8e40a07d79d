//! Statement checking.
//!
//! Enforces statement legality in context (action, reaction, initializer,
//! getter, function, method, bind), the mutable-section and
//! activation-nesting rules, and the assignment/leak rules of the
//! mutability lattice. Produces the typed statement trees the composition
//! analyzer walks.

use super::access;
use super::expressions::{check_expr, check_arguments, implicit_convert};
use super::{CallableKind, Checker};
use crate::ast::typed::{
    Block, ExpressionKind, ExpressionValue, TypedExpr, TypedExprKind, TypedPortCall, TypedStmt,
};
use crate::ast::{self, Stmt};
use crate::error::{CompileError, ErrorCode};
use crate::foundation::{Mutability, ReceiverAccess, Span};
use crate::symbol::{ParameterKind, SymbolKind};
use crate::types::{FunctionKind, Member, TypeId, TypeKind};
use crate::value;

/// Check a statement list in a fresh scope.
pub fn check_block(ck: &mut Checker, stmts: &[Stmt]) -> Block {
    ck.scopes.open();
    let block = check_stmts(ck, stmts);
    ck.scopes.close();
    block
}

fn check_stmts(ck: &mut Checker, stmts: &[Stmt]) -> Block {
    Block {
        stmts: stmts.iter().map(|s| check_stmt(ck, s)).collect(),
    }
}

fn check_stmt(ck: &mut Checker, stmt: &Stmt) -> TypedStmt {
    match stmt {
        Stmt::Empty(_) => TypedStmt::Empty,
        Stmt::Block(stmts, _) => TypedStmt::Block(check_block(ck, stmts)),
        Stmt::Expression(expr) => TypedStmt::Expression(check_expr(ck, expr)),
        Stmt::Assign { target, value, span } => check_assign(ck, target, value, *span),
        Stmt::AddAssign { target, value, span } => {
            check_op_assign(ck, target, value, *span, true)
        }
        Stmt::SubAssign { target, value, span } => {
            check_op_assign(ck, target, value, *span, false)
        }
        Stmt::Var {
            names,
            modifier,
            spec,
            inits,
            span,
        } => check_var(ck, names, *modifier, spec, inits, *span),
        Stmt::Const(decl) => check_const_stmt(ck, decl),
        Stmt::If {
            cond,
            then_block,
            else_block,
            span,
        } => {
            let cond = check_condition(ck, cond, *span);
            TypedStmt::If {
                cond,
                then_block: check_block(ck, then_block),
                else_block: check_block(ck, else_block),
            }
        }
        Stmt::While { cond, body, span } => {
            let cond = check_condition(ck, cond, *span);
            TypedStmt::While {
                cond,
                body: check_block(ck, body),
            }
        }
        Stmt::ForRange { var, limit, body, span } => check_for_range(ck, var, limit, body, *span),
        Stmt::Return { value, span } => check_return(ck, value.as_ref(), *span),
        Stmt::Change { var, expr, body, span } => check_change(ck, var, expr, body, *span),
        Stmt::Activate { calls, body, span } => check_activate(ck, calls, body, *span),
        Stmt::BindPush {
            port,
            target,
            index,
            span,
        } => check_bind_push(ck, port, target, index.as_ref(), *span),
        Stmt::BindPull { port, target, span } => check_bind_pull(ck, port, target, *span),
    }
}

/// An assignment target must be a mutable variable.
fn check_target(ck: &mut Checker, target: &ast::Expr, span: Span) -> Option<TypedExpr> {
    let t = check_expr(ck, target);
    if t.is_error() {
        return None;
    }
    if t.eval.kind != ExpressionKind::Variable {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresValueOrVariable,
            span,
            "assignment target must be a variable".to_string(),
        ));
        return None;
    }
    if t.eval.intrinsic != Mutability::Mutable {
        ck.reporter.report(CompileError::new(
            ErrorCode::TargetNotMutable,
            span,
            "assignment target is not mutable".to_string(),
        ));
        return None;
    }
    Some(t)
}

/// The leak rule: storing a pointer-bearing value into a slot must not
/// widen the access the slot grants over what the source held.
fn leak_check(ck: &mut Checker, ty: TypeId, source: &ExpressionValue, slot: Mutability, span: Span) {
    if !ck.ctx.types.contains_pointer(ty) {
        return;
    }
    if source.indirection < slot {
        ck.reporter.report(CompileError::new(
            ErrorCode::LeaksPointers,
            span,
            "assignment leaks mutable pointers".to_string(),
        ));
    }
}

fn check_assign(ck: &mut Checker, target: &ast::Expr, value: &ast::Expr, span: Span) -> TypedStmt {
    let Some(t) = check_target(ck, target, span) else {
        let _ = check_expr(ck, value);
        return TypedStmt::Error;
    };
    let v = check_expr(ck, value);
    let v = implicit_convert(ck, v, t.eval.ty, ErrorCode::NotAssignable);
    if v.is_error() {
        return TypedStmt::Error;
    }
    leak_check(ck, t.eval.ty, &v.eval, t.eval.indirection, span);
    TypedStmt::Assign { target: t, value: v }
}

fn check_op_assign(
    ck: &mut Checker,
    target: &ast::Expr,
    value: &ast::Expr,
    span: Span,
    add: bool,
) -> TypedStmt {
    let Some(t) = check_target(ck, target, span) else {
        let _ = check_expr(ck, value);
        return TypedStmt::Error;
    };
    let legal = ck.ctx.types.is_numeric(t.eval.ty)
        || (add && ck.ctx.types.is_string_type(t.eval.ty));
    if !legal {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'{}' cannot be applied to {}",
                if add { "+=" } else { "-=" },
                ck.ctx.types.type_string(t.eval.ty)
            ),
        ));
        return TypedStmt::Error;
    }
    let v = check_expr(ck, value);
    let v = implicit_convert(ck, v, t.eval.ty, ErrorCode::NotAssignable);
    if v.is_error() {
        return TypedStmt::Error;
    }
    if add {
        TypedStmt::AddAssign { target: t, value: v }
    } else {
        TypedStmt::SubAssign { target: t, value: v }
    }
}

fn check_var(
    ck: &mut Checker,
    names: &[(String, Span)],
    modifier: ast::MutabilityMod,
    spec: &Option<ast::TypeSpec>,
    inits: &[ast::Expr],
    span: Span,
) -> TypedStmt {
    let declared = spec.as_ref().map(|s| resolve_spec(ck, s));
    let indirection = super::declarations::modifier_mutability(modifier);

    if !inits.is_empty() && inits.len() != names.len() {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "{} names but {} initializers",
                names.len(),
                inits.len()
            ),
        ));
        return TypedStmt::Error;
    }
    if inits.is_empty() && declared.is_none() {
        ck.reporter.report(CompileError::new(
            ErrorCode::MissingType,
            span,
            "variable declaration needs a type or an initializer".to_string(),
        ));
        return TypedStmt::Error;
    }

    let mut symbols = Vec::new();
    let mut typed_inits = Vec::new();
    for (i, (name, name_span)) in names.iter().enumerate() {
        let init = inits.get(i).map(|e| check_expr(ck, e));

        let ty = match declared {
            Some(ty) => ty,
            None => {
                let init = init.as_ref().expect("checked above");
                if init.is_error() {
                    continue;
                }
                let default = ck.ctx.types.default_type(init.eval.ty);
                if default == TypeId::NIL {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::MissingType,
                        *name_span,
                        "cannot infer a type from nil".to_string(),
                    ));
                    continue;
                }
                default
            }
        };

        let init = init.map(|e| {
            let e = implicit_convert(ck, e, ty, ErrorCode::NotAssignable);
            if !e.is_error() {
                leak_check(ck, ty, &e.eval, indirection, *name_span);
            }
            e
        });

        let sym = ck.ctx.symbols.alloc(
            name.clone(),
            *name_span,
            SymbolKind::Variable {
                ty,
                intrinsic: Mutability::Mutable,
                indirection,
            },
        );
        if let Err(existing) = ck.scopes.enter(name, sym) {
            let first = ck.ctx.symbols.get(existing).span;
            ck.reporter.report(
                CompileError::new(
                    ErrorCode::Redefined,
                    *name_span,
                    format!("'{}' is already defined in this scope", name),
                )
                .with_note(format!("first defined at line {}", first.line)),
            );
            continue;
        }
        symbols.push(sym);
        if let Some(init) = init {
            typed_inits.push(init);
        }
    }

    TypedStmt::Var {
        symbols,
        inits: typed_inits,
    }
}

fn check_const_stmt(ck: &mut Checker, decl: &ast::ConstDecl) -> TypedStmt {
    let typed = check_expr(ck, &decl.value);
    if typed.is_error() {
        return TypedStmt::Error;
    }
    let Some(val) = typed.eval.value.clone() else {
        ck.reporter.report(CompileError::new(
            ErrorCode::RequiresConstant,
            decl.span,
            format!("'{}' must be initialized with a constant", decl.name),
        ));
        return TypedStmt::Error;
    };
    let (ty, val) = match &decl.spec {
        Some(spec) => {
            let target = resolve_spec(ck, spec);
            match value::convert(&ck.ctx.types, &val, target) {
                Some(v) => (target, v),
                None => {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::NotRepresentable,
                        decl.span,
                        format!(
                            "constant value is not representable as {}",
                            ck.ctx.types.type_string(target)
                        ),
                    ));
                    return TypedStmt::Error;
                }
            }
        }
        None => (typed.eval.ty, val),
    };
    let sym = ck
        .ctx
        .symbols
        .alloc(decl.name.clone(), decl.span, SymbolKind::Constant { ty, value: val });
    if let Err(existing) = ck.scopes.enter(&decl.name, sym) {
        let first = ck.ctx.symbols.get(existing).span;
        ck.reporter.report(
            CompileError::new(
                ErrorCode::Redefined,
                decl.span,
                format!("'{}' is already defined in this scope", decl.name),
            )
            .with_note(format!("first defined at line {}", first.line)),
        );
    }
    TypedStmt::Const
}

fn check_condition(ck: &mut Checker, cond: &ast::Expr, span: Span) -> TypedExpr {
    let c = check_expr(ck, cond);
    if c.is_error() {
        return c;
    }
    if !c.eval.is_value_or_variable() || !ck.ctx.types.is_logical(c.eval.ty) {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            "condition must be boolean".to_string(),
        ));
        return TypedExpr::error(span);
    }
    c
}

fn check_for_range(
    ck: &mut Checker,
    var: &str,
    limit: &ast::Expr,
    body: &[Stmt],
    span: Span,
) -> TypedStmt {
    let l = check_expr(ck, limit);
    if l.is_error() {
        return TypedStmt::Error;
    }
    let bound = l.eval.value.as_ref().and_then(|v| v.as_i128());
    let limit_value = match bound {
        Some(n) if n > 0 && n <= i64::MAX as i128 => n as i64,
        _ => {
            ck.reporter.report(CompileError::new(
                ErrorCode::RequiresConstant,
                span,
                "range bound must be a positive integer constant".to_string(),
            ));
            return TypedStmt::Error;
        }
    };

    ck.scopes.open();
    let sym = ck.ctx.symbols.alloc(
        var,
        span,
        SymbolKind::Variable {
            ty: TypeId::INT,
            intrinsic: Mutability::Immutable,
            indirection: Mutability::Immutable,
        },
    );
    ck.scopes.enter_shadowing(var, sym);
    let body = check_stmts(ck, body);
    ck.scopes.close();

    TypedStmt::ForRange {
        symbol: sym,
        limit: limit_value,
        body,
    }
}

fn check_return(ck: &mut Checker, value: Option<&ast::Expr>, span: Span) -> TypedStmt {
    let ret = ck.callable.return_type;
    match value {
        None => {
            if ret != TypeId::VOID {
                ck.reporter.report(CompileError::new(
                    ErrorCode::ReturnTypeMismatch,
                    span,
                    "missing return value".to_string(),
                ));
                return TypedStmt::Error;
            }
            TypedStmt::Return(None)
        }
        Some(expr) => {
            let v = check_expr(ck, expr);
            if ret == TypeId::VOID {
                ck.reporter.report(CompileError::new(
                    ErrorCode::ReturnTypeMismatch,
                    span,
                    "this callable does not return a value".to_string(),
                ));
                return TypedStmt::Error;
            }
            let v = implicit_convert(ck, v, ret, ErrorCode::ReturnTypeMismatch);
            if v.is_error() {
                return TypedStmt::Error;
            }
            leak_check(ck, ret, &v.eval, ck.callable.return_indirection, span);
            TypedStmt::Return(Some(v))
        }
    }
}

/// `change x = e { ... }`: `e` must be `*heap T`; `x` is a fresh `*T` and
/// every ambient pointer binding becomes foreign inside the block.
fn check_change(
    ck: &mut Checker,
    var: &str,
    expr: &ast::Expr,
    body: &[Stmt],
    span: Span,
) -> TypedStmt {
    let e = check_expr(ck, expr);
    if e.is_error() {
        return TypedStmt::Error;
    }
    let Some(root_ty) = ck.ctx.types.change_type(e.eval.ty) else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!(
                "'change' requires a pointer to a heap, given {}",
                ck.ctx.types.type_string(e.eval.ty)
            ),
        ));
        return TypedStmt::Error;
    };

    ck.scopes.open();
    demote_ambient_pointers(ck, span);
    let sym = ck.ctx.symbols.alloc(
        var,
        span,
        SymbolKind::Variable {
            ty: root_ty,
            intrinsic: Mutability::Immutable,
            indirection: Mutability::Mutable,
        },
    );
    ck.scopes.enter_shadowing(var, sym);
    let body = check_stmts(ck, body);
    ck.scopes.close();

    TypedStmt::Change {
        symbol: sym,
        expr: e,
        body,
    }
}

/// Re-enter every visible pointer-bearing binding with foreign indirection.
fn demote_ambient_pointers(ck: &mut Checker, span: Span) {
    for (name, id) in ck.scopes.visible() {
        let demoted = match ck.ctx.symbols.get(id).kind.clone() {
            SymbolKind::Variable { ty, intrinsic, .. } if ck.ctx.types.contains_pointer(ty) => {
                SymbolKind::Variable {
                    ty,
                    intrinsic,
                    indirection: Mutability::Foreign,
                }
            }
            SymbolKind::Parameter {
                kind, ty, intrinsic, ..
            } if ck.ctx.types.contains_pointer(ty) => {
                let kind = match kind {
                    ParameterKind::Receiver | ParameterKind::ReceiverDuplicate => {
                        ParameterKind::ReceiverDuplicate
                    }
                    _ => ParameterKind::OrdinaryDuplicate,
                };
                SymbolKind::Parameter {
                    kind,
                    ty,
                    intrinsic,
                    indirection: Mutability::Foreign,
                }
            }
            _ => continue,
        };
        let dup = ck.ctx.symbols.alloc(name.clone(), span, demoted);
        ck.scopes.enter_shadowing(&name, dup);
    }
}

/// `activate p(args), q[i](args) { ... }`
fn check_activate(
    ck: &mut Checker,
    calls: &[ast::PortCall],
    body: &[Stmt],
    span: Span,
) -> TypedStmt {
    if !matches!(ck.callable.kind, CallableKind::Action | CallableKind::Reaction) {
        ck.reporter.report(CompileError::new(
            ErrorCode::ActivateNotInActionOrReaction,
            span,
            "'activate' is only allowed in actions and reactions".to_string(),
        ));
        return TypedStmt::Error;
    }
    if ck.callable.in_mutable_phase {
        ck.reporter.report(CompileError::new(
            ErrorCode::ActivateNested,
            span,
            "'activate' cannot be nested".to_string(),
        ));
        return TypedStmt::Error;
    }

    let mut typed_calls = Vec::new();
    for call in calls {
        if let Some(c) = check_port_call(ck, call) {
            typed_calls.push(c);
        }
    }

    // The body runs in the mutable phase: the receiver becomes writable and
    // every other pointer binding is hidden so component state cannot leak
    // out of the transaction.
    let saved = ck.callable;
    ck.callable.in_mutable_phase = true;
    ck.scopes.open();
    enter_mutable_phase_bindings(ck, span);
    let body = check_stmts(ck, body);
    ck.scopes.close();
    ck.callable = saved;

    let raw = access::block_access(&body);
    let mutable_phase_access = if raw == ReceiverAccess::None {
        ReceiverAccess::None
    } else {
        // Any receiver touch in the mutable phase locks the instance for
        // writing.
        ReceiverAccess::Write
    };

    TypedStmt::Activate {
        calls: typed_calls,
        body,
        mutable_phase_access,
    }
}

/// Re-enter the receiver writable and hide all other pointer bindings.
fn enter_mutable_phase_bindings(ck: &mut Checker, span: Span) {
    let receiver = ck.callable.receiver;
    for (name, id) in ck.scopes.visible() {
        if Some(id) == receiver {
            let SymbolKind::Parameter { ty, .. } = ck.ctx.symbols.get(id).kind.clone() else {
                continue;
            };
            let dup = ck.ctx.symbols.alloc(
                name.clone(),
                span,
                SymbolKind::Parameter {
                    kind: ParameterKind::ReceiverDuplicate,
                    ty,
                    intrinsic: Mutability::Immutable,
                    indirection: Mutability::Mutable,
                },
            );
            ck.scopes.enter_shadowing(&name, dup);
            continue;
        }
        let hide = match &ck.ctx.symbols.get(id).kind {
            SymbolKind::Variable { ty, .. } | SymbolKind::Parameter { ty, .. } => {
                ck.ctx.types.contains_pointer(*ty)
            }
            _ => false,
        };
        if hide {
            let dup = ck.ctx.symbols.alloc(name.clone(), span, SymbolKind::Hidden);
            ck.scopes.enter_shadowing(&name, dup);
        }
    }
}

/// Resolve one port call of an `activate` list against the receiver's
/// component type.
fn check_port_call(ck: &mut Checker, call: &ast::PortCall) -> Option<TypedPortCall> {
    let span = call.span;
    let ast::ExprKind::Identifier(port_name) = &call.port.kind else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            "activated port must be a field of the receiver".to_string(),
        ));
        return None;
    };
    let receiver = ck.callable.receiver?;
    let receiver_ty = match ck.ctx.symbols.get(receiver).kind {
        SymbolKind::Parameter { ty, .. } => ty,
        _ => return None,
    };

    let member = ck.ctx.types.select_member(receiver_ty, port_name);
    let Some(Member::Field { offset, ty, .. }) = member else {
        ck.reporter.report(CompileError::new(
            ErrorCode::Undefined,
            span,
            format!("'{}' is not a port of the receiver", port_name),
        ));
        return None;
    };

    // A plain push port, or an array of push ports for indexed activation.
    let (signature, dimension, unit_size) = match ck.ctx.types.underlying_kind(ty).clone() {
        TypeKind::Function(f) if f.kind == FunctionKind::PushPort => (f, None, 0),
        TypeKind::Array { dimension, base } => match ck.ctx.types.underlying_kind(base).clone() {
            TypeKind::Function(f) if f.kind == FunctionKind::PushPort => {
                (f, Some(dimension), ck.ctx.types.unit_size(base))
            }
            _ => {
                ck.reporter.report(CompileError::new(
                    ErrorCode::CannotBeApplied,
                    span,
                    format!("'{}' is not a push port", port_name),
                ));
                return None;
            }
        },
        _ => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!("'{}' is not a push port", port_name),
            ));
            return None;
        }
    };

    let index = match (&call.index, dimension) {
        (Some(index), Some(dim)) => {
            let idx = check_expr(ck, index);
            if idx.is_error() {
                return None;
            }
            if !ck.ctx.types.is_integral(idx.eval.ty) {
                ck.reporter.report(CompileError::new(
                    ErrorCode::CannotBeApplied,
                    index.span,
                    "port index must be an integer".to_string(),
                ));
                return None;
            }
            if let Some(n) = idx.eval.value.as_ref().and_then(|v| v.as_i128()) {
                if n < 0 {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::NegativePortIndex,
                        index.span,
                        "port index is negative".to_string(),
                    ));
                    return None;
                }
                if n >= dim as i128 {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::IndexOutOfRange,
                        index.span,
                        "port index is out of range".to_string(),
                    ));
                    return None;
                }
            }
            Some(idx)
        }
        (None, Some(_)) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!("port '{}' requires an index", port_name),
            ));
            return None;
        }
        (Some(_), None) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!("port '{}' is not indexed", port_name),
            ));
            return None;
        }
        (None, None) => None,
    };

    let args = check_arguments(ck, port_name, &signature.parameters, &call.args, span)?;

    // Build the port expression: receiver.field.
    let (intrinsic, indirection) = match ck.ctx.symbols.get(receiver).kind {
        SymbolKind::Parameter {
            intrinsic,
            indirection,
            ..
        } => (intrinsic, indirection),
        _ => (Mutability::Immutable, Mutability::Immutable),
    };
    let receiver_expr = TypedExpr::new(
        TypedExprKind::Variable(receiver),
        ExpressionValue::variable(receiver_ty, intrinsic, indirection)
            .with_access(ReceiverAccess::Read),
        span,
    );
    let port_eval = ExpressionValue {
        kind: ExpressionKind::Variable,
        ty,
        value: None,
        intrinsic: indirection,
        indirection,
        receiver_access: ReceiverAccess::Read,
    };
    let port = TypedExpr::new(
        TypedExprKind::FieldSelect {
            base: Box::new(receiver_expr),
            offset,
            name: port_name.clone(),
        },
        port_eval,
        span,
    );

    Some(TypedPortCall {
        port,
        index,
        args,
        dimension,
        unit_size,
        span,
    })
}

fn check_bind_context(ck: &mut Checker, span: Span) -> bool {
    if ck.callable.kind != CallableKind::Bind {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            "bind statements are only allowed in bind blocks".to_string(),
        ));
        return false;
    }
    true
}

/// `port -> recv.reaction` or `port -> recv.reaction[idx]`
fn check_bind_push(
    ck: &mut Checker,
    port: &ast::Expr,
    target: &ast::Expr,
    index: Option<&ast::Expr>,
    span: Span,
) -> TypedStmt {
    if !check_bind_context(ck, span) {
        return TypedStmt::Error;
    }
    let p = check_expr(ck, port);
    if p.is_error() {
        return TypedStmt::Error;
    }
    let port_signature = match ck.ctx.types.underlying_kind(p.eval.ty) {
        TypeKind::Function(f) if f.kind == FunctionKind::PushPort => f.clone(),
        _ => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!(
                    "left side of '->' must be a push port, given {}",
                    ck.ctx.types.type_string(p.eval.ty)
                ),
            ));
            return TypedStmt::Error;
        }
    };

    let ast::ExprKind::Select { base, name } = &target.kind else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            "right side of '->' must name a reaction".to_string(),
        ));
        return TypedStmt::Error;
    };
    let receiver = check_expr(ck, base);
    if receiver.is_error() {
        return TypedStmt::Error;
    }
    let Some(Member::Reaction(rid)) = ck.ctx.types.select_member(receiver.eval.ty, name) else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!("'{}' is not a reaction", name),
        ));
        return TypedStmt::Error;
    };

    let (reaction_ty, reaction_dim) = {
        let r = ck.ctx.decls.reaction(rid);
        (r.ty, r.dimension)
    };
    let signature_ok = match ck.ctx.types.kind(reaction_ty) {
        TypeKind::Method(m) => ck.ctx.types.identical_signature(
            &port_signature.parameters,
            port_signature.return_type,
            &m.parameters,
            m.return_type,
        ),
        _ => false,
    };
    if !signature_ok {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!("push port and reaction '{}' have different signatures", name),
        ));
        return TypedStmt::Error;
    }

    let index = match (index, reaction_dim) {
        (Some(idx), Some(dim)) => {
            let i = check_expr(ck, idx);
            if i.is_error() {
                return TypedStmt::Error;
            }
            if !ck.ctx.types.is_integral(i.eval.ty) {
                ck.reporter.report(CompileError::new(
                    ErrorCode::CannotBeApplied,
                    idx.span,
                    "reaction index must be an integer".to_string(),
                ));
                return TypedStmt::Error;
            }
            if let Some(n) = i.eval.value.as_ref().and_then(|v| v.as_i128()) {
                if n < 0 {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::NegativePortIndex,
                        idx.span,
                        "reaction index is negative".to_string(),
                    ));
                    return TypedStmt::Error;
                }
                if n >= dim as i128 {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::IndexOutOfRange,
                        idx.span,
                        "reaction index is out of range".to_string(),
                    ));
                    return TypedStmt::Error;
                }
            }
            Some(i)
        }
        (None, Some(_)) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!("reaction '{}' requires an index", name),
            ));
            return TypedStmt::Error;
        }
        (Some(_), None) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!("reaction '{}' is not indexed", name),
            ));
            return TypedStmt::Error;
        }
        (None, None) => None,
    };

    TypedStmt::BindPush {
        port: p,
        receiver,
        reaction: rid,
        index,
    }
}

/// `port <- recv.getter`
fn check_bind_pull(
    ck: &mut Checker,
    port: &ast::Expr,
    target: &ast::Expr,
    span: Span,
) -> TypedStmt {
    if !check_bind_context(ck, span) {
        return TypedStmt::Error;
    }
    let p = check_expr(ck, port);
    if p.is_error() {
        return TypedStmt::Error;
    }
    let port_signature = match ck.ctx.types.underlying_kind(p.eval.ty) {
        TypeKind::Function(f) if f.kind == FunctionKind::PullPort => f.clone(),
        _ => {
            ck.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                span,
                format!(
                    "left side of '<-' must be a pull port, given {}",
                    ck.ctx.types.type_string(p.eval.ty)
                ),
            ));
            return TypedStmt::Error;
        }
    };

    let ast::ExprKind::Select { base, name } = &target.kind else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            "right side of '<-' must name a getter".to_string(),
        ));
        return TypedStmt::Error;
    };
    let receiver = check_expr(ck, base);
    if receiver.is_error() {
        return TypedStmt::Error;
    }
    let Some(Member::Getter(gid)) = ck.ctx.types.select_member(receiver.eval.ty, name) else {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!("'{}' is not a getter", name),
        ));
        return TypedStmt::Error;
    };

    let getter_ty = ck.ctx.decls.getter(gid).ty;
    let signature_ok = match ck.ctx.types.kind(getter_ty) {
        TypeKind::Method(m) => ck.ctx.types.identical_signature(
            &port_signature.parameters,
            port_signature.return_type,
            &m.parameters,
            m.return_type,
        ),
        _ => false,
    };
    if !signature_ok {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            span,
            format!("pull port and getter '{}' have different signatures", name),
        ));
        return TypedStmt::Error;
    }

    TypedStmt::BindPull {
        port: p,
        receiver,
        getter: gid,
    }
}

/// Resolve a type spec in statement position.
///
/// All named types are already resolved when bodies are checked, so this is
/// a plain lookup plus derived-type construction.
pub(super) fn resolve_spec(ck: &mut Checker, spec: &ast::TypeSpec) -> TypeId {
    match spec {
        ast::TypeSpec::Name(name, span) => match ck.scopes.find(name) {
            Some(sym) => match ck.ctx.symbols.get(sym).kind {
                SymbolKind::Type(ty) => ty,
                _ => {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::RequiresType,
                        *span,
                        format!("'{}' does not denote a type", name),
                    ));
                    TypeId::VOID
                }
            },
            None => {
                ck.reporter.report(CompileError::new(
                    ErrorCode::Undefined,
                    *span,
                    format!("'{}' is not defined", name),
                ));
                TypeId::VOID
            }
        },
        ast::TypeSpec::Pointer(base, _) => {
            let base = resolve_spec(ck, base);
            ck.ctx.types.pointer_to(base)
        }
        ast::TypeSpec::Slice(base, _) => {
            let base = resolve_spec(ck, base);
            ck.ctx.types.slice_of(base)
        }
        ast::TypeSpec::Heap(base, _) => {
            let base = resolve_spec(ck, base);
            ck.ctx.types.heap_of(base)
        }
        ast::TypeSpec::Map(key, value, _) => {
            let key = resolve_spec(ck, key);
            let value = resolve_spec(ck, value);
            ck.ctx.types.map_of(key, value)
        }
        ast::TypeSpec::Array(dim, base, span) => {
            let d = check_expr(ck, dim);
            let dimension = match d.eval.value.as_ref().and_then(|v| v.as_i128()) {
                Some(n) if n >= 0 && n <= i64::MAX as i128 => n as i64,
                _ => {
                    ck.reporter.report(CompileError::new(
                        ErrorCode::RequiresConstant,
                        *span,
                        "dimension must be an integer constant".to_string(),
                    ));
                    0
                }
            };
            let base = resolve_spec(ck, base);
            ck.ctx.types.array_of(dimension, base)
        }
        ast::TypeSpec::Struct(..)
        | ast::TypeSpec::Component(..)
        | ast::TypeSpec::Push(..)
        | ast::TypeSpec::Pull(..) => {
            ck.reporter.report(CompileError::new(
                ErrorCode::RequiresType,
                spec.span(),
                "composite type literals are not allowed here; declare a named type".to_string(),
            ));
            TypeId::VOID
        }
    }
}
