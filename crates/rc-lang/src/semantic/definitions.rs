//! Definition checking: the bodies of all callables and the argument lists
//! of instance declarations.

use super::access;
use super::declarations::ResolvedDecl;
use super::expressions::{check_expr, implicit_convert};
use super::statements::check_block;
use super::{CallableContext, CallableKind, Checker, Context};
use crate::ast::{self, Decl, Program};
use crate::error::{CompileError, ErrorCode, ErrorReporter};
use crate::foundation::Mutability;
use crate::symbol::{Scopes, SymbolId};
use crate::types::{TypeId, TypeKind};

pub fn check_definitions(
    ctx: &mut Context,
    scopes: &mut Scopes,
    program: &Program,
    resolved: &[ResolvedDecl],
    reporter: &mut ErrorReporter,
) {
    for (decl, resolution) in program.decls.iter().zip(resolved) {
        match (decl, resolution) {
            (Decl::Function(d), ResolvedDecl::Function(id)) => {
                let (params, return_type) = {
                    let f = ctx.decls.function(*id);
                    let ret = match ctx.types.kind(f.ty) {
                        TypeKind::Function(ft) => ft.return_type,
                        _ => TypeId::VOID,
                    };
                    (f.param_symbols.clone(), ret)
                };
                let mut callable = CallableContext::for_kind(CallableKind::Function);
                callable.return_type = return_type;
                let body = check_callable_body(ctx, scopes, reporter, callable, None, &params, &d.body);
                ctx.decls.function_mut(*id).body = Some(body);
            }
            (Decl::Method(d), ResolvedDecl::Method(id)) => {
                let (receiver, params, return_type) = {
                    let m = ctx.decls.method(*id);
                    let ret = match ctx.types.kind(m.ty) {
                        TypeKind::Method(mt) => mt.return_type,
                        _ => TypeId::VOID,
                    };
                    (m.receiver_symbol, m.param_symbols.clone(), ret)
                };
                let mut callable = CallableContext::for_kind(CallableKind::Method);
                callable.receiver = Some(receiver);
                callable.return_type = return_type;
                let body =
                    check_callable_body(ctx, scopes, reporter, callable, Some(receiver), &params, &d.body);
                ctx.decls.method_mut(*id).body = Some(body);
            }
            (Decl::Initializer(d), ResolvedDecl::Initializer(id)) => {
                let (receiver, params) = {
                    let i = ctx.decls.initializer(*id);
                    (i.receiver_symbol, i.param_symbols.clone())
                };
                let mut callable = CallableContext::for_kind(CallableKind::Initializer);
                callable.receiver = Some(receiver);
                let body =
                    check_callable_body(ctx, scopes, reporter, callable, Some(receiver), &params, &d.body);
                ctx.decls.initializer_mut(*id).body = Some(body);
            }
            (Decl::Getter(d), ResolvedDecl::Getter(id)) => {
                let (receiver, params, return_type) = {
                    let g = ctx.decls.getter(*id);
                    let ret = match ctx.types.kind(g.ty) {
                        TypeKind::Method(mt) => mt.return_type,
                        _ => TypeId::VOID,
                    };
                    (g.receiver_symbol, g.param_symbols.clone(), ret)
                };
                let mut callable = CallableContext::for_kind(CallableKind::Getter);
                callable.receiver = Some(receiver);
                callable.return_type = return_type;
                callable.return_indirection = Mutability::Foreign;
                let body =
                    check_callable_body(ctx, scopes, reporter, callable, Some(receiver), &params, &d.body);
                let g = ctx.decls.getter_mut(*id);
                g.immutable_phase_access = access::block_access(&body);
                g.body = Some(body);
            }
            (Decl::Action(d), ResolvedDecl::Action(id)) => {
                check_action(ctx, scopes, reporter, d, *id);
            }
            (Decl::Reaction(d), ResolvedDecl::Reaction(id)) => {
                let (receiver, iota, params) = {
                    let r = ctx.decls.reaction(*id);
                    (r.receiver_symbol, r.iota_symbol, r.param_symbols.clone())
                };
                let mut callable = CallableContext::for_kind(CallableKind::Reaction);
                callable.receiver = Some(receiver);
                let mut all = params;
                if let Some(iota) = iota {
                    all.insert(0, iota);
                }
                let body =
                    check_callable_body(ctx, scopes, reporter, callable, Some(receiver), &all, &d.body);
                let r = ctx.decls.reaction_mut(*id);
                r.immutable_phase_access = access::immutable_phase_access(&body);
                r.body = Some(body);
            }
            (Decl::Bind(d), ResolvedDecl::Bind(id)) => {
                let receiver = ctx.decls.bind(*id).receiver_symbol;
                let callable = CallableContext {
                    kind: CallableKind::Bind,
                    receiver: Some(receiver),
                    return_type: TypeId::VOID,
                    return_indirection: Mutability::Mutable,
                    in_mutable_phase: false,
                };
                let body =
                    check_callable_body(ctx, scopes, reporter, callable, Some(receiver), &[], &d.body);
                ctx.decls.bind_mut(*id).body = Some(body);
            }
            (Decl::Instance(d), ResolvedDecl::Instance(id)) => {
                check_instance(ctx, scopes, reporter, d, *id);
            }
            _ => {}
        }
    }
}

/// Enter the receiver and parameters in a fresh scope and check the body.
fn check_callable_body(
    ctx: &mut Context,
    scopes: &mut Scopes,
    reporter: &mut ErrorReporter,
    callable: CallableContext,
    receiver: Option<SymbolId>,
    params: &[SymbolId],
    body: &[ast::Stmt],
) -> crate::ast::typed::Block {
    scopes.open();
    for sym in receiver.iter().chain(params) {
        let name = ctx.symbols.get(*sym).name.clone();
        scopes.enter_shadowing(&name, *sym);
    }
    let mut ck = Checker::new(ctx, scopes, reporter, callable);
    let block = check_block(&mut ck, body);
    scopes.close();
    block
}

fn check_action(
    ctx: &mut Context,
    scopes: &mut Scopes,
    reporter: &mut ErrorReporter,
    d: &ast::ActionDecl,
    id: crate::decl::ActionId,
) {
    let (receiver, iota) = {
        let a = ctx.decls.action(id);
        (a.receiver_symbol, a.iota_symbol)
    };
    let mut callable = CallableContext::for_kind(CallableKind::Action);
    callable.receiver = Some(receiver);

    // The precondition is checked in the same scope as the body parameters.
    scopes.open();
    let receiver_name = ctx.symbols.get(receiver).name.clone();
    scopes.enter_shadowing(&receiver_name, receiver);
    if let Some(iota) = iota {
        scopes.enter_shadowing("iota", iota);
    }

    let mut ck = Checker::new(ctx, scopes, reporter, callable);
    let precondition = check_expr(&mut ck, &d.precondition);
    if !precondition.is_error() && !ck.ctx.types.is_logical(precondition.eval.ty) {
        ck.reporter.report(CompileError::new(
            ErrorCode::CannotBeApplied,
            d.precondition.span,
            "action precondition must be boolean".to_string(),
        ));
    }
    let body = check_block(&mut ck, &d.body);
    scopes.close();

    let a = ctx.decls.action_mut(id);
    a.precondition_access = precondition.eval.receiver_access;
    a.immutable_phase_access = access::immutable_phase_access(&body);
    a.precondition = Some(precondition);
    a.body = Some(body);
}

/// Check the argument list of an `instance` declaration against its
/// initializer's signature.
fn check_instance(
    ctx: &mut Context,
    scopes: &mut Scopes,
    reporter: &mut ErrorReporter,
    d: &ast::InstanceDecl,
    id: crate::decl::InstanceId,
) {
    let initializer = ctx.decls.instance(id).initializer;
    let params = {
        let i = ctx.decls.initializer(initializer);
        match ctx.types.kind(i.ty) {
            TypeKind::Method(mt) => mt.parameters.clone(),
            _ => return,
        }
    };
    let mut ck = Checker::new(ctx, scopes, reporter, CallableContext::other());
    let typed: Vec<_> = d.args.iter().map(|a| check_expr(&mut ck, a)).collect();
    if typed.iter().any(|t| t.is_error()) {
        return;
    }
    if typed.len() != params.len() {
        reporter.report(CompileError::new(
            ErrorCode::WrongNumberOfInitializers,
            d.span,
            format!(
                "initializer '{}' expects {} arguments, given {}",
                d.initializer,
                params.len(),
                typed.len()
            ),
        ));
        return;
    }
    let mut args = Vec::with_capacity(typed.len());
    let mut ck = Checker::new(ctx, scopes, reporter, CallableContext::other());
    for (arg, param) in typed.into_iter().zip(&params) {
        let converted = implicit_convert(&mut ck, arg, param.ty, ErrorCode::FuncExpectsArg);
        if converted.is_error() {
            return;
        }
        args.push(converted);
    }
    ctx.decls.instance_mut(id).args = args;
}
