//! Declaration processing.
//!
//! Resolves every type spec into a registry type, builds callable
//! signatures, installs member callables on their receiver named types, and
//! resolves instance declarations. Recursive value-type definitions are
//! detected with white/grey/black marking on named types.

use super::expressions::check_expr;
use super::{CallableContext, Checker, Context};
use crate::ast::{self, Decl, MutabilityMod, Program, TypeSpec};
use crate::decl::{self, MemoryModel};
use crate::error::{CompileError, ErrorCode, ErrorReporter};
use crate::foundation::{Mutability, ReceiverAccess, Span};
use crate::symbol::{ParameterKind, Scopes, SymbolId, SymbolKind, UndefinedKind};
use crate::types::{
    FunctionKind, FunctionType, MethodKind, MethodType, Parameter, ResolveState, StructType,
    TypeId, TypeKind, TypeLevel,
};
use std::collections::HashMap;

/// What each top-level declaration resolved to, aligned with
/// `program.decls`. Consumed by the definition-checking pass.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedDecl {
    None,
    Function(decl::FunctionId),
    Method(decl::MethodId),
    Initializer(decl::InitializerId),
    Getter(decl::GetterId),
    Action(decl::ActionId),
    Reaction(decl::ReactionId),
    Bind(decl::BindId),
    Instance(decl::InstanceId),
}

pub fn process_declarations(
    ctx: &mut Context,
    scopes: &mut Scopes,
    program: &Program,
    reporter: &mut ErrorReporter,
) -> Vec<ResolvedDecl> {
    let mut resolver = DeclResolver {
        ctx,
        scopes,
        reporter,
        type_decls: HashMap::new(),
    };
    resolver.run(program)
}

struct DeclResolver<'a, 'p> {
    ctx: &'a mut Context,
    scopes: &'a mut Scopes,
    reporter: &'a mut ErrorReporter,
    /// Named type id → its declaration, for on-demand resolution.
    type_decls: HashMap<TypeId, &'p ast::TypeDecl>,
}

impl<'a, 'p> DeclResolver<'a, 'p> {
    fn run(&mut self, program: &'p Program) -> Vec<ResolvedDecl> {
        // Give every declared type a named-type object up front so type
        // specs can refer to any of them regardless of order.
        for decl in &program.decls {
            if let Decl::Type(t) = decl {
                if let Some(sym) = self.scopes.find(&t.name) {
                    if matches!(
                        self.ctx.symbols.get(sym).kind,
                        SymbolKind::Undefined(UndefinedKind::Type)
                    ) {
                        let tid = self.ctx.types.named(&t.name);
                        self.ctx.symbols.get_mut(sym).kind = SymbolKind::Type(tid);
                        self.type_decls.insert(tid, t);
                    }
                }
            }
        }

        // Resolve type definitions and constants in declaration order.
        for decl in &program.decls {
            match decl {
                Decl::Type(t) => {
                    if let Some(SymbolKind::Type(tid)) = self.symbol_kind(&t.name) {
                        self.resolve_named(tid, t.span);
                    }
                }
                Decl::Const(c) => self.process_const(c),
                _ => {}
            }
        }

        // Signatures and member installation, then instances.
        let mut resolved = vec![ResolvedDecl::None; program.decls.len()];
        for (i, decl) in program.decls.iter().enumerate() {
            resolved[i] = match decl {
                Decl::Function(f) => self.process_function(f),
                Decl::Method(m) => self.process_method(m),
                Decl::Initializer(d) => self.process_initializer(d),
                Decl::Getter(g) => self.process_getter(g),
                Decl::Action(a) => self.process_action(a),
                Decl::Reaction(r) => self.process_reaction(r),
                Decl::Bind(b) => self.process_bind(b),
                _ => ResolvedDecl::None,
            };
        }
        for (i, decl) in program.decls.iter().enumerate() {
            if let Decl::Instance(inst) = decl {
                resolved[i] = self.process_instance(inst);
            }
        }
        resolved
    }

    fn symbol_kind(&self, name: &str) -> Option<SymbolKind> {
        self.scopes
            .find(name)
            .map(|id| self.ctx.symbols.get(id).kind.clone())
    }

    /// Resolve a named type's definition, detecting recursion.
    fn resolve_named(&mut self, tid: TypeId, span: Span) {
        let state = self
            .ctx
            .types
            .named_type(tid)
            .map(|n| n.state)
            .unwrap_or(ResolveState::Black);
        match state {
            ResolveState::Black => return,
            ResolveState::Grey => {
                let name = self
                    .ctx
                    .types
                    .named_type(tid)
                    .map(|n| n.name.clone())
                    .unwrap_or_default();
                self.reporter.report(CompileError::new(
                    ErrorCode::RecursiveType,
                    span,
                    format!("type '{}' is defined recursively", name),
                ));
                return;
            }
            ResolveState::White => {}
        }

        if let Some(n) = self.ctx.types.named_type_mut(tid) {
            n.state = ResolveState::Grey;
        }
        let underlying = match self.type_decls.get(&tid).copied() {
            Some(decl) => self.resolve_type_spec(&decl.spec, true),
            None => TypeId::VOID,
        };
        self.ctx.types.set_underlying(tid, underlying);
        if let Some(n) = self.ctx.types.named_type_mut(tid) {
            n.state = ResolveState::Black;
        }
    }

    /// Resolve a type spec into a registry type.
    ///
    /// `complete` is true when the context needs the type's layout (a value
    /// position such as a struct field or array element); references through
    /// a pointer, slice, or heap do not require completion and so break
    /// definition cycles.
    fn resolve_type_spec(&mut self, spec: &TypeSpec, complete: bool) -> TypeId {
        match spec {
            TypeSpec::Name(name, span) => match self.scopes.find(name) {
                None => {
                    self.reporter.report(CompileError::new(
                        ErrorCode::Undefined,
                        *span,
                        format!("'{}' is not defined", name),
                    ));
                    TypeId::VOID
                }
                Some(sym) => match self.ctx.symbols.get(sym).kind.clone() {
                    SymbolKind::Type(tid) => {
                        if complete && self.type_decls.contains_key(&tid) {
                            self.resolve_named(tid, *span);
                        }
                        tid
                    }
                    _ => {
                        self.reporter.report(CompileError::new(
                            ErrorCode::RequiresType,
                            *span,
                            format!("'{}' does not denote a type", name),
                        ));
                        TypeId::VOID
                    }
                },
            },
            TypeSpec::Pointer(base, _) => {
                let base = self.resolve_type_spec(base, false);
                self.ctx.types.pointer_to(base)
            }
            TypeSpec::Slice(base, _) => {
                let base = self.resolve_type_spec(base, false);
                self.ctx.types.slice_of(base)
            }
            TypeSpec::Heap(base, _) => {
                let base = self.resolve_type_spec(base, false);
                self.ctx.types.heap_of(base)
            }
            TypeSpec::Map(key, value, _) => {
                let key = self.resolve_type_spec(key, false);
                let value = self.resolve_type_spec(value, false);
                self.ctx.types.map_of(key, value)
            }
            TypeSpec::Array(dim, base, span) => {
                let dimension = self.const_dimension(dim, *span);
                let base = self.resolve_type_spec(base, true);
                self.ctx.types.array_of(dimension, base)
            }
            TypeSpec::Struct(fields, _) => {
                let body = self.resolve_fields(StructType::default(), fields, false);
                self.ctx.types.struct_type(body)
            }
            TypeSpec::Component(fields, _) => {
                let seed = self.ctx.types.new_component();
                let body = self.resolve_fields(seed, fields, true);
                self.ctx.types.component_type(body)
            }
            TypeSpec::Push(params, span) => {
                let parameters = self.resolve_parameters(params);
                self.foreign_safe_parameters(&parameters, *span);
                self.ctx.types.function_type(FunctionType {
                    kind: FunctionKind::PushPort,
                    parameters,
                    return_type: TypeId::VOID,
                    return_indirection: Mutability::Mutable,
                })
            }
            TypeSpec::Pull(params, ret, span) => {
                let parameters = self.resolve_parameters(params);
                self.foreign_safe_parameters(&parameters, *span);
                let return_type = match ret {
                    Some(spec) => self.resolve_type_spec(spec, true),
                    None => TypeId::VOID,
                };
                if self.ctx.types.contains_pointer(return_type) {
                    self.reporter.report(CompileError::new(
                        ErrorCode::SignatureNotForeignSafe,
                        *span,
                        "pull port return type may not contain pointers".to_string(),
                    ));
                }
                self.ctx.types.function_type(FunctionType {
                    kind: FunctionKind::PullPort,
                    parameters,
                    return_type,
                    return_indirection: Mutability::Foreign,
                })
            }
        }
    }

    /// Fold a constant array or port dimension.
    fn const_dimension(&mut self, expr: &ast::Expr, span: Span) -> i64 {
        let mut checker = Checker::new(
            self.ctx,
            self.scopes,
            self.reporter,
            CallableContext::other(),
        );
        let typed = check_expr(&mut checker, expr);
        if typed.is_error() {
            return 0;
        }
        match typed.eval.value.as_ref().and_then(|v| v.as_i128()) {
            Some(n) if n >= 0 && n <= i64::MAX as i128 => n as i64,
            Some(_) => {
                self.reporter.report(CompileError::new(
                    ErrorCode::IndexOutOfRange,
                    span,
                    "dimension is out of range".to_string(),
                ));
                0
            }
            None => {
                self.reporter.report(CompileError::new(
                    ErrorCode::RequiresConstant,
                    span,
                    "dimension must be an integer constant".to_string(),
                ));
                0
            }
        }
    }

    fn resolve_fields(
        &mut self,
        mut body: StructType,
        fields: &[ast::FieldDecl],
        ports_allowed: bool,
    ) -> StructType {
        for field in fields {
            let ty = self.resolve_type_spec(&field.spec, true);
            if !ports_allowed && self.is_port_type(ty) {
                self.reporter.report(CompileError::new(
                    ErrorCode::CannotBeApplied,
                    field.span,
                    "port fields are only allowed in components".to_string(),
                ));
            }
            if body.field(&field.name).is_some() {
                self.reporter.report(CompileError::new(
                    ErrorCode::Redefined,
                    field.span,
                    format!("field '{}' is already defined", field.name),
                ));
                continue;
            }
            let size = self.ctx.types.size(ty);
            let alignment = self.ctx.types.alignment(ty);
            body.append_field(
                field.name.clone(),
                ty,
                size,
                alignment,
                field.tag.clone(),
                false,
            );
        }
        body
    }

    fn is_port_type(&self, ty: TypeId) -> bool {
        match self.ctx.types.underlying_kind(ty) {
            TypeKind::Function(f) => f.kind != FunctionKind::Function,
            TypeKind::Array { base, .. } => self.is_port_type(*base),
            _ => false,
        }
    }

    fn resolve_parameters(&mut self, params: &[ast::ParamDecl]) -> Vec<Parameter> {
        params
            .iter()
            .map(|p| {
                let ty = self.resolve_type_spec(&p.spec, true);
                Parameter {
                    name: p.name.clone(),
                    ty,
                    indirection: modifier_mutability(p.modifier),
                }
            })
            .collect()
    }

    /// Parameters crossing a component boundary must not grant access to
    /// the sender's storage: pointer-bearing parameters must be foreign.
    fn foreign_safe_parameters(&mut self, parameters: &[Parameter], span: Span) {
        for p in parameters {
            if self.ctx.types.contains_pointer(p.ty) && p.indirection != Mutability::Foreign {
                self.reporter.report(CompileError::new(
                    ErrorCode::SignatureNotForeignSafe,
                    span,
                    format!("parameter '{}' must be declared foreign", p.name),
                ));
            }
        }
    }

    /// Make parameter symbols for a resolved parameter list.
    fn parameter_symbols(&mut self, parameters: &[Parameter], span: Span) -> Vec<SymbolId> {
        parameters
            .iter()
            .map(|p| {
                self.ctx.symbols.alloc(
                    p.name.clone(),
                    span,
                    SymbolKind::Parameter {
                        kind: ParameterKind::Ordinary,
                        ty: p.ty,
                        intrinsic: Mutability::Immutable,
                        indirection: p.indirection,
                    },
                )
            })
            .collect()
    }

    fn return_symbol(&mut self, ty: TypeId, span: Span) -> Option<SymbolId> {
        if ty == TypeId::VOID {
            return None;
        }
        Some(self.ctx.symbols.alloc(
            "<return>",
            span,
            SymbolKind::Parameter {
                kind: ParameterKind::Return,
                ty,
                intrinsic: Mutability::Mutable,
                indirection: Mutability::Mutable,
            },
        ))
    }

    /// Resolve a receiver clause. Returns the named type and the receiver
    /// parameter symbol (typed `*Named`).
    fn resolve_receiver(
        &mut self,
        receiver: &ast::Receiver,
        mutability: Mutability,
        requires_component: bool,
    ) -> Option<(TypeId, SymbolId)> {
        let named = match self.symbol_kind(&receiver.type_name) {
            Some(SymbolKind::Type(tid)) if self.ctx.types.level(tid) == TypeLevel::Named => tid,
            Some(_) | None => {
                self.reporter.report(CompileError::new(
                    ErrorCode::RequiresType,
                    receiver.span,
                    format!("'{}' does not denote a named type", receiver.type_name),
                ));
                return None;
            }
        };
        if requires_component
            && !matches!(self.ctx.types.underlying_kind(named), TypeKind::Component(_))
        {
            self.reporter.report(CompileError::new(
                ErrorCode::CannotBeApplied,
                receiver.span,
                format!("'{}' is not a component type", receiver.type_name),
            ));
            return None;
        }
        let ptr = self.ctx.types.pointer_to(named);
        let sym = self.ctx.symbols.alloc(
            receiver.name.clone(),
            receiver.span,
            SymbolKind::Parameter {
                kind: ParameterKind::Receiver,
                ty: ptr,
                intrinsic: Mutability::Immutable,
                indirection: mutability,
            },
        );
        Some((named, sym))
    }

    fn receiver_parameter(&self, named: TypeId, name: &str, mutability: Mutability) -> Parameter {
        Parameter {
            name: name.to_string(),
            ty: named,
            indirection: mutability,
        }
    }

    fn optional_return(&mut self, ret: &Option<TypeSpec>) -> TypeId {
        match ret {
            Some(spec) => self.resolve_type_spec(spec, true),
            None => TypeId::VOID,
        }
    }

    fn process_const(&mut self, c: &ast::ConstDecl) {
        let mut checker = Checker::new(
            self.ctx,
            self.scopes,
            self.reporter,
            CallableContext::other(),
        );
        let typed = check_expr(&mut checker, &c.value);
        let Some(sym) = self.scopes.find(&c.name) else {
            return;
        };
        if !matches!(
            self.ctx.symbols.get(sym).kind,
            SymbolKind::Undefined(UndefinedKind::Constant)
        ) {
            return;
        }
        if typed.is_error() {
            return;
        }
        let Some(value) = typed.eval.value.clone() else {
            self.reporter.report(CompileError::new(
                ErrorCode::RequiresConstant,
                c.span,
                format!("'{}' must be initialized with a constant", c.name),
            ));
            return;
        };
        let (ty, value) = match &c.spec {
            Some(spec) => {
                let target = self.resolve_type_spec(spec, true);
                match crate::value::convert(&self.ctx.types, &value, target) {
                    Some(v) => (target, v),
                    None => {
                        self.reporter.report(CompileError::new(
                            ErrorCode::NotRepresentable,
                            c.span,
                            format!(
                                "constant value is not representable as {}",
                                self.ctx.types.type_string(target)
                            ),
                        ));
                        return;
                    }
                }
            }
            None => (typed.eval.ty, value),
        };
        self.ctx.symbols.get_mut(sym).kind = SymbolKind::Constant { ty, value };
    }

    fn process_function(&mut self, f: &ast::FunctionDecl) -> ResolvedDecl {
        let parameters = self.resolve_parameters(&f.params);
        let return_type = self.optional_return(&f.ret);
        let ty = self.ctx.types.function_type(FunctionType {
            kind: FunctionKind::Function,
            parameters: parameters.clone(),
            return_type,
            return_indirection: Mutability::Mutable,
        });
        let param_symbols = self.parameter_symbols(&parameters, f.span);
        let return_symbol = self.return_symbol(return_type, f.span);
        let fid = self.ctx.decls.add_function(decl::Function {
            name: f.name.clone(),
            ty,
            param_symbols,
            return_symbol,
            body: None,
            memory: MemoryModel::new(),
            span: f.span,
        });
        if let Some(sym) = self.scopes.find(&f.name) {
            if matches!(
                self.ctx.symbols.get(sym).kind,
                SymbolKind::Undefined(UndefinedKind::Function)
            ) {
                self.ctx.symbols.get_mut(sym).kind = SymbolKind::Function(fid);
            }
        }
        ResolvedDecl::Function(fid)
    }

    fn process_method(&mut self, m: &ast::MethodDecl) -> ResolvedDecl {
        let Some((named, receiver_symbol)) =
            self.resolve_receiver(&m.receiver, Mutability::Mutable, false)
        else {
            return ResolvedDecl::None;
        };
        let parameters = self.resolve_parameters(&m.params);
        let return_type = self.optional_return(&m.ret);
        let ty = self.ctx.types.method_type(MethodType {
            kind: MethodKind::Method,
            named_type: named,
            receiver: self.receiver_parameter(named, &m.receiver.name, Mutability::Mutable),
            parameters: parameters.clone(),
            return_type,
            return_indirection: Mutability::Mutable,
        });
        let param_symbols = self.parameter_symbols(&parameters, m.span);
        let return_symbol = self.return_symbol(return_type, m.span);
        let mid = self.ctx.decls.add_method(decl::Method {
            name: m.name.clone(),
            ty,
            named_type: named,
            receiver_symbol,
            param_symbols,
            return_symbol,
            body: None,
            memory: MemoryModel::new(),
            span: m.span,
        });
        if !self.ctx.types.install_method(named, &m.name, mid) {
            self.report_member_redefined(&m.name, m.span);
        }
        ResolvedDecl::Method(mid)
    }

    fn process_initializer(&mut self, d: &ast::InitializerDecl) -> ResolvedDecl {
        let Some((named, receiver_symbol)) =
            self.resolve_receiver(&d.receiver, Mutability::Mutable, true)
        else {
            return ResolvedDecl::None;
        };
        let parameters = self.resolve_parameters(&d.params);
        let ty = self.ctx.types.method_type(MethodType {
            kind: MethodKind::Initializer,
            named_type: named,
            receiver: self.receiver_parameter(named, &d.receiver.name, Mutability::Mutable),
            parameters: parameters.clone(),
            return_type: TypeId::VOID,
            return_indirection: Mutability::Mutable,
        });
        let param_symbols = self.parameter_symbols(&parameters, d.span);
        let iid = self.ctx.decls.add_initializer(decl::Initializer {
            name: d.name.clone(),
            ty,
            named_type: named,
            receiver_symbol,
            param_symbols,
            body: None,
            memory: MemoryModel::new(),
            span: d.span,
        });
        if !self.ctx.types.install_initializer(named, &d.name, iid) {
            self.report_member_redefined(&d.name, d.span);
        }
        ResolvedDecl::Initializer(iid)
    }

    fn process_getter(&mut self, g: &ast::GetterDecl) -> ResolvedDecl {
        let Some((named, receiver_symbol)) =
            self.resolve_receiver(&g.receiver, Mutability::Immutable, true)
        else {
            return ResolvedDecl::None;
        };
        let parameters = self.resolve_parameters(&g.params);
        self.foreign_safe_parameters(&parameters, g.span);
        let return_type = self.resolve_type_spec(&g.ret, true);
        if self.ctx.types.contains_pointer(return_type) {
            self.reporter.report(CompileError::new(
                ErrorCode::SignatureNotForeignSafe,
                g.span,
                "getter return type may not contain pointers".to_string(),
            ));
        }
        let ty = self.ctx.types.method_type(MethodType {
            kind: MethodKind::Getter,
            named_type: named,
            receiver: self.receiver_parameter(named, &g.receiver.name, Mutability::Immutable),
            parameters: parameters.clone(),
            return_type,
            return_indirection: Mutability::Foreign,
        });
        let param_symbols = self.parameter_symbols(&parameters, g.span);
        let return_symbol = self.return_symbol(return_type, g.span);
        let gid = self.ctx.decls.add_getter(decl::Getter {
            name: g.name.clone(),
            ty,
            named_type: named,
            receiver_symbol,
            param_symbols,
            return_symbol,
            body: None,
            memory: MemoryModel::new(),
            immutable_phase_access: ReceiverAccess::None,
            span: g.span,
        });
        if !self.ctx.types.install_getter(named, &g.name, gid) {
            self.report_member_redefined(&g.name, g.span);
        }
        ResolvedDecl::Getter(gid)
    }

    fn process_action(&mut self, a: &ast::ActionDecl) -> ResolvedDecl {
        let Some((named, receiver_symbol)) =
            self.resolve_receiver(&a.receiver, Mutability::Immutable, true)
        else {
            return ResolvedDecl::None;
        };
        let (dimension, iota_symbol) = self.process_dimension(&a.dimension, a.span);
        let aid = self.ctx.decls.add_action(decl::Action {
            named_type: named,
            dimension,
            receiver_symbol,
            iota_symbol,
            precondition: None,
            body: None,
            memory: MemoryModel::new(),
            precondition_access: ReceiverAccess::None,
            immutable_phase_access: ReceiverAccess::None,
            span: a.span,
        });
        self.ctx.types.install_action(named, aid);
        ResolvedDecl::Action(aid)
    }

    fn process_reaction(&mut self, r: &ast::ReactionDecl) -> ResolvedDecl {
        let Some((named, receiver_symbol)) =
            self.resolve_receiver(&r.receiver, Mutability::Immutable, true)
        else {
            return ResolvedDecl::None;
        };
        let parameters = self.resolve_parameters(&r.params);
        self.foreign_safe_parameters(&parameters, r.span);
        let (dimension, iota_symbol) = self.process_dimension(&r.dimension, r.span);
        let ty = self.ctx.types.method_type(MethodType {
            kind: MethodKind::Reaction,
            named_type: named,
            receiver: self.receiver_parameter(named, &r.receiver.name, Mutability::Immutable),
            parameters: parameters.clone(),
            return_type: TypeId::VOID,
            return_indirection: Mutability::Mutable,
        });
        let param_symbols = self.parameter_symbols(&parameters, r.span);
        let rid = self.ctx.decls.add_reaction(decl::Reaction {
            name: r.name.clone(),
            ty,
            named_type: named,
            dimension,
            receiver_symbol,
            iota_symbol,
            param_symbols,
            body: None,
            memory: MemoryModel::new(),
            immutable_phase_access: ReceiverAccess::None,
            span: r.span,
        });
        if !self.ctx.types.install_reaction(named, &r.name, rid) {
            self.report_member_redefined(&r.name, r.span);
        }
        ResolvedDecl::Reaction(rid)
    }

    fn process_bind(&mut self, b: &ast::BindDecl) -> ResolvedDecl {
        let Some((named, receiver_symbol)) =
            self.resolve_receiver(&b.receiver, Mutability::Immutable, true)
        else {
            return ResolvedDecl::None;
        };
        let bid = self.ctx.decls.add_bind(decl::Bind {
            named_type: named,
            receiver_symbol,
            body: None,
            memory: MemoryModel::new(),
            span: b.span,
        });
        self.ctx.types.install_bind(named, bid);
        ResolvedDecl::Bind(bid)
    }

    /// The `[N]` dimension of an action or reaction, plus its `iota`
    /// parameter symbol.
    fn process_dimension(
        &mut self,
        dimension: &Option<ast::Expr>,
        span: Span,
    ) -> (Option<i64>, Option<SymbolId>) {
        let Some(expr) = dimension else {
            return (None, None);
        };
        let dim = self.const_dimension(expr, span);
        let iota = self.ctx.symbols.alloc(
            "iota",
            span,
            SymbolKind::Parameter {
                kind: ParameterKind::Ordinary,
                ty: TypeId::INT,
                intrinsic: Mutability::Immutable,
                indirection: Mutability::Immutable,
            },
        );
        (Some(dim), Some(iota))
    }

    fn process_instance(&mut self, inst: &ast::InstanceDecl) -> ResolvedDecl {
        let named = match self.symbol_kind(&inst.type_name) {
            Some(SymbolKind::Type(tid))
                if matches!(self.ctx.types.underlying_kind(tid), TypeKind::Component(_)) =>
            {
                tid
            }
            Some(SymbolKind::Type(_)) => {
                self.reporter.report(CompileError::new(
                    ErrorCode::MissingType,
                    inst.span,
                    format!("'{}' is not a component type", inst.type_name),
                ));
                return ResolvedDecl::None;
            }
            _ => {
                self.reporter.report(CompileError::new(
                    ErrorCode::Undefined,
                    inst.span,
                    format!("'{}' is not defined", inst.type_name),
                ));
                return ResolvedDecl::None;
            }
        };
        let initializer = match self
            .ctx
            .types
            .named_type(named)
            .and_then(|n| n.initializers.get(&inst.initializer).copied())
        {
            Some(iid) => iid,
            None => {
                self.reporter.report(CompileError::new(
                    ErrorCode::NoInitializer,
                    inst.span,
                    format!(
                        "'{}' has no initializer named '{}'",
                        inst.type_name, inst.initializer
                    ),
                ));
                return ResolvedDecl::None;
            }
        };
        let iid = self.ctx.decls.add_instance(decl::Instance {
            name: inst.name.clone(),
            ty: named,
            initializer,
            args: Vec::new(),
            span: inst.span,
        });
        if let Some(sym) = self.scopes.find(&inst.name) {
            if matches!(
                self.ctx.symbols.get(sym).kind,
                SymbolKind::Undefined(UndefinedKind::Instance)
            ) {
                self.ctx.symbols.get_mut(sym).kind = SymbolKind::Instance(iid);
            }
        }
        ResolvedDecl::Instance(iid)
    }

    fn report_member_redefined(&mut self, name: &str, span: Span) {
        self.reporter.report(CompileError::new(
            ErrorCode::Redefined,
            span,
            format!("'{}' is already defined for this type", name),
        ));
    }
}

pub(super) fn modifier_mutability(modifier: MutabilityMod) -> Mutability {
    match modifier {
        MutabilityMod::Default => Mutability::Mutable,
        MutabilityMod::Const => Mutability::Immutable,
        MutabilityMod::Foreign => Mutability::Foreign,
    }
}
