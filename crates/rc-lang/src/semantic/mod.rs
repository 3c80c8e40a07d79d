//! Semantic analysis pipeline.
//!
//! The passes run in order over the parsed program:
//!
//! 1. `symbols` — install the predeclared block and enter placeholder
//!    symbols for every top-level declaration;
//! 2. `declarations` — resolve type specs, build signatures, install member
//!    callables on their named types, detect recursive types;
//! 3. `definitions` — check every callable body (expressions, statements,
//!    receiver access) and every instance declaration;
//! 4. `memory` — allocate stack frames for all callables.
//!
//! Every checker is total: constraint failures are reported on the
//! [`ErrorReporter`] and checking continues with `Error`-kinded values.

pub mod access;
pub mod builtins;
pub mod declarations;
pub mod definitions;
pub mod expressions;
pub mod memory;
pub mod statements;
pub mod symbols;

use crate::ast::Program;
use crate::decl::Declarations;
use crate::error::ErrorReporter;
use crate::foundation::Mutability;
use crate::symbol::{Scopes, SymbolArena, SymbolId};
use crate::types::{TypeId, TypeRegistry};

/// Shared state of a compilation: the type registry, symbol arena, and
/// checked declarations. Created at startup and passed explicitly.
#[derive(Debug, Default)]
pub struct Context {
    pub types: TypeRegistry,
    pub symbols: SymbolArena,
    pub decls: Declarations,
}

impl Context {
    pub fn new() -> Self {
        Self {
            types: TypeRegistry::new(),
            symbols: SymbolArena::new(),
            decls: Declarations::new(),
        }
    }
}

/// What kind of callable a body is checked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Method,
    Initializer,
    Getter,
    Action,
    Reaction,
    Bind,
    /// Constant and instance argument contexts.
    Other,
}

/// Per-callable checking context.
#[derive(Debug, Clone, Copy)]
pub struct CallableContext {
    pub kind: CallableKind,
    pub receiver: Option<SymbolId>,
    pub return_type: TypeId,
    pub return_indirection: Mutability,
    /// Inside the body of an `activate` statement.
    pub in_mutable_phase: bool,
}

impl CallableContext {
    pub fn other() -> Self {
        Self {
            kind: CallableKind::Other,
            receiver: None,
            return_type: TypeId::VOID,
            return_indirection: Mutability::Mutable,
            in_mutable_phase: false,
        }
    }

    pub fn for_kind(kind: CallableKind) -> Self {
        Self {
            kind,
            ..Self::other()
        }
    }

    /// Contexts in which getters and pull ports may be invoked.
    pub fn is_read_context(&self) -> bool {
        matches!(
            self.kind,
            CallableKind::Getter | CallableKind::Action | CallableKind::Reaction
        )
    }
}

/// Working state threaded through expression and statement checking.
pub struct Checker<'a> {
    pub ctx: &'a mut Context,
    pub scopes: &'a mut Scopes,
    pub reporter: &'a mut ErrorReporter,
    pub callable: CallableContext,
}

impl<'a> Checker<'a> {
    pub fn new(
        ctx: &'a mut Context,
        scopes: &'a mut Scopes,
        reporter: &'a mut ErrorReporter,
        callable: CallableContext,
    ) -> Self {
        Self {
            ctx,
            scopes,
            reporter,
            callable,
        }
    }
}

/// Run all semantic passes over a parsed program.
///
/// Returns the populated [`Context`]; the caller inspects the reporter to
/// decide whether to continue to composition analysis.
pub fn analyze(program: &Program, reporter: &mut ErrorReporter) -> Context {
    let mut ctx = Context::new();
    let mut scopes = Scopes::new();

    symbols::install_predeclared(&mut ctx, &mut scopes);
    symbols::enter_symbols(&mut ctx, &mut scopes, program, reporter);
    tracing::debug!(errors = reporter.count(), "entered top-level symbols");

    let resolved = declarations::process_declarations(&mut ctx, &mut scopes, program, reporter);
    tracing::debug!(errors = reporter.count(), "processed declarations");

    definitions::check_definitions(&mut ctx, &mut scopes, program, &resolved, reporter);
    tracing::debug!(errors = reporter.count(), "checked definitions");

    memory::allocate_frames(&mut ctx);
    ctx
}
