//! Predeclared block and the enter-symbols pass.

use super::Context;
use crate::ast::{Decl, Program};
use crate::error::{CompileError, ErrorCode, ErrorReporter};
use crate::foundation::Span;
use crate::symbol::{Scopes, SymbolKind, TemplateKind, UndefinedKind};
use crate::types::TypeId;
use crate::value::Value;

/// Install the predeclared block: primitive type names, the untyped
/// constants `true`, `false`, and `nil`, and the built-in templates.
pub fn install_predeclared(ctx: &mut Context, scopes: &mut Scopes) {
    let span = Span::zero(0);

    let primitives: &[(&str, TypeId)] = &[
        ("bool", TypeId::BOOL),
        ("uint8", TypeId::UINT8),
        ("uint16", TypeId::UINT16),
        ("uint32", TypeId::UINT32),
        ("uint64", TypeId::UINT64),
        ("int8", TypeId::INT8),
        ("int16", TypeId::INT16),
        ("int32", TypeId::INT32),
        ("int64", TypeId::INT64),
        ("float32", TypeId::FLOAT32),
        ("float64", TypeId::FLOAT64),
        ("complex64", TypeId::COMPLEX64),
        ("complex128", TypeId::COMPLEX128),
        ("uint", TypeId::UINT),
        ("int", TypeId::INT),
        ("uintptr", TypeId::UINTPTR),
        ("string", TypeId::STRING),
    ];
    for &(name, prim) in primitives {
        // Predeclared type names are named types over the builtin scalars.
        let named = ctx.types.named_with_underlying(name, prim);
        let id = ctx.symbols.alloc(name, span, SymbolKind::Type(named));
        scopes
            .enter(name, id)
            .expect("predeclared block entered twice");
    }
    // `byte` and `rune` alias uint8 and int32.
    for (alias, of) in [("byte", "uint8"), ("rune", "int32")] {
        let target = scopes.find(of).expect("alias target is predeclared");
        let ty = match ctx.symbols.get(target).kind {
            SymbolKind::Type(t) => t,
            _ => unreachable!(),
        };
        let id = ctx.symbols.alloc(alias, span, SymbolKind::Type(ty));
        scopes.enter(alias, id).expect("alias entered twice");
    }

    let constants: &[(&str, TypeId, Value)] = &[
        ("true", TypeId::UNTYPED_BOOLEAN, Value::Boolean(true)),
        ("false", TypeId::UNTYPED_BOOLEAN, Value::Boolean(false)),
        ("nil", TypeId::NIL, Value::Nil),
    ];
    for (name, ty, value) in constants {
        let id = ctx.symbols.alloc(
            *name,
            span,
            SymbolKind::Constant {
                ty: *ty,
                value: value.clone(),
            },
        );
        scopes.enter(name, id).expect("constant entered twice");
    }

    let templates: &[(&str, TemplateKind)] = &[
        ("new", TemplateKind::New),
        ("move", TemplateKind::Move),
        ("merge", TemplateKind::Merge),
        ("copy", TemplateKind::Copy),
        ("len", TemplateKind::Len),
        ("append", TemplateKind::Append),
        ("println", TemplateKind::Println),
    ];
    for &(name, kind) in templates {
        let id = ctx.symbols.alloc(name, span, SymbolKind::Template(kind));
        scopes.enter(name, id).expect("template entered twice");
    }
}

/// Enter an undefined placeholder for every top-level type, constant,
/// function, and instance, detecting redefinitions in the package scope.
///
/// Member callables (methods, initializers, getters, actions, reactions,
/// binds) are installed on their receiver types during declaration
/// processing, not here.
pub fn enter_symbols(
    ctx: &mut Context,
    scopes: &mut Scopes,
    program: &Program,
    reporter: &mut ErrorReporter,
) {
    // The package scope sits above the predeclared block, so user names may
    // shadow predeclared ones.
    scopes.open();

    for decl in &program.decls {
        let (name, span, kind) = match decl {
            Decl::Type(d) => (&d.name, d.span, UndefinedKind::Type),
            Decl::Const(d) => (&d.name, d.span, UndefinedKind::Constant),
            Decl::Function(d) => (&d.name, d.span, UndefinedKind::Function),
            Decl::Instance(d) => (&d.name, d.span, UndefinedKind::Instance),
            _ => continue,
        };
        let id = ctx.symbols.alloc(name, span, SymbolKind::Undefined(kind));
        if let Err(existing) = scopes.enter(name, id) {
            let first = ctx.symbols.get(existing).span;
            reporter.report(
                CompileError::new(
                    ErrorCode::Redefined,
                    span,
                    format!("'{}' is already defined in this scope", name),
                )
                .with_note(format!("first defined at line {}", first.line)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    #[test]
    fn predeclared_names_resolve() {
        let mut ctx = Context::new();
        let mut scopes = Scopes::new();
        install_predeclared(&mut ctx, &mut scopes);

        for name in ["int", "bool", "string", "true", "nil", "new", "println", "byte"] {
            assert!(scopes.find(name).is_some(), "missing predeclared '{}'", name);
        }
        // Predeclared type names are named types.
        let int_sym = scopes.find("int").unwrap();
        match ctx.symbols.get(int_sym).kind {
            SymbolKind::Type(t) => {
                assert_eq!(ctx.types.strip(t), TypeId::INT);
                assert_ne!(t, TypeId::INT);
            }
            _ => panic!("expected type symbol"),
        }
    }

    #[test]
    fn duplicate_top_level_names_are_reported() {
        let program = parse_source("type A int\ntype A uint", 0).unwrap();
        let mut ctx = Context::new();
        let mut scopes = Scopes::new();
        let mut reporter = ErrorReporter::new();
        install_predeclared(&mut ctx, &mut scopes);
        enter_symbols(&mut ctx, &mut scopes, &program, &mut reporter);
        assert!(reporter.has(ErrorCode::Redefined));
    }

    #[test]
    fn user_names_may_shadow_predeclared() {
        let program = parse_source("type int uint8", 0).unwrap();
        let mut ctx = Context::new();
        let mut scopes = Scopes::new();
        let mut reporter = ErrorReporter::new();
        install_predeclared(&mut ctx, &mut scopes);
        enter_symbols(&mut ctx, &mut scopes, &program, &mut reporter);
        assert_eq!(reporter.count(), 0);
    }
}
