//! Symbols and lexical scopes.
//!
//! Symbols live in a [`SymbolArena`] addressed by [`SymbolId`]; the scope
//! structure is a separate stack of name → id maps ([`Scopes`]) rooted at the
//! predeclared block. Shadowing across scopes is allowed; re-declaring within
//! one scope is an error the caller reports.

use crate::decl::{FunctionId, InstanceId};
use crate::foundation::{Mutability, Span};
use crate::types::TypeId;
use crate::value::Value;
use indexmap::IndexMap;

/// Handle to a symbol in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The role of a parameter symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Ordinary,
    Receiver,
    Return,
    /// The receiver re-entered inside an `activate` body with write access.
    ReceiverDuplicate,
    /// A pointer-bearing binding re-entered inside a `change` body with its
    /// indirection demoted to foreign.
    OrdinaryDuplicate,
}

/// What a name denotes.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    Type(TypeId),
    Constant {
        ty: TypeId,
        value: Value,
    },
    Variable {
        ty: TypeId,
        intrinsic: Mutability,
        indirection: Mutability,
    },
    Parameter {
        kind: ParameterKind,
        ty: TypeId,
        intrinsic: Mutability,
        indirection: Mutability,
    },
    Function(FunctionId),
    Instance(InstanceId),
    Template(TemplateKind),
    /// A binding that exists but may not be referenced in the current
    /// context (pointer parameters inside an `activate` body).
    Hidden,
    /// Placeholder installed by the enter-symbols pass, replaced during
    /// declaration processing.
    Undefined(UndefinedKind),
}

/// Built-in polymorphic callables installed in the predeclared block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    New,
    Move,
    Merge,
    Copy,
    Len,
    Append,
    Println,
}

/// What an undefined placeholder will become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedKind {
    Type,
    Function,
    Instance,
    Constant,
}

/// One named entity.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub span: Span,
    pub kind: SymbolKind,
    /// Stack offset, filled by frame allocation.
    pub offset: usize,
}

/// Owner of all symbols in a compilation.
#[derive(Debug, Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: impl Into<String>, span: Span, kind: SymbolKind) -> SymbolId {
        let id = SymbolId(u32::try_from(self.symbols.len()).expect("symbol arena overflow"));
        self.symbols.push(Symbol {
            name: name.into(),
            span,
            kind,
            offset: 0,
        });
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }
}

/// Lexical scope stack.
///
/// The bottom scope is the predeclared block; `open`/`close` bracket nested
/// blocks. `find` walks ancestors; `find_current` inspects only the top.
#[derive(Debug, Default)]
pub struct Scopes {
    stack: Vec<IndexMap<String, SymbolId>>,
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            stack: vec![IndexMap::new()],
        }
    }

    pub fn open(&mut self) {
        self.stack.push(IndexMap::new());
    }

    pub fn close(&mut self) {
        assert!(self.stack.len() > 1, "cannot close the predeclared block");
        self.stack.pop();
    }

    /// Install a symbol in the current scope.
    ///
    /// Fails with the existing id when the name is already bound locally.
    pub fn enter(&mut self, name: &str, id: SymbolId) -> Result<(), SymbolId> {
        let scope = self.stack.last_mut().expect("scope stack is never empty");
        if let Some(&existing) = scope.get(name) {
            return Err(existing);
        }
        scope.insert(name.to_string(), id);
        Ok(())
    }

    /// Install a symbol, replacing any binding of the same name in the
    /// current scope (used for duplicates in `activate`/`change` bodies).
    pub fn enter_shadowing(&mut self, name: &str, id: SymbolId) {
        let scope = self.stack.last_mut().expect("scope stack is never empty");
        scope.insert(name.to_string(), id);
    }

    /// Look the name up in the current scope only.
    pub fn find_current(&self, name: &str) -> Option<SymbolId> {
        self.stack.last().and_then(|s| s.get(name)).copied()
    }

    /// Look the name up in the current scope and all ancestors.
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// All bindings visible from the current scope, innermost first, without
    /// shadowed duplicates.
    pub fn visible(&self) -> Vec<(String, SymbolId)> {
        let mut seen = indexmap::IndexSet::new();
        let mut out = Vec::new();
        for scope in self.stack.iter().rev() {
            for (name, &id) in scope {
                if seen.insert(name.clone()) {
                    out.push((name.clone(), id));
                }
            }
        }
        out
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::zero(0)
    }

    #[test]
    fn enter_rejects_same_scope_duplicates() {
        let mut arena = SymbolArena::new();
        let mut scopes = Scopes::new();
        let a = arena.alloc("x", span(), SymbolKind::Type(TypeId::INT));
        let b = arena.alloc("x", span(), SymbolKind::Type(TypeId::UINT));
        assert!(scopes.enter("x", a).is_ok());
        assert_eq!(scopes.enter("x", b), Err(a));
    }

    #[test]
    fn shadowing_across_scopes() {
        let mut arena = SymbolArena::new();
        let mut scopes = Scopes::new();
        let outer = arena.alloc("x", span(), SymbolKind::Type(TypeId::INT));
        scopes.enter("x", outer).unwrap();
        scopes.open();
        let inner = arena.alloc("x", span(), SymbolKind::Type(TypeId::UINT));
        scopes.enter("x", inner).unwrap();
        assert_eq!(scopes.find("x"), Some(inner));
        assert_eq!(scopes.find_current("x"), Some(inner));
        scopes.close();
        assert_eq!(scopes.find("x"), Some(outer));
    }

    #[test]
    fn visible_skips_shadowed_bindings() {
        let mut arena = SymbolArena::new();
        let mut scopes = Scopes::new();
        let outer = arena.alloc("x", span(), SymbolKind::Type(TypeId::INT));
        let other = arena.alloc("y", span(), SymbolKind::Type(TypeId::INT));
        scopes.enter("x", outer).unwrap();
        scopes.enter("y", other).unwrap();
        scopes.open();
        let inner = arena.alloc("x", span(), SymbolKind::Type(TypeId::UINT));
        scopes.enter("x", inner).unwrap();

        let visible = scopes.visible();
        assert!(visible.contains(&("x".to_string(), inner)));
        assert!(visible.contains(&("y".to_string(), other)));
        assert!(!visible.contains(&("x".to_string(), outer)));
    }
}
