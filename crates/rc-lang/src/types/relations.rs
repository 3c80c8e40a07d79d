//! Type predicates, equality, selection, and the heap operations.

use super::{FunctionKind, TypeId, TypeKind, TypeLevel, TypeRegistry};
use crate::decl::{GetterId, InitializerId, MethodId, ReactionId};

/// Result of selecting a name on a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Member {
    Field {
        index: usize,
        offset: usize,
        ty: TypeId,
    },
    Method(MethodId),
    Initializer(InitializerId),
    Getter(GetterId),
    Reaction(ReactionId),
}

impl TypeRegistry {
    /// Two types are identical when they are the same object, or neither is
    /// named and their structural forms match element-wise. Two named types
    /// are identical only when they are the same object.
    pub fn identical(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Named(_), _) | (_, TypeKind::Named(_)) => false,
            (TypeKind::Pointer { base: a }, TypeKind::Pointer { base: b })
            | (TypeKind::Slice { base: a }, TypeKind::Slice { base: b })
            | (TypeKind::Heap { base: a }, TypeKind::Heap { base: b }) => self.identical(*a, *b),
            (
                TypeKind::Array {
                    dimension: d1,
                    base: a,
                },
                TypeKind::Array {
                    dimension: d2,
                    base: b,
                },
            ) => d1 == d2 && self.identical(*a, *b),
            (TypeKind::Map { key: k1, value: v1 }, TypeKind::Map { key: k2, value: v2 }) => {
                self.identical(*k1, *k2) && self.identical(*v1, *v2)
            }
            (TypeKind::Struct(s1), TypeKind::Struct(s2))
            | (TypeKind::Component(s1), TypeKind::Component(s2)) => {
                s1.fields.len() == s2.fields.len()
                    && s1.fields.iter().zip(&s2.fields).all(|(f1, f2)| {
                        f1.name == f2.name && f1.tag == f2.tag && self.identical(f1.ty, f2.ty)
                    })
            }
            (TypeKind::Function(f1), TypeKind::Function(f2)) => {
                f1.kind == f2.kind
                    && self.identical_signature(
                        &f1.parameters,
                        f1.return_type,
                        &f2.parameters,
                        f2.return_type,
                    )
            }
            (TypeKind::Method(m1), TypeKind::Method(m2)) => {
                m1.kind == m2.kind
                    && self.identical(m1.receiver.ty, m2.receiver.ty)
                    && self.identical_signature(
                        &m1.parameters,
                        m1.return_type,
                        &m2.parameters,
                        m2.return_type,
                    )
            }
            _ => false,
        }
    }

    /// Element-wise signature equality, ignoring parameter names.
    pub fn identical_signature(
        &self,
        params1: &[super::Parameter],
        ret1: TypeId,
        params2: &[super::Parameter],
        ret2: TypeId,
    ) -> bool {
        params1.len() == params2.len()
            && params1
                .iter()
                .zip(params2)
                .all(|(p1, p2)| self.identical(p1.ty, p2.ty))
            && self.identical(ret1, ret2)
    }

    /// Select a field or member callable by name.
    ///
    /// Follows one named layer, and walks through a pointer to its base.
    pub fn select_member(&self, id: TypeId, name: &str) -> Option<Member> {
        match self.kind(id) {
            TypeKind::Named(n) => {
                if let Some(&m) = n.methods.get(name) {
                    return Some(Member::Method(m));
                }
                if let Some(&i) = n.initializers.get(name) {
                    return Some(Member::Initializer(i));
                }
                if let Some(&g) = n.getters.get(name) {
                    return Some(Member::Getter(g));
                }
                if let Some(&r) = n.reactions.get(name) {
                    return Some(Member::Reaction(r));
                }
                self.select_member(n.underlying?, name)
            }
            TypeKind::Pointer { base } => self.select_member(*base, name),
            TypeKind::Struct(s) | TypeKind::Component(s) => {
                let (index, field) = s
                    .fields
                    .iter()
                    .enumerate()
                    .find(|(_, f)| !f.hidden && f.name == name)?;
                Some(Member::Field {
                    index,
                    offset: field.offset,
                    ty: field.ty,
                })
            }
            _ => None,
        }
    }

    // === Heap operations ===

    /// `move` on a `*heap T` yields `*T`; anything else is rejected.
    pub fn move_type(&mut self, id: TypeId) -> Option<TypeId> {
        let heap_base = self.heap_pointer_base(id)?;
        Some(self.pointer_to(heap_base))
    }

    /// `merge` has the same shape as `move`.
    pub fn merge_type(&mut self, id: TypeId) -> Option<TypeId> {
        self.move_type(id)
    }

    /// `change` exposes the root of a `*heap T` as a `*T` inside its block.
    pub fn change_type(&mut self, id: TypeId) -> Option<TypeId> {
        self.move_type(id)
    }

    /// The `T` in `*heap T`, if `id` has that shape.
    pub fn heap_pointer_base(&self, id: TypeId) -> Option<TypeId> {
        match self.underlying_kind(id) {
            TypeKind::Pointer { base } => match self.underlying_kind(*base) {
                TypeKind::Heap { base } => Some(*base),
                _ => None,
            },
            _ => None,
        }
    }

    // === Predicates (all look through the named layer) ===

    pub fn is_numeric(&self, id: TypeId) -> bool {
        matches!(
            self.underlying_kind(id),
            TypeKind::UntypedRune
                | TypeKind::UntypedInteger
                | TypeKind::UntypedFloat
                | TypeKind::UntypedComplex
                | TypeKind::Uint8
                | TypeKind::Uint16
                | TypeKind::Uint32
                | TypeKind::Uint64
                | TypeKind::Int8
                | TypeKind::Int16
                | TypeKind::Int32
                | TypeKind::Int64
                | TypeKind::Float32
                | TypeKind::Float64
                | TypeKind::Complex64
                | TypeKind::Complex128
                | TypeKind::Uint
                | TypeKind::Int
                | TypeKind::Uintptr
        )
    }

    pub fn is_integral(&self, id: TypeId) -> bool {
        matches!(
            self.underlying_kind(id),
            TypeKind::UntypedRune
                | TypeKind::UntypedInteger
                | TypeKind::Uint8
                | TypeKind::Uint16
                | TypeKind::Uint32
                | TypeKind::Uint64
                | TypeKind::Int8
                | TypeKind::Int16
                | TypeKind::Int32
                | TypeKind::Int64
                | TypeKind::Uint
                | TypeKind::Int
                | TypeKind::Uintptr
        )
    }

    pub fn is_unsigned(&self, id: TypeId) -> bool {
        matches!(
            self.underlying_kind(id),
            TypeKind::Uint8
                | TypeKind::Uint16
                | TypeKind::Uint32
                | TypeKind::Uint64
                | TypeKind::Uint
                | TypeKind::Uintptr
        )
    }

    pub fn is_floating(&self, id: TypeId) -> bool {
        matches!(
            self.underlying_kind(id),
            TypeKind::UntypedFloat | TypeKind::Float32 | TypeKind::Float64
        )
    }

    pub fn is_complex(&self, id: TypeId) -> bool {
        matches!(
            self.underlying_kind(id),
            TypeKind::UntypedComplex | TypeKind::Complex64 | TypeKind::Complex128
        )
    }

    pub fn is_logical(&self, id: TypeId) -> bool {
        matches!(
            self.underlying_kind(id),
            TypeKind::UntypedBoolean | TypeKind::Bool
        )
    }

    pub fn is_string_type(&self, id: TypeId) -> bool {
        matches!(
            self.underlying_kind(id),
            TypeKind::UntypedString | TypeKind::String
        )
    }

    /// Types for which `==` / `!=` are defined.
    pub fn is_comparable(&self, id: TypeId) -> bool {
        self.is_numeric(id)
            || self.is_logical(id)
            || self.is_string_type(id)
            || matches!(
                self.underlying_kind(id),
                TypeKind::Pointer { .. } | TypeKind::Nil
            )
    }

    /// Types for which `<` and friends are defined.
    pub fn is_orderable(&self, id: TypeId) -> bool {
        (self.is_numeric(id) && !self.is_complex(id)) || self.is_string_type(id)
    }

    /// Whether a value of this type can hold a pointer into other storage.
    /// Drives the leak checks of the mutability lattice.
    pub fn contains_pointer(&self, id: TypeId) -> bool {
        match self.underlying_kind(id) {
            TypeKind::Pointer { .. } | TypeKind::Slice { .. } | TypeKind::Heap { .. } => true,
            TypeKind::Map { .. } => true,
            TypeKind::Function(f) => f.kind == FunctionKind::PullPort,
            TypeKind::Struct(s) | TypeKind::Component(s) => {
                s.fields.iter().any(|f| self.contains_pointer(f.ty))
            }
            TypeKind::Array { base, .. } => self.contains_pointer(*base),
            _ => false,
        }
    }

    /// Typed-to-typed convertibility. Untyped sources go through value
    /// representability instead.
    pub fn convertible(&self, to: TypeId, from: TypeId) -> bool {
        if self.identical(self.strip(to), self.strip(from)) {
            return true;
        }
        if self.is_numeric(to) && self.is_numeric(from) {
            return true;
        }
        // string <-> []uint8 / []int32
        let byte_or_rune_slice = |id: TypeId| match self.underlying_kind(id) {
            TypeKind::Slice { base } => {
                matches!(self.kind(*base), TypeKind::Uint8 | TypeKind::Int32)
            }
            _ => false,
        };
        (self.is_string_type(to) && byte_or_rune_slice(from))
            || (self.is_string_type(from) && byte_or_rune_slice(to))
    }

    /// Typed-to-typed assignability: identical, or equal underlying forms
    /// with at most one side named.
    pub fn assignable(&self, to: TypeId, from: TypeId) -> bool {
        if self.identical(to, from) {
            return true;
        }
        if self.level(to) == TypeLevel::Named && self.level(from) == TypeLevel::Named {
            return false;
        }
        self.identical(self.strip(to), self.strip(from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Mutability;
    use crate::types::{FunctionType, Parameter, StructType};

    fn param(ty: TypeId) -> Parameter {
        Parameter {
            name: "p".to_string(),
            ty,
            indirection: Mutability::Mutable,
        }
    }

    #[test]
    fn identical_follows_interning() {
        let mut reg = TypeRegistry::new();
        let p1 = reg.pointer_to(TypeId::INT);
        let p2 = reg.pointer_to(TypeId::INT);
        assert!(reg.identical(p1, p2));
        let q = reg.pointer_to(TypeId::UINT);
        assert!(!reg.identical(p1, q));
    }

    #[test]
    fn named_types_identical_only_to_themselves() {
        let mut reg = TypeRegistry::new();
        let a = reg.named_with_underlying("A", TypeId::INT);
        let b = reg.named_with_underlying("B", TypeId::INT);
        assert!(reg.identical(a, a));
        assert!(!reg.identical(a, b));
        assert!(!reg.identical(a, TypeId::INT));
        // R1: stripping a named type reaches the same unnamed form.
        assert!(reg.identical(reg.strip(a), reg.strip(TypeId::INT)));
    }

    #[test]
    fn function_types_compare_structurally() {
        let mut reg = TypeRegistry::new();
        let f1 = reg.function_type(FunctionType {
            kind: crate::types::FunctionKind::PushPort,
            parameters: vec![param(TypeId::INT)],
            return_type: TypeId::VOID,
            return_indirection: Mutability::Mutable,
        });
        let f2 = reg.function_type(FunctionType {
            kind: crate::types::FunctionKind::PushPort,
            parameters: vec![param(TypeId::INT)],
            return_type: TypeId::VOID,
            return_indirection: Mutability::Mutable,
        });
        let f3 = reg.function_type(FunctionType {
            kind: crate::types::FunctionKind::PushPort,
            parameters: vec![param(TypeId::UINT)],
            return_type: TypeId::VOID,
            return_indirection: Mutability::Mutable,
        });
        assert!(reg.identical(f1, f2));
        assert!(!reg.identical(f1, f3));
    }

    #[test]
    fn select_walks_named_and_pointer_layers() {
        let mut reg = TypeRegistry::new();
        let mut body = StructType::default();
        body.append_field("x".to_string(), TypeId::INT, 8, 8, None, false);
        let s = reg.struct_type(body);
        let named = reg.named_with_underlying("Point", s);
        let ptr = reg.pointer_to(named);

        match reg.select_member(named, "x") {
            Some(Member::Field { offset, ty, .. }) => {
                assert_eq!(offset, 0);
                assert_eq!(ty, TypeId::INT);
            }
            other => panic!("unexpected member: {:?}", other),
        }
        assert!(reg.select_member(ptr, "x").is_some());
        assert!(reg.select_member(named, "y").is_none());
    }

    #[test]
    fn heap_operations_require_pointer_to_heap() {
        let mut reg = TypeRegistry::new();
        let heap = reg.heap_of(TypeId::INT);
        let ptr_heap = reg.pointer_to(heap);
        let expect = reg.pointer_to(TypeId::INT);
        assert_eq!(reg.move_type(ptr_heap), Some(expect));
        assert_eq!(reg.merge_type(ptr_heap), Some(expect));
        assert_eq!(reg.change_type(ptr_heap), Some(expect));
        assert_eq!(reg.move_type(TypeId::INT), None);
        let plain_ptr = reg.pointer_to(TypeId::INT);
        assert_eq!(reg.move_type(plain_ptr), None);
    }

    #[test]
    fn predicates() {
        let mut reg = TypeRegistry::new();
        assert!(reg.is_numeric(TypeId::UNTYPED_RUNE));
        assert!(reg.is_integral(TypeId::UINTPTR));
        assert!(!reg.is_integral(TypeId::FLOAT32));
        assert!(reg.is_orderable(TypeId::STRING));
        assert!(!reg.is_orderable(TypeId::COMPLEX64));
        let p = reg.pointer_to(TypeId::INT);
        assert!(reg.is_comparable(p));
        assert!(!reg.is_orderable(p));
        assert!(reg.contains_pointer(p));
        let named = reg.named_with_underlying("N", TypeId::UINT8);
        assert!(reg.is_unsigned(named));
    }

    #[test]
    fn struct_containing_slice_contains_pointer() {
        let mut reg = TypeRegistry::new();
        let slice = reg.slice_of(TypeId::INT);
        let mut body = StructType::default();
        body.append_field("data".to_string(), slice, 24, 8, None, false);
        let s = reg.struct_type(body);
        assert!(reg.contains_pointer(s));
        assert!(!reg.contains_pointer(TypeId::STRING));
    }

    #[test]
    fn conversion_and_assignment_rules() {
        let mut reg = TypeRegistry::new();
        assert!(reg.convertible(TypeId::INT64, TypeId::FLOAT32));
        let bytes = reg.slice_of(TypeId::UINT8);
        assert!(reg.convertible(TypeId::STRING, bytes));
        assert!(reg.convertible(bytes, TypeId::STRING));
        assert!(!reg.convertible(TypeId::BOOL, TypeId::INT));

        let a = reg.named_with_underlying("A", TypeId::INT);
        let b = reg.named_with_underlying("B", TypeId::INT);
        assert!(reg.assignable(a, TypeId::INT));
        assert!(reg.assignable(TypeId::INT, a));
        assert!(!reg.assignable(a, b));
        assert!(reg.convertible(a, b));
    }
}
