//! Type arena, interning, and layout queries.

use super::{
    align_up, FunctionKind, FunctionType, MethodType, NamedType, StructType, TypeId, TypeKind,
    TypeLevel,
};
use crate::decl::{ActionId, BindId, GetterId, InitializerId, MethodId, ReactionId};
use std::collections::HashMap;

impl TypeId {
    pub const NIL: TypeId = TypeId(0);
    pub const UNTYPED_BOOLEAN: TypeId = TypeId(1);
    pub const UNTYPED_RUNE: TypeId = TypeId(2);
    pub const UNTYPED_INTEGER: TypeId = TypeId(3);
    pub const UNTYPED_FLOAT: TypeId = TypeId(4);
    pub const UNTYPED_COMPLEX: TypeId = TypeId(5);
    pub const UNTYPED_STRING: TypeId = TypeId(6);
    pub const VOID: TypeId = TypeId(7);
    pub const BOOL: TypeId = TypeId(8);
    pub const UINT8: TypeId = TypeId(9);
    pub const UINT16: TypeId = TypeId(10);
    pub const UINT32: TypeId = TypeId(11);
    pub const UINT64: TypeId = TypeId(12);
    pub const INT8: TypeId = TypeId(13);
    pub const INT16: TypeId = TypeId(14);
    pub const INT32: TypeId = TypeId(15);
    pub const INT64: TypeId = TypeId(16);
    pub const FLOAT32: TypeId = TypeId(17);
    pub const FLOAT64: TypeId = TypeId(18);
    pub const COMPLEX64: TypeId = TypeId(19);
    pub const COMPLEX128: TypeId = TypeId(20);
    pub const UINT: TypeId = TypeId(21);
    pub const INT: TypeId = TypeId(22);
    pub const UINTPTR: TypeId = TypeId(23);
    pub const STRING: TypeId = TypeId(24);
}

const WORD: usize = 8;

/// Canonical owner of all types in a compilation.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    entries: Vec<TypeKind>,
    pointers: HashMap<TypeId, TypeId>,
    slices: HashMap<TypeId, TypeId>,
    heaps: HashMap<TypeId, TypeId>,
    arrays: HashMap<(i64, TypeId), TypeId>,
    maps: HashMap<(TypeId, TypeId), TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self::default();
        // Seed order must match the TypeId constants above.
        for kind in [
            TypeKind::Nil,
            TypeKind::UntypedBoolean,
            TypeKind::UntypedRune,
            TypeKind::UntypedInteger,
            TypeKind::UntypedFloat,
            TypeKind::UntypedComplex,
            TypeKind::UntypedString,
            TypeKind::Void,
            TypeKind::Bool,
            TypeKind::Uint8,
            TypeKind::Uint16,
            TypeKind::Uint32,
            TypeKind::Uint64,
            TypeKind::Int8,
            TypeKind::Int16,
            TypeKind::Int32,
            TypeKind::Int64,
            TypeKind::Float32,
            TypeKind::Float64,
            TypeKind::Complex64,
            TypeKind::Complex128,
            TypeKind::Uint,
            TypeKind::Int,
            TypeKind::Uintptr,
            TypeKind::String,
        ] {
            registry.entries.push(kind);
        }
        registry
    }

    fn push(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.entries.len() as u32);
        self.entries.push(kind);
        id
    }

    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.entries[id.index()]
    }

    pub(crate) fn kind_mut(&mut self, id: TypeId) -> &mut TypeKind {
        &mut self.entries[id.index()]
    }

    // === Derived type constructors (idempotent) ===

    pub fn pointer_to(&mut self, base: TypeId) -> TypeId {
        if let Some(&id) = self.pointers.get(&base) {
            return id;
        }
        let id = self.push(TypeKind::Pointer { base });
        self.pointers.insert(base, id);
        id
    }

    pub fn slice_of(&mut self, base: TypeId) -> TypeId {
        if let Some(&id) = self.slices.get(&base) {
            return id;
        }
        let id = self.push(TypeKind::Slice { base });
        self.slices.insert(base, id);
        id
    }

    pub fn heap_of(&mut self, base: TypeId) -> TypeId {
        if let Some(&id) = self.heaps.get(&base) {
            return id;
        }
        let id = self.push(TypeKind::Heap { base });
        self.heaps.insert(base, id);
        id
    }

    pub fn array_of(&mut self, dimension: i64, base: TypeId) -> TypeId {
        if let Some(&id) = self.arrays.get(&(dimension, base)) {
            return id;
        }
        let id = self.push(TypeKind::Array { dimension, base });
        self.arrays.insert((dimension, base), id);
        id
    }

    pub fn map_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        if let Some(&id) = self.maps.get(&(key, value)) {
            return id;
        }
        let id = self.push(TypeKind::Map { key, value });
        self.maps.insert((key, value), id);
        id
    }

    // === Composite constructors ===

    pub fn struct_type(&mut self, body: StructType) -> TypeId {
        self.push(TypeKind::Struct(body))
    }

    /// A component body; the hidden runtime back-pointer is installed as the
    /// first field.
    pub fn new_component(&self) -> StructType {
        let mut body = StructType::default();
        body.append_field("<runtime>".to_string(), TypeId::UINTPTR, WORD, WORD, None, true);
        body
    }

    pub fn component_type(&mut self, body: StructType) -> TypeId {
        self.push(TypeKind::Component(body))
    }

    pub fn function_type(&mut self, func: FunctionType) -> TypeId {
        self.push(TypeKind::Function(func))
    }

    pub fn method_type(&mut self, method: MethodType) -> TypeId {
        self.push(TypeKind::Method(method))
    }

    // === Named types ===

    /// A fresh named type with no definition yet.
    pub fn named(&mut self, name: impl Into<String>) -> TypeId {
        self.push(TypeKind::Named(NamedType {
            name: name.into(),
            ..NamedType::default()
        }))
    }

    /// A named type over an already-resolved underlying type.
    pub fn named_with_underlying(&mut self, name: impl Into<String>, underlying: TypeId) -> TypeId {
        let id = self.named(name);
        self.set_underlying(id, underlying);
        id
    }

    /// Install the definition of a named type.
    ///
    /// Naming a named type collapses to its underlying, so the stored
    /// underlying type always has level `Unnamed`.
    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        let underlying = self.strip(underlying);
        debug_assert!(self.level(underlying) == TypeLevel::Unnamed);
        match self.kind_mut(named) {
            TypeKind::Named(n) => n.underlying = Some(underlying),
            _ => panic!("set_underlying on a non-named type"),
        }
    }

    pub fn named_type(&self, id: TypeId) -> Option<&NamedType> {
        match self.kind(id) {
            TypeKind::Named(n) => Some(n),
            _ => None,
        }
    }

    pub(crate) fn named_type_mut(&mut self, id: TypeId) -> Option<&mut NamedType> {
        match self.kind_mut(id) {
            TypeKind::Named(n) => Some(n),
            _ => None,
        }
    }

    /// Install a member callable on a named type. Returns false when the name
    /// is already taken in the relevant table.
    pub fn install_method(&mut self, named: TypeId, name: &str, id: MethodId) -> bool {
        let n = self.named_type_mut(named).expect("named type");
        n.methods.insert(name.to_string(), id).is_none()
    }

    pub fn install_initializer(&mut self, named: TypeId, name: &str, id: InitializerId) -> bool {
        let n = self.named_type_mut(named).expect("named type");
        n.initializers.insert(name.to_string(), id).is_none()
    }

    pub fn install_getter(&mut self, named: TypeId, name: &str, id: GetterId) -> bool {
        let n = self.named_type_mut(named).expect("named type");
        n.getters.insert(name.to_string(), id).is_none()
    }

    pub fn install_reaction(&mut self, named: TypeId, name: &str, id: ReactionId) -> bool {
        let n = self.named_type_mut(named).expect("named type");
        n.reactions.insert(name.to_string(), id).is_none()
    }

    pub fn install_action(&mut self, named: TypeId, id: ActionId) {
        let n = self.named_type_mut(named).expect("named type");
        n.actions.push(id);
    }

    pub fn install_bind(&mut self, named: TypeId, id: BindId) {
        let n = self.named_type_mut(named).expect("named type");
        n.binds.push(id);
    }

    // === Level navigation ===

    pub fn level(&self, id: TypeId) -> TypeLevel {
        match self.kind(id) {
            TypeKind::Nil
            | TypeKind::UntypedBoolean
            | TypeKind::UntypedRune
            | TypeKind::UntypedInteger
            | TypeKind::UntypedFloat
            | TypeKind::UntypedComplex
            | TypeKind::UntypedString => TypeLevel::Untyped,
            TypeKind::Named(_) => TypeLevel::Named,
            _ => TypeLevel::Unnamed,
        }
    }

    pub fn is_untyped(&self, id: TypeId) -> bool {
        self.level(id) == TypeLevel::Untyped
    }

    /// Unwrap one named layer; idempotent on unnamed and untyped types.
    pub fn strip(&self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Named(n) => n.underlying.unwrap_or(TypeId::VOID),
            _ => id,
        }
    }

    /// The structural form below any named layer.
    pub fn underlying_kind(&self, id: TypeId) -> &TypeKind {
        self.kind(self.strip(id))
    }

    /// The typed type an untyped literal defaults to when the context forces
    /// one; identity on all other types.
    pub fn default_type(&self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::UntypedBoolean => TypeId::BOOL,
            TypeKind::UntypedRune => TypeId::INT32,
            TypeKind::UntypedInteger => TypeId::INT,
            TypeKind::UntypedFloat => TypeId::FLOAT64,
            TypeKind::UntypedComplex => TypeId::COMPLEX128,
            TypeKind::UntypedString => TypeId::STRING,
            _ => id,
        }
    }

    // === Layout ===

    pub fn size(&self, id: TypeId) -> usize {
        match self.kind(id) {
            TypeKind::Nil
            | TypeKind::UntypedBoolean
            | TypeKind::UntypedRune
            | TypeKind::UntypedInteger
            | TypeKind::UntypedFloat
            | TypeKind::UntypedComplex
            | TypeKind::UntypedString
            | TypeKind::Void
            | TypeKind::Heap { .. } => 0,
            TypeKind::Bool | TypeKind::Uint8 | TypeKind::Int8 => 1,
            TypeKind::Uint16 | TypeKind::Int16 => 2,
            TypeKind::Uint32 | TypeKind::Int32 | TypeKind::Float32 => 4,
            TypeKind::Uint64
            | TypeKind::Int64
            | TypeKind::Float64
            | TypeKind::Complex64
            | TypeKind::Uint
            | TypeKind::Int
            | TypeKind::Uintptr => WORD,
            TypeKind::Complex128 => 16,
            TypeKind::String => 2 * WORD,
            TypeKind::Struct(s) | TypeKind::Component(s) => s.size,
            TypeKind::Array { dimension, base } => {
                self.unit_size(*base) * (*dimension).max(0) as usize
            }
            TypeKind::Slice { .. } => 3 * WORD,
            TypeKind::Pointer { .. } | TypeKind::Map { .. } | TypeKind::Method(_) => WORD,
            TypeKind::Function(f) => {
                if f.kind == FunctionKind::PullPort {
                    2 * WORD
                } else {
                    WORD
                }
            }
            TypeKind::Named(n) => n.underlying.map_or(0, |u| self.size(u)),
        }
    }

    pub fn alignment(&self, id: TypeId) -> usize {
        match self.kind(id) {
            TypeKind::Bool | TypeKind::Uint8 | TypeKind::Int8 => 1,
            TypeKind::Uint16 | TypeKind::Int16 => 2,
            TypeKind::Uint32 | TypeKind::Int32 | TypeKind::Float32 => 4,
            TypeKind::Struct(s) | TypeKind::Component(s) => s.alignment.max(1),
            TypeKind::Array { base, .. } => self.alignment(*base),
            TypeKind::Named(n) => n.underlying.map_or(1, |u| self.alignment(u)),
            _ => WORD,
        }
    }

    /// Element stride of an array or slice of `base`.
    pub fn unit_size(&self, base: TypeId) -> usize {
        align_up(self.size(base), self.alignment(base))
    }

    // === Display ===

    /// Human-readable form for diagnostics.
    pub fn type_string(&self, id: TypeId) -> String {
        match self.kind(id) {
            TypeKind::Nil => "untyped nil".to_string(),
            TypeKind::UntypedBoolean => "untyped boolean".to_string(),
            TypeKind::UntypedRune => "untyped rune".to_string(),
            TypeKind::UntypedInteger => "untyped integer".to_string(),
            TypeKind::UntypedFloat => "untyped float".to_string(),
            TypeKind::UntypedComplex => "untyped complex".to_string(),
            TypeKind::UntypedString => "untyped string".to_string(),
            TypeKind::Void => "void".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Uint8 => "uint8".to_string(),
            TypeKind::Uint16 => "uint16".to_string(),
            TypeKind::Uint32 => "uint32".to_string(),
            TypeKind::Uint64 => "uint64".to_string(),
            TypeKind::Int8 => "int8".to_string(),
            TypeKind::Int16 => "int16".to_string(),
            TypeKind::Int32 => "int32".to_string(),
            TypeKind::Int64 => "int64".to_string(),
            TypeKind::Float32 => "float32".to_string(),
            TypeKind::Float64 => "float64".to_string(),
            TypeKind::Complex64 => "complex64".to_string(),
            TypeKind::Complex128 => "complex128".to_string(),
            TypeKind::Uint => "uint".to_string(),
            TypeKind::Int => "int".to_string(),
            TypeKind::Uintptr => "uintptr".to_string(),
            TypeKind::String => "string".to_string(),
            TypeKind::Struct(s) => self.struct_string("struct", s),
            TypeKind::Component(s) => self.struct_string("component", s),
            TypeKind::Array { dimension, base } => {
                format!("[{}]{}", dimension, self.type_string(*base))
            }
            TypeKind::Slice { base } => format!("[]{}", self.type_string(*base)),
            TypeKind::Pointer { base } => format!("*{}", self.type_string(*base)),
            TypeKind::Heap { base } => format!("heap {}", self.type_string(*base)),
            TypeKind::Map { key, value } => format!(
                "map[{}]{}",
                self.type_string(*key),
                self.type_string(*value)
            ),
            TypeKind::Function(f) => self.function_string(f),
            TypeKind::Method(m) => format!(
                "method ({}) {}",
                self.type_string(m.receiver.ty),
                self.signature_string(&m.parameters, m.return_type)
            ),
            TypeKind::Named(n) => n.name.clone(),
        }
    }

    fn struct_string(&self, keyword: &str, s: &StructType) -> String {
        let fields: Vec<String> = s
            .fields
            .iter()
            .filter(|f| !f.hidden)
            .map(|f| format!("{} {}", f.name, self.type_string(f.ty)))
            .collect();
        format!("{} {{ {} }}", keyword, fields.join("; "))
    }

    fn function_string(&self, f: &FunctionType) -> String {
        let keyword = match f.kind {
            FunctionKind::Function => "func",
            FunctionKind::PushPort => "push",
            FunctionKind::PullPort => "pull",
        };
        format!(
            "{}{}",
            keyword,
            self.signature_string(&f.parameters, f.return_type)
        )
    }

    fn signature_string(&self, parameters: &[super::Parameter], return_type: TypeId) -> String {
        let params: Vec<String> = parameters
            .iter()
            .map(|p| self.type_string(p.ty))
            .collect();
        if return_type == TypeId::VOID {
            format!("({})", params.join(", "))
        } else {
            format!("({}) {}", params.join(", "), self.type_string(return_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::Mutability;
    use crate::types::Parameter;

    #[test]
    fn derived_types_are_interned() {
        let mut reg = TypeRegistry::new();
        let p1 = reg.pointer_to(TypeId::INT);
        let p2 = reg.pointer_to(TypeId::INT);
        assert_eq!(p1, p2);

        let a1 = reg.array_of(4, TypeId::INT);
        let a2 = reg.array_of(4, TypeId::INT);
        let a3 = reg.array_of(5, TypeId::INT);
        assert_eq!(a1, a2);
        assert_ne!(a1, a3);

        let s1 = reg.slice_of(TypeId::UINT8);
        let s2 = reg.slice_of(TypeId::UINT8);
        assert_eq!(s1, s2);

        let h1 = reg.heap_of(TypeId::INT);
        let h2 = reg.heap_of(TypeId::INT);
        assert_eq!(h1, h2);
    }

    #[test]
    fn named_of_named_collapses() {
        let mut reg = TypeRegistry::new();
        let a = reg.named_with_underlying("A", TypeId::INT);
        let b = reg.named("B");
        reg.set_underlying(b, a);
        assert_eq!(reg.strip(b), TypeId::INT);
        assert_eq!(reg.strip(a), TypeId::INT);
    }

    #[test]
    fn default_types_of_untyped_literals() {
        let reg = TypeRegistry::new();
        assert_eq!(reg.default_type(TypeId::UNTYPED_INTEGER), TypeId::INT);
        assert_eq!(reg.default_type(TypeId::UNTYPED_RUNE), TypeId::INT32);
        assert_eq!(reg.default_type(TypeId::UNTYPED_FLOAT), TypeId::FLOAT64);
        assert_eq!(reg.default_type(TypeId::INT16), TypeId::INT16);
    }

    #[test]
    fn sizes_and_alignment() {
        let mut reg = TypeRegistry::new();
        assert_eq!(reg.size(TypeId::UINT8), 1);
        assert_eq!(reg.size(TypeId::COMPLEX128), 16);
        assert_eq!(reg.size(TypeId::STRING), 16);
        let slice = reg.slice_of(TypeId::INT);
        assert_eq!(reg.size(slice), 24);
        let arr = reg.array_of(3, TypeId::INT32);
        assert_eq!(reg.size(arr), 12);
        assert_eq!(reg.alignment(arr), 4);
    }

    #[test]
    fn component_carries_hidden_runtime_field() {
        let mut reg = TypeRegistry::new();
        let mut body = reg.new_component();
        body.append_field("count".to_string(), TypeId::UINT, 8, 8, None, false);
        let c = reg.component_type(body);
        match reg.kind(c) {
            TypeKind::Component(s) => {
                assert!(s.fields[0].hidden);
                assert_eq!(s.fields[1].offset, 8);
                assert_eq!(s.size, 16);
            }
            _ => panic!("expected component"),
        }
    }

    #[test]
    fn type_strings() {
        let mut reg = TypeRegistry::new();
        let p = reg.pointer_to(TypeId::INT);
        let h = reg.heap_of(TypeId::INT);
        assert_eq!(reg.type_string(p), "*int");
        assert_eq!(reg.type_string(h), "heap int");
        let f = reg.function_type(FunctionType {
            kind: FunctionKind::PushPort,
            parameters: vec![Parameter {
                name: "n".to_string(),
                ty: TypeId::INT,
                indirection: Mutability::Mutable,
            }],
            return_type: TypeId::VOID,
            return_indirection: Mutability::Mutable,
        });
        assert_eq!(reg.type_string(f), "push(int)");
    }
}
