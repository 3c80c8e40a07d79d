//! Constant values for folding and conversion.
//!
//! Values come in two flavors mirroring the type levels:
//!
//! - **untyped** constants hold the widest representation for their kind
//!   (rune = i32, integer = i128, float = f64, complex = two f64s);
//! - **typed** constants hold the bit-exact value of their typed type.
//!
//! Arithmetic on two untyped operands widens to the larger untyped kind per
//! the ordering `boolean < rune < integer < float < complex` (strings and
//! booleans only combine with themselves). Conversion of an untyped value to
//! a typed type fails when the value is not representable; explicit
//! conversion between typed integers wraps modulo 2^n.

use crate::types::{TypeId, TypeKind, TypeRegistry};

/// A compile-time constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    // Untyped flavors.
    Nil,
    Boolean(bool),
    Rune(i32),
    Integer(i128),
    Float(f64),
    Complex(f64, f64),
    String(String),

    // Typed flavors.
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    C64(f32, f32),
    C128(f64, f64),
    Uint(u64),
    Int(i64),
    Uintptr(u64),
    Str(String),
}

/// Binary arithmetic selector used by the constant folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    AndNot,
}

impl Value {
    /// Integral view of the value, if it has one.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Rune(r) => Some(*r as i128),
            Value::Integer(i) => Some(*i),
            Value::U8(v) => Some(*v as i128),
            Value::U16(v) => Some(*v as i128),
            Value::U32(v) => Some(*v as i128),
            Value::U64(v) => Some(*v as i128),
            Value::I8(v) => Some(*v as i128),
            Value::I16(v) => Some(*v as i128),
            Value::I32(v) => Some(*v as i128),
            Value::I64(v) => Some(*v as i128),
            Value::Uint(v) | Value::Uintptr(v) => Some(*v as i128),
            Value::Int(v) => Some(*v as i128),
            Value::Float(f) | Value::F64(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    Some(*f as i128)
                } else {
                    None
                }
            }
            Value::F32(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    Some(*f as i128)
                } else {
                    None
                }
            }
            Value::Complex(re, im) => {
                if *im == 0.0 && re.fract() == 0.0 {
                    Some(*re as i128)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Floating view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) | Value::F64(f) => Some(*f),
            Value::F32(f) => Some(*f as f64),
            Value::Complex(re, im) | Value::C128(re, im) => {
                if *im == 0.0 {
                    Some(*re)
                } else {
                    None
                }
            }
            Value::C64(re, im) => {
                if *im == 0.0 {
                    Some(*re as f64)
                } else {
                    None
                }
            }
            _ => self.as_i128().map(|i| i as f64),
        }
    }

    /// (re, im) view of the value, if it has one.
    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match self {
            Value::Complex(re, im) | Value::C128(re, im) => Some((*re, *im)),
            Value::C64(re, im) => Some((*re as f64, *im as f64)),
            _ => self.as_f64().map(|f| (f, 0.0)),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) | Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Float(f) | Value::F64(f) => *f == 0.0,
            Value::F32(f) => *f == 0.0,
            Value::Complex(re, im) | Value::C128(re, im) => *re == 0.0 && *im == 0.0,
            Value::C64(re, im) => *re == 0.0 && *im == 0.0,
            _ => self.as_i128() == Some(0),
        }
    }
}

/// True when `value` can be converted to `to` without loss.
pub fn representable(registry: &TypeRegistry, value: &Value, to: TypeId) -> bool {
    convert(registry, value, to).is_some()
}

/// Convert a constant to type `to`.
///
/// Untyped sources convert only when the value is representable. Typed
/// integer sources wrap modulo 2^n under explicit conversion; use
/// [`representable`] first when the context is an implicit conversion.
pub fn convert(registry: &TypeRegistry, value: &Value, to: TypeId) -> Option<Value> {
    let strict = registry.is_untyped_value(value);
    convert_with(registry, value, to, strict)
}

/// Explicit conversion `T(x)`: typed integers truncate and wrap.
pub fn convert_wrapping(registry: &TypeRegistry, value: &Value, to: TypeId) -> Option<Value> {
    convert_with(registry, value, to, false)
}

fn convert_with(registry: &TypeRegistry, value: &Value, to: TypeId, strict: bool) -> Option<Value> {
    let target = registry.strip(to);
    match registry.kind(target) {
        // Untyped targets: widening between untyped kinds.
        TypeKind::Nil => matches!(value, Value::Nil).then_some(Value::Nil),
        TypeKind::UntypedBoolean => value.as_bool().map(Value::Boolean),
        TypeKind::UntypedRune => int_to(value, strict, i32::MIN as i128, i32::MAX as i128)
            .map(|i| Value::Rune(i as i32)),
        TypeKind::UntypedInteger => value.as_i128().map(Value::Integer),
        TypeKind::UntypedFloat => value.as_f64().map(Value::Float),
        TypeKind::UntypedComplex => value.as_complex().map(|(re, im)| Value::Complex(re, im)),
        TypeKind::UntypedString => value.as_str().map(|s| Value::String(s.to_string())),

        TypeKind::Bool => value.as_bool().map(Value::Bool),
        TypeKind::Uint8 => int_to(value, strict, 0, u8::MAX as i128).map(|i| Value::U8(i as u8)),
        TypeKind::Uint16 => int_to(value, strict, 0, u16::MAX as i128).map(|i| Value::U16(i as u16)),
        TypeKind::Uint32 => int_to(value, strict, 0, u32::MAX as i128).map(|i| Value::U32(i as u32)),
        TypeKind::Uint64 => int_to(value, strict, 0, u64::MAX as i128).map(|i| Value::U64(i as u64)),
        TypeKind::Int8 => {
            int_to(value, strict, i8::MIN as i128, i8::MAX as i128).map(|i| Value::I8(i as i8))
        }
        TypeKind::Int16 => {
            int_to(value, strict, i16::MIN as i128, i16::MAX as i128).map(|i| Value::I16(i as i16))
        }
        TypeKind::Int32 => {
            int_to(value, strict, i32::MIN as i128, i32::MAX as i128).map(|i| Value::I32(i as i32))
        }
        TypeKind::Int64 => {
            int_to(value, strict, i64::MIN as i128, i64::MAX as i128).map(|i| Value::I64(i as i64))
        }
        TypeKind::Uint => int_to(value, strict, 0, u64::MAX as i128).map(|i| Value::Uint(i as u64)),
        TypeKind::Int => {
            int_to(value, strict, i64::MIN as i128, i64::MAX as i128).map(|i| Value::Int(i as i64))
        }
        TypeKind::Uintptr => {
            int_to(value, strict, 0, u64::MAX as i128).map(|i| Value::Uintptr(i as u64))
        }
        TypeKind::Float32 => value.as_f64().map(|f| Value::F32(f as f32)),
        TypeKind::Float64 => value.as_f64().map(Value::F64),
        TypeKind::Complex64 => value
            .as_complex()
            .map(|(re, im)| Value::C64(re as f32, im as f32)),
        TypeKind::Complex128 => value.as_complex().map(|(re, im)| Value::C128(re, im)),
        TypeKind::String => value.as_str().map(|s| Value::Str(s.to_string())),

        // nil converts to any pointer-shaped type; other composite targets
        // have no constant representation.
        TypeKind::Pointer { .. } | TypeKind::Slice { .. } | TypeKind::Map { .. } => {
            matches!(value, Value::Nil).then_some(Value::Nil)
        }
        _ => None,
    }
}

fn int_to(value: &Value, strict: bool, min: i128, max: i128) -> Option<i128> {
    let i = value.as_i128()?;
    if i >= min && i <= max {
        Some(i)
    } else if strict {
        None
    } else {
        // Wrap modulo the target width.
        let width = (max - min + 1) as i128;
        Some((i - min).rem_euclid(width) + min)
    }
}

impl TypeRegistry {
    /// Whether a value is one of the untyped flavors.
    pub fn is_untyped_value(&self, value: &Value) -> bool {
        matches!(
            value,
            Value::Nil
                | Value::Boolean(_)
                | Value::Rune(_)
                | Value::Integer(_)
                | Value::Float(_)
                | Value::Complex(_, _)
                | Value::String(_)
        )
    }
}

/// Rank of an untyped numeric kind in the widening order.
pub fn untyped_rank(registry: &TypeRegistry, id: TypeId) -> Option<u8> {
    match registry.kind(id) {
        TypeKind::UntypedBoolean => Some(0),
        TypeKind::UntypedRune => Some(1),
        TypeKind::UntypedInteger => Some(2),
        TypeKind::UntypedFloat => Some(3),
        TypeKind::UntypedComplex => Some(4),
        TypeKind::UntypedString => Some(5),
        _ => None,
    }
}

/// Evaluate a binary arithmetic operation on two constants already converted
/// to the common type `ty`. Returns `None` when the operation is undefined
/// for the operands (e.g. division by zero, fractional `%`).
pub fn arith(registry: &TypeRegistry, op: ArithOp, ty: TypeId, a: &Value, b: &Value) -> Option<Value> {
    use ArithOp::*;
    let target = registry.strip(ty);

    if registry.is_integral(ty) {
        let x = a.as_i128()?;
        let y = b.as_i128()?;
        let r = match op {
            Add => x.wrapping_add(y),
            Sub => x.wrapping_sub(y),
            Mul => x.wrapping_mul(y),
            Div => {
                if y == 0 {
                    return None;
                }
                x.wrapping_div(y)
            }
            Rem => {
                if y == 0 {
                    return None;
                }
                x.wrapping_rem(y)
            }
            BitAnd => x & y,
            BitOr => x | y,
            BitXor => x ^ y,
            AndNot => x & !y,
        };
        return convert_wrapping(registry, &Value::Integer(r), target);
    }

    if registry.is_floating(ty) {
        let x = a.as_f64()?;
        let y = b.as_f64()?;
        let r = match op {
            Add => x + y,
            Sub => x - y,
            Mul => x * y,
            Div => {
                if y == 0.0 {
                    return None;
                }
                x / y
            }
            _ => return None,
        };
        return convert_wrapping(registry, &Value::Float(r), target);
    }

    if registry.is_complex(ty) {
        let (ar, ai) = a.as_complex()?;
        let (br, bi) = b.as_complex()?;
        let (re, im) = match op {
            Add => (ar + br, ai + bi),
            Sub => (ar - br, ai - bi),
            Mul => (ar * br - ai * bi, ar * bi + ai * br),
            Div => {
                let d = br * br + bi * bi;
                if d == 0.0 {
                    return None;
                }
                ((ar * br + ai * bi) / d, (ai * br - ar * bi) / d)
            }
            _ => return None,
        };
        return convert_wrapping(registry, &Value::Complex(re, im), target);
    }

    if registry.is_string_type(ty) && op == Add {
        let mut s = a.as_str()?.to_string();
        s.push_str(b.as_str()?);
        return convert_wrapping(registry, &Value::String(s), target);
    }

    None
}

/// Shift a constant left or right; `ty` is the (integral) type of the left
/// operand and of the result.
pub fn shift(registry: &TypeRegistry, left: bool, ty: TypeId, a: &Value, by: u32) -> Option<Value> {
    let x = a.as_i128()?;
    let r = if left {
        x.checked_shl(by)?
    } else {
        x.checked_shr(by)?
    };
    convert_wrapping(registry, &Value::Integer(r), registry.strip(ty))
}

/// Arithmetic negation.
pub fn negate(registry: &TypeRegistry, ty: TypeId, v: &Value) -> Option<Value> {
    if registry.is_integral(ty) {
        return convert_wrapping(
            registry,
            &Value::Integer(v.as_i128()?.wrapping_neg()),
            registry.strip(ty),
        );
    }
    if registry.is_floating(ty) {
        return convert_wrapping(registry, &Value::Float(-v.as_f64()?), registry.strip(ty));
    }
    if registry.is_complex(ty) {
        let (re, im) = v.as_complex()?;
        return convert_wrapping(registry, &Value::Complex(-re, -im), registry.strip(ty));
    }
    None
}

/// Bitwise complement.
pub fn complement(registry: &TypeRegistry, ty: TypeId, v: &Value) -> Option<Value> {
    if !registry.is_integral(ty) {
        return None;
    }
    convert_wrapping(registry, &Value::Integer(!v.as_i128()?), registry.strip(ty))
}

/// Equality on two constants of the same (merged) type.
pub fn values_equal(a: &Value, b: &Value) -> Option<bool> {
    if let (Some(x), Some(y)) = (a.as_bool(), b.as_bool()) {
        return Some(x == y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x == y);
    }
    if let (Value::Nil, Value::Nil) = (a, b) {
        return Some(true);
    }
    if let (Some(x), Some(y)) = (a.as_complex(), b.as_complex()) {
        return Some(x == y);
    }
    if let (Some(x), Some(y)) = (a.as_i128(), b.as_i128()) {
        return Some(x == y);
    }
    None
}

/// Ordering on two constants of the same (merged) orderable type.
pub fn values_less(a: &Value, b: &Value) -> Option<bool> {
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x < y);
    }
    match (a.as_i128(), b.as_i128()) {
        (Some(x), Some(y)) => Some(x < y),
        _ => {
            let x = a.as_f64()?;
            let y = b.as_f64()?;
            Some(x < y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg() -> TypeRegistry {
        TypeRegistry::new()
    }

    #[test]
    fn untyped_integer_to_typed() {
        let reg = reg();
        assert_eq!(
            convert(&reg, &Value::Integer(200), TypeId::UINT8),
            Some(Value::U8(200))
        );
        // Not representable: untyped conversion is strict.
        assert_eq!(convert(&reg, &Value::Integer(300), TypeId::UINT8), None);
        assert_eq!(convert(&reg, &Value::Integer(-1), TypeId::UINT), None);
    }

    #[test]
    fn typed_conversion_wraps() {
        let reg = reg();
        assert_eq!(
            convert_wrapping(&reg, &Value::Int(300), TypeId::UINT8),
            Some(Value::U8(44))
        );
        assert_eq!(
            convert_wrapping(&reg, &Value::Int(-1), TypeId::UINT8),
            Some(Value::U8(255))
        );
    }

    #[test]
    fn round_trip_preserves_representable_values() {
        let reg = reg();
        // R2: converting there and back is the identity for in-range values.
        let v = Value::Integer(1000);
        let there = convert(&reg, &v, TypeId::INT16).unwrap();
        let back = convert_wrapping(&reg, &there, TypeId::INT).unwrap();
        assert_eq!(back.as_i128(), Some(1000));
    }

    #[test]
    fn float_to_int_requires_integral_value() {
        let reg = reg();
        assert_eq!(
            convert(&reg, &Value::Float(4.0), TypeId::INT),
            Some(Value::Int(4))
        );
        assert_eq!(convert(&reg, &Value::Float(4.5), TypeId::INT), None);
    }

    #[test]
    fn complex_with_imaginary_part_is_not_real_representable() {
        let reg = reg();
        assert_eq!(convert(&reg, &Value::Complex(1.0, 2.0), TypeId::FLOAT64), None);
        assert_eq!(
            convert(&reg, &Value::Complex(1.5, 0.0), TypeId::FLOAT64),
            Some(Value::F64(1.5))
        );
    }

    #[test]
    fn nil_converts_to_pointer_shapes_only() {
        let mut reg = reg();
        let p = reg.pointer_to(TypeId::INT);
        assert_eq!(convert(&reg, &Value::Nil, p), Some(Value::Nil));
        assert_eq!(convert(&reg, &Value::Nil, TypeId::INT), None);
    }

    #[test]
    fn integer_arith_folds() {
        let reg = reg();
        let r = arith(
            &reg,
            ArithOp::Add,
            TypeId::UNTYPED_INTEGER,
            &Value::Integer(2),
            &Value::Integer(3),
        );
        assert_eq!(r, Some(Value::Integer(5)));

        // Division by zero never folds.
        assert_eq!(
            arith(
                &reg,
                ArithOp::Div,
                TypeId::UNTYPED_INTEGER,
                &Value::Integer(1),
                &Value::Integer(0)
            ),
            None
        );
    }

    #[test]
    fn typed_unsigned_arith_wraps() {
        let reg = reg();
        let r = arith(
            &reg,
            ArithOp::Add,
            TypeId::UINT8,
            &Value::U8(250),
            &Value::U8(10),
        );
        assert_eq!(r, Some(Value::U8(4)));
    }

    #[test]
    fn complex_multiplication() {
        let reg = reg();
        let r = arith(
            &reg,
            ArithOp::Mul,
            TypeId::UNTYPED_COMPLEX,
            &Value::Complex(0.0, 1.0),
            &Value::Complex(0.0, 1.0),
        );
        assert_eq!(r, Some(Value::Complex(-1.0, 0.0)));
    }

    #[test]
    fn string_concatenation() {
        let reg = reg();
        let r = arith(
            &reg,
            ArithOp::Add,
            TypeId::UNTYPED_STRING,
            &Value::String("ab".to_string()),
            &Value::String("cd".to_string()),
        );
        assert_eq!(r, Some(Value::String("abcd".to_string())));
    }

    #[test]
    fn shifts_and_complement() {
        let reg = reg();
        assert_eq!(
            shift(&reg, true, TypeId::UNTYPED_INTEGER, &Value::Integer(1), 4),
            Some(Value::Integer(16))
        );
        assert_eq!(
            complement(&reg, TypeId::UINT8, &Value::U8(0)),
            Some(Value::U8(255))
        );
        assert_eq!(
            negate(&reg, TypeId::UNTYPED_INTEGER, &Value::Integer(7)),
            Some(Value::Integer(-7))
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(
            values_equal(&Value::Integer(3), &Value::Integer(3)),
            Some(true)
        );
        assert_eq!(
            values_less(&Value::String("a".to_string()), &Value::String("b".to_string())),
            Some(true)
        );
        assert_eq!(values_less(&Value::Integer(5), &Value::Integer(2)), Some(false));
    }
}
