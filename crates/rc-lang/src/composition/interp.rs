//! Constant interpreter for composition elaboration.
//!
//! Bind blocks and port references are elaborated by evaluating checked
//! expressions down to component addresses, port identities, and integer
//! indices. The interpreter supports exactly what elaboration needs:
//! constants, arithmetic, field selection, indexing, and the loop variables
//! of `for ... range` — not general execution.

use crate::ast::typed::{TypedExpr, TypedExprKind};
use crate::ast::{BinaryOp, UnaryOp};
use crate::semantic::Context;
use crate::symbol::{ParameterKind, SymbolId, SymbolKind};
use std::collections::HashMap;

/// A value during composition elaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CValue {
    Int(i128),
    Bool(bool),
    /// A component or port address.
    Address(usize),
}

/// Evaluates checked expressions against a fixed receiver address and an
/// environment of loop/local bindings.
pub struct ConstInterp<'a> {
    ctx: &'a Context,
    receiver_address: usize,
    env: HashMap<SymbolId, CValue>,
}

impl<'a> ConstInterp<'a> {
    pub fn new(ctx: &'a Context, receiver_address: usize) -> Self {
        Self {
            ctx,
            receiver_address,
            env: HashMap::new(),
        }
    }

    /// Bind a loop or local symbol.
    pub fn bind(&mut self, symbol: SymbolId, value: CValue) {
        self.env.insert(symbol, value);
    }

    pub fn eval(&self, expr: &TypedExpr) -> Option<CValue> {
        // Folded constants short-circuit everything else.
        if let Some(v) = &expr.eval.value {
            if let Some(b) = v.as_bool() {
                return Some(CValue::Bool(b));
            }
            if let Some(i) = v.as_i128() {
                return Some(CValue::Int(i));
            }
            return None;
        }

        match &expr.kind {
            TypedExprKind::Variable(sym) => {
                match self.ctx.symbols.get(*sym).kind {
                    SymbolKind::Parameter {
                        kind: ParameterKind::Receiver | ParameterKind::ReceiverDuplicate,
                        ..
                    } => Some(CValue::Address(self.receiver_address)),
                    _ => self.env.get(sym).copied(),
                }
            }
            TypedExprKind::FieldSelect { base, offset, .. } => {
                let CValue::Address(a) = self.eval(base)? else {
                    return None;
                };
                Some(CValue::Address(a + offset))
            }
            // Pointers are addresses, so these are transparent.
            TypedExprKind::Dereference(inner)
            | TypedExprKind::AddressOf(inner)
            | TypedExprKind::Conversion(inner) => self.eval(inner),
            TypedExprKind::Index { base, index } => {
                let CValue::Address(a) = self.eval(base)? else {
                    return None;
                };
                let CValue::Int(i) = self.eval(index)? else {
                    return None;
                };
                if i < 0 {
                    return None;
                }
                let unit = self.ctx.types.unit_size(expr.eval.ty);
                Some(CValue::Address(a + i as usize * unit))
            }
            TypedExprKind::Unary { op, operand } => match (op, self.eval(operand)?) {
                (UnaryOp::Neg, CValue::Int(i)) => Some(CValue::Int(-i)),
                (UnaryOp::Pos, v @ CValue::Int(_)) => Some(v),
                (UnaryOp::Not, CValue::Bool(b)) => Some(CValue::Bool(!b)),
                (UnaryOp::Complement, CValue::Int(i)) => Some(CValue::Int(!i)),
                _ => None,
            },
            TypedExprKind::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                match (l, r) {
                    (CValue::Int(a), CValue::Int(b)) => int_binary(*op, a, b),
                    (CValue::Bool(a), CValue::Bool(b)) => bool_binary(*op, a, b),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn eval_address(&self, expr: &TypedExpr) -> Option<usize> {
        match self.eval(expr)? {
            CValue::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn eval_int(&self, expr: &TypedExpr) -> Option<i128> {
        match self.eval(expr)? {
            CValue::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn eval_bool(&self, expr: &TypedExpr) -> Option<bool> {
        match self.eval(expr)? {
            CValue::Bool(b) => Some(b),
            _ => None,
        }
    }
}

fn int_binary(op: BinaryOp, a: i128, b: i128) -> Option<CValue> {
    let value = match op {
        BinaryOp::Add => CValue::Int(a.checked_add(b)?),
        BinaryOp::Sub => CValue::Int(a.checked_sub(b)?),
        BinaryOp::Mul => CValue::Int(a.checked_mul(b)?),
        BinaryOp::Div => CValue::Int(a.checked_div(b)?),
        BinaryOp::Rem => CValue::Int(a.checked_rem(b)?),
        BinaryOp::Shl => CValue::Int(a.checked_shl(u32::try_from(b).ok()?)?),
        BinaryOp::Shr => CValue::Int(a.checked_shr(u32::try_from(b).ok()?)?),
        BinaryOp::BitAnd => CValue::Int(a & b),
        BinaryOp::BitOr => CValue::Int(a | b),
        BinaryOp::BitXor => CValue::Int(a ^ b),
        BinaryOp::AndNot => CValue::Int(a & !b),
        BinaryOp::Eq => CValue::Bool(a == b),
        BinaryOp::Ne => CValue::Bool(a != b),
        BinaryOp::Lt => CValue::Bool(a < b),
        BinaryOp::Le => CValue::Bool(a <= b),
        BinaryOp::Gt => CValue::Bool(a > b),
        BinaryOp::Ge => CValue::Bool(a >= b),
        BinaryOp::LogicAnd | BinaryOp::LogicOr => return None,
    };
    Some(value)
}

fn bool_binary(op: BinaryOp, a: bool, b: bool) -> Option<CValue> {
    let value = match op {
        BinaryOp::LogicAnd => a && b,
        BinaryOp::LogicOr => a || b,
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        _ => return None,
    };
    Some(CValue::Bool(value))
}
