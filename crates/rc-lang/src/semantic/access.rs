//! Receiver-access analysis.
//!
//! Expression nodes carry their receiver access in their `ExpressionValue`;
//! this module folds those up through statements to label each action,
//! reaction, and getter with its peak access. Writing through the receiver
//! (assignment targets) lifts a read to a write.

use crate::ast::typed::{Block, TypedExpr, TypedStmt};
use crate::foundation::ReceiverAccess;

/// Access of a whole statement list, including `activate` bodies.
pub fn block_access(block: &Block) -> ReceiverAccess {
    fold_block(block, true)
}

/// Access of the immutable phase: everything outside `activate` bodies.
/// Port-call arguments evaluate before the mutable phase begins, so they
/// count here.
pub fn immutable_phase_access(block: &Block) -> ReceiverAccess {
    fold_block(block, false)
}

fn fold_block(block: &Block, include_activate_body: bool) -> ReceiverAccess {
    block
        .stmts
        .iter()
        .fold(ReceiverAccess::None, |acc, stmt| {
            acc.lub(fold_stmt(stmt, include_activate_body))
        })
}

fn fold_stmt(stmt: &TypedStmt, include_activate_body: bool) -> ReceiverAccess {
    match stmt {
        TypedStmt::Error | TypedStmt::Empty | TypedStmt::Const => ReceiverAccess::None,
        TypedStmt::Expression(e) => e.eval.receiver_access,
        TypedStmt::Assign { target, value }
        | TypedStmt::AddAssign { target, value }
        | TypedStmt::SubAssign { target, value } => {
            write_through(target).lub(value.eval.receiver_access)
        }
        TypedStmt::Var { inits, .. } => inits
            .iter()
            .fold(ReceiverAccess::None, |acc, e| acc.lub(e.eval.receiver_access)),
        TypedStmt::If {
            cond,
            then_block,
            else_block,
        } => cond
            .eval
            .receiver_access
            .lub(fold_block(then_block, include_activate_body))
            .lub(fold_block(else_block, include_activate_body)),
        TypedStmt::While { cond, body } => cond
            .eval
            .receiver_access
            .lub(fold_block(body, include_activate_body)),
        TypedStmt::ForRange { body, .. } => fold_block(body, include_activate_body),
        TypedStmt::Return(value) => value
            .as_ref()
            .map_or(ReceiverAccess::None, |e| e.eval.receiver_access),
        TypedStmt::Change { expr, body, .. } => expr
            .eval
            .receiver_access
            .lub(fold_block(body, include_activate_body)),
        TypedStmt::Activate { calls, body, .. } => {
            let args = calls.iter().fold(ReceiverAccess::None, |acc, call| {
                call.args
                    .iter()
                    .fold(acc, |a, e| a.lub(e.eval.receiver_access))
                    .lub(call.index.as_ref().map_or(ReceiverAccess::None, |i| {
                        i.eval.receiver_access
                    }))
            });
            if include_activate_body {
                args.lub(fold_block(body, include_activate_body))
            } else {
                args
            }
        }
        TypedStmt::BindPush { port, receiver, index, .. } => port
            .eval
            .receiver_access
            .lub(receiver.eval.receiver_access)
            .lub(index.as_ref().map_or(ReceiverAccess::None, |i| {
                i.eval.receiver_access
            })),
        TypedStmt::BindPull { port, receiver, .. } => {
            port.eval.receiver_access.lub(receiver.eval.receiver_access)
        }
        TypedStmt::Block(b) => fold_block(b, include_activate_body),
    }
}

/// An assignment target that reads the receiver writes it.
fn write_through(target: &TypedExpr) -> ReceiverAccess {
    match target.eval.receiver_access {
        ReceiverAccess::None => ReceiverAccess::None,
        _ => ReceiverAccess::Write,
    }
}
