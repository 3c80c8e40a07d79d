//! Stack frame allocation.
//!
//! Walks every callable's parameter list in declaration order (receiver
//! first, so its offset is the smallest) and then its body, allocating
//! locals in nested-scope order and unwinding on scope exit so offsets
//! reflect actual lifetime extents.

use super::Context;
use crate::ast::typed::{Block, TypedStmt};
use crate::decl::MemoryModel;
use crate::symbol::{SymbolArena, SymbolId, SymbolKind};
use crate::types::TypeRegistry;

pub fn allocate_frames(ctx: &mut Context) {
    let Context {
        types,
        symbols,
        decls,
    } = ctx;

    for i in 0..decls.functions.len() {
        let params = decls.functions[i].param_symbols.clone();
        let ret = decls.functions[i].return_symbol;
        let body = decls.functions[i].body.take();
        let mut mm = MemoryModel::new();
        allocate_arguments(types, symbols, &mut mm, &[], &params, ret);
        if let Some(b) = &body {
            allocate_block(types, symbols, &mut mm, b);
        }
        decls.functions[i].body = body;
        decls.functions[i].memory = mm;
    }

    for i in 0..decls.methods.len() {
        let receiver = decls.methods[i].receiver_symbol;
        let params = decls.methods[i].param_symbols.clone();
        let ret = decls.methods[i].return_symbol;
        let body = decls.methods[i].body.take();
        let mut mm = MemoryModel::new();
        allocate_arguments(types, symbols, &mut mm, &[receiver], &params, ret);
        if let Some(b) = &body {
            allocate_block(types, symbols, &mut mm, b);
        }
        decls.methods[i].body = body;
        decls.methods[i].memory = mm;
    }

    for i in 0..decls.initializers.len() {
        let receiver = decls.initializers[i].receiver_symbol;
        let params = decls.initializers[i].param_symbols.clone();
        let body = decls.initializers[i].body.take();
        let mut mm = MemoryModel::new();
        allocate_arguments(types, symbols, &mut mm, &[receiver], &params, None);
        if let Some(b) = &body {
            allocate_block(types, symbols, &mut mm, b);
        }
        decls.initializers[i].body = body;
        decls.initializers[i].memory = mm;
    }

    for i in 0..decls.getters.len() {
        let receiver = decls.getters[i].receiver_symbol;
        let params = decls.getters[i].param_symbols.clone();
        let ret = decls.getters[i].return_symbol;
        let body = decls.getters[i].body.take();
        let mut mm = MemoryModel::new();
        allocate_arguments(types, symbols, &mut mm, &[receiver], &params, ret);
        if let Some(b) = &body {
            allocate_block(types, symbols, &mut mm, b);
        }
        decls.getters[i].body = body;
        decls.getters[i].memory = mm;
    }

    for i in 0..decls.actions.len() {
        let receiver = decls.actions[i].receiver_symbol;
        let iota: Vec<SymbolId> = decls.actions[i].iota_symbol.into_iter().collect();
        let body = decls.actions[i].body.take();
        let mut mm = MemoryModel::new();
        allocate_arguments(types, symbols, &mut mm, &[receiver], &iota, None);
        if let Some(b) = &body {
            allocate_block(types, symbols, &mut mm, b);
        }
        decls.actions[i].body = body;
        decls.actions[i].memory = mm;
    }

    for i in 0..decls.reactions.len() {
        let receiver = decls.reactions[i].receiver_symbol;
        let mut params: Vec<SymbolId> = decls.reactions[i].iota_symbol.into_iter().collect();
        params.extend(decls.reactions[i].param_symbols.iter().copied());
        let body = decls.reactions[i].body.take();
        let mut mm = MemoryModel::new();
        allocate_arguments(types, symbols, &mut mm, &[receiver], &params, None);
        if let Some(b) = &body {
            allocate_block(types, symbols, &mut mm, b);
        }
        decls.reactions[i].body = body;
        decls.reactions[i].memory = mm;
    }

    for i in 0..decls.binds.len() {
        let receiver = decls.binds[i].receiver_symbol;
        let body = decls.binds[i].body.take();
        let mut mm = MemoryModel::new();
        allocate_arguments(types, symbols, &mut mm, &[receiver], &[], None);
        if let Some(b) = &body {
            allocate_block(types, symbols, &mut mm, b);
        }
        decls.binds[i].body = body;
        decls.binds[i].memory = mm;
    }
}

fn symbol_size(types: &TypeRegistry, symbols: &SymbolArena, sym: SymbolId) -> usize {
    let ty = match symbols.get(sym).kind {
        SymbolKind::Variable { ty, .. } | SymbolKind::Parameter { ty, .. } => ty,
        _ => return 0,
    };
    types.unit_size(ty)
}

fn allocate_arguments(
    types: &TypeRegistry,
    symbols: &mut SymbolArena,
    mm: &mut MemoryModel,
    receiver: &[SymbolId],
    params: &[SymbolId],
    ret: Option<SymbolId>,
) {
    for &sym in receiver {
        let size = symbol_size(types, symbols, sym);
        let offset = mm.push_argument(size);
        mm.mark_receiver(offset);
        symbols.get_mut(sym).offset = offset;
    }
    for &sym in params.iter().chain(&ret) {
        let size = symbol_size(types, symbols, sym);
        let offset = mm.push_argument(size);
        symbols.get_mut(sym).offset = offset;
    }
}

fn allocate_block(
    types: &TypeRegistry,
    symbols: &mut SymbolArena,
    mm: &mut MemoryModel,
    block: &Block,
) {
    let mark = mm.locals_mark();
    for stmt in &block.stmts {
        allocate_stmt(types, symbols, mm, stmt);
    }
    mm.pop_locals_to(mark);
}

fn allocate_stmt(
    types: &TypeRegistry,
    symbols: &mut SymbolArena,
    mm: &mut MemoryModel,
    stmt: &TypedStmt,
) {
    match stmt {
        TypedStmt::Var { symbols: syms, .. } => {
            for &sym in syms {
                let size = symbol_size(types, symbols, sym);
                let offset = mm.push_local(size);
                symbols.get_mut(sym).offset = offset;
            }
        }
        TypedStmt::ForRange { symbol, body, .. } => {
            let mark = mm.locals_mark();
            let size = symbol_size(types, symbols, *symbol);
            let offset = mm.push_local(size);
            symbols.get_mut(*symbol).offset = offset;
            allocate_block(types, symbols, mm, body);
            mm.pop_locals_to(mark);
        }
        TypedStmt::Change { symbol, body, .. } => {
            let mark = mm.locals_mark();
            let size = symbol_size(types, symbols, *symbol);
            let offset = mm.push_local(size);
            symbols.get_mut(*symbol).offset = offset;
            allocate_block(types, symbols, mm, body);
            mm.pop_locals_to(mark);
        }
        TypedStmt::If {
            then_block,
            else_block,
            ..
        } => {
            allocate_block(types, symbols, mm, then_block);
            allocate_block(types, symbols, mm, else_block);
        }
        TypedStmt::While { body, .. } => allocate_block(types, symbols, mm, body),
        TypedStmt::Activate { body, .. } => allocate_block(types, symbols, mm, body),
        TypedStmt::Block(b) => allocate_block(types, symbols, mm, b),
        _ => {}
    }
}
