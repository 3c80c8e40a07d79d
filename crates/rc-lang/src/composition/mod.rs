//! Composition analysis.
//!
//! Enumerates every instance's actions, reactions, and getters; follows
//! activations, port calls, and pull-port calls to build the directed
//! call/trigger graph; and enforces the structural and determinism
//! invariants:
//!
//! 1. every pull port is bound exactly once;
//! 2. no reaction has more than one incoming push port;
//! 3. the graph reachable from actions is acyclic;
//! 4. at every branching node the instance sets of the children are
//!    pairwise compatible (no two writers of one instance).

pub mod graph;
pub mod interp;

pub use graph::{Instance, InstanceId, InstanceSet, Mark, Node, NodeId, NodeKind};
pub use interp::{CValue, ConstInterp};

use crate::ast::typed::{Block, TypedExpr, TypedExprKind, TypedStmt};
use crate::ast::typed::Callee;
use crate::decl::{ActionId, BindId, GetterId, ReactionId};
use crate::error::{CompileError, ErrorCode, ErrorReporter};
use crate::foundation::Span;
use crate::semantic::Context;
use crate::types::{FunctionKind, TypeId, TypeKind};
use graph::{add_union, insert_access, is_compatible};
use indexmap::IndexMap;
use serde::Serialize;

/// The analyzed composition: the instance tree and the call/trigger graph,
/// ready for scheduler consumption.
#[derive(Debug, Default)]
pub struct Composition {
    pub instances: Vec<Instance>,
    pub nodes: Vec<Node>,
}

impl Composition {
    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// The computed instance set of a node (after analysis).
    pub fn instance_set(&self, id: NodeId) -> Option<&InstanceSet> {
        self.nodes[id.index()].instance_set.as_ref()
    }

    /// Render the graph in Graphviz dot format.
    pub fn to_graphviz(&self) -> String {
        let mut out = String::from("digraph {\n");
        for node in &self.nodes {
            out.push_str(&format!("\"{}\" -> {{", node.name));
            for &m in &node.outgoing {
                out.push_str(&format!(" \"{}\"", self.nodes[m.index()].name));
            }
            out.push_str("}\n");
        }
        out.push_str("}\n");
        out
    }

    pub fn to_summary(&self) -> GraphSummary {
        GraphSummary {
            instances: self
                .instances
                .iter()
                .map(|i| InstanceSummary {
                    name: i.name.clone(),
                    address: i.address,
                    top_level: i.is_top_level,
                })
                .collect(),
            nodes: self
                .nodes
                .iter()
                .map(|n| NodeSummary {
                    name: n.name.clone(),
                    kind: kind_name(&n.kind),
                    outgoing: n
                        .outgoing
                        .iter()
                        .map(|m| self.nodes[m.index()].name.clone())
                        .collect(),
                })
                .collect(),
        }
    }
}

fn kind_name(kind: &NodeKind) -> &'static str {
    match kind {
        NodeKind::Action { .. } => "action",
        NodeKind::Reaction { .. } => "reaction",
        NodeKind::Getter { .. } => "getter",
        NodeKind::Activation { .. } => "activation",
        NodeKind::PushPort { .. } => "push-port",
        NodeKind::PullPort { .. } => "pull-port",
    }
}

/// Serializable view of the composition graph.
#[derive(Debug, Serialize)]
pub struct GraphSummary {
    pub instances: Vec<InstanceSummary>,
    pub nodes: Vec<NodeSummary>,
}

#[derive(Debug, Serialize)]
pub struct InstanceSummary {
    pub name: String,
    pub address: usize,
    pub top_level: bool,
}

#[derive(Debug, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub kind: &'static str,
    pub outgoing: Vec<String>,
}

/// Run composition analysis over a checked program.
pub fn analyze_composition(ctx: &Context, reporter: &mut ErrorReporter) -> Composition {
    let mut composer = Composer::new(ctx, reporter);
    composer.enumerate_instances();
    // Getters first: actions and reactions may call them.
    composer.enumerate_getters();
    composer.elaborate_getters();
    composer.enumerate_actions();
    composer.elaborate_actions();
    composer.enumerate_reactions();
    composer.elaborate_reactions();
    composer.elaborate_bindings();
    composer.check_structure();
    composer.compute_instance_sets();
    Composition {
        instances: composer.instances,
        nodes: composer.nodes,
    }
}

struct Composer<'a> {
    ctx: &'a Context,
    reporter: &'a mut ErrorReporter,
    instances: Vec<Instance>,
    nodes: Vec<Node>,
    instances_by_address: IndexMap<usize, InstanceId>,
    push_ports: IndexMap<usize, NodeId>,
    pull_ports: IndexMap<usize, NodeId>,
    reactions: IndexMap<(InstanceId, ReactionId, i64), NodeId>,
    getters: IndexMap<(InstanceId, GetterId), NodeId>,
    node_spans: Vec<Span>,
    cycle_found: bool,
}

impl<'a> Composer<'a> {
    fn new(ctx: &'a Context, reporter: &'a mut ErrorReporter) -> Self {
        Self {
            ctx,
            reporter,
            instances: Vec::new(),
            nodes: Vec::new(),
            instances_by_address: IndexMap::new(),
            push_ports: IndexMap::new(),
            pull_ports: IndexMap::new(),
            reactions: IndexMap::new(),
            getters: IndexMap::new(),
            node_spans: Vec::new(),
            cycle_found: false,
        }
    }

    fn add_node(&mut self, node: Node, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.node_spans.push(span);
        id
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from.index()].outgoing.push(to);
    }

    // === Phase 1: enumerate instances and ports ===

    fn enumerate_instances(&mut self) {
        let mut next_address = 16usize;
        for decl in self.ctx.decls.instances.iter() {
            let alignment = self.ctx.types.alignment(decl.ty).max(1);
            let size = self.ctx.types.size(decl.ty).max(1);
            let address = crate::types::align_up(next_address, alignment);
            next_address = address + size;
            let initializer = Some(decl.initializer);
            let name = decl.name.clone();
            let span = decl.span;
            let ty = decl.ty;
            self.instantiate(None, address, 0, ty, initializer, name, true, span);
        }
    }

    /// Create an instance, register its ports, and recursively instantiate
    /// its component-typed fields.
    #[allow(clippy::too_many_arguments)]
    fn instantiate(
        &mut self,
        parent: Option<InstanceId>,
        address: usize,
        offset_in_parent: usize,
        ty: TypeId,
        initializer: Option<crate::decl::InitializerId>,
        name: String,
        is_top_level: bool,
        span: Span,
    ) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(Instance {
            parent,
            address,
            ty,
            initializer,
            offset_in_parent,
            name: name.clone(),
            is_top_level,
            actions: Vec::new(),
        });
        self.instances_by_address.insert(address, id);

        let fields: Vec<(String, usize, TypeId)> = match self.ctx.types.underlying_kind(ty) {
            TypeKind::Component(s) => s
                .fields
                .iter()
                .filter(|f| !f.hidden)
                .map(|f| (f.name.clone(), f.offset, f.ty))
                .collect(),
            _ => Vec::new(),
        };

        for (field_name, offset, field_ty) in fields {
            match self.ctx.types.underlying_kind(field_ty) {
                TypeKind::Component(_) => {
                    self.instantiate(
                        Some(id),
                        address + offset,
                        offset,
                        field_ty,
                        None,
                        format!("{}.{}", name, field_name),
                        false,
                        span,
                    );
                }
                TypeKind::Function(f) => {
                    let port_address = address + offset;
                    let port_name = format!("{}.{}", name, field_name);
                    match f.kind {
                        FunctionKind::PushPort => {
                            let node = self.add_node(
                                Node::new(
                                    port_name,
                                    NodeKind::PushPort {
                                        address: port_address,
                                        instance: id,
                                    },
                                ),
                                span,
                            );
                            self.push_ports.insert(port_address, node);
                        }
                        FunctionKind::PullPort => {
                            let node = self.add_node(
                                Node::new(
                                    port_name,
                                    NodeKind::PullPort {
                                        address: port_address,
                                        instance: id,
                                    },
                                ),
                                span,
                            );
                            self.pull_ports.insert(port_address, node);
                        }
                        FunctionKind::Function => {}
                    }
                }
                TypeKind::Array { dimension, base } => {
                    if let TypeKind::Function(f) = self.ctx.types.underlying_kind(*base) {
                        if f.kind == FunctionKind::PushPort {
                            let unit = self.ctx.types.unit_size(*base);
                            for idx in 0..*dimension {
                                let port_address = address + offset + idx as usize * unit;
                                let node = self.add_node(
                                    Node::new(
                                        format!("{}.{}[{}]", name, field_name, idx),
                                        NodeKind::PushPort {
                                            address: port_address,
                                            instance: id,
                                        },
                                    ),
                                    span,
                                );
                                self.push_ports.insert(port_address, node);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        id
    }

    // === Phase 1 continued: enumerate callables per instance ===

    fn named_actions(&self, ty: TypeId) -> Vec<ActionId> {
        self.ctx
            .types
            .named_type(ty)
            .map(|n| n.actions.clone())
            .unwrap_or_default()
    }

    fn enumerate_getters(&mut self) {
        for i in 0..self.instances.len() {
            let id = InstanceId(i as u32);
            let ty = self.instances[i].ty;
            let getters: Vec<(String, GetterId)> = self
                .ctx
                .types
                .named_type(ty)
                .map(|n| n.getters.iter().map(|(k, v)| (k.clone(), *v)).collect())
                .unwrap_or_default();
            for (gname, gid) in getters {
                let name = format!("{}.{}", self.instances[i].name, gname);
                let span = self.ctx.decls.getter(gid).span;
                let node = self.add_node(
                    Node::new(name, NodeKind::Getter { instance: id, getter: gid }),
                    span,
                );
                self.getters.insert((id, gid), node);
            }
        }
    }

    fn enumerate_actions(&mut self) {
        for i in 0..self.instances.len() {
            let id = InstanceId(i as u32);
            let ty = self.instances[i].ty;
            for aid in self.named_actions(ty) {
                let (dimension, span) = {
                    let a = self.ctx.decls.action(aid);
                    (a.dimension, a.span)
                };
                match dimension {
                    Some(dim) => {
                        for iota in 0..dim {
                            let name =
                                format!("{}.action@{}[{}]", self.instances[i].name, span.line, iota);
                            let node = self.add_node(
                                Node::new(
                                    name,
                                    NodeKind::Action {
                                        instance: id,
                                        action: aid,
                                        iota: Some(iota),
                                    },
                                ),
                                span,
                            );
                            self.instances[i].actions.push(node);
                        }
                    }
                    None => {
                        let name = format!("{}.action@{}", self.instances[i].name, span.line);
                        let node = self.add_node(
                            Node::new(
                                name,
                                NodeKind::Action {
                                    instance: id,
                                    action: aid,
                                    iota: None,
                                },
                            ),
                            span,
                        );
                        self.instances[i].actions.push(node);
                    }
                }
            }
        }
    }

    fn enumerate_reactions(&mut self) {
        for i in 0..self.instances.len() {
            let id = InstanceId(i as u32);
            let ty = self.instances[i].ty;
            let reactions: Vec<(String, ReactionId)> = self
                .ctx
                .types
                .named_type(ty)
                .map(|n| n.reactions.iter().map(|(k, v)| (k.clone(), *v)).collect())
                .unwrap_or_default();
            for (rname, rid) in reactions {
                let (dimension, span) = {
                    let r = self.ctx.decls.reaction(rid);
                    (r.dimension, r.span)
                };
                match dimension {
                    Some(dim) => {
                        for iota in 0..dim {
                            let name =
                                format!("{}.{}[{}]", self.instances[i].name, rname, iota);
                            let node = self.add_node(
                                Node::new(
                                    name,
                                    NodeKind::Reaction {
                                        instance: id,
                                        reaction: rid,
                                        iota: Some(iota),
                                        incoming_push_ports: 0,
                                    },
                                ),
                                span,
                            );
                            self.reactions.insert((id, rid, iota), node);
                        }
                    }
                    None => {
                        let name = format!("{}.{}", self.instances[i].name, rname);
                        let node = self.add_node(
                            Node::new(
                                name,
                                NodeKind::Reaction {
                                    instance: id,
                                    reaction: rid,
                                    iota: None,
                                    incoming_push_ports: 0,
                                },
                            ),
                            span,
                        );
                        self.reactions.insert((id, rid, 0), node);
                    }
                }
            }
        }
    }

    // === Phases 2 and 3: elaborate bodies and bindings ===

    fn elaborate_getters(&mut self) {
        let ctx = self.ctx;
        let entries: Vec<(NodeId, InstanceId, GetterId)> = self
            .getters
            .iter()
            .map(|(&(inst, gid), &node)| (node, inst, gid))
            .collect();
        for (node, inst, gid) in entries {
            let Some(body) = ctx.decls.getter(gid).body.as_ref() else {
                continue;
            };
            let interp = ConstInterp::new(ctx, self.instances[inst.index()].address);
            self.elaborate_block(node, &interp, body);
        }
    }

    fn elaborate_actions(&mut self) {
        let ctx = self.ctx;
        for i in 0..self.instances.len() {
            let action_nodes = self.instances[i].actions.clone();
            for node in action_nodes {
                let NodeKind::Action { action, iota, .. } = self.nodes[node.index()].kind else {
                    continue;
                };
                let decl = ctx.decls.action(action);
                let mut interp = ConstInterp::new(ctx, self.instances[i].address);
                if let (Some(iota), Some(sym)) = (iota, decl.iota_symbol) {
                    interp.bind(sym, CValue::Int(iota as i128));
                }
                if let Some(precondition) = decl.precondition.as_ref() {
                    self.elaborate_expr(node, &interp, precondition);
                }
                if let Some(body) = decl.body.as_ref() {
                    self.elaborate_block(node, &interp, body);
                }
            }
        }
    }

    fn elaborate_reactions(&mut self) {
        let ctx = self.ctx;
        let entries: Vec<(NodeId, InstanceId, ReactionId, i64)> = self
            .reactions
            .iter()
            .map(|(&(inst, rid, iota), &node)| (node, inst, rid, iota))
            .collect();
        for (node, inst, rid, iota) in entries {
            let decl = ctx.decls.reaction(rid);
            let Some(body) = decl.body.as_ref() else {
                continue;
            };
            let mut interp = ConstInterp::new(ctx, self.instances[inst.index()].address);
            if let Some(sym) = decl.iota_symbol {
                interp.bind(sym, CValue::Int(iota as i128));
            }
            self.elaborate_block(node, &interp, body);
        }
    }

    /// Walk a body structurally, adding edges for getter calls, pull-port
    /// calls, and activations.
    fn elaborate_block(&mut self, current: NodeId, interp: &ConstInterp, block: &Block) {
        for stmt in &block.stmts {
            self.elaborate_stmt(current, interp, stmt);
        }
    }

    fn elaborate_stmt(&mut self, current: NodeId, interp: &ConstInterp, stmt: &TypedStmt) {
        match stmt {
            TypedStmt::Activate {
                calls,
                body,
                mutable_phase_access,
            } => {
                let instance = self.node_instance(current);
                let span = self.node_spans[current.index()];
                let activation = self.add_node(
                    Node::new(
                        format!("{}.activation", self.nodes[current.index()].name),
                        NodeKind::Activation {
                            instance,
                            mutable_phase_access: *mutable_phase_access,
                        },
                    ),
                    span,
                );
                self.add_edge(current, activation);

                for call in calls {
                    self.elaborate_port_call(current, activation, interp, call);
                }
                self.elaborate_block(current, interp, body);
            }
            TypedStmt::Expression(e) => self.elaborate_expr(current, interp, e),
            TypedStmt::Assign { target, value }
            | TypedStmt::AddAssign { target, value }
            | TypedStmt::SubAssign { target, value } => {
                self.elaborate_expr(current, interp, target);
                self.elaborate_expr(current, interp, value);
            }
            TypedStmt::Var { inits, .. } => {
                for init in inits {
                    self.elaborate_expr(current, interp, init);
                }
            }
            TypedStmt::If {
                cond,
                then_block,
                else_block,
            } => {
                // Both branches contribute edges; the graph is conservative.
                self.elaborate_expr(current, interp, cond);
                self.elaborate_block(current, interp, then_block);
                self.elaborate_block(current, interp, else_block);
            }
            TypedStmt::While { cond, body } => {
                self.elaborate_expr(current, interp, cond);
                self.elaborate_block(current, interp, body);
            }
            TypedStmt::ForRange { body, .. } => self.elaborate_block(current, interp, body),
            TypedStmt::Return(Some(e)) => self.elaborate_expr(current, interp, e),
            TypedStmt::Change { expr, body, .. } => {
                self.elaborate_expr(current, interp, expr);
                self.elaborate_block(current, interp, body);
            }
            TypedStmt::Block(b) => self.elaborate_block(current, interp, b),
            _ => {}
        }
    }

    fn elaborate_port_call(
        &mut self,
        current: NodeId,
        activation: NodeId,
        interp: &ConstInterp,
        call: &crate::ast::typed::TypedPortCall,
    ) {
        let Some(mut address) = interp.eval_address(&call.port) else {
            self.report_unresolved(call.span, "activated port");
            return;
        };
        if let Some(index) = &call.index {
            let Some(idx) = interp.eval_int(index) else {
                self.report_unresolved(index.span, "port index");
                return;
            };
            if idx < 0 {
                self.reporter.report(CompileError::new(
                    ErrorCode::NegativePortIndex,
                    index.span,
                    "port index is negative".to_string(),
                ));
                return;
            }
            if call.dimension.is_some_and(|d| idx >= d as i128) {
                self.reporter.report(CompileError::new(
                    ErrorCode::IndexOutOfRange,
                    index.span,
                    "port index is out of range".to_string(),
                ));
                return;
            }
            address += idx as usize * call.unit_size;
        }
        let Some(&port_node) = self.push_ports.get(&address) else {
            self.report_unresolved(call.span, "activated port");
            return;
        };
        self.add_edge(activation, port_node);
        for arg in &call.args {
            self.elaborate_expr(current, interp, arg);
        }
    }

    fn elaborate_expr(&mut self, current: NodeId, interp: &ConstInterp, expr: &TypedExpr) {
        match &expr.kind {
            TypedExprKind::Call { callee, args } => {
                match callee {
                    Callee::Getter { id, receiver } => {
                        self.elaborate_expr(current, interp, receiver);
                        match interp
                            .eval_address(receiver)
                            .and_then(|a| self.instances_by_address.get(&a).copied())
                            .and_then(|inst| self.getters.get(&(inst, *id)).copied())
                        {
                            Some(node) => self.add_edge(current, node),
                            None => self.report_unresolved(receiver.span, "getter receiver"),
                        }
                    }
                    Callee::PullPort { port } => {
                        self.elaborate_expr(current, interp, port);
                        match interp
                            .eval_address(port)
                            .and_then(|a| self.pull_ports.get(&a).copied())
                        {
                            Some(node) => self.add_edge(current, node),
                            None => self.report_unresolved(port.span, "pull port"),
                        }
                    }
                    Callee::Method { receiver, .. } | Callee::Initializer { receiver, .. } => {
                        self.elaborate_expr(current, interp, receiver);
                    }
                    Callee::Function(_) | Callee::Builtin(_) => {}
                }
                for arg in args {
                    self.elaborate_expr(current, interp, arg);
                }
            }
            TypedExprKind::FieldSelect { base, .. } => self.elaborate_expr(current, interp, base),
            TypedExprKind::Index { base, index } => {
                self.elaborate_expr(current, interp, base);
                self.elaborate_expr(current, interp, index);
            }
            TypedExprKind::SliceExpr { base, lo, hi, max } => {
                self.elaborate_expr(current, interp, base);
                for bound in [lo, hi, max].into_iter().flatten() {
                    self.elaborate_expr(current, interp, bound);
                }
            }
            TypedExprKind::AddressOf(inner)
            | TypedExprKind::Dereference(inner)
            | TypedExprKind::Conversion(inner) => self.elaborate_expr(current, interp, inner),
            TypedExprKind::Unary { operand, .. } => self.elaborate_expr(current, interp, operand),
            TypedExprKind::Binary { left, right, .. } => {
                self.elaborate_expr(current, interp, left);
                self.elaborate_expr(current, interp, right);
            }
            _ => {}
        }
    }

    fn report_unresolved(&mut self, span: Span, what: &str) {
        self.reporter.report(CompileError::new(
            ErrorCode::RequiresConstant,
            span,
            format!("cannot statically resolve {}", what),
        ));
    }

    fn node_instance(&self, node: NodeId) -> InstanceId {
        match self.nodes[node.index()].kind {
            NodeKind::Action { instance, .. }
            | NodeKind::Reaction { instance, .. }
            | NodeKind::Getter { instance, .. }
            | NodeKind::Activation { instance, .. }
            | NodeKind::PushPort { instance, .. }
            | NodeKind::PullPort { instance, .. } => instance,
        }
    }

    /// Execute each instance's bind blocks on the constant interpreter.
    fn elaborate_bindings(&mut self) {
        let ctx = self.ctx;
        for i in 0..self.instances.len() {
            let binds: Vec<BindId> = ctx
                .types
                .named_type(self.instances[i].ty)
                .map(|n| n.binds.clone())
                .unwrap_or_default();
            for bid in binds {
                let Some(body) = ctx.decls.bind(bid).body.as_ref() else {
                    continue;
                };
                let mut interp = ConstInterp::new(ctx, self.instances[i].address);
                self.exec_bind_block(&mut interp, body);
            }
        }
    }

    fn exec_bind_block(&mut self, interp: &mut ConstInterp, block: &Block) {
        for stmt in &block.stmts {
            self.exec_bind_stmt(interp, stmt);
        }
    }

    fn exec_bind_stmt(&mut self, interp: &mut ConstInterp, stmt: &TypedStmt) {
        match stmt {
            TypedStmt::BindPush {
                port,
                receiver,
                reaction,
                index,
            } => {
                let Some(port_address) = interp.eval_address(port) else {
                    self.report_unresolved(port.span, "push port");
                    return;
                };
                let Some(&pp) = self.push_ports.get(&port_address) else {
                    self.report_unresolved(port.span, "push port");
                    return;
                };
                let Some(target) = interp
                    .eval_address(receiver)
                    .and_then(|a| self.instances_by_address.get(&a).copied())
                else {
                    self.report_unresolved(receiver.span, "reaction receiver");
                    return;
                };
                let iota = match index {
                    Some(idx) => {
                        let Some(n) = interp.eval_int(idx) else {
                            self.report_unresolved(idx.span, "reaction index");
                            return;
                        };
                        if n < 0 {
                            self.reporter.report(CompileError::new(
                                ErrorCode::NegativePortIndex,
                                idx.span,
                                "reaction index is negative".to_string(),
                            ));
                            return;
                        }
                        let dim = self.ctx.decls.reaction(*reaction).dimension;
                        if dim.is_some_and(|d| n >= d as i128) {
                            self.reporter.report(CompileError::new(
                                ErrorCode::IndexOutOfRange,
                                idx.span,
                                "reaction index is out of range".to_string(),
                            ));
                            return;
                        }
                        n as i64
                    }
                    None => 0,
                };
                let Some(&rnode) = self.reactions.get(&(target, *reaction, iota)) else {
                    self.report_unresolved(receiver.span, "bound reaction");
                    return;
                };
                self.add_edge(pp, rnode);
                if let NodeKind::Reaction {
                    incoming_push_ports, ..
                } = &mut self.nodes[rnode.index()].kind
                {
                    *incoming_push_ports += 1;
                }
            }
            TypedStmt::BindPull { port, receiver, getter } => {
                let Some(port_address) = interp.eval_address(port) else {
                    self.report_unresolved(port.span, "pull port");
                    return;
                };
                let Some(&pp) = self.pull_ports.get(&port_address) else {
                    self.report_unresolved(port.span, "pull port");
                    return;
                };
                let Some(gnode) = interp
                    .eval_address(receiver)
                    .and_then(|a| self.instances_by_address.get(&a).copied())
                    .and_then(|inst| self.getters.get(&(inst, *getter)).copied())
                else {
                    self.report_unresolved(receiver.span, "bound getter");
                    return;
                };
                self.add_edge(pp, gnode);
            }
            TypedStmt::If {
                cond,
                then_block,
                else_block,
            } => match interp.eval_bool(cond) {
                Some(true) => self.exec_bind_block(interp, then_block),
                Some(false) => self.exec_bind_block(interp, else_block),
                None => self.report_unresolved(cond.span, "bind condition"),
            },
            TypedStmt::ForRange { symbol, limit, body } => {
                for i in 0..*limit {
                    interp.bind(*symbol, CValue::Int(i as i128));
                    self.exec_bind_block(interp, body);
                }
            }
            TypedStmt::Var { symbols, inits } => {
                for (sym, init) in symbols.iter().zip(inits) {
                    if let Some(v) = interp.eval(init) {
                        interp.bind(*sym, v);
                    }
                }
            }
            TypedStmt::Block(b) => self.exec_bind_block(interp, b),
            _ => {}
        }
    }

    // === Phase 4: structural checks ===

    fn check_structure(&mut self) {
        // No reaction may be bound to more than one push port.
        for i in 0..self.nodes.len() {
            if let NodeKind::Reaction {
                incoming_push_ports, ..
            } = self.nodes[i].kind
            {
                if incoming_push_ports > 1 {
                    let name = self.nodes[i].name.clone();
                    let span = self.node_spans[i];
                    self.reporter.report(CompileError::new(
                        ErrorCode::MultiplyBoundReaction,
                        span,
                        format!("reaction '{}' is bound more than once", name),
                    ));
                }
            }
        }

        // Every pull port must be bound exactly once.
        for i in 0..self.nodes.len() {
            if let NodeKind::PullPort { .. } = self.nodes[i].kind {
                let count = self.nodes[i].outgoing.len();
                let name = self.nodes[i].name.clone();
                let span = self.node_spans[i];
                if count == 0 {
                    self.reporter.report(CompileError::new(
                        ErrorCode::UnboundPullPort,
                        span,
                        format!("pull port '{}' is not bound", name),
                    ));
                } else if count > 1 {
                    self.reporter.report(CompileError::new(
                        ErrorCode::MultiplyBoundPullPort,
                        span,
                        format!("pull port '{}' is bound more than once", name),
                    ));
                }
            }
        }

        // The graph reachable from the actions must be acyclic.
        let roots: Vec<NodeId> = self
            .instances
            .iter()
            .flat_map(|i| i.actions.iter().copied())
            .collect();
        for root in roots {
            self.tarjan(root);
        }
    }

    fn tarjan(&mut self, n: NodeId) {
        match self.nodes[n.index()].state {
            Mark::Unmarked => {
                self.nodes[n.index()].state = Mark::Temporary;
                let outgoing = self.nodes[n.index()].outgoing.clone();
                for m in outgoing {
                    self.tarjan(m);
                }
                self.nodes[n.index()].state = Mark::Marked;
            }
            Mark::Temporary => {
                if !self.cycle_found {
                    self.cycle_found = true;
                    let name = self.nodes[n.index()].name.clone();
                    let span = self.node_spans[n.index()];
                    self.reporter.report(CompileError::new(
                        ErrorCode::RecursiveComposition,
                        span,
                        format!("composition is recursive through '{}'", name),
                    ));
                }
            }
            Mark::Marked => {}
        }
    }

    // === Phase 5: instance sets ===

    fn compute_instance_sets(&mut self) {
        if self.cycle_found {
            // Instance sets recurse along edges; a cyclic graph has already
            // been rejected.
            return;
        }
        let roots: Vec<NodeId> = self
            .instances
            .iter()
            .flat_map(|i| i.actions.iter().copied())
            .collect();
        for root in roots {
            self.instance_set(root);
        }
    }

    fn instance_set(&mut self, n: NodeId) -> InstanceSet {
        if let Some(set) = &self.nodes[n.index()].instance_set {
            return set.clone();
        }
        let outgoing = self.nodes[n.index()].outgoing.clone();
        let mut set = InstanceSet::new();

        let branching = matches!(
            self.nodes[n.index()].kind,
            NodeKind::Activation { .. } | NodeKind::PushPort { .. } | NodeKind::PullPort { .. }
        );
        for m in outgoing {
            let child = self.instance_set(m);
            if branching && !is_compatible(&set, &child) {
                let (code, what) = match self.nodes[n.index()].kind {
                    NodeKind::Activation { .. } => {
                        (ErrorCode::NonDeterministicActivation, "activation")
                    }
                    NodeKind::PushPort { .. } => (ErrorCode::NonDeterministicPushPort, "push port"),
                    _ => (ErrorCode::NonDeterministicPull, "pull port"),
                };
                let name = self.nodes[n.index()].name.clone();
                let span = self.node_spans[n.index()];
                self.reporter.report(CompileError::new(
                    code,
                    span,
                    format!("system is non-deterministic at {} '{}'", what, name),
                ));
            }
            add_union(&mut set, &child);
        }

        match self.nodes[n.index()].kind {
            NodeKind::Action { instance, action, .. } => {
                let a = self.ctx.decls.action(action);
                insert_access(&mut set, instance, a.precondition_access);
                insert_access(&mut set, instance, a.immutable_phase_access);
            }
            NodeKind::Reaction { instance, reaction, .. } => {
                let r = self.ctx.decls.reaction(reaction);
                insert_access(&mut set, instance, r.immutable_phase_access);
            }
            NodeKind::Getter { instance, getter } => {
                let g = self.ctx.decls.getter(getter);
                insert_access(&mut set, instance, g.immutable_phase_access);
            }
            NodeKind::Activation {
                instance,
                mutable_phase_access,
            } => {
                insert_access(&mut set, instance, mutable_phase_access);
            }
            NodeKind::PushPort { .. } | NodeKind::PullPort { .. } => {}
        }

        self.nodes[n.index()].instance_set = Some(set.clone());
        set
    }
}
