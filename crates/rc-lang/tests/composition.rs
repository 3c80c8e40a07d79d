//! End-to-end scenarios: component control-context rules and the
//! composition analyzer's structural and determinism checks.

use rc_lang::composition::NodeKind;
use rc_lang::{compile_source, CheckedProgram, ErrorCode, ReceiverAccess};

fn codes(source: &str) -> Vec<ErrorCode> {
    compile_source("test.rc", source)
        .errors
        .iter()
        .map(|e| e.code)
        .collect()
}

fn assert_code(source: &str, code: ErrorCode) {
    let found = codes(source);
    assert!(
        found.contains(&code),
        "expected {:?} in {:?} for:\n{}",
        code,
        found,
        source
    );
}

fn checked(source: &str) -> CheckedProgram {
    let result = compile_source("test.rc", source);
    assert!(
        !result.has_errors(),
        "unexpected errors:\n{}",
        result.format_diagnostics()
    );
    result.program.expect("checked program")
}

/// A counter component whose action fires a push port.
const COUNTER: &str = "\
type Counter component {
    count uint;
    tick push(n int)
}

init (c *Counter) start(n uint) {
    c.count = n
}

getter (c *Counter) current() uint {
    return c.count
}

reaction (c *Counter) bump(n int) {
    activate {
        c.count = c.count + 1
    }
}

action (c *Counter) (c.count < 10) {
    activate tick(1) {
        c.count = c.count + 1
    }
}
";

// === Control contexts ===

#[test]
fn counter_component_is_clean() {
    let source = format!(
        "{}\ntype S component {{ a Counter; b Counter }}\n\
         init (s *S) boot() {{ s.a.start(0)\ns.b.start(0) }}\n\
         bind (s *S) {{ s.a.tick -> s.b.bump\ns.b.tick -> s.a.bump }}\n\
         instance m S boot()",
        COUNTER
    );
    let program = checked(&source);
    let composition = program.composition.as_ref().unwrap();
    // One top-level instance plus two nested counters.
    assert_eq!(composition.instances.len(), 3);
    assert!(composition.instances[0].is_top_level);
    assert!(!composition.instances[1].is_top_level);
}

#[test]
fn writing_receiver_outside_activate_is_rejected() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         action (c *C) (true) { c.count = 1 }",
        ErrorCode::TargetNotMutable,
    );
}

#[test]
fn push_ports_cannot_be_called() {
    assert_code(
        "type C component { out push(n int) }\n\
         init (c *C) start() { }\n\
         action (c *C) (true) { c.out(1) }",
        ErrorCode::CannotCallPushPort,
    );
}

#[test]
fn pull_ports_require_a_read_context() {
    assert_code(
        "type C component { query pull() uint }\n\
         init (c *C) start() { var x uint = c.query() }",
        ErrorCode::PullPortNotInReadContext,
    );
}

#[test]
fn pull_port_call_in_mutable_phase_is_rejected() {
    assert_code(
        "type C component { count uint; query pull() uint }\n\
         init (c *C) start() { }\n\
         action (c *C) (true) { activate { c.count = c.query() } }",
        ErrorCode::CallInMutableSection,
    );
}

#[test]
fn getter_call_in_mutable_phase_is_rejected() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         getter (c *C) current() uint { return c.count }\n\
         action (c *C) (true) { activate { c.count = c.current() } }",
        ErrorCode::CallInMutableSection,
    );
}

#[test]
fn getter_from_plain_function_is_rejected() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         getter (c *C) current() uint { return c.count }\n\
         func f(c *C) uint { return c.current() }",
        ErrorCode::GetterNotInReadContext,
    );
}

#[test]
fn initializer_only_from_initializer() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         func f(c *C) { c.start() }",
        ErrorCode::InitializerNotInInitializer,
    );
}

#[test]
fn reactions_cannot_be_called_directly() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         reaction (c *C) bump(n int) { }\n\
         action (c *C) (true) { c.bump(1)\nactivate { } }",
        ErrorCode::NotCallable,
    );
}

#[test]
fn activate_outside_action_or_reaction() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { activate { } }",
        ErrorCode::ActivateNotInActionOrReaction,
    );
}

#[test]
fn nested_activate_is_rejected() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         action (c *C) (true) { activate { activate { } } }",
        ErrorCode::ActivateNested,
    );
}

#[test]
fn pointer_parameters_are_hidden_in_mutable_phase() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         reaction (c *C) bump(p foreign *int) {\n\
             activate { c.count = uint(*p) }\n\
         }",
        ErrorCode::Hidden,
    );
}

#[test]
fn port_signatures_must_be_foreign_safe() {
    assert_code(
        "type C component { out push(p *int) }",
        ErrorCode::SignatureNotForeignSafe,
    );
}

#[test]
fn getter_returning_pointer_is_rejected() {
    assert_code(
        "type C component { p *int }\n\
         init (c *C) start() { }\n\
         getter (c *C) leak() *int { return c.p }",
        ErrorCode::SignatureNotForeignSafe,
    );
}

// === Instances ===

#[test]
fn instance_of_non_component_type() {
    assert_code("type T int\ninstance a T start()", ErrorCode::MissingType);
}

#[test]
fn instance_without_matching_initializer() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start() { }\n\
         instance a C boot()",
        ErrorCode::NoInitializer,
    );
}

#[test]
fn instance_argument_count_mismatch() {
    assert_code(
        "type C component { count uint }\n\
         init (c *C) start(n uint) { c.count = n }\n\
         instance a C start()",
        ErrorCode::WrongNumberOfInitializers,
    );
}

#[test]
fn receiver_offset_is_smallest_argument_offset() {
    let source = "\
type C component { count uint }
init (c *C) start(n uint, m uint) {
    c.count = n + m
}
instance a C start(1, 2)
";
    let program = checked(source);
    let init = &program.context.decls.initializers[0];
    assert_eq!(init.memory.receiver_offset(), Some(0));
    // Receiver pointer plus two uint parameters.
    assert_eq!(init.memory.arguments_size(), 24);
}

#[test]
fn locals_unwind_on_scope_exit() {
    let source = "\
type C component { count uint }
init (c *C) start() { }
func f() {
    for i := range 2 {
        var a uint = 1
        var b uint = a
    }
    for j := range 2 {
        var d uint = 3
    }
}
instance a C start()
";
    let program = checked(source);
    let f = &program.context.decls.functions[0];
    // Both loops reuse the same region: i + a + b is the high-water mark.
    assert_eq!(f.memory.locals_size(), 24);
}

// === Scenario 1: disjoint instances ===

#[test]
fn disjoint_instances_pass_analysis() {
    let source = "\
type C component {
    count uint;
    out push()
}
init (c *C) start() { }
reaction (c *C) recv() {
    activate {
        c.count = c.count + 1
    }
}
action (c *C) (c.count < 10) {
    activate out() { }
}
bind (c *C) {
    c.out -> c.recv
}
instance a C start()
instance b C start()
";
    let program = checked(source);
    let composition = program.composition.as_ref().unwrap();
    assert_eq!(composition.instances.len(), 2);

    // Each action's instance set only touches its own instance.
    for instance in &composition.instances {
        assert_eq!(instance.actions.len(), 1);
        let set = composition
            .instance_set(instance.actions[0])
            .expect("instance sets are computed");
        assert_eq!(set.len(), 1);
    }
}

// === Scenario 2: recursive composition ===

#[test]
fn recursive_composition_is_rejected() {
    let source = "\
type C component {
    count uint;
    out push()
}
init (c *C) start() { }
reaction (c *C) bounce() {
    activate out() { }
}
action (c *C) (true) {
    activate out() { }
}
type S component { a C; b C }
init (s *S) boot() {
    s.a.start()
    s.b.start()
}
bind (s *S) {
    s.a.out -> s.b.bounce
    s.b.out -> s.a.bounce
}
instance m S boot()
";
    assert_code(source, ErrorCode::RecursiveComposition);
}

// === Scenario 3: non-deterministic writes behind one port ===

#[test]
fn fan_out_writing_one_sink_is_non_deterministic() {
    let source = "\
type Sink component { val uint }
init (k *Sink) kstart() { }
reaction (k *Sink) pokeA() {
    activate { k.val = k.val + 1 }
}
reaction (k *Sink) pokeB() {
    activate { k.val = k.val + 2 }
}
type Src component { out push() }
init (c *Src) cstart() { }
action (c *Src) (true) {
    activate out() { }
}
type S component { x Src; k Sink }
init (s *S) boot() {
    s.x.cstart()
    s.k.kstart()
}
bind (s *S) {
    s.x.out -> s.k.pokeA
    s.x.out -> s.k.pokeB
}
instance m S boot()
";
    assert_code(source, ErrorCode::NonDeterministicPushPort);
}

#[test]
fn activation_fanning_to_one_sink_is_non_deterministic() {
    let source = "\
type Sink component { val uint }
init (k *Sink) kstart() { }
reaction (k *Sink) pokeA() {
    activate { k.val = k.val + 1 }
}
reaction (k *Sink) pokeB() {
    activate { k.val = k.val + 2 }
}
type Src component { p push(); q push() }
init (c *Src) cstart() { }
action (c *Src) (true) {
    activate p(), q() { }
}
type S component { x Src; k Sink }
init (s *S) boot() {
    s.x.cstart()
    s.k.kstart()
}
bind (s *S) {
    s.x.p -> s.k.pokeA
    s.x.q -> s.k.pokeB
}
instance m S boot()
";
    assert_code(source, ErrorCode::NonDeterministicActivation);
}

#[test]
fn fan_out_reading_one_sink_is_deterministic() {
    let source = "\
type Sink component { val uint }
init (k *Sink) kstart() { }
reaction (k *Sink) seeA() { }
reaction (k *Sink) seeB() { }
type Src component { out push() }
init (c *Src) cstart() { }
action (c *Src) (true) {
    activate out() { }
}
type S component { x Src; k Sink }
init (s *S) boot() {
    s.x.cstart()
    s.k.kstart()
}
bind (s *S) {
    s.x.out -> s.k.seeA
    s.x.out -> s.k.seeB
}
instance m S boot()
";
    checked(source);
}

// === Scenario 4: pull port binding ===

#[test]
fn unbound_pull_port_is_rejected() {
    let source = "\
type C component { query pull() uint }
init (c *C) start() { }
instance a C start()
";
    assert_code(source, ErrorCode::UnboundPullPort);
}

#[test]
fn multiply_bound_pull_port_is_rejected() {
    let source = "\
type Store component { val uint }
init (k *Store) kstart() { }
getter (k *Store) current() uint { return k.val }
type Reader component { query pull() uint }
init (r *Reader) rstart() { }
type S component { a Reader; b Store }
init (s *S) boot() {
    s.a.rstart()
    s.b.kstart()
}
bind (s *S) {
    s.a.query <- s.b.current
    s.a.query <- s.b.current
}
instance m S boot()
";
    assert_code(source, ErrorCode::MultiplyBoundPullPort);
}

#[test]
fn pull_port_reaches_its_getter() {
    let source = "\
type Store component { val uint }
init (k *Store) kstart() { }
getter (k *Store) current() uint { return k.val }
type Reader component {
    total uint;
    query pull() uint
}
init (r *Reader) rstart() { }
action (r *Reader) (r.query() < 100) {
    activate {
        r.total = r.total + 1
    }
}
type S component { a Reader; b Store }
init (s *S) boot() {
    s.a.rstart()
    s.b.kstart()
}
bind (s *S) {
    s.a.query <- s.b.current
}
instance m S boot()
";
    let program = checked(source);
    let composition = program.composition.as_ref().unwrap();

    // The action's instance set reaches the reader (write) and the store
    // (read through the pull port and getter).
    let reader = composition
        .instances
        .iter()
        .find(|i| i.name == "m.a")
        .expect("nested reader instance");
    let set = composition
        .instance_set(reader.actions[0])
        .expect("instance set");
    assert_eq!(set.len(), 2, "action set: {:?}", set);
    assert!(set.values().any(|&a| a == ReceiverAccess::Write));
}

// === Scenario: multiply bound reaction ===

#[test]
fn multiply_bound_reaction_is_rejected() {
    let source = "\
type Sink component { val uint }
init (k *Sink) kstart() { }
reaction (k *Sink) poke() { }
type Src component { p push(); q push() }
init (c *Src) cstart() { }
action (c *Src) (true) {
    activate p(), q() { }
}
type S component { x Src; k Sink }
init (s *S) boot() {
    s.x.cstart()
    s.k.kstart()
}
bind (s *S) {
    s.x.p -> s.k.poke
    s.x.q -> s.k.poke
}
instance m S boot()
";
    assert_code(source, ErrorCode::MultiplyBoundReaction);
}

// === Dimensioned actions, reactions, and port arrays ===

#[test]
fn dimensioned_bindings_elaborate_under_for_range() {
    let source = "\
type C component {
    count uint;
    fan [2]push()
}
init (c *C) start() { }
reaction [2] (c *C) recv() {
    activate {
        c.count = c.count + 1
    }
}
action [2] (c *C) (c.count < 10) {
    activate fan[iota]() { }
}
type S component { a C; b C }
init (s *S) boot() {
    s.a.start()
    s.b.start()
}
bind (s *S) {
    for i := range 2 {
        s.a.fan[i] -> s.b.recv[i]
        s.b.fan[i] -> s.a.recv[i]
    }
}
instance m S boot()
";
    let program = checked(source);
    let composition = program.composition.as_ref().unwrap();

    // Two nested instances, each with two action nodes (one per index).
    let a = composition
        .instances
        .iter()
        .find(|i| i.name == "m.a")
        .unwrap();
    assert_eq!(a.actions.len(), 2);

    // Each push-port element has exactly one bound reaction.
    for node in &composition.nodes {
        if let NodeKind::PushPort { .. } = node.kind {
            assert_eq!(node.outgoing.len(), 1, "port {}", node.name);
        }
    }
}

#[test]
fn bind_index_out_of_range() {
    let source = "\
type C component { out push() }
init (c *C) start() { }
reaction [2] (c *C) recv() { }
type S component { a C; b C }
init (s *S) boot() {
    s.a.start()
    s.b.start()
}
bind (s *S) {
    s.a.out -> s.b.recv[2]
}
instance m S boot()
";
    assert_code(source, ErrorCode::IndexOutOfRange);
}

#[test]
fn conditional_bindings_fold_at_elaboration() {
    let source = "\
const wired = true
type Sink component { val uint }
init (k *Sink) kstart() { }
reaction (k *Sink) poke() { }
type Src component { out push() }
init (c *Src) cstart() { }
action (c *Src) (true) {
    activate out() { }
}
type S component { x Src; k Sink }
init (s *S) boot() {
    s.x.cstart()
    s.k.kstart()
}
bind (s *S) {
    if wired {
        s.x.out -> s.k.poke
    }
}
instance m S boot()
";
    let program = checked(source);
    let composition = program.composition.as_ref().unwrap();
    let bound = composition
        .nodes
        .iter()
        .filter(|n| matches!(n.kind, NodeKind::PushPort { .. }))
        .all(|n| n.outgoing.len() == 1);
    assert!(bound, "conditional binding did not elaborate");
}

// === Graph output ===

#[test]
fn graphviz_dump_names_every_edge() {
    let source = "\
type C component {
    count uint;
    out push()
}
init (c *C) start() { }
reaction (c *C) recv() { }
action (c *C) (c.count < 10) {
    activate out() { }
}
bind (c *C) {
    c.out -> c.recv
}
instance a C start()
";
    let program = checked(source);
    let composition = program.composition.as_ref().unwrap();
    let dot = composition.to_graphviz();
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("a.out"));
    assert!(dot.contains("a.recv"));

    let summary = composition.to_summary();
    assert_eq!(summary.instances.len(), 1);
    assert!(summary.nodes.iter().any(|n| n.kind == "push-port"));
    assert!(summary.nodes.iter().any(|n| n.kind == "activation"));
}
