//! Semantic error scenarios: each source fragment must produce the
//! expected diagnostic code.

use rc_lang::{compile_source, ErrorCode};

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

fn assert_clean(source: &str) {
    let result = compile_source("test.rc", source);
    assert!(
        !result.has_errors(),
        "unexpected errors:\n{}",
        result.format_diagnostics()
    );
}

// === Name resolution ===

#[test]
fn undefined_name() {
    assert_code("func f() { var x int = y }", ErrorCode::Undefined);
}

#[test]
fn redefined_top_level() {
    assert_code("type A int\ntype A uint", ErrorCode::Redefined);
}

#[test]
fn redefined_local() {
    assert_code(
        "func f() { var x int = 1\nvar x int = 2 }",
        ErrorCode::Redefined,
    );
}

#[test]
fn shadowing_in_nested_scope_is_legal() {
    assert_clean("func f() { var x int = 1\nif x < 2 { var x int = 3\nx = x + 1 } }");
}

// === Types and constants ===

#[test]
fn recursive_struct_type() {
    assert_code("type A struct { next A }", ErrorCode::RecursiveType);
}

#[test]
fn recursive_alias() {
    assert_code("type A A", ErrorCode::RecursiveType);
}

#[test]
fn recursion_through_pointer_is_legal() {
    assert_clean("type List struct { value int; next *List }");
}

#[test]
fn untyped_constant_overflow() {
    assert_code("func f() { var x uint8 = 300 }", ErrorCode::NotRepresentable);
}

#[test]
fn untyped_negative_to_unsigned() {
    assert_code("func f() { var x uint = 0 - 1 }", ErrorCode::NotRepresentable);
}

#[test]
fn constant_folding_in_range() {
    assert_clean("const k = 250 + 5\nfunc f() { var x uint8 = k }");
}

#[test]
fn non_constant_const_initializer() {
    assert_code(
        "func f(n int) { const k = n }",
        ErrorCode::RequiresConstant,
    );
}

#[test]
fn division_by_zero_never_folds() {
    assert_code("const k = 1 / 0", ErrorCode::CannotBeApplied);
}

#[test]
fn distinct_named_types_do_not_assign() {
    // `x + 2` converts the untyped 2 to x's type; int and int64 stay apart.
    assert_code(
        "func f() { var x int = 1\nvar y int64 = x + 2 }",
        ErrorCode::NotAssignable,
    );
}

#[test]
fn unnamed_and_named_with_same_underlying_assign() {
    assert_clean("type MyInt int\nfunc f() { var x MyInt = 1\nvar y int = 2\nx = MyInt(y) }");
}

#[test]
fn typed_conversion_between_numerics() {
    assert_clean("func f() { var x int = 1\nvar y float64 = float64(x) }");
}

#[test]
fn conversion_of_bool_to_int_is_rejected() {
    assert_code(
        "func f() { var b bool = true\nvar x int = int(b) }",
        ErrorCode::NotConvertible,
    );
}

#[test]
fn string_byte_slice_conversions() {
    assert_clean(
        "func f() { var s string = \"abc\"\nvar b []uint8 = []uint8(s)\nvar t string = string(b) }",
    );
}

// === Operators ===

#[test]
fn arithmetic_on_booleans_is_rejected() {
    assert_code("func f() { var x bool = true + false }", ErrorCode::CannotBeApplied);
}

#[test]
fn comparison_yields_untyped_boolean_for_constants() {
    assert_clean("const k = 3 < 4\nfunc f() { var b bool = k }");
}

#[test]
fn ordering_on_complex_is_rejected() {
    assert_code(
        "func f() { var a complex128 = complex128(1.0)\nvar b bool = a < a }",
        ErrorCode::CannotBeApplied,
    );
}

#[test]
fn logical_operators_fold() {
    assert_clean("const k = false && 3 < 2 || true\nfunc f() { var b bool = k }");
}

#[test]
fn shift_with_negative_constant_count() {
    assert_code(
        "const k int8 = 0 - 1\nfunc f() { var x int = 1 << k }",
        ErrorCode::NotRepresentable,
    );
}

#[test]
fn shift_with_signed_variable_count() {
    assert_code(
        "func f(n int) { var x int = 1 << n }",
        ErrorCode::CannotBeApplied,
    );
}

#[test]
fn shift_with_unsigned_variable_count() {
    assert_clean("func f(n uint) { var x int = 1 << n }");
}

// === Index and slice bounds ===

#[test]
fn constant_index_out_of_range() {
    assert_code(
        "func f() { var a [4]int\nvar x int = a[5] }",
        ErrorCode::IndexOutOfRange,
    );
}

#[test]
fn constant_index_negative() {
    assert_code(
        "func f() { var a [4]int\nvar x int = a[0 - 1] }",
        ErrorCode::IndexOutOfRange,
    );
}

#[test]
fn index_through_pointer_to_array() {
    assert_clean("func f(p *[4]int) int { return p[2] }");
}

#[test]
fn slice_bounds_must_be_ordered() {
    assert_code(
        "func f() { var a [4]int\nvar s []int = a[3:2] }",
        ErrorCode::SliceOutOfRange,
    );
}

#[test]
fn slice_max_beyond_capacity() {
    assert_code(
        "func f() { var a [4]int\nvar s []int = a[0:2:9] }",
        ErrorCode::SliceOutOfRange,
    );
}

#[test]
fn full_slice_expression() {
    assert_clean("func f() { var a [4]int\nvar s []int = a[1:3:4]\ns = a[:] }");
}

// === Mutability and leaks ===

#[test]
fn assignment_target_must_be_mutable() {
    assert_code(
        "func f() { for i := range 3 { i = 2 } }",
        ErrorCode::TargetNotMutable,
    );
}

#[test]
fn foreign_pointer_cannot_enter_mutable_slot() {
    assert_code(
        "func f(p foreign *int) { var q *int = p }",
        ErrorCode::LeaksPointers,
    );
}

#[test]
fn const_pointer_cannot_enter_mutable_slot() {
    assert_code(
        "func f(p const *int) { var q *int = p }",
        ErrorCode::LeaksPointers,
    );
}

#[test]
fn dropping_pointer_rights_is_legal() {
    assert_clean("func f(p *int) { var q const *int = p\nvar r foreign *int = q }");
}

#[test]
fn argument_leak_is_reported() {
    assert_code(
        "func g(q *int) { }\nfunc f(p foreign *int) { g(p) }",
        ErrorCode::LeaksPointers,
    );
}

// === Functions, templates, and calls ===

#[test]
fn wrong_argument_count() {
    assert_code("func g(x int) { }\nfunc f() { g() }", ErrorCode::FuncExpectsCount);
}

#[test]
fn wrong_argument_type() {
    assert_code(
        "func g(x int) { }\nfunc f() { g(\"s\") }",
        ErrorCode::NotRepresentable,
    );
}

#[test]
fn calling_a_non_function() {
    assert_code("func f() { var x int = 1\nx(2) }", ErrorCode::NotCallable);
}

#[test]
fn return_type_mismatch() {
    assert_code("func f() int { return }", ErrorCode::ReturnTypeMismatch);
}

#[test]
fn return_value_from_void_function() {
    assert_code("func f() { return 3 }", ErrorCode::ReturnTypeMismatch);
}

#[test]
fn len_expects_one_argument() {
    assert_code("func f() { var x int = len() }", ErrorCode::FuncExpectsCount);
}

#[test]
fn len_folds_for_arrays_and_strings() {
    assert_clean("const n = len(\"abcd\")\nfunc f() { var a [n]int\nvar x int = len(a) }");
}

#[test]
fn new_requires_a_type() {
    assert_code("func f() { var p *int = new(3) }", ErrorCode::RequiresType);
}

#[test]
fn new_with_composite_type() {
    assert_clean("func f() { var p *[4]int = new([4]int)\nvar x int = p[0] }");
}

#[test]
fn append_returns_the_slice_type() {
    assert_clean("func f(s []int) []int { return append(s, 1, 2) }");
}

#[test]
fn println_accepts_any_values() {
    assert_clean("func f() { println(1, \"two\", 3.0, true) }");
}

// === Heap operations ===

#[test]
fn move_requires_pointer_to_heap() {
    assert_code("func f(p *int) { var q *int = move(p) }", ErrorCode::CannotBeApplied);
}

#[test]
fn move_and_change_on_heap_links() {
    assert_clean(
        "func f() {\n\
             var h *heap int = new(heap int)\n\
             change root = h {\n\
                 *root = 4\n\
             }\n\
             var p *int = merge(h)\n\
         }",
    );
}

#[test]
fn change_requires_heap_pointer() {
    assert_code(
        "func f(p *int) { change root = p { } }",
        ErrorCode::CannotBeApplied,
    );
}

#[test]
fn change_demotes_ambient_pointers() {
    // Inside the change block the parameter q is foreign; storing it into a
    // mutable slot reached through the root would leak.
    assert_code(
        "type Cell struct { p *int }\n\
         func f(q *int) {\n\
             var h *heap Cell = new(heap Cell)\n\
             change root = h {\n\
                 root.p = q\n\
             }\n\
         }",
        ErrorCode::LeaksPointers,
    );
}

// === For range ===

#[test]
fn range_bound_must_be_constant() {
    assert_code("func f(n int) { for i := range n { } }", ErrorCode::RequiresConstant);
}

#[test]
fn range_bound_must_be_positive() {
    assert_code("func f() { for i := range 0 { } }", ErrorCode::RequiresConstant);
}

#[test]
fn range_over_constant() {
    assert_clean("const n = 4\nfunc f() { var s int\nfor i := range n { s = s + i } }");
}
