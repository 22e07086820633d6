//! Scope-legality tests: every illegal bind/escape position must fail with
//! caller misuse, and the documented workarounds must keep working.

use unnest::error::MisuseError;
use unnest::{rewrite, Error};

fn misuse(src: &str) -> MisuseError {
    match rewrite(src).expect_err("rewrite should fail") {
        Error::Misuse(err) => err,
        other => panic!("expected caller misuse, got: {}", other),
    }
}

// ---------------------------------------------------------------------------
// Where binds are illegal
// ---------------------------------------------------------------------------

#[test]
fn test_bind_at_file_scope_is_misuse() {
    let err = misuse("result <- fetchThing(id);");
    assert!(matches!(err, MisuseError::BindInGlobalScope { .. }));
    assert!(err.to_string().contains("cannot bind in global scope"));
}

#[test]
fn test_bind_in_switch_case_is_misuse() {
    let err = misuse("function f(cb) { switch (x) { case 1: r <- g(); } }");
    assert!(matches!(err, MisuseError::BindInSwitchCase { .. }));
}

#[test]
fn test_braced_block_inside_case_lifts_the_ban() {
    let src = "function f(cb) { switch (x) { case 1: { r <- g(); } break; } }";
    let out = rewrite(src).expect("wrapped bind should succeed");
    assert!(out.contains("g(function (err, r) { if (err) return cb(err); return; });"));
}

#[test]
fn test_bind_in_loop_body_is_misuse() {
    let err = misuse("function f(cb) { while (x) { r <- g(); } }");
    assert!(matches!(err, MisuseError::BindInLoop { .. }));
}

#[test]
fn test_bind_in_nested_block_inside_loop_is_still_misuse() {
    let err = misuse("function f(cb) { for (i = 0; i < n; i++) { { r <- g(); } } }");
    assert!(matches!(err, MisuseError::BindInLoop { .. }));
}

#[test]
fn test_function_inside_loop_may_bind() {
    let src = "function f(cb) { while (x) { queue(function (itemCb) { r <- g(); use(r); }); } }";
    let out = rewrite(src).expect("a nested function resets the loop ban");
    assert!(out.contains("g(function (err, r) { if (err) return itemCb(err);"));
}

#[test]
fn test_bind_without_callback_parameter_is_misuse() {
    let err = misuse("function f(x) { r <- g(); }");
    assert!(matches!(err, MisuseError::BindWithoutCallback { .. }));
}

// ---------------------------------------------------------------------------
// Escapes after binding
// ---------------------------------------------------------------------------

#[test]
fn test_break_after_bind_is_misuse() {
    let err = misuse("function f(cb) { switch (x) { case 1: { r <- g(); break; } } }");
    assert!(matches!(
        err,
        MisuseError::EscapeAfterBind {
            keyword: "break",
            ..
        }
    ));
}

#[test]
fn test_continue_after_bind_is_misuse() {
    let err = misuse("function f(cb) { switch (x) { case 1: { r <- g(); continue; } } }");
    assert!(matches!(
        err,
        MisuseError::EscapeAfterBind {
            keyword: "continue",
            ..
        }
    ));
}

#[test]
fn test_break_before_bind_in_case_is_fine() {
    let src = "function f(cb) { switch (x) { case 1: done(); break; } use(x); }";
    let out = rewrite(src).expect("break in a case should succeed");
    assert_eq!(out, src);
}

// ---------------------------------------------------------------------------
// Early exits outside functions
// ---------------------------------------------------------------------------

#[test]
fn test_return_at_file_scope_is_misuse() {
    let err = misuse("return 1;");
    assert!(matches!(err, MisuseError::ReturnInGlobalScope { .. }));
}

#[test]
fn test_yield_outside_bound_scope_is_misuse() {
    let err = misuse("function f(cb) { var x = yield g(); }");
    assert!(matches!(err, MisuseError::YieldOutsideBoundScope { .. }));
}

#[test]
fn test_throw_at_file_scope_is_untouched() {
    let src = "throw new Error('nope');";
    let out = rewrite(src).expect("top-level throw is native");
    assert_eq!(out, src);
}

// ---------------------------------------------------------------------------
// Throw and try interplay
// ---------------------------------------------------------------------------

#[test]
fn test_throw_inside_try_keeps_native_semantics() {
    let src =
        "function f(cb) { r <- g(); try { throw checkFail; } catch (e) { recover(e); } use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("try { throw checkFail; }"));
}

#[test]
fn test_throw_in_bound_scope_outside_try_is_rewritten() {
    let src = "function f(cb) { r <- g(); throw r; }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("return cb(r);"));
}

#[test]
fn test_throw_in_catch_clause_of_bound_scope_is_rewritten() {
    let src = "function f(cb) { r <- g(); try { risky(); } catch (e) { throw e; } use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("catch (e) { return cb(e); }"));
}

// ---------------------------------------------------------------------------
// Malformed bind shapes
// ---------------------------------------------------------------------------

#[test]
fn test_lone_comparison_statement_is_incomplete_arrow() {
    let err = misuse("function f(cb) { x < y; }");
    assert!(matches!(err, MisuseError::IncompleteArrow { .. }));
}

#[test]
fn test_non_identifier_tuple_member_is_misuse() {
    let err = misuse("function f(cb) { a(), x <- g(); }");
    assert!(matches!(err, MisuseError::TupleIdentExpected { .. }));
}

#[test]
fn test_negated_non_call_is_misuse() {
    let err = misuse("function f(cb) { x <- y; }");
    assert!(matches!(err, MisuseError::CallAfterArrow { .. }));
}

#[test]
fn test_comparisons_inside_conditions_are_not_binds() {
    let src = "function f(cb) { if (a < b) { use(a); } }";
    let out = rewrite(src).expect("a comparison in a condition is ordinary");
    assert_eq!(out, src);
}
