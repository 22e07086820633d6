//! End-to-end tests: source string -> rewrite() -> assert output text.

use unnest::{rewrite, rewrite_with_options, Options};

// ---------------------------------------------------------------------------
// The basic bind rewrite
// ---------------------------------------------------------------------------

#[test]
fn test_single_bind_with_argument() {
    let src = "function load(id, cb) { result <- fetchThing(id); use(result); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(
        out,
        "function load(id, cb) { fetchThing(id, function (err, result) { \
         if (err) return cb(err); use(result); return; }); }"
    );
}

#[test]
fn test_bind_without_arguments_gets_no_separating_comma() {
    let src = "function f(cb) { r <- g(); use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(
        out,
        "function f(cb) { g(function (err, r) { \
         if (err) return cb(err); use(r); return; }); }"
    );
}

#[test]
fn test_two_binds_nest_and_close_inside_out() {
    let src = "function f(cb) { a <- one(); b <- two(a); done(a, b); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(
        out,
        "function f(cb) { one(function (err, a) { if (err) return cb(err); \
         two(a, function (err, b) { if (err) return cb(err); \
         done(a, b); return; }); }); }"
    );
}

#[test]
fn test_bind_recognizes_method_call() {
    let src = "function f(cb) { rows <- db.query(sql); use(rows); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("db.query(sql, function (err, rows) { if (err) return cb(err);"));
}

#[test]
fn test_callback_name_heuristic_accepts_callback() {
    let src = "function f(callback) { r <- g(); use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("if (err) return callback(err);"));
}

// ---------------------------------------------------------------------------
// Early-exit rewriting inside bound scopes
// ---------------------------------------------------------------------------

#[test]
fn test_return_value_routes_through_callback() {
    let src = "function load(id, cb) { result <- fetchThing(id); return process(result); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(
        out,
        "function load(id, cb) { fetchThing(id, function (err, result) { \
         if (err) return cb(err); return cb(null, process(result)); }); }"
    );
}

#[test]
fn test_bare_return_is_left_alone() {
    let src = "function f(cb) { r <- g(); if (r) return; use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("if (r) return;"));
    assert!(!out.contains("return cb(null"));
}

#[test]
fn test_return_outside_bound_scope_is_untouched() {
    let src = "function f(cb) { return compute(); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(out, src);
}

#[test]
fn test_throw_in_bound_scope_routes_through_callback() {
    let src = "function f(cb) { r <- g(); throw boom; }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("return cb(boom);"));
    assert!(!out.contains("throw"));
}

#[test]
fn test_yield_in_bound_scope_routes_through_callback() {
    let src = "function f(cb) { r <- g(); var x = yield h(r); use(x); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("var x = cb(null, h(r));"));
}

// ---------------------------------------------------------------------------
// Discard placeholders
// ---------------------------------------------------------------------------

#[test]
fn test_interior_discards_get_ordinal_suffixes() {
    let src = "function f(cb) { _, _, _, x <- q(); use(x); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("function (err, _1, _2, _3, x)"));
}

#[test]
fn test_trailing_discards_are_trimmed() {
    let src = "function f(cb) { a, _, _ <- q(); use(a); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("function (err, a)"));
    assert!(!out.contains("_1"));
}

#[test]
fn test_single_interior_discard_keeps_its_name() {
    let src = "function f(cb) { _, x <- q(); use(x); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("function (err, _, x)"));
}

// ---------------------------------------------------------------------------
// this-capture
// ---------------------------------------------------------------------------

#[test]
fn test_this_using_function_binds_the_continuation() {
    let src = "function f(cb) { this.count = 0; r <- g(); use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(
        out,
        "function f(cb) { this.count = 0; g((function (err, r) { \
         if (err) return cb(err); use(r); return; }).bind(this)); }"
    );
}

#[test]
fn test_this_in_nested_function_does_not_leak_out() {
    let src = "function f(cb) { var h = function () { return this.x; }; r <- g(); use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(!out.contains(".bind(this)"));
}

// ---------------------------------------------------------------------------
// Nested functions reset the bind context
// ---------------------------------------------------------------------------

#[test]
fn test_nested_function_without_callback_keeps_returns() {
    let src = "function outer(cb) { r <- fetch(); var helper = function (x) { return x + 1; }; use(helper(r)); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("return x + 1;"));
    assert!(out.contains("fetch(function (err, r) { if (err) return cb(err);"));
}

#[test]
fn test_nested_function_with_own_callback_binds_independently() {
    let src = "function outer(x) { var inner = function (cb) { r <- g(); use(r); }; inner(done); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.contains("g(function (err, r) { if (err) return cb(err); use(r); return; });"));
}

// ---------------------------------------------------------------------------
// The injected trailing return
// ---------------------------------------------------------------------------

#[test]
fn test_trailing_return_suppresses_injected_return() {
    let src = "function f(cb) { r <- g(); return use(r); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert!(out.ends_with("return cb(null, use(r)); }); }"));
}

#[test]
fn test_debug_mode_marks_suppressed_return() {
    let src = "function f(cb) { r <- g(); return use(r); }";
    let opts = Options {
        debug: true,
        verbose: false,
    };
    let out = rewrite_with_options(src, &opts).expect("rewrite should succeed");
    assert!(out.contains("/* dup ret */"));
}

#[test]
fn test_debug_mode_annotates_blocks() {
    let src = "function f(cb) { a(); }";
    let opts = Options {
        debug: true,
        verbose: false,
    };
    let out = rewrite_with_options(src, &opts).expect("rewrite should succeed");
    assert!(out.contains("/* entry block"));
}
