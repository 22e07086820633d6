//! Round-trip identity: bind-free input must come back byte-identical, and
//! dead code must be marked rather than deleted.

use unnest::rewrite;

const KITCHEN_SINK: &str = r#"var count = 0;
function helper(list, fn) {
    for (var i = 0; i < list.length; i++) {
        if (!fn(list[i])) { break; }
    }
    for (var key in list) { log(key); }
    while (count > 0) { count--; }
    do { count += 2; } while (count < 10);
    switch (count % 3) {
    case 0:
        reset();
        break;
    case 1:
    default:
        bump();
    }
    try { risky(); } catch (e) { report(e); } finally { cleanup(); }
    return { size: list.length, first: list[0], ok: true };
}
var obj = new Thing(1, 'two');
obj.go(typeof count === 'number' ? count : -1);
"#;

#[test]
fn test_kitchen_sink_roundtrips() {
    let out = rewrite(KITCHEN_SINK).expect("bind-free input should rewrite cleanly");
    assert_eq!(out, KITCHEN_SINK);
}

#[test]
fn test_comments_and_strings_roundtrip() {
    let src = "// leading comment\nfoo('a \\'quoted\\' string'); /* inline */ bar(\"double\");\n";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(out, src);
}

#[test]
fn test_callback_function_without_binds_roundtrips() {
    let src = "function load(id, cb) { fetchThing(id, cb); return cb; }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(out, src);
}

#[test]
fn test_empty_function_roundtrips() {
    let src = "function noop(cb) {}";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(out, src);
}

#[test]
fn test_rewriting_twice_is_stable_on_bind_free_output() {
    let src = "function f(cb) { r <- g(); use(r); }";
    let once = rewrite(src).expect("first rewrite should succeed");
    let twice = rewrite(&once).expect("second rewrite should succeed");
    assert_eq!(once, twice);
}

// ---------------------------------------------------------------------------
// Dead code is marked, never removed
// ---------------------------------------------------------------------------

#[test]
fn test_statements_after_return_are_marked_dead() {
    let src = "function f(cb) { return 1; log(one); log(two); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(
        out,
        "function f(cb) { return 1; /* DEAD */ log(one); /* DEAD */ log(two); }"
    );
}

#[test]
fn test_dead_marking_propagates_into_nested_blocks() {
    let src = "function f(cb) { return 1; { log(one); } }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(
        out,
        "function f(cb) { return 1; /* DEAD */ { /* DEAD */ log(one); } }"
    );
}

#[test]
fn test_code_after_if_is_not_dead() {
    let src = "function f(cb) { if (x) { return 1; } log(one); }";
    let out = rewrite(src).expect("rewrite should succeed");
    assert_eq!(out, src);
}
