//! Patch & emit engine tests: ordering, idempotence, and conflict
//! detection.

use unnest::emit::{emit, PatchSet};
use unnest::error::{Error, InternalError, MisuseError};
use unnest::parser::lexer::BytePos;

fn pos(p: u32) -> BytePos {
    BytePos(p)
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[test]
fn test_insert_and_replace_emit_left_to_right() {
    let src = "0123456789";
    let mut patches = PatchSet::new();
    patches.insert(pos(3), "A").unwrap();
    patches.replace(pos(5), pos(7), "xy").unwrap();
    let out = emit(src, &patches).unwrap();
    assert_eq!(out, "012A34xy789");
}

#[test]
fn test_insertions_at_one_point_keep_call_order() {
    let src = "abcdef";
    let mut patches = PatchSet::new();
    patches.insert(pos(2), "1").unwrap();
    patches.insert(pos(2), "2").unwrap();
    patches.insert(pos(2), "3").unwrap();
    let out = emit(src, &patches).unwrap();
    assert_eq!(out, "ab123cdef");
}

#[test]
fn test_insertion_precedes_replacement_at_the_same_point() {
    let src = "0123456";
    let mut patches = PatchSet::new();
    patches.replace(pos(2), pos(4), "R").unwrap();
    patches.insert(pos(2), "I").unwrap();
    let out = emit(src, &patches).unwrap();
    assert_eq!(out, "01IR456");
}

#[test]
fn test_empty_replacement_deletes_the_span() {
    let src = "keep DELETE keep";
    let mut patches = PatchSet::new();
    patches.replace(pos(5), pos(12), "").unwrap();
    let out = emit(src, &patches).unwrap();
    assert_eq!(out, "keep keep");
}

#[test]
fn test_patch_at_offset_zero_is_legal() {
    let src = "tail";
    let mut patches = PatchSet::new();
    patches.insert(pos(0), "head ").unwrap();
    let out = emit(src, &patches).unwrap();
    assert_eq!(out, "head tail");
}

#[test]
fn test_no_patches_reproduce_the_source() {
    let src = "unchanged text\n";
    let patches = PatchSet::new();
    assert!(patches.is_empty());
    let out = emit(src, &patches).unwrap();
    assert_eq!(out, src);
}

// ---------------------------------------------------------------------------
// Idempotence
// ---------------------------------------------------------------------------

#[test]
fn test_emitting_twice_from_one_patch_set_is_identical() {
    let src = "function f() { one(); two(); three(); }";
    let mut patches = PatchSet::new();
    patches.insert(pos(15), "A").unwrap();
    patches.replace(pos(22), pos(28), "TWO();").unwrap();
    patches.insert(pos(38), "B").unwrap();
    let first = emit(src, &patches).unwrap();
    let second = emit(src, &patches).unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Conflict detection
// ---------------------------------------------------------------------------

#[test]
fn test_overlapping_replacements_are_an_internal_error() {
    let src = "0123456789";
    let mut patches = PatchSet::new();
    patches.replace(pos(2), pos(6), "x").unwrap();
    patches.replace(pos(4), pos(8), "y").unwrap();
    let err = emit(src, &patches).unwrap_err();
    assert!(err.is_internal());
    assert!(matches!(
        err,
        Error::Internal(InternalError::OverlappingReplacement { .. })
    ));
}

#[test]
fn test_insertion_under_a_replacement_span_is_an_internal_error() {
    let src = "0123456789";
    let mut patches = PatchSet::new();
    patches.replace(pos(2), pos(8), "x").unwrap();
    patches.insert(pos(5), "y").unwrap();
    let err = emit(src, &patches).unwrap_err();
    assert!(err.is_internal());
}

#[test]
fn test_duplicate_replacement_start_is_rejected_at_registration() {
    let mut patches = PatchSet::new();
    patches.replace(pos(2), pos(4), "a").unwrap();
    let err = patches.replace(pos(2), pos(6), "b").unwrap_err();
    assert!(matches!(err, InternalError::ReplacementExists { .. }));
}

#[test]
fn test_backwards_replacement_is_rejected_at_registration() {
    let mut patches = PatchSet::new();
    let err = patches.replace(pos(6), pos(2), "a").unwrap_err();
    assert!(matches!(err, InternalError::ReplacementBackwards { .. }));
}

#[test]
fn test_patch_text_with_line_break_is_rejected_at_registration() {
    let mut patches = PatchSet::new();
    let err = patches.insert(pos(0), "a\nb").unwrap_err();
    assert!(matches!(err, InternalError::PatchContainsNewline { .. }));
    let err = patches.replace(pos(0), pos(1), "a\nb").unwrap_err();
    assert!(matches!(err, InternalError::PatchContainsNewline { .. }));
}

#[test]
fn test_replacing_a_span_with_a_line_break_is_caller_misuse() {
    let src = "ab\ncd";
    let mut patches = PatchSet::new();
    patches.replace(pos(0), pos(5), "x").unwrap();
    let err = emit(src, &patches).unwrap_err();
    assert!(matches!(
        err,
        Error::Misuse(MisuseError::ReplacementSpansNewline { .. })
    ));
}

#[test]
fn test_patch_beyond_the_source_is_an_internal_error() {
    let src = "short";
    let mut patches = PatchSet::new();
    patches.insert(pos(99), "x").unwrap();
    let err = emit(src, &patches).unwrap_err();
    assert!(matches!(
        err,
        Error::Internal(InternalError::PatchOutOfBounds { .. })
    ));
}
