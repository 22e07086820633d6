//! Patch accumulation and output emission.
//!
//! The rewriter produces two sparse maps keyed by byte offset: replacements
//! (replace `[start, end)` with new text) and insertions (splice text in
//! without deleting). Emission is a single left-to-right scan over the
//! source that copies verbatim between patch points.
//!
//! Invariants enforced here:
//! - at most one replacement per start offset;
//! - no patch text contains a line break (line numbers must stay in sync
//!   between input and output);
//! - a replacement never runs backwards;
//! - at emission, no byte is covered by two replacement spans, and a
//!   replaced source span never swallows a line break.

use std::collections::BTreeMap;

use crate::error::{Error, InternalError, MisuseError};
use crate::parser::lexer::{BytePos, Span};

#[derive(Debug, Clone)]
pub struct Replacement {
    pub end: u32,
    pub text: String,
}

/// The rewriter's accumulated edits, keyed by byte offset.
///
/// `BTreeMap` keeps patch points ordered, so emission is a plain ascending
/// walk over the key union.
#[derive(Debug, Default)]
pub struct PatchSet {
    replacements: BTreeMap<u32, Replacement>,
    insertions: BTreeMap<u32, Vec<String>>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.insertions.is_empty()
    }

    /// Registers a replacement of the span `[start, end)` with `text`.
    pub fn replace(
        &mut self,
        start: BytePos,
        end: BytePos,
        text: impl Into<String>,
    ) -> Result<(), InternalError> {
        let (start, end) = (start.0, end.0);
        let text = text.into();
        if end < start {
            return Err(InternalError::ReplacementBackwards { start, end });
        }
        if self.replacements.contains_key(&start) {
            return Err(InternalError::ReplacementExists { start, end });
        }
        if text.contains('\n') {
            return Err(InternalError::PatchContainsNewline { text });
        }
        self.replacements.insert(start, Replacement { end, text });
        Ok(())
    }

    /// Registers an insertion at `pos`. Repeated insertions at the same
    /// position accumulate in call order.
    pub fn insert(&mut self, pos: BytePos, text: impl Into<String>) -> Result<(), InternalError> {
        let text = text.into();
        if text.contains('\n') {
            return Err(InternalError::PatchContainsNewline { text });
        }
        self.insertions.entry(pos.0).or_default().push(text);
        Ok(())
    }

    /// Every distinct patch point, ascending.
    pub fn points(&self) -> Vec<u32> {
        let mut points: Vec<u32> = self.replacements.keys().copied().collect();
        for &pos in self.insertions.keys() {
            if !self.replacements.contains_key(&pos) {
                points.push(pos);
            }
        }
        points.sort_unstable();
        points
    }

    pub fn replacement_at(&self, pos: u32) -> Option<&Replacement> {
        self.replacements.get(&pos)
    }

    pub fn insertions_at(&self, pos: u32) -> Option<&[String]> {
        self.insertions.get(&pos).map(|v| v.as_slice())
    }
}

/// Reconstructs the output text from the source and the patch stream.
///
/// Nothing is produced on error: the returned `String` is the only output,
/// so a failed emission leaves no partial result behind.
pub fn emit(src: &str, patches: &PatchSet) -> Result<String, Error> {
    let mut out = String::with_capacity(src.len() + src.len() / 4);
    let mut pos = 0usize;
    for point in patches.points() {
        let point = point as usize;
        if point > src.len() {
            return Err(InternalError::PatchOutOfBounds { pos: point as u32 }.into());
        }
        if point < pos {
            // This point sits under a prior replacement's span. The
            // rewriter must never produce overlapping edits.
            return Err(InternalError::OverlappingReplacement { pos: point as u32 }.into());
        }
        out.push_str(&src[pos..point]);
        pos = point;
        if let Some(fragments) = patches.insertions_at(point as u32) {
            for fragment in fragments {
                out.push_str(fragment);
            }
        }
        if let Some(replacement) = patches.replacement_at(point as u32) {
            let end = replacement.end as usize;
            if end > src.len() {
                return Err(InternalError::PatchOutOfBounds {
                    pos: replacement.end,
                }
                .into());
            }
            let removed = &src[pos..end];
            if removed.contains('\n') {
                return Err(MisuseError::ReplacementSpansNewline {
                    span: Span::new(point as u32, replacement.end),
                }
                .into());
            }
            out.push_str(&replacement.text);
            pos = end;
        }
    }
    out.push_str(&src[pos..]);
    Ok(out)
}

/// Verbose mode: a plain-text dump of every patch point to stderr, with a
/// little surrounding context. Purely informational.
pub fn dump_patch_points(src: &str, patches: &PatchSet) {
    const CONTEXT: usize = 10;
    let mut prev = 0u32;
    for point in patches.points() {
        let replacement = patches.replacement_at(point);
        let inserted = patches
            .insertions_at(point)
            .map(|f| f.concat())
            .unwrap_or_default();
        let end = replacement.map(|r| r.end).unwrap_or(point);

        let before = context_before(src, point as usize, CONTEXT);
        let after = context_after(src, end as usize, CONTEXT);

        let (action, quoted, result) = match replacement {
            Some(r) => {
                let removed = snippet(src, point as usize, r.end as usize);
                let text = format!("{}{}", inserted, r.text);
                if text.is_empty() {
                    (" deleting", removed, String::new())
                } else {
                    ("replacing", removed, format!(" -> '{}'", text))
                }
            }
            None => ("inserting", String::new(), format!(" -> '{}'", inserted)),
        };
        let skipped = if point < prev { " SKIPPED" } else { "" };
        eprintln!(
            "{} ...{}`{}`{}...{}{}",
            action, before, quoted, after, result, skipped
        );
        prev = end;
    }
}

fn snippet(src: &str, start: usize, end: usize) -> String {
    src.get(start..end)
        .unwrap_or("")
        .replace(char::is_whitespace, " ")
}

fn context_before(src: &str, pos: usize, width: usize) -> String {
    let text: String = src
        .get(..pos)
        .unwrap_or("")
        .chars()
        .rev()
        .take(width)
        .collect();
    text.chars().rev().collect::<String>().replace(char::is_whitespace, " ")
}

fn context_after(src: &str, pos: usize, width: usize) -> String {
    src.get(pos..)
        .unwrap_or("")
        .chars()
        .take(width)
        .collect::<String>()
        .replace(char::is_whitespace, " ")
}
