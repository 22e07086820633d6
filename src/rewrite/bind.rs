//! Recognition of bind statements.
//!
//! A bind statement reuses the host grammar as-is: `r <- call(args)` parses
//! as `r < (-call(args))`, an ordinary comparison against an arithmetic
//! negation. `recognize` reinterprets that shape. The pun is contained here
//! so nothing else in the rewriter needs to know about it.

use crate::error::MisuseError;
use crate::parser::ast::{BinaryOp, NodeId, NodeKind, SyntaxTree, UnaryOp};
use crate::parser::lexer::BytePos;

/// The reserved discard name in binder lists.
pub const DISCARD: &str = "_";

/// A recognized bind statement `p1, p2, .. <- call(args)`.
#[derive(Debug)]
pub struct BindForm {
    /// Binder names left of the arrow, in order (discards included).
    pub binders: Vec<String>,
    /// Byte offset where the bound call starts; everything from the
    /// statement start up to here is deleted.
    pub call_start: BytePos,
    /// Byte offset just past the call's last argument.
    pub args_end: BytePos,
    /// Whether the call already has arguments (controls the separating
    /// comma in front of the generated continuation).
    pub has_args: bool,
}

/// Tries to reinterpret the top-level expression of an expression statement
/// as a bind form.
///
/// Returns `Ok(None)` for ordinary expressions (no top-level `<` against a
/// negation). Shapes that are unmistakably meant as binds but malformed
/// (non-identifier tuple members, a negated non-call, ...) are caller
/// misuse, not ordinary expressions.
pub fn recognize(tree: &SyntaxTree, expr: NodeId) -> Result<Option<BindForm>, MisuseError> {
    let (tuple, last) = match tree.kind(expr) {
        NodeKind::Comma { exprs } => match exprs.split_last() {
            Some((last, rest)) => (rest, *last),
            None => return Ok(None),
        },
        _ => (&[][..], expr),
    };

    let (lhs, rhs) = match tree.kind(last) {
        NodeKind::Binary {
            op: BinaryOp::Lt,
            lhs,
            rhs,
        } => (*lhs, *rhs),
        _ => return Ok(None),
    };

    let mut binders = Vec::with_capacity(tuple.len() + 1);
    for &member in tuple {
        match tree.kind(member) {
            NodeKind::Ident(name) => binders.push(name.clone()),
            _ => {
                return Err(MisuseError::TupleIdentExpected {
                    span: tree.span(member),
                })
            }
        }
    }

    let negated = match tree.kind(rhs) {
        NodeKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => *operand,
        _ => {
            return Err(MisuseError::IncompleteArrow {
                span: tree.span(last),
            })
        }
    };

    match tree.kind(lhs) {
        NodeKind::Ident(name) => binders.push(name.clone()),
        _ => {
            return Err(MisuseError::IdentBeforeArrow {
                span: tree.span(last),
            })
        }
    }

    let args = match tree.kind(negated) {
        NodeKind::Call { args, .. } => args,
        _ => {
            return Err(MisuseError::CallAfterArrow {
                span: tree.span(last),
            })
        }
    };

    // The call's span ends past its last argument (the closing parenthesis
    // belongs to no node), so the span end is the splice point and the
    // replaced span up to the statement end is empty.
    Ok(Some(BindForm {
        binders,
        call_start: tree.span(negated).start,
        args_end: tree.span(negated).end,
        has_args: !args.is_empty(),
    }))
}

/// Prepares the binder list for use as continuation parameters: trailing
/// discards are trimmed, and when more than one discard remains the
/// survivors get 1-based ordinal suffixes so no parameter name repeats.
pub fn filter_discards(binders: &[String]) -> Vec<String> {
    let mut params = binders.to_vec();
    while params.last().map(|p| p == DISCARD).unwrap_or(false) {
        params.pop();
    }
    let discards = params.iter().filter(|p| *p == DISCARD).count();
    if discards > 1 {
        let mut ordinal = 1;
        for param in &mut params {
            if param == DISCARD {
                *param = format!("{}{}", DISCARD, ordinal);
                ordinal += 1;
            }
        }
    }
    params
}

/// The error-first callback naming heuristic: a trailing parameter whose
/// name contains a `cb`/`callback`-style abbreviation (case-insensitive)
/// marks the function as callback-bearing.
pub fn is_callback_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    // "cb" also covers "cback"; "callb" also covers "callback".
    lower.contains("cb") || lower.contains("callb")
}
