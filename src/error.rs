use thiserror::Error;

use crate::parser::lexer::Span;

/// Top-level error type for the rewrite pipeline.
///
/// Two disjoint failure worlds sit under it: `Misuse` means the input used
/// the bind constructs somewhere the scope rules forbid (show it to the
/// user as-is), while `Internal` means an engine invariant broke (a bug in
/// this tool, not in the input). Either way the whole compilation of that
/// input aborts; no partial output is ever emitted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Misuse(#[from] MisuseError),

    #[error("internal error: {0}")]
    Internal(#[from] InternalError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}' (at byte {pos})")]
    UnexpectedChar { ch: char, pos: u32 },

    #[error("unterminated string literal; strings may not span lines (at byte {pos})")]
    UnterminatedString { pos: u32 },

    #[error("unterminated block comment (at byte {pos})")]
    UnterminatedComment { pos: u32 },

    #[error("expected {expected}, but found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of file while parsing {context}")]
    UnexpectedEof { context: String },
}

// ---------------------------------------------------------------------------
// Caller misuse
// ---------------------------------------------------------------------------

/// The input uses bind/yield/throw/break/continue in a position the scope
/// rules forbid. Always carries the offending span so the driver can quote
/// the source.
#[derive(Debug, Error)]
pub enum MisuseError {
    #[error("cannot bind in global scope; wrap the statement in a function")]
    BindInGlobalScope { span: Span },

    #[error("cannot bind in a switch case; wrap the statement in a braced block")]
    BindInSwitchCase { span: Span },

    #[error("cannot bind inside a loop body")]
    BindInLoop { span: Span },

    #[error("cannot bind inside a function without a callback parameter")]
    BindWithoutCallback { span: Span },

    #[error("cannot {keyword} after binding; the rest of this block already runs inside the generated callback")]
    EscapeAfterBind { keyword: &'static str, span: Span },

    #[error("cannot return in global scope")]
    ReturnInGlobalScope { span: Span },

    #[error("cannot yield in global scope")]
    YieldInGlobalScope { span: Span },

    #[error("cannot yield in a non-bound scope")]
    YieldOutsideBoundScope { span: Span },

    #[error("identifier(s) expected in tuple before arrow")]
    TupleIdentExpected { span: Span },

    #[error("incomplete arrow; expected '<-' followed by a call")]
    IncompleteArrow { span: Span },

    #[error("identifier(s) expected before arrow")]
    IdentBeforeArrow { span: Span },

    #[error("call expected after arrow")]
    CallAfterArrow { span: Span },

    #[error("a rewritten span would swallow a line break; keep the statement on one line")]
    ReplacementSpansNewline { span: Span },
}

// ---------------------------------------------------------------------------
// Internal errors
// ---------------------------------------------------------------------------

/// An analyzer/rewriter/emitter invariant broke. These are defects in the
/// tool itself and are surfaced distinctly from caller misuse.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("unexpected {kind} node in statement position; this is a bug in unnest, please report it")]
    UnexpectedStmtNode { kind: &'static str, span: Span },

    #[error("scope opened on a {kind} node instead of a block; this is a bug in unnest, please report it")]
    BlockRequired { kind: &'static str, span: Span },

    #[error("rewrite scope stack out of balance; this is a bug in unnest, please report it")]
    UnbalancedScopeStack { span: Span },

    #[error("replacement at byte {start} already exists; this is a bug in unnest, please report it")]
    ReplacementExists { start: u32, end: u32 },

    #[error("replacement {start}..{end} would run backwards; this is a bug in unnest, please report it")]
    ReplacementBackwards { start: u32, end: u32 },

    #[error("patch text >>>{text}<<< contains a line break; this is a bug in unnest, please report it")]
    PatchContainsNewline { text: String },

    #[error("patch point at byte {pos} is covered by an earlier replacement; this is a bug in unnest, please report it")]
    OverlappingReplacement { pos: u32 },

    #[error("patch point at byte {pos} lies outside the source; this is a bug in unnest, please report it")]
    PatchOutOfBounds { pos: u32 },
}

// ---------------------------------------------------------------------------
// Span extraction (for diagnostics rendering)
// ---------------------------------------------------------------------------

impl Error {
    /// The source span implicated by this error, when one is known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Parse(err) => match err {
                ParseError::UnexpectedChar { pos, .. }
                | ParseError::UnterminatedString { pos }
                | ParseError::UnterminatedComment { pos } => Some(Span::at(*pos)),
                ParseError::UnexpectedToken { span, .. } => Some(*span),
                ParseError::UnexpectedEof { .. } => None,
            },
            Error::Misuse(err) => match err {
                MisuseError::BindInGlobalScope { span }
                | MisuseError::BindInSwitchCase { span }
                | MisuseError::BindInLoop { span }
                | MisuseError::BindWithoutCallback { span }
                | MisuseError::EscapeAfterBind { span, .. }
                | MisuseError::ReturnInGlobalScope { span }
                | MisuseError::YieldInGlobalScope { span }
                | MisuseError::YieldOutsideBoundScope { span }
                | MisuseError::TupleIdentExpected { span }
                | MisuseError::IncompleteArrow { span }
                | MisuseError::IdentBeforeArrow { span }
                | MisuseError::CallAfterArrow { span }
                | MisuseError::ReplacementSpansNewline { span } => Some(*span),
            },
            Error::Internal(err) => match err {
                InternalError::UnexpectedStmtNode { span, .. }
                | InternalError::BlockRequired { span, .. }
                | InternalError::UnbalancedScopeStack { span } => Some(*span),
                InternalError::ReplacementExists { start, end }
                | InternalError::ReplacementBackwards { start, end } => {
                    Some(Span::new(*start, *end))
                }
                InternalError::OverlappingReplacement { pos }
                | InternalError::PatchOutOfBounds { pos } => Some(Span::at(*pos)),
                InternalError::PatchContainsNewline { .. } => None,
            },
            Error::Io(_) => None,
        }
    }

    /// Whether this error is a defect in the tool rather than in the input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}
