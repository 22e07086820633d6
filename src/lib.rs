//! unnest: flattens callback-nested asynchronous code.
//!
//! A bind statement `results <- asyncCall(args);` inside a function that
//! receives an error-first callback is rewritten into the equivalent
//! nested-callback form, with `return`, `throw`, `yield`, `break`, and
//! `continue` patched so they keep their meaning inside the generated
//! closures.
//!
//! Pipeline:
//!
//! ```text
//! source (.ujs) -> Lexer -> [Tokens] -> Parser -> [SyntaxTree]
//!   -> Analyzer -> [Analysis: block graph + side tables]
//!   -> Rewriter -> [PatchSet: replacements + insertions]
//!   -> Emit     -> output text
//! ```
//!
//! The two tree walks share nothing but the `Analysis` side tables: the
//! analyzer partitions statement lists into basic blocks and records how
//! control escapes nested constructs; the rewriter consumes those
//! annotations while maintaining a scope stack that encodes what is legal
//! at each nesting depth. Emission is a single left-to-right scan. Each
//! pass owns its state, so independent inputs can be rewritten from
//! independent calls with nothing shared.

pub mod analyze;
pub mod cli;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod parser;
pub mod rewrite;

pub use error::Error;

/// Controls for a rewrite run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Insert basic-block annotation comments and duplicate-return markers
    /// into the output.
    pub debug: bool,
    /// Dump every patch point to stderr before emitting.
    pub verbose: bool,
}

/// Rewrites `source` with default options.
pub fn rewrite(source: &str) -> Result<String, Error> {
    rewrite_with_options(source, &Options::default())
}

/// Rewrites `source` through the full pipeline.
///
/// Returns the output text, or the first error any stage hit. Either the
/// whole transform succeeds or nothing is produced; there is no partial
/// output.
pub fn rewrite_with_options(source: &str, opts: &Options) -> Result<String, Error> {
    // 1. Lex + parse.
    let tree = parser::parse_source(source)?;

    // 2. Control-flow analysis: block graph and per-statement side tables.
    let analysis = analyze::analyze(&tree)?;

    // 3. Rewrite binds and early exits into a patch stream.
    let patches = rewrite::rewrite_tree(&tree, &analysis, opts.debug)?;

    // 4. Optional patch-point dump.
    if opts.verbose {
        emit::dump_patch_points(source, &patches);
    }

    // 5. Emit.
    emit::emit(source, &patches)
}
