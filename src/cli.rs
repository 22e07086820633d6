//! CLI argument parsing, exported from the library so integration tests can
//! exercise it.

use std::path::{Path, PathBuf};

/// Fully-parsed CLI arguments for one invocation.
#[derive(Debug)]
pub struct CliArgs {
    /// Input files; empty means read stdin.
    pub targets: Vec<PathBuf>,
    /// Write output here instead of a derived filename (or stdout for
    /// stdin input). Only valid with at most one target.
    pub output: Option<PathBuf>,
    /// Insert block annotations and duplicate-return markers.
    pub debug: bool,
    /// Dump every patch point to stderr before emitting.
    pub verbose: bool,
}

/// Result of `parse_args`.
#[derive(Debug)]
pub enum ParseArgsResult {
    /// Normal rewrite request.
    Args(CliArgs),
    /// `--help` was present; caller should print usage and exit 0.
    Help,
}

/// Parses command-line arguments (the full `std::env::args()` slice
/// including `argv[0]`).
pub fn parse_args(args: &[String]) -> Result<ParseArgsResult, String> {
    let mut targets: Vec<PathBuf> = Vec::new();
    let mut output: Option<PathBuf> = None;
    let mut debug = false;
    let mut verbose = false;
    let mut i = 1usize;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(ParseArgsResult::Help),
            "--debug" | "-g" => debug = true,
            "--verbose" | "-v" => verbose = true,
            "--outfile" | "-o" => {
                if output.is_some() {
                    return Err("multiple output filenames specified".to_owned());
                }
                i += 1;
                let file = args
                    .get(i)
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| "-o requires an output filename".to_owned())?;
                output = Some(PathBuf::from(file));
            }
            "--" => {
                targets.extend(args[i + 1..].iter().map(PathBuf::from));
                break;
            }
            arg if !arg.starts_with('-') => {
                if !arg.is_empty() {
                    targets.push(PathBuf::from(arg));
                }
            }
            other => return Err(format!("unknown argument: '{}'", other)),
        }
        i += 1;
    }

    if targets.len() > 1 && output.is_some() {
        return Err("cannot combine an output filename with multiple inputs".to_owned());
    }
    Ok(ParseArgsResult::Args(CliArgs {
        targets,
        output,
        debug,
        verbose,
    }))
}

/// Derives the output path for an input file: a `.ujs` extension is
/// stripped, anything else is kept, and `.js` is appended either way.
/// `app.ujs` becomes `app.js`; `notes.txt` becomes `notes.txt.js`.
pub fn derived_output_path(input: &Path) -> PathBuf {
    let name = input.to_string_lossy();
    match name.strip_suffix(".ujs") {
        Some(stem) => PathBuf::from(format!("{}.js", stem)),
        None => PathBuf::from(format!("{}.js", name)),
    }
}

/// Returns the usage/help text for the CLI.
pub fn help_text() -> &'static str {
    "unnest: flattens callback-nested async code\n\
     Usage: unnest [options] [file.ujs ...]\n\
     \n\
     Rewrites bind statements of the form `results <- call(args);` into\n\
     nested error-first callbacks. With no input files, reads stdin and\n\
     writes stdout; with input files, each FILE.ujs is written to FILE.js\n\
     unless -o overrides the destination.\n\
     \n\
     Options:\n\
       -o, --outfile <file>  Write output to <file> (single input only)\n\
       -g, --debug           Annotate output with basic-block comments\n\
       -v, --verbose         Dump every patch point to stderr\n\
       --                    Treat all remaining arguments as input files\n\
       -h, --help            Print this help and exit\n"
}
