//! CLI argument parsing and output-path derivation tests.

use std::path::{Path, PathBuf};

use unnest::cli::{derived_output_path, parse_args, CliArgs, ParseArgsResult};

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn parsed(list: &[&str]) -> CliArgs {
    match parse_args(&args(list)).expect("args should parse") {
        ParseArgsResult::Args(cli) => cli,
        ParseArgsResult::Help => panic!("did not expect help"),
    }
}

#[test]
fn test_single_target() {
    let cli = parsed(&["unnest", "app.ujs"]);
    assert_eq!(cli.targets, vec![PathBuf::from("app.ujs")]);
    assert!(cli.output.is_none());
    assert!(!cli.debug);
    assert!(!cli.verbose);
}

#[test]
fn test_no_targets_means_stdin() {
    let cli = parsed(&["unnest"]);
    assert!(cli.targets.is_empty());
}

#[test]
fn test_flags_and_output() {
    let cli = parsed(&["unnest", "-g", "--verbose", "-o", "out.js", "app.ujs"]);
    assert!(cli.debug);
    assert!(cli.verbose);
    assert_eq!(cli.output, Some(PathBuf::from("out.js")));
    assert_eq!(cli.targets, vec![PathBuf::from("app.ujs")]);
}

#[test]
fn test_double_dash_ends_option_parsing() {
    let cli = parsed(&["unnest", "--", "-g", "--weird.ujs"]);
    assert!(!cli.debug);
    assert_eq!(
        cli.targets,
        vec![PathBuf::from("-g"), PathBuf::from("--weird.ujs")]
    );
}

#[test]
fn test_help_wins() {
    let result = parse_args(&args(&["unnest", "app.ujs", "--help"])).expect("should parse");
    assert!(matches!(result, ParseArgsResult::Help));
}

#[test]
fn test_duplicate_output_is_an_error() {
    let err = parse_args(&args(&["unnest", "-o", "a.js", "-o", "b.js"])).unwrap_err();
    assert!(err.contains("multiple output"));
}

#[test]
fn test_output_with_multiple_targets_is_an_error() {
    let err = parse_args(&args(&["unnest", "-o", "out.js", "a.ujs", "b.ujs"])).unwrap_err();
    assert!(err.contains("multiple inputs"));
}

#[test]
fn test_missing_output_filename_is_an_error() {
    let err = parse_args(&args(&["unnest", "-o"])).unwrap_err();
    assert!(err.contains("requires an output filename"));
}

#[test]
fn test_unknown_flag_is_an_error() {
    let err = parse_args(&args(&["unnest", "--frobnicate"])).unwrap_err();
    assert!(err.contains("unknown argument"));
}

// ---------------------------------------------------------------------------
// Output-path derivation
// ---------------------------------------------------------------------------

#[test]
fn test_ujs_extension_is_replaced() {
    assert_eq!(
        derived_output_path(Path::new("app.ujs")),
        PathBuf::from("app.js")
    );
    assert_eq!(
        derived_output_path(Path::new("dir/nested/app.ujs")),
        PathBuf::from("dir/nested/app.js")
    );
}

#[test]
fn test_other_extensions_are_kept() {
    assert_eq!(
        derived_output_path(Path::new("notes.txt")),
        PathBuf::from("notes.txt.js")
    );
    assert_eq!(
        derived_output_path(Path::new("plain")),
        PathBuf::from("plain.js")
    );
}
