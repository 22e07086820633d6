use std::io::Read;
use std::path::Path;
use std::process;

use unnest::cli::{derived_output_path, help_text, parse_args, ParseArgsResult};
use unnest::{diagnostics, Error, Options};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    match parse_args(&args) {
        Ok(ParseArgsResult::Help) => {
            print!("{}", help_text());
            process::exit(0);
        }
        Ok(ParseArgsResult::Args(cli)) => {
            let opts = Options {
                debug: cli.debug,
                verbose: cli.verbose,
            };
            if cli.targets.is_empty() {
                run_stdin(cli.output.as_deref(), &opts);
            } else {
                for target in &cli.targets {
                    run_target(target, cli.output.as_deref(), &opts);
                }
            }
        }
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            process::exit(1);
        }
    }
}

/// Rewrites one input file to its destination; exits the process on error.
fn run_target(path: &Path, output: Option<&Path>, opts: &Options) {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read '{}': {}", path.display(), err);
            process::exit(1);
        }
    };
    let filename = path.display().to_string();
    match unnest::rewrite_with_options(&source, opts) {
        Ok(out) => {
            let dest = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| derived_output_path(path));
            if let Err(err) = std::fs::write(&dest, out) {
                eprintln!("error: cannot write '{}': {}", dest.display(), err);
                process::exit(1);
            }
        }
        Err(err) => {
            report(&filename, &source, &err);
            process::exit(1);
        }
    }
}

/// Rewrites stdin to stdout (or `-o`); exits the process on error.
fn run_stdin(output: Option<&Path>, opts: &Options) {
    let mut source = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut source) {
        eprintln!("error: cannot read stdin: {}", err);
        process::exit(1);
    }
    match unnest::rewrite_with_options(&source, opts) {
        Ok(out) => match output {
            Some(dest) => {
                if let Err(err) = std::fs::write(dest, out) {
                    eprintln!("error: cannot write '{}': {}", dest.display(), err);
                    process::exit(1);
                }
            }
            None => print!("{}", out),
        },
        Err(err) => {
            report("<stdin>", &source, &err);
            process::exit(1);
        }
    }
}

fn report(filename: &str, source: &str, err: &Error) {
    eprintln!("{}", diagnostics::render_error(filename, source, err));
    if err.is_internal() {
        eprintln!("unnest hit a defect in itself, not in your input; please file a bug");
    }
}
