//! Cinder CLI entry point.

use std::error::Error;
use std::io::Read;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use rhizome_cinder_ir::{Encoder, Schema, Tree, Validator, render};
use rhizome_cinder_syntax_python::{PLACEHOLDER_KINDS, parse};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Print a Python syntax tree as one canonical S-expression")]
struct Cli {
    /// Input file (or - for stdin)
    file: String,

    /// How to read the input
    #[arg(long, value_enum, default_value_t = InputFormat::Python)]
    input: InputFormat,

    /// What to print
    #[arg(long, value_enum, default_value_t = Emit::Sexp)]
    emit: Emit,

    /// TOML file with extra schema entries, merged over the built-in table
    #[arg(long)]
    schema: Option<String>,

    /// Fail on node kinds or fields the schema cannot account for
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// Python source code
    Python,
    /// A syntax tree serialized as JSON
    TreeJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// The canonical S-expression line
    Sexp,
    /// The syntax tree as pretty-printed JSON
    Tree,
}

/// Lowering, encoding and dropping a tree all recurse once per nesting
/// level.
const STACK_SIZE: usize = 256 * 1024 * 1024;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let worker = std::thread::Builder::new()
        .name("cinder".into())
        .stack_size(STACK_SIZE)
        .spawn(move || run(cli).map_err(|err| err.to_string()));
    let result = match worker {
        Ok(handle) => handle
            .join()
            .unwrap_or_else(|_| Err("internal error: worker thread panicked".into())),
        Err(err) => Err(format!("failed to start worker thread: {}", err)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("cinder: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout only ever carries the result.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("rhizome_cinder=warn".parse()?)
                .add_directive("cinder=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut schema = Schema::python();
    if let Some(path) = &cli.schema {
        let extra = Schema::from_file(path).map_err(|err| format!("{}: {}", path, err))?;
        debug!(path = %path, kinds = extra.len(), "loaded schema extension");
        schema.extend(extra);
    }

    let input = read_input(&cli.file)?;
    let tree: Tree = match cli.input {
        InputFormat::Python => parse(&input, display_name(&cli.file))?,
        InputFormat::TreeJson => {
            serde_json::from_str(&input).map_err(|err| format!("invalid tree JSON: {}", err))?
        }
    };

    // The frontend's scalar and `Add` placeholders are expected output.
    let expected: &[&str] = match cli.input {
        InputFormat::Python => PLACEHOLDER_KINDS,
        InputFormat::TreeJson => &[],
    };

    if cli.strict {
        let validator = Validator::new(&schema).allow_placeholders(expected.iter().copied());
        validator.validate(&tree)?;
    }

    match cli.emit {
        Emit::Tree => println!("{}", serde_json::to_string_pretty(&tree)?),
        Emit::Sexp => {
            let encoder = Encoder::new(&schema);
            for kind in encoder.unknown_kinds(&tree) {
                if expected.contains(&kind.as_str()) {
                    debug!(kind = %kind, "rendered as #<{}>", kind);
                } else {
                    warn!(kind = %kind, "no schema entry, rendered as #<{}>", kind);
                }
            }
            println!("{}", render(&encoder.encode(&tree)));
        }
    }

    Ok(())
}

fn read_input(file: &str) -> Result<String, Box<dyn Error>> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).map_err(|err| format!("{}: {}", file, err).into())
    }
}

fn display_name(file: &str) -> &str {
    if file == "-" { "<stdin>" } else { file }
}
