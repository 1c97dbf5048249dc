use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use sbml::Config;

/// Runs a program written in the sbml scripting language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the program to run.
    file: PathBuf,

    /// Deepest chain of nested function calls before the run fails.
    #[arg(long, env = "SBML_MAX_CALL_DEPTH", default_value_t = Config::DEFAULT_MAX_CALL_DEPTH)]
    max_call_depth: usize,
}

/// Logs go to stderr, filtered by `SBML_LOG` (or `RUST_LOG`). Nothing is
/// installed when neither is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("SBML_LOG").or_else(|_| EnvFilter::try_from_default_env());
    if let Ok(filter) = filter {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(filter)
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let config = Config::default().with_max_call_depth(args.max_call_depth);

    let mut out = io::stdout().lock();
    match sbml::run(&source, &config, &mut out) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(sbml::Error::Output(e)) => Err(e).context("failed to write program output"),
        Err(e) => {
            writeln!(out, "{e}")?;
            Ok(ExitCode::FAILURE)
        }
    }
}
