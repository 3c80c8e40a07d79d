//! Check RC programs and report diagnostics.
//!
//! Usage: `rcc [--composition] [--format=FORMAT] [--max-errors=N] FILE...`

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "rcc")]
#[command(about = "Compile RC programs and report diagnostics")]
struct Args {
    /// Print the composition graph after analysis and exit
    #[arg(long)]
    composition: bool,

    /// Output format for --composition
    #[arg(long, value_enum, default_value = "text")]
    format: Format,

    /// Stop recording diagnostics after N errors (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_errors: usize,

    /// RC source files
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    rc_tools::init_logging();

    let args = Args::parse();

    for file in &args.files {
        if !file.exists() {
            error!("'{}' does not exist", file.display());
            process::exit(1);
        }
    }

    let result = rc_lang::compile_files(&args.files, args.max_errors);

    if result.has_errors() {
        eprintln!("{}", result.format_diagnostics());
        error!("{} error(s)", result.errors.len());
        process::exit(1);
    }

    let program = result.program.expect("no errors implies a checked program");
    let composition = program
        .composition
        .as_ref()
        .expect("analysis ran to completion");

    if args.composition {
        match args.format {
            Format::Text => print!("{}", composition.to_graphviz()),
            Format::Json => {
                let summary = composition.to_summary();
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("cannot serialize composition: {}", e);
                        process::exit(1);
                    }
                }
            }
        }
        return;
    }

    info!("no errors found");
    info!("  - instances: {}", composition.instances.len());
    info!("  - graph nodes: {}", composition.nodes.len());
}
