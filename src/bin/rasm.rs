//! Assembly to bytecode compiler CLI.
//!
//! Reads an assembly source file and writes an `.rm` bytecode file.
//!
//! # Usage
//! ```text
//! rasm <input.rasm> [OPTIONS]
//! ```
//!
//! # Options
//! - `-o, --output <file>`: Output file path (defaults to `<input>.rm`)
//!
//! Set `RASM_LOG=debug` to trace label resolution.

use rasm::utils::log;
use rasm::virtual_machine::assembler::assemble_file;
use rasm::{error, info};
use std::env;
use std::path::Path;
use std::process;

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--output" | "-o") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                output_path = Some(args[i].clone());
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if !Path::new(input_path).exists() {
        error!("Input file does not exist: {}", input_path);
        process::exit(1);
    }

    let output_path = output_path.unwrap_or_else(|| {
        Path::new(input_path)
            .with_extension("rm")
            .to_string_lossy()
            .into_owned()
    });

    if let Some(parent) = Path::new(&output_path).parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        error!("Output directory does not exist: {}", parent.display());
        process::exit(1);
    }

    // The assembler has already logged a diagnostic for located errors.
    let program = match assemble_file(input_path) {
        Ok(p) => p,
        Err(e) => {
            error!("Assembly failed: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = program.save_to_file(&output_path) {
        error!("{e}");
        process::exit(1);
    }

    info!(
        "Assembled {} -> {} ({} instructions)",
        input_path,
        output_path,
        program.len()
    );
}

const USAGE: &str = "\
Stack VM Assembler

USAGE:
    {program} <input.rasm> [OPTIONS]

ARGS:
    <input.rasm>    Assembly source file to compile

OPTIONS:
    -o, --output <file>     Output file path (defaults to <input>.rm)
    -h, --help              Print this help message

EXAMPLES:
    {program} fib.rasm
    {program} fib.rasm -o build/fib.rm
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
