//! Bytecode disassembler CLI.
//!
//! Prints an `.rm` file as assembly source that `rasm` accepts.
//!
//! # Usage
//! ```text
//! derasm <file.rm>
//! ```

use rasm::utils::log;
use rasm::virtual_machine::program::Program;
use rasm::{error, info};
use std::env;
use std::process;

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() == 2 { 0 } else { 1 });
    }

    let program = Program::load_from_file(&args[1]).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });

    print!("{}", program.disassemble());
}

const USAGE: &str = "\
Stack VM Disassembler

USAGE:
    {program} <file.rm>

ARGS:
    <file.rm>    Bytecode file to disassemble
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
