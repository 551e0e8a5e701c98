//! Bytecode runner CLI.
//!
//! Loads an `.rm` file, executes it and prints the final stack.
//!
//! # Usage
//! ```text
//! rme -i <file.rm> [OPTIONS]
//! ```
//!
//! # Options
//! - `-i, --input <file>`: Bytecode file to execute (required)
//! - `-l, --limit <n>`: Maximum number of steps, negative for no limit (default 69)
//! - `-d, --debug`: Single-step, dumping the stack and waiting for Enter

use rasm::utils::log;
use rasm::virtual_machine::config::StepLimit;
use rasm::virtual_machine::errors::Fault;
use rasm::virtual_machine::program::Program;
use rasm::virtual_machine::vm::VM;
use rasm::{error, info, warn};
use std::env;
use std::io::{self, BufRead, Write};
use std::process;

const DEFAULT_LIMIT: i64 = 69;

fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        print_usage(&args[0]);
        process::exit(0);
    }

    let mut input_path: Option<String> = None;
    let mut limit = DEFAULT_LIMIT;
    let mut debug = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--input" | "-i") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                input_path = Some(args[i].clone());
                i += 1;
            }
            k @ ("--limit" | "-l") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                limit = args[i].parse::<i64>().unwrap_or_else(|_| {
                    error!("Invalid limit: '{}' is not a valid number", args[i]);
                    process::exit(1);
                });
                i += 1;
            }
            "--debug" | "-d" => {
                debug = true;
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let Some(input_path) = input_path else {
        error!("No input file given (use -i <file.rm>)\n");
        print_usage(&args[0]);
        process::exit(1);
    };

    let program = Program::load_from_file(&input_path).unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });

    let limit = StepLimit::from_signed(limit);
    let mut vm = VM::new(program);
    let result = if debug {
        step_interactively(&mut vm, limit)
    } else {
        vm.run(limit)
    };

    let stdout = io::stdout();
    match result {
        Ok(steps) => {
            if !vm.is_halted() {
                warn!("Stopped after {steps} steps without reaching halt");
            }
            let _ = vm.dump_stack(&mut stdout.lock());
        }
        Err(fault) => {
            report_fault(&vm, fault);
            let _ = vm.dump_stack(&mut stdout.lock());
            process::exit(1);
        }
    }
}

/// Steps one instruction per Enter key press.
fn step_interactively(vm: &mut VM, limit: StepLimit) -> Result<u64, Fault> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    let mut executed = 0u64;

    while !vm.is_halted() && !limit.is_exhausted(executed) {
        let _ = vm.dump_stack(&mut stdout);
        match vm.current_instruction() {
            Some(instruction) => {
                let _ = writeln!(stdout, "Instruction: {} (ip {})", instruction, vm.ip());
            }
            None => {
                let _ = writeln!(stdout, "Instruction: <none> (ip {})", vm.ip());
            }
        }
        let _ = stdout.flush();

        line.clear();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        vm.step()?;
        executed += 1;
    }
    Ok(executed)
}

fn report_fault(vm: &VM, fault: Fault) {
    match vm.current_instruction() {
        Some(instruction) => error!(
            "Fault: {} at ip {} (`{}`)",
            fault,
            vm.ip(),
            instruction.opcode
        ),
        None => error!(
            "Fault: {} at ip {} (program has {} instructions)",
            fault,
            vm.ip(),
            vm.program().len()
        ),
    }
}

const USAGE: &str = "\
Stack VM Runner

USAGE:
    {program} -i <file.rm> [OPTIONS]

OPTIONS:
    -i, --input <file>      Bytecode file to execute
    -l, --limit <n>         Maximum number of steps, negative for no limit (default 69)
    -d, --debug             Single-step: dump the stack and wait for Enter between steps
    -h, --help              Print this help message

EXAMPLES:
    {program} -i fib.rm
    {program} -i fib.rm -l -1
    {program} -i fib.rm -d
";

fn print_usage(program: &str) {
    info!("{}", USAGE.replace("{program}", program));
}
