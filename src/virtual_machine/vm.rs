//! Core virtual machine implementation.
//!
//! The VM executes a [`Program`] against a bounded stack of 64-bit signed
//! integers. All arithmetic uses wrapping semantics to prevent overflow panics.
//!
//! Every fault is raised before any state changes, so after a failed
//! [`VM::step`] the stack and `ip` still describe the faulting instruction.

mod stack;
#[cfg(test)]
mod tests;

use crate::debug;
use crate::virtual_machine::config::{Limits, StepLimit};
use crate::virtual_machine::errors::{BytecodeError, Fault};
use crate::virtual_machine::isa::{Instruction, Opcode};
use crate::virtual_machine::program::Program;
use stack::Stack;
use std::io;

/// A stack machine with its loaded program.
pub struct VM {
    /// Instructions to execute.
    program: Program,
    /// Operand stack.
    stack: Stack,
    /// Index of the next instruction.
    ip: usize,
    /// Set by `halt`; stepping a halted machine does nothing.
    halted: bool,
    limits: Limits,
}

impl VM {
    /// Creates a new VM instance with the given program and default limits.
    pub fn new(program: Program) -> Self {
        Self::with_limits(program, Limits::default())
    }

    /// Creates a new VM instance with explicit limits.
    pub fn with_limits(program: Program, limits: Limits) -> Self {
        Self {
            program,
            stack: Stack::new(limits.stack_capacity),
            ip: 0,
            halted: false,
            limits,
        }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Stack contents, bottom first.
    pub fn stack(&self) -> &[i64] {
        self.stack.as_slice()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Instruction at `ip`, if `ip` is inside the program.
    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.program.get(self.ip)
    }

    /// Replaces the program and resets `ip`, the stack and the halted flag.
    pub fn load_program(&mut self, program: Program) {
        self.program = program;
        self.stack.clear();
        self.ip = 0;
        self.halted = false;
    }

    /// Decodes `bytes` and loads the result.
    ///
    /// The machine is left untouched if decoding fails.
    pub fn load_bytecode(&mut self, bytes: &[u8]) -> Result<(), BytecodeError> {
        let program = Program::from_bytes_with_capacity(bytes, self.limits.program_capacity)?;
        self.load_program(program);
        Ok(())
    }

    /// Executes until halted, faulted, or `limit` steps have run.
    ///
    /// Returns the number of steps executed.
    pub fn run(&mut self, limit: StepLimit) -> Result<u64, Fault> {
        let mut executed = 0u64;
        while !self.halted && !limit.is_exhausted(executed) {
            self.step()?;
            executed += 1;
        }
        Ok(executed)
    }

    /// Executes the instruction at `ip`.
    pub fn step(&mut self) -> Result<(), Fault> {
        if self.halted {
            return Ok(());
        }
        let instruction = *self
            .program
            .get(self.ip)
            .ok_or(Fault::IllegalInstruction)?;
        debug!("ip={:<4} {:<12} stack={:?}", self.ip, instruction.to_string(), self.stack());
        self.exec(instruction)
    }

    /// Executes a single instruction.
    fn exec(&mut self, instruction: Instruction) -> Result<(), Fault> {
        let operand = instruction.operand;
        match instruction.opcode {
            // Control
            Opcode::Nop => {}
            Opcode::Halt => self.halted = true,
            // Stack
            Opcode::Push => self.stack.push(operand)?,
            Opcode::Dup => {
                self.stack.ensure_room()?;
                let value = self.stack.peek(operand)?;
                self.stack.push(value)?;
            }
            // Jumps
            Opcode::Jmp => {
                self.ip = Self::jump_target(operand)?;
                return Ok(());
            }
            Opcode::JmpIf => {
                if self.stack.peek(0)? != 0 {
                    let target = Self::jump_target(operand)?;
                    self.stack.pop()?;
                    self.ip = target;
                    return Ok(());
                }
                self.stack.pop()?;
            }
            // Integer arithmetic
            Opcode::Plusi => self.binary_op(|a, b| Ok(a.wrapping_add(b)))?,
            Opcode::Minusi => self.binary_op(|a, b| Ok(a.wrapping_sub(b)))?,
            Opcode::Muli => self.binary_op(|a, b| Ok(a.wrapping_mul(b)))?,
            Opcode::Divi => self.binary_op(|a, b| {
                if b == 0 {
                    return Err(Fault::DivisionByZero);
                }
                Ok(a.wrapping_div(b))
            })?,
            Opcode::Modi => self.binary_op(|a, b| {
                if b == 0 {
                    return Err(Fault::DivisionByZero);
                }
                Ok(a.wrapping_rem(b))
            })?,
            // Comparison
            Opcode::Gt => self.binary_op(|a, b| Ok((a > b) as i64))?,
            Opcode::Gte => self.binary_op(|a, b| Ok((a >= b) as i64))?,
            Opcode::Lt => self.binary_op(|a, b| Ok((a < b) as i64))?,
            Opcode::Lte => self.binary_op(|a, b| Ok((a <= b) as i64))?,
        }
        self.ip += 1;
        Ok(())
    }

    /// Applies `op` to `(a, b)` (`b` on top) and replaces both with the result.
    fn binary_op<F>(&mut self, op: F) -> Result<(), Fault>
    where
        F: FnOnce(i64, i64) -> Result<i64, Fault>,
    {
        let (a, b) = self.stack.top_two()?;
        let result = op(a, b)?;
        self.stack.collapse_top_two(result);
        Ok(())
    }

    /// Converts a jump operand to an address. Targets past the end are
    /// accepted here and fault on the next fetch.
    fn jump_target(operand: i64) -> Result<usize, Fault> {
        usize::try_from(operand).map_err(|_| Fault::IllegalInstruction)
    }

    /// Writes the stack, bottom first, one indented value per line.
    pub fn dump_stack<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Stack:")?;
        if self.stack().is_empty() {
            writeln!(out, "[empty]")?;
        }
        for value in self.stack() {
            writeln!(out, "    {value}")?;
        }
        Ok(())
    }
}

impl Default for VM {
    fn default() -> Self {
        Self::new(Program::new())
    }
}
