//! Stack-based virtual machine with its assembler and bytecode format.
//!
//! Source text is assembled into a [`program::Program`], optionally stored as
//! an `.rm` bytecode file, and executed by [`vm::VM`]. The assembler and the
//! VM never call each other; the binaries compose them.
//!
//! # Architecture
//!
//! - **Stack**: bounded stack of 64-bit signed integers (default 1024 slots)
//! - **Instruction format**: fixed 9-byte records (opcode tag + i64 operand)
//! - **Addresses**: 0-based instruction indices, no segment base
//! - **Faults**: typed and recoverable; the machine stays inspectable
//!
//! # Modules
//!
//! - [`assembler`]: Assembly parsing, diagnostics, and label patching
//! - [`config`]: Capacity limits and step limits
//! - [`errors`]: Assembly, execution and bytecode error types
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`program`]: Instruction sequence and bytecode file format
//! - [`symbols`]: Symbol table and deferred operand list
//! - [`vm`]: Core virtual machine implementation

pub mod assembler;
pub mod config;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod program;
pub mod symbols;
pub mod vm;
