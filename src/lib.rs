//! Stack virtual machine toolkit.
//!
//! Provides the `rasm` assembler, the `.rm` bytecode format and the machine
//! that executes it.

pub mod encoding;
pub mod utils;
pub mod virtual_machine;
