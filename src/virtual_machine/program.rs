//! In-memory program representation and the `.rm` bytecode file format.
//!
//! # File layout
//!
//! ```text
//! magic   u16 LE   0x4D42
//! count   u64 LE   number of records
//! record  u8 opcode tag + i64 LE operand, repeated `count` times
//! ```
//!
//! No padding and no trailing checksum. The count plus records is exactly the
//! `Vec<Instruction>` encoding from [`crate::encoding`].

use crate::encoding::{Decode, Encode};
use crate::virtual_machine::config::DEFAULT_CAPACITY;
use crate::virtual_machine::errors::{AsmError, BytecodeError, BytecodeReason};
use crate::virtual_machine::isa::{Instruction, OperandKind};
use std::collections::BTreeSet;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Magic constant at the start of every bytecode file.
pub const MAGIC: u16 = 0x4D42;

/// Size of the fixed file header in bytes.
pub const HEADER_SIZE: usize = 2 + 8;

/// An ordered, capacity-bounded instruction sequence.
///
/// Addresses are plain 0-based indices into the sequence.
#[derive(Debug, Clone)]
pub struct Program {
    instructions: Vec<Instruction>,
    capacity: usize,
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.instructions == other.instructions
    }
}

impl Eq for Program {}

impl Default for Program {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Program {
    /// Creates an empty program with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty program holding at most `capacity` instructions.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instructions: Vec::new(),
            capacity,
        }
    }

    /// Builds a program from a ready-made instruction list.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Result<Self, AsmError> {
        let mut program = Self::new();
        for instruction in instructions {
            program.push(instruction)?;
        }
        Ok(program)
    }

    /// Appends an instruction and returns its address.
    pub fn push(&mut self, instruction: Instruction) -> Result<usize, AsmError> {
        if self.instructions.len() >= self.capacity {
            return Err(AsmError::ProgramTooLarge {
                capacity: self.capacity,
            });
        }
        self.instructions.push(instruction);
        Ok(self.instructions.len() - 1)
    }

    /// Overwrites the operand of the instruction at `site`.
    ///
    /// `site` must be an index returned by [`Program::push`].
    pub(crate) fn patch_operand(&mut self, site: usize, operand: i64) {
        debug_assert!(
            site < self.instructions.len(),
            "patch site {site} outside program of {} instructions",
            self.instructions.len()
        );
        if let Some(instruction) = self.instructions.get_mut(site) {
            instruction.operand = operand;
        }
    }

    pub fn get(&self, address: usize) -> Option<&Instruction> {
        self.instructions.get(address)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Serializes the program to the bytecode file format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.len() * Instruction::ENCODED_SIZE);
        MAGIC.encode(&mut out);
        self.instructions.encode(&mut out);
        out
    }

    /// Deserializes a program using the default capacity.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BytecodeError> {
        Self::from_bytes_with_capacity(bytes, DEFAULT_CAPACITY)
    }

    /// Deserializes a program, rejecting files that declare more than
    /// `capacity` instructions.
    ///
    /// Bytes after the last declared record are ignored.
    pub fn from_bytes_with_capacity(bytes: &[u8], capacity: usize) -> Result<Self, BytecodeError> {
        let mut input = bytes;
        let truncated_header = |_| BytecodeReason::TruncatedHeader { len: bytes.len() };

        let magic = u16::decode(&mut input).map_err(truncated_header)?;
        if magic != MAGIC {
            return Err(BytecodeReason::BadMagic {
                found: magic,
                expected: MAGIC,
            }
            .into());
        }

        let count = u64::decode(&mut input).map_err(truncated_header)?;
        if count > capacity as u64 {
            return Err(BytecodeReason::TooLarge { count, capacity }.into());
        }

        let mut instructions = Vec::with_capacity(count as usize);
        for index in 0..count {
            if input.len() < Instruction::ENCODED_SIZE {
                return Err(BytecodeReason::TruncatedFile {
                    expected: count,
                    read: index,
                }
                .into());
            }
            let tag = input[0];
            let instruction = Instruction::decode(&mut input)
                .map_err(|_| BytecodeReason::InvalidOpcode { opcode: tag, index })?;
            instructions.push(instruction);
        }

        Ok(Self {
            instructions,
            capacity,
        })
    }

    /// Writes the bytecode file to `path`.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), BytecodeError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()).map_err(|e| {
            BytecodeReason::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Reads a bytecode file from `path` using the default capacity.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, BytecodeError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| BytecodeReason::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Renders the program as assembly source.
    ///
    /// Jump targets inside `0..=len` get synthesized `L<addr>` labels so the
    /// output re-assembles to the same program.
    pub fn disassemble(&self) -> String {
        let in_range = |target: i64| usize::try_from(target).is_ok_and(|t| t <= self.len());
        let targets: BTreeSet<usize> = self
            .instructions
            .iter()
            .filter(|i| i.opcode.operand_kind() == OperandKind::Label && in_range(i.operand))
            .map(|i| i.operand as usize)
            .collect();

        let mut out = String::from("main:\n");
        for (address, instruction) in self.instructions.iter().enumerate() {
            if targets.contains(&address) {
                let _ = writeln!(out, "L{address}:");
            }
            if instruction.opcode.operand_kind() == OperandKind::Label
                && in_range(instruction.operand)
            {
                let _ = writeln!(out, "    {} L{}", instruction.opcode, instruction.operand);
            } else {
                let _ = writeln!(out, "    {instruction}");
            }
        }
        if targets.contains(&self.len()) {
            let _ = writeln!(out, "L{}:", self.len());
        }
        out
    }
}
