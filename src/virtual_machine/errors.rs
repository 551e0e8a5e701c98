use crate::virtual_machine::isa::Opcode;
use rasm_derive::Error;

/// Errors raised while assembling source text.
///
/// Errors tied to a source line are wrapped in [`AsmError::Located`].
#[derive(Debug, Error)]
pub enum AsmError {
    /// Token is not a recognized mnemonic.
    #[error("unknown instruction `{name}`")]
    UnknownInstruction { name: String },
    /// Label bound a second time.
    #[error("label `{label}` is already defined")]
    DuplicateLabel { label: String },
    /// `push`/`dup` operand is missing or not a base-10 integer.
    #[error("invalid integer operand `{token}` for `{opcode}`")]
    InvalidInteger { opcode: Opcode, token: String },
    /// `jmp`/`jmp_if` without a target.
    #[error("expected label after `{opcode}`")]
    ExpectedLabel { opcode: Opcode },
    /// Jump target never defined anywhere in the source.
    #[error("unknown binding `{label}`")]
    UnknownBinding { label: String },
    /// Program grew past its instruction capacity.
    #[error("program exceeds capacity of {capacity} instructions")]
    ProgramTooLarge { capacity: usize },
    /// Symbol table or deferred-operand list is full.
    #[error("{table} exceeds capacity of {capacity} entries")]
    TableFull { table: &'static str, capacity: usize },
    /// Error with source location context.
    #[error("{file}:{line}:{column}: {source}")]
    Located {
        file: String,
        line: usize,
        column: usize,
        source: Box<AsmError>,
    },
    /// Source file could not be read.
    #[error("could not read `{path}`: {source}")]
    Io { path: String, source: String },
}

impl AsmError {
    /// Attaches a source location, keeping an existing one if present.
    pub(crate) fn at(self, file: &str, line: usize, column: usize) -> AsmError {
        match self {
            located @ AsmError::Located { .. } => located,
            other => AsmError::Located {
                file: file.to_string(),
                line,
                column,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping location wrappers.
    pub fn kind(&self) -> &AsmError {
        match self {
            AsmError::Located { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Returns the 1-based line number if the error is located.
    pub fn line(&self) -> Option<usize> {
        match self {
            AsmError::Located { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Recoverable execution faults returned by [`VM::step`](super::vm::VM::step).
///
/// The machine state is left exactly as it was before the faulting
/// instruction, so it can be inspected after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// An instruction needed more values than the stack holds.
    #[error("stack underflow")]
    StackUnderflow,
    /// A push would exceed the stack capacity.
    #[error("stack overflow")]
    StackOverflow,
    /// The instruction pointer is outside the program.
    #[error("illegal instruction")]
    IllegalInstruction,
    /// `divi` or `modi` with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
}

/// Why a bytecode file was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeReason {
    /// Header magic does not match.
    #[error("unexpected magic {found:#06X}, expected {expected:#06X}")]
    BadMagic { found: u16, expected: u16 },
    /// File ends inside the 10-byte header.
    #[error("header truncated after {len} bytes")]
    TruncatedHeader { len: usize },
    /// Fewer records than declared.
    #[error("read {read} instructions, expected {expected}")]
    TruncatedFile { expected: u64, read: u64 },
    /// Declared instruction count exceeds the program capacity.
    #[error("declares {count} instructions, capacity is {capacity}")]
    TooLarge { count: u64, capacity: usize },
    /// Record carries an unknown opcode tag.
    #[error("unknown opcode {opcode:#04X} at instruction {index}")]
    InvalidOpcode { opcode: u8, index: u64 },
    /// Underlying read or write failed.
    #[error("{path}: {message}")]
    Io { path: String, message: String },
}

/// A malformed or unreadable bytecode file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed bytecode file: {reason}")]
pub struct BytecodeError {
    pub reason: BytecodeReason,
}

impl From<BytecodeReason> for BytecodeError {
    fn from(reason: BytecodeReason) -> Self {
        Self { reason }
    }
}
