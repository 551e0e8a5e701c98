//! Resource ceilings and run limits.

/// Historical bound shared by the stack, the program and the label tables.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Upper bounds enforced on every insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of values on the VM stack.
    pub stack_capacity: usize,
    /// Maximum number of instructions in a program.
    pub program_capacity: usize,
    /// Maximum number of labels, and of pending jump references, per assembly.
    pub label_capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_CAPACITY,
            program_capacity: DEFAULT_CAPACITY,
            label_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// How many steps [`VM::run`](super::vm::VM::run) may execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepLimit {
    /// Stop after at most this many steps.
    Bounded(u64),
    /// Run until the machine halts or faults.
    Unbounded,
}

impl StepLimit {
    /// Maps the signed command-line convention: negative means unbounded.
    pub fn from_signed(limit: i64) -> StepLimit {
        match u64::try_from(limit) {
            Ok(n) => StepLimit::Bounded(n),
            Err(_) => StepLimit::Unbounded,
        }
    }

    /// Returns true once `executed` steps exhaust the limit.
    pub fn is_exhausted(&self, executed: u64) -> bool {
        match self {
            StepLimit::Bounded(n) => executed >= *n,
            StepLimit::Unbounded => false,
        }
    }
}
