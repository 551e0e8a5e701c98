//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction table and invokes a callback macro for code
//! generation, so the opcode enum, the mnemonic lookup used by the assembler
//! and the ISA fingerprint test all derive from one list.
//!
//! This module generates:
//! - The [`Opcode`] enum with its bytecode tags
//! - `TryFrom<u8>` for decoding tags
//! - Mnemonic and operand-kind lookups
//!
//! # Bytecode Format
//!
//! Every instruction is a fixed 9-byte record:
//! - Opcode tag: 1 byte
//! - Operand: 8 bytes (i64, little-endian), zero for opcodes without one

use crate::encoding::{Decode, DecodeError, Encode, EncodeSink};
use rasm_derive::BinaryCodec;
use std::fmt;

/// Invokes a callback macro with the complete instruction definition list.
///
/// Entry format: `Variant = tag, "mnemonic" => OperandKind`.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Control
            // =========================
            /// nop ; does nothing
            Nop = 0, "nop" => None,
            /// halt ; stops the machine
            Halt = 1, "halt" => None,
            // =========================
            // Stack
            // =========================
            /// push imm ; pushes imm
            Push = 2, "push" => Value,
            /// dup k ; pushes a copy of the value k slots below the top
            Dup = 3, "dup" => Depth,
            // =========================
            // Jumps
            // =========================
            /// jmp label ; ip = label
            Jmp = 4, "jmp" => Label,
            // =========================
            // Integer arithmetic
            // =========================
            /// plusi ; a b -- a+b
            Plusi = 5, "plusi" => None,
            /// minusi ; a b -- a-b
            Minusi = 6, "minusi" => None,
            /// muli ; a b -- a*b
            Muli = 7, "muli" => None,
            /// divi ; a b -- a/b (truncating, faults on zero divisor)
            Divi = 8, "divi" => None,
            /// modi ; a b -- a%b (faults on zero divisor)
            Modi = 9, "modi" => None,
            /// jmp_if label ; pops a value, ip = label if it is non-zero
            JmpIf = 10, "jmp_if" => Label,
            // =========================
            // Comparison
            // =========================
            /// gt ; a b -- (a > b)
            Gt = 11, "gt" => None,
            /// gte ; a b -- (a >= b)
            Gte = 12, "gte" => None,
            /// lt ; a b -- (a < b)
            Lt = 13, "lt" => None,
            /// lte ; a b -- (a <= b)
            Lte = 14, "lte" => None,
        }
    };
}

/// What an instruction's operand field means.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// The operand is ignored (always encoded as zero by the assembler).
    None,
    /// A signed literal value.
    Value,
    /// A depth below the stack top.
    Depth,
    /// An instruction address, written as a label in assembly.
    Label,
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => $kind:ident
        ),* $(,)?
    ) => {
        /// Operation performed by an [`Instruction`].
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Opcode {
            type Error = DecodeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(DecodeError::InvalidValue),
                }
            }
        }

        impl Opcode {
            /// Every opcode in tag order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns how the operand field is interpreted.
            pub const fn operand_kind(&self) -> OperandKind {
                match self {
                    $( Opcode::$name => OperandKind::$kind, )*
                }
            }

            /// Looks up an opcode by its exact (case-sensitive) mnemonic.
            pub fn from_mnemonic(name: &str) -> Option<Opcode> {
                match name {
                    $( $mnemonic => Some(Opcode::$name), )*
                    _ => None,
                }
            }
        }
    };
}

for_each_instruction!(define_instructions);

impl Opcode {
    /// Returns true if the operand field carries meaning for this opcode.
    pub const fn has_operand(&self) -> bool {
        !matches!(self.operand_kind(), OperandKind::None)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl Encode for Opcode {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u8).encode(out);
    }
}

impl Decode for Opcode {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Opcode::try_from(u8::decode(input)?)
    }
}

/// A single fixed-width instruction record.
///
/// The operand is always present so every record has the same encoded size.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, BinaryCodec)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: i64,
}

impl Instruction {
    /// Encoded size of one record in bytes.
    pub const ENCODED_SIZE: usize = 1 + 8;

    pub const fn new(opcode: Opcode, operand: i64) -> Self {
        Self { opcode, operand }
    }

    /// An instruction whose operand is unused.
    pub const fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, 0)
    }

    pub const fn push(value: i64) -> Self {
        Self::new(Opcode::Push, value)
    }

    pub const fn dup(depth: i64) -> Self {
        Self::new(Opcode::Dup, depth)
    }

    pub const fn jmp(target: i64) -> Self {
        Self::new(Opcode::Jmp, target)
    }

    pub const fn jmp_if(target: i64) -> Self {
        Self::new(Opcode::JmpIf, target)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode.has_operand() {
            write!(f, "{} {}", self.opcode, self.operand)
        } else {
            write!(f, "{}", self.opcode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_try_from_invalid() {
        assert_eq!(Opcode::try_from(0xFF), Err(DecodeError::InvalidValue));
        assert_eq!(Opcode::try_from(15), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn opcode_tags_round_trip() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::try_from(op as u8), Ok(op));
        }
        assert_eq!(Opcode::ALL.len(), 15);
    }

    #[test]
    fn mnemonics_are_exact_and_case_sensitive() {
        for &op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("PUSH"), None);
        assert_eq!(Opcode::from_mnemonic("jmpif"), None);
        assert_eq!(Opcode::from_mnemonic("jmp_if"), Some(Opcode::JmpIf));
        assert_eq!(Opcode::from_mnemonic("modi"), Some(Opcode::Modi));
    }

    #[test]
    fn exactly_four_opcodes_take_operands() {
        let with_operand: Vec<_> = Opcode::ALL
            .iter()
            .copied()
            .filter(Opcode::has_operand)
            .collect();
        assert_eq!(
            with_operand,
            vec![Opcode::Push, Opcode::Dup, Opcode::Jmp, Opcode::JmpIf]
        );
    }

    #[test]
    fn instruction_record_layout() {
        let bytes = Instruction::push(-2).to_bytes();
        assert_eq!(bytes.len(), Instruction::ENCODED_SIZE);
        assert_eq!(bytes[0], Opcode::Push as u8);
        assert_eq!(&bytes[1..], &(-2i64).to_le_bytes());
    }

    #[test]
    fn bare_instruction_encodes_zero_operand() {
        let bytes = Instruction::bare(Opcode::Halt).to_bytes();
        assert_eq!(bytes, vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn instruction_decode_rejects_unknown_tag() {
        let mut bytes = Instruction::push(1).to_bytes();
        bytes[0] = 0x80;
        assert_eq!(
            Instruction::from_bytes(&bytes),
            Err(DecodeError::InvalidValue)
        );
    }

    #[test]
    fn instruction_display() {
        assert_eq!(Instruction::push(10).to_string(), "push 10");
        assert_eq!(Instruction::dup(0).to_string(), "dup 0");
        assert_eq!(Instruction::jmp_if(3).to_string(), "jmp_if 3");
        assert_eq!(Instruction::bare(Opcode::Lte).to_string(), "lte");
    }
}
