//! Assembly language parser and program builder.
//!
//! Converts line-oriented assembly source into a resolved [`Program`].
//!
//! # Syntax
//!
//! ```text
//! label: mnemonic operand   ; optional comment
//! ```
//!
//! - Mnemonics are lowercase and matched exactly (e.g. `push`, `jmp_if`)
//! - `push` and `dup` take a base-10 signed integer
//! - `jmp` and `jmp_if` take a label name
//! - A first token ending in `:` defines a label at the current address; an
//!   instruction may follow it on the same line
//! - Comments start with `;`
//! - Lines starting with `%` are reserved directives and are ignored
//!
//! Jumps are emitted with a placeholder operand and recorded as deferred
//! operands. Once every line has been read, each deferred operand is patched
//! with its label's address, so forward and backward references resolve the
//! same way.

use crate::virtual_machine::config::Limits;
use crate::virtual_machine::errors::AsmError;
use crate::virtual_machine::isa::{Instruction, Opcode, OperandKind};
use crate::virtual_machine::program::Program;
use crate::virtual_machine::symbols::{DeferredOperand, DeferredOperands, SymbolTable};
use crate::{debug, error, warn};
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = ';';
const LABEL_SUFFIX: char = ':';
const DIRECTIVE_CHAR: char = '%';

/// Source name used when none is given.
const DEFAULT_SOURCE_NAME: &str = "<source>";

/// Formats a compiler-style diagnostic for an assembly failure.
///
/// Located errors show the offending source line with a caret under the
/// reported column; other errors render as a single `error:` line.
pub fn render_assembly_diagnostic(source: &str, err: &AsmError) -> String {
    let AsmError::Located {
        file,
        line,
        column,
        source: inner,
    } = err
    else {
        return format!("error: {err}\n");
    };

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {inner}");
    let _ = writeln!(diag, " --> {file}:{line}:{column}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(column.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}^", underline);
    }

    diag
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column in the line.
    column: usize,
}

/// Walks the code portion of one line, token by token.
struct Cursor<'a> {
    code: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor over `line` with any comment removed.
    fn new(line: &'a str) -> Self {
        let code = line.find(COMMENT_CHAR).map_or(line, |i| &line[..i]);
        Self { code, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.code[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Returns the next whitespace-delimited token.
    fn next_token(&mut self) -> Option<Token<'a>> {
        self.skip_whitespace();
        let start = self.pos;
        let rest = &self.code[start..];
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.pos = start + len;
        Some(Token {
            text: &rest[..len],
            column: start + 1,
        })
    }

    /// Consumes the rest of the line as one trimmed token (possibly empty).
    fn remainder(&mut self) -> Token<'a> {
        self.skip_whitespace();
        let start = self.pos;
        self.pos = self.code.len();
        Token {
            text: self.code[start..].trim_end(),
            column: start + 1,
        }
    }

    fn at_directive(&self) -> bool {
        self.code.trim_start().starts_with(DIRECTIVE_CHAR)
    }
}

/// A reserved `%name args...` line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive<'a> {
    name: &'a str,
    args: Vec<&'a str>,
}

fn parse_directive<'a>(cursor: &mut Cursor<'a>) -> Directive<'a> {
    let name = cursor
        .next_token()
        .map(|t| t.text.trim_start_matches(DIRECTIVE_CHAR))
        .unwrap_or_default();
    let mut args = Vec::new();
    while let Some(token) = cursor.next_token() {
        args.push(token.text);
    }
    Directive { name, args }
}

/// Returns the label name if `tok` is a label definition.
fn label_definition(tok: &str) -> Option<&str> {
    tok.strip_suffix(LABEL_SUFFIX).filter(|name| !name.is_empty())
}

/// Parses the leading base-10 integer of an operand: an optional sign and a
/// run of ASCII digits. Out-of-range values saturate at `i64::MIN`/`i64::MAX`.
///
/// Returns the value and the unconsumed rest of `tok`. Fails only when no
/// digit follows the sign.
fn parse_integer(opcode: Opcode, tok: &str) -> Result<(i64, &str), AsmError> {
    let (negative, unsigned) = match tok.as_bytes().first() {
        Some(b'-') => (true, &tok[1..]),
        Some(b'+') => (false, &tok[1..]),
        _ => (false, tok),
    };
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(AsmError::InvalidInteger {
            opcode,
            token: tok.to_string(),
        });
    }

    // Accumulating toward the sign keeps `i64::MIN` exact.
    let value = unsigned.as_bytes()[..digits]
        .iter()
        .fold(0i64, |acc, &d| {
            let d = i64::from(d - b'0');
            if negative {
                acc.saturating_mul(10).saturating_sub(d)
            } else {
                acc.saturating_mul(10).saturating_add(d)
            }
        });
    Ok((value, &unsigned[digits..]))
}

/// Per-assembly state: the program under construction and its label tables.
struct Assembler<'a> {
    file: &'a str,
    program: Program,
    symbols: SymbolTable,
    deferred: DeferredOperands,
}

impl<'a> Assembler<'a> {
    fn new(file: &'a str, limits: Limits) -> Self {
        Self {
            file,
            program: Program::with_capacity(limits.program_capacity),
            symbols: SymbolTable::with_capacity(limits.label_capacity),
            deferred: DeferredOperands::with_capacity(limits.label_capacity),
        }
    }

    /// Processes one source line (1-based `line_no`).
    fn line(&mut self, line_no: usize, text: &str) -> Result<(), AsmError> {
        let mut cursor = Cursor::new(text);

        if cursor.at_directive() {
            let directive = parse_directive(&mut cursor);
            debug!(
                "{}:{}: ignoring reserved directive `%{}` with {} argument(s)",
                self.file,
                line_no,
                directive.name,
                directive.args.len()
            );
            return Ok(());
        }

        let Some(mut token) = cursor.next_token() else {
            return Ok(());
        };

        if let Some(name) = label_definition(token.text) {
            self.symbols
                .define(name, self.program.len())
                .map_err(|e| e.at(self.file, line_no, token.column))?;
            token = match cursor.next_token() {
                Some(next) => next,
                None => return Ok(()),
            };
        }

        let opcode = Opcode::from_mnemonic(token.text).ok_or_else(|| {
            AsmError::UnknownInstruction {
                name: token.text.to_string(),
            }
            .at(self.file, line_no, token.column)
        })?;

        let operand = cursor.remainder();
        let file = self.file;
        let locate = |e: AsmError, column: usize| e.at(file, line_no, column);
        let operand_column = if operand.text.is_empty() {
            token.column
        } else {
            operand.column
        };

        let instruction = match opcode.operand_kind() {
            OperandKind::Value | OperandKind::Depth => {
                let (value, rest) =
                    parse_integer(opcode, operand.text).map_err(|e| locate(e, operand_column))?;
                if !rest.is_empty() {
                    warn!(
                        "{}:{}:{}: ignoring `{}` after operand of `{}`",
                        file, line_no, operand_column, rest, opcode
                    );
                }
                Instruction::new(opcode, value)
            }
            OperandKind::Label => {
                if operand.text.is_empty() {
                    return Err(locate(AsmError::ExpectedLabel { opcode }, token.column));
                }
                Instruction::new(opcode, 0)
            }
            OperandKind::None => {
                if !operand.text.is_empty() {
                    warn!(
                        "{}:{}:{}: ignoring operand `{}` for `{}`",
                        file, line_no, operand.column, operand.text, opcode
                    );
                }
                Instruction::bare(opcode)
            }
        };

        let site = self
            .program
            .push(instruction)
            .map_err(|e| locate(e, token.column))?;

        if opcode.operand_kind() == OperandKind::Label {
            self.deferred
                .record(DeferredOperand {
                    label: operand.text.to_string(),
                    site,
                    line: line_no,
                    column: operand.column,
                })
                .map_err(|e| locate(e, operand.column))?;
        }

        Ok(())
    }

    /// Resolves every deferred operand and returns the finished program.
    fn finish(mut self) -> Result<Program, AsmError> {
        for entry in self.deferred.iter() {
            let address = self
                .symbols
                .resolve(&entry.label)
                .map_err(|e| e.at(self.file, entry.line, entry.column))?;
            self.program.patch_operand(entry.site, address as i64);
        }
        debug!(
            "{}: assembled {} instructions, {} labels, {} patched jumps",
            self.file,
            self.program.len(),
            self.symbols.len(),
            self.deferred.len()
        );
        Ok(self.program)
    }
}

/// Assembles source text with the default name and limits.
pub fn assemble_source(source: &str) -> Result<Program, AsmError> {
    assemble_source_with_name(source, DEFAULT_SOURCE_NAME)
}

/// Assembles source, using `source_name` in diagnostics.
pub fn assemble_source_with_name(source: &str, source_name: &str) -> Result<Program, AsmError> {
    assemble_with_limits(source, source_name, Limits::default())
}

/// Assembles source under explicit capacity limits.
///
/// On failure a compiler-style diagnostic is logged at error level and the
/// first error is returned.
pub fn assemble_with_limits(
    source: &str,
    source_name: &str,
    limits: Limits,
) -> Result<Program, AsmError> {
    let result = (|| {
        let mut asm = Assembler::new(source_name, limits);
        for (index, line) in source.lines().enumerate() {
            asm.line(index + 1, line)?;
        }
        asm.finish()
    })();

    if let Err(err) = &result {
        error!("{}", render_assembly_diagnostic(source, err).trim_end());
    }

    result
}

/// Convenience: assemble directly from a file path.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, AsmError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| AsmError::Io {
        path: path_ref.display().to_string(),
        source: e.to_string(),
    })?;
    assemble_source_with_name(&source, &path_ref.display().to_string())
}
