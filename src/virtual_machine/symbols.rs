//! Label bookkeeping for the assembler.
//!
//! [`SymbolTable`] holds resolved bindings; [`DeferredOperands`] records jump
//! sites whose target is patched after the whole source has been scanned.

use crate::virtual_machine::errors::AsmError;
use std::collections::HashMap;

/// Append-only map from label name to instruction address.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    bindings: HashMap<String, usize>,
    capacity: usize,
}

impl SymbolTable {
    /// Creates an empty table holding at most `capacity` labels.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: HashMap::new(),
            capacity,
        }
    }

    /// Binds `name` to `address`.
    ///
    /// Rebinding an existing name is an error, never an overwrite.
    pub fn define(&mut self, name: &str, address: usize) -> Result<(), AsmError> {
        if self.bindings.contains_key(name) {
            return Err(AsmError::DuplicateLabel {
                label: name.to_string(),
            });
        }
        if self.bindings.len() >= self.capacity {
            return Err(AsmError::TableFull {
                table: "symbol table",
                capacity: self.capacity,
            });
        }
        self.bindings.insert(name.to_string(), address);
        Ok(())
    }

    /// Returns the address bound to `name`.
    pub fn resolve(&self, name: &str) -> Result<usize, AsmError> {
        self.bindings
            .get(name)
            .copied()
            .ok_or_else(|| AsmError::UnknownBinding {
                label: name.to_string(),
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }
}

/// A jump whose operand still names a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredOperand {
    /// Label the operand refers to.
    pub label: String,
    /// Index of the instruction whose operand gets patched.
    pub site: usize,
    /// 1-based source line of the reference.
    pub line: usize,
    /// 1-based column of the label token.
    pub column: usize,
}

/// Ordered list of pending label references.
#[derive(Debug, Clone)]
pub struct DeferredOperands {
    entries: Vec<DeferredOperand>,
    capacity: usize,
}

impl DeferredOperands {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Records a reference to `entry.label` at `entry.site`.
    pub fn record(&mut self, entry: DeferredOperand) -> Result<(), AsmError> {
        if self.entries.len() >= self.capacity {
            return Err(AsmError::TableFull {
                table: "deferred operand list",
                capacity: self.capacity,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeferredOperand> {
        self.entries.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
