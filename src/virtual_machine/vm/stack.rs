use crate::virtual_machine::errors::Fault;

/// Bounded value stack.
///
/// Every operation either succeeds completely or returns a [`Fault`] without
/// touching the stored values.
#[derive(Debug, Clone)]
pub(super) struct Stack {
    values: Vec<i64>,
    capacity: usize,
}

impl Stack {
    /// Creates an empty stack holding at most `capacity` values.
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            values: Vec::new(),
            capacity,
        }
    }

    pub(super) fn as_slice(&self) -> &[i64] {
        &self.values
    }

    pub(super) fn clear(&mut self) {
        self.values.clear();
    }

    /// Returns [`Fault::StackOverflow`] if one more push would not fit.
    pub(super) fn ensure_room(&self) -> Result<(), Fault> {
        if self.values.len() >= self.capacity {
            return Err(Fault::StackOverflow);
        }
        Ok(())
    }

    pub(super) fn push(&mut self, value: i64) -> Result<(), Fault> {
        self.ensure_room()?;
        self.values.push(value);
        Ok(())
    }

    pub(super) fn pop(&mut self) -> Result<i64, Fault> {
        self.values.pop().ok_or(Fault::StackUnderflow)
    }

    /// Returns the value `depth` slots below the top (0 is the top).
    pub(super) fn peek(&self, depth: i64) -> Result<i64, Fault> {
        let depth = usize::try_from(depth).map_err(|_| Fault::StackUnderflow)?;
        if depth >= self.values.len() {
            return Err(Fault::StackUnderflow);
        }
        Ok(self.values[self.values.len() - 1 - depth])
    }

    /// Returns `(a, b)` where `b` is the top and `a` the value below it.
    pub(super) fn top_two(&self) -> Result<(i64, i64), Fault> {
        Ok((self.peek(1)?, self.peek(0)?))
    }

    /// Replaces the top two values with `value`.
    ///
    /// Callers check the depth with [`Stack::top_two`] first.
    pub(super) fn collapse_top_two(&mut self, value: i64) {
        self.values.pop();
        if let Some(top) = self.values.last_mut() {
            *top = value;
        }
    }
}
