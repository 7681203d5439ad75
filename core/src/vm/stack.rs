use core::fmt;

/// Operand stack of an activation frame.
///
/// A thin wrapper over `Vec` exposing only the operations the VM needs. The
/// compiler's computed maximum depth is used as the initial capacity so that
/// well-formed frames never reallocate.
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    /// Removes and returns the top value, or `None` if the stack is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Exchanges the two top values. Returns `false` if there are fewer than two.
    #[inline]
    pub fn swap(&mut self) -> bool {
        let len = self.items.len();
        if len < 2 {
            return false;
        }
        self.items.swap(len - 1, len - 2);
        true
    }

    /// Removes the top `n` values, returned bottom to top (the top of the
    /// stack is the last element).
    ///
    /// Returns `None`, leaving the stack untouched, if there are fewer than `n`.
    pub fn take_top(&mut self, n: usize) -> Option<Vec<T>> {
        let len = self.items.len();
        if n > len {
            None
        } else {
            Some(self.items.split_off(len - n))
        }
    }
}

impl<T: Clone> Stack<T> {
    /// Duplicates the top element. Returns `false` if the stack is empty.
    #[inline]
    pub fn dup(&mut self) -> bool {
        if let Some(value) = self.peek().cloned() {
            self.push(value);
            true
        } else {
            false
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}
