use std::collections::TryReserveError;
use std::iter::{Copied, Rev};
use std::slice;

/// Iterates the indexes in a [`FreeStack`], starting from the top of the stack.
pub(crate) type FreeStackIter<'a> = Rev<Copied<slice::Iter<'a, usize>>>;

/// A fixed-capacity LIFO stack of block indexes.
///
/// The stack only decides the order in which free blocks are handed out. Whether a block is
/// free is decided by its header, so the owner must never push an index that is already on the
/// stack. Storage is allocated once at construction and never grows.
#[derive(Debug)]
pub(crate) struct FreeStack {
    entries: Box<[usize]>,

    /// Number of live entries. The top of the stack is at `len - 1`; an empty stack has no top.
    len: usize,
}

impl FreeStack {
    /// Creates a full stack holding every index in `0..capacity`, arranged so that popping
    /// yields them in ascending order.
    pub(crate) fn new_full(capacity: usize) -> Result<Self, TryReserveError> {
        let mut entries = Vec::new();
        entries.try_reserve_exact(capacity)?;
        entries.extend((0..capacity).rev());

        Ok(Self {
            entries: entries.into_boxed_slice(),
            len: capacity,
        })
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes and returns the index at the top of the stack, if any.
    pub(crate) fn pop(&mut self) -> Option<usize> {
        let new_len = self.len.checked_sub(1)?;

        let index = *self
            .entries
            .get(new_len)
            .expect("len never exceeds capacity");

        self.len = new_len;
        Some(index)
    }

    /// # Panics
    ///
    /// Panics if the stack is full. The owner tracks membership separately and only pushes
    /// indexes that are not on the stack, so a full stack here means that tracking is broken.
    pub(crate) fn push(&mut self, index: usize) {
        let slot = self
            .entries
            .get_mut(self.len)
            .expect("pushed onto a full free stack - block membership tracking is broken");

        *slot = index;

        self.len = self
            .len
            .checked_add(1)
            .expect("guarded by the bounds check above");
    }

    /// Iterates over the live entries from the top of the stack to the bottom.
    pub(crate) fn iter(&self) -> FreeStackIter<'_> {
        self.entries
            .get(..self.len)
            .expect("len never exceeds capacity")
            .iter()
            .copied()
            .rev()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn new_full_pops_in_ascending_order() {
        let mut stack = FreeStack::new_full(3).unwrap();

        assert_eq!(stack.len(), 3);

        assert_eq!(stack.pop(), Some(0));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), None);

        assert!(stack.is_empty());
    }

    #[test]
    fn push_then_pop_is_lifo() {
        let mut stack = FreeStack::new_full(3).unwrap();

        let a = stack.pop().unwrap();
        let b = stack.pop().unwrap();

        stack.push(a);
        stack.push(b);

        assert_eq!(stack.iter().next(), Some(b));
        assert_eq!(stack.pop(), Some(b));
        assert_eq!(stack.pop(), Some(a));
    }

    #[test]
    fn iter_goes_from_top_to_bottom() {
        let mut stack = FreeStack::new_full(4).unwrap();

        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3]);

        _ = stack.pop();
        _ = stack.pop();
        stack.push(0);

        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn pop_on_empty_is_none() {
        let mut stack = FreeStack::new_full(1).unwrap();

        assert_eq!(stack.pop(), Some(0));
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.iter().next(), None);
        assert_eq!(stack.len(), 0);
    }

    #[test]
    #[should_panic]
    fn push_onto_full_panics() {
        let mut stack = FreeStack::new_full(2).unwrap();

        stack.push(0);
    }

    #[test]
    fn huge_capacity_fails_to_reserve() {
        FreeStack::new_full(usize::MAX).unwrap_err();
    }
}
