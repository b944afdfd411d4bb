use std::fmt;
use std::iter::FusedIterator;

use crate::{BlockHeader, FreeStackIter};

/// A diagnostic snapshot of one block of a [`BlockPool`][crate::BlockPool].
///
/// Produced by [`BlockPool::dump()`][crate::BlockPool::dump] and
/// [`BlockPool::blocks()`][crate::BlockPool::blocks].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockRecord {
    index: usize,
    in_use: bool,
    logical_size: usize,
    address: usize,
}

impl BlockRecord {
    #[must_use]
    pub(crate) fn new(index: usize, header: &BlockHeader, address: usize) -> Self {
        Self {
            index,
            in_use: header.in_use,
            logical_size: header.logical_size,
            address,
        }
    }

    /// The index of the block within its pool.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the block is currently acquired.
    #[must_use]
    pub fn in_use(&self) -> bool {
        self.in_use
    }

    /// The number of bytes the block's last holder stated it had written.
    ///
    /// This is reset to zero when the block is acquired and set when it is released.
    #[must_use]
    pub fn logical_size(&self) -> usize {
        self.logical_size
    }

    /// The address of the first payload byte. Only meaningful for diagnostics.
    #[must_use]
    pub fn address(&self) -> usize {
        self.address
    }
}

impl fmt::Display for BlockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {}: data={:#x}, in_use={}, logical_size={}",
            self.index, self.address, self.in_use, self.logical_size
        )
    }
}

/// Shared state for iterating records: the headers and where the payloads start.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RecordSource<'a> {
    headers: &'a [BlockHeader],
    base_address: usize,
    block_size: usize,
}

impl<'a> RecordSource<'a> {
    #[must_use]
    pub(crate) fn new(headers: &'a [BlockHeader], base_address: usize, block_size: usize) -> Self {
        Self {
            headers,
            base_address,
            block_size,
        }
    }

    fn header(&self, index: usize) -> &'a BlockHeader {
        self.headers
            .get(index)
            .expect("pool only tracks indexes of blocks it owns")
    }

    fn record(&self, index: usize) -> BlockRecord {
        let offset = index
            .checked_mul(self.block_size)
            .expect("guarded by arena size calculation at pool creation");

        let address = self
            .base_address
            .checked_add(offset)
            .expect("guarded by arena size calculation at pool creation");

        BlockRecord::new(index, self.header(index), address)
    }
}

/// Iterator over the free blocks of a pool, from the block that will be acquired next to the one
/// that will be acquired last.
///
/// Returned by [`BlockPool::dump()`][crate::BlockPool::dump]. The iterator borrows the pool, so
/// the pool cannot change while it is alive. Clone it to restart from the current position, or
/// call `dump()` again to start over.
#[derive(Clone, Debug)]
pub struct Dump<'a> {
    source: RecordSource<'a>,
    free: FreeStackIter<'a>,
}

impl<'a> Dump<'a> {
    #[must_use]
    pub(crate) fn new(source: RecordSource<'a>, free: FreeStackIter<'a>) -> Self {
        Self { source, free }
    }
}

impl Iterator for Dump<'_> {
    type Item = BlockRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.free.next()?;
        Some(self.source.record(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.free.size_hint()
    }
}

impl ExactSizeIterator for Dump<'_> {}
impl FusedIterator for Dump<'_> {}

/// Iterator over every block of a pool in the order the blocks were constructed.
///
/// Returned by [`BlockPool::blocks()`][crate::BlockPool::blocks].
#[derive(Clone, Debug)]
pub struct Blocks<'a> {
    source: RecordSource<'a>,
    next: Option<usize>,
}

impl<'a> Blocks<'a> {
    #[must_use]
    pub(crate) fn new(source: RecordSource<'a>, first: Option<usize>) -> Self {
        Self {
            source,
            next: first,
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        self.next = self.source.header(index).next;
        Some(self.source.record(index))
    }
}

impl FusedIterator for Blocks<'_> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::FreeStack;

    fn chained_headers(count: usize) -> Vec<BlockHeader> {
        (0..count)
            .map(|index| {
                let next = index.checked_add(1).filter(|next| *next < count);
                BlockHeader::new(next)
            })
            .collect()
    }

    #[test]
    fn record_display_is_one_line() {
        let header = BlockHeader::new(None);
        let record = BlockRecord::new(2, &header, 0x1000);

        assert_eq!(
            record.to_string(),
            "block 2: data=0x1000, in_use=false, logical_size=0"
        );
    }

    #[test]
    fn dump_follows_free_stack_with_addresses() {
        let headers = chained_headers(3);
        let mut stack = FreeStack::new_full(3).unwrap();
        _ = stack.pop();

        let dump = Dump::new(RecordSource::new(&headers, 0x100, 8), stack.iter());
        assert_eq!(dump.len(), 2);

        let records = dump.collect::<Vec<_>>();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index(), 1);
        assert_eq!(records[0].address(), 0x108);
        assert_eq!(records[1].index(), 2);
        assert_eq!(records[1].address(), 0x110);
    }

    #[test]
    fn dump_clone_restarts_from_current_position() {
        let headers = chained_headers(3);
        let stack = FreeStack::new_full(3).unwrap();

        let mut dump = Dump::new(RecordSource::new(&headers, 0, 1), stack.iter());
        _ = dump.next();

        let rest = dump.clone().map(|r| r.index()).collect::<Vec<_>>();
        let again = dump.map(|r| r.index()).collect::<Vec<_>>();

        assert_eq!(rest, vec![1, 2]);
        assert_eq!(rest, again);
    }

    #[test]
    fn blocks_walk_the_header_chain() {
        let headers = chained_headers(4);

        let blocks = Blocks::new(RecordSource::new(&headers, 0, 16), Some(0));
        let indexes = blocks.map(|r| r.index()).collect::<Vec<_>>();

        assert_eq!(indexes, vec![0, 1, 2, 3]);
    }
}
