use std::num::NonZero;

use crate::{BlockPool, DropPolicy, Result};

/// Builder for creating an instance of [`BlockPool`].
///
/// [`BlockPool`] requires the number of blocks and the size of each block to be specified at
/// construction time. Both are mandatory, whereas other settings are optional.
///
/// You only need to use this builder if you want to customize the pool configuration beyond
/// what [`BlockPool::new()`] offers.
///
/// # Examples
///
/// ```
/// use block_pool::{BlockPool, DropPolicy};
/// use new_zealand::nz;
///
/// let pool = BlockPool::builder()
///     .count(nz!(8))
///     .block_size(nz!(256))
///     .drop_policy(DropPolicy::MustNotDropAcquired)
///     .build()?;
///
/// assert_eq!(pool.available(), 8);
/// # Ok::<(), block_pool::Error>(())
/// ```
#[derive(Debug)]
#[must_use]
pub struct BlockPoolBuilder {
    count: Option<NonZero<usize>>,
    block_size: Option<NonZero<usize>>,
    drop_policy: DropPolicy,
}

impl BlockPoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            count: None,
            block_size: None,
            drop_policy: DropPolicy::default(),
        }
    }

    /// Sets the number of blocks in the pool. The pool never grows beyond this.
    pub fn count(mut self, count: NonZero<usize>) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the size of each block, in bytes.
    pub fn block_size(mut self, block_size: NonZero<usize>) -> Self {
        self.block_size = Some(block_size);
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how
    /// to treat blocks that are still acquired when the pool is destroyed.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the block pool with the specified configuration, allocating all of its memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`][crate::Error::OutOfMemory] if the backing memory cannot
    /// be allocated. No memory is retained in that case.
    ///
    /// # Panics
    ///
    /// Panics if the block count or block size has not been set.
    pub fn build(self) -> Result<BlockPool> {
        let count = self
            .count
            .expect("block count must be set using .count() before calling .build()");
        let block_size = self
            .block_size
            .expect("block size must be set using .block_size() before calling .build()");

        BlockPool::new_inner(count, block_size, self.drop_policy)
    }
}
