use std::fmt;
use std::sync::atomic::{self, AtomicU64};

/// Identifies the pool that issued a handle.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) struct PoolId(u64);

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

impl PoolId {
    /// Returns an id that no other pool in this process has been given.
    #[must_use]
    pub(crate) fn unique() -> Self {
        Self(NEXT_POOL_ID.fetch_add(1, atomic::Ordering::Relaxed))
    }

    #[must_use]
    pub(crate) fn as_u64(self) -> u64 {
        self.0
    }
}

/// An opaque reference to an acquired block of a [`BlockPool`][crate::BlockPool].
///
/// Handles are returned by [`BlockPool::acquire()`][crate::BlockPool::acquire] and are valid
/// until passed to [`BlockPool::release()`][crate::BlockPool::release]. They are plain values:
/// copying one does not duplicate the block, and using a copy after the block has been released
/// is detected by the pool as long as the block has not been acquired again in the meantime.
///
/// # Handle reuse
///
/// The pool hands out the most recently released block first, so a released handle and the
/// handle returned by the next acquire may be equal. A stale copy used after that point refers
/// to the new holder's block.
///
/// # Example
///
/// ```rust
/// use block_pool::BlockPool;
/// use new_zealand::nz;
///
/// let mut pool = BlockPool::new(nz!(2), nz!(16))?;
///
/// let handle = pool.acquire()?;
/// let copy = handle;
///
/// pool.release(handle, 0)?;
/// assert!(pool.release(copy, 0).is_err());
/// # Ok::<(), block_pool::Error>(())
/// ```
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct BlockHandle {
    pool_id: PoolId,
    index: usize,
}

impl BlockHandle {
    #[must_use]
    pub(crate) fn new(pool_id: PoolId, index: usize) -> Self {
        Self { pool_id, index }
    }

    #[must_use]
    pub(crate) fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// The index of the block within its pool.
    ///
    /// Indexes are stable for the lifetime of the pool and match the `index` reported by
    /// [`BlockPool::dump()`][crate::BlockPool::dump].
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Debug for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockHandle")
            .field("pool_id", &self.pool_id.as_u64())
            .field("index", &self.index)
            .finish()
    }
}
