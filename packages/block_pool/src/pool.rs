use std::fmt;
use std::num::NonZero;
use std::ops::Range;
use std::thread;

use tracing::{debug, error, trace, warn};

use crate::{
    BlockHandle, BlockHeader, BlockPoolBuilder, Blocks, DropPolicy, Dump, Error, FreeStack,
    PoolId, RecordSource, Result,
};

/// A fixed-capacity pool of uniformly sized memory blocks.
///
/// All memory is allocated when the pool is created. Afterwards, blocks are handed out by
/// [`acquire()`][1] and returned by [`release()`][2], both in constant time. The pool never
/// grows, shrinks or moves its blocks.
///
/// Blocks are reused in LIFO order: the most recently released block is the next one to be
/// acquired, which keeps recently touched memory hot in the cache.
///
/// # Payload access
///
/// A caller never receives a raw pointer. The payload of an acquired block is reached through
/// its [`BlockHandle`] via [`write()`][3], [`payload()`][4] or [`payload_mut()`][5], all of which
/// are bounded to exactly [`block_size()`][6] bytes. Writing past the end of a block is rejected
/// with [`Error::SizeExceeded`] before any byte is copied.
///
/// # Fault detection
///
/// Every operation that takes a handle validates it first. Handles from another pool, indexes
/// out of bounds and corrupted block metadata are reported as [`Error::InvalidHandle`].
/// Releasing a block that is not acquired is reported as [`Error::DoubleRelease`] and leaves the
/// pool untouched. Whether a block is acquired is tracked per block, never inferred from the
/// position of the free stack.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) and can be shared by reference ([`Sync`]) for read-only
/// diagnostics. Acquire and release take `&mut self`, so sharing a pool between threads requires
/// wrapping it in a mutex, which makes every acquire and release atomic with respect to each
/// other.
///
/// # Example
///
/// ```rust
/// use block_pool::{BlockPool, Error};
/// use new_zealand::nz;
///
/// let mut pool = BlockPool::new(nz!(5), nz!(10))?;
///
/// let handle = pool.acquire()?;
/// pool.write(handle, b"01234567")?;
/// assert_eq!(&pool.payload(handle)?[..8], b"01234567");
///
/// pool.release(handle, 8)?;
///
/// assert!(matches!(
///     pool.release(handle, 8),
///     Err(Error::DoubleRelease { .. })
/// ));
/// assert_eq!(pool.available(), 5);
/// # Ok::<(), Error>(())
/// ```
///
/// [1]: Self::acquire
/// [2]: Self::release
/// [3]: Self::write
/// [4]: Self::payload
/// [5]: Self::payload_mut
/// [6]: Self::block_size
pub struct BlockPool {
    id: PoolId,

    block_size: usize,

    /// Payload bytes of all blocks, back to back. Block `i` occupies
    /// `i * block_size .. (i + 1) * block_size`.
    storage: Box<[u8]>,

    /// One header per block, at the same index as the block.
    headers: Box<[BlockHeader]>,

    /// Indexes of the blocks that are not in use, most recently released on top.
    free: FreeStack,

    drop_policy: DropPolicy,
}

impl BlockPool {
    pub(crate) fn new_inner(
        count: NonZero<usize>,
        block_size: NonZero<usize>,
        drop_policy: DropPolicy,
    ) -> Result<Self> {
        let count = count.get();
        let block_size = block_size.get();

        let out_of_memory = |reason: &str| {
            debug!(count, block_size, reason, "unable to allocate block pool");
            Error::OutOfMemory { count, block_size }
        };

        // Allocations are limited to isize::MAX bytes, so anything beyond is never satisfiable.
        let storage_size = count
            .checked_mul(block_size)
            .filter(|size| isize::try_from(*size).is_ok())
            .ok_or_else(|| out_of_memory("total size exceeds the addressable range"))?;

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(storage_size)
            .map_err(|e| out_of_memory(&e.to_string()))?;
        storage.resize(storage_size, 0_u8);

        let mut headers = Vec::new();
        headers
            .try_reserve_exact(count)
            .map_err(|e| out_of_memory(&e.to_string()))?;
        headers.extend((0..count).map(|index| {
            // The last header has no successor.
            let next = index.checked_add(1).filter(|next| *next < count);
            BlockHeader::new(next)
        }));

        let free = FreeStack::new_full(count).map_err(|e| out_of_memory(&e.to_string()))?;

        let pool = Self {
            id: PoolId::unique(),
            block_size,
            storage: storage.into_boxed_slice(),
            headers: headers.into_boxed_slice(),
            free,
            drop_policy,
        };

        for record in pool.blocks() {
            trace!(
                pool_id = pool.id.as_u64(),
                index = record.index(),
                address = record.address(),
                block_size,
                "block ready"
            );
        }

        debug!(
            pool_id = pool.id.as_u64(),
            count, block_size, "block pool created"
        );

        Ok(pool)
    }

    /// Creates a pool of `count` blocks of `block_size` bytes each, using the default
    /// configuration.
    ///
    /// All blocks start out free and the pool is immediately ready to hand them out.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_pool::BlockPool;
    /// use new_zealand::nz;
    ///
    /// let pool = BlockPool::new(nz!(5), nz!(10))?;
    ///
    /// assert_eq!(pool.count(), 5);
    /// assert_eq!(pool.block_size(), 10);
    /// assert_eq!(pool.available(), 5);
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the backing memory cannot be allocated. Creation is
    /// all-or-nothing: no partially constructed pool is ever returned.
    pub fn new(count: NonZero<usize>, block_size: NonZero<usize>) -> Result<Self> {
        Self::builder().count(count).block_size(block_size).build()
    }

    /// Starts building a new [`BlockPool`].
    ///
    /// Use this when you want to customize the pool configuration beyond the defaults.
    pub fn builder() -> BlockPoolBuilder {
        BlockPoolBuilder::new()
    }

    /// The total number of blocks in the pool.
    #[must_use]
    pub fn count(&self) -> usize {
        self.headers.len()
    }

    /// The size of each block, in bytes.
    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The number of blocks that can currently be acquired.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_pool::BlockPool;
    /// use new_zealand::nz;
    ///
    /// let mut pool = BlockPool::new(nz!(2), nz!(8))?;
    /// assert_eq!(pool.available(), 2);
    ///
    /// let handle = pool.acquire()?;
    /// assert_eq!(pool.available(), 1);
    ///
    /// pool.release(handle, 0)?;
    /// assert_eq!(pool.available(), 2);
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Like [`available()`][Self::available] but tolerates a missing pool, for which it
    /// reports zero available blocks and logs an error instead of failing the caller.
    #[must_use]
    pub fn available_in(pool: Option<&Self>) -> usize {
        pool.map_or_else(
            || {
                error!("queried available blocks of a missing block pool");
                0
            },
            Self::available,
        )
    }

    /// The number of blocks that are currently acquired, including any block withheld because
    /// its header was found corrupted.
    #[must_use]
    pub fn acquired(&self) -> usize {
        self.count()
            .checked_sub(self.available())
            .expect("free stack never holds more entries than there are blocks")
    }

    /// Whether every block is currently acquired, in which case
    /// [`acquire()`][Self::acquire] will fail.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.free.is_empty()
    }

    /// Acquires a free block, returning a handle to it.
    ///
    /// The block that was released most recently is returned first. Its payload still holds
    /// whatever the previous holder left there; only the logical size is reset to zero.
    ///
    /// # Errors
    ///
    /// * [`Error::Empty`] if every block is already acquired. The pool is not modified.
    /// * [`Error::InvalidHandle`] if the block on top of the free stack has a corrupted header.
    ///   That block is withheld from the pool for good and counts as acquired from then on;
    ///   the next call moves on to the next free block.
    pub fn acquire(&mut self) -> Result<BlockHandle> {
        let Some(index) = self.free.pop() else {
            debug!(
                pool_id = self.id.as_u64(),
                count = self.count(),
                "no free block to acquire"
            );
            return Err(Error::Empty {
                count: self.count(),
            });
        };

        if !self.headers.get(index).is_some_and(BlockHeader::is_valid) {
            // The block stays off the free stack so it is never handed out.
            return Err(self.invalid_handle(index, "block header tag is corrupted"));
        }

        let header = self.header_mut(index);
        assert!(
            !header.in_use,
            "block {index} was on the free stack while in use"
        );

        header.in_use = true;
        header.logical_size = 0;

        trace!(
            pool_id = self.id.as_u64(),
            index,
            available = self.available(),
            "acquired block"
        );

        #[cfg(debug_assertions)]
        self.integrity_check();

        Ok(BlockHandle::new(self.id, index))
    }

    /// Returns an acquired block to the pool, recording how many bytes of it the caller used.
    ///
    /// After this call the handle (and any copy of it) must no longer be used to access the
    /// block. The block becomes the next one returned by [`acquire()`][Self::acquire].
    ///
    /// # Errors
    ///
    /// The checks are made in this order and the pool is not modified if any of them fails:
    ///
    /// * [`Error::InvalidHandle`] if the handle was not issued by this pool or the block's
    ///   metadata is corrupted.
    /// * [`Error::DoubleRelease`] if the block is not currently acquired.
    /// * [`Error::SizeExceeded`] if `logical_size` is larger than the block size.
    pub fn release(&mut self, handle: BlockHandle, logical_size: usize) -> Result<()> {
        let index = handle.index();

        if !self.validated_header(handle)?.in_use {
            warn!(
                pool_id = self.id.as_u64(),
                index, "rejected release of a block that is already free"
            );
            return Err(Error::DoubleRelease { index });
        }

        self.check_size(logical_size)?;

        let header = self.header_mut(index);
        header.in_use = false;
        header.logical_size = logical_size;

        self.free.push(index);

        trace!(
            pool_id = self.id.as_u64(),
            index,
            logical_size,
            available = self.available(),
            "released block"
        );

        #[cfg(debug_assertions)]
        self.integrity_check();

        Ok(())
    }

    /// Copies `bytes` to the start of an acquired block and records their length as the
    /// block's logical size.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHandle`] if the handle was not issued by this pool or the block's
    ///   metadata is corrupted.
    /// * [`Error::NotAcquired`] if the block is not currently acquired.
    /// * [`Error::SizeExceeded`] if `bytes` is longer than the block size. Nothing is copied.
    pub fn write(&mut self, handle: BlockHandle, bytes: &[u8]) -> Result<()> {
        let block_size = self.block_size;

        let target = self
            .payload_mut(handle)?
            .get_mut(..bytes.len())
            .ok_or(Error::SizeExceeded {
                requested: bytes.len(),
                block_size,
            })?;

        target.copy_from_slice(bytes);

        self.header_mut(handle.index()).logical_size = bytes.len();

        Ok(())
    }

    /// The full payload of an acquired block, exactly [`block_size()`][Self::block_size] bytes.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHandle`] if the handle was not issued by this pool or the block's
    ///   metadata is corrupted.
    /// * [`Error::NotAcquired`] if the block is not currently acquired.
    pub fn payload(&self, handle: BlockHandle) -> Result<&[u8]> {
        let range = self.acquired_range(handle)?;

        Ok(self
            .storage
            .get(range)
            .expect("block ranges are guarded by the storage size calculated at pool creation"))
    }

    /// The full payload of an acquired block for writing, exactly
    /// [`block_size()`][Self::block_size] bytes.
    ///
    /// Writing through this slice does not update the block's logical size; state it when
    /// releasing the block.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidHandle`] if the handle was not issued by this pool or the block's
    ///   metadata is corrupted.
    /// * [`Error::NotAcquired`] if the block is not currently acquired.
    pub fn payload_mut(&mut self, handle: BlockHandle) -> Result<&mut [u8]> {
        let range = self.acquired_range(handle)?;

        Ok(self
            .storage
            .get_mut(range)
            .expect("block ranges are guarded by the storage size calculated at pool creation"))
    }

    /// The logical size currently recorded for a block: the length of the last
    /// [`write()`][Self::write] while acquired, or the size stated at release while free.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandle`] if the handle was not issued by this pool or the block's
    /// metadata is corrupted.
    pub fn logical_size(&self, handle: BlockHandle) -> Result<usize> {
        Ok(self.validated_header(handle)?.logical_size)
    }

    /// Lists the free blocks, starting from the one the next [`acquire()`][Self::acquire]
    /// will return.
    ///
    /// The iterator is lazy and does not modify the pool. Call `dump()` again (or clone the
    /// iterator) to walk the list again.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_pool::BlockPool;
    /// use new_zealand::nz;
    ///
    /// let mut pool = BlockPool::new(nz!(3), nz!(4))?;
    /// let handle = pool.acquire()?;
    ///
    /// for record in pool.dump() {
    ///     println!("{record}");
    /// }
    ///
    /// assert_eq!(pool.dump().len(), 2);
    /// assert!(pool.dump().all(|record| !record.in_use()));
    /// # pool.release(handle, 0)?;
    /// # Ok::<(), block_pool::Error>(())
    /// ```
    #[must_use]
    pub fn dump(&self) -> Dump<'_> {
        Dump::new(self.record_source(), self.free.iter())
    }

    /// Lists every block of the pool, free or acquired, in the order they were constructed.
    #[must_use]
    pub fn blocks(&self) -> Blocks<'_> {
        // Block 0 is always the first constructed and the pool is never empty.
        Blocks::new(self.record_source(), Some(0))
    }

    /// Destroys the pool and releases all of its memory, returning how many blocks were still
    /// acquired.
    ///
    /// Any handle still held by a caller becomes meaningless. Dropping the pool has the same
    /// effect; this method exists to make the teardown explicit and observable.
    ///
    /// # Panics
    ///
    /// Panics if blocks are still acquired and the pool was built with
    /// [`DropPolicy::MustNotDropAcquired`].
    pub fn destroy(self) -> usize {
        let acquired = self.acquired();

        debug!(
            pool_id = self.id.as_u64(),
            count = self.count(),
            block_size = self.block_size,
            acquired,
            "destroying block pool"
        );

        drop(self);
        acquired
    }

    fn record_source(&self) -> RecordSource<'_> {
        RecordSource::new(&self.headers, self.storage.as_ptr().addr(), self.block_size)
    }

    fn check_size(&self, requested: usize) -> Result<()> {
        if requested > self.block_size {
            return Err(Error::SizeExceeded {
                requested,
                block_size: self.block_size,
            });
        }

        Ok(())
    }

    /// Returns the header of the block behind a handle after confirming the handle was issued
    /// by this pool and the header is intact.
    fn validated_header(&self, handle: BlockHandle) -> Result<&BlockHeader> {
        let index = handle.index();

        if handle.pool_id() != self.id {
            return Err(self.invalid_handle(index, "handle belongs to a different pool"));
        }

        let header = self
            .headers
            .get(index)
            .ok_or_else(|| self.invalid_handle(index, "block index is out of bounds"))?;

        if !header.is_valid() {
            return Err(self.invalid_handle(index, "block header tag is corrupted"));
        }

        Ok(header)
    }

    fn invalid_handle(&self, index: usize, problem: &'static str) -> Error {
        error!(
            pool_id = self.id.as_u64(),
            index, problem, "rejected invalid block handle"
        );

        Error::InvalidHandle { index, problem }
    }

    fn acquired_range(&self, handle: BlockHandle) -> Result<Range<usize>> {
        let index = handle.index();

        if !self.validated_header(handle)?.in_use {
            return Err(Error::NotAcquired { index });
        }

        Ok(self.block_range(index))
    }

    fn block_range(&self, index: usize) -> Range<usize> {
        let start = index
            .checked_mul(self.block_size)
            .expect("guarded by the storage size calculated at pool creation");
        let end = start
            .checked_add(self.block_size)
            .expect("guarded by the storage size calculated at pool creation");

        start..end
    }

    fn header_mut(&mut self, index: usize) -> &mut BlockHeader {
        self.headers
            .get_mut(index)
            .expect("pool only tracks indexes of blocks it owns")
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let count = self.count();

        let mut on_free_stack = vec![false; count];

        for index in self.free.iter() {
            let seen = on_free_stack
                .get_mut(index)
                .unwrap_or_else(|| panic!("free stack holds out of bounds index {index}"));

            assert!(!*seen, "block {index} is on the free stack more than once");
            *seen = true;
        }

        for (index, header) in self.headers.iter().enumerate() {
            let is_free = *on_free_stack.get(index).expect("guarded by loop range");

            if !header.is_valid() {
                // Corrupted blocks are withheld by acquire and never pushed back by release.
                assert!(
                    !is_free,
                    "block {index} has a corrupted tag {:#x} but is on the free stack",
                    header.tag
                );
                continue;
            }

            assert!(
                header.in_use != is_free,
                "block {index} has in_use={} but is_free={is_free}",
                header.in_use
            );

            assert!(
                header.logical_size <= self.block_size,
                "block {index} has logical size {} beyond block size {}",
                header.logical_size,
                self.block_size
            );
        }

        let mut visited: usize = 0;
        let mut next = Some(0);

        while let Some(index) = next {
            assert!(
                index == visited,
                "header chain reached block {index} at position {visited}"
            );

            visited = visited
                .checked_add(1)
                .expect("guarded by the position check above");

            next = self
                .headers
                .get(index)
                .expect("guarded by the position check above")
                .next;
        }

        assert!(
            visited == count,
            "header chain covers {visited} of {count} blocks"
        );
    }
}

impl Drop for BlockPool {
    fn drop(&mut self) {
        let acquired = self.acquired();

        if acquired > 0 {
            debug!(
                pool_id = self.id.as_u64(),
                acquired, "dropping block pool with acquired blocks"
            );
        }

        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if self.drop_policy == DropPolicy::MustNotDropAcquired && !thread::panicking() {
            assert!(
                acquired == 0,
                "dropped a block pool with {acquired} acquired blocks with a policy that says none may remain"
            );
        }
    }
}

impl fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("id", &self.id)
            .field("count", &self.count())
            .field("block_size", &self.block_size)
            .field("available", &self.available())
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block pool: count={}, available={}, block_size={}",
            self.count(),
            self.available(),
            self.block_size
        )
    }
}
