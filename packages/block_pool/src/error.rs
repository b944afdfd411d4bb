use thiserror::Error;

/// Errors that can occur when operating on a [`BlockPool`][crate::BlockPool].
///
/// None of these are fatal to the pool itself. After any error, the pool remains in the same
/// state it was in before the failed call, so the caller decides whether to retry, back off or
/// treat the fault as fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The backing memory for the pool could not be allocated. No pool was created.
    #[error("unable to allocate {count} blocks of {block_size} bytes")]
    OutOfMemory {
        /// The number of blocks requested.
        count: usize,

        /// The size of each requested block, in bytes.
        block_size: usize,
    },

    /// Every block in the pool is currently acquired.
    #[error("all {count} blocks in the pool are in use")]
    Empty {
        /// The total number of blocks in the pool.
        count: usize,
    },

    /// The handle does not refer to a valid block of this pool.
    ///
    /// This indicates either a handle issued by a different pool or corrupted block metadata
    /// and deserves to be treated as a serious diagnostic.
    #[error("invalid handle for block {index}: {problem}")]
    InvalidHandle {
        /// The block index carried by the handle.
        index: usize,

        /// A human-readable description of the problem.
        problem: &'static str,
    },

    /// The block was released while it was not acquired.
    #[error("block {index} is already free")]
    DoubleRelease {
        /// The index of the block.
        index: usize,
    },

    /// More bytes were written or claimed than a block can hold.
    #[error("{requested} bytes do not fit in a block of {block_size} bytes")]
    SizeExceeded {
        /// The number of bytes the caller attempted to write or claimed to have written.
        requested: usize,

        /// The size of each block in the pool, in bytes.
        block_size: usize,
    },

    /// The payload of a block was accessed while the block was not acquired.
    #[error("block {index} is not acquired")]
    NotAcquired {
        /// The index of the block.
        index: usize,
    },
}

/// A specialized `Result` type for block pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn messages_name_the_block() {
        let error = Error::DoubleRelease { index: 3 };
        assert_eq!(error.to_string(), "block 3 is already free");

        let error = Error::SizeExceeded {
            requested: 11,
            block_size: 10,
        };
        assert_eq!(
            error.to_string(),
            "11 bytes do not fit in a block of 10 bytes"
        );

        let error = Error::InvalidHandle {
            index: 7,
            problem: "handle belongs to a different pool",
        };
        assert_eq!(
            error.to_string(),
            "invalid handle for block 7: handle belongs to a different pool"
        );
    }

    #[test]
    fn usable_as_result_error() {
        let result: Result<()> = Err(Error::Empty { count: 5 });
        assert!(matches!(result, Err(Error::Empty { count: 5 })));
    }
}
