/// Determines how a [`BlockPool`][crate::BlockPool] treats blocks that are still acquired when
/// the pool is destroyed or dropped.
///
/// By default, the pool reclaims acquired blocks along with the rest of its memory.
///
/// # Examples
///
/// ```
/// use block_pool::{BlockPool, DropPolicy};
/// use new_zealand::nz;
///
/// // The drop policy is set at pool creation time.
/// let pool = BlockPool::builder()
///     .count(nz!(4))
///     .block_size(nz!(64))
///     .drop_policy(DropPolicy::MustNotDropAcquired)
///     .build()?;
/// # Ok::<(), block_pool::Error>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool reclaims acquired blocks when it is destroyed. This is the default.
    #[default]
    MayDropAcquired,

    /// The pool will panic if any block is still acquired when it is destroyed.
    ///
    /// This may be valuable if the caller guarantees that every acquire is paired with a release
    /// and wants a violation of that guarantee to be loud rather than silently reclaimed.
    MustNotDropAcquired,
}
