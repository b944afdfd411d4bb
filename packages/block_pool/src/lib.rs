#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity pool of uniformly sized memory blocks with constant-time acquire and release.
//!
//! This crate provides [`BlockPool`], which allocates all of its memory up front as a number of
//! equally sized blocks and then hands those blocks out and takes them back without touching the
//! system allocator again. It is intended for workloads that repeatedly need short-lived buffers
//! of one size and want predictable, allocation-free behavior on the hot path.
//!
//! # Key Features
//!
//! - **Constant-time operations**: acquire pops and release pushes a LIFO free stack
//! - **Cache-friendly reuse**: the most recently released block is handed out first
//! - **Bounded writes**: payloads are only reachable as slices of exactly the block size
//! - **Fault detection**: double release, foreign handles and corrupted metadata are reported as
//!   errors instead of corrupting the pool
//! - **All-or-nothing construction**: allocation failure yields [`Error::OutOfMemory`], never a
//!   partially built pool
//! - **Diagnostics**: [`BlockPool::dump()`] and [`BlockPool::blocks()`] list block state lazily,
//!   and every operation emits `tracing` events
//!
//! # Block lifecycle
//!
//! ```text
//!                 acquire()                 write() / payload_mut()
//!    ┌──────┐ ─────────────────▶ ┌────────┐ ─────────┐
//!    │ free │                    │ in use │          │
//!    └──────┘ ◀───────────────── └────────┘ ◀────────┘
//!               release(size)
//! ```
//!
//! Each block is paired with a header that records whether it is in use, how many bytes its last
//! holder wrote and a validity tag ([`VALID_SENTINEL`]). The header is the only authority on
//! whether a block is in use, so releasing a block twice is always detected.
//!
//! # Example
//!
//! ```rust
//! use block_pool::{BlockPool, Error};
//! use new_zealand::nz;
//!
//! let mut pool = BlockPool::new(nz!(5), nz!(10))?;
//!
//! // Take every block.
//! let handles = (0..5)
//!     .map(|_| pool.acquire())
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! // The pool is exhausted and says so instead of handing out memory.
//! assert!(matches!(pool.acquire(), Err(Error::Empty { .. })));
//!
//! for handle in handles {
//!     pool.write(handle, b"payload")?;
//!     pool.release(handle, 7)?;
//! }
//!
//! assert_eq!(pool.available(), 5);
//! assert!(pool.dump().all(|record| !record.in_use()));
//! # Ok::<(), Error>(())
//! ```

mod builder;
mod drop_policy;
mod dump;
mod error;
mod free_stack;
mod handle;
mod header;
mod pool;

pub use builder::*;
pub use drop_policy::*;
pub use dump::{BlockRecord, Blocks, Dump};
pub(crate) use dump::RecordSource;
pub use error::Error;
pub(crate) use error::Result;
pub(crate) use free_stack::*;
pub use handle::BlockHandle;
pub(crate) use handle::PoolId;
pub(crate) use header::BlockHeader;
pub use header::VALID_SENTINEL;
pub use pool::BlockPool;
