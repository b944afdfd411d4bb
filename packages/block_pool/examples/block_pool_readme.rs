//! Minimal example of using `BlockPool` as a source of fixed-size scratch buffers.

use block_pool::BlockPool;
use new_zealand::nz;

fn main() -> Result<(), block_pool::Error> {
    let mut pool = BlockPool::new(nz!(4), nz!(64))?;

    // Acquiring a block gives you a handle that you use to reach the block's bytes.
    let handle = pool.acquire()?;
    pool.write(handle, b"Hello, pool!")?;

    let text = String::from_utf8_lossy(&pool.payload(handle)?[..12]).into_owned();
    println!("Block {} holds: {text}", handle.index());

    // Releasing hands the block back. The next acquire will return this same block.
    pool.release(handle, 12)?;
    println!("{pool}");

    Ok(())
}
