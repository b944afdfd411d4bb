//! Diagnostic harness that walks a `BlockPool` through its whole lifecycle, including the
//! failure cases, and prints the pool state at each step.
//!
//! Pool diagnostics are emitted through `tracing`. Set `RUST_LOG=trace` to also see the
//! per-block construction trace and every individual acquire and release.

use block_pool::{BlockPool, Error};
use new_zealand::nz;
use tracing_subscriber::EnvFilter;

fn print_dump(label: &str, pool: &BlockPool) {
    println!("{label}: {pool}");

    for record in pool.dump() {
        println!("  + {record}");
    }
}

fn report<T>(step: &str, result: &Result<T, Error>) {
    match result {
        Ok(_) => println!("{step}: ok"),
        Err(error) => println!("{step}: {error}"),
    }
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let mut pool = BlockPool::new(nz!(5), nz!(10))?;
    print_dump("after init", &pool);
    println!("available = {}", pool.available());

    let data = pool.acquire()?;
    println!("acquired block {}, available = {}", data.index(), pool.available());

    let message = b"01234567\0";
    pool.write(data, message)?;
    println!(
        "payload: '{}'",
        String::from_utf8_lossy(&pool.payload(data)?[..message.len() - 1])
    );

    print_dump("before release", &pool);

    report("release", &pool.release(data, message.len()));

    let double_release = pool.release(data, message.len());
    report("double release", &double_release);
    assert!(matches!(double_release, Err(Error::DoubleRelease { .. })));

    print_dump("after release", &pool);

    let mut handles = Vec::new();
    for attempt in 1..=5 {
        let handle = pool.acquire()?;
        println!("acquire {attempt} of 5: block {}", handle.index());
        handles.push(handle);
    }

    let over_acquire = pool.acquire();
    report("acquire 6 of 5", &over_acquire);
    assert!(matches!(over_acquire, Err(Error::Empty { .. })));

    print_dump("exhausted", &pool);

    for handle in &handles {
        report("release", &pool.release(*handle, 0));
    }

    if let Some(last) = handles.last() {
        report("double release", &pool.release(*last, 0));
    }

    print_dump("after releasing everything", &pool);
    assert!(pool.dump().all(|record| !record.in_use()));

    let acquired = pool.destroy();
    println!("destroyed pool with {acquired} blocks still acquired");
    println!("available without a pool = {}", BlockPool::available_in(None));

    Ok(())
}
