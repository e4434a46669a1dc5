//! Basic usage of the `slot_pool` crate:
//!
//! * Creating a pool.
//! * Acquiring storage and placing values in it.
//! * Releasing storage for reuse.
//! * Watching the pool recycle slots instead of growing.

use slot_pool::SlotPool;

fn main() {
    let mut pool = SlotPool::<u64>::new();

    // The pool allocates nothing until it is first used.
    println!(
        "Fresh pool: {} blocks, capacity for {} values",
        pool.block_count(),
        pool.capacity()
    );

    // Acquire storage for a handful of values. The first acquisition makes the
    // pool request one large block from the system; the rest are carved from
    // that same block.
    let mut held = Vec::new();
    for value in 0..10_u64 {
        let storage = pool.acquire();

        // SAFETY: Freshly acquired storage is ours alone and holds no value
        // yet.
        unsafe { storage.write(value * value) };

        held.push(storage);
    }

    println!(
        "After 10 acquisitions: {} block(s), capacity for {} values, {} held",
        pool.block_count(),
        pool.capacity(),
        pool.len()
    );

    // Read one back through the raw storage.
    let last = *held.last().expect("ten values were just acquired");
    // SAFETY: The slot was written above and has not been released.
    let value = unsafe { last.read() };
    println!("The last value stored is {value}");

    // Return everything. The pool keeps the block and threads the slots onto
    // its free list.
    for storage in held.drain(..) {
        // SAFETY: Plain data needs no drop; every address came from
        // `acquire()` on this pool and is released exactly once.
        unsafe { pool.release(storage) };
    }

    // Another burst of acquisitions is served entirely from recycled slots -
    // the block count does not move.
    for _ in 0..10 {
        held.push(pool.acquire());
    }

    println!(
        "After recycling 10 more: still {} block(s), {} held",
        pool.block_count(),
        pool.len()
    );

    for storage in held.drain(..) {
        // SAFETY: As above.
        unsafe { pool.release(storage) };
    }
}
