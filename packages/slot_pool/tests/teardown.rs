//! Verifies that a pool returns every block to the system when it is dropped,
//! regardless of how its slots are split between free and held at that moment.
//!
//! The check uses an instrumented global allocator that keeps a net count of
//! outstanding allocations, so a leaked block shows up as a nonzero balance.

#![allow(
    clippy::undocumented_unsafe_blocks,
    reason = "test code doesn't need the same safety rigor as production code"
)]

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicIsize, Ordering};

use new_zealand::nz;
use slot_pool::SlotPool;

/// Forwards to the system allocator while maintaining a net count of
/// allocations that have not yet been returned.
struct CountingAllocator;

static OUTSTANDING: AtomicIsize = AtomicIsize::new(0);

// SAFETY: Every call delegates to the system allocator unchanged; the counter
// is bookkeeping on the side.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        OUTSTANDING.fetch_add(1, Ordering::SeqCst);

        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        OUTSTANDING.fetch_sub(1, Ordering::SeqCst);

        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

#[test]
fn drop_returns_every_block() {
    let baseline = OUTSTANDING.load(Ordering::SeqCst);

    {
        // Small 4-slot blocks so the pool spans several of them quickly.
        let mut pool = SlotPool::<u64>::builder()
            .block_size(nz!(4 * size_of::<u64>()))
            .build();

        let mut held = Vec::new();
        for value in 0..12_u64 {
            let storage = pool.acquire();
            unsafe { storage.write(value) };
            held.push(storage);
        }
        assert_eq!(pool.block_count(), 3);

        // Leave a mix behind: some slots go back to the free list, some stay
        // held with live values in them.
        for storage in held.drain(..).step_by(2) {
            unsafe { pool.release(storage) };
        }
        assert_eq!(pool.len(), 6);

        assert!(
            OUTSTANDING.load(Ordering::SeqCst) > baseline,
            "the pool must be holding system allocations at this point"
        );

        // Dropping the pool frees all three blocks, free and held slots alike.
    }

    assert_eq!(
        OUTSTANDING.load(Ordering::SeqCst),
        baseline,
        "every allocation made on behalf of the pool must have been returned"
    );
}
