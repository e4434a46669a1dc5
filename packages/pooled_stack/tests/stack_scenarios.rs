//! End-to-end scenarios driving a pool-backed stack the way an
//! allocation-heavy application would: deep push/pop cycles, repeated until
//! the pool's steady-state behavior is observable.

use new_zealand::nz;
use pooled_stack::PooledStack;
use slot_pool::SlotPool;

#[test]
fn million_value_cycle_pops_in_exact_reverse_order() {
    const DEPTH: usize = 1_000_000;

    let mut stack = PooledStack::new();

    for value in 0..DEPTH {
        stack.push(value);
    }
    assert_eq!(stack.len(), DEPTH);

    for expected in (0..DEPTH).rev() {
        assert_eq!(stack.pop(), Some(expected));
    }

    assert!(stack.is_empty());
    assert_eq!(stack.pop(), None);
}

#[test]
fn repeated_cycles_settle_on_a_fixed_block_count() {
    const DEPTH: usize = 25_000;
    const CYCLES: usize = 100;

    let mut stack = PooledStack::new();

    // The first cycle grows the pool to the workload's high-water mark.
    for value in 0..DEPTH {
        stack.push(value);
    }
    while stack.pop().is_some() {}

    let blocks_after_first_cycle = stack.allocator().block_count();
    assert!(blocks_after_first_cycle > 0);

    // Every further cycle of the same depth must be served entirely from
    // recycled nodes; a growing block count would mean the free list is not
    // being reused.
    for _ in 1..CYCLES {
        for value in 0..DEPTH {
            stack.push(value);
        }
        for expected in (0..DEPTH).rev() {
            assert_eq!(stack.pop(), Some(expected));
        }

        assert_eq!(stack.allocator().block_count(), blocks_after_first_cycle);
    }
}

#[test]
fn small_blocks_chain_rather_than_limit_depth() {
    // A pool with tiny blocks still supports arbitrary stack depth; it just
    // chains more blocks together.
    let pool = SlotPool::builder().block_size(nz!(256)).build();
    let mut stack = PooledStack::with_allocator(pool);

    for value in 0..10_000 {
        stack.push(value);
    }

    assert!(stack.allocator().block_count() > 100);

    for expected in (0..10_000).rev() {
        assert_eq!(stack.pop(), Some(expected));
    }
    assert!(stack.is_empty());
}
