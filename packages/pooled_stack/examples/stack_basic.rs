//! Basic usage of the `pooled_stack` crate:
//!
//! * Pushing and popping values.
//! * Observing how the backing pool recycles nodes across push/pop cycles.

use pooled_stack::PooledStack;

fn main() {
    let mut stack = PooledStack::new();

    for value in 0..1000 {
        stack.push(value);
    }

    println!(
        "Pushed {} values; the pool allocated {} block(s) for their nodes",
        stack.len(),
        stack.allocator().block_count()
    );

    // Values come back in reverse push order.
    assert_eq!(stack.pop(), Some(999));
    assert_eq!(stack.pop(), Some(998));

    while stack.pop().is_some() {}
    println!(
        "Popped everything back; the stack is empty: {}",
        stack.is_empty()
    );

    // A second cycle of the same depth is served entirely from recycled
    // nodes: the block count stays put.
    for value in 0..1000 {
        stack.push(value);
    }

    println!(
        "Pushed {} values again; the pool still has {} block(s)",
        stack.len(),
        stack.allocator().block_count()
    );
}
