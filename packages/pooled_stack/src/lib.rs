//! A singly linked LIFO stack whose nodes come from a memory pool.
//!
//! This crate provides [`PooledStack`], a stack that allocates one node per
//! value through the [`SlotAlloc`][slot_pool::SlotAlloc] interface from the
//! `slot_pool` crate. With the default [`SlotPool`][slot_pool::SlotPool]
//! allocator, popped nodes are recycled for later pushes, so sustained
//! push/pop traffic stops touching the system allocator entirely once the
//! pool has grown to the workload's high-water mark.
//!
//! The stack also serves as the reference workload for measuring the pool:
//! instantiate it with [`SystemAlloc`][slot_pool::SystemAlloc] to get the
//! identical data structure paying one system allocation per node, and
//! compare.
//!
//! # Examples
//!
//! ```
//! use pooled_stack::PooledStack;
//!
//! let mut stack = PooledStack::new();
//!
//! for value in 0..100 {
//!     stack.push(value);
//! }
//!
//! // Values come back in reverse push order.
//! for expected in (0..100).rev() {
//!     assert_eq!(stack.pop(), Some(expected));
//! }
//!
//! // The nodes of all 100 values now sit in the pool's free list, ready for
//! // the next burst of pushes.
//! assert!(stack.is_empty());
//! ```

mod stack;

pub use stack::{Node, PooledStack};
