//! A fixed-size-object memory pool with an intrusive free list.
//!
//! This crate provides [`SlotPool`], an allocator for programs that create and
//! destroy many same-sized objects in quick succession. Instead of paying the
//! system allocator once per object, the pool requests memory in large blocks
//! and carves each block into element-sized slots; acquiring and releasing a
//! slot is a handful of pointer operations.
//!
//! # Key properties
//!
//! - **O(1) acquire and release**: released slots are threaded onto a free
//!   list through their own storage bytes, so reuse costs a pointer swap.
//! - **Lazy, chunked growth**: a block is allocated only when the free list
//!   and the current block are both exhausted.
//! - **No partial reclamation**: blocks are returned to the system only when
//!   the pool is dropped. Steady-state workloads settle on a fixed block
//!   count and never touch the system allocator again.
//! - **Alignment guaranteed**: every slot address satisfies the element
//!   type's alignment requirement.
//! - **Zero validation overhead**: release contracts are documented `unsafe`
//!   requirements, not runtime checks (debug builds carry an integrity check
//!   for tests).
//!
//! # Raw storage vs. objects
//!
//! [`SlotPool::acquire()`] returns uninitialized storage; whether and when a
//! value lives there is the caller's business. The [`SlotAlloc`] trait packages
//! the conventional division of labor - allocate, construct, destroy,
//! deallocate - so containers can be written against an allocation strategy
//! and instantiated with either a pool or the plain system allocator
//! ([`SystemAlloc`]).
//!
//! # Examples
//!
//! ```
//! use slot_pool::SlotPool;
//!
//! let mut pool = SlotPool::<u64>::new();
//!
//! // Acquire storage for two values.
//! let first = pool.acquire();
//! let second = pool.acquire();
//!
//! // SAFETY: Both slots were just acquired and hold nothing yet.
//! unsafe {
//!     first.write(1);
//!     second.write(2);
//! }
//!
//! // SAFETY: Plain data needs no drop; each address came from `acquire()`
//! // on this pool and is released exactly once.
//! unsafe {
//!     pool.release(first);
//!     pool.release(second);
//! }
//!
//! // Released slots are recycled instead of growing the pool.
//! let recycled = pool.acquire();
//! assert_eq!(recycled, second);
//! # // SAFETY: Acquired above, released once, nothing live inside.
//! # unsafe { pool.release(recycled) };
//! ```
//!
//! # Thread use
//!
//! A pool is exclusively owned and single-threaded. It may move between
//! threads when the element type is `Send`; sharing one requires an external
//! mutex around the whole pool.

mod alloc;
mod block;
mod builder;
mod drop_policy;
mod pool;

pub use alloc::{SlotAlloc, SystemAlloc};
pub use builder::SlotPoolBuilder;
pub use drop_policy::DropPolicy;
pub use pool::{DEFAULT_BLOCK_SIZE, SlotPool};
