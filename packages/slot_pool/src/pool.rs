use std::any::type_name;
use std::fmt;
use std::num::NonZero;
use std::ptr::NonNull;
use std::thread;

use new_zealand::nz;

use crate::block::{Block, Slot};
use crate::{DropPolicy, SlotPoolBuilder};

/// The block size used by [`SlotPool::new()`], in bytes.
pub const DEFAULT_BLOCK_SIZE: NonZero<usize> = nz!(4096);

/// A memory pool that serves fixed-size, correctly aligned storage for one
/// element of `T` at a time, recycling released slots through an intrusive
/// free list.
///
/// The pool asks the system allocator for memory one large block at a time and
/// carves each block into slots. Acquiring a slot is O(1) on every path:
/// popping the free list, bumping a cursor through the not-yet-used part of the
/// newest block, or (rarely) chaining on a fresh block. Releasing a slot is a
/// two-pointer write. Blocks are returned to the system only when the pool
/// itself is dropped, never earlier.
///
/// # Storage, not objects
///
/// The pool deals in raw storage. [`acquire()`][Self::acquire] returns
/// uninitialized memory and the pool never learns whether a value was placed
/// in it; pairing value construction and destruction with the storage is the
/// caller's job, typically through the [`SlotAlloc`][crate::SlotAlloc] trait.
/// Consequently, values still alive in held slots when the pool is dropped are
/// abandoned rather than dropped (see [`DropPolicy`]).
///
/// # Contract, not checks
///
/// To keep the hot paths free of bookkeeping, the pool performs no runtime
/// validation of release calls: releasing an address twice, or an address that
/// did not come from this pool, corrupts the free list. These contracts are
/// expressed as `unsafe` and documented on [`release()`][Self::release];
/// debug builds additionally carry a free-list integrity check used by tests.
///
/// # Thread use
///
/// The pool is a single-owner, single-threaded structure. It can move between
/// threads when `T: Send`, but concurrent use requires external
/// synchronization wrapping the whole pool.
///
/// # Examples
///
/// ```
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<u64>::new();
///
/// let storage = pool.acquire();
///
/// // The pool hands out raw storage; placing and removing values is on us.
/// // SAFETY: `storage` was just acquired, so it is valid for writes of u64
/// // and holds nothing yet.
/// unsafe { storage.write(42) };
///
/// // SAFETY: The value is plain data, so it needs no drop before the storage
/// // goes back; the address came from `acquire()` on this pool and is
/// // released exactly once.
/// unsafe { pool.release(storage) };
///
/// assert!(pool.is_empty());
/// ```
pub struct SlotPool<T> {
    /// Configured size of each block, in bytes.
    block_size: NonZero<usize>,

    /// Number of slots carved out of each block. Trailing block bytes that do
    /// not fit a whole slot go unused.
    slots_per_block: NonZero<usize>,

    /// Every block ever allocated, in allocation order. Only the newest block
    /// may still contain virgin slots; older blocks were fully used up before
    /// the next one was allocated.
    blocks: Vec<Block<T>>,

    /// Head of the free list threaded through released slots.
    free_head: Option<NonNull<Slot<T>>>,

    /// Index of the next virgin slot in the newest block. Equal to
    /// `slots_per_block` when the newest block is exhausted - and when there is
    /// no block at all - which is the state that makes `acquire()` chain on a
    /// new block.
    next_virgin_index: usize,

    /// Number of slots currently held by callers.
    len: usize,

    drop_policy: DropPolicy,
}

impl<T> SlotPool<T> {
    /// # Panics
    ///
    /// Panics if a block of `block_size` bytes cannot hold at least two slots.
    #[must_use]
    pub(crate) fn new_inner(block_size: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        #[expect(
            clippy::integer_division,
            reason = "the remainder is deliberately discarded - a partial slot at the end of a block is unusable"
        )]
        let slots_per_block = NonZero::new(block_size.get() / size_of::<Slot<T>>())
            .expect("guarded by the builder assertion that a block holds at least two slots");

        Self {
            block_size,
            slots_per_block,
            blocks: Vec::new(),
            free_head: None,
            // The exhausted-cursor state, so the first acquire allocates a block.
            next_virgin_index: slots_per_block.get(),
            len: 0,
            drop_policy,
        }
    }

    /// Creates a new [`SlotPool`] with the default configuration: blocks of
    /// [`DEFAULT_BLOCK_SIZE`] bytes and the default [`DropPolicy`].
    ///
    /// No memory is allocated until the first slot is acquired.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<String>::new();
    ///
    /// assert_eq!(pool.len(), 0);
    /// assert_eq!(pool.block_count(), 0);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a new [`SlotPool`].
    ///
    /// Use this when you want to customize the block size or drop policy beyond
    /// the defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::num::NonZero;
    ///
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder()
    ///     .block_size(NonZero::new(1024).unwrap())
    ///     .build();
    ///
    /// assert_eq!(pool.block_size().get(), 1024);
    /// ```
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    /// The number of slots currently held by callers.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new();
    /// assert_eq!(pool.len(), 0);
    ///
    /// let storage = pool.acquire();
    /// assert_eq!(pool.len(), 1);
    ///
    /// // SAFETY: Acquired above, released once, nothing live inside.
    /// unsafe { pool.release(storage) };
    /// assert_eq!(pool.len(), 0);
    /// ```
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no slot is currently held by a caller.
    ///
    /// An empty pool may still be holding blocks of unused capacity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of slots the pool can hand out without another system
    /// allocation, including the slots currently held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.blocks.len()
            .checked_mul(self.slots_per_block.get())
            .expect("overflow here would mean the pool holds more slots than virtual memory can fit, which makes no sense - it would never grow that big")
    }

    /// The number of blocks requested from the system allocator so far.
    ///
    /// This only ever grows while the pool is alive; every block is kept until
    /// the pool is dropped. A workload that acquires and releases the same
    /// number of slots over and over settles on a constant block count.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The configured block size, in bytes.
    #[must_use]
    pub fn block_size(&self) -> NonZero<usize> {
        self.block_size
    }

    /// Acquires storage for one `T`, recycling released slots where possible.
    ///
    /// The returned address is correctly aligned for `T` and refers to
    /// uninitialized memory. It stays valid - and is never handed out again -
    /// until it is passed to [`release()`][Self::release] or the pool is
    /// dropped.
    ///
    /// Storage is found in order of preference:
    ///
    /// 1. the most recently released slot (free-list pop),
    /// 2. the next never-used slot of the newest block (cursor bump),
    /// 3. a freshly allocated block, which then serves its first slot.
    ///
    /// # Panics
    ///
    /// Panics if a new block is needed and the system allocator cannot provide
    /// one. Allocation failure is fatal, not retried.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let mut pool = SlotPool::<u32>::new();
    ///
    /// let first = pool.acquire();
    /// let second = pool.acquire();
    /// assert_ne!(first, second);
    ///
    /// // SAFETY: Both were acquired above, each is released once, with
    /// // nothing live inside.
    /// unsafe {
    ///     pool.release(first);
    /// }
    /// # // SAFETY: As above.
    /// # unsafe { pool.release(second) };
    /// ```
    #[must_use]
    pub fn acquire(&mut self) -> NonNull<T> {
        if let Some(slot) = self.free_head {
            // SAFETY: A slot on the free list belongs to this pool and was last
            // written by `release()`, so it is valid to read.
            let slot_ref = unsafe { slot.as_ref() };

            // SAFETY: Slots reachable from `free_head` always carry the
            // free-list interpretation of the slot bytes.
            self.free_head = unsafe { slot_ref.next_free };

            // Cannot overflow: every held slot occupies at least a pointer of
            // real memory.
            self.len = self.len.wrapping_add(1);

            return slot.cast::<T>();
        }

        if self.next_virgin_index == self.slots_per_block.get() {
            // Free list and newest block are both exhausted. Chain on a new
            // block; the cursor restarts at its first slot.
            self.blocks.push(Block::new(self.slots_per_block));
            self.next_virgin_index = 0;
        }

        let slot = self
            .blocks
            .last()
            .expect("a block exists - one was just allocated if the pool had none")
            .slot_ptr(self.next_virgin_index);

        // Cannot overflow: bounded by `slots_per_block`.
        self.next_virgin_index = self.next_virgin_index.wrapping_add(1);

        // Cannot overflow: every held slot occupies at least a pointer of real
        // memory.
        self.len = self.len.wrapping_add(1);

        slot.cast::<T>()
    }

    /// Returns storage previously obtained from [`acquire()`][Self::acquire],
    /// making it the first candidate for the next acquisition.
    ///
    /// The slot's bytes are repurposed as a free-list link, so any value still
    /// in the storage must have been moved out or dropped in place beforehand.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that:
    ///
    /// 1. `storage` was returned by `acquire()` on this same pool.
    /// 2. `storage` has not already been released since that acquisition.
    /// 3. No live value remains in the storage (and no reference to it
    ///    survives this call).
    ///
    /// Violations are not detected at runtime; they corrupt the free list.
    pub unsafe fn release(&mut self, storage: NonNull<T>) {
        let slot = storage.cast::<Slot<T>>();

        // SAFETY: The caller guarantees the storage came from `acquire()` on
        // this pool, so it addresses a whole slot the pool may now repurpose.
        unsafe {
            slot.write(Slot::free_link(self.free_head));
        }

        self.free_head = Some(slot);

        debug_assert!(
            self.len > 0,
            "release() without a matching acquire() on this pool of {}",
            type_name::<T>()
        );

        // Cannot underflow when the release contract is honored: every release
        // matches an earlier acquire.
        self.len = self.len.wrapping_sub(1);
    }

    /// Verifies the free list against the pool's counters.
    ///
    /// Walks every free-list node, checking that it lies on a slot boundary of
    /// one of the pool's blocks and that the list length agrees with the number
    /// of slots handed out and returned so far. Only exists in debug builds and
    /// is exercised by tests; the default build carries no validation.
    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let used_slots = if self.blocks.is_empty() {
            0
        } else {
            let full_blocks = self
                .blocks
                .len()
                .checked_sub(1)
                .expect("the vector was just checked to be non-empty");

            full_blocks
                .checked_mul(self.slots_per_block.get())
                .and_then(|slots| slots.checked_add(self.next_virgin_index))
                .expect("slot counts are bounded by allocated memory")
        };

        let mut free_len = 0_usize;
        let mut cursor = self.free_head;

        while let Some(slot) = cursor {
            free_len = free_len
                .checked_add(1)
                .expect("the free list cannot have more nodes than allocated slots");

            assert!(
                free_len <= used_slots,
                "free list of pool of {} has more nodes than slots ever handed out - it must contain a cycle or foreign addresses",
                type_name::<T>()
            );

            assert!(
                self.blocks.iter().any(|block| block.contains(slot)),
                "free list of pool of {} contains an address outside every block",
                type_name::<T>()
            );

            // SAFETY: Membership was just verified, so the slot belongs to this
            // pool and carries the free-list interpretation.
            let slot_ref = unsafe { slot.as_ref() };

            // SAFETY: As above - free-list nodes always hold a valid link.
            cursor = unsafe { slot_ref.next_free };
        }

        assert!(
            free_len
                .checked_add(self.len)
                .expect("slot counts are bounded by allocated memory")
                == used_slots,
            "pool of {} has {} free and {} held slots but has handed out {} in total",
            type_name::<T>(),
            free_len,
            self.len,
            used_slots
        );
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        // Every block ever allocated is still in `blocks`, so dropping the
        // vector returns all pool memory to the system. Values still alive in
        // held slots are not dropped - the pool has no record of which slots
        // hold one.
        //
        // If we are already panicking, we do not want to panic again because
        // that will simply obscure whatever the original panic was, leading to
        // debug difficulties.
        if self.drop_policy == DropPolicy::MustNotLeakItems && !thread::panicking() {
            assert!(
                self.len == 0,
                "dropped a SlotPool of {} with {} slots still held - forbidden by DropPolicy::MustNotLeakItems",
                type_name::<T>(),
                self.len
            );
        }
    }
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("block_size", &self.block_size)
            .field("block_count", &self.blocks.len())
            .field("len", &self.len)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

// SAFETY: Yes, there are raw pointers involved here but nothing inherently
// non-thread-mobile about it, so as long as T itself can move between threads,
// the pool can do so, too.
unsafe impl<T: Send> Send for SlotPool<T> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::collections::HashSet;

    use new_zealand::nz;

    use super::*;

    #[test]
    fn smoke_test() {
        let mut pool = SlotPool::<u32>::new();

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        unsafe {
            a.write(42);
            b.write(43);
            c.write(44);
        }

        assert_eq!(pool.len(), 3);

        unsafe {
            assert_eq!(a.read(), 42);
            assert_eq!(b.read(), 43);
            assert_eq!(c.read(), 44);
        }

        unsafe { pool.release(b) };
        assert_eq!(pool.len(), 2);

        // The most recently released slot is reused first.
        let d = pool.acquire();
        assert_eq!(d, b);

        unsafe {
            pool.release(a);
            pool.release(c);
            pool.release(d);
        }

        assert!(pool.is_empty());
    }

    #[test]
    fn addresses_are_distinct_until_released() {
        let mut pool = SlotPool::<u64>::builder().block_size(nz!(256)).build();

        let mut seen = HashSet::new();
        let mut held = Vec::new();

        // Spans several blocks, so both the cursor and new-block paths run.
        for _ in 0..100 {
            let storage = pool.acquire();
            assert!(
                seen.insert(storage.addr()),
                "acquire() returned an address that is already held"
            );
            held.push(storage);
        }

        for storage in held {
            unsafe { pool.release(storage) };
        }
    }

    #[test]
    fn addresses_satisfy_element_alignment() {
        #[repr(align(16))]
        struct Aligned {
            _data: [u8; 16],
        }

        let mut pool = SlotPool::<Aligned>::new();

        let mut held = Vec::new();
        for _ in 0..50 {
            let storage = pool.acquire();
            assert_eq!(storage.addr().get() % align_of::<Aligned>(), 0);
            held.push(storage);
        }

        for storage in held {
            unsafe { pool.release(storage) };
        }
    }

    #[test]
    fn released_slot_is_immediately_reusable() {
        let mut pool = SlotPool::<String>::new();

        let storage = pool.acquire();
        unsafe { storage.write("first".to_string()) };
        unsafe { storage.drop_in_place() };
        unsafe { pool.release(storage) };

        let storage = pool.acquire();
        unsafe { storage.write("second".to_string()) };
        unsafe {
            assert_eq!(*storage.as_ref(), "second");
        }

        unsafe { storage.drop_in_place() };
        unsafe { pool.release(storage) };
    }

    #[test]
    fn blocks_are_chained_when_virgin_space_runs_out() {
        // Exactly 4 slots per block: a u64 slot is as large as the u64 itself.
        let mut pool = SlotPool::<u64>::builder()
            .block_size(nz!(4 * size_of::<u64>()))
            .build();

        assert_eq!(pool.block_count(), 0);

        let mut held = Vec::new();
        for _ in 0..4 {
            held.push(pool.acquire());
        }
        assert_eq!(pool.block_count(), 1);

        held.push(pool.acquire());
        assert_eq!(pool.block_count(), 2);

        for storage in held {
            unsafe { pool.release(storage) };
        }
    }

    #[test]
    fn repeated_cycles_do_not_allocate_new_blocks() {
        let mut pool = SlotPool::<u64>::builder().block_size(nz!(256)).build();

        // One pass establishes the high-water mark in blocks.
        let mut held = Vec::new();
        for _ in 0..100 {
            held.push(pool.acquire());
        }
        let blocks_after_first_pass = pool.block_count();
        for storage in held.drain(..) {
            unsafe { pool.release(storage) };
        }

        // Every later pass of the same size is served from the free list.
        for _ in 0..20 {
            for _ in 0..100 {
                held.push(pool.acquire());
            }
            for storage in held.drain(..) {
                unsafe { pool.release(storage) };
            }
        }

        assert_eq!(pool.block_count(), blocks_after_first_pass);
    }

    #[test]
    fn free_list_reuses_in_lifo_order() {
        let mut pool = SlotPool::<u32>::new();

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        unsafe {
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }

        assert_eq!(pool.acquire(), c);
        assert_eq!(pool.acquire(), b);
        assert_eq!(pool.acquire(), a);

        unsafe {
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    fn integrity_check_passes_after_mixed_operations() {
        let mut pool = SlotPool::<u64>::builder().block_size(nz!(256)).build();

        pool.integrity_check();

        let mut held = Vec::new();
        for _ in 0..64 {
            held.push(pool.acquire());
        }
        pool.integrity_check();

        // Release every other slot.
        for storage in held.iter().copied().step_by(2) {
            unsafe { pool.release(storage) };
        }
        pool.integrity_check();

        // Re-acquire some of them and release everything else.
        for _ in 0..16 {
            held.push(pool.acquire());
        }
        pool.integrity_check();
    }

    #[test]
    fn capacity_counts_whole_blocks() {
        let mut pool = SlotPool::<u64>::builder()
            .block_size(nz!(4 * size_of::<u64>()))
            .build();

        assert_eq!(pool.capacity(), 0);

        let storage = pool.acquire();
        assert_eq!(pool.capacity(), 4);

        unsafe { pool.release(storage) };
    }

    #[test]
    fn default_is_equivalent_to_new() {
        let pool = SlotPool::<u32>::default();

        assert_eq!(pool.block_size(), DEFAULT_BLOCK_SIZE);
        assert!(pool.is_empty());
    }

    #[test]
    fn may_leak_items_policy_permits_dropping_nonempty_pool() {
        let mut pool = SlotPool::<u32>::new();

        let storage = pool.acquire();
        unsafe { storage.write(7) };

        // The pool reclaims its blocks; the u32 is simply abandoned.
        drop(pool);
    }

    #[test]
    #[should_panic]
    fn must_not_leak_items_policy_panics_on_nonempty_drop() {
        let mut pool = SlotPool::<u32>::builder()
            .drop_policy(DropPolicy::MustNotLeakItems)
            .build();

        _ = pool.acquire();
    }

    #[test]
    fn must_not_leak_items_policy_accepts_empty_drop() {
        let mut pool = SlotPool::<u32>::builder()
            .drop_policy(DropPolicy::MustNotLeakItems)
            .build();

        let storage = pool.acquire();
        unsafe { pool.release(storage) };

        drop(pool);
    }

    #[test]
    fn multithreaded_via_move() {
        // NonNull is not Send on its own; the test moves the storage address
        // alongside the pool that owns it.
        struct Held(NonNull<u64>);

        // SAFETY: The storage travels together with its owning pool.
        unsafe impl Send for Held {}

        let mut pool = SlotPool::<u64>::new();

        let storage = pool.acquire();
        unsafe { storage.write(99) };
        let held = Held(storage);

        // The pool and its outstanding storage can move to another thread
        // together.
        let handle = std::thread::spawn(move || {
            // Force the whole `Held` wrapper to be captured (not just its
            // field) so its `Send` impl applies under disjoint closure capture.
            let held = held;
            let mut pool = pool;
            let storage = held.0;
            unsafe {
                assert_eq!(storage.read(), 99);
                pool.release(storage);
            }
            assert!(pool.is_empty());
        });

        handle.join().unwrap();
    }
}
