use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use crate::block::Slot;
use crate::pool::DEFAULT_BLOCK_SIZE;
use crate::{DropPolicy, SlotPool};

/// Builder for creating an instance of [`SlotPool`].
///
/// You only need to use this builder if you want to customize the pool
/// configuration. The default configuration used by [`SlotPool::new()`][1] is
/// sufficient for most use cases.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
///
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<u32>::builder()
///     .block_size(NonZero::new(8192).unwrap())
///     .drop_policy(DropPolicy::MayLeakItems)
///     .build();
/// # drop(pool);
/// ```
///
/// [1]: SlotPool::new
#[must_use]
pub struct SlotPoolBuilder<T> {
    block_size: NonZero<usize>,
    drop_policy: DropPolicy,

    _item: PhantomData<T>,
}

impl<T> SlotPoolBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            drop_policy: DropPolicy::default(),
            _item: PhantomData,
        }
    }

    /// Sets the size of the blocks the pool requests from the system
    /// allocator, in bytes.
    ///
    /// Larger blocks mean fewer system allocations for the same number of
    /// slots; the price is a coarser granularity of memory the pool holds on
    /// to. A block must be able to hold at least two slots, which
    /// [`build()`][Self::build] enforces.
    pub fn block_size(mut self, block_size: NonZero<usize>) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to
    /// treat slots still held by callers when the pool is dropped.
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool with the specified configuration.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or if the configured block size cannot hold
    /// at least two slots. A slot is as large as the bigger of `T` and a
    /// pointer, so minimum viable block sizes are small; the check exists to
    /// reject configurations where block chaining could never pay off.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::builder().build();
    /// # drop(pool);
    /// ```
    #[must_use]
    pub fn build(self) -> SlotPool<T> {
        assert!(size_of::<T>() > 0, "SlotPool must have non-zero item size");

        let slot_size = size_of::<Slot<T>>();
        assert!(
            self.block_size.get()
                >= slot_size
                    .checked_mul(2)
                    .expect("slot sizes are nowhere near usize::MAX / 2"),
            "block size {} of a SlotPool of {} is too small to hold two slots of {slot_size} bytes",
            self.block_size,
            type_name::<T>()
        );

        SlotPool::new_inner(self.block_size, self.drop_policy)
    }
}

impl<T> fmt::Debug for SlotPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("block_size", &self.block_size)
            .field("drop_policy", &self.drop_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn defaults_match_new() {
        let pool = SlotPoolBuilder::<u64>::new().build();

        assert_eq!(pool.block_size(), DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn accepts_smallest_viable_block_size() {
        let block_size = nz!(2 * size_of::<Slot<u64>>());

        let pool = SlotPool::<u64>::builder().block_size(block_size).build();

        assert_eq!(pool.block_size(), block_size);
    }

    #[test]
    #[should_panic]
    fn rejects_block_size_below_two_slots() {
        let block_size = nz!(2 * size_of::<Slot<u64>>() - 1);

        _ = SlotPool::<u64>::builder().block_size(block_size).build();
    }

    #[test]
    #[should_panic]
    fn rejects_zero_sized_item_type() {
        _ = SlotPool::<()>::builder().build();
    }
}
