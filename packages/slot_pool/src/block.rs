use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::fmt;
use std::mem::ManuallyDrop;
use std::num::NonZero;
use std::ptr::NonNull;

/// A storage cell for exactly one element, repurposed as pool bookkeeping while
/// no element lives in it.
///
/// The same bytes act as element storage while the slot is held by a caller and
/// as a free-list link while the slot waits for reuse. No tag records which of
/// the two interpretations is current - the pool derives that from where the
/// slot is reachable from, and must never read one interpretation while the
/// other is in effect.
#[repr(C)]
pub(crate) union Slot<T> {
    /// Storage for the element while the slot is held by a caller.
    ///
    /// The pool never reads or drops through this field; it exists to give the
    /// slot the element's size and alignment. Elements are accessed through the
    /// raw slot address handed to the caller.
    #[allow(
        dead_code,
        reason = "the field contributes layout, not access paths - elements live behind the raw slot address"
    )]
    element: ManuallyDrop<T>,

    /// Link to the next free slot while this slot is on the free list.
    pub(crate) next_free: Option<NonNull<Slot<T>>>,
}

impl<T> Slot<T> {
    /// Creates the free-list interpretation of a slot, linking to `next_free`.
    pub(crate) fn free_link(next_free: Option<NonNull<Self>>) -> Self {
        Self { next_free }
    }
}

/// One contiguous run of slots carved out of a single system allocation.
///
/// A block hands back no memory piecemeal: its allocation is returned to the
/// system only when the block itself is dropped, which the owning pool does for
/// every block it ever allocated when the pool is dropped.
pub(crate) struct Block<T> {
    first_slot_ptr: NonNull<Slot<T>>,

    /// Number of slots in this block. Every block of a given pool has the same
    /// capacity.
    capacity: NonZero<usize>,

    /// The layout the allocation was made with; `dealloc` must receive the same
    /// one.
    layout: Layout,
}

impl<T> Block<T> {
    /// Allocates a new block with room for `capacity` slots.
    ///
    /// The slot memory is deliberately left uninitialized. A slot's bytes first
    /// become meaningful when the pool hands the slot to a caller or threads it
    /// onto the free list.
    ///
    /// # Panics
    ///
    /// Panics if the system allocator cannot satisfy the request.
    #[must_use]
    pub(crate) fn new(capacity: NonZero<usize>) -> Self {
        let layout = Layout::array::<Slot<T>>(capacity.get())
            .expect("simple flat array layout must be calculable");

        // SAFETY: The layout is valid and never zero-sized because a slot is at
        // least pointer-sized and the capacity is non-zero.
        let first_slot_ptr = NonNull::new(unsafe { alloc(layout) })
            .expect(
                "we do not intend to handle allocation failure as a real possibility - OOM is panic",
            )
            .cast::<Slot<T>>();

        Self {
            first_slot_ptr,
            capacity,
            layout,
        }
    }

    /// Pointer to the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    #[must_use]
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<Slot<T>> {
        assert!(
            index < self.capacity.get(),
            "slot {index} index out of bounds in block of {}",
            type_name::<T>()
        );

        // SAFETY: Guarded by the bounds check above - the allocation covers
        // `capacity` consecutive slots.
        unsafe { self.first_slot_ptr.add(index) }
    }

    /// Whether `slot` is the address of one of this block's slots.
    #[cfg(debug_assertions)]
    pub(crate) fn contains(&self, slot: NonNull<Slot<T>>) -> bool {
        let first = self.first_slot_ptr.addr().get();
        let candidate = slot.addr().get();

        let Some(offset) = candidate.checked_sub(first) else {
            return false;
        };

        // A slot address must fall inside the allocation and on a slot boundary.
        offset < self.layout.size() && offset % size_of::<Slot<T>>() == 0
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        // Slots never hold anything the block itself must drop: live elements are
        // the callers' responsibility and free-list links are plain pointers.
        //
        // SAFETY: The layout must match between alloc and dealloc. It does.
        unsafe {
            dealloc(self.first_slot_ptr.as_ptr().cast::<u8>(), self.layout);
        }
    }
}

impl<T> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("item_type", &format_args!("{}", type_name::<T>()))
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

// SAFETY: The block owns a raw allocation and never shares its pointers on its
// own; as long as T itself can move between threads, so can the block.
unsafe impl<T: Send> Send for Block<T> {}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use new_zealand::nz;

    use super::*;

    #[test]
    fn slot_addresses_are_distinct_and_in_order() {
        let block = Block::<u64>::new(nz!(4));

        let first = block.slot_ptr(0);
        let second = block.slot_ptr(1);
        let last = block.slot_ptr(3);

        assert_ne!(first, second);
        assert_eq!(
            second.addr().get() - first.addr().get(),
            size_of::<Slot<u64>>()
        );
        assert_eq!(
            last.addr().get() - first.addr().get(),
            3 * size_of::<Slot<u64>>()
        );
    }

    #[test]
    #[should_panic]
    fn slot_ptr_out_of_bounds_panics() {
        let block = Block::<u64>::new(nz!(4));

        _ = block.slot_ptr(4);
    }

    #[test]
    fn slots_are_element_aligned() {
        #[repr(align(16))]
        struct Aligned {
            _data: [u8; 16],
        }

        let block = Block::<Aligned>::new(nz!(3));

        for index in 0..3 {
            assert_eq!(block.slot_ptr(index).addr().get() % 16, 0);
        }
    }

    #[test]
    fn slot_is_at_least_pointer_sized() {
        // A slot must be able to hold a free-list link even when the element
        // is smaller than a pointer.
        assert!(size_of::<Slot<u8>>() >= size_of::<usize>());
        assert_eq!(align_of::<Slot<u8>>(), align_of::<usize>());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn contains_accepts_own_slots_only() {
        let block = Block::<u64>::new(nz!(4));
        let other = Block::<u64>::new(nz!(4));

        for index in 0..4 {
            assert!(block.contains(block.slot_ptr(index)));
            assert!(!block.contains(other.slot_ptr(index)));
        }

        // An address inside the block but off the slot grid is not a slot.
        let misaligned = unsafe { block.slot_ptr(0).byte_add(1) };
        assert!(!block.contains(misaligned));
    }
}
