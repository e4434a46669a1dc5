use std::alloc::{Layout, alloc, dealloc};
use std::ptr::NonNull;

use crate::SlotPool;

/// The capability a generic container needs to keep each of its objects in
/// allocator-managed storage: allocate and release storage one object at a
/// time, and construct or destroy an object in place.
///
/// Storage lifetime and object lifetime are deliberately separate. The
/// allocator owns raw storage from [`allocate()`][Self::allocate] until
/// [`deallocate()`][Self::deallocate]; the container owns the object placed in
/// it from [`construct()`][Self::construct] until [`destroy()`][Self::destroy]
/// (or until it moves the value out itself). Containers that allocate an
/// internal node shape rather than their element type simply instantiate the
/// allocator for that node type.
///
/// # Examples
///
/// A function generic over the allocation strategy:
///
/// ```
/// use slot_pool::{SlotAlloc, SlotPool, SystemAlloc};
///
/// fn round_trip<A: SlotAlloc<String>>(alloc: &mut A) -> String {
///     let storage = alloc.allocate();
///
///     // SAFETY: Freshly allocated storage holds no value yet.
///     unsafe { alloc.construct(storage, "hello".to_string()) };
///
///     // SAFETY: The storage holds the value constructed above; nothing else
///     // reads it after this.
///     let value = unsafe { storage.read() };
///
///     // SAFETY: The value was moved out above, so only empty storage goes
///     // back, exactly once, to the allocator it came from.
///     unsafe { alloc.deallocate(storage) };
///
///     value
/// }
///
/// assert_eq!(round_trip(&mut SystemAlloc::new()), "hello");
/// assert_eq!(round_trip(&mut SlotPool::new()), "hello");
/// ```
pub trait SlotAlloc<T> {
    /// Allocates uninitialized, correctly aligned storage for exactly one `T`.
    ///
    /// # Panics
    ///
    /// Panics if the underlying allocation fails. Allocation failure is fatal,
    /// not retried.
    #[must_use]
    fn allocate(&mut self) -> NonNull<T>;

    /// Returns storage previously obtained from
    /// [`allocate()`][Self::allocate].
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `storage` came from `allocate()` on this
    /// same allocator, has not already been deallocated, and holds no live
    /// value.
    unsafe fn deallocate(&mut self, storage: NonNull<T>);

    /// Moves `value` into `storage`.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `storage` is valid for writes of `T` and
    /// does not already hold a live value (which would otherwise be
    /// overwritten without being dropped).
    unsafe fn construct(&mut self, storage: NonNull<T>, value: T) {
        // SAFETY: The caller guarantees the storage is writable and vacant.
        unsafe { storage.write(value) };
    }

    /// Drops the value in `storage` in place, leaving the storage allocated.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `storage` holds a live value and that
    /// nothing uses the value after this call.
    unsafe fn destroy(&mut self, storage: NonNull<T>) {
        // SAFETY: The caller guarantees a live value that nothing uses
        // afterwards.
        unsafe { storage.drop_in_place() };
    }
}

impl<T> SlotAlloc<T> for SlotPool<T> {
    fn allocate(&mut self) -> NonNull<T> {
        self.acquire()
    }

    unsafe fn deallocate(&mut self, storage: NonNull<T>) {
        // SAFETY: The deallocate contract is the release contract, forwarded.
        unsafe { self.release(storage) };
    }
}

/// A pass-through [`SlotAlloc`] that asks the system allocator for every
/// object individually.
///
/// This is the baseline a [`SlotPool`] is meant to beat: correct and simple,
/// but paying one system allocation and deallocation per object. It is mainly
/// useful for comparison benchmarks and for containers that want to defer the
/// pooling decision to their callers.
///
/// # Examples
///
/// ```
/// use slot_pool::{SlotAlloc, SystemAlloc};
///
/// let mut alloc = SystemAlloc::new();
///
/// let storage = alloc.allocate();
///
/// // SAFETY: Freshly allocated storage holds no value yet.
/// unsafe { alloc.construct(storage, 42_u64) };
///
/// // SAFETY: The storage holds the value constructed above.
/// unsafe { alloc.destroy(storage) };
///
/// // SAFETY: The value was destroyed; the storage goes back exactly once.
/// unsafe { alloc.deallocate(storage) };
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct SystemAlloc;

impl SystemAlloc {
    /// Creates a new [`SystemAlloc`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T> SlotAlloc<T> for SystemAlloc {
    fn allocate(&mut self) -> NonNull<T> {
        let layout = Layout::new::<T>();
        assert!(
            layout.size() > 0,
            "SystemAlloc cannot allocate zero-sized types"
        );

        // SAFETY: The layout is not zero-sized, guarded by the assertion above.
        let ptr = unsafe { alloc(layout) };

        NonNull::new(ptr.cast::<T>()).expect(
            "we do not intend to handle allocation failure as a real possibility - OOM is panic",
        )
    }

    unsafe fn deallocate(&mut self, storage: NonNull<T>) {
        // SAFETY: The caller guarantees the storage came from `allocate()`,
        // which used this exact layout.
        unsafe { dealloc(storage.as_ptr().cast::<u8>(), Layout::new::<T>()) };
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "test code doesn't need the same safety rigor as production code"
)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    /// Test helper that records when it is dropped.
    struct DropTracker {
        dropped: Rc<Cell<bool>>,
    }

    impl Drop for DropTracker {
        fn drop(&mut self) {
            self.dropped.set(true);
        }
    }

    fn construct_destroy_once<A: SlotAlloc<DropTracker>>(alloc: &mut A) {
        let dropped = Rc::new(Cell::new(false));

        let storage = alloc.allocate();
        unsafe {
            alloc.construct(
                storage,
                DropTracker {
                    dropped: Rc::clone(&dropped),
                },
            );
        }
        assert!(!dropped.get());

        unsafe {
            alloc.destroy(storage);
        }
        assert!(dropped.get());

        unsafe {
            alloc.deallocate(storage);
        }
    }

    #[test]
    fn system_alloc_constructs_and_destroys_in_place() {
        construct_destroy_once(&mut SystemAlloc::new());
    }

    #[test]
    fn pool_constructs_and_destroys_in_place() {
        construct_destroy_once(&mut SlotPool::new());
    }

    #[test]
    fn system_alloc_addresses_are_element_aligned() {
        #[repr(align(32))]
        struct Aligned {
            _data: [u8; 32],
        }

        let mut alloc = SystemAlloc::new();

        let storage: NonNull<Aligned> = alloc.allocate();
        assert_eq!(storage.addr().get() % align_of::<Aligned>(), 0);

        unsafe { alloc.deallocate(storage) };
    }

    #[test]
    fn pool_forwards_to_acquire_and_release() {
        let mut pool = SlotPool::<u32>::new();

        let storage = SlotAlloc::allocate(&mut pool);
        assert_eq!(pool.len(), 1);

        unsafe { SlotAlloc::deallocate(&mut pool, storage) };
        assert_eq!(pool.len(), 0);
    }
}
