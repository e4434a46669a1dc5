use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;

use slot_pool::{SlotAlloc, SlotPool};

/// One link of a [`PooledStack`]: the element value plus a pointer to the node
/// below it.
///
/// The type is public only so that allocators can be instantiated for it;
/// its contents are an implementation detail of the stack.
pub struct Node<T> {
    value: T,
    prev: Option<NonNull<Node<T>>>,
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("value_type", &format_args!("{}", type_name::<T>()))
            .finish_non_exhaustive()
    }
}

// SAFETY: A node's link is only ever dereferenced by the stack that owns both
// ends of it, so a node moves between threads whenever its value can.
unsafe impl<T: Send> Send for Node<T> {}

/// A singly linked LIFO stack that obtains every node from a [`SlotAlloc`].
///
/// Each push allocates one node and each pop releases one, which makes the
/// stack an allocation-rate torture test: with the default [`SlotPool`]
/// allocator the nodes recycle through the pool's free list, so sustained
/// push/pop traffic settles into a steady state that never touches the system
/// allocator. Instantiating the stack with
/// [`SystemAlloc`][slot_pool::SystemAlloc] instead yields the conventional
/// one-allocation-per-node behavior, which is useful as a benchmark baseline.
///
/// The stack owns the values pushed onto it; the allocator owns the storage
/// the nodes live in. Dropping the stack destroys all remaining values and
/// returns their nodes before the allocator itself is dropped.
///
/// # Examples
///
/// ```
/// use pooled_stack::PooledStack;
///
/// let mut stack = PooledStack::new();
///
/// stack.push("bottom");
/// stack.push("top");
///
/// assert_eq!(stack.len(), 2);
/// assert_eq!(stack.peek(), Some(&"top"));
/// assert_eq!(stack.pop(), Some("top"));
/// assert_eq!(stack.pop(), Some("bottom"));
/// assert_eq!(stack.pop(), None);
/// ```
pub struct PooledStack<T, A = SlotPool<Node<T>>>
where
    A: SlotAlloc<Node<T>>,
{
    alloc: A,

    /// The most recently pushed node, if any.
    head: Option<NonNull<Node<T>>>,

    /// Number of values currently on the stack.
    len: usize,
}

impl<T> PooledStack<T> {
    /// Creates a new stack backed by a [`SlotPool`] with the default
    /// configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use pooled_stack::PooledStack;
    ///
    /// let mut stack = PooledStack::new();
    /// stack.push(1);
    /// assert_eq!(stack.pop(), Some(1));
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_allocator(SlotPool::new())
    }
}

impl<T> Default for PooledStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> PooledStack<T, A>
where
    A: SlotAlloc<Node<T>>,
{
    /// Creates a new stack that obtains its nodes from `alloc`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pooled_stack::PooledStack;
    /// use slot_pool::SystemAlloc;
    ///
    /// // The same stack, minus the pooling.
    /// let mut stack = PooledStack::with_allocator(SystemAlloc::new());
    /// stack.push(1);
    /// assert_eq!(stack.pop(), Some(1));
    /// ```
    #[must_use]
    pub fn with_allocator(alloc: A) -> Self {
        Self {
            alloc,
            head: None,
            len: 0,
        }
    }

    /// The number of values currently on the stack.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Can be mutated to infinitely growing memory use.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the stack holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// A shared reference to the allocator the stack draws its nodes from.
    ///
    /// Useful for inspecting pool statistics such as
    /// [`block_count()`][SlotPool::block_count] while the stack is in use.
    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Pushes a value onto the top of the stack.
    ///
    /// Allocates one node from the stack's allocator; with a pool allocator
    /// this recycles a previously popped node whenever one is available.
    pub fn push(&mut self, value: T) {
        let node = self.alloc.allocate();

        // SAFETY: The node storage was just allocated for exactly one
        // `Node<T>` and holds no value yet.
        unsafe {
            self.alloc.construct(
                node,
                Node {
                    value,
                    prev: self.head,
                },
            );
        }

        self.head = Some(node);

        // Cannot overflow: every value on the stack occupies a node of real
        // memory.
        self.len = self.len.wrapping_add(1);
    }

    /// Removes the top value and returns it, or returns `None` when the stack
    /// is empty.
    ///
    /// The popped node goes back to the allocator immediately.
    pub fn pop(&mut self) -> Option<T> {
        let node = self.head?;

        // SAFETY: `head` always refers to a node this stack constructed and
        // has not yet torn down; reading moves its contents out, after which
        // only the empty storage remains.
        let Node { value, prev } = unsafe { node.read() };

        // SAFETY: The node's contents were moved out above; the storage came
        // from `allocate()` on this allocator and is returned exactly once.
        unsafe {
            self.alloc.deallocate(node);
        }

        self.head = prev;

        // Cannot underflow: a node existed, so the count is non-zero.
        self.len = self.len.wrapping_sub(1);

        Some(value)
    }

    /// A shared reference to the top value, or `None` when the stack is empty.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        // SAFETY: `head` always refers to a live node, and the borrow of the
        // value is tied to the borrow of the stack.
        self.head.map(|node| unsafe { &node.as_ref().value })
    }

    /// Removes every value from the stack, dropping each in place and
    /// returning all nodes to the allocator.
    pub fn clear(&mut self) {
        let mut cursor = self.head;

        while let Some(node) = cursor {
            // SAFETY: Every node in the chain is live until it is destroyed
            // below, and the link is read before the destruction.
            cursor = unsafe { node.as_ref().prev };

            // SAFETY: The node holds a value constructed by `push()` that
            // nothing uses afterwards; its storage came from `allocate()` on
            // this allocator and is returned exactly once.
            unsafe {
                self.alloc.destroy(node);
                self.alloc.deallocate(node);
            }
        }

        self.head = None;
        self.len = 0;
    }
}

impl<T, A> Drop for PooledStack<T, A>
where
    A: SlotAlloc<Node<T>>,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, A> fmt::Debug for PooledStack<T, A>
where
    A: SlotAlloc<Node<T>>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledStack")
            .field("value_type", &format_args!("{}", type_name::<T>()))
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

// SAFETY: The stack exclusively owns its nodes and its allocator; the raw
// pointers never leave it. It can move between threads whenever its values
// and allocator can.
unsafe impl<T, A> Send for PooledStack<T, A>
where
    T: Send,
    A: SlotAlloc<Node<T>> + Send,
{
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use new_zealand::nz;
    use slot_pool::SystemAlloc;

    use super::*;

    #[test]
    fn smoke_test() {
        let mut stack = PooledStack::new();

        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);

        stack.push(1);
        stack.push(2);
        stack.push(3);

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(), Some(&3));

        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn pops_in_reverse_push_order() {
        let mut stack = PooledStack::new();

        for value in 0..1000 {
            stack.push(value);
        }

        for expected in (0..1000).rev() {
            assert_eq!(stack.pop(), Some(expected));
        }

        assert!(stack.is_empty());
    }

    #[test]
    fn works_with_the_system_allocator() {
        let mut stack = PooledStack::with_allocator(SystemAlloc::new());

        for value in 0..100 {
            stack.push(value);
        }

        for expected in (0..100).rev() {
            assert_eq!(stack.pop(), Some(expected));
        }
    }

    #[test]
    fn peek_does_not_remove() {
        let mut stack = PooledStack::new();

        stack.push("only");

        assert_eq!(stack.peek(), Some(&"only"));
        assert_eq!(stack.peek(), Some(&"only"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn clear_drops_every_value() {
        struct CountsDrops {
            drops: Rc<Cell<usize>>,
        }

        impl Drop for CountsDrops {
            fn drop(&mut self) {
                self.drops.set(self.drops.get().wrapping_add(1));
            }
        }

        let drops = Rc::new(Cell::new(0));
        let mut stack = PooledStack::new();

        for _ in 0..10 {
            stack.push(CountsDrops {
                drops: Rc::clone(&drops),
            });
        }

        stack.clear();

        assert_eq!(drops.get(), 10);
        assert!(stack.is_empty());

        // The stack remains usable after a clear.
        stack.push(CountsDrops {
            drops: Rc::clone(&drops),
        });
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn drop_releases_remaining_values() {
        struct CountsDrops {
            drops: Rc<Cell<usize>>,
        }

        impl Drop for CountsDrops {
            fn drop(&mut self) {
                self.drops.set(self.drops.get().wrapping_add(1));
            }
        }

        let drops = Rc::new(Cell::new(0));

        {
            let mut stack = PooledStack::new();
            for _ in 0..5 {
                stack.push(CountsDrops {
                    drops: Rc::clone(&drops),
                });
            }
        }

        assert_eq!(drops.get(), 5);
    }

    #[test]
    fn nodes_recycle_through_the_pool() {
        let pool = SlotPool::builder().block_size(nz!(1024)).build();
        let mut stack = PooledStack::with_allocator(pool);

        // Establish the block high-water mark with one full cycle.
        for value in 0..50 {
            stack.push(value);
        }
        while stack.pop().is_some() {}
        let blocks = stack.allocator().block_count();

        // Subsequent cycles of the same depth reuse the freed nodes.
        for _ in 0..10 {
            for value in 0..50 {
                stack.push(value);
            }
            while stack.pop().is_some() {}
        }

        assert_eq!(stack.allocator().block_count(), blocks);
    }

    #[test]
    fn multithreaded_via_move() {
        let mut stack = PooledStack::new();

        stack.push(1_u64);
        stack.push(2_u64);

        // The stack, its pool, and all live nodes move to the other thread as
        // one unit.
        let handle = std::thread::spawn(move || {
            let mut stack = stack;
            assert_eq!(stack.pop(), Some(2));
            assert_eq!(stack.pop(), Some(1));
            assert_eq!(stack.pop(), None);
        });

        handle.join().unwrap();
    }

    #[test]
    fn pool_len_tracks_live_nodes() {
        let mut stack = PooledStack::new();

        stack.push(1_u64);
        stack.push(2_u64);
        assert_eq!(stack.allocator().len(), 2);

        _ = stack.pop();
        assert_eq!(stack.allocator().len(), 1);

        _ = stack.pop();
        assert_eq!(stack.allocator().len(), 0);
    }
}
