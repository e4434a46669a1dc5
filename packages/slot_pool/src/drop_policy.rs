/// Determines how a pool reacts when it is dropped while some of its slots are
/// still held by callers.
///
/// The pool keeps no record of which held slots contain a live value, so it can
/// never drop remaining values itself: dropping the pool reclaims every block of
/// storage but abandons whatever the held slots still contain.
///
/// # Examples
///
/// ```
/// use slot_pool::{DropPolicy, SlotPool};
///
/// // The drop policy is set at pool creation time.
/// let pool = SlotPool::<u32>::builder()
///     .drop_policy(DropPolicy::MustNotLeakItems)
///     .build();
/// # drop(pool);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The pool may be dropped while slots are still held. The values in those
    /// slots are never dropped; only their storage is reclaimed. This is the
    /// default.
    #[default]
    MayLeakItems,

    /// The pool will panic if any slot is still held when it is dropped.
    ///
    /// This may be valuable when pooled values own resources beyond plain memory
    /// (file handles, heap buffers), where skipping their drop logic would leak
    /// more than the pool can reclaim.
    MustNotLeakItems,
}
