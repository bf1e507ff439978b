use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;

use new_zealand::nz;

use crate::{DropPolicy, SlotPool};

/// Number of slots reserved by a pool whose capacity is not specified.
///
/// This is 1024 * 50 slots. The backing store is sized in slots, so its length in bytes is this
/// value multiplied by the element size.
///
/// Use [`SlotPoolBuilder::capacity()`] or [`SlotPool::with_capacity()`] to choose a different
/// capacity.
pub const DEFAULT_CAPACITY: NonZero<usize> = nz!(51_200);

/// Builder for creating an instance of [`SlotPool`].
///
/// All settings are optional. A pool built without any settings holds [`DEFAULT_CAPACITY`]
/// slots and uses the default [`DropPolicy`].
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<String>::builder()
///     .capacity(nz!(64))
///     .drop_policy(DropPolicy::MustNotHoldReservations)
///     .build();
///
/// assert_eq!(pool.capacity(), 64);
/// ```
///
/// # Thread safety
///
/// The builder is thread-mobile ([`Send`]) and can be safely transferred between threads.
/// However, it is not thread-safe ([`Sync`]) as it contains mutable configuration state.
#[must_use]
pub struct SlotPoolBuilder<T> {
    capacity: NonZero<usize>,
    drop_policy: DropPolicy,

    _element: PhantomData<fn() -> T>,

    // Prevents Sync while allowing Send - builders are thread-mobile but not thread-safe
    _not_sync: PhantomData<Cell<()>>,
}

impl<T> SlotPoolBuilder<T> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            drop_policy: DropPolicy::default(),
            _element: PhantomData,
            _not_sync: PhantomData,
        }
    }

    /// Sets the number of element-sized slots the pool reserves.
    ///
    /// The capacity is fixed for the lifetime of the pool.
    #[inline]
    pub fn capacity(mut self, capacity: NonZero<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the [drop policy][DropPolicy] for the pool. This governs how to treat slots that
    /// are still reserved when the pool is dropped.
    #[inline]
    pub fn drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    /// Builds the pool, reserving its backing store.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or if the backing store size overflows `isize`.
    #[must_use]
    #[inline]
    pub fn build(self) -> SlotPool<T> {
        SlotPool::new_inner(self.capacity, self.drop_policy)
    }
}

impl<T> fmt::Debug for SlotPoolBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPoolBuilder")
            .field("capacity", &self.capacity)
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}
