use std::any::type_name;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZero;
use std::ptr::NonNull;
use std::thread;

use tracing::{debug, trace};

use crate::error::Result;
use crate::{BackingStore, DropPolicy, Error, OccupancyMap, SlotPoolBuilder, SlotPtr};

/// A fixed-capacity pool of element-sized slots carved from one pre-reserved backing store.
///
/// The pool hands out contiguous runs of slots with [`allocate()`](Self::allocate) and takes
/// them back with [`deallocate()`](Self::deallocate). Runs are placed first-fit: the earliest
/// run of free slots that is long enough wins. The capacity is chosen at construction time and
/// never changes - when no suitable run exists, allocation fails with [`Error::OutOfMemory`].
///
/// Slots are addressed through [`SlotPtr<T>`] handles, which carry a byte offset into the
/// backing store instead of a memory address. Every use of a handle is checked against the
/// bounds of the backing store.
///
/// The pool tracks which slots are reserved, not which slots hold values. Values are placed with
/// [`construct()`](Self::construct) and torn down with [`destroy()`](Self::destroy); any value
/// left in a slot when the pool is dropped is abandoned without running its destructor.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use slot_pool::SlotPool;
///
/// let mut pool = SlotPool::<u64>::with_capacity(nz!(10));
///
/// let run = pool.allocate(3).expect("an empty pool has room for 3 slots");
/// assert_eq!(run.slot_index(), 0);
/// assert_eq!(pool.len(), 3);
///
/// pool.deallocate(run, 3);
/// assert!(pool.is_empty());
/// ```
///
/// # Equality
///
/// All pools compare equal, whatever their element type, capacity or contents. A handle from one
/// pool may be given to another, where it is either translated into that pool's slots or
/// ignored as out of range. The pools are interchangeable in that sense, even though each owns
/// an independent backing store.
///
/// # Thread safety
///
/// The pool is thread-mobile ([`Send`]) if `T` is, but it is not thread-safe ([`Sync`]).
/// Concurrent use requires external synchronization.
pub struct SlotPool<T> {
    backing: BackingStore<T>,
    occupancy: OccupancyMap,
    drop_policy: DropPolicy,

    _not_sync: PhantomData<Cell<()>>,
}

impl<T> SlotPool<T> {
    /// Creates a builder for configuring and constructing a [`SlotPool`].
    #[inline]
    pub fn builder() -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new()
    }

    /// Creates a pool with [`DEFAULT_CAPACITY`][crate::DEFAULT_CAPACITY] slots.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a pool with room for exactly `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or if the backing store size overflows `isize`.
    #[must_use]
    #[inline]
    pub fn with_capacity(capacity: NonZero<usize>) -> Self {
        Self::builder().capacity(capacity).build()
    }

    #[must_use]
    pub(crate) fn new_inner(capacity: NonZero<usize>, drop_policy: DropPolicy) -> Self {
        let backing = BackingStore::new(capacity.get());

        debug!(
            capacity = capacity.get(),
            element_size = size_of::<T>(),
            element_type = type_name::<T>(),
            "created slot pool"
        );

        Self {
            backing,
            occupancy: OccupancyMap::new(capacity.get()),
            drop_policy,
            _not_sync: PhantomData,
        }
    }

    /// The total number of slots in the pool. This never changes.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.backing.capacity()
    }

    /// The number of slots that are currently reserved.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.occupancy.reserved_count()
    }

    /// Whether no slot is currently reserved.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether every slot is currently reserved.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// The size of one slot in bytes.
    #[must_use]
    #[inline]
    pub fn element_size(&self) -> usize {
        size_of::<T>()
    }

    /// The size of the backing store in bytes.
    #[must_use]
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.backing.byte_len()
    }

    /// The length of the longest run of free slots, which is the largest request that
    /// [`allocate()`](Self::allocate) can currently satisfy.
    #[must_use]
    pub fn largest_free_run(&self) -> usize {
        self.occupancy.largest_free_run()
    }

    /// Whether the slot that `ptr` points into is currently reserved.
    ///
    /// Handles outside the backing store are never reserved.
    #[must_use]
    pub fn is_reserved(&self, ptr: SlotPtr<T>) -> bool {
        self.index_in_bounds(ptr)
            .is_some_and(|index| self.occupancy.is_reserved(index))
    }

    /// Reserves `n` contiguous slots and returns a handle to the first of them.
    ///
    /// The earliest run of at least `n` free slots is used. A request for zero slots succeeds
    /// without reserving anything and returns a handle to the first slot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if no run of `n` free slots exists. Nothing is reserved
    /// in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use new_zealand::nz;
    /// use slot_pool::{Error, SlotPool};
    ///
    /// let mut pool = SlotPool::<u32>::with_capacity(nz!(4));
    ///
    /// let first = pool.allocate(3)?;
    /// assert!(matches!(pool.allocate(2), Err(Error::OutOfMemory { .. })));
    ///
    /// let second = pool.allocate(1)?;
    /// assert_eq!(second.slot_index(), 3);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn allocate(&mut self, n: usize) -> Result<SlotPtr<T>> {
        let Some(start) = self.occupancy.find_first_fit(n) else {
            let largest_free_run = self.occupancy.largest_free_run();

            debug!(
                requested = n,
                capacity = self.capacity(),
                largest_free_run,
                "slot allocation failed"
            );

            return Err(Error::OutOfMemory {
                requested: n,
                capacity: self.capacity(),
                largest_free_run,
            });
        };

        // Cannot overflow because the run fits inside the occupancy map.
        self.occupancy.reserve(start..start.wrapping_add(n));

        trace!(slot_index = start, count = n, "reserved slots");

        #[cfg(debug_assertions)]
        self.integrity_check();

        Ok(SlotPtr::from_slot_index(start))
    }

    /// Releases up to `n` slots starting at the slot that `ptr` points into.
    ///
    /// Handles outside the backing store are ignored. The release stops at the end of the
    /// backing store and slots that are already free stay free. The contents of the slots are
    /// not touched - any value still stored in them is abandoned.
    pub fn deallocate(&mut self, ptr: SlotPtr<T>, n: usize) {
        let Some(start) = self.index_in_bounds(ptr) else {
            debug!(
                byte_offset = ptr.byte_offset(),
                byte_len = self.byte_len(),
                "ignoring release of slots outside the backing store"
            );
            return;
        };

        let released = self.occupancy.release(start, n);

        trace!(
            slot_index = start,
            count = n,
            released,
            "released slots"
        );

        #[cfg(debug_assertions)]
        self.integrity_check();
    }

    /// Moves `value` into the slot that `ptr` points into and returns the same handle.
    ///
    /// The slot is expected to have been reserved via [`allocate()`](Self::allocate). Any
    /// value previously stored in the slot is overwritten without being dropped.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is outside the backing store.
    ///
    /// In debug builds, panics if the slot is not reserved.
    pub fn construct(&mut self, ptr: SlotPtr<T>, value: T) -> SlotPtr<T> {
        self.construct_with(ptr, || value)
    }

    /// Stores the value returned by `f` in the slot that `ptr` points into and returns the
    /// same handle.
    ///
    /// This is the variant of [`construct()`](Self::construct) for values that are expensive
    /// to build, deferring construction until the slot has been located.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is outside the backing store.
    ///
    /// In debug builds, panics if the slot is not reserved.
    pub fn construct_with(&mut self, ptr: SlotPtr<T>, f: impl FnOnce() -> T) -> SlotPtr<T> {
        let index = self.index_in_bounds_or_panic(ptr);

        debug_assert!(
            self.occupancy.is_reserved(index),
            "constructing a value in slot {index} which is not reserved"
        );

        self.backing
            .slot_mut(index)
            .expect("index was checked against the backing store bounds")
            .write(f());

        ptr
    }

    /// Drops the value in the slot that `ptr` points into, then releases that one slot.
    ///
    /// The value is dropped before the slot becomes available again.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is outside the backing store.
    ///
    /// # Safety
    ///
    /// The slot must hold a value stored by [`construct()`](Self::construct) or
    /// [`construct_with()`](Self::construct_with) that has not been destroyed or moved out, and
    /// no reference to it obtained from [`get()`](Self::get) or [`get_mut()`](Self::get_mut)
    /// may be used afterwards.
    ///
    /// Slots copied into another pool by [`rebind()`](Self::rebind) or [`Clone`] hold bitwise
    /// duplicates of the original values. Unless `T` is [`Copy`], at most one of the pools may
    /// treat such a duplicate as a live value.
    pub unsafe fn destroy(&mut self, ptr: SlotPtr<T>) {
        let index = self.index_in_bounds_or_panic(ptr);

        let slot = self
            .backing
            .slot_mut(index)
            .expect("index was checked against the backing store bounds");

        // SAFETY: The caller guarantees that the slot holds a live value.
        unsafe {
            slot.assume_init_drop();
        }

        self.deallocate(ptr, 1);
    }

    /// Returns a shared reference to the value in the slot that `ptr` points into.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is outside the backing store.
    ///
    /// # Safety
    ///
    /// The slot must hold a value stored by [`construct()`](Self::construct) or
    /// [`construct_with()`](Self::construct_with) that has not been destroyed.
    ///
    /// Slots copied into another pool by [`rebind()`](Self::rebind) or [`Clone`] hold bitwise
    /// duplicates of the original values. Unless `T` is [`Copy`], at most one of the pools may
    /// treat such a duplicate as a live value.
    #[must_use]
    pub unsafe fn get(&self, ptr: SlotPtr<T>) -> &T {
        let index = self.index_in_bounds_or_panic(ptr);

        let slot = self
            .backing
            .slot(index)
            .expect("index was checked against the backing store bounds");

        // SAFETY: The caller guarantees that the slot holds a live value.
        unsafe { slot.assume_init_ref() }
    }

    /// Returns an exclusive reference to the value in the slot that `ptr` points into.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is outside the backing store.
    ///
    /// # Safety
    ///
    /// The slot must hold a value stored by [`construct()`](Self::construct) or
    /// [`construct_with()`](Self::construct_with) that has not been destroyed.
    ///
    /// Slots copied into another pool by [`rebind()`](Self::rebind) or [`Clone`] hold bitwise
    /// duplicates of the original values. Unless `T` is [`Copy`], at most one of the pools may
    /// treat such a duplicate as a live value.
    #[must_use]
    pub unsafe fn get_mut(&mut self, ptr: SlotPtr<T>) -> &mut T {
        let index = self.index_in_bounds_or_panic(ptr);

        let slot = self
            .backing
            .slot_mut(index)
            .expect("index was checked against the backing store bounds");

        // SAFETY: The caller guarantees that the slot holds a live value.
        unsafe { slot.assume_init_mut() }
    }

    /// Returns a raw pointer to the slot that `ptr` points into.
    ///
    /// The pointer may be used to reach the following slots of the same run, up to the end of
    /// the backing store. It remains valid until the pool is dropped or borrowed again.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is outside the backing store.
    #[must_use]
    pub fn as_mut_ptr(&mut self, ptr: SlotPtr<T>) -> NonNull<T> {
        let index = self.index_in_bounds_or_panic(ptr);

        self.backing
            .slot_ptr(index)
            .expect("index was checked against the backing store bounds")
    }

    /// Creates an independent pool for elements of type `U` from a snapshot of this one.
    ///
    /// The new pool has the same capacity (in slots), the same occupancy map and drop policy,
    /// and a fresh backing store sized for `U` that starts with a copy of this pool's bytes.
    /// Nothing is shared between the two pools afterwards.
    ///
    /// The bytes are copied without running any clone logic, so each value in a reserved slot
    /// now exists twice. Unless the values are [`Copy`], only one of the two pools may go on to
    /// [`destroy()`](Self::destroy) or otherwise use a given value. The other pool should only
    /// [`deallocate()`](Self::deallocate) that slot.
    ///
    /// # Panics
    ///
    /// Panics if `U` is zero-sized.
    #[must_use]
    pub fn rebind<U>(&self) -> SlotPool<U> {
        let capacity = self.capacity();

        debug!(
            capacity,
            from = type_name::<T>(),
            to = type_name::<U>(),
            reserved = self.len(),
            "copied slot pool"
        );

        SlotPool {
            backing: BackingStore::copy_from(&self.backing, capacity),
            occupancy: self.occupancy.clone(),
            drop_policy: self.drop_policy,
            _not_sync: PhantomData,
        }
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    fn integrity_check(&self) {
        assert_eq!(
            self.occupancy.len(),
            self.capacity(),
            "occupancy map must have one entry per slot"
        );

        self.occupancy.integrity_check();
    }

    fn index_in_bounds(&self, ptr: SlotPtr<T>) -> Option<usize> {
        (ptr.byte_offset() < self.byte_len()).then(|| ptr.slot_index())
    }

    fn index_in_bounds_or_panic(&self, ptr: SlotPtr<T>) -> usize {
        self.index_in_bounds(ptr).unwrap_or_else(|| {
            panic!(
                "slot at byte offset {} is outside the backing store of {} bytes",
                ptr.byte_offset(),
                self.byte_len()
            )
        })
    }
}

impl<T> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning a pool copies its bytes without cloning the values in them, with the same rules as
/// [`SlotPool::rebind()`].
impl<T> Clone for SlotPool<T> {
    fn clone(&self) -> Self {
        self.rebind()
    }
}

impl<T, U> From<&SlotPool<U>> for SlotPool<T> {
    fn from(other: &SlotPool<U>) -> Self {
        other.rebind()
    }
}

impl<T, U> PartialEq<SlotPool<U>> for SlotPool<T> {
    #[cfg_attr(test, mutants::skip)] // The answer is fixed, there is nothing to distinguish.
    fn eq(&self, _other: &SlotPool<U>) -> bool {
        true
    }
}

impl<T> Eq for SlotPool<T> {}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("element_size", &self.element_size())
            .field("drop_policy", &self.drop_policy)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for SlotPool<T> {
    fn drop(&mut self) {
        // If we are already panicking, we do not want to panic again because that will
        // simply obscure whatever the original panic was, leading to debug difficulties.
        if !thread::panicking() && matches!(self.drop_policy, DropPolicy::MustNotHoldReservations)
        {
            assert!(
                self.is_empty(),
                "dropped a SlotPool with {} reserved slots - this is forbidden by DropPolicy::MustNotHoldReservations",
                self.len()
            );
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::indexing_slicing,
    clippy::items_after_statements,
    clippy::cast_possible_truncation,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::RefCell;
    use std::fmt::Debug;
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;

    use new_zealand::nz;
    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;

    assert_impl_all!(SlotPool<u64>: Send, Debug, Clone, Default, Eq);
    assert_not_impl_any!(SlotPool<u64>: Sync);
    assert_not_impl_any!(SlotPool<Rc<u64>>: Send);

    fn reserved_indexes<T>(pool: &SlotPool<T>) -> Vec<usize> {
        (0..pool.capacity())
            .filter(|&index| pool.is_reserved(SlotPtr::from_slot_index(index)))
            .collect()
    }

    #[test]
    fn smoke_test() {
        let mut pool = SlotPool::<String>::with_capacity(nz!(4));

        assert_eq!(pool.capacity(), 4);
        assert!(pool.is_empty());

        let a = pool.allocate(1).unwrap();
        let b = pool.allocate(1).unwrap();
        pool.construct(a, "Hello".to_string());
        pool.construct(b, "World".to_string());

        unsafe {
            assert_eq!(pool.get(a), "Hello");
            assert_eq!(pool.get(b), "World");

            pool.get_mut(a).push('!');
            assert_eq!(pool.get(a), "Hello!");

            pool.destroy(a);
            pool.destroy(b);
        }

        assert!(pool.is_empty());
    }

    #[test]
    fn every_fitting_request_succeeds_on_fresh_pool() {
        for n in 1..=10 {
            let mut pool = SlotPool::<u32>::with_capacity(nz!(10));

            let ptr = pool.allocate(n).unwrap();

            assert_eq!(ptr.byte_offset() % pool.element_size(), 0);
            assert_eq!(pool.len(), n);
        }
    }

    #[test]
    fn whole_capacity_can_be_allocated() {
        let mut pool = SlotPool::<u64>::with_capacity(nz!(10));

        let ptr = pool.allocate(10).unwrap();

        assert_eq!(ptr.slot_index(), 0);
        assert!(pool.is_full());
        assert_eq!(pool.largest_free_run(), 0);
    }

    #[test]
    fn allocate_then_deallocate_restores_all_free() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(10));

        let ptr = pool.allocate(6).unwrap();
        pool.deallocate(ptr, 6);

        assert!(pool.is_empty());
        assert!(reserved_indexes(&pool).is_empty());
        assert_eq!(pool.largest_free_run(), 10);
    }

    #[test]
    fn consecutive_allocations_pack_contiguously() {
        let mut pool = SlotPool::<u16>::with_capacity(nz!(10));

        let first = pool.allocate(3).unwrap();
        let second = pool.allocate(5).unwrap();

        assert_eq!(first.byte_offset(), 0);
        assert_eq!(second.byte_offset(), first.byte_offset() + 3 * 2);
        assert_eq!(reserved_indexes(&pool), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_request_is_out_of_memory() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(10));

        let error = pool.allocate(11).unwrap_err();

        assert_eq!(
            error,
            Error::OutOfMemory {
                requested: 11,
                capacity: 10,
                largest_free_run: 10,
            }
        );
        assert!(pool.is_empty());
    }

    #[test]
    fn failed_allocation_reserves_nothing() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(10));

        let a = pool.allocate(4).unwrap();
        let _b = pool.allocate(2).unwrap();
        pool.deallocate(a, 4);

        // 4 free at the front and 4 free at the back, but never 5 in a row.
        let before = reserved_indexes(&pool);
        assert!(matches!(
            pool.allocate(5),
            Err(Error::OutOfMemory {
                largest_free_run: 4,
                ..
            })
        ));
        assert_eq!(reserved_indexes(&pool), before);
    }

    #[test]
    fn freed_run_is_reused_first_fit() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(10));

        let a = pool.allocate(3).unwrap();
        let b = pool.allocate(4).unwrap();
        assert_eq!(a.slot_index(), 0);
        assert_eq!(b.slot_index(), 3);

        pool.deallocate(a, 3);

        let c = pool.allocate(3).unwrap();
        assert_eq!(c.slot_index(), 0);
        assert_eq!(reserved_indexes(&pool), (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn zero_slot_request_reserves_nothing() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(2));
        _ = pool.allocate(2).unwrap();

        let ptr = pool.allocate(0).unwrap();

        assert_eq!(ptr.slot_index(), 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn deallocate_outside_backing_store_is_noop() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(4));
        _ = pool.allocate(4).unwrap();

        pool.deallocate(SlotPtr::from_byte_offset(16), 1);
        pool.deallocate(SlotPtr::from_slot_index(100), 4);
        pool.deallocate(SlotPtr::from_byte_offset(usize::MAX), usize::MAX);

        assert!(pool.is_full());
    }

    #[test]
    fn deallocate_clamps_to_end_of_backing_store() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(4));
        _ = pool.allocate(4).unwrap();

        pool.deallocate(SlotPtr::from_slot_index(2), 100);

        assert_eq!(reserved_indexes(&pool), vec![0, 1]);
    }

    #[test]
    fn deallocate_does_not_touch_contents() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(4));

        let ptr = pool.allocate(1).unwrap();
        pool.construct(ptr, 1234);
        pool.deallocate(ptr, 1);

        assert!(!pool.is_reserved(ptr));
        assert_eq!(unsafe { *pool.get(ptr) }, 1234);
    }

    #[test]
    fn unaligned_handle_releases_containing_slot() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(4));
        _ = pool.allocate(4).unwrap();

        pool.deallocate(SlotPtr::from_byte_offset(9), 1);

        assert_eq!(reserved_indexes(&pool), vec![0, 1, 3]);
    }

    #[test]
    fn destroy_drops_value_and_releases_one_slot() {
        let dropped = Rc::new(RefCell::new(Vec::new()));

        struct Tracked(u32, Rc<RefCell<Vec<u32>>>);

        impl Drop for Tracked {
            fn drop(&mut self) {
                self.1.borrow_mut().push(self.0);
            }
        }

        let mut pool = SlotPool::<Tracked>::with_capacity(nz!(4));
        let run = pool.allocate(2).unwrap();
        let second = SlotPtr::from_slot_index(run.slot_index() + 1);

        pool.construct(run, Tracked(1, Rc::clone(&dropped)));
        pool.construct_with(second, || Tracked(2, Rc::clone(&dropped)));

        unsafe { pool.destroy(second) };

        assert_eq!(*dropped.borrow(), vec![2]);
        assert_eq!(reserved_indexes(&pool), vec![0]);

        unsafe { pool.destroy(run) };

        assert_eq!(*dropped.borrow(), vec![2, 1]);
        assert!(pool.is_empty());
    }

    #[test]
    fn destroy_keeps_slot_reserved_if_teardown_panics() {
        #[allow(dead_code, reason = "the field only gives the type a non-zero size")]
        struct PanicOnDrop(u8);

        impl Drop for PanicOnDrop {
            fn drop(&mut self) {
                panic!("teardown failed");
            }
        }

        let mut pool = SlotPool::<PanicOnDrop>::with_capacity(nz!(2));
        let ptr = pool.allocate(1).unwrap();
        pool.construct(ptr, PanicOnDrop(0));

        let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe { pool.destroy(ptr) }));

        assert!(result.is_err());

        // The slot is only released after teardown completes.
        assert!(pool.is_reserved(ptr));
    }

    #[test]
    #[should_panic]
    fn construct_outside_backing_store_panics() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(2));
        pool.construct(SlotPtr::from_slot_index(2), 5);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn construct_into_free_slot_panics_in_debug() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(2));
        pool.construct(SlotPtr::from_slot_index(0), 5);
    }

    #[test]
    fn as_mut_ptr_reaches_whole_run() {
        let mut pool = SlotPool::<u64>::with_capacity(nz!(8));
        _ = pool.allocate(1).unwrap();

        let run = pool.allocate(3).unwrap();
        let base = pool.as_mut_ptr(run);

        unsafe {
            for offset in 0..3 {
                base.add(offset).write(offset as u64 * 10);
            }
        }

        for offset in 0..3 {
            let ptr = SlotPtr::from_slot_index(run.slot_index() + offset);
            assert_eq!(unsafe { *pool.get(ptr) }, offset as u64 * 10);
        }
    }

    #[test]
    fn default_pool_sizes_in_slots() {
        let pool = SlotPool::<u64>::default();

        assert_eq!(pool.capacity(), crate::DEFAULT_CAPACITY.get());
        assert_eq!(pool.byte_len(), crate::DEFAULT_CAPACITY.get() * 8);
    }

    #[test]
    fn rebind_preserves_capacity_and_occupancy() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(6));
        let ptr = pool.allocate(2).unwrap();
        pool.construct(ptr, 0x0102_0304);

        let rebound = pool.rebind::<u64>();

        assert_eq!(rebound.capacity(), 6);
        assert_eq!(rebound.byte_len(), 48);
        assert_eq!(reserved_indexes(&rebound), vec![0, 1]);
    }

    #[test]
    fn clone_is_deep_copy() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(4));
        let ptr = pool.allocate(1).unwrap();
        pool.construct(ptr, 7);

        let mut copy = pool.clone();
        assert_eq!(unsafe { *copy.get(ptr) }, 7);

        // Changes to the copy are invisible to the original.
        unsafe { *copy.get_mut(ptr) = 8 };
        _ = copy.allocate(3).unwrap();

        assert_eq!(unsafe { *pool.get(ptr) }, 7);
        assert_eq!(pool.len(), 1);
        assert_eq!(copy.len(), 4);
    }

    #[test]
    fn clone_duplicates_values_without_cloning_them() {
        let shared = Rc::new(5_u32);

        let mut pool = SlotPool::<Rc<u32>>::with_capacity(nz!(2));
        let ptr = pool.allocate(1).unwrap();
        pool.construct(ptr, Rc::clone(&shared));
        assert_eq!(Rc::strong_count(&shared), 2);

        let mut copy = pool.clone();

        // The copy holds the same bits, not a new reference.
        assert_eq!(Rc::strong_count(&shared), 2);
        assert!(Rc::ptr_eq(unsafe { copy.get(ptr) }, &shared));

        // Only one pool may treat the duplicate as live. The other only releases the slot.
        unsafe { copy.destroy(ptr) };
        pool.deallocate(ptr, 1);

        assert_eq!(Rc::strong_count(&shared), 1);
        assert!(pool.is_empty());
        assert!(copy.is_empty());
    }

    #[test]
    #[should_panic]
    fn rebound_pool_inherits_drop_policy() {
        let mut pool = SlotPool::<u64>::builder()
            .capacity(nz!(4))
            .drop_policy(DropPolicy::MustNotHoldReservations)
            .build();

        let ptr = pool.allocate(1).unwrap();
        let rebound = pool.rebind::<u32>();

        pool.deallocate(ptr, 1);
        drop(pool);

        // The copy still holds the reservation and carries the strict policy.
        drop(rebound);
    }

    #[test]
    fn from_other_element_type_copies() {
        let mut pool = SlotPool::<u8>::with_capacity(nz!(3));
        _ = pool.allocate(1).unwrap();

        let converted = SlotPool::<u16>::from(&pool);

        assert_eq!(converted.capacity(), 3);
        assert_eq!(converted.len(), 1);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn pools_are_always_equal() {
        let mut a = SlotPool::<u32>::with_capacity(nz!(4));
        let b = SlotPool::<u32>::with_capacity(nz!(400));
        let c = SlotPool::<String>::with_capacity(nz!(1));

        _ = a.allocate(2).unwrap();

        assert_eq!(a, b);
        assert!(a == c);
        assert!(c == b);
    }

    #[test]
    fn handle_from_other_pool_is_bounds_checked() {
        let mut small = SlotPool::<u32>::with_capacity(nz!(2));
        let mut large = SlotPool::<u32>::with_capacity(nz!(10));
        _ = small.allocate(2).unwrap();

        let far = large.allocate(10).unwrap();
        let far = SlotPtr::from_slot_index(far.slot_index() + 8);

        // Out of range for the small pool, so ignored there.
        small.deallocate(far, 2);
        assert!(small.is_full());

        large.deallocate(far, 2);
        assert_eq!(large.len(), 8);
    }

    #[test]
    fn drop_empty_pool_does_not_panic_if_policy_must_not_hold() {
        let mut pool = SlotPool::<u64>::builder()
            .capacity(nz!(4))
            .drop_policy(DropPolicy::MustNotHoldReservations)
            .build();

        let ptr = pool.allocate(2).unwrap();
        pool.deallocate(ptr, 2);

        drop(pool);
    }

    #[test]
    #[should_panic]
    fn drop_with_reservations_panics_if_policy_must_not_hold() {
        let mut pool = SlotPool::<u64>::builder()
            .capacity(nz!(4))
            .drop_policy(DropPolicy::MustNotHoldReservations)
            .build();

        _ = pool.allocate(1).unwrap();

        drop(pool);
    }

    #[test]
    fn drop_with_reservations_is_fine_by_default() {
        let mut pool = SlotPool::<String>::with_capacity(nz!(4));
        let ptr = pool.allocate(1).unwrap();
        pool.construct(ptr, "abandoned".to_string());

        drop(pool);
    }

    #[test]
    fn debug_output_describes_pool() {
        let mut pool = SlotPool::<u32>::with_capacity(nz!(5));
        _ = pool.allocate(2).unwrap();

        let debug_output = format!("{pool:?}");

        assert!(debug_output.contains("SlotPool"));
        assert!(debug_output.contains("capacity: 5"));
        assert!(debug_output.contains("len: 2"));
    }
}
