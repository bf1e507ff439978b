use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

/// The contiguous region that holds every slot of a pool.
///
/// The region is `capacity * size_of::<T>()` bytes long and aligned for `T`. Its contents are
/// never interpreted by the store itself - it does not know which slots hold initialized values
/// and never drops any of them.
#[derive(Debug)]
pub(crate) struct BackingStore<T> {
    slots: Box<[MaybeUninit<T>]>,
}

impl<T> BackingStore<T> {
    /// Reserves an uninitialized region for `capacity` elements of type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized or if the region size overflows `isize`.
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(
            size_of::<T>() > 0,
            "slot pool must have non-zero element size"
        );

        Self {
            slots: Box::new_uninit_slice(capacity),
        }
    }

    /// Creates a store for `capacity` elements of type `T` whose leading bytes are copied from
    /// `source`.
    ///
    /// If the two regions differ in size, the shorter length is copied and any remaining bytes
    /// stay uninitialized.
    #[must_use]
    pub(crate) fn copy_from<U>(source: &BackingStore<U>, capacity: usize) -> Self {
        let mut store = Self::new(capacity);
        let count = source.byte_len().min(store.byte_len());

        // SAFETY: Both regions are live allocations of at least `count` bytes, they are distinct
        // allocations so cannot overlap, and `MaybeUninit` permits copying uninitialized bytes.
        unsafe {
            ptr::copy_nonoverlapping(
                source.slots.as_ptr().cast::<u8>(),
                store.slots.as_mut_ptr().cast::<u8>(),
                count,
            );
        }

        store
    }

    /// Number of element-sized slots in the region.
    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Length of the region in bytes.
    #[must_use]
    pub(crate) fn byte_len(&self) -> usize {
        // Cannot overflow because the allocation already exists with this size.
        self.slots.len().wrapping_mul(size_of::<T>())
    }

    /// Returns a pointer to the slot with the given index, or `None` if the index is outside
    /// the region.
    ///
    /// The pointer is derived from the whole region, so it may be used to reach the slots that
    /// follow it.
    #[must_use]
    pub(crate) fn slot_ptr(&mut self, index: usize) -> Option<NonNull<T>> {
        if index >= self.slots.len() {
            return None;
        }

        let base = NonNull::new(self.slots.as_mut_ptr())
            .expect("pointer to a boxed slice is never null")
            .cast::<T>();

        // SAFETY: The index was checked against the length above, so the result stays within
        // the allocation.
        Some(unsafe { base.add(index) })
    }

    /// Returns a shared reference to the possibly-uninitialized slot with the given index.
    #[must_use]
    pub(crate) fn slot(&self, index: usize) -> Option<&MaybeUninit<T>> {
        self.slots.get(index)
    }

    /// Returns an exclusive reference to the possibly-uninitialized slot with the given index.
    #[must_use]
    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut MaybeUninit<T>> {
        self.slots.get_mut(index)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_element_type() {
        let store = BackingStore::<u64>::new(10);

        assert_eq!(store.capacity(), 10);
        assert_eq!(store.byte_len(), 80);
    }

    #[test]
    #[should_panic]
    fn zero_sized_element_panics() {
        drop(BackingStore::<()>::new(10));
    }

    #[test]
    fn slot_pointers_are_element_aligned_and_contiguous() {
        let mut store = BackingStore::<u64>::new(4);

        let first = store.slot_ptr(0).unwrap().as_ptr() as usize;
        let third = store.slot_ptr(2).unwrap().as_ptr() as usize;

        assert_eq!(first % align_of::<u64>(), 0);
        assert_eq!(third - first, 2 * size_of::<u64>());
    }

    #[test]
    fn slot_outside_region_is_none() {
        let mut store = BackingStore::<u32>::new(3);

        assert!(store.slot_ptr(3).is_none());
        assert!(store.slot(3).is_none());
        assert!(store.slot_mut(usize::MAX).is_none());
    }

    #[test]
    fn copy_from_same_type_copies_contents() {
        let mut source = BackingStore::<u32>::new(3);
        source.slot_mut(0).unwrap().write(11);
        source.slot_mut(2).unwrap().write(33);

        let mut copy = BackingStore::<u32>::copy_from(&source, 3);

        // SAFETY: These slots were initialized in the source and their bytes copied.
        unsafe {
            assert_eq!(copy.slot(0).unwrap().assume_init_read(), 11);
            assert_eq!(copy.slot(2).unwrap().assume_init_read(), 33);
        }

        // The copy is independent of the source.
        copy.slot_mut(0).unwrap().write(99);

        // SAFETY: Initialized above.
        unsafe {
            assert_eq!(source.slot(0).unwrap().assume_init_read(), 11);
        }
    }

    #[test]
    fn copy_from_wider_type_truncates() {
        let mut source = BackingStore::<u64>::new(2);
        source.slot_mut(0).unwrap().write(u64::MAX);
        source.slot_mut(1).unwrap().write(0);

        let copy = BackingStore::<u8>::copy_from(&source, 2);

        assert_eq!(copy.byte_len(), 2);

        // SAFETY: The first two bytes come from the initialized `u64::MAX`.
        unsafe {
            assert_eq!(copy.slot(0).unwrap().assume_init_read(), 0xFF);
            assert_eq!(copy.slot(1).unwrap().assume_init_read(), 0xFF);
        }
    }
}
