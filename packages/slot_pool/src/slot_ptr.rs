use std::any::type_name;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A typed handle to a slot in a [`SlotPool`][crate::SlotPool].
///
/// The handle is an offset in bytes from the start of the pool's backing store, not a memory
/// address. Any pool with a compatible element type can interpret it, and the pool checks it
/// against the bounds of its backing store whenever it is used.
///
/// Handles do not keep the slot alive and do not borrow the pool. They may be copied freely.
pub struct SlotPtr<T> {
    byte_offset: usize,

    // We do not own a `T`, we only describe where one may be stored.
    _element: PhantomData<fn() -> T>,
}

impl<T> SlotPtr<T> {
    /// Creates a handle from a raw byte offset relative to the start of a backing store.
    ///
    /// This is the translation path for addresses that were not obtained from
    /// [`allocate()`][crate::SlotPool::allocate]. Offsets that fall outside a pool's backing
    /// store are ignored by [`deallocate()`][crate::SlotPool::deallocate].
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPtr;
    ///
    /// let ptr = SlotPtr::<u64>::from_byte_offset(24);
    /// assert_eq!(ptr.slot_index(), 3);
    /// ```
    #[must_use]
    #[inline]
    pub const fn from_byte_offset(byte_offset: usize) -> Self {
        Self {
            byte_offset,
            _element: PhantomData,
        }
    }

    /// Creates a handle to the slot with the given index.
    ///
    /// This is how a container addresses the individual slots of a run returned by
    /// [`allocate()`][crate::SlotPool::allocate].
    ///
    /// # Panics
    ///
    /// Panics if the byte offset of the slot does not fit in `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPtr;
    ///
    /// let ptr = SlotPtr::<u32>::from_slot_index(3);
    /// assert_eq!(ptr.byte_offset(), 12);
    /// ```
    #[must_use]
    #[inline]
    pub fn from_slot_index(slot_index: usize) -> Self {
        let byte_offset = slot_index
            .checked_mul(size_of::<T>())
            .expect("slot byte offset overflows usize");

        Self::from_byte_offset(byte_offset)
    }

    /// The offset of the slot, in bytes, from the start of the backing store.
    #[must_use]
    #[inline]
    pub const fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// The index of the slot the handle points into.
    ///
    /// Offsets that are not a multiple of the element size round down to the slot that
    /// contains them.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized. Such handles cannot be created by a pool.
    #[must_use]
    #[inline]
    #[expect(
        clippy::integer_division,
        reason = "rounding down to the containing slot is intended"
    )]
    pub fn slot_index(&self) -> usize {
        let element_size = size_of::<T>();
        assert!(element_size > 0, "zero-sized elements have no slot index");

        self.byte_offset / element_size
    }

    /// Reinterprets the handle as pointing at an element of a different type.
    ///
    /// The byte offset is preserved, so the slot index changes if the element sizes differ.
    /// This pairs with [`SlotPool::rebind()`][crate::SlotPool::rebind].
    #[must_use]
    #[inline]
    pub const fn cast<U>(self) -> SlotPtr<U> {
        SlotPtr::from_byte_offset(self.byte_offset)
    }
}

impl<T> Clone for SlotPtr<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SlotPtr<T> {}

impl<T> PartialEq for SlotPtr<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.byte_offset == other.byte_offset
    }
}

impl<T> Eq for SlotPtr<T> {}

impl<T> Hash for SlotPtr<T> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.byte_offset.hash(state);
    }
}

impl<T> fmt::Debug for SlotPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("byte_offset", &self.byte_offset)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;
    use std::fmt::Debug;
    use std::rc::Rc;

    use static_assertions::assert_impl_all;

    use super::*;

    // The handle is plain data, whatever the element type.
    assert_impl_all!(SlotPtr<Rc<u8>>: Send, Sync, Copy, Debug);

    #[test]
    fn slot_index_divides_by_element_size() {
        assert_eq!(SlotPtr::<u32>::from_byte_offset(0).slot_index(), 0);
        assert_eq!(SlotPtr::<u32>::from_byte_offset(12).slot_index(), 3);
        assert_eq!(SlotPtr::<[u8; 3]>::from_byte_offset(9).slot_index(), 3);
    }

    #[test]
    fn unaligned_offset_rounds_down() {
        assert_eq!(SlotPtr::<u64>::from_byte_offset(15).slot_index(), 1);
    }

    #[test]
    fn from_slot_index_multiplies() {
        let ptr = SlotPtr::<u16>::from_slot_index(5);
        assert_eq!(ptr.byte_offset(), 10);
        assert_eq!(ptr.slot_index(), 5);
    }

    #[test]
    fn cast_preserves_byte_offset() {
        let ptr = SlotPtr::<u64>::from_slot_index(2);
        let cast = ptr.cast::<u32>();

        assert_eq!(cast.byte_offset(), 16);
        assert_eq!(cast.slot_index(), 4);
    }

    #[test]
    fn equality_and_hash_follow_offset() {
        let a = SlotPtr::<u32>::from_byte_offset(4);
        let b = SlotPtr::<u32>::from_slot_index(1);
        let c = SlotPtr::<u32>::from_byte_offset(8);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    #[should_panic]
    fn zero_sized_slot_index_panics() {
        _ = SlotPtr::<()>::from_byte_offset(0).slot_index();
    }

    #[test]
    fn debug_output_contains_offset() {
        let debug_output = format!("{:?}", SlotPtr::<u8>::from_byte_offset(7));
        assert!(debug_output.contains("SlotPtr"));
        assert!(debug_output.contains('7'));
    }
}
