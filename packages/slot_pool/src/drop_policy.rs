/// Determines what happens when a pool is dropped while some of its slots are still reserved.
///
/// The pool does not track which reserved slots hold constructed values, so it never drops
/// values on its own. The policy only decides whether leftover reservations are acceptable.
///
/// # Examples
///
/// ```
/// use new_zealand::nz;
/// use slot_pool::{DropPolicy, SlotPool};
///
/// let pool = SlotPool::<u32>::builder()
///     .capacity(nz!(16))
///     .drop_policy(DropPolicy::MustNotHoldReservations)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DropPolicy {
    /// The backing store is released even if slots are still reserved. This is the default.
    ///
    /// Values constructed into reserved slots are abandoned without running their destructors.
    #[default]
    MayHoldReservations,

    /// The pool will panic if any slot is still reserved when it is dropped.
    ///
    /// This may be valuable to detect containers that forget to return their storage.
    MustNotHoldReservations,
}
