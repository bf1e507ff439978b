#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity memory pool that hands out contiguous runs of same-sized slots.
//!
//! This crate provides [`SlotPool<T>`], which reserves one backing store of
//! `capacity * size_of::<T>()` bytes at construction time and serves element storage from it
//! instead of the general-purpose heap. It offers the operations a container expects from an
//! element allocator: allocate, deallocate, construct, destroy, rebind and equality.
//!
//! # Key Features
//!
//! - **Bounded memory**: The backing store is reserved once and never grows
//! - **First-fit placement**: Requests take the earliest run of free slots that is long enough
//! - **Checked handles**: Slots are addressed by [`SlotPtr<T>`] byte offsets, checked against the
//!   bounds of the backing store on every use
//! - **Failure as data**: Exhaustion is reported as [`Error::OutOfMemory`] and never reserves
//!   a partial run
//! - **Deep copies**: [`SlotPool::rebind()`] and [`Clone`] produce independent pools
//!
//! # Examples
//!
//! ```rust
//! use new_zealand::nz;
//! use slot_pool::SlotPool;
//!
//! let mut pool = SlotPool::<String>::with_capacity(nz!(10));
//!
//! let a = pool.allocate(3)?;
//! let b = pool.allocate(4)?;
//! assert_eq!(b.slot_index(), 3);
//!
//! // Freed runs are reused first-fit.
//! pool.deallocate(a, 3);
//! let c = pool.allocate(3)?;
//! assert_eq!(c.slot_index(), 0);
//!
//! // Values are placed into reserved slots and torn down before the slot is released.
//! pool.construct(c, "pooled".to_string());
//! // SAFETY: The slot holds the value we just constructed.
//! assert_eq!(unsafe { pool.get(c) }, "pooled");
//! // SAFETY: The slot holds a live value and we do not use it afterwards.
//! unsafe { pool.destroy(c) };
//! # Ok::<(), slot_pool::Error>(())
//! ```
//!
//! Requests that do not fit fail without side effects:
//!
//! ```rust
//! use new_zealand::nz;
//! use slot_pool::{Error, SlotPool};
//!
//! let mut pool = SlotPool::<u32>::with_capacity(nz!(4));
//!
//! assert!(matches!(pool.allocate(5), Err(Error::OutOfMemory { .. })));
//! assert!(pool.is_empty());
//! ```

mod backing;
mod builder;
mod drop_policy;
mod error;
mod occupancy;
mod pool;
mod slot_ptr;

pub(crate) use backing::*;
pub use builder::*;
pub use drop_policy::*;
pub use error::Error;
pub(crate) use occupancy::*;
pub use pool::SlotPool;
pub use slot_ptr::SlotPtr;
