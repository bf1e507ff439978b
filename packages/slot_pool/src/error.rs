use thiserror::Error;

/// Errors that can occur when reserving slots from a [`SlotPool`][crate::SlotPool].
#[derive(Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// No run of free slots long enough to satisfy the request exists in the pool.
    ///
    /// The pool never grows, compacts or retries. The caller decides whether to use a different
    /// pool, rebuild with a larger capacity or give up.
    #[error(
        "out of memory: requested {requested} contiguous slots but the longest free run in the \
         pool of capacity {capacity} is {largest_free_run} slots"
    )]
    OutOfMemory {
        /// Number of contiguous slots that was requested.
        requested: usize,

        /// Total number of slots in the pool.
        capacity: usize,

        /// Length of the longest run of free slots at the time of the request.
        largest_free_run: usize,
    },
}

/// A specialized `Result` type for slot pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn out_of_memory_message_names_the_numbers() {
        let error = Error::OutOfMemory {
            requested: 11,
            capacity: 10,
            largest_free_run: 4,
        };

        let message = error.to_string();
        assert!(message.contains("11"));
        assert!(message.contains("capacity 10"));
        assert!(message.contains("4 slots"));
    }

    #[test]
    fn out_of_memory_is_error() {
        let result: Result<()> = Err(Error::OutOfMemory {
            requested: 1,
            capacity: 1,
            largest_free_run: 0,
        });

        assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    }
}
