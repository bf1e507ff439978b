use std::ops::Range;

/// Tracks which slots of a pool are reserved and finds runs of free slots.
///
/// Entry `i` is `true` if slot `i` is reserved. The map never changes length.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct OccupancyMap {
    reserved: Vec<bool>,

    /// Number of `true` entries, kept so that length queries do not need to scan.
    reserved_count: usize,
}

impl OccupancyMap {
    /// Creates a map of `len` slots, all free.
    #[must_use]
    pub(crate) fn new(len: usize) -> Self {
        Self {
            reserved: vec![false; len],
            reserved_count: 0,
        }
    }

    #[must_use]
    #[cfg_attr(
        all(not(debug_assertions), not(test)),
        expect(dead_code, reason = "Used in cfg(debug_assertions) for integrity checking")
    )]
    pub(crate) fn len(&self) -> usize {
        self.reserved.len()
    }

    /// Number of slots currently reserved.
    #[must_use]
    pub(crate) fn reserved_count(&self) -> usize {
        self.reserved_count
    }

    #[must_use]
    pub(crate) fn is_reserved(&self, index: usize) -> bool {
        self.reserved.get(index).copied().unwrap_or(false)
    }

    /// Finds the earliest run of `n` free slots and returns the index of its first slot.
    ///
    /// A request for zero slots is satisfied at index zero without looking at the map.
    #[must_use]
    pub(crate) fn find_first_fit(&self, n: usize) -> Option<usize> {
        if n == 0 {
            return Some(0);
        }

        if n > self.reserved.len() {
            return None;
        }

        let mut run_start = 0_usize;
        let mut run_len = 0_usize;

        for (index, &reserved) in self.reserved.iter().enumerate() {
            if reserved {
                // Cannot overflow because index < len <= usize::MAX.
                run_start = index.wrapping_add(1);
                run_len = 0;
                continue;
            }

            // Cannot overflow because a run is never longer than the map.
            run_len = run_len.wrapping_add(1);

            if run_len == n {
                return Some(run_start);
            }
        }

        None
    }

    /// Length of the longest run of free slots.
    #[must_use]
    pub(crate) fn largest_free_run(&self) -> usize {
        let mut longest = 0_usize;
        let mut current = 0_usize;

        for &reserved in &self.reserved {
            if reserved {
                current = 0;
            } else {
                current = current.wrapping_add(1);
                longest = longest.max(current);
            }
        }

        longest
    }

    /// Marks every slot in `range` as reserved.
    ///
    /// # Panics
    ///
    /// Panics if the range extends past the end of the map or if any slot in it is already
    /// reserved.
    pub(crate) fn reserve(&mut self, range: Range<usize>) {
        let len = self.reserved.len();
        let entries = self
            .reserved
            .get_mut(range.clone())
            .unwrap_or_else(|| panic!("slot range {range:?} out of bounds in map of {len} slots"));

        for entry in entries {
            assert!(!*entry, "slot in range {range:?} is already reserved");
            *entry = true;
        }

        // Cannot overflow because we never count more slots than the map holds.
        self.reserved_count = self.reserved_count.wrapping_add(range.len());
    }

    /// Marks up to `n` slots starting at `start` as free, stopping at the end of the map.
    ///
    /// Slots that are already free are left alone. Returns the number of slots that
    /// changed from reserved to free.
    pub(crate) fn release(&mut self, start: usize, n: usize) -> usize {
        let end = start.saturating_add(n).min(self.reserved.len());

        let Some(entries) = self.reserved.get_mut(start..end) else {
            return 0;
        };

        let mut released = 0_usize;

        for entry in entries.iter_mut().filter(|entry| **entry) {
            *entry = false;
            released = released.wrapping_add(1);
        }

        // Cannot underflow because we only count entries that were `true`.
        self.reserved_count = self.reserved_count.wrapping_sub(released);

        released
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check(&self) {
        let actual = self.reserved.iter().filter(|reserved| **reserved).count();

        assert_eq!(
            actual, self.reserved_count,
            "occupancy map counted {} reserved slots but {actual} entries are set",
            self.reserved_count
        );
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn map_from(pattern: &str) -> OccupancyMap {
        let mut map = OccupancyMap::new(pattern.len());

        for (index, c) in pattern.chars().enumerate() {
            if c == '#' {
                map.reserve(index..index + 1);
            }
        }

        map
    }

    #[test]
    fn new_map_is_all_free() {
        let map = OccupancyMap::new(8);

        assert_eq!(map.len(), 8);
        assert_eq!(map.reserved_count(), 0);
        assert!((0..8).all(|index| !map.is_reserved(index)));
    }

    #[test]
    fn zero_request_fits_anywhere() {
        assert_eq!(map_from("####").find_first_fit(0), Some(0));
    }

    #[test]
    fn whole_map_fits_when_empty() {
        // A run that ends exactly at the last slot must be found.
        assert_eq!(OccupancyMap::new(10).find_first_fit(10), Some(0));
        assert_eq!(map_from("#...").find_first_fit(3), Some(1));
    }

    #[test]
    fn oversized_request_fails() {
        assert_eq!(OccupancyMap::new(10).find_first_fit(11), None);
    }

    #[test]
    fn first_fit_picks_earliest_run() {
        let map = map_from("##..#...#....");

        assert_eq!(map.find_first_fit(1), Some(2));
        assert_eq!(map.find_first_fit(2), Some(2));
        assert_eq!(map.find_first_fit(3), Some(5));
        assert_eq!(map.find_first_fit(4), Some(9));
        assert_eq!(map.find_first_fit(5), None);
    }

    #[test]
    fn largest_free_run_measures_gaps() {
        assert_eq!(map_from("##..#...#....").largest_free_run(), 4);
        assert_eq!(map_from("####").largest_free_run(), 0);
        assert_eq!(OccupancyMap::new(6).largest_free_run(), 6);
    }

    #[test]
    fn reserve_updates_count() {
        let mut map = OccupancyMap::new(10);
        map.reserve(2..5);

        assert_eq!(map.reserved_count(), 3);
        assert!(map.is_reserved(2));
        assert!(map.is_reserved(4));
        assert!(!map.is_reserved(5));
    }

    #[test]
    #[should_panic]
    fn reserve_twice_panics() {
        let mut map = OccupancyMap::new(10);
        map.reserve(2..5);
        map.reserve(4..6);
    }

    #[test]
    #[should_panic]
    fn reserve_past_end_panics() {
        let mut map = OccupancyMap::new(4);
        map.reserve(2..5);
    }

    #[test]
    fn release_clamps_to_end() {
        let mut map = map_from("......####");

        assert_eq!(map.release(8, 100), 2);
        assert_eq!(map.reserved_count(), 2);
        assert!(map.is_reserved(7));
        assert!(!map.is_reserved(8));
    }

    #[test]
    fn release_ignores_free_slots() {
        let mut map = map_from("#.#.");

        assert_eq!(map.release(0, 4), 2);
        assert_eq!(map.reserved_count(), 0);
    }

    #[test]
    fn release_past_end_is_noop() {
        let mut map = map_from("####");

        assert_eq!(map.release(4, 1), 0);
        assert_eq!(map.release(usize::MAX, usize::MAX), 0);
        assert_eq!(map.reserved_count(), 4);
    }

    #[test]
    fn is_reserved_out_of_bounds_is_false() {
        assert!(!map_from("##").is_reserved(2));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn integrity_check_passes_after_mixed_operations() {
        let mut map = OccupancyMap::new(16);
        map.reserve(0..4);
        map.reserve(8..12);
        map.release(2, 8);

        map.integrity_check();
        assert_eq!(map.reserved_count(), 4);
    }
}
