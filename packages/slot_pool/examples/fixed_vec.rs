//! A small growable vector that takes its element storage from a `SlotPool`.
//!
//! The vector asks the pool for a contiguous run of slots, and when the run is full it asks for
//! a longer run, moves the elements over and hands the old run back. Once the pool cannot
//! provide a long enough run, pushing fails with `OutOfMemory`.

use new_zealand::nz;
use slot_pool::{Error, SlotPool, SlotPtr};

struct PoolVec<'pool, T> {
    pool: &'pool mut SlotPool<T>,
    start: SlotPtr<T>,
    len: usize,
    reserved: usize,
}

impl<'pool, T> PoolVec<'pool, T> {
    fn new(pool: &'pool mut SlotPool<T>) -> Self {
        let start = pool
            .allocate(0)
            .expect("requests for zero slots always succeed");

        Self {
            pool,
            start,
            len: 0,
            reserved: 0,
        }
    }

    fn slot(&self, index: usize) -> SlotPtr<T> {
        SlotPtr::from_slot_index(self.start.slot_index() + index)
    }

    fn push(&mut self, value: T) -> Result<(), Error> {
        if self.len == self.reserved {
            self.grow()?;
        }

        let slot = self.slot(self.len);
        self.pool.construct(slot, value);
        self.len += 1;

        Ok(())
    }

    fn grow(&mut self) -> Result<(), Error> {
        let new_reserved = (self.reserved * 2).max(2);
        let new_start = self.pool.allocate(new_reserved)?;

        // Both runs are reached through one pointer to the start of the backing store.
        let base = self.pool.as_mut_ptr(SlotPtr::from_byte_offset(0));

        // SAFETY: Both runs lie within the backing store. The old run holds `len` initialized
        // values and the new run has room for more than that. The runs are distinct
        // reservations, so they do not overlap.
        unsafe {
            let old_base = base.add(self.start.slot_index());
            let new_base = base.add(new_start.slot_index());
            old_base.copy_to_nonoverlapping(new_base, self.len);
        }

        self.pool.deallocate(self.start, self.reserved);
        self.start = new_start;
        self.reserved = new_reserved;

        Ok(())
    }

    fn get(&self, index: usize) -> Option<&T> {
        // SAFETY: Slots below `len` hold values we constructed.
        (index < self.len).then(|| unsafe { self.pool.get(self.slot(index)) })
    }
}

impl<T> Drop for PoolVec<'_, T> {
    fn drop(&mut self) {
        for index in (0..self.len).rev() {
            let slot = self.slot(index);

            // SAFETY: Slots below `len` hold values we constructed and nobody else uses them.
            unsafe { self.pool.destroy(slot) };
        }

        // Release the rest of the run. Slots that were destroyed above are already free.
        self.pool.deallocate(self.start, self.reserved);
    }
}

fn main() {
    let mut pool = SlotPool::<String>::with_capacity(nz!(16));

    {
        let mut words = PoolVec::new(&mut pool);

        for word in ["first", "fit", "slot", "pool", "backing", "store"] {
            words.push(word.to_string()).expect("pool has room for a few words");
        }

        println!("Stored {} words, first is {:?}", words.len, words.get(0));

        // The vector keeps doubling until the pool cannot provide a long enough run.
        let mut count = words.len;
        loop {
            match words.push(format!("word {count}")) {
                Ok(()) => count += 1,
                Err(error) => {
                    println!("Stopped after {count} words: {error}");
                    break;
                }
            }
        }
    }

    println!(
        "After dropping the vector: {} of {} slots reserved",
        pool.len(),
        pool.capacity()
    );

    // A rebound copy shares nothing with the original pool.
    let copy = pool.rebind::<u64>();
    println!("Copied pool has capacity {} and {} bytes", copy.capacity(), copy.byte_len());
    assert!(copy == pool);
}
