use crate::error::{Error, Result};

/// Sentinel stored in `live_positions` for unoccupied slots
const NOT_LIVE: u32 = u32::MAX;

/// Allocates and recycles slot indices inside a fixed capacity.
///
/// Freed indices go to a LIFO free list and are recycled before the
/// high-water mark grows. Every allocation draws a fresh generation from a
/// global counter, so a recycled slot always carries a strictly greater
/// generation than its previous occupant.
///
/// Live slots are also tracked in a dense array (`live_slots`) kept compact
/// by swap-remove, so iterating active entries costs O(live), not O(capacity).
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new(4);
/// let (a, gen_a) = alloc.alloc()?;  // slot 0
/// let (b, _) = alloc.alloc()?;      // slot 1
/// alloc.free(a);                    // 0 is now available
/// let (c, gen_c) = alloc.alloc()?;  // slot 0 (recycled), gen_c > gen_a
/// ```
pub struct SlotAllocator {
    capacity: u32,
    free_list: Vec<u32>,
    next_id: u32,
    /// Generation of the current occupant per slot (0 = free)
    generations: Vec<u32>,
    generation_counter: u32,
    /// Dense array of live slot indices
    live: Vec<u32>,
    /// Slot -> position in `live` (NOT_LIVE when free)
    live_positions: Vec<u32>,
}

impl SlotAllocator {
    /// Create an allocator able to hold `capacity` live slots
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            free_list: Vec::new(),
            next_id: 0,
            generations: vec![0; capacity as usize],
            generation_counter: 0,
            live: Vec::with_capacity(capacity as usize),
            live_positions: vec![NOT_LIVE; capacity as usize],
        }
    }

    /// Allocate the next available slot, returning `(slot, generation)`.
    ///
    /// Fails with `OutOfCapacity` when every slot is live, or once the
    /// generation counter has reached `u32::MAX` (generations never repeat).
    pub fn alloc(&mut self) -> Result<(u32, u32)> {
        let Some(generation) = self.generation_counter.checked_add(1) else {
            return Err(Error::OutOfCapacity(format!(
                "generation counter exhausted after {} allocations", u32::MAX
            )));
        };

        let slot = match self.free_list.pop() {
            Some(slot) => slot,
            None => {
                if self.next_id >= self.capacity {
                    return Err(Error::OutOfCapacity(format!(
                        "all {} slots are in use", self.capacity
                    )));
                }
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        };

        self.generation_counter = generation;

        self.generations[slot as usize] = generation;
        self.live_positions[slot as usize] = self.live.len() as u32;
        self.live.push(slot);
        Ok((slot, generation))
    }

    /// Return a slot to the pool for reuse. Returns false if it was not live.
    pub fn free(&mut self, slot: u32) -> bool {
        let Some(position) = self.live_positions.get(slot as usize).copied() else {
            return false;
        };
        if position == NOT_LIVE {
            return false;
        }

        // Swap-remove from the dense live array and patch the moved slot
        self.live.swap_remove(position as usize);
        if let Some(&moved) = self.live.get(position as usize) {
            self.live_positions[moved as usize] = position;
        }

        self.live_positions[slot as usize] = NOT_LIVE;
        self.generations[slot as usize] = 0;
        self.free_list.push(slot);
        true
    }

    /// Whether `slot` is occupied by the occupant with `generation`
    pub fn is_live(&self, slot: u32, generation: u32) -> bool {
        generation != 0 && self.generation(slot) == Some(generation)
    }

    /// Generation of the current occupant of `slot`, None if free or out of range
    pub fn generation(&self, slot: u32) -> Option<u32> {
        match self.generations.get(slot as usize) {
            Some(&0) | None => None,
            Some(&generation) => Some(generation),
        }
    }

    /// Dense list of live slots (order changes on free)
    pub fn live_slots(&self) -> &[u32] {
        &self.live
    }

    /// Highest index ever allocated + 1
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Maximum number of simultaneously live slots
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.live.len() as u32
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
