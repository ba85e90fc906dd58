//! Fixed-capacity generational table.
//!
//! Pairs a [`SlotAllocator`] with payload storage sized once at construction.
//! A free slot holds `None`; the table never reallocates, so slot memory stays
//! where it was for the lifetime of the table.

use crate::error::{Error, Result};
use super::{Handle, SlotAllocator};

/// Generational table of `T` addressed by `Handle<T>`
pub struct SlotTable<T> {
    /// Human readable table name used in error messages ("asset", "instance", ...)
    label: &'static str,
    allocator: SlotAllocator,
    entries: Vec<Option<T>>,
}

impl<T> SlotTable<T> {
    /// Create a table holding at most `capacity` entries
    pub fn new(label: &'static str, capacity: u32) -> Self {
        let mut entries = Vec::with_capacity(capacity as usize);
        entries.resize_with(capacity as usize, || None);
        Self {
            label,
            allocator: SlotAllocator::new(capacity),
            entries,
        }
    }

    /// Insert a value built from its own handle
    pub fn insert_with(&mut self, build: impl FnOnce(Handle<T>) -> T) -> Result<Handle<T>> {
        let (slot, generation) = self.allocator.alloc().map_err(|_| {
            Error::OutOfCapacity(format!(
                "{} table is full ({} entries)", self.label, self.allocator.capacity()
            ))
        })?;
        let handle = Handle::from_slot(slot, generation);
        self.entries[slot as usize] = Some(build(handle));
        Ok(handle)
    }

    /// Insert a value
    pub fn insert(&mut self, value: T) -> Result<Handle<T>> {
        self.insert_with(|_| value)
    }

    /// Whether `handle` refers to the current occupant of its slot
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.live_slot(handle).is_some()
    }

    /// Get the entry for `handle`
    pub fn get(&self, handle: Handle<T>) -> Result<&T> {
        let slot = self.validate(handle)?;
        self.entries[slot].as_ref().ok_or_else(|| self.stale(handle))
    }

    /// Get the entry for `handle` mutably
    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T> {
        let slot = self.validate(handle)?;
        let label = self.label;
        self.entries[slot].as_mut().ok_or_else(|| stale_error(label, handle))
    }

    /// Remove the entry, zeroing its slot and returning it to the free list
    pub fn remove(&mut self, handle: Handle<T>) -> Result<T> {
        let slot = self.validate(handle)?;
        let value = self.entries[slot].take().ok_or_else(|| self.stale(handle))?;
        self.allocator.free(slot as u32);
        Ok(value)
    }

    /// Handles of every live entry, in dense (unordered) order
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.allocator
            .live_slots()
            .iter()
            .filter_map(|&slot| {
                self.allocator
                    .generation(slot)
                    .map(|generation| Handle::from_slot(slot, generation))
            })
            .collect()
    }

    /// Iterate live entries without touching free slots
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.allocator.live_slots().iter().filter_map(move |&slot| {
            let generation = self.allocator.generation(slot)?;
            let entry = self.entries[slot as usize].as_ref()?;
            Some((Handle::from_slot(slot, generation), entry))
        })
    }

    /// Number of live entries
    pub fn len(&self) -> u32 {
        self.allocator.len()
    }

    /// Whether the table has no live entries
    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
    }

    /// Maximum number of live entries
    pub fn capacity(&self) -> u32 {
        self.allocator.capacity()
    }

    fn live_slot(&self, handle: Handle<T>) -> Option<usize> {
        let slot = handle.slot()?;
        self.allocator
            .is_live(slot, handle.generation())
            .then_some(slot as usize)
    }

    fn validate(&self, handle: Handle<T>) -> Result<usize> {
        self.live_slot(handle).ok_or_else(|| self.stale(handle))
    }

    fn stale(&self, handle: Handle<T>) -> Error {
        stale_error(self.label, handle)
    }
}

fn stale_error<T>(label: &str, handle: Handle<T>) -> Error {
    Error::InvalidHandle(format!("{} handle {:?} is stale or out of range", label, handle))
}

#[cfg(test)]
#[path = "slot_table_tests.rs"]
mod tests;
