//! Typed generational handles.
//!
//! A handle is `(id, generation)` where `id = slot index + 1`. An id of zero is
//! never issued, so a default handle is always invalid. The generation must match
//! the one stored in the slot; a freed and reused slot carries a strictly greater
//! generation, which makes stale handles detectable.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed `(id, generation)` reference into a slot table.
///
/// The type parameter only tags the handle; it does not own or borrow a `T`.
pub struct Handle<T> {
    id: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The null handle (id 0)
    pub const INVALID: Self = Self { id: 0, generation: 0, _marker: PhantomData };

    /// Build a handle from raw parts (used by collaborators issuing their own handles)
    pub const fn from_raw(id: u32, generation: u32) -> Self {
        Self { id, generation, _marker: PhantomData }
    }

    /// Build a handle for a zero-based slot index
    pub(crate) fn from_slot(slot: u32, generation: u32) -> Self {
        Self::from_raw(slot + 1, generation)
    }

    /// Slot id (slot index + 1, 0 = invalid)
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Generation of the occupant this handle was issued for
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Zero-based slot index, None for the null handle
    pub fn slot(&self) -> Option<u32> {
        self.id.checked_sub(1)
    }

    /// Whether this handle could ever refer to something (id != 0)
    pub fn is_valid(&self) -> bool {
        self.id != 0
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.generation.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.id, self.generation)
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
