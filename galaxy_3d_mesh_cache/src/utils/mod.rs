//! Generic building blocks shared by every table of the cache.

mod handle;
mod slot_allocator;
mod slot_table;

pub use handle::Handle;
pub use slot_allocator::SlotAllocator;
pub use slot_table::SlotTable;
