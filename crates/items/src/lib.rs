//! Item domain module.
//!
//! Business rules for items (validation, partial updates, timestamp
//! bookkeeping), implemented as pure domain logic (no IO, no HTTP, no storage).

pub mod item;

pub use item::{Item, ItemChanges, ItemName, NewItem, NAME_MAX_CHARS};
