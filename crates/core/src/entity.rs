//! Entity trait: identity that survives state changes.

/// Entity marker + minimal interface.
///
/// Entities are persisted records; their identifier is assigned by the store
/// and never changes afterwards.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
