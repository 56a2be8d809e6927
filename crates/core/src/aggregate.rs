//! Aggregate root trait.

use crate::id::Identifier;

/// Aggregate root marker + minimal interface.
///
/// An aggregate is the unit that gets loaded, transformed in memory and
/// persisted back as a whole. Aggregates must not perform IO.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Identifier;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;
}
