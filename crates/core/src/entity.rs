//! Identity shared by every stored record.

/// A record identified by its id rather than by its field values.
///
/// Stores key their tables on [`Entity::id`]; saving a record whose id is
/// already present replaces the stored one.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
