//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Checklist tasks, qualification records and audit rows are entities: they
/// are addressed by id but are not versioned aggregate roots.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
