//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Departments and training validity periods are value objects: two values
/// with the same attributes are interchangeable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
