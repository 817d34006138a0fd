//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two quantities of
/// `5` are the same quantity. To "modify" one, build a new one.
///
/// The trait requires `Clone`, `PartialEq` and `Debug` so value objects behave
/// like primitives in tests and logs.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
