//! Defines the `Edge` type, representing a dependency between two nodes.

/// Describes why one node depends on another.
///
/// Edges always point from the producer to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    /// The consumer's computation takes the producer's value as an input.
    /// Example: `b = f(a)`. `a` is a dependency of `b`.
    Dependency,
    /// A validator attached to the consumer needs the producer's value,
    /// although the consumer's computation does not.
    /// Example: a drift check on `revenue` that compares against `revenue_last_run`.
    ValidatorDependency,
}
