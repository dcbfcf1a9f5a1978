//! Error types for the reactive kernel.
//!
//! Every fallible operation returns [`ReactiveError`]. None of these are
//! fatal: they describe an operation the kernel refused to perform, and the
//! state it guards is left as it was before the call.

use thiserror::Error;

/// Errors reported by reactive primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A signal was accessed through a property other than `value`.
    #[error("signal has no property `{property}` (only `value` is accessible)")]
    InvalidProperty { property: String },

    /// Reentrant notification on one cell exceeded the configured depth.
    #[error("reentrant write storm on cell {cell}: depth {depth} exceeds the configured limit")]
    ReentrantWriteStorm { cell: u64, depth: usize },

    /// An object graph contains (or an assignment would create) a cycle.
    #[error("object graph contains a cycle through node {node}")]
    CyclicGraph { node: u64 },

    /// Assignment to a frozen node.
    #[error("cannot assign `{key}`: node {node} is frozen")]
    FrozenTarget { node: u64, key: String },

    /// The key cannot address a node of this kind.
    #[error("key `{key}` cannot address an {kind} node")]
    InvalidKey { key: String, kind: &'static str },

    /// A hook slot was revisited with a different type than it was created with.
    #[error("hook slot {index} was created with a different type; hooks must be called in the same order every render")]
    HookOrder { index: usize },

    /// Configuration could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;
