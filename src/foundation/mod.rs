//! Shared vocabulary: characters, time spans, errors, and the lazy model registry.

/// Shared value types.
pub mod core;
/// Error type and result alias.
pub mod error;
/// Load-once model registry.
pub mod registry;
