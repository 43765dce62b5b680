//! Time-dependent visibility expressions.
//!
//! Avatar fades and overlay gates are built as a small [`Expr`] tree, evaluated in tests with
//! [`Expr::eval`] and serialized once with [`Expr::emit`] into the renderer's expression syntax.

/// Expression tree.
pub mod ast;
/// Serialization into the renderer's expression syntax.
pub mod emit;
/// Evaluation at a point in time.
pub mod eval;
/// Avatar and overlay visibility builders.
pub mod visibility;

pub use ast::{Expr, RampDir};
pub use emit::TimeVar;
pub use visibility::{avatar_visibility, window_gate};

#[cfg(test)]
#[path = "../../tests/unit/expression/visibility.rs"]
mod tests;
