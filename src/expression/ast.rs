use crate::foundation::core::TimeSpan;

/// Direction of a linear [`Expr::Ramp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RampDir {
    /// `(t - anchor) / len`: 0 at the anchor, growing afterwards.
    Rising,
    /// `(anchor - t) / len`: 0 at the anchor, growing before it.
    Falling,
}

/// Scalar function of render time `t`.
///
/// Avatar and overlay visibility are sums of gated, clamped ramps.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Constant value.
    Const(f64),
    /// 1 inside `[start, end)`, else 0.
    Window(TimeSpan),
    /// Unbounded linear ramp; clamp with [`Expr::Min`].
    Ramp {
        /// Time at which the ramp is 0.
        anchor: f64,
        /// Seconds to reach 1.
        len: f64,
        /// Which side of the anchor grows.
        dir: RampDir,
    },
    /// Smallest operand.
    Min(Vec<Expr>),
    /// Product of the operands.
    Product(Vec<Expr>),
    /// Sum of the operands.
    Sum(Vec<Expr>),
}

impl Expr {
    /// Constant 0.
    pub fn zero() -> Self {
        Expr::Const(0.0)
    }

    /// Constant 1.
    pub fn one() -> Self {
        Expr::Const(1.0)
    }

    /// `true` for a constant node equal to zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(c) if *c == 0.0)
    }
}
