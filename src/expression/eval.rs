use crate::expression::ast::{Expr, RampDir};

impl Expr {
    /// Evaluate at time `t`, with the same semantics the renderer applies to [`Expr::emit`].
    pub fn eval(&self, t: f64) -> f64 {
        match self {
            Expr::Const(c) => *c,
            Expr::Window(span) => {
                if span.contains(t) {
                    1.0
                } else {
                    0.0
                }
            }
            Expr::Ramp { anchor, len, dir } => match dir {
                RampDir::Rising => (t - anchor) / len,
                RampDir::Falling => (anchor - t) / len,
            },
            Expr::Min(args) => args
                .iter()
                .map(|a| a.eval(t))
                .reduce(f64::min)
                .unwrap_or(0.0),
            Expr::Product(factors) => factors.iter().map(|f| f.eval(t)).product(),
            Expr::Sum(terms) => terms.iter().map(|x| x.eval(t)).sum(),
        }
    }
}
