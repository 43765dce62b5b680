use crate::expression::ast::{Expr, RampDir};
use crate::foundation::core::TimeSpan;

/// Avatar opacity over a set of speaking intervals.
///
/// Inside each interval the value ramps 0 to 1 over `fade_in`, holds at 1, then ramps back to 0
/// over `fade_out`; outside every interval it is 0. No intervals yields the constant 0.
pub fn avatar_visibility(
    intervals: impl IntoIterator<Item = TimeSpan>,
    fade_in: f64,
    fade_out: f64,
) -> Expr {
    let terms: Vec<Expr> = intervals
        .into_iter()
        .filter(|s| s.end > s.start)
        .map(|s| faded_window(s, fade_in, fade_out))
        .collect();
    if terms.is_empty() {
        Expr::zero()
    } else {
        Expr::Sum(terms)
    }
}

fn faded_window(span: TimeSpan, fade_in: f64, fade_out: f64) -> Expr {
    let mut clamp = vec![Expr::one()];
    if fade_in > 0.0 {
        clamp.push(Expr::Ramp {
            anchor: span.start,
            len: fade_in,
            dir: RampDir::Rising,
        });
    }
    if fade_out > 0.0 {
        clamp.push(Expr::Ramp {
            anchor: span.end,
            len: fade_out,
            dir: RampDir::Falling,
        });
    }
    if clamp.len() == 1 {
        return Expr::Window(span);
    }
    Expr::Product(vec![Expr::Window(span), Expr::Min(clamp)])
}

/// Hard on/off gate for an overlay window.
pub fn window_gate(span: TimeSpan) -> Expr {
    Expr::Window(span)
}
