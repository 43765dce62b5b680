use crate::expression::ast::{Expr, RampDir};

/// Time variable name in the renderer's expression language.
///
/// Timeline `enable` options read `t`; per-pixel `geq` expressions read `T`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeVar {
    /// `t`, for `enable` options.
    Enable,
    /// `T`, for `geq`.
    Pixel,
}

impl TimeVar {
    fn as_str(self) -> &'static str {
        match self {
            TimeVar::Enable => "t",
            TimeVar::Pixel => "T",
        }
    }
}

impl Expr {
    /// Serialize to the renderer's expression syntax.
    ///
    /// The output contains commas, so it must be quoted when embedded in a filter graph.
    pub fn emit(&self, var: TimeVar) -> String {
        let mut out = String::new();
        emit_into(self, var.as_str(), &mut out);
        out
    }
}

fn emit_into(expr: &Expr, t: &str, out: &mut String) {
    match expr {
        Expr::Const(c) => out.push_str(&fmt_num(*c)),
        Expr::Window(span) => {
            out.push_str(&format!(
                "gte({t},{})*lt({t},{})",
                fmt_num(span.start),
                fmt_num(span.end)
            ));
        }
        Expr::Ramp { anchor, len, dir } => {
            let a = fmt_num(*anchor);
            let l = fmt_num(*len);
            match dir {
                RampDir::Rising => out.push_str(&format!("({t}-{a})/{l}")),
                RampDir::Falling => out.push_str(&format!("({a}-{t})/{l}")),
            }
        }
        Expr::Min(args) => match args.as_slice() {
            [] => out.push('0'),
            [only] => emit_into(only, t, out),
            [first, rest @ ..] => {
                out.push_str("min(");
                emit_into(first, t, out);
                out.push(',');
                emit_into(&Expr::Min(rest.to_vec()), t, out);
                out.push(')');
            }
        },
        Expr::Product(factors) => {
            if factors.is_empty() {
                out.push('1');
                return;
            }
            for (i, f) in factors.iter().enumerate() {
                if i > 0 {
                    out.push('*');
                }
                let wrap = matches!(f, Expr::Sum(terms) if terms.len() > 1);
                if wrap {
                    out.push('(');
                }
                emit_into(f, t, out);
                if wrap {
                    out.push(')');
                }
            }
        }
        Expr::Sum(terms) => {
            if terms.is_empty() {
                out.push('0');
                return;
            }
            for (i, term) in terms.iter().enumerate() {
                if i > 0 {
                    out.push('+');
                }
                emit_into(term, t, out);
            }
        }
    }
}

/// Shortest decimal form with at most 6 fractional digits; negatives are parenthesised.
pub(crate) fn fmt_num(v: f64) -> String {
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        s if s.starts_with('-') => format!("({s})"),
        s => s.to_string(),
    }
}
