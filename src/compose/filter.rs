use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::compose::plan::ArtifactId;
use crate::expression::emit::fmt_num;
use crate::expression::{Expr, TimeVar};
use crate::foundation::error::{ReelError, ReelResult};

/// Stream consumed by a filter chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamRef {
    /// Video stream of a declared input, `[N:v]`.
    InputVideo(usize),
    /// Intermediate produced by an earlier chain.
    Label(String),
}

impl StreamRef {
    /// Reference to the intermediate named `name`.
    pub fn label(name: impl Into<String>) -> Self {
        StreamRef::Label(name.into())
    }
}

/// One filter in a chain.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// `scale=W:H`; `-1` keeps the aspect ratio.
    Scale {
        /// Target width in pixels.
        width: i32,
        /// Target height in pixels.
        height: i32,
    },
    /// `format=<pix_fmt>`.
    Format(&'static str),
    /// Multiply the alpha channel by a time expression.
    AlphaMask(Expr),
    /// Shift timestamps so the first frame lands at `offset` seconds.
    Retime {
        /// Start of the stream in composition seconds.
        offset: f64,
    },
    /// Draw the second input over the first.
    Overlay {
        /// Horizontal position expression.
        x: String,
        /// Vertical position expression.
        y: String,
        /// Time gate; always drawn when `None`.
        enable: Option<Expr>,
    },
    /// Burn a subtitle track.
    Subtitles(ArtifactId),
}

/// `[in...]filter,filter[out]`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterOp {
    /// Streams fed into the chain, in pad order.
    pub inputs: Vec<StreamRef>,
    /// Filters applied in order.
    pub chain: Vec<Filter>,
    /// Label of the produced stream.
    pub output: String,
}

impl FilterOp {
    /// Chain `chain` from `inputs` into the label `output`.
    pub fn new(inputs: Vec<StreamRef>, chain: Vec<Filter>, output: impl Into<String>) -> Self {
        Self {
            inputs,
            chain,
            output: output.into(),
        }
    }

    pub(crate) fn render(&self, out: &mut String, artifacts: &[PathBuf]) -> ReelResult<()> {
        for input in &self.inputs {
            match input {
                StreamRef::InputVideo(i) => {
                    let _ = write!(out, "[{i}:v]");
                }
                StreamRef::Label(l) => {
                    let _ = write!(out, "[{l}]");
                }
            }
        }
        for (i, f) in self.chain.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            render_filter(f, out, artifacts)?;
        }
        let _ = write!(out, "[{}]", self.output);
        Ok(())
    }
}

fn render_filter(f: &Filter, out: &mut String, artifacts: &[PathBuf]) -> ReelResult<()> {
    match f {
        Filter::Scale { width, height } => {
            let _ = write!(out, "scale={width}:{height}");
        }
        Filter::Format(pix) => {
            let _ = write!(out, "format={pix}");
        }
        Filter::AlphaMask(expr) => {
            let _ = write!(
                out,
                "geq=r='r(X,Y)':g='g(X,Y)':b='b(X,Y)':a='alpha(X,Y)*({})'",
                expr.emit(TimeVar::Pixel)
            );
        }
        Filter::Retime { offset } => {
            let _ = write!(out, "setpts=PTS-STARTPTS+{}/TB", fmt_num(*offset));
        }
        Filter::Overlay { x, y, enable } => {
            let _ = write!(out, "overlay={x}:{y}");
            if let Some(e) = enable {
                let _ = write!(out, ":enable='{}'", e.emit(TimeVar::Enable));
            }
        }
        Filter::Subtitles(id) => {
            let path = artifacts.get(id.0).ok_or_else(|| {
                ReelError::validation(format!("subtitle artifact #{} was not materialized", id.0))
            })?;
            let _ = write!(out, "subtitles={}", quote_filter_path(path)?);
        }
    }
    Ok(())
}

/// Quote a path for use as a filter option value.
///
/// Filter arguments are unescaped twice: once by the graph parser, which strips the single
/// quotes, and once by the option parser, where `:` separates options. Backslashes and colons
/// are escaped for the inner level and the whole value is quoted for the outer one. A single
/// quote cannot be expressed inside the outer quotes, so such paths are rejected.
pub fn quote_filter_path(path: &Path) -> ReelResult<String> {
    let s = path.to_string_lossy();
    if s.contains('\'') {
        return Err(ReelError::validation(format!(
            "path '{}' contains a single quote and cannot be used in a filter graph",
            path.display()
        )));
    }
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        if matches!(c, '\\' | ':') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    Ok(quoted)
}
