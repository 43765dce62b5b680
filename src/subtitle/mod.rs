//! Word-by-word caption track in Advanced SubStation Alpha (ASS) format.

use std::fmt::Write as _;

use crate::config::SubtitleStyle;
use crate::foundation::core::Canvas;
use crate::timeline::GlobalWordEntry;

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

const EVENT_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Serializes a word timeline into one caption event per word.
#[derive(Clone, Debug)]
pub struct SubtitleRenderer {
    style: SubtitleStyle,
    canvas: Canvas,
}

impl Default for SubtitleRenderer {
    fn default() -> Self {
        Self::new(SubtitleStyle::default(), Canvas::PORTRAIT_1080)
    }
}

impl SubtitleRenderer {
    /// Renderer with `style` on a `canvas`-sized script.
    pub fn new(style: SubtitleStyle, canvas: Canvas) -> Self {
        Self { style, canvas }
    }

    /// Render the full document.
    ///
    /// Events keep the order of `words`; they are not re-sorted by time. Output is deterministic
    /// for identical input.
    #[tracing::instrument(skip_all, fields(words = words.len()))]
    pub fn render(&self, words: &[GlobalWordEntry]) -> String {
        let mut doc = self.header();
        for w in words {
            // Writing to a String cannot fail.
            let _ = writeln!(
                doc,
                "Dialogue: 0,{},{},Default,,0,0,0,,{}",
                format_ass_time(w.start),
                format_ass_time(w.end),
                escape_text(&w.text)
            );
        }
        doc
    }

    fn header(&self) -> String {
        let s = &self.style;
        let mut out = String::new();
        let _ = write!(
            out,
            "[Script Info]\n\
             Title: Generated Subtitles\n\
             ScriptType: v4.00+\n\
             WrapStyle: 0\n\
             ScaledBorderAndShadow: yes\n\
             YCbCr Matrix: None\n\
             PlayResX: {}\n\
             PlayResY: {}\n\
             \n\
             [V4+ Styles]\n\
             {STYLE_FORMAT}\n\
             Style: Default,{},{},{},{},{},{},0,0,0,0,100,100,0,0,1,{},{},{},10,10,{},1\n\
             \n\
             [Events]\n\
             {EVENT_FORMAT}\n",
            self.canvas.width,
            self.canvas.height,
            s.font_name,
            s.font_size,
            s.primary_colour,
            s.secondary_colour,
            s.outline_colour,
            s.back_colour,
            s.outline,
            s.shadow,
            s.alignment,
            s.margin_v,
        );
        out
    }
}

/// Format seconds as `H:MM:SS.CC`, truncating to whole centiseconds.
///
/// Negative and non-finite inputs clamp to zero.
pub fn format_ass_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    // The epsilon absorbs representation error such as 0.29 * 100 = 28.999...
    let total_cs = (seconds * 100.0 + 1e-6).floor() as u64;
    let cs = total_cs % 100;
    let total_s = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_s / 3600,
        (total_s % 3600) / 60,
        total_s % 60,
        cs
    )
}

// Line breaks would end the event; braces open override blocks.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' | '\n' => out.push(' '),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/subtitle/ass.rs"]
mod tests;
