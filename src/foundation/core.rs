use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{ReelError, ReelResult};

/// One of the two fixed speaking roles of a dialogue.
///
/// Declaration order is speaking order inside a turn.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Character {
    /// First speaker of every turn; anchored bottom-right on screen.
    Stewie,
    /// Second speaker of every turn; anchored bottom-left on screen.
    Peter,
}

impl Character {
    /// All characters in in-turn speaking order.
    pub const ALL: [Character; 2] = [Character::Stewie, Character::Peter];

    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Character::Stewie => "stewie",
            Character::Peter => "peter",
        }
    }

    /// Position in [`Character::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Character {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stewie" => Ok(Character::Stewie),
            "peter" => Ok(Character::Peter),
            other => Err(ReelError::validation(format!(
                "unknown character '{other}' (available: stewie, peter)"
            ))),
        }
    }
}

/// Half-open time span `[start, end)` in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeSpan {
    /// Inclusive start in seconds.
    pub start: f64,
    /// Exclusive end in seconds.
    pub end: f64,
}

impl TimeSpan {
    /// Create a validated span with finite `start <= end`.
    pub fn new(start: f64, end: f64) -> ReelResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ReelError::validation("TimeSpan bounds must be finite"));
        }
        if start > end {
            return Err(ReelError::validation("TimeSpan start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Span length in seconds.
    pub fn duration(self) -> f64 {
        self.end - self.start
    }

    /// Return `true` when `t` is inside `[start, end)`.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Return `true` when the two half-open spans share any instant.
    pub fn overlaps(self, other: TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if den == 0 {
            return Err(ReelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Portrait 1080x1920 short-form canvas.
    pub const PORTRAIT_1080: Canvas = Canvas {
        width: 1080,
        height: 1920,
    };
}

/// How an overlay's payload is shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image, shown for the whole window.
    Image,
    /// Video clip, played from the start of the window.
    Clip,
}

const VIDEO_EXTENSIONS: [&str; 7] = [".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".mkv"];

impl MediaKind {
    /// Classify a filename by extension.
    ///
    /// Known video extensions map to [`MediaKind::Clip`]; everything else, including unknown
    /// extensions, is treated as an image.
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if VIDEO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            MediaKind::Clip
        } else {
            MediaKind::Image
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
