//! Pipeline configuration.
//!
//! Every field has a default matching the production layout (portrait 1080x1920 at 30fps,
//! 0.2s inter-line gap, 0.05s avatar fades), so an empty JSON object is a valid config.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Character, Fps};
use crate::foundation::error::{ReelError, ReelResult};

/// Top-level configuration for one [`crate::DialogueRenderer`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Clip sequencing.
    pub timeline: TimelineConfig,
    /// Avatar layer.
    pub avatar: AvatarConfig,
    /// Overlay placement and media limits.
    pub overlay: OverlayConfig,
    /// Caption styling.
    pub subtitle: SubtitleStyle,
    /// Output encoding.
    pub output: OutputConfig,
    /// Static assets on disk.
    pub assets: AssetConfig,
    /// External renderer invocation.
    pub renderer: RendererConfig,
    /// Word alignment.
    pub alignment: AlignmentConfig,
}

impl PipelineConfig {
    /// Load a config from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: PipelineConfig = serde_json::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check numeric ranges that would otherwise produce a broken filter graph.
    pub fn validate(&self) -> ReelResult<()> {
        for (name, v) in [
            ("timeline.gap_sec", self.timeline.gap_sec),
            ("timeline.trailing_pad_sec", self.timeline.trailing_pad_sec),
            ("avatar.fade_in_sec", self.avatar.fade_in_sec),
            ("avatar.fade_out_sec", self.avatar.fade_out_sec),
            ("overlay.default_start_sec", self.overlay.default_start_sec),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ReelError::validation(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        for (name, v) in [
            ("timeline.min_duration_sec", self.timeline.min_duration_sec),
            (
                "overlay.default_image_duration_sec",
                self.overlay.default_image_duration_sec,
            ),
            (
                "overlay.default_clip_duration_sec",
                self.overlay.default_clip_duration_sec,
            ),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(ReelError::validation(format!(
                    "{name} must be finite and > 0"
                )));
            }
        }
        if self.output.canvas.width == 0 || self.output.canvas.height == 0 {
            return Err(ReelError::validation("output canvas width/height must be > 0"));
        }
        if !self.output.canvas.width.is_multiple_of(2) || !self.output.canvas.height.is_multiple_of(2)
        {
            return Err(ReelError::validation(
                "output canvas width/height must be even (required for yuv420p output)",
            ));
        }
        if self.output.fps.num == 0 || self.output.fps.den == 0 {
            return Err(ReelError::validation("output fps must have num>0 and den>0"));
        }
        if self.avatar.height_px == 0 || self.overlay.width_px == 0 {
            return Err(ReelError::validation(
                "avatar height and overlay width must be > 0",
            ));
        }
        if self.renderer.program.trim().is_empty() {
            return Err(ReelError::validation("renderer.program must be non-empty"));
        }
        Ok(())
    }
}

/// Clip sequencing constants.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Silence between consecutive lines.
    pub gap_sec: f64,
    /// Silence appended after the last line.
    pub trailing_pad_sec: f64,
    /// Duration used when no line was spoken at all.
    pub min_duration_sec: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            gap_sec: 0.2,
            trailing_pad_sec: 1.0,
            min_duration_sec: 1.0,
        }
    }
}

/// Avatar overlay layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Fade-in ramp at the start of every speaking interval.
    pub fade_in_sec: f64,
    /// Fade-out ramp at the end of every speaking interval.
    pub fade_out_sec: f64,
    /// Avatars are scaled to this height, keeping aspect ratio.
    pub height_px: u32,
    /// How the visibility expression is applied to the avatar layer.
    pub blend: AvatarBlend,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            fade_in_sec: 0.05,
            fade_out_sec: 0.05,
            height_px: 700,
            blend: AvatarBlend::Alpha,
        }
    }
}

/// Avatar layer blending.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarBlend {
    /// The expression scales the avatar's alpha channel, so fades are visible.
    #[default]
    Alpha,
    /// The expression only gates the overlay on and off; cheaper, fades collapse to cuts.
    Gate,
}

/// How a trigger word picks between repeated occurrences.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMatch {
    /// First occurrence in the whole conversation.
    #[default]
    First,
    /// First occurrence inside the turn that declared the overlay, else [`TriggerMatch::First`].
    NearestInTurn,
}

/// Overlay placement and media size policy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Window length for images without an explicit duration.
    pub default_image_duration_sec: f64,
    /// Window length for clips without an explicit duration.
    pub default_clip_duration_sec: f64,
    /// Start used when neither a trigger match nor an explicit start exists.
    pub default_start_sec: f64,
    /// Trigger word matching strategy.
    pub trigger_match: TriggerMatch,
    /// Decoded images above this size are skipped.
    pub max_image_bytes: usize,
    /// Decoded clips above this size are skipped.
    pub max_clip_bytes: usize,
    /// Overlays are scaled to this width, keeping aspect ratio.
    pub width_px: u32,
    /// Distance from the top of the frame.
    pub top_px: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            default_image_duration_sec: 3.0,
            default_clip_duration_sec: 10.0,
            default_start_sec: 1.0,
            trigger_match: TriggerMatch::First,
            max_image_bytes: 10 * 1024 * 1024,
            max_clip_bytes: 50 * 1024 * 1024,
            width_px: 600,
            top_px: 100,
        }
    }
}

/// Caption style written into the subtitle header.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    /// Font family.
    pub font_name: String,
    /// Font size in script pixels.
    pub font_size: u32,
    /// Fill colour, `&HAABBGGRR`.
    pub primary_colour: String,
    /// Karaoke colour, `&HAABBGGRR`.
    pub secondary_colour: String,
    /// Outline colour, `&HAABBGGRR`.
    pub outline_colour: String,
    /// Shadow colour, `&HAABBGGRR`.
    pub back_colour: String,
    /// Outline width.
    pub outline: u32,
    /// Shadow depth.
    pub shadow: u32,
    /// Numpad-style alignment; 2 is bottom-centre.
    pub alignment: u8,
    /// Vertical margin from the anchored edge.
    pub margin_v: u32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial Black".to_string(),
            font_size: 140,
            primary_colour: "&H00FFFFFF".to_string(),
            secondary_colour: "&H000000FF".to_string(),
            outline_colour: "&H00000000".to_string(),
            back_colour: "&H00000000".to_string(),
            outline: 8,
            shadow: 3,
            alignment: 2,
            margin_v: 300,
        }
    }
}

/// Output stream settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output resolution.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Video encoder.
    pub video_codec: String,
    /// Encoder preset.
    pub preset: String,
    /// Constant rate factor.
    pub crf: u8,
    /// Audio encoder.
    pub audio_codec: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::PORTRAIT_1080,
            fps: Fps { num: 30, den: 1 },
            video_codec: "libx264".to_string(),
            preset: "slow".to_string(),
            crf: 18,
            audio_codec: "aac".to_string(),
        }
    }
}

/// Static assets that must exist before a request starts.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Looping background footage.
    pub background_video: PathBuf,
    /// Avatar for [`Character::Stewie`].
    pub stewie_avatar: PathBuf,
    /// Avatar for [`Character::Peter`].
    pub peter_avatar: PathBuf,
}

impl AssetConfig {
    /// Avatar image path for `character`.
    pub fn avatar(&self, character: Character) -> &Path {
        match character {
            Character::Stewie => &self.stewie_avatar,
            Character::Peter => &self.peter_avatar,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        let root = PathBuf::from("public").join("content");
        Self {
            background_video: root.join("subwaysurfers.mp4"),
            stewie_avatar: root.join("stewie.png"),
            peter_avatar: root.join("peter.png"),
        }
    }
}

/// External renderer invocation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Executable name or path.
    pub program: String,
    /// Parent directory for per-request scratch directories; system temp dir when unset.
    pub temp_root: Option<PathBuf>,
    /// Arguments placed before the generated ones, for wrappers such as `nice` or `sh -c`.
    pub leading_args: Vec<String>,
    /// Insert silence of `timeline.gap_sec` between clips when concatenating audio.
    pub pad_audio_gaps: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            temp_root: None,
            leading_args: Vec::new(),
            pad_audio_gaps: true,
        }
    }
}

/// Word alignment settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Spoken language passed to the alignment engine.
    pub language: String,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
