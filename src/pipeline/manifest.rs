//! On-disk description of an already synthesized dialogue, used by the CLI.
//!
//! ```json
//! {
//!   "turns": [
//!     {
//!       "lines": [{ "character": "stewie", "text": "look at this", "wav": "clips/0.wav" }],
//!       "overlays": [{ "filename": "cat.png", "triggerWord": "this" }]
//!     }
//!   ],
//!   "media": ["media/cat.png"]
//! }
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use base64::{Engine as _, engine::general_purpose};

use crate::config::OverlayConfig;
use crate::foundation::core::{Character, MediaKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::overlay::{DecodedMedia, MediaFile, OverlaySpec, decode_media_files};
use crate::timeline::AudioClip;

/// A dialogue whose lines were synthesized ahead of time.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderManifest {
    /// Turns in speaking order.
    pub turns: Vec<ManifestTurn>,
    /// Media files referenced by overlays, matched by file name.
    #[serde(default)]
    pub media: Vec<PathBuf>,
}

/// One turn of a manifest.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ManifestTurn {
    /// Spoken lines in speaking order.
    #[serde(default)]
    pub lines: Vec<ManifestLine>,
    /// Overlays declared by the turn.
    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,
}

/// A pre-synthesized line.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ManifestLine {
    /// Speaker.
    pub character: Character,
    /// Source text, used for captions and triggers.
    pub text: String,
    /// WAV file holding the spoken line.
    pub wav: PathBuf,
}

/// Clips, overlay specs per turn, and media loaded from a manifest.
#[derive(Debug)]
pub struct PreparedDialogue {
    /// Clips in speaking order.
    pub clips: Vec<AudioClip>,
    /// Overlay specs of each turn.
    pub overlays: Vec<Vec<OverlaySpec>>,
    /// Decoded media by file name.
    pub media: DecodedMedia,
}

impl PreparedDialogue {
    /// Overlay specs per turn, as the renderer consumes them.
    pub fn overlay_turns(&self) -> impl Iterator<Item = &[OverlaySpec]> + '_ {
        self.overlays.iter().map(Vec::as_slice)
    }
}

impl RenderManifest {
    /// Parse a manifest file; it must declare at least one turn.
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read manifest '{}'", path.display()))?;
        let manifest: Self = serde_json::from_str(&text)?;
        if manifest.turns.is_empty() {
            return Err(ReelError::validation("manifest has no turns"));
        }
        Ok(manifest)
    }

    /// Read every WAV and media file. Clip durations come from the WAV headers.
    pub async fn load(&self, base: &Path, overlay: &OverlayConfig) -> ReelResult<PreparedDialogue> {
        let mut clips = Vec::new();
        for (turn, t) in self.turns.iter().enumerate() {
            for line in &t.lines {
                let path = base.join(&line.wav);
                let wav = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("read clip '{}'", path.display()))?;
                clips.push(AudioClip::from_wav(wav, line.character, line.text.trim(), turn)?);
            }
        }

        let mut files = Vec::with_capacity(self.media.len());
        for rel in &self.media {
            let path = base.join(rel);
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("read media '{}'", path.display()))?;
            let filename = rel
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| ReelError::validation(format!("media path '{}' has no file name", rel.display())))?;
            let kind = match MediaKind::from_filename(&filename) {
                MediaKind::Image => "image",
                MediaKind::Clip => "video",
            };
            files.push(MediaFile {
                data: general_purpose::STANDARD.encode(&bytes),
                mime_type: None,
                kind: kind.to_string(),
                filename,
            });
        }

        Ok(PreparedDialogue {
            clips,
            overlays: self.turns.iter().map(|t| t.overlays.clone()).collect(),
            media: decode_media_files(&files, overlay),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/manifest.rs"]
mod tests;
