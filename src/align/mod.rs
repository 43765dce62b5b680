//! Word timing for synthesized clips.
//!
//! [`WordAligner`] asks an optional [`AlignmentEngine`] for word offsets and degrades to an even
//! split of the source text whenever the engine is missing, fails, or reports nothing. Alignment
//! problems therefore only lower caption precision; they never fail a render.

/// Alignment engine trait and the lazily loaded engine.
pub mod engine;

use std::sync::Arc;

use crate::config::AlignmentConfig;
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::clip::{AudioClip, TimedWord};

pub use engine::{AlignedSegment, AlignedWord, AlignmentEngine, LazyAlignmentEngine};

const TRIGGER_PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];

/// Produces clip-relative word timings.
#[derive(Clone)]
pub struct WordAligner {
    engine: Option<Arc<dyn AlignmentEngine>>,
    language: String,
}

impl std::fmt::Debug for WordAligner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordAligner")
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field("language", &self.language)
            .finish()
    }
}

impl WordAligner {
    /// Aligner backed by `engine`.
    pub fn new(engine: Arc<dyn AlignmentEngine>, language: impl Into<String>) -> Self {
        Self {
            engine: Some(engine),
            language: language.into(),
        }
    }

    /// Aligner backed by `engine`, speaking the configured language.
    pub fn from_config(engine: Arc<dyn AlignmentEngine>, cfg: &AlignmentConfig) -> Self {
        Self::new(engine, cfg.language.clone())
    }

    /// Aligner without an engine; every clip uses the even split.
    pub fn unavailable() -> Self {
        Self {
            engine: None,
            language: AlignmentConfig::default().language,
        }
    }

    /// Language passed to the engine.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Whether an engine is installed.
    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Name of the installed engine, if any.
    pub fn engine_name(&self) -> Option<&str> {
        self.engine.as_deref().map(|e| e.name())
    }

    /// Whether the engine's model is ready. `false` without an engine.
    pub async fn is_loaded(&self) -> bool {
        match &self.engine {
            Some(engine) => engine.is_loaded().await,
            None => false,
        }
    }

    /// Word timings for `clip`. Never fails.
    #[tracing::instrument(skip(self, clip), fields(character = %clip.character, turn = clip.turn))]
    pub async fn align(&self, clip: &AudioClip) -> Vec<TimedWord> {
        let Some(engine) = &self.engine else {
            tracing::debug!("no alignment engine installed, splitting evenly");
            return even_split(&clip.text, clip.duration);
        };

        match engine.align(&clip.audio, &clip.text, &self.language).await {
            Ok(segments) => {
                let words = flatten_segments(segments);
                if words.is_empty() {
                    tracing::warn!(engine = engine.name(), "alignment returned no words, splitting evenly");
                    even_split(&clip.text, clip.duration)
                } else {
                    words
                }
            }
            Err(err) => {
                tracing::warn!(engine = engine.name(), error = %err, "alignment failed, splitting evenly");
                even_split(&clip.text, clip.duration)
            }
        }
    }

    /// Word timings straight from the engine, without fallback.
    ///
    /// Used by the caption-only operation, where a missing engine is an error.
    pub async fn align_strict(&self, audio: &[u8], text: &str) -> ReelResult<Vec<TimedWord>> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| ReelError::alignment("no alignment engine is installed"))?;
        let segments = engine
            .align(audio, text, &self.language)
            .await
            .map_err(|e| match e {
                ReelError::Alignment(_) => e,
                other => ReelError::alignment(other.to_string()),
            })?;
        Ok(flatten_segments(segments))
    }
}

fn flatten_segments(segments: Vec<AlignedSegment>) -> Vec<TimedWord> {
    segments
        .into_iter()
        .flat_map(|s| s.words)
        .filter_map(|w| {
            let text = w.text.trim();
            if text.is_empty() || !w.start.is_finite() || !w.end.is_finite() {
                return None;
            }
            let start = w.start.max(0.0);
            Some(TimedWord {
                text: text.to_string(),
                start,
                end: w.end.max(start),
            })
        })
        .collect()
}

/// Split `text` on whitespace into words of equal length covering `[0, duration)`.
pub fn even_split(text: &str, duration: f64) -> Vec<TimedWord> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let step = duration / words.len() as f64;
    words
        .into_iter()
        .enumerate()
        .map(|(i, w)| TimedWord {
            text: w.to_string(),
            start: i as f64 * step,
            end: (i + 1) as f64 * step,
        })
        .collect()
}

/// Trigger word as written by the caller: trimmed, lowercase.
pub fn normalize_trigger(trigger: &str) -> String {
    trigger.trim().to_lowercase()
}

/// Spoken word for trigger comparison: trimmed, lowercase, trailing `.,!?;:` removed.
pub fn normalize_spoken(word: &str) -> String {
    word.trim()
        .to_lowercase()
        .trim_end_matches(TRIGGER_PUNCTUATION)
        .to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/align/aligner.rs"]
mod tests;
